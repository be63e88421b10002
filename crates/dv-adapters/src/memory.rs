//! In-memory key/value adapter
//!
//! A mutex-guarded map implementing the full [`KeyValueStore`] contract
//! minus the secondary-index capability, which it reports as absent so
//! consumers exercise their fallback paths. Batches apply under one lock
//! acquisition, which is what makes them atomic here.
//!
//! Used by the test suites and available as an embedded backend.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use dv_ports::{
    IndexQueryOpts, IndexSearchPage, IndexSpec, KeyValueStore, KvError, KvWrite,
};
use serde_json::{Map, Value};

#[derive(Debug, Clone)]
enum Slot {
    Blob(Vec<u8>),
    Set(BTreeSet<String>),
}

#[derive(Debug, Default)]
struct MemoryState {
    data: HashMap<String, Slot>,
}

/// In-process [`KeyValueStore`] implementation.
#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
    inner: Arc<Mutex<MemoryState>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read_blob(state: &MemoryState, key: &str) -> Option<Vec<u8>> {
        match state.data.get(key) {
            Some(Slot::Blob(bytes)) => Some(bytes.clone()),
            _ => None,
        }
    }

    fn read_string(state: &MemoryState, key: &str) -> Result<Option<String>, KvError> {
        match Self::read_blob(state, key) {
            None => Ok(None),
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| KvError::storage(format!("non-utf8 value at {key}"))),
        }
    }

    fn apply_write(state: &mut MemoryState, write: KvWrite) {
        match write {
            KvWrite::PutString { key, value } => {
                state.data.insert(key, Slot::Blob(value.into_bytes()));
            }
            KvWrite::PutStringNx { key, value } => {
                state
                    .data
                    .entry(key)
                    .or_insert_with(|| Slot::Blob(value.into_bytes()));
            }
            KvWrite::PutBytes { key, value } => {
                state.data.insert(key, Slot::Blob(value));
            }
            KvWrite::PutBytesNx { key, value } => {
                state.data.entry(key).or_insert_with(|| Slot::Blob(value));
            }
            KvWrite::PutDocument { key, json } => {
                state.data.insert(key, Slot::Blob(json.into_bytes()));
            }
            KvWrite::Delete { key } => {
                state.data.remove(&key);
            }
            KvWrite::ReplaceSet { key, members } => {
                state.data.remove(&key);
                if !members.is_empty() {
                    state
                        .data
                        .insert(key, Slot::Set(members.into_iter().collect()));
                }
            }
        }
    }
}

impl KeyValueStore for MemoryKv {
    async fn get_string(&self, key: &str) -> Result<Option<String>, KvError> {
        let state = self.state();
        Self::read_string(&state, key)
    }

    async fn get_strings(&self, keys: &[String]) -> Result<Vec<Option<String>>, KvError> {
        let state = self.state();
        keys.iter()
            .map(|key| Self::read_string(&state, key))
            .collect()
    }

    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        let state = self.state();
        Ok(Self::read_blob(&state, key))
    }

    async fn get_document(&self, key: &str) -> Result<Option<String>, KvError> {
        self.get_string(key).await
    }

    async fn get_documents(&self, keys: &[String]) -> Result<Vec<Option<String>>, KvError> {
        self.get_strings(keys).await
    }

    async fn exists(&self, key: &str) -> Result<bool, KvError> {
        Ok(self.state().data.contains_key(key))
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, KvError> {
        match self.state().data.get(key) {
            Some(Slot::Set(members)) => Ok(members.iter().cloned().collect()),
            _ => Ok(Vec::new()),
        }
    }

    async fn apply(&self, batch: Vec<KvWrite>) -> Result<(), KvError> {
        let mut state = self.state();
        for write in batch {
            Self::apply_write(&mut state, write);
        }
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, KvError> {
        let mut state = self.state();
        let mut removed = 0;
        for key in keys {
            if state.data.remove(key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, KvError> {
        let state = self.state();
        let mut keys: Vec<String> = state
            .data
            .keys()
            .filter(|key| glob_match(pattern, key))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn index_probe(&self) -> Result<bool, KvError> {
        Ok(false)
    }

    async fn index_create(&self, _spec: &IndexSpec) -> Result<bool, KvError> {
        Err(KvError::unsupported("secondary index"))
    }

    async fn index_drop(&self, _name: &str, _delete_documents: bool) -> Result<bool, KvError> {
        Err(KvError::unsupported("secondary index"))
    }

    async fn index_info(&self, _name: &str) -> Result<Option<Map<String, Value>>, KvError> {
        Err(KvError::unsupported("secondary index"))
    }

    async fn index_search(
        &self,
        _name: &str,
        _query: &str,
        _opts: &IndexQueryOpts,
    ) -> Result<IndexSearchPage, KvError> {
        Err(KvError::unsupported("secondary index"))
    }
}

/// Glob match with `*` (any run) and `?` (any one byte), the subset SCAN
/// patterns use.
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern = pattern.as_bytes();
    let text = text.as_bytes();
    let (mut p, mut t) = (0usize, 0usize);
    let (mut star, mut star_t) = (None::<usize>, 0usize);

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == b'?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == b'*' {
            star = Some(p);
            star_t = t;
            p += 1;
        } else if let Some(sp) = star {
            p = sp + 1;
            star_t += 1;
            t = star_t;
        } else {
            return false;
        }
    }
    while p < pattern.len() && pattern[p] == b'*' {
        p += 1;
    }
    p == pattern.len()
}

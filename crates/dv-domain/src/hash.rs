//! Asset hashing and the reference grammar
//!
//! Every binary asset is identified by the SHA-256 of its exact bytes,
//! presented as 64 lowercase hex characters. Inside a manifest an asset is
//! only ever pointed at through a reference URI of the form
//! `asset://sha256:<hash>`. This module is pure: no I/O, deterministic
//! output for a given input.

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::errors::DomainError;

/// URI scheme shared by all asset references.
pub const REFERENCE_SCHEME: &str = "asset://";

/// Full prefix of a well-formed asset reference.
pub const REFERENCE_PREFIX: &str = "asset://sha256:";

static REFERENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^asset://sha256:[0-9a-f]{64}$").unwrap());

/// Compute the SHA-256 of `bytes` as 64 lowercase hex characters.
pub fn hash_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Returns true if `value` is a well-formed asset reference.
pub fn is_reference(value: &str) -> bool {
    REFERENCE_RE.is_match(value)
}

/// Returns true if `value` uses the asset URI scheme at all, whether or not
/// the rest of it validates. Used to distinguish "malformed reference" from
/// "ordinary external URL".
pub fn looks_like_reference(value: &str) -> bool {
    value.starts_with(REFERENCE_SCHEME)
}

/// Extract the hash from a well-formed asset reference.
pub fn extract_hash(reference: &str) -> Result<&str, DomainError> {
    if !is_reference(reference) {
        return Err(DomainError::BadReference {
            value: reference.to_string(),
        });
    }
    Ok(&reference[REFERENCE_PREFIX.len()..])
}

/// Format a hash as an asset reference.
pub fn make_reference(hash: &str) -> String {
    format!("{REFERENCE_PREFIX}{hash}")
}

//! Domain errors

use thiserror::Error;

/// Domain errors for DeckVault
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("bad asset reference: {value}")]
    BadReference { value: String },

    #[error("group nesting exceeds the safe depth, cyclic group suspected: {group_id}")]
    CyclicGroup { group_id: String },
}

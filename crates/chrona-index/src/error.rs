//! Error types for the index crate.

use chrona_types::{Identity, RecordId};

/// Errors that can occur during index operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    /// Position is past the end of the owner's entry.
    #[error("position {position} out of range for {owner} ({count} records)")]
    IndexOutOfRange {
        owner: Identity,
        position: usize,
        count: usize,
    },

    /// An id was appended out of creation order.
    #[error("record {id} appended after {last} for {owner}")]
    OutOfOrder {
        owner: Identity,
        id: RecordId,
        last: RecordId,
    },

    /// The index disagrees with the record table.
    #[error("index inconsistent: {0}")]
    Inconsistent(String),
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;

use chrona_types::RecordId;

/// Errors from record table operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No record was ever assigned this id.
    #[error("record not found: {0}")]
    NotFound(RecordId),

    #[error("index {index} out of range for record {id} of length {len}")]
    IndexOutOfRange { id: RecordId, index: usize, len: usize },

    /// A record was inserted with an id other than the next one.
    #[error("record id out of sequence: expected {expected}, got {actual}")]
    OutOfSequence { expected: RecordId, actual: RecordId },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

use chrona_cipher::CipherError;
use chrona_events::EventError;
use chrona_gate::{DisclosureAction, GateError};
use chrona_index::IndexError;
use chrona_store::StoreError;
use chrona_types::{CiphertextHandle, CorrelationId, Identity, RecordId, Timestamp};

/// Broad category of a [`VaultError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Bad input or a state precondition not met.
    Validation,
    /// The caller lacks the required role.
    Authorization,
    /// The time gate has not opened yet. Retrying later can succeed.
    Timing,
    /// An input or decryption proof failed verification.
    Proof,
    /// A late, duplicate or malformed asynchronous completion.
    AsyncCompletion,
    /// Collaborator, lock or persistence failure.
    Internal,
}

/// Errors produced by vault operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VaultError {
    #[error("disclosure time {disclosure_time} is not after current time {now}")]
    InvalidDisclosureTime {
        disclosure_time: Timestamp,
        now: Timestamp,
    },

    #[error("payload must not be empty")]
    EmptyPayload,

    #[error("payload of {len} bytes exceeds the limit of {max}")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("invalid input proof: {0}")]
    InvalidProof(String),

    #[error("ciphertext handle {0} is already bound to a record")]
    HandleReused(CiphertextHandle),

    #[error("record not found: {0}")]
    NotFound(RecordId),

    #[error("index {index} out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("record {id} is not eligible until {opens_at}")]
    NotEligibleYet { id: RecordId, opens_at: Timestamp },

    #[error("record {0} is already public")]
    AlreadyPublic(RecordId),

    #[error("record {0} is already on the other disclosure path")]
    WrongDisclosurePath(RecordId),

    #[error("{caller} may not perform {action:?}")]
    PermissionDenied {
        caller: Identity,
        action: DisclosureAction,
    },

    #[error("disclosure of record {0} was already requested")]
    AlreadyRequested(RecordId),

    #[error("no pending disclosure request {0}")]
    UnknownOrCompletedRequest(CorrelationId),

    #[error("decryption proof for request {0} does not verify")]
    InvalidDecryptionProof(CorrelationId),

    #[error("decryption result for request {correlation_id} is malformed: {reason}")]
    MalformedDecryption {
        correlation_id: CorrelationId,
        reason: String,
    },

    #[error("the null identity cannot be administrator")]
    ZeroIdentity,

    #[error("snapshot rejected: {0}")]
    CorruptSnapshot(String),

    #[error("journal integrity: {0}")]
    Journal(String),

    #[error("encryption service: {0}")]
    Cipher(#[from] CipherError),

    #[error("gate: {0}")]
    Gate(#[from] GateError),

    #[error("events: {0}")]
    Events(#[from] EventError),

    #[error("store: {0}")]
    Store(StoreError),

    #[error("index: {0}")]
    Index(IndexError),

    #[error("vault state lock poisoned")]
    Poisoned,
}

impl VaultError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidDisclosureTime { .. }
            | Self::EmptyPayload
            | Self::PayloadTooLarge { .. }
            | Self::NotFound(_)
            | Self::IndexOutOfRange { .. }
            | Self::AlreadyPublic(_)
            | Self::WrongDisclosurePath(_)
            | Self::AlreadyRequested(_)
            | Self::ZeroIdentity => ErrorClass::Validation,
            Self::PermissionDenied { .. } => ErrorClass::Authorization,
            Self::NotEligibleYet { .. } => ErrorClass::Timing,
            Self::InvalidProof(_) | Self::HandleReused(_) | Self::InvalidDecryptionProof(_) => {
                ErrorClass::Proof
            }
            Self::UnknownOrCompletedRequest(_) | Self::MalformedDecryption { .. } => {
                ErrorClass::AsyncCompletion
            }
            Self::CorruptSnapshot(_)
            | Self::Journal(_)
            | Self::Cipher(_)
            | Self::Gate(_)
            | Self::Events(_)
            | Self::Store(_)
            | Self::Index(_)
            | Self::Poisoned => ErrorClass::Internal,
        }
    }

    /// Only a closed time gate can succeed on a later retry.
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Timing
    }
}

impl From<StoreError> for VaultError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::IndexOutOfRange { index, len, .. } => Self::IndexOutOfRange { index, len },
            other => Self::Store(other),
        }
    }
}

impl From<IndexError> for VaultError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::IndexOutOfRange {
                position, count, ..
            } => Self::IndexOutOfRange {
                index: position,
                len: count,
            },
            other => Self::Index(other),
        }
    }
}

/// Result alias for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_timing_is_retryable() {
        let timing = VaultError::NotEligibleYet {
            id: RecordId::new(0),
            opens_at: Timestamp::from_secs(10),
        };
        assert!(timing.is_retryable());
        assert!(!VaultError::EmptyPayload.is_retryable());
        assert!(!VaultError::Poisoned.is_retryable());
        assert_eq!(
            VaultError::UnknownOrCompletedRequest(CorrelationId::new()).class(),
            ErrorClass::AsyncCompletion
        );
    }

    #[test]
    fn store_errors_map_to_vault_errors() {
        let id = RecordId::new(4);
        assert_eq!(VaultError::from(StoreError::NotFound(id)), VaultError::NotFound(id));
        assert_eq!(
            VaultError::from(StoreError::IndexOutOfRange { id, index: 5, len: 5 }),
            VaultError::IndexOutOfRange { index: 5, len: 5 }
        );
    }

    #[test]
    fn index_errors_map_to_vault_errors() {
        let err = IndexError::IndexOutOfRange {
            owner: Identity::NULL,
            position: 2,
            count: 2,
        };
        assert_eq!(
            VaultError::from(err),
            VaultError::IndexOutOfRange { index: 2, len: 2 }
        );
    }
}

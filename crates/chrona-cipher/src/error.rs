use chrona_types::{CiphertextHandle, CorrelationId, Identity, ScopeId};

/// Errors reported by the encryption service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CipherError {
    /// An input proof does not match the submitted handles.
    #[error("invalid input proof: {0}")]
    InvalidProof(String),

    /// A decryption result's proof does not verify.
    #[error("invalid decryption proof for request {0}")]
    InvalidDecryptionProof(CorrelationId),

    #[error("unknown ciphertext handle {0}")]
    UnknownHandle(CiphertextHandle),

    #[error("handle {handle} does not belong to any authorized scope")]
    ScopeMismatch { handle: CiphertextHandle, scope: ScopeId },

    #[error("{identity} is not allowed to decrypt {handle}")]
    AccessDenied {
        handle: CiphertextHandle,
        identity: Identity,
    },

    #[error("handle {0} is not publicly decryptable")]
    NotPubliclyDecryptable(CiphertextHandle),

    /// The requester's authorization signature or key material is invalid.
    #[error("invalid authorization: {0}")]
    InvalidAuthorization(String),

    /// The authorization's validity window is malformed or not open now.
    #[error("authorization window: {0}")]
    Window(String),

    #[error("encrypted input must contain at least one value")]
    EmptyInput,

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("cipher state lock poisoned")]
    Poisoned,
}

/// Result alias for cipher operations.
pub type CipherResult<T> = Result<T, CipherError>;

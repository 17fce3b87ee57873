use chrona_cipher::CipherError;
use chrona_types::RecordId;
use chrona_vault::VaultError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("vault error: {0}")]
    Vault(#[from] VaultError),

    #[error("encryption service error: {0}")]
    Cipher(#[from] CipherError),

    #[error("record {id} holds a non-byte value at position {position}")]
    UnexpectedValue { id: RecordId, position: usize },

    #[error("record {0} content is not valid UTF-8")]
    InvalidUtf8(RecordId),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SdkResult<T> = Result<T, SdkError>;

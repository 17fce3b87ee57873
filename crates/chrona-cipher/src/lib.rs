//! Encryption service boundary for Chrona.
//!
//! The vault never sees cleartext. Content is encrypted upstream into opaque
//! [`CiphertextHandle`](chrona_types::CiphertextHandle)s, and disclosure is
//! carried out by a decryption service that enforces per-handle access lists.
//! This crate defines those collaborators as traits:
//!
//! - [`EncryptionService`]: build encrypted inputs with a validity proof
//! - [`CipherGateway`]: the vault-facing side: proof checks and access lists
//! - [`UserDecryption`]: requester-side decryption with a signed authorization
//! - [`PublicDecryption`]: decryption of handles marked publicly decryptable
//! - [`DecryptionOracle`]: asynchronous decryption on behalf of the vault
//!
//! [`LocalCipherService`] implements all of them in-process. It keeps
//! cleartexts in a private table and is meant for tests, demos and the CLI;
//! it provides access control, not confidentiality.

pub mod auth;
pub mod error;
pub mod input;
pub mod local;
pub mod ticket;
pub mod traits;
pub mod value;

pub use auth::{
    AuthorizationMessage, AuthorizationSignature, DecryptionKeypair, MAX_VALIDITY_DAYS,
};
pub use error::{CipherError, CipherResult};
pub use input::{EncryptedInput, InputBuilder};
pub use local::{LocalCipherService, LocalCipherSnapshot, SealedValue};
pub use ticket::{DecryptionProof, DecryptionResponse, DecryptionTicket};
pub use traits::{
    CipherGateway, DecryptionOracle, EncryptionService, PublicDecryption, UserDecryption,
};
pub use value::ClearValue;

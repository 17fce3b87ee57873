//! High-level SDK for Chrona vaults.
//!
//! [`VaultClient`] wraps a [`Vault`](chrona_vault::Vault) and its encryption
//! service: it encrypts content before submission and turns decrypted
//! handles back into bytes. [`DisclosureRelay`] runs the asynchronous half of
//! the administrator disclosure path.

pub mod client;
pub mod config;
pub mod error;
pub mod relay;

pub use client::VaultClient;
pub use config::SdkConfig;
pub use error::{SdkError, SdkResult};
pub use relay::{DisclosureRelay, RelayHandle, RelayStats};

// Re-export key types
pub use chrona_cipher::{ClearValue, LocalCipherService, LocalCipherSnapshot};
pub use chrona_crypto::SigningKey;
pub use chrona_types::{Identity, ManualClock, RecordId, SystemClock, Timestamp};
pub use chrona_vault::{Vault, VaultConfig, VaultError, VaultSnapshot};

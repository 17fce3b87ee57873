//! The Chrona vault: a time-gated, access-controlled record store.
//!
//! A [`Vault`] ties together the record table, the per-owner index, the
//! access gate and the event bus, and runs the disclosure state machine:
//!
//! - [`Vault::submit`] stores a locked record whose content is a sequence of
//!   ciphertext handles plus an encrypted access field.
//! - Once the record's disclosure time passes, either anyone may
//!   [`make_public`](Vault::make_public) it, or the administrator may
//!   [`request_disclosure`](Vault::request_disclosure) of its access field.
//!   The two paths are mutually exclusive per record.
//! - The decryption service answers a disclosure request asynchronously
//!   through [`complete_disclosure`](Vault::complete_disclosure).
//!
//! Every mutation is a transaction ([`Vault::submit_transaction`]) that
//! either fully commits or leaves the vault unchanged. Committed
//! transactions are appended to a hash-linked journal.

pub mod config;
pub mod error;
pub mod journal;
pub mod snapshot;
pub mod transaction;
pub mod vault;

pub use config::{VaultConfig, DEFAULT_MAX_PAYLOAD_LEN};
pub use error::{ErrorClass, VaultError, VaultResult};
pub use journal::{JournalBody, JournalEntry};
pub use snapshot::VaultSnapshot;
pub use transaction::{Operation, OperationOutput, TransactionReceipt};
pub use vault::Vault;

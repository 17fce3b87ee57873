//! Record storage for Chrona.
//!
//! Records are kept in a [`RecordTable`] indexed by sequential
//! [`RecordId`](chrona_types::RecordId). Everything about a record is
//! immutable except its [`DisclosureState`], which only the vault's
//! disclosure state machine advances.
//!
//! # Lifecycle
//!
//! ```text
//! Locked ──(time gate)──▶ Eligible ──make_public──────────▶ PubliclyDisclosed
//!                                  └─request_disclosure──▶ DisclosureRequested
//!                                                              └─completion──▶ Disclosed
//! ```
//!
//! `Eligible` is derived from the clock and never stored.

pub mod error;
pub mod record;
pub mod stats;
pub mod table;

pub use error::{StoreError, StoreResult};
pub use record::{DecryptionStatus, DisclosureState, Phase, Record, RecordMeta};
pub use stats::VaultStats;
pub use table::RecordTable;

//! Foundation types for Chrona, the time-gated record vault.
//!
//! This crate provides the identity, temporal, and handle types used
//! throughout the Chrona workspace. Every other Chrona crate depends on
//! `chrona-types`.
//!
//! # Key Types
//!
//! - [`Identity`]: 20-byte account identity (case-insensitive hex text form)
//! - [`Timestamp`]: Seconds since the UNIX epoch
//! - [`Clock`]: Time source; [`SystemClock`] in production, [`ManualClock`] in tests
//! - [`CiphertextHandle`]: Opaque reference to a value held by the encryption service
//! - [`InputProof`]: Validity proof attached to freshly encrypted inputs
//! - [`RecordId`]: Sequential record identifier
//! - [`CorrelationId`]: Identifier tying a disclosure request to its callback

pub mod error;
pub mod handle;
pub mod identity;
pub mod ids;
pub mod temporal;

pub use error::TypeError;
pub use handle::{CiphertextHandle, InputProof, ScopeId};
pub use identity::Identity;
pub use ids::{CorrelationId, RecordId};
pub use temporal::{Clock, ManualClock, SystemClock, Timestamp};

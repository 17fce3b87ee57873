//! Per-owner record index.
//!
//! The index maps each owner to the ordered list of record ids they created,
//! so holders can enumerate their records without scanning the whole table.
//! Entries are created lazily on first submission and only ever appended to.

pub mod error;
pub mod owners;

pub use error::{IndexError, IndexResult};
pub use owners::OwnerIndex;

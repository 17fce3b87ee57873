//! Vault notifications.
//!
//! Every committed state change produces a [`VaultEvent`]. Events carry a
//! per-bus sequence number and a BLAKE3 integrity hash that doubles as the
//! event id. The [`EventBus`] fans events out to subscribers over tokio
//! broadcast channels, each with its own [`EventFilter`].
//!
//! Events are notifications only. Per-owner discovery goes through the
//! owner index, never through an event scan.

pub mod bus;
pub mod error;
pub mod event;

pub use bus::{EventBus, EventFilter, EventStream, DEFAULT_CHANNEL_CAPACITY};
pub use error::{EventError, EventResult};
pub use event::{EventId, EventKind, EventPayload, VaultEvent};

/// Errors produced by the event bus.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("event bus lock poisoned")]
    Poisoned,
}

/// Convenience alias used throughout the events crate.
pub type EventResult<T> = std::result::Result<T, EventError>;

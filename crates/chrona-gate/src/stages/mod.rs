//! Built-in gate stages.

pub mod authority;
pub mod time_gate;

pub use authority::AuthorityStage;
pub use time_gate::TimeGateStage;

use chrona_gate::GateConfig;
use chrona_types::ScopeId;
use serde::{Deserialize, Serialize};

/// Default upper bound on payload length, in bytes.
pub const DEFAULT_MAX_PAYLOAD_LEN: usize = 4096;

/// Vault configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Scope that encrypted inputs must be bound to.
    pub scope: ScopeId,
    pub max_payload_len: usize,
    pub gate: GateConfig,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            scope: ScopeId::default(),
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
            gate: GateConfig::default(),
        }
    }
}

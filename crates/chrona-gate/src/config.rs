use serde::{Deserialize, Serialize};

/// Which disclosure paths the gate permits.
///
/// Both paths are enabled by default. Disabling one makes the gate deny it
/// with [`Denial::PathDisabled`](crate::Denial::PathDisabled) without any change
/// to the vault's state machine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Allow anyone to make an eligible record public.
    pub public_path_enabled: bool,
    /// Allow the administrator to request disclosure of an eligible record.
    pub admin_path_enabled: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            public_path_enabled: true,
            admin_path_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: GateConfig = toml::from_str("public_path_enabled = false").unwrap();
        assert!(!config.public_path_enabled);
        assert!(config.admin_path_enabled);
    }
}

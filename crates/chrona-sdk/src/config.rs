use std::path::Path;

use chrona_events::DEFAULT_CHANNEL_CAPACITY;
use chrona_vault::VaultConfig;
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

/// Client configuration, usually read from a TOML file.
///
/// ```toml
/// decryption_validity_days = 10
/// default_reveal_delay_secs = 60
///
/// [vault]
/// scope = "chrona:default"
/// max_payload_len = 4096
///
/// [vault.gate]
/// public_path_enabled = true
/// admin_path_enabled = true
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    /// Validity window of user-decryption authorizations.
    pub decryption_validity_days: u32,
    /// Delay before a new record becomes eligible when none is given.
    pub default_reveal_delay_secs: u64,
    pub event_channel_capacity: usize,
    pub vault: VaultConfig,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            decryption_validity_days: 10,
            default_reveal_delay_secs: 60,
            event_channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            vault: VaultConfig::default(),
        }
    }
}

impl SdkConfig {
    pub fn from_toml_str(s: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| SdkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string_pretty(self).map_err(|e| SdkError::Config(e.to_string()))
    }

    fn validate(&self) -> SdkResult<()> {
        if self.event_channel_capacity == 0 {
            return Err(SdkError::Config("event_channel_capacity must be positive".into()));
        }
        if self.vault.max_payload_len == 0 {
            return Err(SdkError::Config("vault.max_payload_len must be positive".into()));
        }
        if self.default_reveal_delay_secs == 0 {
            return Err(SdkError::Config(
                "default_reveal_delay_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = SdkConfig::from_toml_str("").unwrap();
        assert_eq!(config, SdkConfig::default());
        assert_eq!(config.decryption_validity_days, 10);
        assert_eq!(config.default_reveal_delay_secs, 60);
        assert_eq!(config.event_channel_capacity, 1024);
    }

    #[test]
    fn nested_sections_override() {
        let config = SdkConfig::from_toml_str(
            r#"
            decryption_validity_days = 3

            [vault]
            scope = "acme:payroll"
            max_payload_len = 16

            [vault.gate]
            public_path_enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.decryption_validity_days, 3);
        assert_eq!(config.vault.scope.as_str(), "acme:payroll");
        assert_eq!(config.vault.max_payload_len, 16);
        assert!(!config.vault.gate.public_path_enabled);
        assert!(config.vault.gate.admin_path_enabled);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            SdkConfig::from_toml_str("event_channel_capacity = 0"),
            Err(SdkError::Config(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chrona.toml");
        let written = SdkConfig {
            default_reveal_delay_secs: 5,
            ..SdkConfig::default()
        };
        std::fs::write(&path, written.to_toml_string().unwrap()).unwrap();
        assert_eq!(SdkConfig::load(&path).unwrap(), written);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            SdkConfig::load(dir.path().join("absent.toml")),
            Err(SdkError::Io(_))
        ));
    }
}

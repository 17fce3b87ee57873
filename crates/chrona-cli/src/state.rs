use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use chrona_cipher::{LocalCipherService, LocalCipherSnapshot};
use chrona_crypto::SigningKey;
use chrona_sdk::{SdkConfig, VaultClient};
use chrona_types::{Clock, Identity, ManualClock, SystemClock};
use chrona_vault::{VaultConfig, VaultSnapshot};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A named local account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub identity: Identity,
    /// Hex-encoded Ed25519 secret key.
    pub secret: String,
}

impl Account {
    fn generate() -> Self {
        let key = SigningKey::generate();
        Self {
            identity: key.identity(),
            secret: hex::encode(key.as_bytes()),
        }
    }

    fn signing_key(&self) -> anyhow::Result<SigningKey> {
        let raw = hex::decode(&self.secret).context("account secret is not hex")?;
        let bytes: [u8; 32] = raw
            .try_into()
            .map_err(|v: Vec<u8>| anyhow!("account secret must be 32 bytes, got {}", v.len()))?;
        Ok(SigningKey::from_bytes(bytes))
    }
}

/// On-disk form of a local vault.
#[derive(Debug, Serialize, Deserialize)]
pub struct StateFile {
    /// Seconds the vault clock runs ahead of wall-clock time.
    #[serde(default)]
    pub time_offset_secs: u64,
    pub accounts: BTreeMap<String, Account>,
    /// Vault settings fixed at `init`; they win over any later config file.
    #[serde(default)]
    pub vault_config: Option<VaultConfig>,
    pub cipher: LocalCipherSnapshot,
    pub vault: VaultSnapshot,
}

impl StateFile {
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| {
            format!("cannot read {} (run `chrona init` first)", path.display())
        })?;
        serde_json::from_str(&text).with_context(|| format!("malformed state file {}", path.display()))
    }

    /// Write via a temporary file in the same directory, then rename.
    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("cannot create temporary file in {}", dir.display()))?;
        serde_json::to_writer_pretty(&mut tmp, self)?;
        tmp.persist(path)
            .with_context(|| format!("cannot write {}", path.display()))?;
        Ok(())
    }
}

/// A vault, its encryption service and local accounts, loaded from a state
/// file.
pub struct LocalVault {
    pub client: VaultClient<LocalCipherService>,
    clock: Arc<ManualClock>,
    time_offset_secs: u64,
    accounts: BTreeMap<String, Account>,
}

impl LocalVault {
    /// A fresh vault administered by a new account called `admin_name`.
    pub fn create(admin_name: &str, config: SdkConfig) -> anyhow::Result<Self> {
        let admin = Account::generate();
        let clock = Arc::new(ManualClock::new(SystemClock.now()));
        let cipher = Arc::new(LocalCipherService::new(clock.clone()));
        let client = VaultClient::create(admin.identity, config, clock.clone(), cipher)?;
        let mut accounts = BTreeMap::new();
        accounts.insert(admin_name.to_string(), admin);
        Ok(Self {
            client,
            clock,
            time_offset_secs: 0,
            accounts,
        })
    }

    pub fn open(path: &Path, mut config: SdkConfig) -> anyhow::Result<Self> {
        let state = StateFile::read(path)?;
        if let Some(stored) = state.vault_config {
            if stored != config.vault {
                warn!(
                    stored = %stored.scope,
                    configured = %config.vault.scope,
                    "ignoring vault settings that differ from the ones saved at init"
                );
            }
            config.vault = stored;
        }
        let clock = Arc::new(ManualClock::new(
            SystemClock.now().plus_secs(state.time_offset_secs),
        ));
        let cipher = Arc::new(LocalCipherService::from_snapshot(state.cipher, clock.clone())?);
        let client = VaultClient::restore(state.vault, config, clock.clone(), cipher)?;
        debug!(path = %path.display(), accounts = state.accounts.len(), "state loaded");
        Ok(Self {
            client,
            clock,
            time_offset_secs: state.time_offset_secs,
            accounts: state.accounts,
        })
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        StateFile {
            time_offset_secs: self.time_offset_secs,
            accounts: self.accounts.clone(),
            vault_config: Some(self.client.vault().config().clone()),
            cipher: self.client.cipher().snapshot()?,
            vault: self.client.vault().snapshot()?,
        }
        .write(path)
    }

    pub fn add_account(&mut self, name: &str) -> anyhow::Result<Identity> {
        if self.accounts.contains_key(name) {
            bail!("account {name} already exists");
        }
        if Identity::parse(name).is_ok() {
            bail!("account name {name} looks like an address");
        }
        let account = Account::generate();
        let identity = account.identity;
        self.accounts.insert(name.to_string(), account);
        Ok(identity)
    }

    pub fn accounts(&self) -> impl Iterator<Item = (&str, Identity)> {
        self.accounts.iter().map(|(n, a)| (n.as_str(), a.identity))
    }

    pub fn signing_key(&self, name: &str) -> anyhow::Result<SigningKey> {
        self.accounts
            .get(name)
            .ok_or_else(|| anyhow!("no local account named {name}"))?
            .signing_key()
    }

    /// Resolve an account name or a textual address.
    pub fn resolve(&self, who: &str) -> anyhow::Result<Identity> {
        if let Some(account) = self.accounts.get(who) {
            return Ok(account.identity);
        }
        Identity::parse(who).map_err(|_| anyhow!("{who} is neither an account nor an address"))
    }

    pub fn name_of(&self, identity: &Identity) -> Option<&str> {
        self.accounts
            .iter()
            .find(|(_, a)| a.identity == *identity)
            .map(|(n, _)| n.as_str())
    }

    /// Run the vault clock `secs` seconds further ahead of wall-clock time.
    pub fn warp(&mut self, secs: u64) {
        self.time_offset_secs = self.time_offset_secs.saturating_add(secs);
        self.clock.advance(secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrona_types::{RecordId, ScopeId};

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut local = LocalVault::create("admin", SdkConfig::default()).unwrap();
        let alice = local.add_account("alice").unwrap();
        let key = local.signing_key("alice").unwrap();
        let id = local
            .client
            .submit_after(alice, alice, b"persisted", Some(60))
            .unwrap();
        local.warp(120);
        local.save(&path).unwrap();

        let reopened = LocalVault::open(&path, SdkConfig::default()).unwrap();
        assert_eq!(reopened.resolve("alice").unwrap(), alice);
        assert_eq!(reopened.client.vault().total_count().unwrap(), 1);
        assert_eq!(reopened.client.decrypt_record(&key, id).unwrap(), b"persisted");
        assert!(reopened.client.vault().can_be_disclosed(id).unwrap());
        assert_eq!(reopened.time_offset_secs, 120);
        reopened.client.vault().verify_journal().unwrap();
    }

    #[test]
    fn vault_settings_from_init_survive_other_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut config = SdkConfig::default();
        config.vault.scope = ScopeId::new("acme:vault").unwrap();
        config.vault.max_payload_len = 16;

        let mut local = LocalVault::create("admin", config).unwrap();
        let alice = local.add_account("alice").unwrap();
        let key = local.signing_key("alice").unwrap();
        let id = local
            .client
            .submit_after(alice, alice, b"scoped", Some(60))
            .unwrap();
        local.save(&path).unwrap();

        let reopened = LocalVault::open(&path, SdkConfig::default()).unwrap();
        let vault = reopened.client.vault();
        assert_eq!(vault.scope().as_str(), "acme:vault");
        assert_eq!(vault.config().max_payload_len, 16);
        assert_eq!(reopened.client.decrypt_record(&key, id).unwrap(), b"scoped");
    }

    #[test]
    fn missing_state_points_at_init() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalVault::open(&dir.path().join("absent.json"), SdkConfig::default())
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("chrona init"));
    }

    #[test]
    fn malformed_state_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(LocalVault::open(&path, SdkConfig::default()).is_err());
    }

    #[test]
    fn resolve_accepts_names_and_addresses() {
        let mut local = LocalVault::create("admin", SdkConfig::default()).unwrap();
        let bob = local.add_account("bob").unwrap();
        assert_eq!(local.resolve("bob").unwrap(), bob);
        assert_eq!(local.resolve(&bob.to_hex().to_uppercase().replacen("0X", "0x", 1)).unwrap(), bob);
        assert_eq!(local.name_of(&bob), Some("bob"));
        assert!(local.resolve("nobody").is_err());
        assert!(local.add_account("bob").is_err());
    }

    #[test]
    fn administrator_account_administers() {
        let local = LocalVault::create("root", SdkConfig::default()).unwrap();
        let root = local.resolve("root").unwrap();
        assert!(local.client.vault().is_administrator(&root).unwrap());
        assert!(local.signing_key("missing").is_err());
        assert!(matches!(
            local.client.vault().get(RecordId::new(0)),
            Err(chrona_vault::VaultError::NotFound(_))
        ));
    }
}

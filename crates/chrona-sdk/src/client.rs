use std::collections::BTreeMap;
use std::sync::Arc;

use chrona_cipher::{
    CipherGateway, ClearValue, EncryptionService, InputBuilder, PublicDecryption, UserDecryption,
};
use chrona_crypto::SigningKey;
use chrona_events::EventBus;
use chrona_types::{CiphertextHandle, Clock, Identity, RecordId, Timestamp};
use chrona_vault::{Vault, VaultError, VaultSnapshot};
use tracing::debug;

use crate::config::SdkConfig;
use crate::error::{SdkError, SdkResult};

/// High-level access to a vault and the encryption service behind it.
///
/// The client encrypts content before it reaches the vault and turns
/// decrypted handle maps back into bytes. It never holds decrypted content
/// beyond the call that produced it.
pub struct VaultClient<C> {
    vault: Arc<Vault>,
    cipher: Arc<C>,
    config: SdkConfig,
}

impl<C> VaultClient<C>
where
    C: EncryptionService + CipherGateway + UserDecryption + PublicDecryption + 'static,
{
    pub fn new(vault: Arc<Vault>, cipher: Arc<C>, config: SdkConfig) -> Self {
        Self {
            vault,
            cipher,
            config,
        }
    }

    /// Create an empty vault administered by `administrator`.
    pub fn create(
        administrator: Identity,
        config: SdkConfig,
        clock: Arc<dyn Clock>,
        cipher: Arc<C>,
    ) -> SdkResult<Self> {
        let bus = Arc::new(EventBus::new(config.event_channel_capacity));
        let vault = Vault::new(administrator, config.vault.clone(), clock, cipher.clone())?
            .with_event_bus(bus);
        Ok(Self::new(Arc::new(vault), cipher, config))
    }

    /// Reopen a vault from a snapshot.
    pub fn restore(
        snapshot: VaultSnapshot,
        config: SdkConfig,
        clock: Arc<dyn Clock>,
        cipher: Arc<C>,
    ) -> SdkResult<Self> {
        let bus = Arc::new(EventBus::new(config.event_channel_capacity));
        let vault = Vault::from_snapshot(snapshot, config.vault.clone(), clock, cipher.clone())?
            .with_event_bus(bus);
        Ok(Self::new(Arc::new(vault), cipher, config))
    }

    pub fn vault(&self) -> &Arc<Vault> {
        &self.vault
    }

    pub fn cipher(&self) -> &Arc<C> {
        &self.cipher
    }

    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    // ---- Submission ----

    /// Encrypt `content` and `access` in one input and submit the record.
    pub fn submit_bytes(
        &self,
        owner: Identity,
        access: Identity,
        content: &[u8],
        disclosure_time: Timestamp,
    ) -> SdkResult<RecordId> {
        let mut input = InputBuilder::new(self.cipher.as_ref(), self.vault.scope().clone(), owner);
        input.add_address(access).add_bytes(content);
        let input = input.finalize()?;

        let Some((access_field, payload)) = input.handles.split_first() else {
            return Err(VaultError::EmptyPayload.into());
        };
        let id = self.vault.submit(
            owner,
            payload.to_vec(),
            *access_field,
            input.proof,
            disclosure_time,
        )?;
        debug!(%id, len = content.len(), "content submitted");
        Ok(id)
    }

    pub fn submit_text(
        &self,
        owner: Identity,
        access: Identity,
        text: &str,
        disclosure_time: Timestamp,
    ) -> SdkResult<RecordId> {
        self.submit_bytes(owner, access, text.as_bytes(), disclosure_time)
    }

    /// Submit with a disclosure time `delay_secs` from now, or the configured
    /// default delay.
    pub fn submit_after(
        &self,
        owner: Identity,
        access: Identity,
        content: &[u8],
        delay_secs: Option<u64>,
    ) -> SdkResult<RecordId> {
        let delay = delay_secs.unwrap_or(self.config.default_reveal_delay_secs);
        let disclosure_time = self.vault.now().plus_secs(delay);
        self.submit_bytes(owner, access, content, disclosure_time)
    }

    // ---- Decryption ----

    /// Decrypt a record's content as `account`, which must be on the access
    /// list of every payload handle.
    pub fn decrypt_record(&self, account: &SigningKey, id: RecordId) -> SdkResult<Vec<u8>> {
        let handles = self.vault.get(id)?.payload;
        let clear = self.user_decrypt(account, &handles)?;
        collect_bytes(id, handles.iter().map(|h| clear.get(h).copied()))
    }

    pub fn decrypt_text(&self, account: &SigningKey, id: RecordId) -> SdkResult<String> {
        let bytes = self.decrypt_record(account, id)?;
        String::from_utf8(bytes).map_err(|_| SdkError::InvalidUtf8(id))
    }

    /// Decrypt a record's access field as `account`.
    pub fn decrypt_access_field(&self, account: &SigningKey, id: RecordId) -> SdkResult<Identity> {
        let handle = self.vault.get(id)?.access_field;
        let clear = self.user_decrypt(account, &[handle])?;
        clear
            .get(&handle)
            .and_then(ClearValue::as_address)
            .ok_or(SdkError::UnexpectedValue { id, position: 0 })
    }

    /// Read the content of a record made public.
    pub fn read_public(&self, id: RecordId) -> SdkResult<Vec<u8>> {
        let handles = self.vault.get(id)?.payload;
        let clear = self.cipher.public_decrypt(&handles)?;
        collect_bytes(id, clear.into_iter().map(Some))
    }

    fn user_decrypt(
        &self,
        account: &SigningKey,
        handles: &[CiphertextHandle],
    ) -> SdkResult<BTreeMap<CiphertextHandle, ClearValue>> {
        let keypair = self.cipher.generate_keypair();
        let message = self.cipher.build_authorization_message(
            &keypair,
            vec![self.vault.scope().clone()],
            self.vault.now(),
            self.config.decryption_validity_days,
        )?;
        let signature = message.sign(account)?;
        Ok(self
            .cipher
            .user_decrypt(handles, &keypair, &message, &signature, account.identity())?)
    }
}

fn collect_bytes(
    id: RecordId,
    values: impl Iterator<Item = Option<ClearValue>>,
) -> SdkResult<Vec<u8>> {
    values
        .enumerate()
        .map(|(position, value)| {
            value
                .as_ref()
                .and_then(ClearValue::as_byte)
                .ok_or(SdkError::UnexpectedValue { id, position })
        })
        .collect()
}

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrona_crypto::{ContentHasher, Signature, SigningKey, VerifyingKey};
use chrona_types::{
    CiphertextHandle, Clock, CorrelationId, Identity, InputProof, ScopeId,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::auth::{AuthorizationMessage, AuthorizationSignature, DecryptionKeypair};
use crate::error::{CipherError, CipherResult};
use crate::input::EncryptedInput;
use crate::ticket::{DecryptionProof, DecryptionResponse, DecryptionTicket};
use crate::traits::{
    CipherGateway, DecryptionOracle, EncryptionService, PublicDecryption, UserDecryption,
};
use crate::value::ClearValue;

/// A ciphertext as tracked by [`LocalCipherService`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedValue {
    pub handle: CiphertextHandle,
    pub scope: ScopeId,
    pub value: ClearValue,
    pub acl: BTreeSet<Identity>,
    pub public: bool,
}

/// Serializable state of a [`LocalCipherService`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LocalCipherSnapshot {
    /// Hex-encoded service signing key.
    pub service_key: String,
    pub values: Vec<SealedValue>,
}

#[derive(Default)]
struct LocalState {
    values: HashMap<CiphertextHandle, SealedValue>,
}

impl LocalState {
    /// Fails on the first handle the service never issued.
    fn check_known(&self, handles: &[CiphertextHandle]) -> CipherResult<()> {
        match handles.iter().find(|h| !self.values.contains_key(h)) {
            Some(unknown) => Err(CipherError::UnknownHandle(*unknown)),
            None => Ok(()),
        }
    }
}

/// In-process encryption service.
///
/// Handles are random-salted digests; cleartexts sit in a private table keyed
/// by handle. Input and decryption proofs are Ed25519 signatures by the
/// service key. Implements every collaborator trait in this crate so a single
/// instance can stand in for the whole encryption stack.
pub struct LocalCipherService {
    key: SigningKey,
    clock: Arc<dyn Clock>,
    latency: Duration,
    state: RwLock<LocalState>,
}

impl LocalCipherService {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_key(SigningKey::generate(), clock)
    }

    pub fn with_key(key: SigningKey, clock: Arc<dyn Clock>) -> Self {
        Self {
            key,
            clock,
            latency: Duration::ZERO,
            state: RwLock::new(LocalState::default()),
        }
    }

    /// Delay every oracle decryption by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn service_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }

    /// Number of ciphertexts known to the service.
    pub fn len(&self) -> CipherResult<usize> {
        Ok(self.read()?.values.len())
    }

    pub fn is_empty(&self) -> CipherResult<bool> {
        Ok(self.len()? == 0)
    }

    pub fn snapshot(&self) -> CipherResult<LocalCipherSnapshot> {
        let state = self.read()?;
        let mut values: Vec<SealedValue> = state.values.values().cloned().collect();
        values.sort_by(|a, b| a.handle.cmp(&b.handle));
        Ok(LocalCipherSnapshot {
            service_key: hex::encode(self.key.as_bytes()),
            values,
        })
    }

    pub fn from_snapshot(snapshot: LocalCipherSnapshot, clock: Arc<dyn Clock>) -> CipherResult<Self> {
        let raw = hex::decode(&snapshot.service_key)
            .map_err(|e| CipherError::Serialization(format!("service key: {e}")))?;
        let bytes: [u8; 32] = raw.try_into().map_err(|v: Vec<u8>| {
            CipherError::Serialization(format!("service key must be 32 bytes, got {}", v.len()))
        })?;
        let service = Self::with_key(SigningKey::from_bytes(bytes), clock);
        {
            let mut state = service.write()?;
            for sealed in snapshot.values {
                state.values.insert(sealed.handle, sealed);
            }
        }
        Ok(service)
    }

    fn input_digest(
        scope: &ScopeId,
        submitter: Identity,
        handles: &[CiphertextHandle],
    ) -> [u8; 32] {
        let handle_bytes: Vec<u8> = handles.iter().flat_map(|h| *h.as_bytes()).collect();
        ContentHasher::INPUT_PROOF.hash_parts(&[
            scope.as_str().as_bytes(),
            submitter.as_bytes(),
            &handle_bytes,
        ])
    }

    fn read(&self) -> CipherResult<RwLockReadGuard<'_, LocalState>> {
        self.state.read().map_err(|_| CipherError::Poisoned)
    }

    fn write(&self) -> CipherResult<RwLockWriteGuard<'_, LocalState>> {
        self.state.write().map_err(|_| CipherError::Poisoned)
    }
}

impl EncryptionService for LocalCipherService {
    #[instrument(skip(self, values), fields(scope = %scope, submitter = %submitter.short_id(), count = values.len()))]
    fn encrypt(
        &self,
        scope: &ScopeId,
        submitter: Identity,
        values: &[ClearValue],
    ) -> CipherResult<EncryptedInput> {
        if values.is_empty() {
            return Err(CipherError::EmptyInput);
        }

        let mut rng = rand::thread_rng();
        let mut handles = Vec::with_capacity(values.len());
        let mut state = self.write()?;
        for (position, value) in values.iter().enumerate() {
            let mut salt = [0u8; 16];
            rng.fill_bytes(&mut salt);
            let handle = CiphertextHandle::from_bytes(ContentHasher::HANDLE.hash_parts(&[
                scope.as_str().as_bytes(),
                submitter.as_bytes(),
                &(position as u64).to_le_bytes(),
                &salt,
            ]));
            state.values.insert(
                handle,
                SealedValue {
                    handle,
                    scope: scope.clone(),
                    value: *value,
                    acl: BTreeSet::new(),
                    public: false,
                },
            );
            handles.push(handle);
        }
        drop(state);

        let digest = Self::input_digest(scope, submitter, &handles);
        let proof = InputProof::new(self.key.sign(&digest).to_bytes().to_vec());
        debug!("sealed encrypted input");
        Ok(EncryptedInput { handles, proof })
    }
}

impl CipherGateway for LocalCipherService {
    fn verify_input(
        &self,
        scope: &ScopeId,
        submitter: Identity,
        handles: &[CiphertextHandle],
        proof: &InputProof,
    ) -> CipherResult<()> {
        if proof.is_empty() {
            return Err(CipherError::InvalidProof("empty proof".into()));
        }
        let signature = Signature::from_slice(proof.as_bytes())
            .map_err(|e| CipherError::InvalidProof(e.to_string()))?;
        let digest = Self::input_digest(scope, submitter, handles);
        self.key
            .verifying_key()
            .verify(&digest, &signature)
            .map_err(|_| {
                CipherError::InvalidProof("proof does not match scope, submitter and handles".into())
            })?;

        let state = self.read()?;
        for handle in handles {
            let sealed = state
                .values
                .get(handle)
                .ok_or(CipherError::UnknownHandle(*handle))?;
            if &sealed.scope != scope {
                return Err(CipherError::ScopeMismatch {
                    handle: *handle,
                    scope: scope.clone(),
                });
            }
        }
        Ok(())
    }

    fn allow(&self, handles: &[CiphertextHandle], identity: Identity) -> CipherResult<()> {
        let mut state = self.write()?;
        state.check_known(handles)?;
        for handle in handles {
            if let Some(sealed) = state.values.get_mut(handle) {
                sealed.acl.insert(identity);
            }
        }
        Ok(())
    }

    fn allow_public(&self, handles: &[CiphertextHandle]) -> CipherResult<()> {
        let mut state = self.write()?;
        state.check_known(handles)?;
        for handle in handles {
            if let Some(sealed) = state.values.get_mut(handle) {
                sealed.public = true;
            }
        }
        Ok(())
    }

    fn is_allowed(&self, handle: &CiphertextHandle, identity: Identity) -> CipherResult<bool> {
        let state = self.read()?;
        let sealed = state
            .values
            .get(handle)
            .ok_or(CipherError::UnknownHandle(*handle))?;
        Ok(sealed.acl.contains(&identity))
    }

    fn verify_decryption(
        &self,
        correlation_id: &CorrelationId,
        handles: &[CiphertextHandle],
        cleartext: &[ClearValue],
        proof: &DecryptionProof,
    ) -> CipherResult<()> {
        if proof.signer != self.key.verifying_key() {
            return Err(CipherError::InvalidDecryptionProof(*correlation_id));
        }
        let digest = DecryptionProof::digest(correlation_id, handles, cleartext);
        proof
            .signer
            .verify(&digest, &proof.signature)
            .map_err(|_| CipherError::InvalidDecryptionProof(*correlation_id))
    }
}

impl UserDecryption for LocalCipherService {
    #[instrument(skip_all, fields(requester = %requester.short_id(), count = handles.len()))]
    fn user_decrypt(
        &self,
        handles: &[CiphertextHandle],
        keypair: &DecryptionKeypair,
        message: &AuthorizationMessage,
        signature: &AuthorizationSignature,
        requester: Identity,
    ) -> CipherResult<BTreeMap<CiphertextHandle, ClearValue>> {
        if message.public_key != keypair.public_key() {
            return Err(CipherError::InvalidAuthorization(
                "keypair does not match the signed public key".into(),
            ));
        }
        if signature.signer_identity() != requester {
            return Err(CipherError::InvalidAuthorization(format!(
                "signature is not from {requester}"
            )));
        }
        signature.verify(message)?;

        let now = self.clock.now();
        if !message.is_open_at(now) {
            return Err(CipherError::Window(format!(
                "not valid at {now} (window {}..{})",
                message.start,
                message.expires_at()
            )));
        }

        let state = self.read()?;
        let mut out = BTreeMap::new();
        for handle in handles {
            let sealed = state
                .values
                .get(handle)
                .ok_or(CipherError::UnknownHandle(*handle))?;
            if !message.covers(&sealed.scope) {
                return Err(CipherError::ScopeMismatch {
                    handle: *handle,
                    scope: sealed.scope.clone(),
                });
            }
            if !sealed.acl.contains(&requester) {
                return Err(CipherError::AccessDenied {
                    handle: *handle,
                    identity: requester,
                });
            }
            out.insert(*handle, sealed.value);
        }
        Ok(out)
    }
}

impl PublicDecryption for LocalCipherService {
    fn public_decrypt(&self, handles: &[CiphertextHandle]) -> CipherResult<Vec<ClearValue>> {
        let state = self.read()?;
        handles
            .iter()
            .map(|handle| {
                let sealed = state
                    .values
                    .get(handle)
                    .ok_or(CipherError::UnknownHandle(*handle))?;
                if sealed.public {
                    Ok(sealed.value)
                } else {
                    Err(CipherError::NotPubliclyDecryptable(*handle))
                }
            })
            .collect()
    }
}

#[async_trait]
impl DecryptionOracle for LocalCipherService {
    #[instrument(skip_all, fields(correlation_id = %ticket.correlation_id, record = %ticket.record_id))]
    async fn decrypt(&self, ticket: &DecryptionTicket) -> CipherResult<DecryptionResponse> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let cleartext = {
            let state = self.read()?;
            ticket
                .handles
                .iter()
                .map(|handle| {
                    state
                        .values
                        .get(handle)
                        .map(|sealed| sealed.value)
                        .ok_or(CipherError::UnknownHandle(*handle))
                })
                .collect::<CipherResult<Vec<_>>>()?
        };

        let digest = DecryptionProof::digest(&ticket.correlation_id, &ticket.handles, &cleartext);
        debug!("decryption produced");
        Ok(DecryptionResponse {
            correlation_id: ticket.correlation_id,
            cleartext,
            proof: DecryptionProof {
                signer: self.key.verifying_key(),
                signature: self.key.sign(&digest),
            },
        })
    }
}

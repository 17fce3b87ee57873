use std::collections::BTreeMap;

use async_trait::async_trait;
use chrona_types::{CiphertextHandle, CorrelationId, Identity, InputProof, ScopeId, Timestamp};

use crate::auth::{AuthorizationMessage, AuthorizationSignature, DecryptionKeypair};
use crate::error::CipherResult;
use crate::input::{EncryptedInput, InputBuilder};
use crate::ticket::{DecryptionProof, DecryptionResponse, DecryptionTicket};
use crate::value::ClearValue;

/// Client-side encryption of cleartext values into handles.
pub trait EncryptionService: Send + Sync {
    /// Encrypt `values` for `submitter` within `scope`.
    fn encrypt(
        &self,
        scope: &ScopeId,
        submitter: Identity,
        values: &[ClearValue],
    ) -> CipherResult<EncryptedInput>;

    /// Start an input batch bound to `scope` and `submitter`.
    fn create_encrypted_input(&self, scope: &ScopeId, submitter: Identity) -> InputBuilder<'_>
    where
        Self: Sized,
    {
        InputBuilder::new(self, scope.clone(), submitter)
    }
}

/// The operations a vault needs from the encryption service.
pub trait CipherGateway: Send + Sync {
    /// Check that `proof` binds `handles` (in order) to `scope` and `submitter`.
    fn verify_input(
        &self,
        scope: &ScopeId,
        submitter: Identity,
        handles: &[CiphertextHandle],
        proof: &InputProof,
    ) -> CipherResult<()>;

    /// Add `identity` to the access list of every handle in `handles`.
    ///
    /// All or nothing: on error no access list has changed.
    fn allow(&self, handles: &[CiphertextHandle], identity: Identity) -> CipherResult<()>;

    /// Mark every handle in `handles` decryptable by anyone. All or nothing.
    fn allow_public(&self, handles: &[CiphertextHandle]) -> CipherResult<()>;

    fn is_allowed(&self, handle: &CiphertextHandle, identity: Identity) -> CipherResult<bool>;

    /// Check a decryption result against the handles it claims to decrypt.
    fn verify_decryption(
        &self,
        correlation_id: &CorrelationId,
        handles: &[CiphertextHandle],
        cleartext: &[ClearValue],
        proof: &DecryptionProof,
    ) -> CipherResult<()>;
}

/// Decryption on behalf of a requester holding an authorization signature.
pub trait UserDecryption: Send + Sync {
    fn generate_keypair(&self) -> DecryptionKeypair {
        DecryptionKeypair::generate()
    }

    fn build_authorization_message(
        &self,
        keypair: &DecryptionKeypair,
        scopes: Vec<ScopeId>,
        start: Timestamp,
        duration_days: u32,
    ) -> CipherResult<AuthorizationMessage> {
        AuthorizationMessage::new(keypair.public_key(), scopes, start, duration_days)
    }

    /// Decrypt `handles` for `requester`. Every handle must be on the
    /// requester's access list and belong to a scope the message covers.
    fn user_decrypt(
        &self,
        handles: &[CiphertextHandle],
        keypair: &DecryptionKeypair,
        message: &AuthorizationMessage,
        signature: &AuthorizationSignature,
        requester: Identity,
    ) -> CipherResult<BTreeMap<CiphertextHandle, ClearValue>>;
}

/// Decryption of handles that were marked publicly decryptable.
pub trait PublicDecryption: Send + Sync {
    fn public_decrypt(&self, handles: &[CiphertextHandle]) -> CipherResult<Vec<ClearValue>>;
}

/// Asynchronous decryption requested by the vault itself.
#[async_trait]
pub trait DecryptionOracle: Send + Sync {
    async fn decrypt(&self, ticket: &DecryptionTicket) -> CipherResult<DecryptionResponse>;
}

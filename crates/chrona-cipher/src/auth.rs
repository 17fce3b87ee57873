//! Requester-side authorization for user decryption.
//!
//! A requester generates an ephemeral [`DecryptionKeypair`], builds an
//! [`AuthorizationMessage`] naming the keypair's public key, the scopes it
//! covers and a validity window, and signs it with their account key. The
//! decryption service only releases cleartext while the window is open and
//! only for handles whose access list names the signer.

use std::fmt;

use chrona_crypto::{ContentHasher, Signature, SigningKey, VerifyingKey};
use chrona_types::{Identity, ScopeId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::{CipherError, CipherResult};

/// Longest validity window an authorization may request.
pub const MAX_VALIDITY_DAYS: u32 = 365;

const SECS_PER_DAY: u64 = 86_400;

/// Ephemeral keypair a requester presents when asking for decryption.
#[derive(Clone)]
pub struct DecryptionKeypair {
    key: SigningKey,
}

impl DecryptionKeypair {
    pub fn generate() -> Self {
        Self {
            key: SigningKey::generate(),
        }
    }

    pub fn from_secret(bytes: [u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(bytes),
        }
    }

    pub fn public_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }

    pub fn secret_bytes(&self) -> &[u8; 32] {
        self.key.as_bytes()
    }
}

impl fmt::Debug for DecryptionKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptionKeypair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

/// Structured message a requester signs to authorize decryption.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationMessage {
    pub public_key: VerifyingKey,
    pub scopes: Vec<ScopeId>,
    pub start: Timestamp,
    pub duration_days: u32,
}

impl AuthorizationMessage {
    /// Build a message, rejecting windows outside `1..=MAX_VALIDITY_DAYS` days
    /// and empty scope lists.
    pub fn new(
        public_key: VerifyingKey,
        scopes: Vec<ScopeId>,
        start: Timestamp,
        duration_days: u32,
    ) -> CipherResult<Self> {
        if duration_days == 0 || duration_days > MAX_VALIDITY_DAYS {
            return Err(CipherError::Window(format!(
                "duration must be 1..={MAX_VALIDITY_DAYS} days, got {duration_days}"
            )));
        }
        if scopes.is_empty() {
            return Err(CipherError::InvalidAuthorization(
                "at least one scope is required".into(),
            ));
        }
        Ok(Self {
            public_key,
            scopes,
            start,
            duration_days,
        })
    }

    /// First instant at which the authorization is no longer valid.
    pub fn expires_at(&self) -> Timestamp {
        self.start
            .plus_secs(u64::from(self.duration_days).saturating_mul(SECS_PER_DAY))
    }

    pub fn is_open_at(&self, now: Timestamp) -> bool {
        now >= self.start && now < self.expires_at()
    }

    pub fn covers(&self, scope: &ScopeId) -> bool {
        self.scopes.contains(scope)
    }

    /// Domain-separated digest that gets signed.
    pub fn digest(&self) -> CipherResult<[u8; 32]> {
        ContentHasher::AUTHORIZATION
            .hash_json(self)
            .map_err(|e| CipherError::Serialization(e.to_string()))
    }

    /// Sign with the requester's account key.
    pub fn sign(&self, account: &SigningKey) -> CipherResult<AuthorizationSignature> {
        let digest = self.digest()?;
        Ok(AuthorizationSignature {
            signer: account.verifying_key(),
            signature: account.sign(&digest),
        })
    }
}

/// A requester's signature over an [`AuthorizationMessage`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationSignature {
    pub signer: VerifyingKey,
    pub signature: Signature,
}

impl AuthorizationSignature {
    pub fn signer_identity(&self) -> Identity {
        self.signer.to_identity()
    }

    pub fn verify(&self, message: &AuthorizationMessage) -> CipherResult<()> {
        let digest = message.digest()?;
        self.signer
            .verify(&digest, &self.signature)
            .map_err(|e| CipherError::InvalidAuthorization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(days: u32) -> CipherResult<AuthorizationMessage> {
        AuthorizationMessage::new(
            DecryptionKeypair::generate().public_key(),
            vec![ScopeId::default()],
            Timestamp::from_secs(1_000),
            days,
        )
    }

    #[test]
    fn window_bounds() {
        assert!(matches!(message(0), Err(CipherError::Window(_))));
        assert!(matches!(message(366), Err(CipherError::Window(_))));
        assert!(message(1).is_ok());
        assert!(message(MAX_VALIDITY_DAYS).is_ok());
    }

    #[test]
    fn window_is_half_open() {
        let msg = message(10).unwrap();
        assert_eq!(msg.expires_at(), Timestamp::from_secs(1_000 + 10 * 86_400));
        assert!(!msg.is_open_at(Timestamp::from_secs(999)));
        assert!(msg.is_open_at(Timestamp::from_secs(1_000)));
        assert!(!msg.is_open_at(msg.expires_at()));
    }

    #[test]
    fn empty_scopes_rejected() {
        let err = AuthorizationMessage::new(
            DecryptionKeypair::generate().public_key(),
            vec![],
            Timestamp::EPOCH,
            10,
        )
        .unwrap_err();
        assert!(matches!(err, CipherError::InvalidAuthorization(_)));
    }

    #[test]
    fn signature_binds_message() {
        let account = SigningKey::generate();
        let msg = message(10).unwrap();
        let sig = msg.sign(&account).unwrap();
        assert_eq!(sig.signer_identity(), account.identity());
        sig.verify(&msg).unwrap();

        let mut altered = msg.clone();
        altered.duration_days = 11;
        assert!(sig.verify(&altered).is_err());
    }

    #[test]
    fn keypair_debug_hides_secret() {
        let kp = DecryptionKeypair::generate();
        let debug = format!("{kp:?}");
        assert!(!debug.contains(&hex::encode(kp.secret_bytes())));
    }
}

use chrona_crypto::{ContentHasher, Signature, VerifyingKey};
use chrona_types::{CiphertextHandle, CorrelationId, Identity, RecordId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::value::ClearValue;

/// A pending decryption job issued by the vault.
///
/// The ticket lives until the matching completion arrives; it is not part of
/// the record's durable state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionTicket {
    pub correlation_id: CorrelationId,
    pub record_id: RecordId,
    pub handles: Vec<CiphertextHandle>,
    pub requester: Identity,
    pub requested_at: Timestamp,
}

/// Proof that a decryption result was produced by the decryption service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionProof {
    pub signer: VerifyingKey,
    pub signature: Signature,
}

impl DecryptionProof {
    /// Digest the service signs: correlation id, handles, then cleartexts.
    pub fn digest(
        correlation_id: &CorrelationId,
        handles: &[CiphertextHandle],
        cleartext: &[ClearValue],
    ) -> [u8; 32] {
        let handle_bytes: Vec<u8> = handles.iter().flat_map(|h| *h.as_bytes()).collect();
        let clear_bytes: Vec<u8> = cleartext.iter().flat_map(|v| v.canonical_bytes()).collect();
        ContentHasher::DECRYPTION.hash_parts(&[
            correlation_id.as_bytes(),
            &handle_bytes,
            &clear_bytes,
        ])
    }
}

/// The asynchronous answer to a [`DecryptionTicket`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionResponse {
    pub correlation_id: CorrelationId,
    pub cleartext: Vec<ClearValue>,
    pub proof: DecryptionProof,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_depends_on_cleartext() {
        let id = CorrelationId::new();
        let handles = [CiphertextHandle::from_bytes([3; 32])];
        let a = DecryptionProof::digest(&id, &handles, &[ClearValue::Byte(1)]);
        let b = DecryptionProof::digest(&id, &handles, &[ClearValue::Byte(2)]);
        assert_ne!(a, b);
    }

    #[test]
    fn digest_depends_on_correlation() {
        let handles = [CiphertextHandle::from_bytes([3; 32])];
        let value = [ClearValue::Byte(1)];
        assert_ne!(
            DecryptionProof::digest(&CorrelationId::new(), &handles, &value),
            DecryptionProof::digest(&CorrelationId::new(), &handles, &value)
        );
    }
}

/// An entry that participates in a hash chain.
pub trait Chained {
    /// The entry's own hash.
    fn entry_hash(&self) -> [u8; 32];
    /// The previous entry's hash (None for the first entry).
    fn prev_hash(&self) -> Option<[u8; 32]>;
    /// Canonical payload bytes for hash verification.
    fn payload_bytes(&self) -> Vec<u8>;
}

/// Hash chain integrity verifier.
///
/// Verifies that a sequence of entries forms a valid hash chain: each entry's
/// `prev_hash` matches the previous entry's hash, and each entry's hash is
/// correctly computed from its payload.
pub struct HashChainVerifier;

impl HashChainVerifier {
    /// Verify a chain of entries.
    pub fn verify_chain(entries: &[impl Chained]) -> Result<(), ChainError> {
        let Some(first) = entries.first() else {
            return Ok(());
        };

        if first.prev_hash().is_some() {
            return Err(ChainError::GenesisHasPrevHash);
        }
        if Self::compute_hash(&first.payload_bytes(), None) != first.entry_hash() {
            return Err(ChainError::HashMismatch { index: 0 });
        }

        for i in 1..entries.len() {
            let expected_prev = entries[i - 1].entry_hash();
            match entries[i].prev_hash() {
                Some(prev) if prev == expected_prev => {}
                Some(_) => return Err(ChainError::BrokenLink { index: i }),
                None => return Err(ChainError::MissingPrevHash { index: i }),
            }

            let computed = Self::compute_hash(&entries[i].payload_bytes(), Some(expected_prev));
            if computed != entries[i].entry_hash() {
                return Err(ChainError::HashMismatch { index: i });
            }
        }

        Ok(())
    }

    /// Compute the expected hash for a payload and optional previous hash.
    pub fn compute_hash(payload: &[u8], prev_hash: Option<[u8; 32]>) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"chrona-journal-v1:");
        if let Some(prev) = prev_hash {
            hasher.update(&prev);
        }
        hasher.update(payload);
        *hasher.finalize().as_bytes()
    }
}

/// Errors from chain verification.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("first entry has a previous hash (should be None)")]
    GenesisHasPrevHash,

    #[error("broken link at index {index}: prev_hash does not match")]
    BrokenLink { index: usize },

    #[error("missing prev_hash at index {index}")]
    MissingPrevHash { index: usize },

    #[error("hash mismatch at index {index}: computed hash differs from stored")]
    HashMismatch { index: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Entry {
        hash: [u8; 32],
        prev: Option<[u8; 32]>,
        payload: Vec<u8>,
    }

    impl Chained for Entry {
        fn entry_hash(&self) -> [u8; 32] {
            self.hash
        }
        fn prev_hash(&self) -> Option<[u8; 32]> {
            self.prev
        }
        fn payload_bytes(&self) -> Vec<u8> {
            self.payload.clone()
        }
    }

    fn build_chain(count: usize) -> Vec<Entry> {
        let mut chain = Vec::new();
        let mut prev = None;
        for i in 0..count {
            let payload = format!("tx-{i}").into_bytes();
            let hash = HashChainVerifier::compute_hash(&payload, prev);
            chain.push(Entry {
                hash,
                prev,
                payload,
            });
            prev = Some(hash);
        }
        chain
    }

    #[test]
    fn empty_chain_is_valid() {
        assert!(HashChainVerifier::verify_chain(&Vec::<Entry>::new()).is_ok());
    }

    #[test]
    fn well_formed_chain_verifies() {
        assert!(HashChainVerifier::verify_chain(&build_chain(5)).is_ok());
    }

    #[test]
    fn tampered_payload_is_detected() {
        let mut chain = build_chain(4);
        chain[2].payload = b"forged".to_vec();
        assert_eq!(
            HashChainVerifier::verify_chain(&chain),
            Err(ChainError::HashMismatch { index: 2 })
        );
    }

    #[test]
    fn broken_link_is_detected() {
        let mut chain = build_chain(3);
        chain[1].prev = Some([9; 32]);
        assert_eq!(
            HashChainVerifier::verify_chain(&chain),
            Err(ChainError::BrokenLink { index: 1 })
        );
    }

    #[test]
    fn genesis_with_prev_hash_is_rejected() {
        let mut chain = build_chain(1);
        chain[0].prev = Some([1; 32]);
        assert_eq!(
            HashChainVerifier::verify_chain(&chain),
            Err(ChainError::GenesisHasPrevHash)
        );
    }
}

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g., `"chrona-handle-v1"`) that is
/// prepended to every hash computation. A ciphertext handle and an event with
/// identical input bytes therefore never share a digest.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for ciphertext handle derivation.
    pub const HANDLE: Self = Self {
        domain: "chrona-handle-v1",
    };
    /// Hasher for signed input-proof statements.
    pub const INPUT_PROOF: Self = Self {
        domain: "chrona-input-proof-v1",
    };
    /// Hasher for signed decryption results.
    pub const DECRYPTION: Self = Self {
        domain: "chrona-decryption-v1",
    };
    /// Hasher for user-decryption authorization messages.
    pub const AUTHORIZATION: Self = Self {
        domain: "chrona-authorization-v1",
    };
    /// Hasher for notification identifiers.
    pub const EVENT: Self = Self {
        domain: "chrona-event-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> [u8; 32] {
        self.hash_parts(&[data])
    }

    /// Hash a sequence of byte slices with domain separation.
    ///
    /// Each part is length-prefixed so that `["ab", "c"]` and `["a", "bc"]`
    /// hash differently.
    pub fn hash_parts(&self, parts: &[&[u8]]) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        for part in parts {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        *hasher.finalize().as_bytes()
    }

    /// Hash a serializable value as JSON with domain separation.
    pub fn hash_json<T: serde::Serialize>(&self, value: &T) -> Result<[u8; 32], HasherError> {
        let data =
            serde_json::to_vec(value).map_err(|e| HasherError::Serialization(e.to_string()))?;
        Ok(self.hash(&data))
    }

    /// Verify that data produces the expected digest.
    pub fn verify(&self, data: &[u8], expected: &[u8; 32]) -> bool {
        self.hash(data) == *expected
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("serialization error: {0}")]
    Serialization(String),
}

use chrona_types::{CiphertextHandle, Identity, InputProof, ScopeId};
use serde::{Deserialize, Serialize};

use crate::error::{CipherError, CipherResult};
use crate::traits::EncryptionService;
use crate::value::ClearValue;

/// Handles produced by one encryption batch plus the proof that binds them to
/// a scope and a submitter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedInput {
    pub handles: Vec<CiphertextHandle>,
    pub proof: InputProof,
}

/// Collects cleartext values and encrypts them as one batch.
///
/// Order matters: handles come back in the order values were added.
pub struct InputBuilder<'a> {
    service: &'a dyn EncryptionService,
    scope: ScopeId,
    submitter: Identity,
    values: Vec<ClearValue>,
}

impl<'a> InputBuilder<'a> {
    pub fn new(service: &'a dyn EncryptionService, scope: ScopeId, submitter: Identity) -> Self {
        Self {
            service,
            scope,
            submitter,
            values: Vec::new(),
        }
    }

    pub fn add_address(&mut self, address: Identity) -> &mut Self {
        self.values.push(ClearValue::Address(address));
        self
    }

    pub fn add_byte(&mut self, byte: u8) -> &mut Self {
        self.values.push(ClearValue::Byte(byte));
        self
    }

    pub fn add_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.values.extend(bytes.iter().copied().map(ClearValue::Byte));
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Encrypt every collected value and produce the batch proof.
    pub fn finalize(self) -> CipherResult<EncryptedInput> {
        if self.values.is_empty() {
            return Err(CipherError::EmptyInput);
        }
        self.service
            .encrypt(&self.scope, self.submitter, &self.values)
    }
}

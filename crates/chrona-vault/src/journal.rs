use chrona_crypto::{Chained, HashChainVerifier};
use chrona_types::{Identity, Timestamp};
use serde::{Deserialize, Serialize};

use crate::transaction::{Operation, OperationOutput};

/// Hashed content of a journal entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalBody {
    pub seq: u64,
    pub committed_at: Timestamp,
    pub caller: Identity,
    pub operation: Operation,
    pub output: OperationOutput,
}

/// One committed transaction, linked to its predecessor by hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub body: JournalBody,
    pub prev_hash: Option<[u8; 32]>,
    pub entry_hash: [u8; 32],
}

impl JournalEntry {
    pub(crate) fn link(body: JournalBody, prev_hash: Option<[u8; 32]>) -> Self {
        let mut entry = Self {
            body,
            prev_hash,
            entry_hash: [0; 32],
        };
        entry.entry_hash = HashChainVerifier::compute_hash(&entry.payload_bytes(), prev_hash);
        entry
    }
}

impl Chained for JournalEntry {
    fn entry_hash(&self) -> [u8; 32] {
        self.entry_hash
    }

    fn prev_hash(&self) -> Option<[u8; 32]> {
        self.prev_hash
    }

    fn payload_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(&self.body).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use chrona_types::RecordId;

    use super::*;

    fn body(seq: u64) -> JournalBody {
        JournalBody {
            seq,
            committed_at: Timestamp::from_secs(seq * 10),
            caller: Identity::from_bytes([1; 20]),
            operation: Operation::MakePublic { id: RecordId::new(seq) },
            output: OperationOutput::MadePublic { id: RecordId::new(seq) },
        }
    }

    #[test]
    fn linked_entries_verify() {
        let first = JournalEntry::link(body(1), None);
        let second = JournalEntry::link(body(2), Some(first.entry_hash));
        HashChainVerifier::verify_chain(&[first, second]).unwrap();
    }

    #[test]
    fn edited_body_is_detected() {
        let first = JournalEntry::link(body(1), None);
        let mut second = JournalEntry::link(body(2), Some(first.entry_hash));
        second.body.caller = Identity::from_bytes([2; 20]);
        assert!(HashChainVerifier::verify_chain(&[first, second]).is_err());
    }
}

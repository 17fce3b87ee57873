use std::collections::{BTreeMap, HashSet};

use chrona_crypto::HashChainVerifier;
use chrona_index::OwnerIndex;
use chrona_store::{DisclosureState, RecordTable};
use chrona_types::{CiphertextHandle, CorrelationId, Identity, RecordId};
use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};
use crate::journal::JournalEntry;

/// Serializable image of a vault's durable state.
///
/// Restored with [`Vault::from_snapshot`](crate::Vault::from_snapshot), which
/// re-validates every cross-structure invariant before accepting it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultSnapshot {
    pub administrator: Identity,
    pub records: RecordTable,
    pub owners: OwnerIndex,
    pub pending: BTreeMap<CorrelationId, RecordId>,
    pub next_id: RecordId,
    /// Transactions processed, committed or not.
    pub transactions: u64,
    pub journal: Vec<JournalEntry>,
}

impl VaultSnapshot {
    /// Check the invariants a live vault maintains between its structures.
    pub fn validate(&self) -> VaultResult<()> {
        let corrupt = |msg: String| VaultError::CorruptSnapshot(msg);

        if self.administrator.is_null() {
            return Err(VaultError::ZeroIdentity);
        }
        if self.next_id != self.records.next_id() {
            return Err(corrupt(format!(
                "next id {} does not follow {} records",
                self.next_id,
                self.records.total_count()
            )));
        }
        let mut bound = HashSet::new();
        for (position, record) in self.records.iter().enumerate() {
            if record.id.value() != position as u64 {
                return Err(corrupt(format!("record at {position} carries id {}", record.id)));
            }
            if let Some(reused) = record.handles().find(|h| !bound.insert(**h)) {
                return Err(corrupt(format!(
                    "handle {reused} of record {} is bound twice",
                    record.id
                )));
            }
        }

        self.owners
            .verify(self.records.total_count(), |id| {
                self.records.get(id).ok().map(|r| r.owner)
            })
            .map_err(|e| corrupt(e.to_string()))?;

        for (correlation_id, id) in &self.pending {
            let record = self.records.get(*id).map_err(|e| corrupt(e.to_string()))?;
            match record.disclosure {
                DisclosureState::DisclosureRequested {
                    correlation_id: stored,
                    ..
                } if stored == *correlation_id => {}
                _ => {
                    return Err(corrupt(format!(
                        "pending request {correlation_id} does not match record {id}"
                    )))
                }
            }
        }
        let requested = self
            .records
            .iter()
            .filter(|r| matches!(r.disclosure, DisclosureState::DisclosureRequested { .. }))
            .count();
        if requested != self.pending.len() {
            return Err(corrupt(format!(
                "{requested} records await disclosure but {} requests are pending",
                self.pending.len()
            )));
        }

        HashChainVerifier::verify_chain(&self.journal).map_err(|e| corrupt(e.to_string()))?;
        Ok(())
    }

    pub(crate) fn bound_handles(&self) -> HashSet<CiphertextHandle> {
        self.records
            .iter()
            .flat_map(|r| r.handles().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrona_cipher::{EncryptionService, LocalCipherService};
    use chrona_types::{ManualClock, Timestamp};

    use super::*;
    use crate::{Vault, VaultConfig};

    const NOW: u64 = 1_700_000_000;

    fn alice() -> Identity {
        Identity::from_bytes([0xa1; 20])
    }

    fn bob() -> Identity {
        Identity::from_bytes([0xb0; 20])
    }

    fn vault_with(contents: &[&str]) -> (Vault, Arc<ManualClock>, Arc<LocalCipherService>) {
        let clock = Arc::new(ManualClock::new(Timestamp::from_secs(NOW)));
        let cipher = Arc::new(LocalCipherService::new(clock.clone()));
        let vault = Vault::new(
            Identity::from_bytes([0xad; 20]),
            VaultConfig::default(),
            clock.clone(),
            cipher.clone(),
        )
        .unwrap();
        for content in contents {
            let mut input = cipher.create_encrypted_input(vault.scope(), alice());
            input.add_address(alice()).add_bytes(content.as_bytes());
            let input = input.finalize().unwrap();
            vault
                .submit(
                    alice(),
                    input.handles[1..].to_vec(),
                    input.handles[0],
                    input.proof,
                    Timestamp::from_secs(NOW + 60),
                )
                .unwrap();
        }
        (vault, clock, cipher)
    }

    #[test]
    fn live_snapshot_validates() {
        let (vault, _, _) = vault_with(&["a", "bc"]);
        let snapshot = vault.snapshot().unwrap();
        snapshot.validate().unwrap();
        assert_eq!(snapshot.bound_handles().len(), 2 + 3);
    }

    #[test]
    fn foreign_index_entry_is_rejected() {
        let (vault, _, _) = vault_with(&["a"]);
        let mut snapshot = vault.snapshot().unwrap();
        snapshot.owners.append(bob(), RecordId::new(0)).unwrap();
        assert!(matches!(snapshot.validate(), Err(VaultError::CorruptSnapshot(_))));
    }

    #[test]
    fn tampered_journal_is_rejected() {
        let (vault, clock, cipher) = vault_with(&["a", "b"]);
        let mut snapshot = vault.snapshot().unwrap();
        snapshot.journal[0].body.caller = bob();
        assert!(matches!(
            Vault::from_snapshot(snapshot, VaultConfig::default(), clock, cipher),
            Err(VaultError::CorruptSnapshot(_))
        ));
    }

    #[test]
    fn handle_shared_between_records_is_rejected() {
        let (vault, _, _) = vault_with(&["a", "b"]);
        let mut snapshot = vault.snapshot().unwrap();
        let mut records: Vec<_> = snapshot.records.iter().cloned().collect();
        records[1].payload[0] = records[0].payload[0];
        let mut table = RecordTable::new();
        for record in records {
            table.insert(record).unwrap();
        }
        snapshot.records = table;
        assert!(matches!(snapshot.validate(), Err(VaultError::CorruptSnapshot(_))));
    }

    #[test]
    fn pending_request_without_record_state_is_rejected() {
        let (vault, _, _) = vault_with(&["a"]);
        let mut snapshot = vault.snapshot().unwrap();
        snapshot.pending.insert(CorrelationId::new(), RecordId::new(0));
        assert!(matches!(snapshot.validate(), Err(VaultError::CorruptSnapshot(_))));
    }

    #[test]
    fn null_administrator_is_rejected() {
        let (vault, _, _) = vault_with(&[]);
        let mut snapshot = vault.snapshot().unwrap();
        snapshot.administrator = Identity::NULL;
        assert_eq!(snapshot.validate().unwrap_err(), VaultError::ZeroIdentity);
    }
}

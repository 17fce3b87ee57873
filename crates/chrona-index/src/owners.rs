use std::collections::{HashMap, HashSet};

use chrona_types::{Identity, RecordId};
use serde::{Deserialize, Serialize};

use crate::error::{IndexError, IndexResult};

/// Owner to record-id lists, in creation order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerIndex {
    entries: HashMap<Identity, Vec<RecordId>>,
}

impl OwnerIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `id` to `owner`'s entry, creating the entry if needed.
    ///
    /// Ids must arrive in increasing order per owner.
    pub fn append(&mut self, owner: Identity, id: RecordId) -> IndexResult<()> {
        let entry = self.entries.entry(owner).or_default();
        if let Some(&last) = entry.last() {
            if id <= last {
                return Err(IndexError::OutOfOrder { owner, id, last });
            }
        }
        entry.push(id);
        Ok(())
    }

    /// Number of records `owner` has submitted; 0 for unknown owners.
    pub fn record_count_for(&self, owner: &Identity) -> usize {
        self.entries.get(owner).map_or(0, Vec::len)
    }

    pub fn record_id_at(&self, owner: &Identity, position: usize) -> IndexResult<RecordId> {
        let ids = self.entries.get(owner).map(Vec::as_slice).unwrap_or(&[]);
        ids.get(position).copied().ok_or(IndexError::IndexOutOfRange {
            owner: *owner,
            position,
            count: ids.len(),
        })
    }

    pub fn records_of(&self, owner: &Identity) -> Vec<RecordId> {
        self.entries.get(owner).cloned().unwrap_or_default()
    }

    /// Number of distinct owners.
    pub fn owner_count(&self) -> usize {
        self.entries.len()
    }

    /// Check the index against the record table.
    ///
    /// `owner_of` returns the owner of a record id, or `None` if the id does
    /// not exist. Every id must exist, be indexed under its owner exactly once,
    /// and appear in increasing order; `total` records must all be indexed.
    pub fn verify<F>(&self, total: u64, owner_of: F) -> IndexResult<()>
    where
        F: Fn(RecordId) -> Option<Identity>,
    {
        let mut seen = HashSet::new();
        for (owner, ids) in &self.entries {
            for pair in ids.windows(2) {
                if pair[1] <= pair[0] {
                    return Err(IndexError::Inconsistent(format!(
                        "ids for {owner} are not increasing"
                    )));
                }
            }
            for id in ids {
                match owner_of(*id) {
                    Some(actual) if actual == *owner => {}
                    Some(actual) => {
                        return Err(IndexError::Inconsistent(format!(
                            "record {id} indexed under {owner} but owned by {actual}"
                        )))
                    }
                    None => {
                        return Err(IndexError::Inconsistent(format!(
                            "record {id} indexed under {owner} does not exist"
                        )))
                    }
                }
                if !seen.insert(*id) {
                    return Err(IndexError::Inconsistent(format!(
                        "record {id} indexed twice"
                    )));
                }
            }
        }
        if seen.len() as u64 != total {
            return Err(IndexError::Inconsistent(format!(
                "{} of {total} records indexed",
                seen.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        Identity::from_bytes([0xa1; 20])
    }

    fn bob() -> Identity {
        Identity::from_bytes([0xb0; 20])
    }

    #[test]
    fn unknown_owner_is_empty() {
        let index = OwnerIndex::new();
        assert_eq!(index.record_count_for(&alice()), 0);
        assert_eq!(
            index.record_id_at(&alice(), 0).unwrap_err(),
            IndexError::IndexOutOfRange {
                owner: alice(),
                position: 0,
                count: 0
            }
        );
        assert!(index.records_of(&alice()).is_empty());
    }

    #[test]
    fn interleaved_owners_keep_creation_order() {
        let mut index = OwnerIndex::new();
        index.append(alice(), RecordId::new(0)).unwrap();
        index.append(bob(), RecordId::new(1)).unwrap();
        index.append(alice(), RecordId::new(2)).unwrap();

        assert_eq!(index.record_count_for(&alice()), 2);
        assert_eq!(index.record_id_at(&alice(), 0).unwrap(), RecordId::new(0));
        assert_eq!(index.record_id_at(&alice(), 1).unwrap(), RecordId::new(2));
        assert_eq!(index.record_id_at(&bob(), 0).unwrap(), RecordId::new(1));
        assert_eq!(index.owner_count(), 2);
    }

    #[test]
    fn append_rejects_out_of_order() {
        let mut index = OwnerIndex::new();
        index.append(alice(), RecordId::new(3)).unwrap();
        assert!(matches!(
            index.append(alice(), RecordId::new(3)),
            Err(IndexError::OutOfOrder { .. })
        ));
    }

    #[test]
    fn verify_detects_wrong_owner_and_missing_ids() {
        let mut index = OwnerIndex::new();
        index.append(alice(), RecordId::new(0)).unwrap();
        index.append(bob(), RecordId::new(1)).unwrap();

        let owners = [alice(), bob()];
        let owner_of = |id: RecordId| owners.get(id.value() as usize).copied();
        index.verify(2, owner_of).unwrap();
        assert!(index.verify(3, owner_of).is_err());
        assert!(index.verify(2, |_| Some(alice())).is_err());
        assert!(index.verify(2, |_| None).is_err());
    }

    proptest::proptest! {
        #[test]
        fn every_indexed_id_belongs_to_its_owner(owners in proptest::collection::vec(0u8..4, 0..60)) {
            let mut index = OwnerIndex::new();
            let ids: Vec<Identity> = owners.iter().map(|o| Identity::from_bytes([*o; 20])).collect();
            for (i, owner) in ids.iter().enumerate() {
                index.append(*owner, RecordId::new(i as u64)).unwrap();
            }
            index.verify(ids.len() as u64, |id| ids.get(id.value() as usize).copied()).unwrap();
            for owner in &ids {
                let count = index.record_count_for(owner);
                proptest::prop_assert_eq!(count, ids.iter().filter(|o| *o == owner).count());
                for p in 0..count {
                    let id = index.record_id_at(owner, p).unwrap();
                    proptest::prop_assert_eq!(ids[id.value() as usize], *owner);
                }
            }
        }
    }
}

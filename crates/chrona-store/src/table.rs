use std::ops::Range;

use chrona_types::{CiphertextHandle, RecordId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::record::Record;
use crate::stats::VaultStats;

/// Append-only table of records.
///
/// A record's id equals its position, so ids are dense and start at 0.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordTable {
    records: Vec<Record>,
}

impl RecordTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The id the next inserted record must carry.
    pub fn next_id(&self) -> RecordId {
        RecordId::new(self.records.len() as u64)
    }

    /// Number of records ever stored.
    pub fn total_count(&self) -> u64 {
        self.records.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append a record. Its id must equal [`next_id`](Self::next_id).
    pub fn insert(&mut self, record: Record) -> StoreResult<RecordId> {
        let expected = self.next_id();
        if record.id != expected {
            return Err(StoreError::OutOfSequence {
                expected,
                actual: record.id,
            });
        }
        self.records.push(record);
        Ok(expected)
    }

    pub fn get(&self, id: RecordId) -> StoreResult<&Record> {
        usize::try_from(id.value())
            .ok()
            .and_then(|i| self.records.get(i))
            .ok_or(StoreError::NotFound(id))
    }

    pub fn get_mut(&mut self, id: RecordId) -> StoreResult<&mut Record> {
        usize::try_from(id.value())
            .ok()
            .and_then(|i| self.records.get_mut(i))
            .ok_or(StoreError::NotFound(id))
    }

    pub fn handle_at(&self, id: RecordId, index: usize) -> StoreResult<CiphertextHandle> {
        let record = self.get(id)?;
        record
            .payload
            .get(index)
            .copied()
            .ok_or(StoreError::IndexOutOfRange {
                id,
                index,
                len: record.payload.len(),
            })
    }

    pub fn payload_len(&self, id: RecordId) -> StoreResult<usize> {
        Ok(self.get(id)?.payload_len())
    }

    /// Records whose ids fall in `range`, clamped to what exists.
    pub fn range(&self, range: Range<u64>) -> &[Record] {
        let len = self.records.len() as u64;
        let start = range.start.min(len) as usize;
        let end = range.end.min(len).max(start as u64) as usize;
        &self.records[start..end]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub fn stats(&self, now: Timestamp) -> VaultStats {
        let mut stats = VaultStats::default();
        for record in &self.records {
            stats.record(record.phase(now));
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use chrona_types::{CorrelationId, Identity};

    use super::*;
    use crate::record::DisclosureState;

    fn record(id: u64, len: usize) -> Record {
        Record::new(
            RecordId::new(id),
            Identity::from_bytes([1; 20]),
            (0..len)
                .map(|i| CiphertextHandle::from_bytes([i as u8; 32]))
                .collect(),
            CiphertextHandle::from_bytes([0xff; 32]),
            Timestamp::from_secs(100),
            Timestamp::from_secs(10),
        )
    }

    #[test]
    fn insert_requires_next_id() {
        let mut table = RecordTable::new();
        assert_eq!(table.insert(record(0, 1)).unwrap(), RecordId::new(0));
        assert_eq!(
            table.insert(record(5, 1)).unwrap_err(),
            StoreError::OutOfSequence {
                expected: RecordId::new(1),
                actual: RecordId::new(5)
            }
        );
        assert_eq!(table.total_count(), 1);
    }

    #[test]
    fn get_unknown_is_not_found() {
        let table = RecordTable::new();
        assert_eq!(
            table.get(RecordId::new(0)).unwrap_err(),
            StoreError::NotFound(RecordId::new(0))
        );
        assert_eq!(
            table.get(RecordId::new(u64::MAX)).unwrap_err(),
            StoreError::NotFound(RecordId::new(u64::MAX))
        );
    }

    #[test]
    fn handle_at_bounds() {
        let mut table = RecordTable::new();
        table.insert(record(0, 3)).unwrap();
        let id = RecordId::new(0);
        assert_eq!(table.payload_len(id).unwrap(), 3);
        assert_eq!(
            table.handle_at(id, 2).unwrap(),
            CiphertextHandle::from_bytes([2; 32])
        );
        assert_eq!(
            table.handle_at(id, 3).unwrap_err(),
            StoreError::IndexOutOfRange { id, index: 3, len: 3 }
        );
        assert_eq!(
            table.handle_at(RecordId::new(1), 0).unwrap_err(),
            StoreError::NotFound(RecordId::new(1))
        );
    }

    #[test]
    fn range_clamps() {
        let mut table = RecordTable::new();
        for i in 0..5 {
            table.insert(record(i, 1)).unwrap();
        }
        assert_eq!(table.range(1..3).len(), 2);
        assert_eq!(table.range(3..100).len(), 2);
        assert!(table.range(10..20).is_empty());
        assert!(table.range(4..2).is_empty());
    }

    #[test]
    fn stats_count_phases() {
        let mut table = RecordTable::new();
        for i in 0..4 {
            table.insert(record(i, 1)).unwrap();
        }
        table.get_mut(RecordId::new(1)).unwrap().disclosure =
            DisclosureState::PubliclyDisclosed { at: Timestamp::from_secs(100) };
        table.get_mut(RecordId::new(2)).unwrap().disclosure =
            DisclosureState::DisclosureRequested {
                correlation_id: CorrelationId::new(),
                requested_at: Timestamp::from_secs(100),
            };

        let before = table.stats(Timestamp::from_secs(50));
        assert_eq!(before.total, 4);
        assert_eq!(before.locked, 2);
        assert_eq!(before.publicly_disclosed, 1);
        assert_eq!(before.pending, 1);

        let after = table.stats(Timestamp::from_secs(100));
        assert_eq!(after.locked, 0);
        assert_eq!(after.eligible, 2);
    }

    proptest::proptest! {
        #[test]
        fn ids_are_dense(count in 0usize..40) {
            let mut table = RecordTable::new();
            for i in 0..count {
                let id = table.insert(record(table.next_id().value(), 1)).unwrap();
                proptest::prop_assert_eq!(id.value(), i as u64);
            }
            proptest::prop_assert_eq!(table.total_count(), count as u64);
        }
    }
}

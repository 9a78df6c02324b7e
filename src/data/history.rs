//! Finalized measurement history.

use std::collections::VecDeque;

use bodywatch_types::{FinalMeasurement, RecordId};

/// Finalized records, newest first.
///
/// New records are always prepended. Existing entries are never modified;
/// the only way to remove one is [`History::clear`].
#[derive(Debug, Clone, Default)]
pub struct History {
    records: VecDeque<FinalMeasurement>,
}

impl History {
    /// Create a new empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from records that are already newest first.
    pub fn from_records(records: Vec<FinalMeasurement>) -> Self {
        Self {
            records: records.into(),
        }
    }

    /// Record a newly finalized measurement.
    pub fn record(&mut self, record: FinalMeasurement) {
        self.records.push_front(record);
    }

    pub fn latest(&self) -> Option<&FinalMeasurement> {
        self.records.front()
    }

    pub fn get(&self, id: RecordId) -> Option<&FinalMeasurement> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Largest id present, used to resume id allocation.
    pub fn max_id(&self) -> Option<RecordId> {
        self.records.iter().map(|r| r.id).max()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FinalMeasurement> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Copy out for the durable cache.
    pub fn to_vec(&self) -> Vec<FinalMeasurement> {
        self.records.iter().cloned().collect()
    }
}

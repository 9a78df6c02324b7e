//! Durable state: the measurement history cache and keyed local files.
//!
//! The reconciler only sees the [`HistoryStore`] trait so it can run
//! against [`MemoryStore`] in tests and [`JsonFileStore`] in the binary.

mod file;

pub use file::{JsonFile, JsonFileStore, LocalStore};

use std::fmt::Debug;
use std::sync::Arc;

use anyhow::Result;
use bodywatch_types::FinalMeasurement;
use parking_lot::Mutex;

/// Read/clear access to previously finalized measurements.
pub trait HistoryStore: Send + Debug {
    /// Load the cached history, newest first.
    fn load(&self) -> Result<Vec<FinalMeasurement>>;

    /// Replace the cached history.
    fn save(&mut self, records: &[FinalMeasurement]) -> Result<()>;

    /// Remove the cached history entirely.
    fn clear(&mut self) -> Result<()>;
}

/// In-memory history store.
///
/// Clones share the same contents, so a test can keep one handle while the
/// reconciler owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<Option<Vec<FinalMeasurement>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the given cached records.
    pub fn with_records(records: Vec<FinalMeasurement>) -> Self {
        Self {
            records: Arc::new(Mutex::new(Some(records))),
        }
    }

    /// True when nothing is cached (never saved, or cleared).
    pub fn is_cleared(&self) -> bool {
        self.records.lock().is_none()
    }

    /// Snapshot of the cached records.
    pub fn records(&self) -> Vec<FinalMeasurement> {
        self.records.lock().clone().unwrap_or_default()
    }
}

impl HistoryStore for MemoryStore {
    fn load(&self) -> Result<Vec<FinalMeasurement>> {
        Ok(self.records())
    }

    fn save(&mut self, records: &[FinalMeasurement]) -> Result<()> {
        *self.records.lock() = Some(records.to_vec());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        *self.records.lock() = None;
        Ok(())
    }
}

//! Durable local storage of the full dataset under one fixed key.

use chrono::{DateTime, Utc};

use crate::dataset::Dataset;
use crate::error::{TaskcalError, TaskcalResult};
use crate::store::kv::KeyValue;

/// The fixed key holding the serialized dataset.
pub const DATA_KEY: &str = "taskcal-data";

#[derive(Clone)]
pub struct LocalStore<K: KeyValue> {
    kv: K,
}

impl<K: KeyValue> LocalStore<K> {
    pub fn new(kv: K) -> Self {
        LocalStore { kv }
    }

    /// Read the stored dataset. `Ok(None)` means nothing stored yet (a valid
    /// empty state, not an error); unparseable content is `CorruptData` so
    /// callers can log the difference before falling back to empty.
    pub fn read(&self) -> TaskcalResult<Option<Dataset>> {
        let Some(text) = self.kv.get(DATA_KEY)? else {
            return Ok(None);
        };

        let value: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| TaskcalError::CorruptData(e.to_string()))?;

        Ok(Some(Dataset::from_local_value(value)))
    }

    /// Write the dataset, stamping `localTimestamp` with the write time.
    /// The caller's copy is not mutated, and task-level `lastModified`
    /// values are untouched. On failure the in-memory dataset remains
    /// authoritative for the session; there is no rollback to do.
    pub fn write(&self, dataset: &Dataset) -> TaskcalResult<DateTime<Utc>> {
        let stamped_at = Utc::now();

        let mut copy = dataset.clone();
        copy.meta.local_timestamp = Some(stamped_at);

        let text = serde_json::to_string(&copy)
            .map_err(|e| TaskcalError::Serialization(e.to_string()))?;
        self.kv.set(DATA_KEY, &text)?;

        Ok(stamped_at)
    }
}

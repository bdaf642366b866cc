//! The day-bucket dataset and its document form.
//!
//! On the wire a dataset is a single JSON object whose keys are mostly day
//! buckets (`"2024-3-4": [tasks...]`) with a handful of sync metadata fields
//! mixed in as siblings (`lastSyncedAt`, `syncVersion`, ...). Reading
//! partitions the two by type, so metadata can never be iterated as a day
//! bucket; writing re-attaches the metadata at the persistence boundary.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc, Weekday};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use tracing::debug;

use crate::date::DateKey;
use crate::task::{RawTask, Task, TaskKind};

/// Transient sync metadata carried alongside the day buckets. Informational
/// only; stripped whenever the dataset is treated as pure task data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synced_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_info: Option<MergeInfo>,
}

const META_KEYS: [&str; 5] = [
    "lastSyncedAt",
    "syncedFrom",
    "localTimestamp",
    "syncVersion",
    "mergeInfo",
];

/// Observability record left behind by the merge engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MergeInfo {
    pub local_task_count: usize,
    pub remote_task_count: usize,
    pub final_task_count: usize,
    pub tasks_added: usize,
    pub tasks_updated: usize,
    pub cross_week_blocks: usize,
    pub merged_at: Option<DateTime<Utc>>,
}

/// The full day-keyed task collection for one user.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub days: BTreeMap<DateKey, Vec<Task>>,
    pub meta: SyncMeta,
}

/// How loosely-shaped input tasks are converted at the read boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadMode {
    /// Local data: full repair, ids assigned.
    Repair,
    /// Remote data: best-effort, junk dropped, no ids fabricated.
    Sanitize,
}

impl Dataset {
    pub fn task_count(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.days.values().all(Vec::is_empty)
    }

    /// Read a locally stored document value. Total: anything unusable is
    /// repaired or dropped, and every surviving task has an id.
    pub fn from_local_value(value: Value) -> Dataset {
        Self::from_value(value, ReadMode::Repair)
    }

    /// Read a remote document value. Total: non-array buckets coerce to
    /// empty, entries lacking both id and title are dropped, and ids are
    /// never fabricated (the merge engine assigns them later).
    pub fn from_remote_value(value: Value) -> Dataset {
        Self::from_value(value, ReadMode::Sanitize)
    }

    fn from_value(value: Value, mode: ReadMode) -> Dataset {
        let Value::Object(map) = value else {
            debug!("document root is not an object; treating as empty dataset");
            return Dataset::default();
        };

        let mut dataset = Dataset::default();
        let mut meta_fields = serde_json::Map::new();

        for (key, value) in map {
            if let Some(date) = DateKey::parse(&key) {
                dataset.days.insert(date, read_bucket(value, mode));
            } else if META_KEYS.contains(&key.as_str()) {
                meta_fields.insert(key, value);
            } else {
                debug!(key, "dropping unrecognized document field");
            }
        }

        dataset.meta =
            serde_json::from_value(Value::Object(meta_fields)).unwrap_or_default();
        dataset
    }

    /// The document form: day buckets plus whatever metadata is set.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// A copy with all sync metadata stripped, for consumers that must see
    /// pure task data.
    pub fn without_meta(&self) -> Dataset {
        Dataset {
            days: self.days.clone(),
            meta: SyncMeta::default(),
        }
    }

    /// Populate the week containing `date` with the standard recurring
    /// schedule: planning on Sunday, reflection on Friday, a check-in
    /// Monday through Thursday, nothing on Saturday. Only buckets that are
    /// missing or empty are touched. Returns how many tasks were added.
    pub fn ensure_week(&mut self, date: DateKey) -> usize {
        let start = date.week_start();
        let mut added = 0;

        for offset in 0..7 {
            let day = start.add_days(offset);
            let bucket = self.days.entry(day).or_default();
            if !bucket.is_empty() {
                continue;
            }

            let kind = match day.weekday() {
                Weekday::Sun => Some(TaskKind::Planning),
                Weekday::Fri => Some(TaskKind::Reflection),
                Weekday::Mon | Weekday::Tue | Weekday::Wed | Weekday::Thu => {
                    Some(TaskKind::Checkin)
                }
                Weekday::Sat => None,
            };

            if let Some(kind) = kind {
                bucket.push(Task::recurring(kind, day));
                added += 1;
            }
        }

        added
    }
}

fn read_bucket(value: Value, mode: ReadMode) -> Vec<Task> {
    let Value::Array(entries) = value else {
        debug!("day bucket is not an array; coercing to empty");
        return Vec::new();
    };

    entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<RawTask>(entry).ok())
        .filter_map(|raw| match mode {
            ReadMode::Repair => Some(raw.repair()),
            ReadMode::Sanitize => raw.sanitize(),
        })
        .collect()
}

impl Serialize for Dataset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (date, tasks) in &self.days {
            map.serialize_entry(&date.to_string(), tasks)?;
        }
        if let Some(v) = &self.meta.last_synced_at {
            map.serialize_entry("lastSyncedAt", v)?;
        }
        if let Some(v) = &self.meta.synced_from {
            map.serialize_entry("syncedFrom", v)?;
        }
        if let Some(v) = &self.meta.local_timestamp {
            map.serialize_entry("localTimestamp", v)?;
        }
        if let Some(v) = &self.meta.sync_version {
            map.serialize_entry("syncVersion", v)?;
        }
        if let Some(v) = &self.meta.merge_info {
            map.serialize_entry("mergeInfo", v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitions_day_keys_from_metadata() {
        let dataset = Dataset::from_local_value(serde_json::json!({
            "2024-3-4": [{ "title": "A task" }],
            "lastSyncedAt": "2024-03-04T10:00:00Z",
            "syncVersion": 3,
            "someUnknownField": { "nested": true }
        }));

        assert_eq!(dataset.days.len(), 1, "metadata must not become a bucket");
        assert_eq!(dataset.task_count(), 1);
        assert_eq!(dataset.meta.sync_version, Some(3));
        assert!(dataset.meta.last_synced_at.is_some());
    }

    #[test]
    fn local_read_assigns_ids_remote_read_does_not() {
        let doc = serde_json::json!({ "2024-3-4": [{ "title": "No id yet" }] });

        let local = Dataset::from_local_value(doc.clone());
        assert!(local.days.values().flatten().all(|t| t.id.is_some()));

        let remote = Dataset::from_remote_value(doc);
        assert!(remote.days.values().flatten().all(|t| t.id.is_none()));
    }

    #[test]
    fn remote_read_coerces_malformed_buckets() {
        let dataset = Dataset::from_remote_value(serde_json::json!({
            "2024-3-4": "not-an-array",
            "2024-3-5": [{ "reflection": "junk, no id or title" }, { "title": "Kept" }]
        }));

        assert_eq!(dataset.days[&DateKey::parse("2024-3-4").unwrap()].len(), 0);
        let tuesday = &dataset.days[&DateKey::parse("2024-3-5").unwrap()];
        assert_eq!(tuesday.len(), 1);
        assert_eq!(tuesday[0].title, "Kept");
    }

    #[test]
    fn roundtrips_through_document_form() {
        let mut dataset = Dataset::default();
        dataset.ensure_week(DateKey::parse("2024-3-6").unwrap());
        dataset.meta.synced_from = Some("taskcal".to_string());
        dataset.meta.sync_version = Some(7);

        let reread = Dataset::from_local_value(dataset.to_value());
        assert_eq!(reread.task_count(), dataset.task_count());
        assert_eq!(reread.meta.sync_version, Some(7));
        assert_eq!(reread.days.len(), dataset.days.len());
    }

    #[test]
    fn ensure_week_follows_the_recurring_schedule() {
        let mut dataset = Dataset::default();
        // 2024-03-06 is a Wednesday; the containing week starts Mon 2024-03-04.
        let added = dataset.ensure_week(DateKey::parse("2024-3-6").unwrap());
        assert_eq!(added, 6, "four check-ins + reflection + planning");
        assert_eq!(dataset.days.len(), 7, "every day gets a bucket, Saturday stays empty");

        let sunday = &dataset.days[&DateKey::parse("2024-3-10").unwrap()];
        assert_eq!(sunday[0].title, "Weekly Planning");
        let friday = &dataset.days[&DateKey::parse("2024-3-8").unwrap()];
        assert_eq!(friday[0].title, "Friday Reflection");
        let saturday = &dataset.days[&DateKey::parse("2024-3-9").unwrap()];
        assert!(saturday.is_empty());

        // Idempotent: a second pass adds nothing.
        assert_eq!(dataset.ensure_week(DateKey::parse("2024-3-4").unwrap()), 0);
    }

    #[test]
    fn without_meta_strips_everything_transient() {
        let mut dataset = Dataset::default();
        dataset.meta.merge_info = Some(MergeInfo::default());
        dataset.meta.local_timestamp = Some(Utc::now());

        let stripped = dataset.without_meta();
        assert!(stripped.meta.merge_info.is_none());
        assert!(stripped.meta.local_timestamp.is_none());
    }
}

//! Synchronous key-value storage primitive.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::error::{TaskcalError, TaskcalResult};

/// The storage contract the core relies on: synchronous get/set/remove by
/// string key. Implementations are cheap to clone and share one backing
/// store across clones.
pub trait KeyValue: Clone {
    fn get(&self, key: &str) -> TaskcalResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> TaskcalResult<()>;
    fn remove(&self, key: &str) -> TaskcalResult<()>;
}

/// File-backed store: one file per key under the data directory. Writes go
/// through a temp file and an atomic rename.
#[derive(Clone)]
pub struct FileKv {
    dir: PathBuf,
}

impl FileKv {
    pub fn new(dir: PathBuf) -> Self {
        FileKv { dir }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValue for FileKv {
    fn get(&self, key: &str) -> TaskcalResult<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TaskcalError::Storage(format!("Could not read '{key}': {e}"))),
        }
    }

    fn set(&self, key: &str, value: &str) -> TaskcalResult<()> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| TaskcalError::Storage(format!("Could not create data dir: {e}")))?;

        let path = self.path_for(key);
        let temp = self.dir.join(format!("{key}.json.tmp"));

        std::fs::write(&temp, value)
            .map_err(|e| TaskcalError::Storage(format!("Could not write '{key}': {e}")))?;
        std::fs::rename(&temp, &path)
            .map_err(|e| TaskcalError::Storage(format!("Could not commit '{key}': {e}")))?;

        Ok(())
    }

    fn remove(&self, key: &str) -> TaskcalResult<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TaskcalError::Storage(format!("Could not remove '{key}': {e}"))),
        }
    }
}

/// In-memory store for tests.
#[derive(Clone, Default)]
pub struct MemoryKv {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValue for MemoryKv {
    fn get(&self, key: &str) -> TaskcalResult<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> TaskcalResult<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> TaskcalResult<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_kv_roundtrip_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let kv = FileKv::new(dir.path().to_path_buf());

        assert_eq!(kv.get("missing").unwrap(), None);

        kv.set("data", "{\"a\":1}").unwrap();
        assert_eq!(kv.get("data").unwrap().as_deref(), Some("{\"a\":1}"));

        kv.set("data", "{\"a\":2}").unwrap();
        assert_eq!(kv.get("data").unwrap().as_deref(), Some("{\"a\":2}"));

        kv.remove("data").unwrap();
        assert_eq!(kv.get("data").unwrap(), None);
        kv.remove("data").unwrap();
    }

    #[test]
    fn clones_share_the_backing_store() {
        let kv = MemoryKv::new();
        let other = kv.clone();
        kv.set("k", "v").unwrap();
        assert_eq!(other.get("k").unwrap().as_deref(), Some("v"));
    }
}

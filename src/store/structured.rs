//! Versioned, partitioned record store for values that don't belong in the
//! simple key/value blob (folder grants, course metadata).

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::StoreError;
use crate::store::kv::{sanitize_key, write_atomic};

const META_FILE: &str = "meta.json";

pub trait StructuredStore {
    /// Returns only once the write is durable.
    fn put(&mut self, partition: &str, key: &str, value: &Value) -> Result<(), StoreError>;
    fn get(&self, partition: &str, key: &str) -> Result<Option<Value>, StoreError>;
    fn delete(&mut self, partition: &str, key: &str) -> Result<(), StoreError>;
    /// Remove the whole store. Every later call fails until [`reopen`](Self::reopen).
    fn destroy(&mut self) -> Result<(), StoreError>;
    fn reopen(&mut self) -> Result<(), StoreError>;
    fn version(&self) -> u32;
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct StoreMeta {
    version: u32,
    partitions: Vec<String>,
}

/// Directory-backed store: `meta.json` plus one directory per partition and
/// one JSON file per key.
pub struct FileStructuredStore {
    root: PathBuf,
    version: u32,
    partitions: Vec<String>,
    meta: Option<StoreMeta>,
}

impl FileStructuredStore {
    /// Open (creating or upgrading) the store named `name` under `base_dir`.
    /// Upgrades only add partitions; existing ones and their data are kept.
    pub fn open(
        base_dir: &Path,
        name: &str,
        version: u32,
        partitions: &[&str],
    ) -> Result<Self, StoreError> {
        let mut store = Self {
            root: base_dir.join(name),
            version,
            partitions: partitions.iter().map(|p| p.to_string()).collect(),
            meta: None,
        };
        store.reopen()?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn meta(&self) -> Result<&StoreMeta, StoreError> {
        self.meta
            .as_ref()
            .ok_or_else(|| StoreError::Unavailable("store was destroyed; reopen required".into()))
    }

    fn partition_dir(&self, partition: &str) -> Result<PathBuf, StoreError> {
        if self.meta()?.partitions.iter().any(|p| p == partition) {
            Ok(self.root.join(sanitize_key(partition)))
        } else {
            Err(StoreError::UnknownPartition(partition.to_string()))
        }
    }

    fn record_path(&self, partition: &str, key: &str) -> Result<PathBuf, StoreError> {
        Ok(self
            .partition_dir(partition)?
            .join(format!("{}.json", sanitize_key(key))))
    }

    fn load_meta(path: &Path) -> Result<StoreMeta, StoreError> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(StoreMeta::default()),
            Err(e) => Err(e.into()),
        }
    }
}

impl StructuredStore for FileStructuredStore {
    fn put(&mut self, partition: &str, key: &str, value: &Value) -> Result<(), StoreError> {
        let dir = self.partition_dir(partition)?;
        fs::create_dir_all(&dir)?;
        let path = self.record_path(partition, key)?;
        write_atomic(&path, &serde_json::to_vec_pretty(value)?)
    }

    fn get(&self, partition: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let path = self.record_path(partition, key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&mut self, partition: &str, key: &str) -> Result<(), StoreError> {
        let path = self.record_path(partition, key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn destroy(&mut self) -> Result<(), StoreError> {
        self.meta = None;
        match fs::remove_dir_all(&self.root) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn reopen(&mut self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root)?;
        let meta_path = self.root.join(META_FILE);
        let mut meta = Self::load_meta(&meta_path)?;

        if meta.version > self.version {
            return Err(StoreError::VersionTooNew {
                found: meta.version,
                supported: self.version,
            });
        }
        if meta.version < self.version {
            for partition in &self.partitions {
                if !meta.partitions.contains(partition) {
                    fs::create_dir_all(self.root.join(sanitize_key(partition)))?;
                    meta.partitions.push(partition.clone());
                }
            }
            info!(
                store = %self.root.display(),
                from = meta.version,
                to = self.version,
                "upgrading structured store"
            );
            meta.version = self.version;
            write_atomic(&meta_path, &serde_json::to_vec_pretty(&meta)?)?;
        }

        self.meta = Some(meta);
        Ok(())
    }

    fn version(&self) -> u32 {
        self.meta.as_ref().map_or(0, |m| m.version)
    }
}

/// In-process store with switchable failures.
#[derive(Debug)]
pub struct MemoryStructuredStore {
    records: HashMap<(String, String), Value>,
    partitions: BTreeSet<String>,
    version: u32,
    destroyed: bool,
    fail_writes: bool,
    fail_reads: bool,
}

impl Default for MemoryStructuredStore {
    fn default() -> Self {
        Self::new(
            crate::store::schema::DB_VERSION,
            crate::store::schema::PARTITIONS,
        )
    }
}

impl MemoryStructuredStore {
    pub fn new(version: u32, partitions: &[&str]) -> Self {
        Self {
            records: HashMap::new(),
            partitions: partitions.iter().map(|p| p.to_string()).collect(),
            version,
            destroyed: false,
            fail_writes: false,
            fail_reads: false,
        }
    }

    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn set_fail_reads(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn check(&self, partition: &str) -> Result<(), StoreError> {
        if self.destroyed {
            return Err(StoreError::Unavailable("store was destroyed; reopen required".into()));
        }
        if !self.partitions.contains(partition) {
            return Err(StoreError::UnknownPartition(partition.to_string()));
        }
        Ok(())
    }
}

impl StructuredStore for MemoryStructuredStore {
    fn put(&mut self, partition: &str, key: &str, value: &Value) -> Result<(), StoreError> {
        self.check(partition)?;
        if self.fail_writes {
            return Err(StoreError::Unavailable("transaction aborted".into()));
        }
        self.records
            .insert((partition.to_string(), key.to_string()), value.clone());
        Ok(())
    }

    fn get(&self, partition: &str, key: &str) -> Result<Option<Value>, StoreError> {
        self.check(partition)?;
        if self.fail_reads {
            return Err(StoreError::Unavailable("transaction aborted".into()));
        }
        Ok(self
            .records
            .get(&(partition.to_string(), key.to_string()))
            .cloned())
    }

    fn delete(&mut self, partition: &str, key: &str) -> Result<(), StoreError> {
        self.check(partition)?;
        if self.fail_writes {
            return Err(StoreError::Unavailable("transaction aborted".into()));
        }
        self.records.remove(&(partition.to_string(), key.to_string()));
        Ok(())
    }

    fn destroy(&mut self) -> Result<(), StoreError> {
        self.records.clear();
        self.destroyed = true;
        Ok(())
    }

    fn reopen(&mut self) -> Result<(), StoreError> {
        self.destroyed = false;
        Ok(())
    }

    fn version(&self) -> u32 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    const V1: &[&str] = &["folderHandle"];
    const V2: &[&str] = &["folderHandle", "coursePath"];

    #[test]
    fn put_get_delete() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStructuredStore::open(dir.path(), "db", 2, V2).unwrap();
        store.put("coursePath", "courseInfo", &json!({"name": "Rust"})).unwrap();
        assert_eq!(
            store.get("coursePath", "courseInfo").unwrap(),
            Some(json!({"name": "Rust"}))
        );
        store.delete("coursePath", "courseInfo").unwrap();
        assert_eq!(store.get("coursePath", "courseInfo").unwrap(), None);
        store.delete("coursePath", "courseInfo").unwrap();
    }

    #[test]
    fn unknown_partition_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStructuredStore::open(dir.path(), "db", 1, V1).unwrap();
        assert!(matches!(
            store.put("coursePath", "courseInfo", &json!(1)),
            Err(StoreError::UnknownPartition(_))
        ));
    }

    #[test]
    fn upgrade_adds_partitions_and_keeps_data() {
        let dir = TempDir::new().unwrap();
        {
            let mut v1 = FileStructuredStore::open(dir.path(), "db", 1, V1).unwrap();
            v1.put("folderHandle", "folderHandle", &json!({"root": "/c"}))
                .unwrap();
        }
        let mut v2 = FileStructuredStore::open(dir.path(), "db", 2, V2).unwrap();
        assert_eq!(v2.version(), 2);
        assert_eq!(
            v2.get("folderHandle", "folderHandle").unwrap(),
            Some(json!({"root": "/c"}))
        );
        v2.put("coursePath", "courseInfo", &json!({})).unwrap();
    }

    #[test]
    fn newer_store_is_rejected() {
        let dir = TempDir::new().unwrap();
        FileStructuredStore::open(dir.path(), "db", 3, V2).unwrap();
        assert!(matches!(
            FileStructuredStore::open(dir.path(), "db", 2, V2),
            Err(StoreError::VersionTooNew { found: 3, supported: 2 })
        ));
    }

    #[test]
    fn destroy_then_reopen_starts_empty() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStructuredStore::open(dir.path(), "db", 2, V2).unwrap();
        store.put("folderHandle", "folderHandle", &json!(1)).unwrap();
        store.destroy().unwrap();
        assert!(!store.root().exists());
        assert!(store.get("folderHandle", "folderHandle").is_err());

        store.reopen().unwrap();
        assert_eq!(store.get("folderHandle", "folderHandle").unwrap(), None);
        assert_eq!(store.version(), 2);
    }

    #[test]
    fn memory_store_failures() {
        let mut store = MemoryStructuredStore::default();
        store.put("coursePath", "courseInfo", &json!(1)).unwrap();
        store.set_fail_writes(true);
        assert!(store.delete("coursePath", "courseInfo").is_err());
        assert_eq!(store.len(), 1);
        store.set_fail_reads(true);
        assert!(store.get("coursePath", "courseInfo").is_err());
    }
}

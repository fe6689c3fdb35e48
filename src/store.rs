//! Installed-module storage.
//!
//! The routing core only needs three questions answered by persistent
//! storage: is a module installed, record an installation, forget one.
//! [`ModuleStore`] is that seam; [`JsonModuleStore`] keeps the records in a
//! JSON file and [`InMemoryModuleStore`] keeps them in memory.

use crate::persist::FileLock;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

/// An installed module record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRecord {
    /// Module name
    pub name: String,
    /// Version from the module manifest at install time
    pub version: String,
}

/// Persistent record of installed modules.
pub trait ModuleStore: Send + Sync {
    /// Whether a record exists for `name`.
    fn is_installed(&self, name: &str) -> Result<bool>;

    /// Insert (or overwrite) the record for `record.name`.
    fn insert(&self, record: &ModuleRecord) -> Result<()>;

    /// Delete the record for `name`. Returns `false` if there was none.
    fn delete(&self, name: &str) -> Result<bool>;

    /// All records, in insertion order.
    fn records(&self) -> Result<Vec<ModuleRecord>>;
}

/// Store kept in process memory. Used by tests and embedders that own their
/// own persistence.
#[derive(Debug, Default)]
pub struct InMemoryModuleStore {
    records: RwLock<IndexMap<String, ModuleRecord>>,
}

impl InMemoryModuleStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with `records` already installed.
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = ModuleRecord>) -> Self {
        let map = records.into_iter().map(|r| (r.name.clone(), r)).collect();
        Self {
            records: RwLock::new(map),
        }
    }
}

impl ModuleStore for InMemoryModuleStore {
    fn is_installed(&self, name: &str) -> Result<bool> {
        let records = self
            .records
            .read()
            .map_err(|_| anyhow::anyhow!("module store lock poisoned"))?;
        Ok(records.contains_key(name))
    }

    fn insert(&self, record: &ModuleRecord) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| anyhow::anyhow!("module store lock poisoned"))?;
        records.insert(record.name.clone(), record.clone());
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<bool> {
        let mut records = self
            .records
            .write()
            .map_err(|_| anyhow::anyhow!("module store lock poisoned"))?;
        Ok(records.shift_remove(name).is_some())
    }

    fn records(&self) -> Result<Vec<ModuleRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| anyhow::anyhow!("module store lock poisoned"))?;
        Ok(records.values().cloned().collect())
    }
}

/// Store backed by a JSON file (`[{"name": .., "version": ..}, ..]`).
///
/// Every query re-reads the file; a missing file means nothing is installed.
#[derive(Debug)]
pub struct JsonModuleStore {
    path: PathBuf,
    writer: Mutex<()>,
}

impl JsonModuleStore {
    /// Store persisted at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(()),
        }
    }

    /// File backing this store.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Vec<ModuleRecord>> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(Vec::new()),
            Ok(text) => serde_json::from_str(&text)
                .with_context(|| format!("malformed module store {}", self.path.display())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e)
                .with_context(|| format!("failed to read module store {}", self.path.display())),
        }
    }

    /// Read-modify-write under the in-process writer mutex and the file lock.
    fn update<T>(&self, f: impl FnOnce(&mut Vec<ModuleRecord>) -> T) -> Result<T> {
        let _guard = self
            .writer
            .lock()
            .map_err(|_| anyhow::anyhow!("module store writer lock poisoned"))?;
        let lock = FileLock::acquire(&self.path)?;
        let mut records = self.read()?;
        let out = f(&mut records);
        let mut text = serde_json::to_string_pretty(&records)?;
        text.push('\n');
        lock.replace(text.as_bytes())?;
        Ok(out)
    }
}

impl ModuleStore for JsonModuleStore {
    fn is_installed(&self, name: &str) -> Result<bool> {
        Ok(self.read()?.iter().any(|r| r.name == name))
    }

    fn insert(&self, record: &ModuleRecord) -> Result<()> {
        self.update(|records| match records.iter_mut().find(|r| r.name == record.name) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        })
    }

    fn delete(&self, name: &str) -> Result<bool> {
        self.update(|records| {
            let before = records.len();
            records.retain(|r| r.name != name);
            records.len() != before
        })
    }

    fn records(&self) -> Result<Vec<ModuleRecord>> {
        self.read()
    }
}

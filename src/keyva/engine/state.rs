/*!
 * Database State
 *
 * In-process representation of a versioned database: object stores, their
 * indexes and records. The whole state serializes with bincode so engines
 * can snapshot it.
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::keyva::errors::{KeyvaError, KeyvaResult};
use crate::keyva::key::Key;
use crate::keyva::range::KeyRange;
use crate::keyva::value::Value;

/// Versioned set of object stores
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseState {
    pub(crate) version: u64,
    pub(crate) stores: BTreeMap<String, ObjectStore>,
}

impl DatabaseState {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn object_store_names(&self) -> Vec<String> {
        self.stores.keys().cloned().collect()
    }
}

/// Ordered records plus named indexes over them
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectStore {
    /// index name -> key path
    indexes: BTreeMap<String, String>,
    records: BTreeMap<Key, Value>,
}

impl ObjectStore {
    /// Index names in sorted order
    pub fn index_names(&self) -> Vec<String> {
        self.indexes.keys().cloned().collect()
    }

    pub fn create_index(&mut self, name: &str, key_path: &str) -> KeyvaResult<()> {
        if self.indexes.contains_key(name) {
            return Err(KeyvaError::Transaction(format!(
                "index {} already exists",
                name
            )));
        }
        self.indexes.insert(name.to_string(), key_path.to_string());
        Ok(())
    }

    pub fn delete_index(&mut self, name: &str) -> KeyvaResult<()> {
        self.indexes
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| KeyvaError::UnknownIndex(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn get(&self, key: &Key) -> Option<&Value> {
        self.records.get(key)
    }

    pub(crate) fn put(&mut self, key: Key, value: Value) -> Option<Value> {
        self.records.insert(key, value)
    }

    pub(crate) fn remove(&mut self, key: &Key) -> Option<Value> {
        self.records.remove(key)
    }

    /// Remove every record inside `range`, returning what was removed
    pub(crate) fn remove_range(&mut self, range: &KeyRange) -> Vec<(Key, Value)> {
        if range.is_empty() {
            return Vec::new();
        }
        let doomed: Vec<Key> = self
            .records
            .range(range.as_bounds())
            .map(|(key, _)| key.clone())
            .collect();

        doomed
            .into_iter()
            .filter_map(|key| self.records.remove(&key).map(|value| (key, value)))
            .collect()
    }

    /// Records in key order, or in index order when `index` is given
    ///
    /// Index queries match `range` against the index key and order by
    /// (index key, primary key). Returned keys are always primary keys.
    pub(crate) fn query(
        &self,
        index: Option<&str>,
        range: Option<&KeyRange>,
        limit: Option<usize>,
    ) -> KeyvaResult<Vec<(Key, Value)>> {
        let limit = limit.unwrap_or(usize::MAX);

        let Some(index) = index else {
            let unbounded = KeyRange::unbounded();
            let range = range.unwrap_or(&unbounded);
            if range.is_empty() {
                return Ok(Vec::new());
            }
            return Ok(self
                .records
                .range(range.as_bounds())
                .take(limit)
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect());
        };

        let key_path = self
            .indexes
            .get(index)
            .ok_or_else(|| KeyvaError::UnknownIndex(index.to_string()))?;

        let mut hits: Vec<(Key, &Key, &Value)> = self
            .records
            .iter()
            .filter_map(|(key, value)| {
                let index_key = value.index_key(key_path)?;
                match range {
                    Some(range) if !range.contains(&index_key) => None,
                    _ => Some((index_key, key, value)),
                }
            })
            .collect();
        // Stable sort keeps primary key order among equal index keys
        hits.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(hits
            .into_iter()
            .take(limit)
            .map(|(_, key, value)| (key.clone(), value.clone()))
            .collect())
    }
}

/// Schema editor handed to upgrade callbacks
///
/// Only exists while a connection is being opened at a higher version.
pub struct Upgrade<'a> {
    state: &'a mut DatabaseState,
    old_version: u64,
    new_version: u64,
}

impl<'a> Upgrade<'a> {
    pub(crate) fn new(state: &'a mut DatabaseState, old_version: u64, new_version: u64) -> Self {
        Self {
            state,
            old_version,
            new_version,
        }
    }

    /// Version before the upgrade; 0 for a new database
    pub fn old_version(&self) -> u64 {
        self.old_version
    }

    pub fn new_version(&self) -> u64 {
        self.new_version
    }

    pub fn object_store_names(&self) -> Vec<String> {
        self.state.object_store_names()
    }

    pub fn has_object_store(&self, name: &str) -> bool {
        self.state.stores.contains_key(name)
    }

    pub fn create_object_store(&mut self, name: &str) -> KeyvaResult<&mut ObjectStore> {
        if self.has_object_store(name) {
            return Err(KeyvaError::Transaction(format!(
                "object store {} already exists",
                name
            )));
        }
        Ok(self.state.stores.entry(name.to_string()).or_default())
    }

    pub fn object_store(&mut self, name: &str) -> KeyvaResult<&mut ObjectStore> {
        self.state
            .stores
            .get_mut(name)
            .ok_or_else(|| KeyvaError::UnknownStore(name.to_string()))
    }

    pub fn delete_object_store(&mut self, name: &str) -> KeyvaResult<()> {
        self.state
            .stores
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| KeyvaError::UnknownStore(name.to_string()))
    }
}

/// A named database shared by every connection to it
#[derive(Debug)]
pub struct Database {
    name: String,
    pub(crate) state: Arc<RwLock<DatabaseState>>,
    snapshot: Option<PathBuf>,
    deleted: AtomicBool,
}

impl Database {
    pub fn new(name: impl Into<String>, state: DatabaseState, snapshot: Option<PathBuf>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(RwLock::new(state)),
            snapshot,
            deleted: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set once the engine dropped this database; connections to it are closed
    pub fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::Acquire)
    }

    pub(crate) fn mark_deleted(&self) {
        self.deleted.store(true, Ordering::Release);
    }

    pub async fn version(&self) -> u64 {
        self.state.read().await.version
    }

    /// Write `state` to the snapshot file, if this database has one
    ///
    /// Writes to a sibling file first and renames it into place.
    pub(crate) async fn persist(&self, state: &DatabaseState) -> KeyvaResult<()> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };

        let bytes = bincode::serialize(state)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let staging = path.with_extension("partial");
        tokio::fs::write(&staging, &bytes).await?;
        tokio::fs::rename(&staging, path).await?;

        debug!(database = %self.name, bytes = bytes.len(), "snapshot written");
        Ok(())
    }
}

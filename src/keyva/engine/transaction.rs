/*!
 * Connections and Transactions
 *
 * Read transactions share the database; a write transaction holds it
 * exclusively, stages mutations and applies them all at commit. A commit
 * whose snapshot cannot be written is rolled back.
 */

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard};
use tracing::warn;

use super::state::{Database, DatabaseState, ObjectStore};
use crate::keyva::errors::{KeyvaError, KeyvaResult};
use crate::keyva::key::Key;
use crate::keyva::range::KeyRange;
use crate::keyva::value::Value;

/// Open handle on a database at a fixed version
#[derive(Clone)]
pub struct Connection {
    database: Arc<Database>,
    version: u64,
    closed: Arc<AtomicBool>,
}

impl Connection {
    pub fn new(database: Arc<Database>, version: u64) -> Self {
        Self {
            database,
            version,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn name(&self) -> &str {
        self.database.name()
    }

    /// Version this connection was opened at
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Closed explicitly, or its database was deleted
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.database.is_deleted()
    }

    /// Close this connection and every clone of it
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn ensure_open(&self) -> KeyvaResult<()> {
        if self.is_closed() {
            return Err(KeyvaError::Closed(self.name().to_string()));
        }
        Ok(())
    }

    pub async fn object_store_names(&self) -> KeyvaResult<Vec<String>> {
        self.ensure_open()?;
        Ok(self.database.state.read().await.object_store_names())
    }

    /// Start a read-only transaction on `store`
    pub async fn read(&self, store: &str) -> KeyvaResult<ReadTransaction> {
        self.ensure_open()?;
        let guard = Arc::clone(&self.database.state).read_owned().await;
        if !guard.stores.contains_key(store) {
            return Err(KeyvaError::UnknownStore(store.to_string()));
        }
        Ok(ReadTransaction {
            guard,
            store: store.to_string(),
        })
    }

    /// Start a read-write transaction on `store`
    pub async fn write(&self, store: &str) -> KeyvaResult<WriteTransaction> {
        self.ensure_open()?;
        let guard = Arc::clone(&self.database.state).write_owned().await;
        if !guard.stores.contains_key(store) {
            return Err(KeyvaError::UnknownStore(store.to_string()));
        }
        Ok(WriteTransaction {
            guard,
            database: Arc::clone(&self.database),
            store: store.to_string(),
            staged: Vec::new(),
        })
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.name())
            .field("version", &self.version)
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn object_store<'a>(state: &'a DatabaseState, name: &str) -> KeyvaResult<&'a ObjectStore> {
    state
        .stores
        .get(name)
        .ok_or_else(|| KeyvaError::UnknownStore(name.to_string()))
}

/// Snapshot-consistent reads over one object store
pub struct ReadTransaction {
    guard: OwnedRwLockReadGuard<DatabaseState>,
    store: String,
}

impl ReadTransaction {
    pub fn index_names(&self) -> KeyvaResult<Vec<String>> {
        Ok(object_store(&self.guard, &self.store)?.index_names())
    }

    pub fn get(&self, key: &Key) -> KeyvaResult<Option<Value>> {
        Ok(object_store(&self.guard, &self.store)?.get(key).cloned())
    }

    /// Records in key order, or index order when `index` is given
    pub fn query(
        &self,
        index: Option<&str>,
        range: Option<&KeyRange>,
        limit: Option<usize>,
    ) -> KeyvaResult<Vec<(Key, Value)>> {
        object_store(&self.guard, &self.store)?.query(index, range, limit)
    }
}

enum Mutation {
    Put(Key, Value),
    Delete(Key),
    DeleteRange(KeyRange),
}

/// Exclusive, all-or-nothing writes to one object store
///
/// Dropping without `commit` aborts.
pub struct WriteTransaction {
    guard: OwnedRwLockWriteGuard<DatabaseState>,
    database: Arc<Database>,
    store: String,
    staged: Vec<Mutation>,
}

impl WriteTransaction {
    pub fn put(&mut self, key: Key, value: Value) {
        self.staged.push(Mutation::Put(key, value));
    }

    pub fn delete(&mut self, key: Key) {
        self.staged.push(Mutation::Delete(key));
    }

    pub fn delete_range(&mut self, range: KeyRange) {
        self.staged.push(Mutation::DeleteRange(range));
    }

    pub fn clear(&mut self) {
        self.staged.push(Mutation::DeleteRange(KeyRange::unbounded()));
    }

    /// Read through the transaction's view of the store
    pub fn get(&self, key: &Key) -> KeyvaResult<Option<Value>> {
        let store = object_store(&self.guard, &self.store)?;
        let mut current = store.get(key).cloned();
        for mutation in &self.staged {
            match mutation {
                Mutation::Put(k, v) if k == key => current = Some(v.clone()),
                Mutation::Delete(k) if k == key => current = None,
                Mutation::DeleteRange(range) if range.contains(key) => current = None,
                _ => {}
            }
        }
        Ok(current)
    }

    /// Discard staged mutations
    pub fn abort(self) {}

    /// Apply every staged mutation and persist the result
    pub async fn commit(mut self) -> KeyvaResult<()> {
        if self.staged.is_empty() {
            return Ok(());
        }
        if self.database.is_deleted() {
            return Err(KeyvaError::Closed(self.database.name().to_string()));
        }

        // (key, value before the mutation)
        let mut undo: Vec<(Key, Option<Value>)> = Vec::new();
        {
            let store = self
                .guard
                .stores
                .get_mut(&self.store)
                .ok_or_else(|| KeyvaError::UnknownStore(self.store.clone()))?;

            for mutation in self.staged.drain(..) {
                match mutation {
                    Mutation::Put(key, value) => {
                        let previous = store.put(key.clone(), value);
                        undo.push((key, previous));
                    }
                    Mutation::Delete(key) => {
                        if let Some(previous) = store.remove(&key) {
                            undo.push((key, Some(previous)));
                        }
                    }
                    Mutation::DeleteRange(range) => {
                        undo.extend(
                            store
                                .remove_range(&range)
                                .into_iter()
                                .map(|(key, value)| (key, Some(value))),
                        );
                    }
                }
            }
        }

        if let Err(e) = self.database.persist(&self.guard).await {
            warn!(database = %self.database.name(), error = %e, "commit failed, rolling back");
            if let Some(store) = self.guard.stores.get_mut(&self.store) {
                for (key, previous) in undo.into_iter().rev() {
                    match previous {
                        Some(value) => {
                            store.put(key, value);
                        }
                        None => {
                            store.remove(&key);
                        }
                    }
                }
            }
            return Err(e);
        }
        Ok(())
    }
}

/*!
 * Keyva Store
 *
 * A named key/value store with optional secondary indexes. Each store is
 * its own database holding a single object store of the same name. The
 * connection opens lazily on first use, reconciling declared indexes.
 */

use futures::future::try_join_all;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::engine::{Connection, Engine};
use super::errors::KeyvaResult;
use super::key::Key;
use super::range::KeyRange;
use super::schema::{open_reconciled, Schema, SchemaState};
use super::value::Value;
use super::warm_up::warm_up;
use crate::core::limits::KEYVA_NAME_PREFIX;
use crate::core::serde::{one_or_many, string_or_number};

/// Construction options for `Keyva`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyvaOptions {
    /// Store name, without the Keyva prefix; numbers are accepted
    #[serde(with = "string_or_number")]
    pub name: Option<String>,
    /// Declared index names; each indexes the JSON member of the same path
    #[serde(with = "one_or_many")]
    pub indexes: Vec<String>,
}

impl KeyvaOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            indexes: Vec::new(),
        }
    }

    pub fn index(mut self, name: impl Into<String>) -> Self {
        self.indexes.push(name.into());
        self
    }
}

/// Selection for `each`, `each_keys` and `each_values`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub range: Option<KeyRange>,
    pub index: Option<String>,
    pub limit: Option<usize>,
}

impl Query {
    /// Every record, in key order
    pub fn all() -> Self {
        Self::default()
    }

    pub fn range(mut self, range: KeyRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Prefix `name` unless it already carries the Keyva prefix
pub fn prefixed_name(name: &str) -> String {
    if name.starts_with(KEYVA_NAME_PREFIX) {
        name.to_string()
    } else {
        format!("{}{}", KEYVA_NAME_PREFIX, name)
    }
}

/// Transactional key/value store
pub struct Keyva {
    engine: Arc<dyn Engine>,
    schema: Schema,
    connection: Mutex<Option<Connection>>,
    state: RwLock<Option<SchemaState>>,
}

impl Keyva {
    pub fn new(engine: Arc<dyn Engine>, options: KeyvaOptions) -> Self {
        let name = format!("{}{}", KEYVA_NAME_PREFIX, options.name.unwrap_or_default());
        Self {
            engine,
            schema: Schema::new(name, options.indexes),
            connection: Mutex::new(None),
            state: RwLock::new(None),
        }
    }

    /// Full database name, including the Keyva prefix
    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Schema observed when the connection was opened
    pub fn state(&self) -> Option<SchemaState> {
        self.state.read().clone()
    }

    /// Version of the open connection, if any
    pub fn version(&self) -> Option<u64> {
        self.state.read().as_ref().map(|state| state.version)
    }

    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    /// Shared connection, opened and reconciled on first use
    async fn connection(&self) -> KeyvaResult<Connection> {
        let mut slot = self.connection.lock().await;
        if let Some(connection) = slot.as_ref() {
            if !connection.is_closed() {
                return Ok(connection.clone());
            }
        }

        warm_up(self.engine.as_ref()).await;
        let connection = open_reconciled(self.engine.as_ref(), &self.schema).await?;

        *self.state.write() = Some(SchemaState {
            version: connection.version(),
            indexes: self.schema.indexes().to_vec(),
        });
        debug!(store = %self.name(), version = connection.version(), "store opened");

        *slot = Some(connection.clone());
        Ok(connection)
    }

    /// Close the connection; the next operation reopens it
    pub async fn close(&self) {
        if let Some(connection) = self.connection.lock().await.take() {
            connection.close();
            debug!(store = %self.name(), "store closed");
        }
        *self.state.write() = None;
    }

    pub async fn get(&self, key: impl Into<Key>) -> KeyvaResult<Option<Value>> {
        let key = key.into();
        let connection = self.connection().await?;
        let transaction = connection.read(self.name()).await?;
        transaction.get(&key)
    }

    /// Values for several keys, read in one transaction
    pub async fn get_many(&self, keys: &[Key]) -> KeyvaResult<Vec<Option<Value>>> {
        let connection = self.connection().await?;
        let transaction = connection.read(self.name()).await?;
        keys.iter().map(|key| transaction.get(key)).collect()
    }

    pub async fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> KeyvaResult<()> {
        let connection = self.connection().await?;
        let mut transaction = connection.write(self.name()).await?;
        transaction.put(key.into(), value.into());
        transaction.commit().await
    }

    /// Write several entries atomically
    pub async fn set_many<I>(&self, entries: I) -> KeyvaResult<()>
    where
        I: IntoIterator<Item = (Key, Value)>,
    {
        let connection = self.connection().await?;
        let mut transaction = connection.write(self.name()).await?;
        for (key, value) in entries {
            transaction.put(key, value);
        }
        transaction.commit().await
    }

    pub async fn delete(&self, key: impl Into<Key>) -> KeyvaResult<()> {
        let connection = self.connection().await?;
        let mut transaction = connection.write(self.name()).await?;
        transaction.delete(key.into());
        transaction.commit().await
    }

    /// Delete several keys atomically
    pub async fn delete_many<I>(&self, keys: I) -> KeyvaResult<()>
    where
        I: IntoIterator<Item = Key>,
    {
        let connection = self.connection().await?;
        let mut transaction = connection.write(self.name()).await?;
        for key in keys {
            transaction.delete(key);
        }
        transaction.commit().await
    }

    /// Delete every key inside `range`
    pub async fn delete_range(&self, range: KeyRange) -> KeyvaResult<()> {
        let connection = self.connection().await?;
        let mut transaction = connection.write(self.name()).await?;
        transaction.delete_range(range);
        transaction.commit().await
    }

    /// Delete every record; the store itself is kept
    pub async fn clear(&self) -> KeyvaResult<()> {
        self.delete_range(KeyRange::unbounded()).await
    }

    /// (key, value) pairs matching `query`
    ///
    /// Keys and values come from one transaction, so pairs always line up.
    pub async fn each(&self, query: &Query) -> KeyvaResult<Vec<(Key, Value)>> {
        let connection = self.connection().await?;
        let transaction = connection.read(self.name()).await?;
        transaction.query(query.index.as_deref(), query.range.as_ref(), query.limit)
    }

    pub async fn each_keys(&self, query: &Query) -> KeyvaResult<Vec<Key>> {
        Ok(self.each(query).await?.into_iter().map(|(key, _)| key).collect())
    }

    pub async fn each_values(&self, query: &Query) -> KeyvaResult<Vec<Value>> {
        Ok(self
            .each(query)
            .await?
            .into_iter()
            .map(|(_, value)| value)
            .collect())
    }

    /// Names of every Keyva store the engine holds
    pub async fn stores(engine: &dyn Engine) -> KeyvaResult<Vec<String>> {
        Ok(engine
            .databases()
            .await?
            .into_iter()
            .map(|info| info.name)
            .filter(|name| name.starts_with(KEYVA_NAME_PREFIX))
            .collect())
    }

    /// Delete the named stores, or every Keyva store when `names` is empty
    ///
    /// Names are accepted with or without the Keyva prefix.
    pub async fn delete_stores(engine: &dyn Engine, names: &[&str]) -> KeyvaResult<()> {
        let names: Vec<String> = if names.is_empty() {
            Self::stores(engine).await?
        } else {
            names.iter().map(|name| prefixed_name(name)).collect()
        };

        try_join_all(names.iter().map(|name| engine.delete_database(name))).await?;
        info!(count = names.len(), "stores deleted");
        Ok(())
    }
}

impl fmt::Debug for Keyva {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keyva")
            .field("name", &self.name())
            .field("indexes", &self.schema.indexes())
            .field("version", &self.version())
            .finish()
    }
}

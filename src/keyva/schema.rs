/*!
 * Schema Reconciliation
 *
 * A store declares the indexes it wants. Opening compares them with the
 * indexes the database actually has and, on any difference, reopens at the
 * next version with an upgrade that creates the missing indexes and drops
 * the stale ones. Repeats until the two agree or the attempt limit is hit.
 */

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::engine::{Connection, Engine, Upgrade};
use super::errors::{KeyvaError, KeyvaResult};
use crate::core::limits::MAX_SCHEMA_MIGRATIONS;

/// Declared layout of a Keyva store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    name: String,
    indexes: Vec<String>,
}

impl Schema {
    /// Index names are sorted and deduplicated for stable diffing
    pub fn new(name: impl Into<String>, indexes: impl IntoIterator<Item = String>) -> Self {
        let mut indexes: Vec<String> = indexes.into_iter().collect();
        indexes.sort();
        indexes.dedup();
        Self {
            name: name.into(),
            indexes,
        }
    }

    /// Database and object store name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn indexes(&self) -> &[String] {
        &self.indexes
    }

    /// Changes needed to turn `actual` into the declared index set
    pub fn diff(&self, actual: &[String]) -> SchemaDiff {
        SchemaDiff {
            added: self
                .indexes
                .iter()
                .filter(|index| !actual.contains(index))
                .cloned()
                .collect(),
            removed: actual
                .iter()
                .filter(|index| !self.indexes.contains(index))
                .cloned()
                .collect(),
        }
    }
}

/// Index changes applied by one upgrade
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl SchemaDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Schema observed on the open connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaState {
    pub version: u64,
    pub indexes: Vec<String>,
}

/// Open the store's database with its index set reconciled
pub async fn open_reconciled(engine: &dyn Engine, schema: &Schema) -> KeyvaResult<Connection> {
    let mut version: Option<u64> = None;
    let mut pending = SchemaDiff::default();

    for attempt in 0..=MAX_SCHEMA_MIGRATIONS {
        let diff = pending.clone();
        let store = schema.name.clone();
        let upgrade = move |editor: &mut Upgrade<'_>| -> KeyvaResult<()> {
            if !editor.has_object_store(&store) {
                editor.create_object_store(&store)?;
            }
            let object_store = editor.object_store(&store)?;
            for index in &diff.added {
                object_store.create_index(index, index)?;
            }
            for index in &diff.removed {
                object_store.delete_index(index)?;
            }
            Ok(())
        };

        let connection = engine.open(&schema.name, version, &upgrade).await?;

        let observed = match connection.read(&schema.name).await {
            Ok(transaction) => Some(transaction.index_names()?),
            Err(KeyvaError::UnknownStore(_)) => None,
            Err(e) => return Err(e),
        };

        match observed {
            Some(mut actual) => {
                actual.sort();
                pending = schema.diff(&actual);
                if pending.is_empty() {
                    debug!(
                        database = %schema.name,
                        version = connection.version(),
                        attempt,
                        "schema reconciled"
                    );
                    return Ok(connection);
                }
            }
            // The database exists without our object store; the next
            // upgrade creates it along with every declared index
            None => {
                pending = SchemaDiff {
                    added: schema.indexes.clone(),
                    removed: Vec::new(),
                };
            }
        }

        info!(
            database = %schema.name,
            version = connection.version(),
            added = ?pending.added,
            removed = ?pending.removed,
            "migrating indexes"
        );
        version = Some(connection.version() + 1);
        connection.close();
    }

    Err(KeyvaError::Migration {
        name: schema.name.clone(),
        attempts: MAX_SCHEMA_MIGRATIONS,
    })
}

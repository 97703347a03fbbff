/*!
 * Keyva Engines
 *
 * An engine owns named, versioned databases. Opening at a higher version
 * runs an upgrade callback that may edit object stores and indexes; that is
 * the only place the schema can change.
 */

mod memory;
mod state;
mod transaction;

pub use memory::MemoryEngine;
pub use state::{Database, DatabaseState, ObjectStore, Upgrade};
pub use transaction::{Connection, ReadTransaction, WriteTransaction};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::errors::KeyvaResult;

/// Schema edit run while a database is opened at a higher version
pub type UpgradeFn<'a> = &'a (dyn Fn(&mut Upgrade<'_>) -> KeyvaResult<()> + Send + Sync);

/// Name and version of an existing database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub name: String,
    pub version: u64,
}

/// Backing store for Keyva databases
#[async_trait]
pub trait Engine: Send + Sync {
    /// Identification string of the host environment, if any
    ///
    /// Used to detect hosts whose engine needs warming up before first use.
    fn user_agent(&self) -> Option<String> {
        None
    }

    /// List existing databases
    async fn databases(&self) -> KeyvaResult<Vec<DatabaseInfo>>;

    /// Delete a database; succeeds when it does not exist
    async fn delete_database(&self, name: &str) -> KeyvaResult<()>;

    /// Open `name`, creating it when missing
    ///
    /// Without a version the current one is used (1 for a new database).
    /// A version above the current one runs `upgrade` first; one below it
    /// fails with `KeyvaError::Version`.
    async fn open(
        &self,
        name: &str,
        version: Option<u64>,
        upgrade: UpgradeFn<'_>,
    ) -> KeyvaResult<Connection>;
}

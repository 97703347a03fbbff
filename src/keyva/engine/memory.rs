/*!
 * Memory Engine
 *
 * Databases live in process memory. With a snapshot directory, every
 * committed change is written to `<dir>/<name>.keyva` and databases are
 * loaded back on first use, so state survives restarts.
 */

use ahash::RandomState;
use async_trait::async_trait;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::state::{Database, DatabaseState, Upgrade};
use super::transaction::Connection;
use super::{DatabaseInfo, Engine, UpgradeFn};
use crate::core::limits::KEYVA_SNAPSHOT_EXTENSION;
use crate::keyva::errors::{KeyvaError, KeyvaResult};

/// In-process engine with optional snapshot persistence
#[derive(Debug, Default)]
pub struct MemoryEngine {
    databases: DashMap<String, Arc<Database>, RandomState>,
    directory: Option<PathBuf>,
    user_agent: Option<String>,
}

impl MemoryEngine {
    /// Engine whose databases vanish with the process
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine that snapshots databases into `directory`
    ///
    /// The directory is created on first write.
    pub fn persistent(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: Some(directory.into()),
            ..Self::default()
        }
    }

    /// Report `user_agent` as the host identification
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    fn snapshot_path(&self, name: &str) -> Option<PathBuf> {
        self.directory.as_ref().map(|dir| {
            dir.join(format!("{}.{}", encode_name(name), KEYVA_SNAPSHOT_EXTENSION))
        })
    }

    /// Get the shared database, loading its snapshot on first use
    async fn database(&self, name: &str) -> KeyvaResult<Arc<Database>> {
        let existing = self.databases.get(name).map(|entry| Arc::clone(entry.value()));
        if let Some(database) = existing {
            return Ok(database);
        }

        let snapshot = self.snapshot_path(name);
        let state = match &snapshot {
            Some(path) => load_snapshot(path).await?,
            None => DatabaseState::default(),
        };

        let database = self
            .databases
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Database::new(name, state, snapshot)))
            .clone();
        Ok(database)
    }

    /// Names of databases persisted in the snapshot directory
    async fn persisted_names(&self) -> KeyvaResult<Vec<String>> {
        let Some(directory) = &self.directory else {
            return Ok(Vec::new());
        };

        let mut entries = match tokio::fs::read_dir(directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(KEYVA_SNAPSHOT_EXTENSION) {
                continue;
            }
            if let Some(name) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(decode_name)
            {
                names.push(name);
            }
        }
        Ok(names)
    }
}

#[async_trait]
impl Engine for MemoryEngine {
    fn user_agent(&self) -> Option<String> {
        self.user_agent.clone()
    }

    async fn databases(&self) -> KeyvaResult<Vec<DatabaseInfo>> {
        for name in self.persisted_names().await? {
            self.database(&name).await?;
        }

        let databases: Vec<Arc<Database>> = self
            .databases
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut infos = Vec::with_capacity(databases.len());
        for database in databases {
            let version = database.version().await;
            if version > 0 {
                infos.push(DatabaseInfo {
                    name: database.name().to_string(),
                    version,
                });
            }
        }
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(infos)
    }

    async fn delete_database(&self, name: &str) -> KeyvaResult<()> {
        if let Some((_, database)) = self.databases.remove(name) {
            database.mark_deleted();
            // Wait out a commit that started before the flag was set
            drop(database.state.write().await);
        }

        if let Some(path) = self.snapshot_path(name) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        info!(database = %name, "database deleted");
        Ok(())
    }

    async fn open(
        &self,
        name: &str,
        version: Option<u64>,
        upgrade: UpgradeFn<'_>,
    ) -> KeyvaResult<Connection> {
        let database = self.database(name).await?;
        let mut state = database.state.write().await;
        let current = state.version;

        let target = match version {
            None => current.max(1),
            Some(requested) if requested == 0 || requested < current => {
                return Err(KeyvaError::Version { requested, current });
            }
            Some(requested) => requested,
        };

        if target > current {
            let previous = state.clone();
            let result = {
                let mut editor = Upgrade::new(&mut *state, current, target);
                upgrade(&mut editor)
            };
            if let Err(e) = result {
                *state = previous;
                return Err(e);
            }

            state.version = target;
            if let Err(e) = database.persist(&state).await {
                *state = previous;
                return Err(e);
            }
            debug!(database = %name, from = current, to = target, "database upgraded");
        }

        Ok(Connection::new(Arc::clone(&database), target))
    }
}

async fn load_snapshot(path: &Path) -> KeyvaResult<DatabaseState> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            let state: DatabaseState = bincode::deserialize(&bytes)?;
            debug!(path = %path.display(), version = state.version(), "snapshot loaded");
            Ok(state)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(DatabaseState::default()),
        Err(e) => Err(e.into()),
    }
}

/// File-system safe encoding of a database name
fn encode_name(name: &str) -> String {
    let mut encoded = String::with_capacity(name.len());
    for byte in name.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' => encoded.push(byte as char),
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

fn decode_name(encoded: &str) -> Option<String> {
    let bytes = encoded.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = encoded.get(i + 1..i + 3)?;
            decoded.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(decoded).ok()
}

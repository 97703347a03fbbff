/*!
 * Desktop Backend
 *
 * Storage through a desktop webview host: file calls go to the host's fs
 * API, metadata and watching go through IPC commands. Metadata is cached
 * per path until this backend mutates the path or `invalidate` is called.
 */

pub mod plugin;
pub mod watch;

pub use plugin::{DesktopFs, DesktopIpc, DesktopMetadata, DirEntry, EventHandler, ListenerId};
pub use watch::{translate, RawWatchEvent};

use ahash::RandomState;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use super::address::Fila;
use super::registry::Registry;
use super::traits::Backend;
use super::types::{FilaError, FilaResult, PluginError, Stat, WriteOptions};
use super::watch::{EventSink, Unwatch};
use crate::core::limits::{DESKTOP_METADATA_COMMAND, NOISE_FILENAMES, ROOT};
use watch::DesktopWatch;

const BACKEND: &str = "desktop";

/// Backend over the desktop host's fs and IPC bridges
pub struct DesktopBackend {
    fs: Arc<dyn DesktopFs>,
    ipc: Arc<dyn DesktopIpc>,
    metadata: DashMap<String, Stat, RandomState>,
}

impl DesktopBackend {
    pub fn new(fs: Arc<dyn DesktopFs>, ipc: Arc<dyn DesktopIpc>) -> Self {
        Self {
            fs,
            ipc,
            metadata: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Registry rooted at `/` with the host separator and cache directory
    pub fn registry(self, separator: &str, temp: &str) -> Arc<Registry> {
        Registry::builder(Arc::new(self))
            .separator(separator)
            .cwd(ROOT)
            .temp(temp)
            .build()
    }

    fn forget(&self, fila: &Fila) {
        self.metadata.remove(&fila.path());
    }

    /// Cached or freshly fetched metadata
    async fn metadata(&self, fila: &Fila) -> FilaResult<Stat> {
        let path = fila.path();
        let cached = self.metadata.get(&path).map(|entry| *entry.value());
        if let Some(stat) = cached {
            return Ok(stat);
        }

        let response = self
            .ipc
            .invoke(DESKTOP_METADATA_COMMAND, json!({ "path": path }))
            .await?;
        let metadata: DesktopMetadata = serde_json::from_value(response)
            .map_err(|e| FilaError::Plugin(format!("{}: bad metadata: {}", path, e)))?;

        let stat = Stat::from(metadata);
        self.metadata.insert(path, stat);
        Ok(stat)
    }

    fn write_failed(fila: &Fila, e: FilaError) -> FilaError {
        warn!(path = %fila, error = %e, "desktop write failed");
        FilaError::write_failure(fila.path(), e)
    }
}

impl std::fmt::Debug for DesktopBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesktopBackend")
            .field("cached", &self.metadata.len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Backend for DesktopBackend {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn read_text(&self, fila: &Fila) -> FilaResult<String> {
        Ok(self.fs.read_text_file(&fila.path()).await?)
    }

    async fn read_binary(&self, fila: &Fila) -> FilaResult<Vec<u8>> {
        Ok(self.fs.read_binary_file(&fila.path()).await?)
    }

    async fn read_directory(&self, fila: &Fila) -> FilaResult<Vec<Fila>> {
        let entries = self.fs.read_dir(&fila.path()).await?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| entry.name)
            .filter(|name| !NOISE_FILENAMES.contains(&name.as_str()))
            .map(|name| fila.down(&[name]))
            .collect())
    }

    async fn write_text(
        &self,
        fila: &Fila,
        text: &str,
        options: WriteOptions,
    ) -> FilaResult<()> {
        let result = async {
            let up = fila.up();
            if !up.exists().await {
                self.write_directory(&up).await?;
            }
            self.fs
                .write_text_file(&fila.path(), text, options.append)
                .await?;
            Ok::<(), FilaError>(())
        }
        .await;

        self.forget(fila);
        result.map_err(|e| Self::write_failed(fila, e))
    }

    async fn write_binary(&self, fila: &Fila, data: &[u8]) -> FilaResult<()> {
        let result = async {
            self.write_directory(&fila.up()).await?;
            self.fs.write_binary_file(&fila.path(), data).await?;
            Ok::<(), FilaError>(())
        }
        .await;

        self.forget(fila);
        result.map_err(|e| Self::write_failed(fila, e))
    }

    async fn write_directory(&self, fila: &Fila) -> FilaResult<()> {
        if self.exists(fila).await {
            return match self.metadata(fila).await? {
                stat if stat.is_directory => Ok(()),
                _ => Err(FilaError::AlreadyExists(fila.path())),
            };
        }
        self.fs.create_dir(&fila.path(), true).await?;
        self.forget(fila);
        debug!(path = %fila, "directory created");
        Ok(())
    }

    async fn write_symlink(&self, _fila: &Fila, _target: &Fila) -> FilaResult<()> {
        Err(FilaError::unsupported("write_symlink", BACKEND))
    }

    async fn delete(&self, fila: &Fila) -> FilaResult<()> {
        let is_directory = matches!(self.stat(fila).await?, Some(stat) if stat.is_directory);
        let path = fila.path();
        let result = if is_directory {
            self.fs.remove_dir(&path, true).await
        } else {
            self.fs.remove_file(&path).await
        };
        self.forget(fila);
        Ok(result?)
    }

    async fn move_to(&self, _fila: &Fila, _target: &Fila) -> FilaResult<()> {
        Err(FilaError::unsupported("move", BACKEND))
    }

    async fn copy_to(&self, fila: &Fila, target: &Fila) -> FilaResult<()> {
        if self.exists(target).await && self.metadata(target).await?.is_directory {
            return Err(FilaError::unsupported("copy onto a directory", BACKEND));
        }
        let result = self.fs.copy_file(&fila.path(), &target.path()).await;
        self.forget(target);
        Ok(result?)
    }

    async fn rename(&self, fila: &Fila, new_name: &str) -> FilaResult<()> {
        let target = fila.up().down(&[new_name]);
        let result = self.fs.rename_file(&fila.path(), &target.path()).await;
        self.forget(fila);
        self.forget(&target);
        Ok(result?)
    }

    async fn watch(
        &self,
        fila: &Fila,
        recursive: bool,
        sink: EventSink,
    ) -> FilaResult<Box<dyn Unwatch>> {
        let watch = DesktopWatch::register(Arc::clone(&self.ipc), fila, recursive, sink).await?;
        Ok(Box::new(watch))
    }

    async fn stat(&self, fila: &Fila) -> FilaResult<Option<Stat>> {
        if !self.exists(fila).await {
            return Ok(None);
        }
        match self.metadata(fila).await {
            Ok(stat) => Ok(Some(stat)),
            Err(FilaError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn exists(&self, fila: &Fila) -> bool {
        match self.fs.exists(&fila.path()).await {
            Ok(exists) => exists,
            Err(PluginError::NotFound(_)) => false,
            Err(e) => {
                warn!(path = %fila, error = %e, "desktop exists check failed");
                false
            }
        }
    }

    fn invalidate(&self, fila: &Fila) {
        self.forget(fila);
    }
}

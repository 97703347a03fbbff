/*!
 * Mobile Backend
 *
 * Storage through a mobile host's filesystem plugin. The first path
 * component names the plugin directory (`DATA`, `CACHE`, ...); paths with
 * no directory component land in `CACHE`.
 */

pub mod plugin;

pub use plugin::{Directory, Encoding, EntryKind, FileInfo, FileStat, Location, MobileFilesystem};

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use std::sync::Arc;
use tracing::warn;

use super::address::Fila;
use super::registry::Registry;
use super::traits::Backend;
use super::types::{FilaError, FilaResult, Stat, WriteOptions};
use super::watch::{EventSink, Unwatch};
use crate::core::limits::{MOBILE_CWD, MOBILE_TEMP, NOISE_FILENAMES};

const BACKEND: &str = "mobile";

/// Split a plugin path into directory and relative path
///
/// A path without a separator is either a bare directory name or a file in
/// `CACHE`. An unknown leading segment is an invalid path.
pub fn locate(target: &str) -> FilaResult<Location> {
    match target.split_once('/') {
        None => Ok(match target.parse::<Directory>() {
            Ok(directory) => Location::new(directory, ""),
            Err(_) => Location::new(Directory::Cache, target),
        }),
        Some((head, rest)) => {
            let directory = head
                .parse::<Directory>()
                .map_err(|_| FilaError::InvalidPath(target.to_string()))?;
            Ok(Location::new(directory, rest))
        }
    }
}

/// Backend over a `MobileFilesystem` bridge
pub struct MobileBackend {
    fs: Arc<dyn MobileFilesystem>,
}

impl MobileBackend {
    pub fn new(fs: Arc<dyn MobileFilesystem>) -> Self {
        Self { fs }
    }

    /// Registry with `DATA` as working directory and `CACHE` as temp
    pub fn registry(fs: Arc<dyn MobileFilesystem>) -> Arc<Registry> {
        Registry::builder(Arc::new(Self::new(fs)))
            .cwd(MOBILE_CWD)
            .temp(MOBILE_TEMP)
            .build()
    }

    /// Plugin path: components joined without a leading separator
    fn plugin_path(fila: &Fila) -> String {
        if fila.is_root() {
            return String::new();
        }
        fila.components().join("/")
    }

    fn location(fila: &Fila) -> FilaResult<Location> {
        locate(&Self::plugin_path(fila))
    }

    fn write_failed(fila: &Fila, e: FilaError) -> FilaError {
        warn!(path = %fila, error = %e, "mobile write failed");
        FilaError::write_failure(fila.path(), e)
    }
}

impl std::fmt::Debug for MobileBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MobileBackend").finish_non_exhaustive()
    }
}

#[async_trait]
impl Backend for MobileBackend {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn read_text(&self, fila: &Fila) -> FilaResult<String> {
        let at = Self::location(fila)?;
        Ok(self.fs.read_file(&at, Some(Encoding::Utf8)).await?)
    }

    async fn read_binary(&self, fila: &Fila) -> FilaResult<Vec<u8>> {
        let at = Self::location(fila)?;
        let data = self.fs.read_file(&at, None).await?;
        general_purpose::STANDARD
            .decode(data.as_bytes())
            .map_err(|e| FilaError::Plugin(format!("{}: invalid base64: {}", at, e)))
    }

    async fn read_directory(&self, fila: &Fila) -> FilaResult<Vec<Fila>> {
        let at = Self::location(fila)?;
        let entries = self.fs.readdir(&at).await?;
        Ok(entries
            .into_iter()
            .filter(|entry| !NOISE_FILENAMES.contains(&entry.name.as_str()))
            .map(|entry| fila.down(&[entry.name]))
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

            let at = Self::location(fila)?;
            if options.append {
                self.fs.append_file(&at, text, Some(Encoding::Utf8)).await?;
            } else {
                self.fs.write_file(&at, text, Some(Encoding::Utf8)).await?;
            }
            Ok::<(), FilaError>(())
        }
        .await;

        match result {
            Ok(()) => Ok(()),
            Err(e) => Err(Self::write_failed(fila, e)),
        }
    }

    async fn write_binary(&self, fila: &Fila, data: &[u8]) -> FilaResult<()> {
        let result = async {
            self.write_directory(&fila.up()).await?;
            let at = Self::location(fila)?;
            let encoded = general_purpose::STANDARD.encode(data);
            self.fs.write_file(&at, &encoded, None).await?;
            Ok::<(), FilaError>(())
        }
        .await;

        match result {
            Ok(()) => Ok(()),
            Err(e) => Err(Self::write_failed(fila, e)),
        }
    }

    async fn write_directory(&self, fila: &Fila) -> FilaResult<()> {
        match self.stat(fila).await? {
            Some(stat) if stat.is_directory => Ok(()),
            Some(_) => Err(FilaError::AlreadyExists(fila.path())),
            None => {
                let at = Self::location(fila)?;
                Ok(self.fs.mkdir(&at, true).await?)
            }
        }
    }

    async fn write_symlink(&self, _fila: &Fila, _target: &Fila) -> FilaResult<()> {
        Err(FilaError::unsupported("write_symlink", BACKEND))
    }

    async fn delete(&self, fila: &Fila) -> FilaResult<()> {
        let at = Self::location(fila)?;
        let is_directory = matches!(self.stat(fila).await?, Some(stat) if stat.is_directory);
        if is_directory {
            self.fs.rmdir(&at, true).await?;
        } else {
            self.fs.delete_file(&at).await?;
        }
        Ok(())
    }

    async fn move_to(&self, _fila: &Fila, _target: &Fila) -> FilaResult<()> {
        Err(FilaError::unsupported("move", BACKEND))
    }

    async fn copy_to(&self, fila: &Fila, target: &Fila) -> FilaResult<()> {
        let from = Self::location(fila)?;
        let to = Self::location(target)?;
        Ok(self.fs.copy(&from, &to).await?)
    }

    async fn rename(&self, fila: &Fila, new_name: &str) -> FilaResult<()> {
        let from = Self::location(fila)?;
        let to = Self::location(&fila.up().down(&[new_name]))?;
        Ok(self.fs.rename(&from, &to).await?)
    }

    async fn watch(
        &self,
        _fila: &Fila,
        _recursive: bool,
        _sink: EventSink,
    ) -> FilaResult<Box<dyn Unwatch>> {
        Err(FilaError::unsupported("watch", BACKEND))
    }

    /// Any plugin failure reads as "nothing here"
    async fn stat(&self, fila: &Fila) -> FilaResult<Option<Stat>> {
        let Ok(at) = Self::location(fila) else {
            return Ok(None);
        };
        Ok(self.fs.stat(&at).await.ok().map(|stat| Stat {
            size: stat.size,
            modified_ticks: stat.mtime,
            created_ticks: stat.ctime.unwrap_or(0),
            accessed_ticks: 0,
            is_directory: stat.kind == EntryKind::Directory,
        }))
    }
}

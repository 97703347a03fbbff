/*!
 * Native Backend
 *
 * Direct host filesystem access through tokio::fs. Watching uses the
 * platform notifier via `notify`; native events are translated into
 * create/modify/delete with the rename source carried as `secondary`.
 */

use async_trait::async_trait;
use futures::future::BoxFuture;
use notify::event::{EventKind as NotifyKind, ModifyKind, RenameMode};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::address::Fila;
use super::registry::Registry;
use super::traits::Backend;
use super::types::{ticks, FilaError, FilaResult, Stat, WriteOptions};
use super::watch::{EventSink, StorageEvent, Unwatch};
use crate::core::limits::NOISE_FILENAMES;

const BACKEND: &str = "native";

/// Host filesystem backend
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeBackend;

impl NativeBackend {
    pub fn new() -> Self {
        Self
    }

    /// Registry using the host separator, working directory and temp dir
    pub fn registry() -> Arc<Registry> {
        let cwd = std::env::current_dir()
            .map(|dir| dir.to_string_lossy().into_owned())
            .unwrap_or_else(|_| std::path::MAIN_SEPARATOR_STR.to_string());
        let temp = std::env::temp_dir().to_string_lossy().into_owned();
        Self::registry_in(cwd, temp)
    }

    /// Registry with an explicit working and temporary directory
    pub fn registry_in(cwd: impl Into<String>, temp: impl Into<String>) -> Arc<Registry> {
        Registry::builder(Arc::new(Self))
            .separator(std::path::MAIN_SEPARATOR_STR)
            .cwd(cwd)
            .temp(temp)
            .build()
    }
}

fn os_path(fila: &Fila) -> PathBuf {
    PathBuf::from(fila.path())
}

fn is_noise(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map_or(false, |name| NOISE_FILENAMES.contains(&name))
}

/// Create the parent directory of `fila` when it is missing
async fn ensure_parent(fila: &Fila) -> FilaResult<()> {
    if fila.is_root() {
        return Ok(());
    }
    NativeBackend.write_directory(&fila.up()).await
}

/// Recursively copy a directory tree
fn copy_tree(from: PathBuf, to: PathBuf) -> BoxFuture<'static, std::io::Result<()>> {
    Box::pin(async move {
        tokio::fs::create_dir_all(&to).await?;
        let mut entries = tokio::fs::read_dir(&from).await?;

        while let Some(entry) = entries.next_entry().await? {
            let source = entry.path();
            let target = to.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                copy_tree(source, target).await?;
            } else {
                tokio::fs::copy(&source, &target).await?;
            }
        }
        Ok(())
    })
}

fn address(registry: &Arc<Registry>, path: &Path) -> Fila {
    Fila::from_path(Arc::clone(registry), &path.to_string_lossy())
}

/// Translate a native notification into storage events
///
/// Access events and platform noise files produce nothing.
pub fn translate(event: &Event, registry: &Arc<Registry>) -> Vec<StorageEvent> {
    let fila = |path: &Path| address(registry, path);
    let paths: Vec<&PathBuf> = event.paths.iter().filter(|path| !is_noise(path)).collect();

    match event.kind {
        NotifyKind::Create(_) => paths
            .into_iter()
            .map(|path| StorageEvent::create(fila(path.as_path())))
            .collect(),
        NotifyKind::Remove(_) => paths
            .into_iter()
            .map(|path| StorageEvent::delete(fila(path.as_path())))
            .collect(),
        NotifyKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => {
            let (from, to) = (&event.paths[0], &event.paths[1]);
            if is_noise(to) {
                return Vec::new();
            }
            vec![StorageEvent::Create {
                path: fila(to.as_path()),
                secondary: Some(fila(from.as_path())),
            }]
        }
        NotifyKind::Modify(ModifyKind::Name(RenameMode::From)) => paths
            .into_iter()
            .map(|path| StorageEvent::delete(fila(path.as_path())))
            .collect(),
        NotifyKind::Modify(ModifyKind::Name(RenameMode::To)) => paths
            .into_iter()
            .map(|path| StorageEvent::create(fila(path.as_path())))
            .collect(),
        NotifyKind::Modify(_) => paths
            .into_iter()
            .map(|path| StorageEvent::modify(fila(path.as_path())))
            .collect(),
        NotifyKind::Access(_) | NotifyKind::Any | NotifyKind::Other => Vec::new(),
    }
}

/// Live native watcher; dropping it detaches every listener
struct NativeWatch {
    watcher: Option<RecommendedWatcher>,
}

#[async_trait]
impl Unwatch for NativeWatch {
    async fn unwatch(&mut self) -> FilaResult<()> {
        self.watcher.take();
        Ok(())
    }
}

#[async_trait]
impl Backend for NativeBackend {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn read_text(&self, fila: &Fila) -> FilaResult<String> {
        tokio::fs::read_to_string(os_path(fila))
            .await
            .map_err(|e| FilaError::from_io(e, fila.path()))
    }

    async fn read_binary(&self, fila: &Fila) -> FilaResult<Vec<u8>> {
        tokio::fs::read(os_path(fila))
            .await
            .map_err(|e| FilaError::from_io(e, fila.path()))
    }

    async fn read_directory(&self, fila: &Fila) -> FilaResult<Vec<Fila>> {
        let io = |e| FilaError::from_io(e, fila.path());
        let mut entries = tokio::fs::read_dir(os_path(fila)).await.map_err(io)?;

        let mut children = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io)? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if NOISE_FILENAMES.contains(&name.as_str()) {
                continue;
            }
            children.push(fila.down(&[name]));
        }
        Ok(children)
    }

    async fn write_text(
        &self,
        fila: &Fila,
        text: &str,
        options: WriteOptions,
    ) -> FilaResult<()> {
        let failure = |e: FilaError| {
            warn!(path = %fila, error = %e, "text write failed");
            FilaError::write_failure(fila.path(), e)
        };
        ensure_parent(fila).await.map_err(failure)?;

        let path = os_path(fila);
        let io = |e| failure(FilaError::from_io(e, fila.path()));
        if options.append {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await
                .map_err(io)?;
            file.write_all(text.as_bytes()).await.map_err(io)?;
            file.flush().await.map_err(io)?;
        } else {
            tokio::fs::write(&path, text).await.map_err(io)?;
        }
        Ok(())
    }

    async fn write_binary(&self, fila: &Fila, data: &[u8]) -> FilaResult<()> {
        let failure = |e: FilaError| {
            warn!(path = %fila, error = %e, "binary write failed");
            FilaError::write_failure(fila.path(), e)
        };
        ensure_parent(fila).await.map_err(failure)?;
        tokio::fs::write(os_path(fila), data)
            .await
            .map_err(|e| failure(FilaError::from_io(e, fila.path())))
    }

    async fn write_directory(&self, fila: &Fila) -> FilaResult<()> {
        let path = os_path(fila);
        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_dir() => Ok(()),
            Ok(_) => Err(FilaError::AlreadyExists(fila.path())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tokio::fs::create_dir_all(&path)
                    .await
                    .map_err(|e| FilaError::from_io(e, fila.path()))?;
                debug!(path = %fila, "directory created");
                Ok(())
            }
            Err(e) => Err(FilaError::from_io(e, fila.path())),
        }
    }

    #[cfg(unix)]
    async fn write_symlink(&self, fila: &Fila, target: &Fila) -> FilaResult<()> {
        ensure_parent(fila).await?;
        tokio::fs::symlink(os_path(target), os_path(fila))
            .await
            .map_err(|e| FilaError::from_io(e, fila.path()))
    }

    #[cfg(not(unix))]
    async fn write_symlink(&self, _fila: &Fila, _target: &Fila) -> FilaResult<()> {
        Err(FilaError::unsupported("write_symlink", BACKEND))
    }

    async fn delete(&self, fila: &Fila) -> FilaResult<()> {
        let path = os_path(fila);
        let io = |e| FilaError::from_io(e, fila.path());
        let metadata = tokio::fs::symlink_metadata(&path).await.map_err(io)?;

        if metadata.is_dir() {
            tokio::fs::remove_dir_all(&path).await.map_err(io)
        } else {
            tokio::fs::remove_file(&path).await.map_err(io)
        }
    }

    async fn move_to(&self, fila: &Fila, target: &Fila) -> FilaResult<()> {
        ensure_parent(target).await?;
        tokio::fs::rename(os_path(fila), os_path(target))
            .await
            .map_err(|e| FilaError::from_io(e, fila.path()))
    }

    async fn copy_to(&self, fila: &Fila, target: &Fila) -> FilaResult<()> {
        let io = |e| FilaError::from_io(e, fila.path());
        let metadata = tokio::fs::metadata(os_path(fila)).await.map_err(io)?;

        ensure_parent(target).await?;
        if metadata.is_dir() {
            copy_tree(os_path(fila), os_path(target)).await.map_err(io)
        } else {
            tokio::fs::copy(os_path(fila), os_path(target))
                .await
                .map(|_| ())
                .map_err(io)
        }
    }

    async fn rename(&self, fila: &Fila, new_name: &str) -> FilaResult<()> {
        let target = fila.up().down(&[new_name]);
        tokio::fs::rename(os_path(fila), os_path(&target))
            .await
            .map_err(|e| FilaError::from_io(e, fila.path()))
    }

    async fn watch(
        &self,
        fila: &Fila,
        recursive: bool,
        sink: EventSink,
    ) -> FilaResult<Box<dyn Unwatch>> {
        let registry = Arc::clone(fila.registry());
        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            match result {
                Ok(event) => {
                    for storage_event in translate(&event, &registry) {
                        if !sink.emit(storage_event) {
                            return;
                        }
                    }
                }
                Err(e) => warn!(error = %e, "native watch error"),
            }
        })
        .map_err(|e| FilaError::Watch(e.to_string()))?;

        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher
            .watch(&os_path(fila), mode)
            .map_err(|e| FilaError::Watch(format!("{}: {}", fila.path(), e)))?;

        debug!(path = %fila, recursive, "native watch registered");
        Ok(Box::new(NativeWatch {
            watcher: Some(watcher),
        }))
    }

    async fn stat(&self, fila: &Fila) -> FilaResult<Option<Stat>> {
        match tokio::fs::metadata(os_path(fila)).await {
            Ok(metadata) => Ok(Some(Stat {
                size: metadata.len(),
                modified_ticks: ticks(metadata.modified()),
                created_ticks: ticks(metadata.created()),
                accessed_ticks: ticks(metadata.accessed()),
                is_directory: metadata.is_dir(),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FilaError::from_io(e, fila.path())),
        }
    }
}

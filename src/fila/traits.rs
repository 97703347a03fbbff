/*!
 * Storage Backend Trait
 * The capability surface every platform backend implements
 */

use async_trait::async_trait;

use super::address::Fila;
use super::types::{FilaResult, Stat, WriteOptions};
use super::watch::{EventSink, Unwatch};

/// Platform storage backend
///
/// Every operation receives the address it acts on. Operations a platform
/// cannot express fail with `FilaError::Unsupported`; the remaining surface
/// behaves the same on every backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Get backend name
    fn name(&self) -> &str;

    /// Read a file as UTF-8 text
    async fn read_text(&self, fila: &Fila) -> FilaResult<String>;

    /// Read a file as raw bytes
    async fn read_binary(&self, fila: &Fila) -> FilaResult<Vec<u8>>;

    /// List the direct children of a directory
    async fn read_directory(&self, fila: &Fila) -> FilaResult<Vec<Fila>>;

    /// Write text, creating the parent directory when missing
    async fn write_text(&self, fila: &Fila, text: &str, options: WriteOptions)
        -> FilaResult<()>;

    /// Write bytes, creating the parent directory when missing
    async fn write_binary(&self, fila: &Fila, data: &[u8]) -> FilaResult<()>;

    /// Create a directory and its ancestors; succeeds if it already exists
    async fn write_directory(&self, fila: &Fila) -> FilaResult<()>;

    /// Create a symbolic link at `fila` pointing to `target`
    async fn write_symlink(&self, fila: &Fila, target: &Fila) -> FilaResult<()>;

    /// Remove a file, or a directory recursively
    async fn delete(&self, fila: &Fila) -> FilaResult<()>;

    /// Move to `target`
    async fn move_to(&self, fila: &Fila, target: &Fila) -> FilaResult<()>;

    /// Copy to `target`
    async fn copy_to(&self, fila: &Fila, target: &Fila) -> FilaResult<()>;

    /// Rename within the parent directory
    async fn rename(&self, fila: &Fila, new_name: &str) -> FilaResult<()>;

    /// Register a watch, emitting through `sink` until unwatched
    async fn watch(
        &self,
        fila: &Fila,
        recursive: bool,
        sink: EventSink,
    ) -> FilaResult<Box<dyn Unwatch>>;

    /// Get metadata, `None` when nothing exists at the address
    async fn stat(&self, fila: &Fila) -> FilaResult<Option<Stat>>;

    /// Check whether anything exists at the address
    async fn exists(&self, fila: &Fila) -> bool {
        matches!(self.stat(fila).await, Ok(Some(_)))
    }

    /// Drop cached metadata for the address
    fn invalidate(&self, _fila: &Fila) {}
}

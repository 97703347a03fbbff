/*!
 * Desktop Webview Plugins
 * File access and IPC surface exposed by the desktop host
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::fila::types::{PluginError, Stat};

/// Identifier of a registered event listener
pub type ListenerId = u64;

/// Callback receiving the payload of each event on a channel
pub type EventHandler = Arc<dyn Fn(serde_json::Value) + Send + Sync>;

/// Entry reported by `read_dir`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub path: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Result of the metadata command; times are epoch milliseconds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DesktopMetadata {
    pub size: u64,
    pub modified_at: u64,
    pub created_at: u64,
    pub accessed_at: u64,
    pub is_dir: bool,
}

impl From<DesktopMetadata> for Stat {
    fn from(metadata: DesktopMetadata) -> Self {
        Stat {
            size: metadata.size,
            modified_ticks: metadata.modified_at,
            created_ticks: metadata.created_at,
            accessed_ticks: metadata.accessed_at,
            is_directory: metadata.is_dir,
        }
    }
}

/// Desktop host file API
#[async_trait]
pub trait DesktopFs: Send + Sync {
    async fn read_text_file(&self, path: &str) -> Result<String, PluginError>;

    async fn read_binary_file(&self, path: &str) -> Result<Vec<u8>, PluginError>;

    async fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, PluginError>;

    async fn write_text_file(&self, path: &str, text: &str, append: bool)
        -> Result<(), PluginError>;

    async fn write_binary_file(&self, path: &str, data: &[u8]) -> Result<(), PluginError>;

    async fn create_dir(&self, path: &str, recursive: bool) -> Result<(), PluginError>;

    async fn remove_dir(&self, path: &str, recursive: bool) -> Result<(), PluginError>;

    async fn remove_file(&self, path: &str) -> Result<(), PluginError>;

    async fn copy_file(&self, from: &str, to: &str) -> Result<(), PluginError>;

    /// Works on directories too
    async fn rename_file(&self, from: &str, to: &str) -> Result<(), PluginError>;

    async fn exists(&self, path: &str) -> Result<bool, PluginError>;
}

/// Desktop host command and event bridge
#[async_trait]
pub trait DesktopIpc: Send + Sync {
    /// Run a host command
    async fn invoke(
        &self,
        command: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, PluginError>;

    /// Subscribe `handler` to events on `channel`
    async fn listen(&self, channel: &str, handler: EventHandler)
        -> Result<ListenerId, PluginError>;

    async fn unlisten(&self, listener: ListenerId) -> Result<(), PluginError>;
}

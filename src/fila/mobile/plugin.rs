/*!
 * Mobile Filesystem Plugin
 * The host bridge surface the mobile backend talks to
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::fila::types::PluginError;

/// Well-known storage root exposed by the mobile host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Directory {
    Documents,
    Data,
    Library,
    Cache,
    External,
    ExternalStorage,
}

impl Directory {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Directory::Documents => "DOCUMENTS",
            Directory::Data => "DATA",
            Directory::Library => "LIBRARY",
            Directory::Cache => "CACHE",
            Directory::External => "EXTERNAL",
            Directory::ExternalStorage => "EXTERNAL_STORAGE",
        }
    }
}

impl FromStr for Directory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DOCUMENTS" => Ok(Directory::Documents),
            "DATA" => Ok(Directory::Data),
            "LIBRARY" => Ok(Directory::Library),
            "CACHE" => Ok(Directory::Cache),
            "EXTERNAL" => Ok(Directory::External),
            "EXTERNAL_STORAGE" => Ok(Directory::ExternalStorage),
            _ => Err(format!("unknown mobile directory: {}", s)),
        }
    }
}

impl fmt::Display for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text encoding for plugin reads and writes; `None` means base64 data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Utf8,
}

/// Location inside a plugin directory
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub directory: Directory,
    pub path: String,
}

impl Location {
    pub fn new(directory: Directory, path: impl Into<String>) -> Self {
        Self {
            directory,
            path: path.into(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.directory)
        } else {
            write!(f, "{}/{}", self.directory, self.path)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// Directory entry reported by `readdir`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

/// Metadata reported by `stat`; times are epoch milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub size: u64,
    pub mtime: u64,
    #[serde(default)]
    pub ctime: Option<u64>,
}

/// Mobile host filesystem bridge
///
/// Binary data crosses the bridge as base64 text (`encoding: None`).
#[async_trait]
pub trait MobileFilesystem: Send + Sync {
    async fn read_file(&self, at: &Location, encoding: Option<Encoding>)
        -> Result<String, PluginError>;

    async fn write_file(
        &self,
        at: &Location,
        data: &str,
        encoding: Option<Encoding>,
    ) -> Result<(), PluginError>;

    async fn append_file(
        &self,
        at: &Location,
        data: &str,
        encoding: Option<Encoding>,
    ) -> Result<(), PluginError>;

    async fn readdir(&self, at: &Location) -> Result<Vec<FileInfo>, PluginError>;

    async fn mkdir(&self, at: &Location, recursive: bool) -> Result<(), PluginError>;

    async fn rmdir(&self, at: &Location, recursive: bool) -> Result<(), PluginError>;

    async fn delete_file(&self, at: &Location) -> Result<(), PluginError>;

    async fn copy(&self, from: &Location, to: &Location) -> Result<(), PluginError>;

    async fn rename(&self, from: &Location, to: &Location) -> Result<(), PluginError>;

    async fn stat(&self, at: &Location) -> Result<FileStat, PluginError>;
}

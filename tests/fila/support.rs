/*!
 * Test Hosts
 * In-memory stand-ins for the mobile plugin and the desktop webview bridge
 */

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use fila::fila::desktop::{DesktopFs, DesktopIpc, DirEntry, EventHandler, ListenerId};
use fila::fila::mobile::{Directory, Encoding, EntryKind, FileInfo, FileStat, Location, MobileFilesystem};
use fila::fila::PluginError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    File(Vec<u8>),
    Dir,
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(index) => &path[..index],
        None => "",
    }
}

fn name_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(index) => &path[index + 1..],
        None => path,
    }
}

// ============================================================================
// Mobile
// ============================================================================

/// Mobile plugin keeping files per `Directory`
///
/// The relative path `""` is the directory itself and always exists.
#[derive(Default)]
pub struct MemoryMobileFs {
    nodes: Mutex<HashMap<(Directory, String), Node>>,
    pub calls: Mutex<Vec<String>>,
}

impl MemoryMobileFs {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn node(&self, directory: Directory, path: &str) -> Option<Node> {
        self.nodes.lock().get(&(directory, path.to_string())).cloned()
    }

    pub fn insert(&self, directory: Directory, path: &str, node: Node) {
        self.nodes.lock().insert((directory, path.to_string()), node);
    }

    fn record(&self, call: &str, at: &Location) {
        self.calls.lock().push(format!("{} {}", call, at));
    }

    fn is_dir(&self, directory: Directory, path: &str) -> bool {
        path.is_empty() || self.node(directory, path) == Some(Node::Dir)
    }

    fn require_parent(&self, at: &Location) -> Result<(), PluginError> {
        if self.is_dir(at.directory, parent_of(&at.path)) {
            Ok(())
        } else {
            Err(PluginError::NotFound(format!("{}/{}", at.directory, parent_of(&at.path))))
        }
    }

    fn descendants(&self, directory: Directory, path: &str) -> Vec<String> {
        let prefix = format!("{}/", path);
        self.nodes
            .lock()
            .keys()
            .filter(|(d, p)| *d == directory && (path.is_empty() || p.starts_with(&prefix)))
            .map(|(_, p)| p.clone())
            .collect()
    }
}

#[async_trait]
impl MobileFilesystem for MemoryMobileFs {
    async fn read_file(&self, at: &Location, _encoding: Option<Encoding>) -> Result<String, PluginError> {
        self.record("read_file", at);
        match self.node(at.directory, &at.path) {
            Some(Node::File(data)) => Ok(String::from_utf8_lossy(&data).into_owned()),
            _ => Err(PluginError::NotFound(at.to_string())),
        }
    }

    async fn write_file(&self, at: &Location, data: &str, _encoding: Option<Encoding>) -> Result<(), PluginError> {
        self.record("write_file", at);
        self.require_parent(at)?;
        self.insert(at.directory, &at.path, Node::File(data.as_bytes().to_vec()));
        Ok(())
    }

    async fn append_file(&self, at: &Location, data: &str, _encoding: Option<Encoding>) -> Result<(), PluginError> {
        self.record("append_file", at);
        self.require_parent(at)?;
        let mut nodes = self.nodes.lock();
        let entry = nodes
            .entry((at.directory, at.path.clone()))
            .or_insert_with(|| Node::File(Vec::new()));
        match entry {
            Node::File(existing) => {
                existing.extend_from_slice(data.as_bytes());
                Ok(())
            }
            Node::Dir => Err(PluginError::Failed(format!("{} is a directory", at))),
        }
    }

    async fn readdir(&self, at: &Location) -> Result<Vec<FileInfo>, PluginError> {
        self.record("readdir", at);
        if !self.is_dir(at.directory, &at.path) {
            return Err(PluginError::NotFound(at.to_string()));
        }
        let nodes = self.nodes.lock();
        Ok(nodes
            .iter()
            .filter(|((d, p), _)| *d == at.directory && parent_of(p) == at.path)
            .map(|((_, p), node)| FileInfo {
                name: name_of(p).to_string(),
                kind: match node {
                    Node::Dir => EntryKind::Directory,
                    Node::File(_) => EntryKind::File,
                },
            })
            .collect())
    }

    async fn mkdir(&self, at: &Location, recursive: bool) -> Result<(), PluginError> {
        self.record("mkdir", at);
        if !recursive {
            self.require_parent(at)?;
        }
        let mut path = String::new();
        for segment in at.path.split('/').filter(|s| !s.is_empty()) {
            if !path.is_empty() {
                path.push('/');
            }
            path.push_str(segment);
            if let Some(Node::File(_)) = self.node(at.directory, &path) {
                return Err(PluginError::AlreadyExists(path));
            }
            self.insert(at.directory, &path, Node::Dir);
        }
        Ok(())
    }

    async fn rmdir(&self, at: &Location, _recursive: bool) -> Result<(), PluginError> {
        self.record("rmdir", at);
        for path in self.descendants(at.directory, &at.path) {
            self.nodes.lock().remove(&(at.directory, path));
        }
        self.nodes.lock().remove(&(at.directory, at.path.clone()));
        Ok(())
    }

    async fn delete_file(&self, at: &Location) -> Result<(), PluginError> {
        self.record("delete_file", at);
        match self.nodes.lock().remove(&(at.directory, at.path.clone())) {
            Some(_) => Ok(()),
            None => Err(PluginError::NotFound(at.to_string())),
        }
    }

    async fn copy(&self, from: &Location, to: &Location) -> Result<(), PluginError> {
        self.record("copy", from);
        let node = self
            .node(from.directory, &from.path)
            .ok_or_else(|| PluginError::NotFound(from.to_string()))?;
        self.insert(to.directory, &to.path, node);
        Ok(())
    }

    async fn rename(&self, from: &Location, to: &Location) -> Result<(), PluginError> {
        self.record("rename", from);
        let node = self
            .nodes
            .lock()
            .remove(&(from.directory, from.path.clone()))
            .ok_or_else(|| PluginError::NotFound(from.to_string()))?;
        self.insert(to.directory, &to.path, node);
        Ok(())
    }

    async fn stat(&self, at: &Location) -> Result<FileStat, PluginError> {
        if at.path.is_empty() {
            return Ok(FileStat {
                kind: EntryKind::Directory,
                size: 0,
                mtime: 0,
                ctime: None,
            });
        }
        match self.node(at.directory, &at.path) {
            Some(Node::Dir) => Ok(FileStat {
                kind: EntryKind::Directory,
                size: 0,
                mtime: 1_000,
                ctime: None,
            }),
            Some(Node::File(data)) => Ok(FileStat {
                kind: EntryKind::File,
                size: data.len() as u64,
                mtime: 2_000,
                ctime: Some(1_000),
            }),
            None => Err(PluginError::NotFound(at.to_string())),
        }
    }
}

// ============================================================================
// Desktop
// ============================================================================

/// Desktop host serving both the fs API and the IPC commands
///
/// Paths are absolute with `/`; the root always exists.
pub struct MemoryDesktopHost {
    nodes: Mutex<BTreeMap<String, Node>>,
    listeners: Mutex<HashMap<ListenerId, (String, EventHandler)>>,
    next_listener: AtomicU64,
    pub watches: Mutex<Vec<u64>>,
    pub commands: Mutex<Vec<String>>,
    pub metadata_calls: AtomicUsize,
    pub fail_listen: AtomicBool,
    pub fail_watch: AtomicBool,
}

impl MemoryDesktopHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            nodes: Mutex::new(BTreeMap::new()),
            listeners: Mutex::new(HashMap::new()),
            next_listener: AtomicU64::new(1),
            watches: Mutex::new(Vec::new()),
            commands: Mutex::new(Vec::new()),
            metadata_calls: AtomicUsize::new(0),
            fail_listen: AtomicBool::new(false),
            fail_watch: AtomicBool::new(false),
        })
    }

    pub fn node(&self, path: &str) -> Option<Node> {
        if path == "/" {
            return Some(Node::Dir);
        }
        self.nodes.lock().get(path).cloned()
    }

    /// Change a file behind the backend's back
    pub fn put_file(&self, path: &str, data: &[u8]) {
        self.nodes.lock().insert(path.to_string(), Node::File(data.to_vec()));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Deliver a raw event to every listener
    pub fn fire(&self, raw: Value) {
        let handlers: Vec<EventHandler> = self
            .listeners
            .lock()
            .values()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        for handler in handlers {
            handler(raw.clone());
        }
    }

    fn parent_of(path: &str) -> &str {
        match path.rfind('/') {
            Some(0) | None => "/",
            Some(index) => &path[..index],
        }
    }

    fn require_parent(&self, path: &str) -> Result<(), PluginError> {
        match self.node(Self::parent_of(path)) {
            Some(Node::Dir) => Ok(()),
            _ => Err(PluginError::NotFound(Self::parent_of(path).to_string())),
        }
    }
}

#[async_trait]
impl DesktopFs for MemoryDesktopHost {
    async fn read_text_file(&self, path: &str) -> Result<String, PluginError> {
        match self.node(path) {
            Some(Node::File(data)) => Ok(String::from_utf8_lossy(&data).into_owned()),
            _ => Err(PluginError::NotFound(path.to_string())),
        }
    }

    async fn read_binary_file(&self, path: &str) -> Result<Vec<u8>, PluginError> {
        match self.node(path) {
            Some(Node::File(data)) => Ok(data),
            _ => Err(PluginError::NotFound(path.to_string())),
        }
    }

    async fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, PluginError> {
        if self.node(path) != Some(Node::Dir) {
            return Err(PluginError::NotFound(path.to_string()));
        }
        Ok(self
            .nodes
            .lock()
            .keys()
            .filter(|key| Self::parent_of(key) == path)
            .map(|key| DirEntry {
                path: key.clone(),
                name: Some(name_of(key).to_string()),
            })
            .collect())
    }

    async fn write_text_file(&self, path: &str, text: &str, append: bool) -> Result<(), PluginError> {
        self.require_parent(path)?;
        let mut nodes = self.nodes.lock();
        match nodes.get_mut(path) {
            Some(Node::File(existing)) if append => existing.extend_from_slice(text.as_bytes()),
            Some(Node::Dir) => return Err(PluginError::Failed(format!("{} is a directory", path))),
            _ => {
                nodes.insert(path.to_string(), Node::File(text.as_bytes().to_vec()));
            }
        }
        Ok(())
    }

    async fn write_binary_file(&self, path: &str, data: &[u8]) -> Result<(), PluginError> {
        self.require_parent(path)?;
        self.put_file(path, data);
        Ok(())
    }

    async fn create_dir(&self, path: &str, _recursive: bool) -> Result<(), PluginError> {
        let mut current = String::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current.push('/');
            current.push_str(segment);
            if let Some(Node::File(_)) = self.node(&current) {
                return Err(PluginError::AlreadyExists(current));
            }
            self.nodes.lock().insert(current.clone(), Node::Dir);
        }
        Ok(())
    }

    async fn remove_dir(&self, path: &str, _recursive: bool) -> Result<(), PluginError> {
        let prefix = format!("{}/", path);
        self.nodes
            .lock()
            .retain(|key, _| key != path && !key.starts_with(&prefix));
        Ok(())
    }

    async fn remove_file(&self, path: &str) -> Result<(), PluginError> {
        match self.nodes.lock().remove(path) {
            Some(_) => Ok(()),
            None => Err(PluginError::NotFound(path.to_string())),
        }
    }

    async fn copy_file(&self, from: &str, to: &str) -> Result<(), PluginError> {
        let data = self.read_binary_file(from).await?;
        self.put_file(to, &data);
        Ok(())
    }

    async fn rename_file(&self, from: &str, to: &str) -> Result<(), PluginError> {
        let node = self
            .nodes
            .lock()
            .remove(from)
            .ok_or_else(|| PluginError::NotFound(from.to_string()))?;
        self.nodes.lock().insert(to.to_string(), node);
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool, PluginError> {
        Ok(self.node(path).is_some())
    }
}

#[async_trait]
impl DesktopIpc for MemoryDesktopHost {
    async fn invoke(&self, command: &str, args: Value) -> Result<Value, PluginError> {
        self.commands.lock().push(command.to_string());
        match command {
            "plugin:fs-extra|metadata" => {
                self.metadata_calls.fetch_add(1, Ordering::SeqCst);
                let path = args["path"].as_str().unwrap_or_default();
                match self.node(path) {
                    Some(Node::Dir) => Ok(json!({ "size": 0, "modifiedAt": 10, "isDir": true })),
                    Some(Node::File(data)) => Ok(json!({
                        "size": data.len(),
                        "modifiedAt": 20,
                        "createdAt": 10,
                        "accessedAt": 30,
                        "isDir": false,
                    })),
                    None => Err(PluginError::NotFound(path.to_string())),
                }
            }
            "plugin:fs-watch|watch" => {
                if self.fail_watch.load(Ordering::SeqCst) {
                    return Err(PluginError::Failed("watch rejected".into()));
                }
                let id = args["id"].as_u64().unwrap_or_default();
                self.watches.lock().push(id);
                Ok(Value::Null)
            }
            "plugin:fs-watch|unwatch" => {
                let id = args["id"].as_u64().unwrap_or_default();
                self.watches.lock().retain(|w| *w != id);
                Ok(Value::Null)
            }
            other => Err(PluginError::Failed(format!("unknown command {}", other))),
        }
    }

    async fn listen(&self, channel: &str, handler: EventHandler) -> Result<ListenerId, PluginError> {
        if self.fail_listen.load(Ordering::SeqCst) {
            return Err(PluginError::Failed("listen rejected".into()));
        }
        let id = self.next_listener.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock().insert(id, (channel.to_string(), handler));
        Ok(id)
    }

    async fn unlisten(&self, listener: ListenerId) -> Result<(), PluginError> {
        self.listeners.lock().remove(&listener);
        Ok(())
    }
}

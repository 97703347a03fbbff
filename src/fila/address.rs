/*!
 * Path Address
 *
 * `Fila` is an immutable, normalized absolute location. It carries the
 * registry it was built against and forwards every storage operation to
 * that registry's backend.
 */

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::instrument;

use super::paths;
use super::registry::Registry;
use super::traits::Backend;
use super::types::{FilaResult, Stat, WriteOptions};
use super::watch::{EventSink, StorageEvent, WatchSubscription};
use crate::core::limits::ROOT;

/// Normalized absolute storage address
///
/// Components never contain the separator, `.` or `..`. The root is the
/// single component `"/"`. Equality compares components only.
#[derive(Clone)]
pub struct Fila {
    components: Vec<String>,
    registry: Arc<Registry>,
}

impl Fila {
    /// Build an address from components
    ///
    /// Empty components are dropped. When nothing is left, or the first
    /// component starts with `.`, the registry's working directory is
    /// prepended. Components may themselves contain separators.
    pub fn new<S: AsRef<str>>(registry: Arc<Registry>, components: &[S]) -> Self {
        let cwd = registry.cwd_path().to_string();
        let mut parts: Vec<&str> = components
            .iter()
            .map(AsRef::as_ref)
            .filter(|c| !c.is_empty())
            .collect();

        if parts.concat() == ROOT {
            return Self::root_of(registry);
        }

        let relative = parts.first().map_or(true, |first| first.starts_with('.'));
        if relative {
            parts.insert(0, &cwd);
        }

        let separator = registry.separator();
        let segments: Vec<&str> = parts
            .iter()
            .flat_map(|part| part.split(separator))
            .filter(|segment| !segment.is_empty())
            .collect();

        let normalized = paths::normalize(&format!("/{}", segments.join("/")));
        let components: Vec<String> = normalized
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();

        if components.is_empty() {
            return Self::root_of(registry);
        }
        Self {
            components,
            registry,
        }
    }

    /// Build an address from a path string
    pub fn from_path(registry: Arc<Registry>, path: &str) -> Self {
        Self::new(registry, &[path])
    }

    /// Build an address against the process-wide registry
    pub fn parse(path: &str) -> FilaResult<Self> {
        Ok(Self::from_path(Registry::active()?, path))
    }

    fn root_of(registry: Arc<Registry>) -> Self {
        Self {
            components: vec![ROOT.to_string()],
            registry,
        }
    }

    /// Address from components already known to be normalized
    fn from_components(registry: Arc<Registry>, components: Vec<String>) -> Self {
        if components.is_empty() {
            return Self::root_of(registry);
        }
        Self {
            components,
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    fn backend(&self) -> &Arc<dyn Backend> {
        self.registry.backend()
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    pub fn is_root(&self) -> bool {
        self.components.len() == 1 && self.components[0] == ROOT
    }

    /// Path using the registry separator
    pub fn path(&self) -> String {
        if self.is_root() {
            return ROOT.to_string();
        }
        let separator = self.registry.separator();
        format!("{}{}", separator, self.components.join(separator))
    }

    /// Path using `/`, independent of the registry separator
    pub(crate) fn posix_path(&self) -> String {
        if self.is_root() {
            return ROOT.to_string();
        }
        format!("/{}", self.components.join("/"))
    }

    /// Last component; empty for the root
    pub fn name(&self) -> &str {
        if self.is_root() {
            return "";
        }
        self.components.last().map_or("", String::as_str)
    }

    /// Extension of the name including the dot, or empty
    pub fn extension(&self) -> &str {
        let name = self.name();
        match name.rfind('.') {
            Some(index) => &name[index..],
            None => "",
        }
    }

    /// Parent address; the root is its own parent
    pub fn up(&self) -> Fila {
        self.up_by(1)
    }

    /// Ancestor `levels` steps up, stopping at the root
    pub fn up_by(&self, levels: usize) -> Fila {
        if self.is_root() {
            return self.clone();
        }
        let keep = self.components.len().saturating_sub(levels);
        Self::from_components(Arc::clone(&self.registry), self.components[..keep].to_vec())
    }

    /// Descendant address, normalizing `..` in `more`
    pub fn down<S: AsRef<str>>(&self, more: &[S]) -> Fila {
        let mut parts: Vec<&str> = Vec::with_capacity(self.components.len() + more.len() + 1);
        parts.push(ROOT);
        if !self.is_root() {
            parts.extend(self.components.iter().map(String::as_str));
        }
        parts.extend(more.iter().map(AsRef::as_ref));
        Self::new(Arc::clone(&self.registry), &parts)
    }

    /// Nearest address named `name` in this directory or an ancestor
    ///
    /// Each candidate is `ancestor.down([name])`, starting at `self`.
    pub async fn upscan(&self, name: &str) -> Option<Fila> {
        let mut ancestry = self.clone();
        loop {
            let candidate = ancestry.down(&[name]);
            if candidate.exists().await {
                return Some(candidate);
            }
            if ancestry.is_root() {
                return None;
            }
            ancestry = ancestry.up();
        }
    }

    /// This address when it is a directory, else its parent
    pub async fn get_directory(&self) -> Fila {
        if self.is_directory().await {
            self.clone()
        } else {
            self.up()
        }
    }

    /// Relative path from this address to `other`
    pub fn relative_to(&self, other: &Fila) -> String {
        paths::relative_in(ROOT, &self.posix_path(), &other.posix_path())
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    pub async fn stat(&self) -> FilaResult<Option<Stat>> {
        self.backend().stat(self).await
    }

    /// Metadata, or the empty stat when unavailable
    async fn stat_or_default(&self) -> Stat {
        self.stat().await.ok().flatten().unwrap_or_default()
    }

    pub async fn exists(&self) -> bool {
        self.backend().exists(self).await
    }

    pub async fn is_directory(&self) -> bool {
        self.stat_or_default().await.is_directory
    }

    pub async fn is_file(&self) -> bool {
        matches!(self.stat().await, Ok(Some(stat)) if !stat.is_directory)
    }

    pub async fn get_size(&self) -> u64 {
        self.stat_or_default().await.size
    }

    pub async fn get_modified_ticks(&self) -> u64 {
        self.stat_or_default().await.modified_ticks
    }

    pub async fn get_created_ticks(&self) -> u64 {
        self.stat_or_default().await.created_ticks
    }

    pub async fn get_accessed_ticks(&self) -> u64 {
        self.stat_or_default().await.accessed_ticks
    }

    /// Drop any metadata the backend cached for this address
    pub fn invalidate(&self) {
        self.backend().invalidate(self);
    }

    // ========================================================================
    // Operations
    // ========================================================================

    pub async fn read_text(&self) -> FilaResult<String> {
        self.backend().read_text(self).await
    }

    pub async fn read_binary(&self) -> FilaResult<Vec<u8>> {
        self.backend().read_binary(self).await
    }

    pub async fn read_directory(&self) -> FilaResult<Vec<Fila>> {
        self.backend().read_directory(self).await
    }

    #[instrument(level = "debug", skip_all, fields(path = %self, append = options.append))]
    pub async fn write_text(&self, text: &str, options: WriteOptions) -> FilaResult<()> {
        self.backend().write_text(self, text, options).await
    }

    #[instrument(level = "debug", skip_all, fields(path = %self, len = data.len()))]
    pub async fn write_binary(&self, data: &[u8]) -> FilaResult<()> {
        self.backend().write_binary(self, data).await
    }

    pub async fn write_directory(&self) -> FilaResult<()> {
        self.backend().write_directory(self).await
    }

    pub async fn write_symlink(&self, target: &Fila) -> FilaResult<()> {
        self.backend().write_symlink(self, target).await
    }

    #[instrument(level = "debug", skip_all, fields(path = %self))]
    pub async fn delete(&self) -> FilaResult<()> {
        self.backend().delete(self).await
    }

    pub async fn move_to(&self, target: &Fila) -> FilaResult<()> {
        self.backend().move_to(self, target).await
    }

    pub async fn copy_to(&self, target: &Fila) -> FilaResult<()> {
        self.backend().copy_to(self, target).await
    }

    pub async fn rename(&self, new_name: &str) -> FilaResult<()> {
        self.backend().rename(self, new_name).await
    }

    /// Watch this address
    ///
    /// Returns at once; registration continues in the background. Await
    /// `WatchSubscription::ready` to observe registration failures.
    pub fn watch<F>(&self, recursive: bool, callback: F) -> WatchSubscription
    where
        F: Fn(StorageEvent) + Send + Sync + 'static,
    {
        let sink = EventSink::new(callback);
        let task_sink = sink.clone();
        let fila = self.clone();

        WatchSubscription::spawn(sink, async move {
            fila.backend().watch(&fila, recursive, task_sink).await
        })
    }
}

impl PartialEq for Fila {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components
    }
}

impl Eq for Fila {}

impl Hash for Fila {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.components.hash(state);
    }
}

impl fmt::Display for Fila {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

impl fmt::Debug for Fila {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fila({})", self.path())
    }
}

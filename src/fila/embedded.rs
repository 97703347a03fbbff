/*!
 * Embedded Backend
 *
 * Virtual filesystem inside a single Keyva store. Every object is one
 * record keyed by its absolute path: `Value::Null` marks a directory, text
 * and bytes are files. Directory listings are prefix scans.
 */

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::address::Fila;
use super::registry::Registry;
use super::traits::Backend;
use super::types::{FilaError, FilaResult, Stat, WriteOptions};
use super::watch::{EventSink, Unwatch};
use crate::core::limits::{EMBEDDED_CWD, EMBEDDED_STORE_NAME, EMBEDDED_TEMP, ROOT};
use crate::keyva::{Engine, Key, KeyRange, Keyva, KeyvaOptions, Query, Value};

const BACKEND: &str = "embedded";

/// Filesystem stored in a Keyva store
#[derive(Debug)]
pub struct EmbeddedBackend {
    store: Keyva,
}

impl EmbeddedBackend {
    /// Backend over the `fila` store of `engine`
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self::with_store(Keyva::new(engine, KeyvaOptions::named(EMBEDDED_STORE_NAME)))
    }

    pub fn with_store(store: Keyva) -> Self {
        Self { store }
    }

    /// Registry rooted at `/` with a `/__temp/` temporary directory
    pub fn registry(self) -> Arc<Registry> {
        Registry::builder(Arc::new(self))
            .cwd(EMBEDDED_CWD)
            .temp(EMBEDDED_TEMP)
            .build()
    }

    pub fn store(&self) -> &Keyva {
        &self.store
    }

    fn key(fila: &Fila) -> Key {
        Key::String(fila.posix_path())
    }

    /// Key prefix shared by every descendant of `fila`
    fn child_prefix(fila: &Fila) -> String {
        if fila.is_root() {
            ROOT.to_string()
        } else {
            format!("{}/", fila.posix_path())
        }
    }

    async fn value(&self, fila: &Fila) -> FilaResult<Option<Value>> {
        Ok(self.store.get(Self::key(fila)).await?)
    }

    /// Create every missing ancestor of `fila`, outermost first
    async fn ensure_ancestors(&self, fila: &Fila) -> FilaResult<()> {
        let mut missing = Vec::new();
        let mut current = fila.up();

        while !current.is_root() {
            match self.value(&current).await? {
                Some(Value::Null) => break,
                Some(_) => return Err(FilaError::NotADirectory(current.path())),
                None => {
                    missing.push(current.clone());
                    current = current.up();
                }
            }
        }

        for directory in missing.iter().rev() {
            self.store.set(Self::key(directory), Value::Null).await?;
        }
        Ok(())
    }

    async fn write_value(&self, fila: &Fila, value: Value) -> FilaResult<()> {
        if let Some(Value::Null) = self.value(fila).await? {
            return Err(FilaError::IsADirectory(fila.path()));
        }
        self.ensure_ancestors(fila).await?;
        self.store.set(Self::key(fila), value).await?;
        Ok(())
    }
}

#[async_trait]
impl Backend for EmbeddedBackend {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn read_text(&self, fila: &Fila) -> FilaResult<String> {
        match self.value(fila).await? {
            None => Err(FilaError::NotFound(fila.path())),
            Some(Value::Null) => Err(FilaError::IsADirectory(fila.path())),
            Some(Value::Text(text)) => Ok(text),
            Some(Value::Bytes(bytes)) => String::from_utf8(bytes)
                .map_err(|_| FilaError::Io(format!("{}: not valid UTF-8", fila.path()))),
            Some(Value::Json(json)) => Ok(json.to_string()),
        }
    }

    async fn read_binary(&self, fila: &Fila) -> FilaResult<Vec<u8>> {
        match self.value(fila).await? {
            None => Err(FilaError::NotFound(fila.path())),
            Some(Value::Null) => Err(FilaError::IsADirectory(fila.path())),
            Some(Value::Text(text)) => Ok(text.into_bytes()),
            Some(Value::Bytes(bytes)) => Ok(bytes),
            Some(Value::Json(json)) => Ok(json.to_string().into_bytes()),
        }
    }

    async fn read_directory(&self, fila: &Fila) -> FilaResult<Vec<Fila>> {
        if !fila.is_root() {
            match self.value(fila).await? {
                Some(Value::Null) => {}
                Some(_) => return Err(FilaError::NotADirectory(fila.path())),
                None => return Err(FilaError::NotFound(fila.path())),
            }
        }

        let prefix = Self::child_prefix(fila);
        let keys = self
            .store
            .each_keys(&Query::all().range(KeyRange::prefix(&prefix)))
            .await?;

        let children = keys
            .iter()
            .filter_map(Key::as_str)
            .filter(|key| {
                let rest = &key[prefix.len()..];
                !rest.is_empty() && !rest.contains('/')
            })
            .map(|key| Fila::from_path(Arc::clone(fila.registry()), key))
            .collect();
        Ok(children)
    }

    async fn write_text(
        &self,
        fila: &Fila,
        text: &str,
        options: WriteOptions,
    ) -> FilaResult<()> {
        let text = if options.append {
            match self.value(fila).await? {
                Some(Value::Text(existing)) => existing + text,
                Some(Value::Bytes(existing)) => {
                    String::from_utf8_lossy(&existing).into_owned() + text
                }
                _ => text.to_string(),
            }
        } else {
            text.to_string()
        };

        self.write_value(fila, Value::Text(text))
            .await
            .map_err(|e| FilaError::write_failure(fila.path(), e))?;
        debug!(path = %fila, "text written");
        Ok(())
    }

    async fn write_binary(&self, fila: &Fila, data: &[u8]) -> FilaResult<()> {
        self.write_value(fila, Value::Bytes(data.to_vec()))
            .await
            .map_err(|e| FilaError::write_failure(fila.path(), e))
    }

    async fn write_directory(&self, fila: &Fila) -> FilaResult<()> {
        if fila.is_root() {
            return Ok(());
        }
        match self.value(fila).await? {
            Some(Value::Null) => Ok(()),
            Some(_) => Err(FilaError::AlreadyExists(fila.path())),
            None => {
                self.ensure_ancestors(fila).await?;
                self.store.set(Self::key(fila), Value::Null).await?;
                Ok(())
            }
        }
    }

    async fn write_symlink(&self, _fila: &Fila, _target: &Fila) -> FilaResult<()> {
        Err(FilaError::unsupported("write_symlink", BACKEND))
    }

    async fn delete(&self, fila: &Fila) -> FilaResult<()> {
        if let Some(Value::Null) = self.value(fila).await? {
            self.store
                .delete_range(KeyRange::prefix(&Self::child_prefix(fila)))
                .await?;
        }
        if !fila.is_root() {
            self.store.delete(Self::key(fila)).await?;
        }
        Ok(())
    }

    async fn move_to(&self, _fila: &Fila, _target: &Fila) -> FilaResult<()> {
        Err(FilaError::unsupported("move", BACKEND))
    }

    async fn copy_to(&self, _fila: &Fila, _target: &Fila) -> FilaResult<()> {
        Err(FilaError::unsupported("copy", BACKEND))
    }

    async fn rename(&self, _fila: &Fila, _new_name: &str) -> FilaResult<()> {
        Err(FilaError::unsupported("rename", BACKEND))
    }

    async fn watch(
        &self,
        _fila: &Fila,
        _recursive: bool,
        _sink: EventSink,
    ) -> FilaResult<Box<dyn Unwatch>> {
        Err(FilaError::unsupported("watch", BACKEND))
    }

    async fn stat(&self, fila: &Fila) -> FilaResult<Option<Stat>> {
        if fila.is_root() {
            return Ok(Some(Stat::directory()));
        }
        Ok(self.value(fila).await?.map(|value| match value {
            Value::Null => Stat::directory(),
            other => Stat::file(other.byte_len()),
        }))
    }
}

/*!
 * Backend Registry
 *
 * Binds a backend to the separator, working directory and temporary
 * directory every address resolves against. Registries are passed
 * explicitly; `install` additionally publishes one as the process-wide
 * default for `Fila::parse`.
 */

use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::info;

use super::address::Fila;
use super::traits::Backend;
use super::types::{FilaError, FilaResult};
use crate::core::limits::{DEFAULT_SEPARATOR, ROOT};

static ACTIVE: OnceLock<Arc<Registry>> = OnceLock::new();

/// A backend together with its path context
pub struct Registry {
    backend: Arc<dyn Backend>,
    separator: String,
    cwd: String,
    temp: String,
}

impl Registry {
    pub fn builder(backend: Arc<dyn Backend>) -> RegistryBuilder {
        RegistryBuilder {
            backend,
            separator: DEFAULT_SEPARATOR.to_string(),
            cwd: ROOT.to_string(),
            temp: ROOT.to_string(),
        }
    }

    /// Publish `registry` as the process-wide default
    ///
    /// Fails with `AlreadyRegistered` on every call after the first.
    pub fn install(registry: Arc<Registry>) -> FilaResult<()> {
        let backend = registry.backend.name().to_string();
        ACTIVE
            .set(registry)
            .map_err(|_| FilaError::AlreadyRegistered)?;
        info!(backend = %backend, "storage backend installed");
        Ok(())
    }

    /// Get the process-wide default registry
    pub fn active() -> FilaResult<Arc<Registry>> {
        ACTIVE.get().cloned().ok_or(FilaError::NotRegistered)
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Working directory relative addresses resolve against
    pub fn cwd_path(&self) -> &str {
        &self.cwd
    }

    pub fn temp_path(&self) -> &str {
        &self.temp
    }

    /// Address of the working directory
    pub fn cwd(self: &Arc<Self>) -> Fila {
        Fila::from_path(Arc::clone(self), &self.cwd)
    }

    /// Address of the temporary directory
    pub fn temporary(self: &Arc<Self>) -> Fila {
        Fila::from_path(Arc::clone(self), &self.temp)
    }

    /// Address built from components
    pub fn fila<S: AsRef<str>>(self: &Arc<Self>, components: &[S]) -> Fila {
        Fila::new(Arc::clone(self), components)
    }

    /// Address of the root
    pub fn root(self: &Arc<Self>) -> Fila {
        Fila::new(Arc::clone(self), &[ROOT])
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("backend", &self.backend.name())
            .field("separator", &self.separator)
            .field("cwd", &self.cwd)
            .field("temp", &self.temp)
            .finish()
    }
}

/// Builder for `Registry`
pub struct RegistryBuilder {
    backend: Arc<dyn Backend>,
    separator: String,
    cwd: String,
    temp: String,
}

impl RegistryBuilder {
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = cwd.into();
        self
    }

    pub fn temp(mut self, temp: impl Into<String>) -> Self {
        self.temp = temp.into();
        self
    }

    pub fn build(self) -> Arc<Registry> {
        let separator = if self.separator.is_empty() {
            DEFAULT_SEPARATOR.to_string()
        } else {
            self.separator
        };

        Arc::new(Registry {
            backend: self.backend,
            separator,
            cwd: self.cwd,
            temp: self.temp,
        })
    }
}

/*!
 * Storage Configuration
 * Environment-driven selection of the active backend and its defaults
 */

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use super::serde::is_false;

/// Backends that can be built without a host-provided transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Local filesystem through tokio::fs and notify
    #[default]
    Native,
    /// Virtual filesystem synthesized over a Keyva store
    Embedded,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" => Ok(Self::Native),
            "embedded" | "keyva" => Ok(Self::Embedded),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

/// Storage configuration
///
/// Environment variables:
/// - FILA_BACKEND: `native` (default) or `embedded`
/// - FILA_CWD: working directory used to resolve relative addresses
/// - FILA_TEMP: temporary directory
/// - FILA_KEYVA_DIR: snapshot directory for the embedded backend's engine
/// - FILA_TRACE_JSON: JSON log output (`1` or `true`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", default)]
pub struct StorageConfig {
    pub backend: BackendKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyva_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "is_false")]
    pub trace_json: bool,
}

impl StorageConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = match lookup("FILA_BACKEND") {
            Some(value) => value.parse()?,
            None => BackendKind::default(),
        };

        Ok(Self {
            backend,
            cwd: lookup("FILA_CWD").filter(|s| !s.is_empty()),
            temp: lookup("FILA_TEMP").filter(|s| !s.is_empty()),
            keyva_dir: lookup("FILA_KEYVA_DIR")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            trace_json: lookup("FILA_TRACE_JSON")
                .map(|v| v == "1" || v == "true")
                .unwrap_or(false),
        })
    }
}

/*!
 * Keyva Error Types
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Keyva operation result
pub type KeyvaResult<T> = Result<T, KeyvaError>;

/// Errors raised by Keyva stores and engines
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(rename_all = "snake_case", tag = "error", content = "details")]
pub enum KeyvaError {
    #[error("Transaction failed: {0}")]
    #[diagnostic(code(keyva::transaction))]
    Transaction(String),

    #[error("Transaction aborted")]
    #[diagnostic(code(keyva::aborted))]
    Aborted,

    #[error("Connection to {0} is closed")]
    #[diagnostic(code(keyva::closed))]
    Closed(String),

    #[error("Requested version {requested} is below the current version {current}")]
    #[diagnostic(
        code(keyva::version),
        help("Versions only move forward; open without a version to use the current one.")
    )]
    Version { requested: u64, current: u64 },

    #[error("Unknown object store: {0}")]
    #[diagnostic(code(keyva::unknown_store))]
    UnknownStore(String),

    #[error("Unknown index: {0}")]
    #[diagnostic(code(keyva::unknown_index))]
    UnknownIndex(String),

    #[error("Schema of {name} did not converge after {attempts} upgrades")]
    #[diagnostic(
        code(keyva::migration),
        help("Another process may be rewriting the schema concurrently.")
    )]
    Migration { name: String, attempts: u32 },

    #[error("Persistence failed: {0}")]
    #[diagnostic(code(keyva::persistence))]
    Persistence(String),
}

impl From<bincode::Error> for KeyvaError {
    fn from(err: bincode::Error) -> Self {
        KeyvaError::Persistence(err.to_string())
    }
}

impl From<std::io::Error> for KeyvaError {
    fn from(err: std::io::Error) -> Self {
        KeyvaError::Persistence(err.to_string())
    }
}

/*!
 * Values
 */

use serde::{Deserialize, Serialize};

use super::key::Key;
use crate::core::serde::json_text;

/// Stored record value
///
/// `Json` documents can be indexed: an index key path selects a member with
/// dotted notation (`"meta.owner"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Text(String),
    Bytes(Vec<u8>),
    Json(#[serde(with = "json_text")] serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Size of the value's payload in bytes
    pub fn byte_len(&self) -> u64 {
        match self {
            Value::Null => 0,
            Value::Text(text) => text.len() as u64,
            Value::Bytes(bytes) => bytes.len() as u64,
            Value::Json(json) => json.to_string().len() as u64,
        }
    }

    /// Extract the index key selected by `key_path`
    ///
    /// Only strings and numbers inside JSON documents produce keys.
    pub fn index_key(&self, key_path: &str) -> Option<Key> {
        let Value::Json(document) = self else {
            return None;
        };

        let mut current = document;
        for member in key_path.split('.') {
            current = current.as_object()?.get(member)?;
        }

        match current {
            serde_json::Value::String(s) => Some(Key::String(s.clone())),
            serde_json::Value::Number(n) => n.as_f64().map(Key::Number),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Bytes(bytes)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::Json(json)
    }
}

/*!
 * Fila Metadata
 * Backend-neutral stat result
 */

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::core::serde::is_zero_u64;

/// Metadata for a stored object
///
/// Ticks are milliseconds since the UNIX epoch; 0 means unknown.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct Stat {
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub size: u64,
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub modified_ticks: u64,
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub created_ticks: u64,
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub accessed_ticks: u64,
    pub is_directory: bool,
}

impl Stat {
    /// Stat for a directory with no other metadata
    #[must_use]
    pub const fn directory() -> Self {
        Self {
            size: 0,
            modified_ticks: 0,
            created_ticks: 0,
            accessed_ticks: 0,
            is_directory: true,
        }
    }

    /// Stat for a file of the given size with no timestamps
    #[must_use]
    pub const fn file(size: u64) -> Self {
        Self {
            size,
            modified_ticks: 0,
            created_ticks: 0,
            accessed_ticks: 0,
            is_directory: false,
        }
    }
}

/// Convert a timestamp into ticks, 0 when unavailable
pub fn ticks(time: std::io::Result<SystemTime>) -> u64 {
    time.ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

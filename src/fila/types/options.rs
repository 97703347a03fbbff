/*!
 * Write Options
 */

use serde::{Deserialize, Serialize};

use crate::core::serde::is_false;

/// Options accepted by `write_text`
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WriteOptions {
    /// Append to existing content instead of replacing it
    #[serde(skip_serializing_if = "is_false")]
    pub append: bool,
}

impl WriteOptions {
    /// Options for an appending write
    #[inline]
    #[must_use]
    pub const fn append() -> Self {
        Self { append: true }
    }
}

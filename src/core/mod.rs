/*!
 * Core Module
 * Constants, configuration and serialization helpers shared by every layer
 */

pub mod config;
pub mod limits;
pub mod serde;

pub use config::{BackendKind, StorageConfig};

/*!
 * Fila Types
 * Shared types for storage operations
 */

mod errors;
mod options;
mod stat;

pub use errors::{FilaError, FilaResult, PluginError};
pub use options::WriteOptions;
pub use stat::{ticks, Stat};

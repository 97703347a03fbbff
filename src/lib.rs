/*!
 * Fila Library
 *
 * Path-addressed storage over pluggable platform backends, and Keyva, the
 * transactional key/value engine that backs the embedded backend.
 */

pub mod core;
pub mod fila;
pub mod keyva;
pub mod monitoring;

// Re-exports
pub use crate::core::{BackendKind, StorageConfig};
pub use crate::fila::{
    init_storage, Backend, EventKind, Fila, FilaError, FilaResult, Registry, StorageEvent,
    WatchSubscription, WriteOptions,
};
pub use crate::keyva::{Keyva, KeyvaError, KeyvaOptions, KeyvaResult, MemoryEngine};
pub use crate::monitoring::init_tracing;

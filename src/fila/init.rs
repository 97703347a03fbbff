/*!
 * Storage Initialization
 * Build the registry selected by configuration
 */

use std::sync::Arc;
use tracing::info;

use super::embedded::EmbeddedBackend;
use super::native::NativeBackend;
use super::registry::Registry;
use super::types::FilaResult;
use crate::core::config::{BackendKind, StorageConfig};
use crate::core::limits::{EMBEDDED_CWD, EMBEDDED_TEMP};
use crate::keyva::{Engine, MemoryEngine};

/// Build a registry for the configured backend
///
/// Mobile and desktop backends need a host transport and are built by the
/// host through their own constructors instead.
pub fn init_storage(config: &StorageConfig) -> FilaResult<Arc<Registry>> {
    let registry = match config.backend {
        BackendKind::Native => {
            let defaults = NativeBackend::registry();
            let cwd = config
                .cwd
                .clone()
                .unwrap_or_else(|| defaults.cwd_path().to_string());
            let temp = config
                .temp
                .clone()
                .unwrap_or_else(|| defaults.temp_path().to_string());
            NativeBackend::registry_in(cwd, temp)
        }
        BackendKind::Embedded => {
            let engine: Arc<dyn Engine> = match &config.keyva_dir {
                Some(dir) => Arc::new(MemoryEngine::persistent(dir)),
                None => Arc::new(MemoryEngine::new()),
            };
            Registry::builder(Arc::new(EmbeddedBackend::new(engine)))
                .cwd(config.cwd.as_deref().unwrap_or(EMBEDDED_CWD))
                .temp(config.temp.as_deref().unwrap_or(EMBEDDED_TEMP))
                .build()
        }
    };

    info!(
        backend = registry.backend().name(),
        cwd = registry.cwd_path(),
        "storage initialized"
    );
    Ok(registry)
}

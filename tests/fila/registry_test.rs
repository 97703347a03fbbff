/*!
 * Process Registry Tests
 * The process-wide registry can be installed exactly once
 */

use std::sync::Arc;

use fila::fila::{EmbeddedBackend, Fila, FilaError, Registry, WriteOptions};
use fila::keyva::MemoryEngine;
use serial_test::serial;

#[test]
#[serial]
fn test_install_once_then_parse() {
    assert_eq!(Registry::active().unwrap_err(), FilaError::NotRegistered);
    assert_eq!(Fila::parse("/x").unwrap_err(), FilaError::NotRegistered);

    let registry = EmbeddedBackend::new(Arc::new(MemoryEngine::new())).registry();
    Registry::install(Arc::clone(&registry)).unwrap();

    let again = EmbeddedBackend::new(Arc::new(MemoryEngine::new())).registry();
    assert_eq!(Registry::install(again).unwrap_err(), FilaError::AlreadyRegistered);
    assert!(Arc::ptr_eq(&Registry::active().unwrap(), &registry));

    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async {
        let fila = Fila::parse("/global/a.txt").unwrap();
        fila.write_text("shared", WriteOptions::default()).await.unwrap();

        let seen_through_registry = registry.fila(&["/global/a.txt"]);
        assert_eq!(seen_through_registry.read_text().await.unwrap(), "shared");
        assert_eq!(Fila::parse("relative.txt").unwrap().path(), "/relative.txt");
        assert_eq!(Fila::parse("./relative.txt").unwrap().path(), "/relative.txt");
    });
}

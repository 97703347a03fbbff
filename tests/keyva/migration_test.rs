/*!
 * Index Migration Tests
 * Declared indexes are reconciled against the stored schema on open
 */

use serde_json::json;
use std::sync::Arc;

use fila::keyva::{Engine, KeyRange, Keyva, KeyvaError, KeyvaOptions, MemoryEngine, Query, Value};
use pretty_assertions::assert_eq;

async fn seed(store: &Keyva) {
    store.set("r1", json!({"x": "1", "y": "b"})).await.unwrap();
    store.set("r2", json!({"x": "2", "y": "a"})).await.unwrap();
}

fn y_order() -> Query {
    Query::all().index("y")
}

#[tokio::test]
async fn test_new_index_added_in_process() {
    let engine: Arc<dyn Engine> = Arc::new(MemoryEngine::new());

    let old = Keyva::new(Arc::clone(&engine), KeyvaOptions::named("m").index("x"));
    seed(&old).await;
    let old_version = old.version().unwrap();
    assert!(matches!(
        old.each(&y_order()).await,
        Err(KeyvaError::UnknownIndex(_))
    ));
    old.close().await;

    let new = Keyva::new(
        Arc::clone(&engine),
        KeyvaOptions::named("m").index("x").index("y"),
    );
    let keys: Vec<String> = new
        .each_keys(&y_order())
        .await
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(keys, ["r2", "r1"]);

    let state = new.state().unwrap();
    assert_eq!(state.indexes, ["x", "y"]);
    assert_eq!(state.version, old_version + 1);
}

#[tokio::test]
async fn test_removed_index_is_dropped() {
    let engine: Arc<dyn Engine> = Arc::new(MemoryEngine::new());
    let wide = Keyva::new(
        Arc::clone(&engine),
        KeyvaOptions::named("shrink").index("x").index("y"),
    );
    seed(&wide).await;
    wide.close().await;

    let narrow = Keyva::new(Arc::clone(&engine), KeyvaOptions::named("shrink").index("x"));
    assert!(matches!(
        narrow.each(&y_order()).await,
        Err(KeyvaError::UnknownIndex(_))
    ));
    let only_two = narrow
        .each_values(&Query::all().index("x").range(KeyRange::only("2")))
        .await
        .unwrap();
    assert_eq!(only_two, [Value::from(json!({"x": "2", "y": "a"}))]);
}

#[tokio::test]
async fn test_unchanged_schema_keeps_version() {
    let engine: Arc<dyn Engine> = Arc::new(MemoryEngine::new());
    let first = Keyva::new(Arc::clone(&engine), KeyvaOptions::named("same").index("x"));
    seed(&first).await;
    let version = first.version();
    first.close().await;

    let second = Keyva::new(Arc::clone(&engine), KeyvaOptions::named("same").index("x"));
    second.get("r1").await.unwrap();
    assert_eq!(second.version(), version);
}

#[tokio::test]
async fn test_migration_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let engine: Arc<dyn Engine> = Arc::new(MemoryEngine::persistent(dir.path()));
        let store = Keyva::new(engine, KeyvaOptions::named("disk").index("x"));
        seed(&store).await;
        store.close().await;
    }

    let engine: Arc<dyn Engine> = Arc::new(MemoryEngine::persistent(dir.path()));
    assert_eq!(Keyva::stores(engine.as_ref()).await.unwrap(), ["-keyva-disk"]);

    let store = Keyva::new(
        Arc::clone(&engine),
        KeyvaOptions::named("disk").index("x").index("y"),
    );
    let values = store.each_values(&y_order()).await.unwrap();
    assert_eq!(values.len(), 2);
    assert_eq!(values[0], Value::from(json!({"x": "2", "y": "a"})));

    Keyva::delete_stores(engine.as_ref(), &["disk"]).await.unwrap();
    let reopened: Arc<dyn Engine> = Arc::new(MemoryEngine::persistent(dir.path()));
    assert!(Keyva::stores(reopened.as_ref()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_store_missing_from_existing_database() {
    let engine: Arc<dyn Engine> = Arc::new(MemoryEngine::new());
    let bare = engine.open("-keyva-adopted", Some(3), &|_| Ok(())).await.unwrap();
    bare.close();

    let store = Keyva::new(Arc::clone(&engine), KeyvaOptions::named("adopted").index("x"));
    seed(&store).await;
    assert_eq!(store.version(), Some(4));
    assert_eq!(
        store
            .each_keys(&Query::all().index("x").limit(1))
            .await
            .unwrap()
            .len(),
        1
    );
}

/*!
 * Embedded Backend Tests
 * Filesystem semantics over a Keyva store
 */

use std::sync::Arc;

use fila::fila::{EmbeddedBackend, FilaError, Registry, WriteOptions};
use fila::keyva::{Engine, Keyva, KeyvaOptions, MemoryEngine, Query};
use pretty_assertions::assert_eq;

fn registry() -> Arc<Registry> {
    EmbeddedBackend::new(Arc::new(MemoryEngine::new())).registry()
}

fn names(children: &[fila::fila::Fila]) -> Vec<String> {
    let mut names: Vec<String> = children.iter().map(|c| c.name().to_string()).collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_write_creates_ancestors() {
    let registry = registry();
    let file = registry.fila(&["/a/b/c.txt"]);
    file.write_text("content", WriteOptions::default()).await.unwrap();

    assert!(registry.fila(&["/a"]).is_directory().await);
    assert!(registry.fila(&["/a/b"]).is_directory().await);
    assert_eq!(file.read_text().await.unwrap(), "content");
    assert_eq!(file.read_binary().await.unwrap(), b"content");
}

#[tokio::test]
async fn test_append_and_overwrite() {
    let registry = registry();
    let log = registry.fila(&["/log.txt"]);
    log.write_text("one", WriteOptions::append()).await.unwrap();
    log.write_text(",two", WriteOptions::append()).await.unwrap();
    assert_eq!(log.read_text().await.unwrap(), "one,two");

    log.write_text("reset", WriteOptions::default()).await.unwrap();
    assert_eq!(log.read_text().await.unwrap(), "reset");
}

#[tokio::test]
async fn test_binary_round_trip() {
    let registry = registry();
    let blob = registry.fila(&["/blobs/raw.bin"]);
    let data = vec![0u8, 159, 146, 150, 255];
    blob.write_binary(&data).await.unwrap();
    assert_eq!(blob.read_binary().await.unwrap(), data);
    assert_eq!(blob.get_size().await, 5);
    assert!(matches!(blob.read_text().await, Err(FilaError::Io(_))));
}

#[tokio::test]
async fn test_read_directory_lists_direct_children() {
    let registry = registry();
    for path in ["/d/x.txt", "/d/y.txt", "/d/sub/z.txt", "/dz.txt"] {
        registry
            .fila(&[path])
            .write_text(path, WriteOptions::default())
            .await
            .unwrap();
    }

    let children = registry.fila(&["/d"]).read_directory().await.unwrap();
    assert_eq!(names(&children), ["sub", "x.txt", "y.txt"]);

    let top = registry.root().read_directory().await.unwrap();
    assert_eq!(names(&top), ["d", "dz.txt"]);
}

#[tokio::test]
async fn test_read_directory_errors() {
    let registry = registry();
    let file = registry.fila(&["/f.txt"]);
    file.write_text("x", WriteOptions::default()).await.unwrap();

    assert_eq!(
        file.read_directory().await.unwrap_err(),
        FilaError::NotADirectory("/f.txt".into())
    );
    assert_eq!(
        registry.fila(&["/nope"]).read_directory().await.unwrap_err(),
        FilaError::NotFound("/nope".into())
    );
    assert_eq!(
        registry.fila(&["/nope.txt"]).read_text().await.unwrap_err(),
        FilaError::NotFound("/nope.txt".into())
    );
}

#[tokio::test]
async fn test_directory_conflicts() {
    let registry = registry();
    let dir = registry.fila(&["/dir"]);
    dir.write_directory().await.unwrap();
    dir.write_directory().await.unwrap();

    assert_eq!(
        dir.write_text("x", WriteOptions::default()).await.unwrap_err(),
        FilaError::IsADirectory("/dir".into())
    );
    assert_eq!(dir.read_text().await.unwrap_err(), FilaError::IsADirectory("/dir".into()));

    let file = registry.fila(&["/file"]);
    file.write_text("x", WriteOptions::default()).await.unwrap();
    assert_eq!(
        file.write_directory().await.unwrap_err(),
        FilaError::AlreadyExists("/file".into())
    );
}

#[tokio::test]
async fn test_delete_directory_removes_subtree() {
    let registry = registry();
    for path in ["/keep/a.txt", "/gone/a.txt", "/gone/deep/b.txt", "/gone-sibling.txt"] {
        registry
            .fila(&[path])
            .write_text("x", WriteOptions::default())
            .await
            .unwrap();
    }

    registry.fila(&["/gone"]).delete().await.unwrap();
    assert!(!registry.fila(&["/gone"]).exists().await);
    assert!(!registry.fila(&["/gone/deep/b.txt"]).exists().await);
    assert!(registry.fila(&["/gone-sibling.txt"]).exists().await);
    assert!(registry.fila(&["/keep/a.txt"]).exists().await);

    registry.fila(&["/never"]).delete().await.unwrap();
}

#[tokio::test]
async fn test_unsupported_operations() {
    let registry = registry();
    let a = registry.fila(&["/a.txt"]);
    let b = registry.fila(&["/b.txt"]);
    a.write_text("x", WriteOptions::default()).await.unwrap();

    assert!(a.move_to(&b).await.unwrap_err().is_unsupported());
    assert!(a.copy_to(&b).await.unwrap_err().is_unsupported());
    assert!(a.rename("c.txt").await.unwrap_err().is_unsupported());
    assert!(a.write_symlink(&b).await.unwrap_err().is_unsupported());

    let subscription = a.watch(false, |_| {});
    assert!(subscription.ready().await.unwrap_err().is_unsupported());
}

#[tokio::test]
async fn test_shared_engine_store_layout() {
    let engine: Arc<dyn Engine> = Arc::new(MemoryEngine::new());
    let registry = EmbeddedBackend::new(Arc::clone(&engine)).registry();
    registry
        .fila(&["/x/y.txt"])
        .write_text("y", WriteOptions::default())
        .await
        .unwrap();

    let store = Keyva::new(Arc::clone(&engine), KeyvaOptions::named("fila"));
    let keys: Vec<String> = store
        .each_keys(&Query::all())
        .await
        .unwrap()
        .iter()
        .filter_map(|key| key.as_str().map(str::to_string))
        .collect();
    assert_eq!(keys, ["/x", "/x/y.txt"]);
}

#[tokio::test]
async fn test_temporary_directory() {
    let registry = registry();
    let scratch = registry.temporary().down(&["scratch.txt"]);
    assert_eq!(scratch.path(), "/__temp/scratch.txt");
    scratch.write_text("tmp", WriteOptions::default()).await.unwrap();
    assert!(registry.temporary().is_directory().await);
}

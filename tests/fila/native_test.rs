/*!
 * Native Backend Tests
 * Host filesystem operations inside a temporary directory
 */

use std::sync::Arc;
use std::time::Duration;

use fila::fila::{EventKind, Fila, FilaError, NativeBackend, Registry, StorageEvent, WriteOptions};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio::sync::mpsc;

fn sandbox() -> (TempDir, Arc<Registry>) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_string_lossy().into_owned();
    let registry = NativeBackend::registry_in(root.clone(), format!("{}/tmp", root));
    (dir, registry)
}

fn cwd(registry: &Arc<Registry>, path: &str) -> Fila {
    registry.cwd().down(&[path])
}

#[tokio::test]
async fn test_text_round_trip_creates_parents() {
    let (_dir, registry) = sandbox();
    let file = cwd(&registry, "nested/deeper/note.txt");
    file.write_text("hello", WriteOptions::default()).await.unwrap();

    assert_eq!(file.read_text().await.unwrap(), "hello");
    assert!(file.up().is_directory().await);
    assert!(file.is_file().await);
    assert_eq!(file.get_size().await, 5);
    assert!(file.get_modified_ticks().await > 0);
}

#[tokio::test]
async fn test_append_mode() {
    let (_dir, registry) = sandbox();
    let log = cwd(&registry, "app.log");
    log.write_text("a\n", WriteOptions::append()).await.unwrap();
    log.write_text("b\n", WriteOptions::append()).await.unwrap();
    assert_eq!(log.read_text().await.unwrap(), "a\nb\n");
}

#[tokio::test]
async fn test_binary_and_listing() {
    let (_dir, registry) = sandbox();
    let data = [1u8, 2, 3, 254];
    cwd(&registry, "bin/a.bin").write_binary(&data).await.unwrap();
    cwd(&registry, "bin/b.bin").write_binary(&data).await.unwrap();
    cwd(&registry, "bin/.DS_Store").write_binary(&data).await.unwrap();

    let mut names: Vec<String> = cwd(&registry, "bin")
        .read_directory()
        .await
        .unwrap()
        .iter()
        .map(|f| f.name().to_string())
        .collect();
    names.sort();
    assert_eq!(names, ["a.bin", "b.bin"]);
    assert_eq!(cwd(&registry, "bin/a.bin").read_binary().await.unwrap(), data);
}

#[tokio::test]
async fn test_missing_paths() {
    let (_dir, registry) = sandbox();
    let missing = cwd(&registry, "missing.txt");
    assert!(!missing.exists().await);
    assert_eq!(missing.stat().await.unwrap(), None);
    assert!(matches!(missing.read_text().await, Err(FilaError::NotFound(_))));
    assert!(matches!(missing.delete().await, Err(FilaError::NotFound(_))));
}

#[tokio::test]
async fn test_move_copy_rename() {
    let (_dir, registry) = sandbox();
    let source = cwd(&registry, "src/one.txt");
    source.write_text("1", WriteOptions::default()).await.unwrap();
    cwd(&registry, "src/inner/two.txt")
        .write_text("2", WriteOptions::default())
        .await
        .unwrap();

    let copy = cwd(&registry, "copy");
    cwd(&registry, "src").copy_to(&copy).await.unwrap();
    assert_eq!(copy.down(&["inner/two.txt"]).read_text().await.unwrap(), "2");

    let moved = cwd(&registry, "elsewhere/one.txt");
    source.move_to(&moved).await.unwrap();
    assert!(!source.exists().await);
    assert_eq!(moved.read_text().await.unwrap(), "1");

    moved.rename("renamed.txt").await.unwrap();
    assert!(cwd(&registry, "elsewhere/renamed.txt").exists().await);
    assert!(!moved.exists().await);
}

#[tokio::test]
async fn test_delete_directory_tree() {
    let (_dir, registry) = sandbox();
    cwd(&registry, "tree/a/b.txt")
        .write_text("b", WriteOptions::default())
        .await
        .unwrap();
    let tree = cwd(&registry, "tree");
    tree.delete().await.unwrap();
    assert!(!tree.exists().await);
}

#[tokio::test]
async fn test_file_in_the_way() {
    let (_dir, registry) = sandbox();
    let blocker = cwd(&registry, "blocker");
    blocker.write_text("x", WriteOptions::default()).await.unwrap();
    assert_eq!(
        blocker.write_directory().await.unwrap_err(),
        FilaError::AlreadyExists(blocker.path())
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlink() {
    let (_dir, registry) = sandbox();
    let target = cwd(&registry, "target.txt");
    target.write_text("linked", WriteOptions::default()).await.unwrap();
    let link = cwd(&registry, "links/link.txt");
    link.write_symlink(&target).await.unwrap();
    assert_eq!(link.read_text().await.unwrap(), "linked");
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<StorageEvent>, name: &str) -> StorageEvent {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let event = rx.recv().await.unwrap();
            if event.path().name() == name {
                return event;
            }
        }
    })
    .await
    .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_watch_reports_changes_until_disposed() {
    let (_dir, registry) = sandbox();
    let watched = cwd(&registry, "watched");
    watched.write_directory().await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = watched.watch(true, move |event| {
        let _ = tx.send(event);
    });
    subscription.ready().await.unwrap();

    let file = watched.down(&["new.txt"]);
    let mut kinds = Vec::new();
    file.write_text("x", WriteOptions::default()).await.unwrap();
    loop {
        let event = next_event(&mut rx, "new.txt").await;
        assert_eq!(event.path(), &file);
        kinds.push(event.kind());
        if event.kind() == EventKind::Create {
            break;
        }
    }

    file.delete().await.unwrap();
    loop {
        let event = next_event(&mut rx, "new.txt").await;
        kinds.push(event.kind());
        if event.kind() == EventKind::Delete {
            break;
        }
    }
    tokio::time::sleep(Duration::from_millis(300)).await;
    while let Ok(event) = rx.try_recv() {
        if event.path().name() == "new.txt" {
            kinds.push(event.kind());
        }
    }

    let count = |kind: EventKind| kinds.iter().filter(|k| **k == kind).count();
    assert_eq!(count(EventKind::Create), 1, "events: {:?}", kinds);
    assert_eq!(count(EventKind::Delete), 1, "events: {:?}", kinds);
    assert_eq!(kinds.first(), Some(&EventKind::Create));
    assert_eq!(kinds.last(), Some(&EventKind::Delete));

    subscription.dispose().await.unwrap();
    subscription.dispose().await.unwrap();
    assert!(subscription.is_disposed());

    while rx.try_recv().is_ok() {}
    watched
        .down(&["after.txt"])
        .write_text("late", WriteOptions::default())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    while let Ok(event) = rx.try_recv() {
        assert_ne!(event.path().name(), "after.txt");
    }
}

#[tokio::test]
async fn test_watch_missing_directory_fails() {
    let (_dir, registry) = sandbox();
    let subscription = cwd(&registry, "absent").watch(false, |_| {});
    assert!(matches!(subscription.ready().await, Err(FilaError::Watch(_))));
    subscription.dispose().await.unwrap();
}

//! Behavioural tests shared by the content store implementations

use ledgergit_storage::{
    ContentId, ContentStore, LocalContentStore, MemoryContentStore, StorageError,
};
use tempfile::TempDir;

async fn exercise_store(store: &dyn ContentStore) {
    let payload = vec![7u8; 32 * 1024];

    let id = store.save(&payload).await.unwrap();
    assert!(store.exists(&id).await.unwrap());
    assert_eq!(store.load(&id).await.unwrap(), payload);

    // Saving identical bytes is idempotent
    let again = store.save(&payload).await.unwrap();
    assert_eq!(id, again);

    let other = store.save(b"different").await.unwrap();
    assert_ne!(id, other);
}

/// Test save/load/exists against the in-memory store
#[tokio::test]
async fn test_memory_store_roundtrip() {
    let store = MemoryContentStore::new();
    exercise_store(&store).await;
    assert_eq!(store.len().await, 2);
}

/// Test save/load/exists against the local directory store
#[tokio::test]
async fn test_local_store_roundtrip() {
    let dir = TempDir::new().unwrap();
    let store = LocalContentStore::new(dir.path()).await.unwrap();
    exercise_store(&store).await;
}

/// Test that unknown ids report NotFound
#[tokio::test]
async fn test_unknown_id_not_found() {
    let memory = MemoryContentStore::new();
    let missing = ContentId::for_content("mem", b"never saved");
    assert!(memory.load(&missing).await.unwrap_err().is_not_found());
    assert!(!memory.exists(&missing).await.unwrap());

    let dir = TempDir::new().unwrap();
    let local = LocalContentStore::new(dir.path()).await.unwrap();
    let missing = ContentId::for_content("local", b"never saved");
    assert!(local.load(&missing).await.unwrap_err().is_not_found());
}

/// Test that the local store rejects ids it did not mint
#[tokio::test]
async fn test_local_store_rejects_foreign_ids() {
    let dir = TempDir::new().unwrap();
    let store = LocalContentStore::new(dir.path()).await.unwrap();

    let err = store.load(&ContentId::new("QmForeign")).await.unwrap_err();
    assert!(matches!(err, StorageError::InvalidId(_)));

    let mem_id = ContentId::for_content("mem", b"x");
    assert!(store.exists(&mem_id).await.is_err());
}

/// Test that tampered payloads fail the integrity check
#[tokio::test]
async fn test_local_store_detects_corruption() {
    let dir = TempDir::new().unwrap();
    let store = LocalContentStore::new(dir.path()).await.unwrap();
    let id = store.save(b"original").await.unwrap();

    let digest = id.digest_hex().unwrap().to_string();
    let path = dir.path().join(&digest[0..2]).join(&digest[2..4]).join(&digest);
    tokio::fs::write(&path, b"tampered").await.unwrap();

    let err = store.load(&id).await.unwrap_err();
    assert!(matches!(err, StorageError::Corrupted(_)));
}

/// Test that a file in place of the root directory is rejected
#[tokio::test]
async fn test_local_store_root_must_be_directory() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("not-a-dir");
    tokio::fs::write(&file, b"").await.unwrap();
    assert!(LocalContentStore::new(&file).await.is_err());
}

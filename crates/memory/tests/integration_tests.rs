//! Integration tests for agentseek-memory: transcript lifecycle and the JSON store

use agentseek_memory::{Memory, MemoryStore};
use tempfile::TempDir;

fn store() -> (TempDir, MemoryStore) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = MemoryStore::new(dir.path().join("conversations"));
    (dir, store)
}

#[tokio::test]
async fn test_save_and_load() {
    let (_dir, store) = store();
    let mut memory = Memory::new("File Agent", "You find files.");
    memory.push("user", "find notes.txt");
    memory.push("assistant", "```file_finder\nname=notes.txt\n```");

    store.save(&memory).await.unwrap();
    let loaded = store.load("File Agent").await.expect("memory should load");

    assert_eq!(loaded.key, "File Agent");
    assert_eq!(loaded.system_prompt(), "You find files.");
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded.turns()[1].role, "assistant");
}

#[tokio::test]
async fn test_load_missing_returns_none() {
    let (_dir, store) = store();
    assert!(store.load("nobody").await.is_none());
}

#[tokio::test]
async fn test_load_corrupt_returns_none() {
    let (_dir, store) = store();
    tokio::fs::create_dir_all(store.dir()).await.unwrap();
    tokio::fs::write(store.dir().join("broken.json"), "{oops")
        .await
        .unwrap();
    assert!(store.load("broken").await.is_none());
}

#[tokio::test]
async fn test_recover_keeps_live_system_prompt() {
    let (_dir, store) = store();
    let mut old = Memory::new("coder", "old prompt");
    old.push("user", "previous question");
    store.save(&old).await.unwrap();

    let mut fresh = Memory::new("coder", "new prompt");
    assert!(store.recover(&mut fresh).await);
    assert_eq!(fresh.system_prompt(), "new prompt");
    assert_eq!(fresh.len(), 1);
    assert_eq!(fresh.turns()[0].content, "previous question");
}

#[tokio::test]
async fn test_recover_without_saved_session() {
    let (_dir, store) = store();
    let mut fresh = Memory::new("coder", "prompt");
    assert!(!store.recover(&mut fresh).await);
    assert!(fresh.is_empty());
}

#[tokio::test]
async fn test_list_and_delete() {
    let (_dir, store) = store();
    store.save(&Memory::new("b", "p")).await.unwrap();
    store.save(&Memory::new("a", "p")).await.unwrap();

    assert_eq!(store.list().await, vec!["a".to_string(), "b".to_string()]);
    assert!(store.delete("a").await.unwrap());
    assert!(!store.delete("a").await.unwrap());
    assert_eq!(store.list().await, vec!["b".to_string()]);
}

#[test]
fn test_compression_on_push() {
    let mut memory = Memory::new("a", "p").with_compression(true);
    let long = "y".repeat(3000);
    for _ in 0..5 {
        memory.push("user", long.clone());
    }
    // the sixth push compresses everything but the last four existing turns
    memory.push("user", "tail");
    assert!(memory.turns()[0].content.contains("characters compressed"));
    assert_eq!(memory.turns()[4].content.len(), 3000);
}

#[tokio::test]
async fn test_latest_picks_most_recent_update() {
    let (_dir, store) = store();
    assert!(store.latest().await.is_none());

    let older = Memory::new("casual", "p");
    store.save(&older).await.unwrap();
    let mut newer = Memory::new("coder", "p");
    newer.push("user", "most recent");
    store.save(&newer).await.unwrap();

    let latest = store.latest().await.unwrap();
    assert_eq!(latest.key, "coder");
}

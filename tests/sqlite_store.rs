use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

use rust_chatbot::common::Message;
use rust_chatbot::storage::{
    CachedSession, ChatHistory, Database, Document, DocumentStore, SessionCache,
    SqliteDocumentStore, ensure_data_dir,
};

fn open(dir: &TempDir) -> Arc<SqliteDocumentStore> {
    let database = Database::new(dir.path().join("chatbot.db")).unwrap().shared();
    Arc::new(SqliteDocumentStore::new(database))
}

fn fields(value: serde_json::Value) -> Document {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

#[tokio::test]
async fn history_survives_a_restart() {
    let dir = TempDir::new().unwrap();
    let transcript = vec![Message::user("Hello"), Message::assistant("Hi there")];

    {
        let history = ChatHistory::new(open(&dir));
        history.save("u1", &transcript).await.unwrap();
    }

    let history = ChatHistory::new(open(&dir));
    assert_eq!(history.load("u1").await.unwrap(), Some(transcript));
    assert_eq!(history.load("u2").await.unwrap(), None);
}

#[tokio::test]
async fn merge_write_keeps_other_fields() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);

    store
        .set_merge("chats", "u1", fields(json!({ "title": "Rust questions" })))
        .await
        .unwrap();
    ChatHistory::new(store.clone())
        .save("u1", &[Message::user("Hello"), Message::assistant("Hi")])
        .await
        .unwrap();

    let stored = store.get("chats", "u1").await.unwrap().unwrap();
    assert_eq!(stored.get("title"), Some(&json!("Rust questions")));
    assert_eq!(
        stored.get("messages"),
        Some(&json!([
            { "role": "user", "content": "Hello" },
            { "role": "assistant", "content": "Hi" }
        ]))
    );
    assert_eq!(store.count("chats").unwrap(), 1);
}

#[tokio::test]
async fn clearing_writes_an_empty_list() {
    let dir = TempDir::new().unwrap();
    let history = ChatHistory::new(open(&dir));
    history
        .save("u1", &[Message::user("a"), Message::assistant("b")])
        .await
        .unwrap();

    history.clear("u1").await.unwrap();
    history.clear("u1").await.unwrap();

    assert_eq!(history.load("u1").await.unwrap(), Some(Vec::new()));
}

#[test]
fn cached_session_survives_a_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("data");
    ensure_data_dir(&path).unwrap();
    let db_path = path.join("chatbot.db");

    let cached = CachedSession {
        uid: "u1".to_string(),
        email: "ada@example.com".to_string(),
        refresh_token: "refresh-1".to_string(),
    };
    {
        let cache = SessionCache::new(Database::new(&db_path).unwrap().shared());
        cache.save(&cached).unwrap();
    }

    let cache = SessionCache::new(Database::new(&db_path).unwrap().shared());
    assert_eq!(cache.load().unwrap(), Some(cached));
    cache.clear().unwrap();
    assert_eq!(cache.load().unwrap(), None);
}

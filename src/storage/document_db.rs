use async_trait::async_trait;
use rusqlite::{OptionalExtension, params};
use serde_json::Value;

use crate::error::StoreError;

use super::database::{SharedDatabase, lock};
use super::{Document, DocumentStore, merge_fields};

/// Document store backed by the local SQLite database.
pub struct SqliteDocumentStore {
    db: SharedDatabase,
}

impl SqliteDocumentStore {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    /// Number of stored records in a collection.
    pub fn count(&self, collection: &str) -> Result<usize, StoreError> {
        let db = lock(&self.db);
        let count: i64 = db.connection().query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

fn parse_body(body: &str) -> Result<Document, StoreError> {
    match serde_json::from_str::<Value>(body)? {
        Value::Object(fields) => Ok(fields),
        other => Err(StoreError::Malformed(format!(
            "expected a JSON object, found {other}"
        ))),
    }
}

fn read_document(
    db: &SharedDatabase,
    collection: &str,
    key: &str,
) -> Result<Option<Document>, StoreError> {
    let db = lock(db);
    let body: Option<String> = db
        .connection()
        .query_row(
            "SELECT body FROM documents WHERE collection = ?1 AND key = ?2",
            params![collection, key],
            |row| row.get(0),
        )
        .optional()?;

    body.as_deref().map(parse_body).transpose()
}

fn merge_document(
    db: &SharedDatabase,
    collection: &str,
    key: &str,
    fields: Document,
) -> Result<(), StoreError> {
    let mut db = lock(db);
    let tx = db.connection_mut().transaction()?;

    let existing: Option<String> = tx
        .query_row(
            "SELECT body FROM documents WHERE collection = ?1 AND key = ?2",
            params![collection, key],
            |row| row.get(0),
        )
        .optional()?;

    let mut document = match existing.as_deref() {
        Some(body) => parse_body(body)?,
        None => Document::new(),
    };
    merge_fields(&mut document, fields);
    let body = serde_json::to_string(&document)?;

    tx.execute(
        "INSERT INTO documents (collection, key, body, updated_at)
         VALUES (?1, ?2, ?3, strftime('%s', 'now'))
         ON CONFLICT (collection, key)
         DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
        params![collection, key, body],
    )?;
    tx.commit()?;

    log::debug!("Stored {collection}/{key}");
    Ok(())
}

// SQLite calls block, so they run on the blocking pool rather than a runtime
// worker.
#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError> {
        let db = self.db.clone();
        let (collection, key) = (collection.to_string(), key.to_string());
        tokio::task::spawn_blocking(move || read_document(&db, &collection, &key)).await?
    }

    async fn set_merge(
        &self,
        collection: &str,
        key: &str,
        fields: Document,
    ) -> Result<(), StoreError> {
        let db = self.db.clone();
        let (collection, key) = (collection.to_string(), key.to_string());
        tokio::task::spawn_blocking(move || merge_document(&db, &collection, &key, fields))
            .await?
    }
}

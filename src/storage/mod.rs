pub mod chat_history;
pub mod database;
pub mod document_db;
pub mod memory;
pub mod session_cache;

pub use chat_history::ChatHistory;
pub use database::{Database, SharedDatabase};
pub use document_db::SqliteDocumentStore;
pub use memory::MemoryStore;
pub use session_cache::{CachedSession, SessionCache};

use std::fs;
use std::path::Path;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::StoreError;

/// A record: top-level field name to JSON value.
pub type Document = Map<String, Value>;

/// Keyed record store with merge-write semantics.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a record. `Ok(None)` when it does not exist.
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError>;

    /// Write `fields` into the record, creating it if needed.
    ///
    /// Only the given top-level fields are replaced; other fields of an
    /// existing record are kept.
    async fn set_merge(
        &self,
        collection: &str,
        key: &str,
        fields: Document,
    ) -> Result<(), StoreError>;
}

/// Overlay `fields` onto `existing`, field by field.
pub fn merge_fields(existing: &mut Document, fields: Document) {
    for (name, value) in fields {
        existing.insert(name, value);
    }
}

/// Ensure data directory exists
pub fn ensure_data_dir<P: AsRef<Path>>(dir: P) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    Ok(())
}

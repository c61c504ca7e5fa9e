use std::sync::Arc;

use serde_json::Value;

use crate::common::Message;
use crate::error::StoreError;

use super::{Document, DocumentStore};

pub const CHATS_COLLECTION: &str = "chats";
const MESSAGES_FIELD: &str = "messages";

/// Transcript persistence: one `chats` record per identity id, holding the
/// ordered `messages` list.
#[derive(Clone)]
pub struct ChatHistory {
    store: Arc<dyn DocumentStore>,
}

impl ChatHistory {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Stored transcript for `uid`, `None` if the identity has no record yet.
    ///
    /// A record without a `messages` field reads as an empty transcript.
    pub async fn load(&self, uid: &str) -> Result<Option<Vec<Message>>, StoreError> {
        let Some(mut record) = self.store.get(CHATS_COLLECTION, uid).await? else {
            return Ok(None);
        };
        match record.remove(MESSAGES_FIELD) {
            Some(messages) => Ok(Some(serde_json::from_value(messages)?)),
            None => Ok(Some(Vec::new())),
        }
    }

    /// Merge-write the transcript into the identity's record.
    pub async fn save(&self, uid: &str, messages: &[Message]) -> Result<(), StoreError> {
        let mut fields = Document::new();
        fields.insert(MESSAGES_FIELD.to_string(), serde_json::to_value(messages)?);
        self.store.set_merge(CHATS_COLLECTION, uid, fields).await
    }

    pub async fn clear(&self, uid: &str) -> Result<(), StoreError> {
        let mut fields = Document::new();
        fields.insert(MESSAGES_FIELD.to_string(), Value::Array(Vec::new()));
        self.store.set_merge(CHATS_COLLECTION, uid, fields).await
    }
}

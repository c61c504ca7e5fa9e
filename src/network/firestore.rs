//! Cloud Firestore as a [`DocumentStore`], over the v1 REST API.
//!
//! Merge-writes are `PATCH` requests with an `updateMask` listing exactly the
//! fields being written, which leaves every other field of the document alone
//! and creates the document when it does not exist.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value, json};

use crate::error::StoreError;
use crate::storage::{Document, DocumentStore};

use super::identity::FirebaseIdentity;
use super::transport::failure_parts;

pub const DEFAULT_FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";

pub struct FirestoreStore {
    client: Client,
    base_url: String,
    project_id: String,
    identity: Arc<FirebaseIdentity>,
}

impl FirestoreStore {
    pub fn new(client: Client, project_id: String, identity: Arc<FirebaseIdentity>) -> Self {
        Self {
            client,
            base_url: DEFAULT_FIRESTORE_URL.to_string(),
            project_id,
            identity,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn document_url(&self, collection: &str, key: &str) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/{}/{}",
            self.base_url, self.project_id, collection, key
        )
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError> {
        let token = self.identity.id_token().await?;
        let response = self
            .client
            .get(self.document_url(collection, key))
            .bearer_auth(token)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let (status, body) = failure_parts(response).await;
            return Err(StoreError::Status { status, body });
        }

        let body: Value = response.json().await?;
        decode_document(&body).map(Some)
    }

    async fn set_merge(
        &self,
        collection: &str,
        key: &str,
        fields: Document,
    ) -> Result<(), StoreError> {
        let token = self.identity.id_token().await?;
        let mask: Vec<(&str, String)> = fields
            .keys()
            .map(|name| ("updateMask.fieldPaths", field_path(name)))
            .collect();

        let response = self
            .client
            .patch(self.document_url(collection, key))
            .bearer_auth(token)
            .query(&mask)
            .json(&encode_document(fields))
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = failure_parts(response).await;
            return Err(StoreError::Status { status, body });
        }

        log::debug!("Merged {} field(s) into {collection}/{key}", mask.len());
        Ok(())
    }
}

/// Field names outside `[A-Za-z_][A-Za-z0-9_]*` must be back-quoted in masks.
fn field_path(name: &str) -> String {
    let simple = name
        .chars()
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        name.to_string()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

fn encode_document(fields: Document) -> Value {
    let fields: Map<String, Value> = fields
        .into_iter()
        .map(|(name, value)| (name, encode_value(value)))
        .collect();
    json!({ "fields": fields })
}

/// Plain JSON to Firestore's typed value representation.
fn encode_value(value: Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(flag) => json!({ "booleanValue": flag }),
        Value::Number(number) => match number.as_i64() {
            // 64-bit integers travel as strings
            Some(integer) => json!({ "integerValue": integer.to_string() }),
            None => json!({ "doubleValue": number.as_f64().unwrap_or(f64::NAN) }),
        },
        Value::String(text) => json!({ "stringValue": text }),
        Value::Array(items) if items.is_empty() => json!({ "arrayValue": {} }),
        Value::Array(items) => {
            let values: Vec<Value> = items.into_iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(entries) => {
            let fields: Map<String, Value> = entries
                .into_iter()
                .map(|(name, value)| (name, encode_value(value)))
                .collect();
            json!({ "mapValue": { "fields": fields } })
        }
    }
}

fn decode_document(body: &Value) -> Result<Document, StoreError> {
    match body.get("fields") {
        None => Ok(Document::new()),
        Some(Value::Object(fields)) => decode_fields(fields),
        Some(other) => Err(StoreError::Malformed(format!(
            "document fields is not an object: {other}"
        ))),
    }
}

fn decode_fields(fields: &Map<String, Value>) -> Result<Document, StoreError> {
    fields
        .iter()
        .map(|(name, value)| Ok((name.clone(), decode_value(value)?)))
        .collect()
}

/// Firestore typed value back to plain JSON.
///
/// Timestamps, references and bytes come back as their string form.
fn decode_value(value: &Value) -> Result<Value, StoreError> {
    let Value::Object(typed) = value else {
        return Err(StoreError::Malformed(format!("untyped value: {value}")));
    };
    let Some((kind, inner)) = typed.iter().next() else {
        return Err(StoreError::Malformed("empty value".to_string()));
    };

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" | "doubleValue" => Ok(inner.clone()),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => Ok(inner.clone()),
        "integerValue" => match inner {
            Value::String(text) => text
                .parse::<i64>()
                .map(Value::from)
                .map_err(|err| StoreError::Malformed(format!("integerValue `{text}`: {err}"))),
            Value::Number(_) => Ok(inner.clone()),
            other => Err(StoreError::Malformed(format!("integerValue {other}"))),
        },
        "geoPointValue" => Ok(inner.clone()),
        "arrayValue" => {
            let values = match inner.get("values") {
                None => return Ok(Value::Array(Vec::new())),
                Some(Value::Array(values)) => values,
                Some(other) => {
                    return Err(StoreError::Malformed(format!("arrayValue values {other}")));
                }
            };
            values
                .iter()
                .map(decode_value)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        "mapValue" => match inner.get("fields") {
            None => Ok(Value::Object(Map::new())),
            Some(Value::Object(fields)) => decode_fields(fields).map(Value::Object),
            Some(other) => Err(StoreError::Malformed(format!("mapValue fields {other}"))),
        },
        other => Err(StoreError::Malformed(format!("unknown value type `{other}`"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages_document() -> Document {
        let mut fields = Document::new();
        fields.insert(
            "messages".to_string(),
            json!([
                { "role": "user", "content": "Hello" },
                { "role": "assistant", "content": "Hi there" }
            ]),
        );
        fields
    }

    #[test]
    fn messages_encode_as_array_of_maps() {
        let encoded = encode_document(messages_document());
        assert_eq!(
            encoded["fields"]["messages"]["arrayValue"]["values"][0],
            json!({
                "mapValue": { "fields": {
                    "role": { "stringValue": "user" },
                    "content": { "stringValue": "Hello" }
                }}
            })
        );
    }

    #[test]
    fn empty_list_encodes_without_values() {
        assert_eq!(encode_value(json!([])), json!({ "arrayValue": {} }));
        assert_eq!(
            decode_value(&json!({ "arrayValue": {} })).unwrap(),
            json!([])
        );
    }

    #[test]
    fn encoded_document_decodes_back() {
        let encoded = encode_document(messages_document());
        assert_eq!(decode_document(&encoded).unwrap(), messages_document());
    }

    #[test]
    fn scalars_follow_firestore_conventions() {
        assert_eq!(encode_value(json!(42)), json!({ "integerValue": "42" }));
        assert_eq!(encode_value(json!(1.5)), json!({ "doubleValue": 1.5 }));
        assert_eq!(
            decode_value(&json!({ "integerValue": "42" })).unwrap(),
            json!(42)
        );
        assert_eq!(
            decode_value(&json!({ "timestampValue": "2024-01-01T00:00:00Z" })).unwrap(),
            json!("2024-01-01T00:00:00Z")
        );
    }

    #[test]
    fn unknown_value_type_is_malformed() {
        assert!(matches!(
            decode_value(&json!({ "vectorValue": {} })),
            Err(StoreError::Malformed(_))
        ));
    }

    #[test]
    fn document_without_fields_is_empty() {
        let body = json!({ "name": "projects/p/databases/(default)/documents/chats/u1" });
        assert!(decode_document(&body).unwrap().is_empty());
    }

    #[test]
    fn unusual_field_names_are_quoted() {
        assert_eq!(field_path("messages"), "messages");
        assert_eq!(field_path("chat-log"), "`chat-log`");
        assert_eq!(field_path("9lives"), "`9lives`");
    }
}

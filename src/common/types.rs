use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

/// One entry of a transcript. Stored verbatim in the `messages` list of a chat record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Authenticated identity context.
///
/// `uid` is the stable key of the identity's chat record. The token fields are
/// only meaningful to the adapters that talk to the identity provider and the
/// remote document store.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub uid: String,
    pub email: String,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Session without provider credentials, for local backends and tests.
    pub fn local(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: email.into(),
            id_token: String::new(),
            refresh_token: String::new(),
            expires_at: DateTime::<Utc>::MAX_UTC,
        }
    }

    pub fn expires_within(&self, margin: chrono::Duration) -> bool {
        self.expires_at - margin <= Utc::now()
    }
}

// Tokens stay out of logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("uid", &self.uid)
            .field("email", &self.email)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_serializes_with_lowercase_role() {
        let json = serde_json::to_value(Message::assistant("Hi there")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "role": "assistant", "content": "Hi there" })
        );
    }

    #[test]
    fn session_debug_hides_tokens() {
        let mut session = Session::local("u1", "a@b.c");
        session.id_token = "secret-token".to_string();
        let rendered = format!("{session:?}");
        assert!(rendered.contains("u1"));
        assert!(!rendered.contains("secret-token"));
    }

    #[test]
    fn local_session_never_expires() {
        let session = Session::local("u1", "a@b.c");
        assert!(!session.expires_within(chrono::Duration::seconds(60)));
    }
}

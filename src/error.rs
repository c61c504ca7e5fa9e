use thiserror::Error;

/// Failures of the identity provider adapter.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The provider refused the request; the message is safe to show to the user.
    #[error("{0}")]
    Rejected(String),

    #[error("identity request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed identity response: {0}")]
    Malformed(String),

    #[error("session expired, please log in again")]
    SessionExpired,

    #[error("not signed in")]
    NotSignedIn,

    #[error("session cache error: {0}")]
    Cache(#[from] rusqlite::Error),
}

/// Failures of a document store adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("malformed record: {0}")]
    Malformed(String),

    #[error("store authorization failed: {0}")]
    Auth(#[from] AuthError),
}

/// Failures of the completion service adapter.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion API key is not configured")]
    MissingApiKey,

    #[error("completion request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("completion service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed completion response: {0}")]
    Malformed(String),
}

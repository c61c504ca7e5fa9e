use std::time::Duration;

use reqwest::{Client, Response};

/// Shared HTTP client for every remote adapter.
pub fn build_http_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("rust_chatbot/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Status code and body text of a failed response, for error reporting.
pub async fn failure_parts(response: Response) -> (u16, String) {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    (status, body)
}

//! Chat completion over the RapidAPI ChatGPT endpoint.
//!
//! Every call is a single turn: the request carries exactly one user message
//! and the service keeps no state between calls.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chat::CompletionService;
use crate::common::Role;
use crate::error::CompletionError;

use super::transport::failure_parts;

pub const DEFAULT_COMPLETION_URL: &str = "https://chatgpt-42.p.rapidapi.com/chatgpt";
pub const DEFAULT_COMPLETION_HOST: &str = "chatgpt-42.p.rapidapi.com";

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    messages: [WireMessage<'a>; 1],
    web_access: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    result: String,
}

pub struct RapidApiCompletion {
    client: Client,
    api_key: Option<String>,
    host: String,
    url: String,
    web_access: bool,
}

impl RapidApiCompletion {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key,
            host: DEFAULT_COMPLETION_HOST.to_string(),
            url: DEFAULT_COMPLETION_URL.to_string(),
            web_access: false,
        }
    }

    pub fn with_endpoint(mut self, url: String, host: String) -> Self {
        self.url = url;
        self.host = host;
        self
    }

    pub fn with_web_access(mut self, web_access: bool) -> Self {
        self.web_access = web_access;
        self
    }
}

fn request_body(prompt: &str, web_access: bool) -> CompletionRequest<'_> {
    CompletionRequest {
        messages: [WireMessage {
            role: Role::User,
            content: prompt,
        }],
        web_access,
    }
}

/// Extract the reply from a 2xx body.
///
/// The service sometimes reports failures inside a 200 response; anything
/// without a string `result` is treated as malformed.
fn parse_reply(body: &str) -> Result<String, CompletionError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|err| CompletionError::Malformed(format!("invalid JSON: {err}")))?;
    serde_json::from_value::<CompletionResponse>(value)
        .map(|response| response.result)
        .map_err(|err| CompletionError::Malformed(format!("missing result: {err}")))
}

#[async_trait]
impl CompletionService for RapidApiCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(CompletionError::MissingApiKey)?;

        let response = self
            .client
            .post(&self.url)
            .header("x-rapidapi-key", api_key)
            .header("x-rapidapi-host", &self.host)
            .json(&request_body(prompt, self.web_access))
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = failure_parts(response).await;
            return Err(CompletionError::Status { status, body });
        }

        let body = response.text().await?;
        parse_reply(&body)
    }
}

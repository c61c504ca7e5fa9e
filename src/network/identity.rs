//! Firebase Authentication over its REST API.
//!
//! Email/password sign-in and sign-up go through the Identity Toolkit
//! endpoints; id tokens are renewed with the Secure Token refresh grant. The
//! refresh token is cached locally so a restart restores the session.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use crate::common::Session;
use crate::error::AuthError;
use crate::session::{IdentityGateway, SessionHub, Subscription};
use crate::storage::{CachedSession, SessionCache};

pub const DEFAULT_AUTH_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1";

/// Tokens this close to expiry are renewed before use.
const RENEW_MARGIN_SECS: i64 = 60;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    email: String,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    user_id: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct FirebaseIdentity {
    client: Client,
    api_key: String,
    auth_url: String,
    token_url: String,
    hub: Arc<SessionHub>,
    cache: Option<SessionCache>,
    renew_lock: tokio::sync::Mutex<()>,
}

impl FirebaseIdentity {
    pub fn new(
        client: Client,
        api_key: String,
        hub: Arc<SessionHub>,
        cache: Option<SessionCache>,
    ) -> Self {
        Self {
            client,
            api_key,
            auth_url: DEFAULT_AUTH_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            hub,
            cache,
            renew_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Point at other endpoints, e.g. the local auth emulator.
    pub fn with_endpoints(mut self, auth_url: String, token_url: String) -> Self {
        self.auth_url = auth_url;
        self.token_url = token_url;
        self
    }

    pub fn hub(&self) -> &Arc<SessionHub> {
        &self.hub
    }

    /// Resolve the session hub from the cached refresh token.
    ///
    /// Publishes the restored session, or `None` when there is nothing to
    /// restore or the provider no longer accepts the token.
    pub async fn restore(&self) {
        let cached = match self.cache.as_ref().map(SessionCache::load).transpose() {
            Ok(cached) => cached.flatten(),
            Err(err) => {
                log::warn!("Failed to read session cache: {err}");
                None
            }
        };

        let Some(cached) = cached else {
            self.hub.publish(None);
            return;
        };

        match self
            .refresh_grant(&cached.email, &cached.refresh_token)
            .await
        {
            Ok(session) => {
                log::info!("Restored session for {}", session.uid);
                self.remember(&session);
                self.hub.publish(Some(session));
            }
            Err(err) => {
                log::warn!("Could not restore cached session: {err}");
                self.forget();
                self.hub.publish(None);
            }
        }
    }

    /// Bearer token for the current session, renewed when close to expiry.
    ///
    /// A renewal the provider rejects ends the session.
    pub async fn id_token(&self) -> Result<String, AuthError> {
        let session = self.hub.current().ok_or(AuthError::NotSignedIn)?;
        if !session.expires_within(Duration::seconds(RENEW_MARGIN_SECS)) {
            return Ok(session.id_token);
        }

        let _renewing = self.renew_lock.lock().await;
        // Another caller may have renewed while we waited.
        let session = self.hub.current().ok_or(AuthError::NotSignedIn)?;
        if !session.expires_within(Duration::seconds(RENEW_MARGIN_SECS)) {
            return Ok(session.id_token);
        }

        match self
            .refresh_grant(&session.email, &session.refresh_token)
            .await
        {
            Ok(renewed) => {
                log::debug!("Renewed id token for {}", renewed.uid);
                self.remember(&renewed);
                let token = renewed.id_token.clone();
                self.hub.refresh(renewed);
                Ok(token)
            }
            Err(AuthError::Network(err)) => Err(AuthError::Network(err)),
            Err(err) => {
                log::warn!("Token renewal rejected, ending session: {err}");
                self.forget();
                self.hub.publish(None);
                Err(AuthError::SessionExpired)
            }
        }
    }

    async fn password_grant(
        &self,
        endpoint: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let url = format!("{}/accounts:{endpoint}", self.auth_url);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&PasswordRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let body: PasswordResponse = response
            .json()
            .await
            .map_err(|err| AuthError::Malformed(err.to_string()))?;

        Ok(Session {
            uid: body.local_id,
            email: body.email,
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            expires_at: expiry_from(&body.expires_in)?,
        })
    }

    async fn refresh_grant(&self, email: &str, refresh_token: &str) -> Result<Session, AuthError> {
        let url = format!("{}/token", self.token_url);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let body: RefreshResponse = response
            .json()
            .await
            .map_err(|err| AuthError::Malformed(err.to_string()))?;

        Ok(Session {
            uid: body.user_id,
            email: email.to_string(),
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            expires_at: expiry_from(&body.expires_in)?,
        })
    }

    fn establish(&self, session: Session) -> Session {
        self.remember(&session);
        self.hub.publish(Some(session.clone()));
        session
    }

    fn remember(&self, session: &Session) {
        let Some(cache) = &self.cache else {
            return;
        };
        let cached = CachedSession {
            uid: session.uid.clone(),
            email: session.email.clone(),
            refresh_token: session.refresh_token.clone(),
        };
        if let Err(err) = cache.save(&cached) {
            log::warn!("Failed to cache session: {err}");
        }
    }

    fn forget(&self) {
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.clear() {
                log::warn!("Failed to clear session cache: {err}");
            }
        }
    }
}

#[async_trait]
impl IdentityGateway for FirebaseIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = self
            .password_grant("signInWithPassword", email, password)
            .await?;
        Ok(self.establish(session))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = self.password_grant("signUp", email, password).await?;
        Ok(self.establish(session))
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(cache) = &self.cache {
            cache.clear()?;
        }
        self.hub.publish(None);
        Ok(())
    }

    fn subscribe(&self) -> Subscription {
        self.hub.subscribe()
    }
}

async fn rejection(response: Response) -> AuthError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => AuthError::Rejected(describe_error_code(&envelope.error.message)),
        Err(_) => AuthError::Malformed(format!("HTTP {status}: {body}")),
    }
}

/// Readable text for an Identity Toolkit error code.
///
/// Codes can carry a detail suffix, e.g. `WEAK_PASSWORD : Password should be
/// at least 6 characters`; the detail is preferred when present.
fn describe_error_code(message: &str) -> String {
    let (code, detail) = match message.split_once(" : ") {
        Some((code, detail)) => (code.trim(), Some(detail.trim())),
        None => (message.trim(), None),
    };

    let text = match code {
        "EMAIL_EXISTS" => "An account with this email already exists.",
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            "Invalid email or password."
        }
        "INVALID_EMAIL" => "The email address is badly formatted.",
        "USER_DISABLED" => "This account has been disabled.",
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "Too many attempts. Please try again later.",
        "OPERATION_NOT_ALLOWED" => "Password sign-in is disabled for this project.",
        "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" | "USER_NOT_FOUND" => {
            "Your session has expired. Please log in again."
        }
        "WEAK_PASSWORD" => detail.unwrap_or("Password is too weak."),
        _ => return detail.unwrap_or(code).to_string(),
    };
    text.to_string()
}

fn expiry_from(expires_in: &str) -> Result<chrono::DateTime<Utc>, AuthError> {
    let seconds: i64 = expires_in
        .parse()
        .map_err(|_| AuthError::Malformed(format!("invalid expiresIn `{expires_in}`")))?;
    Duration::try_seconds(seconds)
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .ok_or_else(|| AuthError::Malformed(format!("expiresIn `{expires_in}` out of range")))
}

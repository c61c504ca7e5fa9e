use std::sync::{Arc, LazyLock};

use regex::Regex;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::common::{Route, Session};
use crate::error::AuthError;

use super::IdentityGateway;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryMode {
    Login,
    Signup,
}

impl EntryMode {
    pub fn title(self) -> &'static str {
        match self {
            EntryMode::Login => "Log In",
            EntryMode::Signup => "Sign Up",
        }
    }

    /// The other entry screen, linked from this one.
    pub fn alternate(self) -> Route {
        match self {
            EntryMode::Login => Route::Signup,
            EntryMode::Signup => Route::Login,
        }
    }
}

/// State behind the login and signup screens.
pub struct EntryForm {
    mode: EntryMode,
    pub email: String,
    pub password: String,
    error: Option<String>,
    pending: Option<oneshot::Receiver<Result<Session, AuthError>>>,
}

impl EntryForm {
    pub fn new(mode: EntryMode) -> Self {
        Self {
            mode,
            email: String::new(),
            password: String::new(),
            error: None,
            pending: None,
        }
    }

    pub fn mode(&self) -> EntryMode {
        self.mode
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.pending.is_some()
    }

    /// Validate the fields and hand the credentials to the gateway.
    ///
    /// Ignored while a previous submission is still in flight.
    pub fn submit(&mut self, gateway: Arc<dyn IdentityGateway>, runtime: &Handle) {
        if self.pending.is_some() {
            return;
        }
        if let Err(message) = self.validate() {
            self.error = Some(message.to_string());
            return;
        }
        self.error = None;

        let email = self.email.trim().to_string();
        let password = self.password.clone();
        let mode = self.mode;
        let (sender, receiver) = oneshot::channel();
        runtime.spawn(async move {
            let result = match mode {
                EntryMode::Login => gateway.sign_in(&email, &password).await,
                EntryMode::Signup => gateway.sign_up(&email, &password).await,
            };
            let _ = sender.send(result);
        });
        self.pending = Some(receiver);
    }

    /// Pick up a finished submission. Returns where to navigate on success.
    pub fn poll(&mut self) -> Option<Route> {
        let receiver = self.pending.as_mut()?;
        match receiver.try_recv() {
            Ok(result) => {
                self.pending = None;
                self.finish(result)
            }
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => {
                self.pending = None;
                self.error = Some("Authentication was interrupted. Please try again.".to_string());
                None
            }
        }
    }

    /// Wait for the in-flight submission, if any.
    pub async fn settle(&mut self) -> Option<Route> {
        let receiver = self.pending.take()?;
        match receiver.await {
            Ok(result) => self.finish(result),
            Err(_) => {
                self.error = Some("Authentication was interrupted. Please try again.".to_string());
                None
            }
        }
    }

    fn finish(&mut self, result: Result<Session, AuthError>) -> Option<Route> {
        match result {
            Ok(session) => {
                log::info!("{} succeeded for {}", self.mode.title(), session.uid);
                self.password.clear();
                Some(Route::Chat)
            }
            Err(err) => {
                log::warn!("{} failed: {err}", self.mode.title());
                self.error = Some(err.to_string());
                None
            }
        }
    }

    fn validate(&self) -> Result<(), &'static str> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err("Please enter your email.");
        }
        if !EMAIL_PATTERN.is_match(email) {
            return Err("Please enter a valid email address.");
        }
        if self.password.is_empty() {
            return Err("Please enter your password.");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(email: &str, password: &str) -> EntryForm {
        let mut form = EntryForm::new(EntryMode::Login);
        form.email = email.to_string();
        form.password = password.to_string();
        form
    }

    #[test]
    fn validation_rejects_missing_or_malformed_fields() {
        assert!(form("", "pw").validate().is_err());
        assert!(form("not-an-email", "pw").validate().is_err());
        assert!(form("a@b.c", "").validate().is_err());
        assert!(form("  a@b.c ", "pw").validate().is_ok());
    }

    #[test]
    fn modes_link_to_each_other() {
        assert_eq!(EntryMode::Login.alternate(), Route::Signup);
        assert_eq!(EntryMode::Signup.alternate(), Route::Login);
    }
}

pub mod controller;

pub use controller::ChatController;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CompletionError;
use crate::session::IdentityGateway;
use crate::storage::ChatHistory;

/// Stateless single-turn text completion.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Reply to one user message. No earlier context is sent.
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// External collaborators the chat controller talks to.
#[derive(Clone)]
pub struct ChatServices {
    pub identity: Arc<dyn IdentityGateway>,
    pub history: ChatHistory,
    pub completion: Arc<dyn CompletionService>,
}

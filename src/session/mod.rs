pub mod entry;
pub mod guard;
pub mod hub;

pub use entry::{EntryForm, EntryMode};
pub use guard::{GuardView, SessionGuard};
pub use hub::{SessionHub, Subscription};

use async_trait::async_trait;

use crate::common::Session;
use crate::error::AuthError;

/// Identity provider as seen by the rest of the application.
///
/// Successful `sign_in`/`sign_up` and `sign_out` also publish the new
/// session state to every subscriber.
#[async_trait]
pub trait IdentityGateway: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    fn subscribe(&self) -> Subscription;
}

use crate::common::Session;

use super::IdentityGateway;
use super::hub::Subscription;

/// What the guarded route should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardView {
    /// No session notification has arrived yet.
    Loading,
    Protected(Session),
    RedirectToLogin,
}

/// Gate in front of the chat view.
///
/// Holds its own subscription for as long as it is mounted; dropping the
/// guard releases it.
pub struct SessionGuard {
    subscription: Subscription,
    view: GuardView,
}

impl SessionGuard {
    pub fn mount(gateway: &dyn IdentityGateway) -> Self {
        Self {
            subscription: gateway.subscribe(),
            view: GuardView::Loading,
        }
    }

    /// Apply queued notifications and return the current decision.
    pub fn poll(&mut self) -> &GuardView {
        while let Some(session) = self.subscription.try_next() {
            self.apply(session);
        }
        &self.view
    }

    /// Wait until the guard has left `Loading`.
    ///
    /// If the hub goes away before publishing, the guard treats it as
    /// "no session".
    pub async fn wait(&mut self) -> &GuardView {
        self.poll();
        if self.view == GuardView::Loading {
            match self.subscription.next().await {
                Some(session) => self.apply(session),
                None => self.view = GuardView::RedirectToLogin,
            }
            self.poll();
        }
        &self.view
    }

    pub fn view(&self) -> &GuardView {
        &self.view
    }

    fn apply(&mut self, session: Option<Session>) {
        self.view = match session {
            Some(session) => GuardView::Protected(session),
            None => GuardView::RedirectToLogin,
        };
    }
}

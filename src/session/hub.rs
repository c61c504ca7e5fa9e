use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::mpsc;

use crate::common::Session;

/// Process-wide session value with publish/subscribe.
///
/// The hub starts unresolved: subscribers receive nothing until the first
/// `publish`. Once resolved, a new subscriber gets the current value queued
/// immediately.
pub struct SessionHub {
    inner: Mutex<HubInner>,
}

struct HubInner {
    /// `None` until the first publish.
    current: Option<Option<Session>>,
    subscribers: HashMap<u64, mpsc::UnboundedSender<Option<Session>>>,
    next_id: u64,
}

impl SessionHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(HubInner {
                current: None,
                subscribers: HashMap::new(),
                next_id: 0,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, HubInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record a session change and notify every live subscriber.
    pub fn publish(&self, session: Option<Session>) {
        let mut inner = self.lock();
        match &session {
            Some(session) => log::info!("Session changed: signed in as {}", session.uid),
            None => log::info!("Session changed: signed out"),
        }
        inner.current = Some(session.clone());
        inner
            .subscribers
            .retain(|_, sender| sender.send(session.clone()).is_ok());
    }

    /// Replace the stored session for the same identity without notifying.
    ///
    /// Used for token rotation. Ignored when the identity differs or nobody is
    /// signed in.
    pub fn refresh(&self, session: Session) {
        let mut inner = self.lock();
        if let Some(Some(current)) = inner.current.as_mut() {
            if current.uid == session.uid {
                *current = session;
            }
        }
    }

    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        if let Some(current) = &inner.current {
            // Fresh channel with a live receiver; cannot fail.
            let _ = sender.send(current.clone());
        }
        inner.subscribers.insert(id, sender);
        Subscription {
            id,
            hub: Arc::downgrade(self),
            receiver,
        }
    }

    /// Current session, `None` when signed out or not yet resolved.
    pub fn current(&self) -> Option<Session> {
        self.lock().current.clone().flatten()
    }

    pub fn is_resolved(&self) -> bool {
        self.lock().current.is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn unsubscribe(&self, id: u64) {
        self.lock().subscribers.remove(&id);
    }
}

/// Registration on a [`SessionHub`]. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    hub: Weak<SessionHub>,
    receiver: mpsc::UnboundedReceiver<Option<Session>>,
}

impl Subscription {
    /// Next queued notification, if any, without waiting.
    pub fn try_next(&mut self) -> Option<Option<Session>> {
        self.receiver.try_recv().ok()
    }

    /// Wait for the next notification. Returns `None` once the hub is gone.
    pub async fn next(&mut self) -> Option<Option<Session>> {
        self.receiver.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.unsubscribe(self.id);
        }
    }
}

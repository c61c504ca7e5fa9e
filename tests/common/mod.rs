#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio::sync::Notify;

use rust_chatbot::chat::{ChatController, ChatServices, CompletionService};
use rust_chatbot::common::{Message, Session};
use rust_chatbot::error::{AuthError, CompletionError, StoreError};
use rust_chatbot::session::{IdentityGateway, SessionHub, Subscription};
use rust_chatbot::storage::{ChatHistory, Document, DocumentStore, MemoryStore};

/// Identity provider with a fixed account table.
pub struct FakeIdentity {
    hub: Arc<SessionHub>,
    accounts: Mutex<HashMap<String, (String, String)>>,
    fail_sign_out: AtomicBool,
    next_uid: AtomicU64,
}

impl FakeIdentity {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            hub: SessionHub::new(),
            accounts: Mutex::new(HashMap::new()),
            fail_sign_out: AtomicBool::new(false),
            next_uid: AtomicU64::new(1),
        })
    }

    pub fn hub(&self) -> &Arc<SessionHub> {
        &self.hub
    }

    pub fn register(&self, email: &str, password: &str, uid: &str) {
        self.accounts.lock().unwrap().insert(
            email.to_string(),
            (uid.to_string(), password.to_string()),
        );
    }

    /// Publish a session as if the provider had restored it.
    pub fn sign_in_as(&self, uid: &str) {
        self.hub
            .publish(Some(Session::local(uid, format!("{uid}@example.com"))));
    }

    pub fn fail_sign_out(&self, fail: bool) {
        self.fail_sign_out.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityGateway for FakeIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let account = self.accounts.lock().unwrap().get(email).cloned();
        match account {
            Some((uid, expected)) if expected == password => {
                let session = Session::local(uid, email);
                self.hub.publish(Some(session.clone()));
                Ok(session)
            }
            _ => Err(AuthError::Rejected("Invalid email or password.".to_string())),
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let uid = {
            let mut accounts = self.accounts.lock().unwrap();
            if accounts.contains_key(email) {
                return Err(AuthError::Rejected(
                    "An account with this email already exists.".to_string(),
                ));
            }
            let uid = format!("uid-{}", self.next_uid.fetch_add(1, Ordering::SeqCst));
            accounts.insert(email.to_string(), (uid.clone(), password.to_string()));
            uid
        };
        let session = Session::local(uid, email);
        self.hub.publish(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(AuthError::Rejected("network unreachable".to_string()));
        }
        self.hub.publish(None);
        Ok(())
    }

    fn subscribe(&self) -> Subscription {
        self.hub.subscribe()
    }
}

/// Completion service answering from a queue, echoing when the queue is empty.
#[derive(Default)]
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<Result<String, CompletionError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    pub fn reply(&self, text: &str) {
        self.replies.lock().unwrap().push_back(Ok(text.to_string()));
    }

    pub fn fail(&self) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(CompletionError::Malformed("missing result".to_string())));
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let scripted = self.replies.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(format!("echo: {prompt}")))
    }
}

/// Memory store with switchable failures and per-key read gates.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
}

impl FlakyStore {
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Reads of `key` wait until the returned gate is notified.
    pub fn hold_reads(&self, key: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(key.to_string(), gate.clone());
        gate
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError> {
        let gate = self.gates.lock().unwrap().get(key).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Malformed("injected read failure".to_string()));
        }
        self.inner.get(collection, key).await
    }

    async fn set_merge(
        &self,
        collection: &str,
        key: &str,
        fields: Document,
    ) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Status {
                status: 503,
                body: "injected write failure".to_string(),
            });
        }
        self.inner.set_merge(collection, key, fields).await
    }
}

pub struct Harness {
    pub identity: Arc<FakeIdentity>,
    pub completion: Arc<ScriptedCompletion>,
    pub store: Arc<FlakyStore>,
    pub services: ChatServices,
}

impl Harness {
    pub fn new() -> Self {
        let identity = FakeIdentity::new();
        let completion = Arc::new(ScriptedCompletion::default());
        let store = Arc::new(FlakyStore::default());
        let services = ChatServices {
            identity: identity.clone(),
            history: ChatHistory::new(store.clone()),
            completion: completion.clone(),
        };
        Self {
            identity,
            completion,
            store,
            services,
        }
    }

    /// Must be called from inside a tokio runtime.
    pub fn controller(&self) -> ChatController {
        ChatController::mount(self.services.clone(), Handle::current())
    }

    pub fn history(&self) -> ChatHistory {
        self.services.history.clone()
    }

    pub async fn stored(&self, uid: &str) -> Option<Vec<Message>> {
        self.history().load(uid).await.unwrap()
    }

    /// Signed-in controller with its (empty or stored) history loaded.
    pub async fn signed_in(&self, uid: &str) -> ChatController {
        let mut controller = self.controller();
        self.identity.sign_in_as(uid);
        controller.settle().await;
        controller
    }
}

pub async fn send(controller: &mut ChatController, text: &str) {
    controller.set_draft(text);
    controller.send_message();
    controller.settle().await;
}

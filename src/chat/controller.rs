//! Chat session state and its synchronisation with the chat history store.
//!
//! The controller is owned by the UI thread. Every external call runs as a
//! spawned task whose result comes back as a [`ChatEvent`] and is applied in
//! [`ChatController::poll`] (or awaited with [`ChatController::step`]).
//!
//! Each session notification bumps a generation counter; results carrying an
//! older generation are discarded. Each transcript mutation bumps a revision
//! counter; an optimistic change whose write fails is rolled back only while
//! the revision is still the one the write was issued at.

use std::future::Future;

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::common::{ChatEvent, Message, Rollback, Route, Session};
use crate::session::Subscription;

use super::ChatServices;

pub const NOT_LOGGED_IN: &str = "You must be logged in to send messages.";
pub const COMPLETION_FAILED: &str = "Error fetching data";
pub const LOAD_FAILED: &str = "Failed to load chat history.";
pub const SAVE_FAILED: &str = "Failed to save chat history.";
pub const CLEAR_FAILED: &str = "Failed to clear chat history.";
pub const LOGOUT_FAILED: &str = "Failed to log out. Please try again.";

pub struct ChatController {
    services: ChatServices,
    runtime: Handle,
    event_sender: mpsc::UnboundedSender<ChatEvent>,
    event_receiver: mpsc::UnboundedReceiver<ChatEvent>,
    subscription: Subscription,

    session: Option<Session>,
    draft: String,
    transcript: Vec<Message>,
    pending_error: Option<String>,
    logging_out: bool,
    confirming_logout: bool,
    navigation: Option<Route>,

    generation: u64,
    revision: u64,
    in_flight: usize,
    sending: usize,
    loading_history: bool,
    /// Set once the stored history for the current session has been read.
    history_loaded: bool,
}

impl ChatController {
    /// Subscribe to session changes. The subscription lives as long as the
    /// controller.
    pub fn mount(services: ChatServices, runtime: Handle) -> Self {
        let subscription = services.identity.subscribe();
        let (event_sender, event_receiver) = mpsc::unbounded_channel();
        Self {
            services,
            runtime,
            event_sender,
            event_receiver,
            subscription,
            session: None,
            draft: String::new(),
            transcript: Vec::new(),
            pending_error: None,
            logging_out: false,
            confirming_logout: false,
            navigation: None,
            generation: 0,
            revision: 0,
            in_flight: 0,
            sending: 0,
            loading_history: false,
            history_loaded: false,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut String {
        &mut self.draft
    }

    pub fn set_draft(&mut self, draft: impl Into<String>) {
        self.draft = draft.into();
    }

    pub fn pending_error(&self) -> Option<&str> {
        self.pending_error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.pending_error = None;
    }

    pub fn is_logging_out(&self) -> bool {
        self.logging_out
    }

    pub fn is_confirming_logout(&self) -> bool {
        self.confirming_logout
    }

    pub fn is_sending(&self) -> bool {
        self.sending > 0
    }

    pub fn is_loading_history(&self) -> bool {
        self.loading_history
    }

    /// Whether the stored history for the current session has been read.
    pub fn is_history_loaded(&self) -> bool {
        self.history_loaded
    }

    /// Whether send and clear would currently proceed.
    pub fn can_edit(&self) -> bool {
        self.session.is_some() && self.history_loaded && self.sending == 0
    }

    /// Background calls whose results have not been applied yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Route the controller asked to navigate to, if any.
    pub fn take_navigation(&mut self) -> Option<Route> {
        self.navigation.take()
    }

    /// Apply queued session notifications and finished calls without waiting.
    pub fn poll(&mut self) {
        self.poll_sessions();
        while let Ok(event) = self.event_receiver.try_recv() {
            self.handle_event(event);
            self.poll_sessions();
        }
    }

    /// Wait for the next finished call and apply it.
    ///
    /// Returns `false` when nothing is in flight.
    pub async fn step(&mut self) -> bool {
        self.poll_sessions();
        if self.in_flight == 0 {
            return false;
        }
        match self.event_receiver.recv().await {
            Some(event) => {
                self.handle_event(event);
                self.poll_sessions();
                true
            }
            None => false,
        }
    }

    /// Apply results until nothing is in flight.
    pub async fn settle(&mut self) {
        while self.step().await {}
    }

    /// Send the draft as a single-turn request.
    ///
    /// Requires a session. A blank draft is ignored, as is a send while the
    /// stored history is still loading or a previous reply is pending. Until
    /// the history has been read the send is refused, since saving the
    /// transcript would overwrite the stored record.
    pub fn send_message(&mut self) {
        let Some(session) = &self.session else {
            self.pending_error = Some(NOT_LOGGED_IN.to_string());
            return;
        };
        let prompt = self.draft.trim();
        if prompt.is_empty() {
            return;
        }
        if self.loading_history {
            log::debug!("Send ignored while history for {} is loading", session.uid);
            return;
        }
        if self.sending > 0 {
            log::debug!("Send ignored while a reply is pending");
            return;
        }
        if !self.history_loaded {
            self.pending_error = Some(LOAD_FAILED.to_string());
            return;
        }

        let prompt = prompt.to_string();
        self.pending_error = None;
        self.sending += 1;

        let completion = self.services.completion.clone();
        let generation = self.generation;
        self.spawn(async move {
            let result = completion.complete(&prompt).await;
            ChatEvent::CompletionFinished {
                generation,
                prompt,
                result,
            }
        });
    }

    /// Empty the transcript now and persist the empty list.
    pub fn clear_history(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        if self.loading_history {
            log::debug!("Clear ignored while history for {} is loading", session.uid);
            return;
        }
        if !self.history_loaded {
            self.pending_error = Some(LOAD_FAILED.to_string());
            return;
        }

        let uid = session.uid.clone();
        self.pending_error = None;
        let previous = std::mem::take(&mut self.transcript);
        self.revision += 1;

        let history = self.services.history.clone();
        let generation = self.generation;
        let revision = self.revision;
        self.spawn(async move {
            let result = history.clear(&uid).await;
            ChatEvent::TranscriptSaved {
                generation,
                revision,
                rollback: Rollback::Clear { previous },
                result,
            }
        });
    }

    /// Read the stored history again, e.g. after a failed load.
    pub fn reload_history(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        if self.loading_history || self.history_loaded {
            return;
        }
        let uid = session.uid.clone();
        self.pending_error = None;
        self.spawn_load(uid);
    }

    /// Ask for confirmation before logging out.
    pub fn request_logout(&mut self) {
        if !self.logging_out {
            self.confirming_logout = true;
        }
    }

    pub fn cancel_logout(&mut self) {
        self.confirming_logout = false;
    }

    /// Sign out after the user confirmed.
    pub fn confirm_logout(&mut self) {
        if !self.confirming_logout {
            return;
        }
        self.confirming_logout = false;
        self.logging_out = true;
        self.pending_error = None;

        let identity = self.services.identity.clone();
        self.spawn(async move { ChatEvent::SignedOut(identity.sign_out().await) });
    }

    fn poll_sessions(&mut self) {
        while let Some(session) = self.subscription.try_next() {
            self.on_session_changed(session);
        }
    }

    fn on_session_changed(&mut self, session: Option<Session>) {
        self.generation += 1;
        self.history_loaded = false;
        let previous_uid = self.session.as_ref().map(|current| current.uid.clone());

        match session {
            Some(session) => {
                if previous_uid.as_deref() != Some(session.uid.as_str()) {
                    self.replace_transcript(Vec::new());
                }
                let uid = session.uid.clone();
                self.session = Some(session);
                self.spawn_load(uid);
            }
            None => {
                self.session = None;
                self.confirming_logout = false;
                self.loading_history = false;
                self.replace_transcript(Vec::new());
            }
        }
    }

    fn spawn_load(&mut self, uid: String) {
        self.loading_history = true;
        let history = self.services.history.clone();
        let generation = self.generation;
        self.spawn(async move {
            let result = history.load(&uid).await;
            ChatEvent::TranscriptLoaded { generation, result }
        });
    }

    fn spawn_save(&mut self, rollback: Rollback) {
        let Some(session) = &self.session else {
            return;
        };
        let uid = session.uid.clone();
        let snapshot = self.transcript.clone();
        let history = self.services.history.clone();
        let generation = self.generation;
        let revision = self.revision;
        self.spawn(async move {
            let result = history.save(&uid, &snapshot).await;
            ChatEvent::TranscriptSaved {
                generation,
                revision,
                rollback,
                result,
            }
        });
    }

    fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ChatEvent> + Send + 'static,
    {
        self.in_flight += 1;
        let events = self.event_sender.clone();
        self.runtime.spawn(async move {
            let event = task.await;
            if events.send(event).is_err() {
                log::debug!("Chat view unmounted; dropping result");
            }
        });
    }

    fn replace_transcript(&mut self, transcript: Vec<Message>) {
        self.transcript = transcript;
        self.revision += 1;
    }

    fn handle_event(&mut self, event: ChatEvent) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match event {
            ChatEvent::TranscriptLoaded { generation, result } => {
                if generation != self.generation {
                    log::debug!("Discarding history load from generation {generation}");
                    return;
                }
                self.loading_history = false;
                match result {
                    Ok(Some(messages)) => {
                        log::info!("Loaded {} messages", messages.len());
                        self.history_loaded = true;
                        self.replace_transcript(messages);
                    }
                    Ok(None) => {
                        log::debug!("No stored history yet");
                        self.history_loaded = true;
                    }
                    Err(err) => {
                        log::warn!("Error loading chat history: {err}");
                        self.pending_error = Some(LOAD_FAILED.to_string());
                    }
                }
            }
            ChatEvent::CompletionFinished {
                generation,
                prompt,
                result,
            } => {
                self.sending = self.sending.saturating_sub(1);
                if generation != self.generation {
                    log::debug!("Discarding reply from generation {generation}");
                    return;
                }
                match result {
                    Ok(reply) => {
                        self.transcript.push(Message::user(prompt.clone()));
                        self.transcript.push(Message::assistant(reply));
                        self.revision += 1;
                        // Keep anything typed while the reply was pending.
                        if self.draft.trim() == prompt {
                            self.draft.clear();
                        }
                        self.spawn_save(Rollback::Append { prompt });
                    }
                    Err(err) => {
                        log::warn!("Completion request failed: {err}");
                        self.pending_error = Some(COMPLETION_FAILED.to_string());
                    }
                }
            }
            ChatEvent::TranscriptSaved {
                generation,
                revision,
                rollback,
                result,
            } => {
                let Err(err) = result else {
                    log::debug!("Saved transcript revision {revision}");
                    return;
                };
                if generation != self.generation {
                    log::warn!("Write for an earlier session failed: {err}");
                    return;
                }
                log::warn!("Error saving chat history: {err}");
                self.pending_error = Some(
                    match rollback {
                        Rollback::Append { .. } => SAVE_FAILED,
                        Rollback::Clear { .. } => CLEAR_FAILED,
                    }
                    .to_string(),
                );
                if revision == self.revision {
                    self.roll_back(rollback);
                } else {
                    log::warn!(
                        "Transcript changed since revision {revision}; keeping in-memory state"
                    );
                }
            }
            ChatEvent::SignedOut(result) => {
                self.logging_out = false;
                match result {
                    Ok(()) => self.navigation = Some(Route::Login),
                    Err(err) => {
                        log::error!("Error signing out: {err}");
                        self.pending_error = Some(LOGOUT_FAILED.to_string());
                    }
                }
            }
        }
    }

    fn roll_back(&mut self, rollback: Rollback) {
        match rollback {
            Rollback::Append { prompt } => {
                let keep = self.transcript.len().saturating_sub(2);
                self.transcript.truncate(keep);
                if self.draft.trim().is_empty() {
                    self.draft = prompt;
                }
            }
            Rollback::Clear { previous } => self.transcript = previous,
        }
        self.revision += 1;
    }
}

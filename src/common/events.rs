use crate::common::types::Message;
use crate::error::{AuthError, CompletionError, StoreError};

/// Results of background calls, delivered back to the chat controller.
///
/// History and completion results carry the generation that was current when
/// the call was issued so results belonging to an earlier identity can be
/// discarded.
#[derive(Debug)]
pub enum ChatEvent {
    TranscriptLoaded {
        generation: u64,
        result: Result<Option<Vec<Message>>, StoreError>,
    },
    CompletionFinished {
        generation: u64,
        prompt: String,
        result: Result<String, CompletionError>,
    },
    TranscriptSaved {
        generation: u64,
        revision: u64,
        rollback: Rollback,
        result: Result<(), StoreError>,
    },
    SignedOut(Result<(), AuthError>),
}

/// How to undo an optimistic transcript change whose persistence failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rollback {
    /// Drop the user/assistant pair appended for `prompt`.
    Append { prompt: String },
    /// Restore the transcript emptied by a clear.
    Clear { previous: Vec<Message> },
}

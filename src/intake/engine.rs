//! Conversation engine — drives one user through the fixed questionnaire.
//!
//! Per user the machine is `NoSession` → `AwaitingAnswer(step)` →
//! (transient) `Completed` → `NoSession`. `start` always resets to step 0;
//! free text is only accepted mid-session; completion appends the record to
//! the sink and clears the session whether or not the append succeeded.

use std::sync::Arc;

use crate::channels::OutgoingResponse;
use crate::intake::echo::{EchoPrefs, truncate_echo};
use crate::intake::session::{Advance, SessionStore};
use crate::sink::RecordSink;

/// Greeting sent on /start, before the first question.
pub const WELCOME_TEXT: &str = "👋 Welcome to *ScorePlus*!\nLet's collect your details.";

/// Sent after the final answer is recorded.
pub const COMPLETION_TEXT: &str = "✅ Thank you! Your information has been saved.";

/// Reply to free text from a user with no active session.
pub const START_HINT_TEXT: &str = "Please type /start to begin.";

/// Confirmation for /echoon.
pub const ECHO_ON_TEXT: &str = "Echo turned ON for your session.";

/// Confirmation for /echooff.
pub const ECHO_OFF_TEXT: &str = "Echo turned OFF for your session.";

/// The per-user questionnaire state machine.
pub struct IntakeEngine {
    questions: Vec<String>,
    sessions: SessionStore,
    echo: EchoPrefs,
    sink: Arc<dyn RecordSink>,
}

impl IntakeEngine {
    pub fn new(questions: Vec<String>, sink: Arc<dyn RecordSink>) -> Self {
        debug_assert!(!questions.is_empty());
        Self {
            questions,
            sessions: SessionStore::new(),
            echo: EchoPrefs::new(),
            sink,
        }
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Whether the user is mid-questionnaire.
    pub async fn has_session(&self, user_id: &str) -> bool {
        self.sessions.get(user_id).await.is_some()
    }

    /// Handle /start: reset to a fresh session and ask the first question.
    /// Any unfinished progress is silently discarded.
    pub async fn start(&self, user_id: &str) -> Vec<OutgoingResponse> {
        self.sessions.create(user_id).await;
        tracing::info!(user = %user_id, "Session started");

        vec![
            OutgoingResponse::text(WELCOME_TEXT),
            OutgoingResponse::text(&self.questions[0]),
        ]
    }

    /// Handle free text: echo (when enabled), then advance the session.
    ///
    /// Rejection for lack of a session is steady-state behavior, not an
    /// error; the echo still fires for it.
    pub async fn answer(&self, user_id: &str, text: &str) -> Vec<OutgoingResponse> {
        let mut replies = Vec::new();

        if self.echo.is_enabled(user_id).await {
            replies.push(OutgoingResponse::text(format!(
                "You said: {}",
                truncate_echo(text)
            )));
        }

        match self
            .sessions
            .advance(user_id, text, self.questions.len())
            .await
        {
            Advance::NoSession => {
                replies.push(OutgoingResponse::text(START_HINT_TEXT));
            }
            Advance::Next { step } => {
                replies.push(OutgoingResponse::text(&self.questions[step]));
            }
            Advance::Completed { answers } => {
                replies.push(OutgoingResponse::text(COMPLETION_TEXT));
                // The session is already gone; a failed append loses this
                // record (documented policy), it is never retried.
                if let Err(e) = self.sink.append(&answers).await {
                    tracing::error!(user = %user_id, error = %e, "Failed to persist record");
                } else {
                    tracing::info!(user = %user_id, "Record saved");
                }
            }
        }

        replies
    }

    /// Handle /echoon or /echooff. Always succeeds, never echoes itself.
    pub async fn set_echo(&self, user_id: &str, enabled: bool) -> OutgoingResponse {
        self.echo.set(user_id, enabled).await;
        OutgoingResponse::text(if enabled { ECHO_ON_TEXT } else { ECHO_OFF_TEXT })
    }
}

//! Session store — in-progress questionnaire state, one entry per user.

use std::collections::HashMap;

use tokio::sync::Mutex;

/// In-progress questionnaire state for one user.
///
/// Invariant: `answers.len() == step` at all times.
#[derive(Debug, Clone, Default)]
pub struct IntakeSession {
    /// Ordinal index of the question the user is answering next.
    pub step: usize,
    /// Answers collected so far, in question order.
    pub answers: Vec<String>,
}

/// Outcome of advancing a user's session by one answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// The user has no active session; nothing was mutated.
    NoSession,
    /// Answer recorded; the user is now awaiting question `step`.
    Next { step: usize },
    /// Final answer recorded; the session was removed. `answers` holds the
    /// complete record, one entry per question.
    Completed { answers: Vec<String> },
}

/// Per-user session state, guarded by a single async mutex.
///
/// Every operation is one short critical section with no I/O, so concurrent
/// messages from the same user are serialized and messages from different
/// users only contend for the duration of a map access.
pub struct SessionStore {
    inner: Mutex<HashMap<String, IntakeSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Create a fresh session for the user.
    ///
    /// Starting over is permitted: an existing session is overwritten and
    /// its unfinished answers are silently discarded.
    pub async fn create(&self, user_id: &str) {
        let mut sessions = self.inner.lock().await;
        sessions.insert(user_id.to_string(), IntakeSession::default());
    }

    /// Snapshot the user's session, if any.
    pub async fn get(&self, user_id: &str) -> Option<IntakeSession> {
        let sessions = self.inner.lock().await;
        sessions.get(user_id).cloned()
    }

    /// Remove the user's session, returning it if one existed.
    pub async fn remove(&self, user_id: &str) -> Option<IntakeSession> {
        let mut sessions = self.inner.lock().await;
        sessions.remove(user_id)
    }

    /// Record one answer and advance the user's session atomically.
    ///
    /// When the answer is the last one (`step` reaches `question_count`),
    /// the session is removed in the same critical section and the full
    /// answer set is returned, so no second completion can be observed.
    pub async fn advance(&self, user_id: &str, answer: &str, question_count: usize) -> Advance {
        let mut sessions = self.inner.lock().await;

        let Some(session) = sessions.get_mut(user_id) else {
            return Advance::NoSession;
        };

        session.answers.push(answer.to_string());
        session.step += 1;

        if session.step < question_count {
            Advance::Next { step: session.step }
        } else {
            let finished = sessions
                .remove(user_id)
                .expect("session present under lock");
            Advance::Completed {
                answers: finished.answers,
            }
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

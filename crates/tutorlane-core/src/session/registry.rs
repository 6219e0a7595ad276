//! Per-session conversational state with idle expiry.
//!
//! Every tracker is bounded: recent inputs (gate window), the last three
//! emitted responses, the last three fallback picks and at most one pending
//! question. Sessions idle past the configured timeout are purged.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::time::Instant;
use tutorlane_types::answer::PendingQuestion;
use tutorlane_types::lesson::Subject;

use crate::gate::RecentInputs;

/// How many emitted responses the anti-repeat check looks back over.
pub const RECENT_RESPONSE_LIMIT: usize = 3;
/// How many fallback picks are remembered for rotation.
pub const RECENT_FALLBACK_LIMIT: usize = 3;

#[derive(Debug)]
pub struct SessionState {
    pub recent_inputs: RecentInputs,
    recent_responses: VecDeque<String>,
    pending_question: Option<PendingQuestion>,
    recent_fallbacks: VecDeque<(Subject, usize)>,
    /// Next index into the anti-repeat substitution pool.
    pub repeat_cursor: usize,
    last_active: Instant,
}

impl SessionState {
    fn new(recent_input_window: usize) -> Self {
        Self {
            recent_inputs: RecentInputs::new(recent_input_window),
            recent_responses: VecDeque::with_capacity(RECENT_RESPONSE_LIMIT),
            pending_question: None,
            recent_fallbacks: VecDeque::with_capacity(RECENT_FALLBACK_LIMIT),
            repeat_cursor: 0,
            last_active: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    pub fn recent_responses(&self) -> impl Iterator<Item = &str> {
        self.recent_responses.iter().map(String::as_str)
    }

    pub fn record_response(&mut self, content: impl Into<String>) {
        if self.recent_responses.len() == RECENT_RESPONSE_LIMIT {
            self.recent_responses.pop_front();
        }
        self.recent_responses.push_back(content.into());
    }

    pub fn pending_question(&self) -> Option<&PendingQuestion> {
        self.pending_question.as_ref()
    }

    pub fn set_pending_question(&mut self, question: Option<PendingQuestion>) {
        self.pending_question = question;
    }

    pub fn take_pending_question(&mut self) -> Option<PendingQuestion> {
        self.pending_question.take()
    }

    pub fn recent_fallbacks(&self) -> impl Iterator<Item = &(Subject, usize)> {
        self.recent_fallbacks.iter()
    }

    pub fn record_fallback(&mut self, subject: Subject, index: usize) {
        if self.recent_fallbacks.len() == RECENT_FALLBACK_LIMIT {
            self.recent_fallbacks.pop_front();
        }
        self.recent_fallbacks.push_back((subject, index));
    }

    pub fn reset_fallback_rotation(&mut self, subject: Subject) {
        self.recent_fallbacks.retain(|(s, _)| *s != subject);
    }

    pub fn snapshot(&self, session_id: &str) -> SessionSnapshot {
        SessionSnapshot {
            session_id: session_id.to_string(),
            recent_inputs: self.recent_inputs.len(),
            recent_responses: self.recent_responses.iter().cloned().collect(),
            pending_question: self.pending_question.clone(),
            idle_secs: self.last_active.elapsed().as_secs(),
        }
    }
}

/// Read-only view for the session endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: String,
    pub recent_inputs: usize,
    pub recent_responses: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_question: Option<PendingQuestion>,
    pub idle_secs: u64,
}

/// Shared handle to one session's state.
pub type SessionHandle = Arc<Mutex<SessionState>>;

/// Lock a session handle. Never hold the guard across an `.await`.
pub fn lock_session(handle: &SessionHandle) -> MutexGuard<'_, SessionState> {
    handle.lock().expect("session state lock poisoned")
}

#[derive(Debug)]
pub struct SessionRegistry {
    sessions: DashMap<String, SessionHandle>,
    recent_input_window: usize,
}

impl SessionRegistry {
    pub fn new(recent_input_window: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            recent_input_window,
        }
    }

    pub fn get_or_create(&self, session_id: &str) -> SessionHandle {
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(SessionState::new(self.recent_input_window))))
            .clone()
    }

    pub fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.get(session_id).map(|entry| entry.clone())
    }

    pub fn snapshot(&self, session_id: &str) -> Option<SessionSnapshot> {
        self.get(session_id)
            .map(|handle| lock_session(&handle).snapshot(session_id))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop sessions untouched for at least `max_idle`.
    pub fn purge_idle(&self, max_idle: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, handle| lock_session(handle).last_active.elapsed() < max_idle);
        let purged = before.saturating_sub(self.sessions.len());
        if purged > 0 {
            tracing::debug!(purged, "purged idle sessions");
        }
        purged
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(5)
    }
}

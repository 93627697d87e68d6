//! Log tail state and a single poll cycle

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::authn::session::Credentials;
use crate::tail::buffer::LogBuffer;
use crate::tail::entry::LogResponse;
use crate::tail::{LogSource, PollSession};

/// Why a cycle did not fetch anything
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoSession,
    NotAuthenticated,
    Paused,
}

/// Result of one log poll cycle
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Skipped(SkipReason),
    /// The session changed while the request was in flight
    Stale,
    /// The error now on display; the buffer is untouched
    Failed(String),
    /// Lines appended this cycle (possibly none)
    Appended(Vec<String>),
    /// The buffer was replaced by a diagnostic document
    Replaced(String),
}

/// Read-only view of the tail
#[derive(Debug, Clone, PartialEq)]
pub struct TailSnapshot {
    pub session: Option<PollSession>,
    pub lines: Vec<String>,
    pub error: Option<String>,
    pub paused: bool,
}

#[derive(Debug)]
struct TailState {
    session: Option<PollSession>,
    buffer: LogBuffer,
    error: Option<String>,
}

/// Log tail bound to at most one [`PollSession`].
///
/// Only [`LogTail::poll_once`] writes the buffer. Every session switch bumps
/// a generation counter under the write lock, and a response is applied only
/// if the generation it was requested under is still current.
#[derive(Debug)]
pub struct LogTail {
    state: RwLock<TailState>,
    paused: AtomicBool,
    generation: AtomicU64,
    capacity: usize,
}

impl LogTail {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: RwLock::new(TailState {
                session: None,
                buffer: LogBuffer::new(capacity),
                error: None,
            }),
            paused: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            capacity,
        }
    }

    /// Bind the tail to a new session. History never carries over.
    pub async fn switch_to(&self, session: Option<PollSession>) {
        let mut state = self.state.write().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        state.buffer = LogBuffer::new(self.capacity);
        state.error = None;
        state.session = session;
    }

    /// Drop the session and everything collected for it
    pub async fn stop(&self) {
        self.switch_to(None).await;
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub async fn session(&self) -> Option<PollSession> {
        self.state.read().await.session.clone()
    }

    pub async fn snapshot(&self) -> TailSnapshot {
        let state = self.state.read().await;
        TailSnapshot {
            session: state.session.clone(),
            lines: state.buffer.snapshot(),
            error: state.error.clone(),
            paused: self.is_paused(),
        }
    }

    /// Run one fetch-and-merge cycle
    pub async fn poll_once<S, C>(&self, source: &S, credentials: &C) -> CycleOutcome
    where
        S: LogSource + ?Sized,
        C: Credentials + ?Sized,
    {
        if self.is_paused() {
            return CycleOutcome::Skipped(SkipReason::Paused);
        }

        let (session, generation) = {
            let state = self.state.read().await;
            match &state.session {
                Some(session) => (session.clone(), self.generation()),
                None => return CycleOutcome::Skipped(SkipReason::NoSession),
            }
        };

        let Some(token) = credentials.bearer().await else {
            return CycleOutcome::Skipped(SkipReason::NotAuthenticated);
        };

        let result = source.fetch_logs(&session, &token).await;

        let mut state = self.state.write().await;
        if self.generation() != generation {
            debug!("Discarding log response for stale {}", session);
            return CycleOutcome::Stale;
        }

        let outcome = match result {
            Err(e) => {
                let message = e.user_message();
                warn!("Log fetch failed for {}: {}", session, message);
                state.error = Some(message.clone());
                return CycleOutcome::Failed(message);
            }
            Ok(LogResponse::Diagnostic(document)) => {
                let pretty = serde_json::to_string_pretty(&document)
                    .unwrap_or_else(|_| document.to_string());
                state.buffer.replace_with(pretty.clone());
                CycleOutcome::Replaced(pretty)
            }
            Ok(LogResponse::Entries(entries)) => {
                CycleOutcome::Appended(state.buffer.append_entries(&entries))
            }
            Ok(LogResponse::RawText(text)) => CycleOutcome::Appended(state.buffer.append_text(&text)),
        };

        state.error = None;
        outcome
    }
}

impl Default for LogTail {
    fn default() -> Self {
        Self::new(crate::tail::buffer::DEFAULT_CAPACITY)
    }
}

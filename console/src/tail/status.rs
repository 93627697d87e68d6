//! Deployment status view and its success latch

use std::sync::atomic::{AtomicU64, Ordering};

use buildzy_api::models::DeploymentStatus;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use crate::authn::session::Credentials;
use crate::tail::tailer::{LogTail, SkipReason};
use crate::tail::{PollSession, StatusSource};

/// What the status display shows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeploymentStatusView {
    pub status: Option<DeploymentStatus>,
    pub deployed_url: Option<Url>,
    /// Set once on `SUCCESS` or `COMPLETED`, never cleared within a session
    pub succeeded: bool,
}

/// Result of one status poll cycle
#[derive(Debug, Clone, PartialEq)]
pub enum StatusOutcome {
    Skipped(SkipReason),
    Stale,
    Failed(String),
    Updated(DeploymentStatus),
    /// The success latch fired on this cycle
    Latched(Option<Url>),
    /// Latched earlier; nothing was fetched
    Finished,
}

#[derive(Debug, Default)]
struct StatusState {
    session: Option<PollSession>,
    view: DeploymentStatusView,
}

/// Status tracker bound to at most one [`PollSession`]
#[derive(Debug, Default)]
pub struct StatusTracker {
    state: RwLock<StatusState>,
    generation: AtomicU64,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to a new session, clearing the view and the latch
    pub async fn switch_to(&self, session: Option<PollSession>) {
        let mut state = self.state.write().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        state.session = session;
        state.view = DeploymentStatusView::default();
    }

    pub async fn view(&self) -> DeploymentStatusView {
        self.state.read().await.view.clone()
    }

    pub async fn is_latched(&self) -> bool {
        self.state.read().await.view.succeeded
    }

    /// Fetch the status once. On the first terminal success the view
    /// latches and the log tail is paused.
    pub async fn poll_once<S, C>(&self, source: &S, credentials: &C, tail: &LogTail) -> StatusOutcome
    where
        S: StatusSource + ?Sized,
        C: Credentials + ?Sized,
    {
        let (session, generation) = {
            let state = self.state.read().await;
            if state.view.succeeded {
                return StatusOutcome::Finished;
            }
            match &state.session {
                Some(session) => (session.clone(), self.generation.load(Ordering::SeqCst)),
                None => return StatusOutcome::Skipped(SkipReason::NoSession),
            }
        };

        let Some(token) = credentials.bearer().await else {
            return StatusOutcome::Skipped(SkipReason::NotAuthenticated);
        };

        let result = source.fetch_status(&session, &token).await;

        let mut state = self.state.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("Discarding status response for stale {}", session);
            return StatusOutcome::Stale;
        }
        if state.view.succeeded {
            return StatusOutcome::Finished;
        }

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                let message = e.user_message();
                warn!("Status fetch failed for {}: {}", session, message);
                return StatusOutcome::Failed(message);
            }
        };

        state.view.status = Some(response.status.clone());
        if let Some(raw) = response.deployed_url.as_deref() {
            state.view.deployed_url = parse_deployed_url(raw);
        }

        if response.status.is_terminal_success() {
            state.view.succeeded = true;
            tail.pause();
            info!("Deployment {} reached {}", session.deployment_id, response.status);
            return StatusOutcome::Latched(state.view.deployed_url.clone());
        }

        StatusOutcome::Updated(response.status)
    }
}

/// Accept full URLs and bare hostnames
fn parse_deployed_url(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    Url::parse(raw)
        .or_else(|_| Url::parse(&format!("https://{}", raw)))
        .map_err(|e| warn!("Ignoring malformed deployed URL {:?}: {}", raw, e))
        .ok()
}

//! Log tail worker

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::authn::session::Credentials;
use crate::tail::tailer::{CycleOutcome, LogTail};
use crate::tail::LogSource;

/// Log tail worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Polling interval
    pub interval: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
        }
    }
}

/// What the worker reports after a cycle that changed the tail
#[derive(Debug, Clone, PartialEq)]
pub enum TailEvent {
    /// New lines at the bottom of the tail
    Appended(Vec<String>),
    /// The tail now holds a single diagnostic document
    Replaced(String),
    Error(String),
}

/// Run the log tail worker. The first cycle runs immediately.
pub async fn run<L, C, S, F>(
    options: &Options,
    tail: &LogTail,
    source: &L,
    credentials: &C,
    events: mpsc::UnboundedSender<TailEvent>,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    L: LogSource + ?Sized,
    C: Credentials + ?Sized,
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Log tail worker starting...");

    loop {
        let cycle = tail.poll_once(source, credentials);
        tokio::pin!(cycle);
        let finished = tokio::select! {
            outcome = &mut cycle => Some(outcome),
            _ = &mut shutdown_signal => None,
        };

        // paused mid-cycle: the status latched, deliver this last cycle
        let (outcome, stopping) = match finished {
            Some(outcome) => (outcome, false),
            None if tail.is_paused() => {
                debug!("Shutdown during the final log cycle, letting it finish");
                (cycle.await, true)
            }
            None => {
                info!("Log tail worker shutting down...");
                return;
            }
        };

        if let Some(event) = to_event(outcome) {
            if events.send(event).is_err() {
                info!("Log tail receiver dropped, stopping worker");
                return;
            }
        }
        if stopping {
            info!("Log tail worker shutting down...");
            return;
        }

        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Log tail worker shutting down...");
                return;
            }
            _ = sleep_fn(options.interval) => {}
        }
    }
}

fn to_event(outcome: CycleOutcome) -> Option<TailEvent> {
    match outcome {
        CycleOutcome::Appended(lines) if !lines.is_empty() => Some(TailEvent::Appended(lines)),
        CycleOutcome::Replaced(document) => Some(TailEvent::Replaced(document)),
        CycleOutcome::Failed(message) => Some(TailEvent::Error(message)),
        other => {
            debug!("Log cycle: {:?}", other);
            None
        }
    }
}

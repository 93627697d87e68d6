//! Deployment status worker

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use buildzy_api::models::DeploymentStatus;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

use crate::authn::session::Credentials;
use crate::tail::status::{StatusOutcome, StatusTracker};
use crate::tail::tailer::LogTail;
use crate::tail::StatusSource;

/// Status worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Polling interval
    pub interval: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    Changed(DeploymentStatus),
    Succeeded(Option<Url>),
}

/// Run the status worker until the deployment succeeds, shutdown fires or
/// the receiver is dropped. Returns whether the success latch fired.
#[allow(clippy::too_many_arguments)]
pub async fn run<P, C, S, F>(
    options: &Options,
    tracker: &StatusTracker,
    tail: &LogTail,
    source: &P,
    credentials: &C,
    events: mpsc::UnboundedSender<StatusEvent>,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) -> bool
where
    P: StatusSource + ?Sized,
    C: Credentials + ?Sized,
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Status worker starting...");
    let mut last: Option<DeploymentStatus> = None;

    loop {
        let outcome = tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Status worker shutting down...");
                return false;
            }
            outcome = tracker.poll_once(source, credentials, tail) => outcome,
        };

        match outcome {
            StatusOutcome::Updated(status) => {
                if last.as_ref() != Some(&status) {
                    last = Some(status.clone());
                    if events.send(StatusEvent::Changed(status)).is_err() {
                        info!("Status receiver dropped, stopping worker");
                        return false;
                    }
                }
            }
            StatusOutcome::Latched(url) => {
                if events.send(StatusEvent::Succeeded(url)).is_err() {
                    debug!("Status receiver dropped before the success event");
                }
                info!("Status worker stopping, deployment succeeded");
                return true;
            }
            StatusOutcome::Finished => return true,
            StatusOutcome::Failed(message) => warn!("Status poll failed: {}", message),
            other => debug!("Status cycle: {:?}", other),
        }

        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Status worker shutting down...");
                return false;
            }
            _ = sleep_fn(options.interval) => {}
        }
    }
}

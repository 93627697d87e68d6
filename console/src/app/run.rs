//! Watch loop: log tail and status workers for one deployment

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info};
use url::Url;

use crate::app::options::AppOptions;
use crate::app::state::AppState;
use crate::errors::ConsoleError;
use crate::tail::PollSession;
use crate::workers::log_tail::{self, TailEvent};
use crate::workers::status::{self, StatusEvent};

/// How a watch ended
#[derive(Debug, Clone, PartialEq)]
pub enum WatchOutcome {
    Succeeded(Option<Url>),
    Interrupted,
}

/// Follow a deployment until it succeeds or the shutdown signal fires
pub async fn watch(
    app_state: Arc<AppState>,
    options: &AppOptions,
    session: PollSession,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<WatchOutcome, ConsoleError> {
    if !app_state.is_authenticated().await {
        return Err(ConsoleError::NotAuthenticated);
    }
    info!("Watching {}", session);

    app_state.log_tail.switch_to(Some(session.clone())).await;
    app_state.status.switch_to(Some(session)).await;

    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut shutdown_manager = ShutdownManager::new(shutdown_tx.clone(), options.max_shutdown_delay);

    let (tail_tx, mut tail_rx) = mpsc::unbounded_channel();
    let (status_tx, mut status_rx) = mpsc::unbounded_channel();

    let log_tail_handle = init_log_tail_worker(
        options.log_tail_worker.clone(),
        app_state.clone(),
        tail_tx,
        shutdown_tx.subscribe(),
    );
    shutdown_manager.with_log_tail_worker_handle(log_tail_handle)?;

    let status_handle = init_status_worker(
        options.status_worker.clone(),
        app_state.clone(),
        status_tx,
        shutdown_tx.subscribe(),
    );
    shutdown_manager.with_status_worker_handle(status_handle)?;

    tokio::pin!(shutdown_signal);
    let outcome = loop {
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Shutdown signal received, stopping watch...");
                break WatchOutcome::Interrupted;
            }
            Some(event) = tail_rx.recv() => render_tail_event(&event),
            Some(event) = status_rx.recv() => match event {
                StatusEvent::Changed(status) => {
                    println!("{} {}", "status:".bold(), status.to_string().yellow());
                }
                StatusEvent::Succeeded(url) => break WatchOutcome::Succeeded(url),
            },
        }
    };

    drop(shutdown_tx);
    shutdown_manager.shutdown().await?;
    if matches!(outcome, WatchOutcome::Succeeded(_)) {
        // the log worker finishes its in-flight cycle before stopping
        while let Ok(event) = tail_rx.try_recv() {
            render_tail_event(&event);
        }
    }
    app_state.log_tail.stop().await;
    app_state.status.switch_to(None).await;
    Ok(outcome)
}

fn render_tail_event(event: &TailEvent) {
    match event {
        TailEvent::Appended(lines) => {
            for line in lines {
                println!("{}", line);
            }
        }
        TailEvent::Replaced(document) => {
            println!("{}", "diagnostic response from log service:".dimmed());
            println!("{}", document);
        }
        TailEvent::Error(message) => eprintln!("{} {}", "error:".red().bold(), message),
    }
}

// =============================== INITIALIZATION ================================== //

fn init_log_tail_worker(
    options: log_tail::Options,
    app_state: Arc<AppState>,
    events: mpsc::UnboundedSender<TailEvent>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    info!("Initializing log tail worker...");

    tokio::spawn(async move {
        log_tail::run(
            &options,
            app_state.log_tail.as_ref(),
            app_state.http_client.as_ref(),
            app_state.session.as_ref(),
            events,
            tokio::time::sleep,
            Box::pin(async move {
                let _ = shutdown_rx.recv().await;
            }),
        )
        .await;
    })
}

fn init_status_worker(
    options: status::Options,
    app_state: Arc<AppState>,
    events: mpsc::UnboundedSender<StatusEvent>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<bool> {
    info!("Initializing status worker...");

    tokio::spawn(async move {
        status::run(
            &options,
            app_state.status.as_ref(),
            app_state.log_tail.as_ref(),
            app_state.http_client.as_ref(),
            app_state.session.as_ref(),
            events,
            tokio::time::sleep,
            Box::pin(async move {
                let _ = shutdown_rx.recv().await;
            }),
        )
        .await
    })
}

// ================================= SHUTDOWN ===================================== //

struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    max_shutdown_delay: Duration,
    log_tail_worker_handle: Option<JoinHandle<()>>,
    status_worker_handle: Option<JoinHandle<bool>>,
}

impl ShutdownManager {
    fn new(shutdown_tx: broadcast::Sender<()>, max_shutdown_delay: Duration) -> Self {
        Self {
            shutdown_tx,
            max_shutdown_delay,
            log_tail_worker_handle: None,
            status_worker_handle: None,
        }
    }

    fn with_log_tail_worker_handle(&mut self, handle: JoinHandle<()>) -> Result<(), ConsoleError> {
        if self.log_tail_worker_handle.is_some() {
            return Err(ConsoleError::ShutdownError("log_tail_handle already set".to_string()));
        }
        self.log_tail_worker_handle = Some(handle);
        Ok(())
    }

    fn with_status_worker_handle(&mut self, handle: JoinHandle<bool>) -> Result<(), ConsoleError> {
        if self.status_worker_handle.is_some() {
            return Err(ConsoleError::ShutdownError("status_handle already set".to_string()));
        }
        self.status_worker_handle = Some(handle);
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), ConsoleError> {
        let _ = self.shutdown_tx.send(());

        match tokio::time::timeout(self.max_shutdown_delay, self.shutdown_impl()).await {
            Ok(result) => result,
            Err(_) => {
                error!("Shutdown timed out after {:?}", self.max_shutdown_delay);
                Err(ConsoleError::ShutdownError("workers did not stop in time".to_string()))
            }
        }
    }

    async fn shutdown_impl(&mut self) -> Result<(), ConsoleError> {
        // 1. Status worker
        if let Some(handle) = self.status_worker_handle.take() {
            handle.await.map_err(|e| ConsoleError::ShutdownError(e.to_string()))?;
        }

        // 2. Log tail worker
        if let Some(handle) = self.log_tail_worker_handle.take() {
            handle.await.map_err(|e| ConsoleError::ShutdownError(e.to_string()))?;
        }

        info!("Workers stopped");
        Ok(())
    }
}

//! Shared application state

use std::sync::Arc;

use buildzy_api::models::ResourceId;
use tracing::info;

use crate::app::options::AppOptions;
use crate::authn::session::{AuthStatus, SessionManager};
use crate::authn::token_store::{FileTokenStore, TokenStore};
use crate::deploy::dispatcher::DeploymentDispatcher;
use crate::errors::ConsoleError;
use crate::http::client::HttpClient;
use crate::tail::status::StatusTracker;
use crate::tail::tailer::LogTail;

/// Everything the commands and workers share
pub struct AppState {
    pub http_client: Arc<HttpClient>,
    pub token_store: Arc<dyn TokenStore>,
    pub session: Arc<SessionManager>,
    pub log_tail: Arc<LogTail>,
    pub status: Arc<StatusTracker>,
}

impl AppState {
    /// Build the state from the options and restore any stored session
    pub async fn init(options: &AppOptions) -> Result<Self, ConsoleError> {
        let mut http_client = HttpClient::new(&options.backend_base_url)?;
        if let Some(url) = options.log_service_url.as_deref() {
            http_client = http_client.with_log_service(url);
        }
        let token_store: Arc<dyn TokenStore> =
            Arc::new(FileTokenStore::new(options.layout.token_file()));

        Ok(Self::with_parts(
            Arc::new(http_client),
            token_store,
            options.buffer_capacity,
        )
        .await)
    }

    /// Assemble from prebuilt parts
    pub async fn with_parts(
        http_client: Arc<HttpClient>,
        token_store: Arc<dyn TokenStore>,
        buffer_capacity: usize,
    ) -> Self {
        let session = Arc::new(SessionManager::new(http_client.clone(), token_store.clone()));
        let status = session.init().await;
        info!("Session status: {:?}", status);

        Self {
            http_client,
            token_store,
            session,
            log_tail: Arc::new(LogTail::new(buffer_capacity)),
            status: Arc::new(StatusTracker::new()),
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.status().await == AuthStatus::Authenticated
    }

    /// Dispatcher for one project's deployment actions
    pub fn dispatcher(&self, project_id: ResourceId) -> DeploymentDispatcher {
        DeploymentDispatcher::new(project_id, self.http_client.clone(), self.session.clone())
    }
}

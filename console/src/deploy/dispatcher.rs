//! Deployment actions for a single project

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use buildzy_api::models::{
    ActiveDeploymentsResponse, CreateDeploymentRequest, Deployment, Environment, ResourceId,
};
use secrecy::SecretString;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::authn::session::Credentials;
use crate::errors::ConsoleError;

/// Message the backend answers with when deleting a live deployment
pub const ACTIVE_DEPLOYMENT_MESSAGE: &str = "Cannot delete active deployment";

/// Backend calls the dispatcher issues
#[async_trait]
pub trait DeploymentBackend: Send + Sync {
    async fn list_deployments(
        &self,
        project_id: &ResourceId,
        token: &SecretString,
    ) -> Result<Vec<Deployment>, ConsoleError>;

    async fn active_deployments(
        &self,
        project_id: &ResourceId,
        token: &SecretString,
    ) -> Result<ActiveDeploymentsResponse, ConsoleError>;

    async fn create_deployment(
        &self,
        project_id: &ResourceId,
        request: &CreateDeploymentRequest,
        token: &SecretString,
    ) -> Result<(), ConsoleError>;

    async fn deploy(
        &self,
        project_id: &ResourceId,
        deployment_id: &ResourceId,
        environment: Environment,
        token: &SecretString,
    ) -> Result<(), ConsoleError>;

    async fn promote(
        &self,
        project_id: &ResourceId,
        deployment_id: &ResourceId,
        token: &SecretString,
    ) -> Result<(), ConsoleError>;

    async fn rollback(
        &self,
        project_id: &ResourceId,
        deployment_id: &ResourceId,
        environment: Option<Environment>,
        token: &SecretString,
    ) -> Result<(), ConsoleError>;

    async fn delete_deployment(
        &self,
        project_id: &ResourceId,
        deployment_id: &ResourceId,
        token: &SecretString,
    ) -> Result<(), ConsoleError>;
}

/// Deployment live in each environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveDeployments {
    pub production: Option<ResourceId>,
    pub staging: Option<ResourceId>,
}

impl ActiveDeployments {
    /// Environment the deployment is live in, production first
    pub fn environment_of(&self, deployment_id: &ResourceId) -> Option<Environment> {
        if self.production.as_ref() == Some(deployment_id) {
            Some(Environment::Production)
        } else if self.staging.as_ref() == Some(deployment_id) {
            Some(Environment::Staging)
        } else {
            None
        }
    }
}

impl From<ActiveDeploymentsResponse> for ActiveDeployments {
    fn from(response: ActiveDeploymentsResponse) -> Self {
        Self {
            production: response.production.map(|r| r.id),
            staging: response.staging.map(|r| r.id),
        }
    }
}

/// Notices that get their own dialog rather than the inline error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    ActiveDeploymentBlocked(Option<Environment>),
}

/// What the project page shows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectView {
    pub deployments: Option<Vec<Deployment>>,
    pub active: Option<ActiveDeployments>,
    pub error: Option<String>,
    pub notice: Option<Notice>,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Issues deployment actions and reconciles the project view afterwards.
///
/// The busy flag is advisory: callers check [`DeploymentDispatcher::is_busy`]
/// before starting another action, the dispatcher does not refuse.
pub struct DeploymentDispatcher {
    project_id: ResourceId,
    backend: Arc<dyn DeploymentBackend>,
    credentials: Arc<dyn Credentials>,
    busy: AtomicBool,
    view: RwLock<ProjectView>,
}

impl DeploymentDispatcher {
    pub fn new(
        project_id: ResourceId,
        backend: Arc<dyn DeploymentBackend>,
        credentials: Arc<dyn Credentials>,
    ) -> Self {
        Self {
            project_id,
            backend,
            credentials,
            busy: AtomicBool::new(false),
            view: RwLock::new(ProjectView::default()),
        }
    }

    pub fn project_id(&self) -> &ResourceId {
        &self.project_id
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub async fn view(&self) -> ProjectView {
        self.view.read().await.clone()
    }

    /// Reload the deployment list and the active deployment lookup
    pub async fn refresh(&self) {
        let Some(token) = self.credentials.bearer().await else {
            return;
        };
        let (deployments, active) = futures::join!(
            self.backend.list_deployments(&self.project_id, &token),
            self.backend.active_deployments(&self.project_id, &token),
        );

        let mut view = self.view.write().await;
        match deployments {
            Ok(deployments) => {
                view.deployments = Some(deployments);
                view.error = None;
            }
            Err(e) => {
                error!("Failed to list deployments of project {}: {}", self.project_id, e);
                view.error = Some(e.user_message());
            }
        }
        match active {
            Ok(active) => view.active = Some(active.into()),
            Err(e) if e.api().map(|a| a.status) == Some(404) => {
                debug!("Project {} has no active deployments", self.project_id);
                view.active = Some(ActiveDeployments::default());
                view.error = Some("No active deployments for this project.".to_string());
            }
            Err(e) => {
                error!("Failed to load active deployments of project {}: {}", self.project_id, e);
                view.error = Some("Failed to load active deployments.".to_string());
            }
        }
    }

    pub async fn create_deployment(
        &self,
        request: CreateDeploymentRequest,
    ) -> Result<(), ConsoleError> {
        let backend = self.backend.clone();
        let project_id = self.project_id.clone();
        self.dispatch("create", None, None, None, move |token| async move {
            backend.create_deployment(&project_id, &request, &token).await
        })
        .await
    }

    pub async fn deploy_to(
        &self,
        environment: Environment,
        deployment_id: ResourceId,
    ) -> Result<(), ConsoleError> {
        let backend = self.backend.clone();
        let project_id = self.project_id.clone();
        self.dispatch("deploy", None, None, None, move |token| async move {
            backend
                .deploy(&project_id, &deployment_id, environment, &token)
                .await
        })
        .await
    }

    pub async fn promote(&self, deployment_id: ResourceId) -> Result<(), ConsoleError> {
        let backend = self.backend.clone();
        let project_id = self.project_id.clone();
        self.dispatch(
            "promote",
            Some("Failed to promote deployment: "),
            Some("Successfully promoted to Production!"),
            None,
            move |token| async move { backend.promote(&project_id, &deployment_id, &token).await },
        )
        .await
    }

    pub async fn rollback(
        &self,
        deployment_id: ResourceId,
        environment: Option<Environment>,
    ) -> Result<(), ConsoleError> {
        let backend = self.backend.clone();
        let project_id = self.project_id.clone();
        self.dispatch(
            "rollback",
            Some("Failed to rollback deployment: "),
            Some("Successfully rolled back Production!"),
            None,
            move |token| async move {
                backend
                    .rollback(&project_id, &deployment_id, environment, &token)
                    .await
            },
        )
        .await
    }

    /// Delete a deployment. Deployments known to be live are refused
    /// without calling the backend.
    pub async fn delete_deployment(&self, deployment_id: ResourceId) -> Result<(), ConsoleError> {
        let (live_in, environment) = {
            let view = self.view.read().await;
            let live_in = view
                .active
                .as_ref()
                .and_then(|active| active.environment_of(&deployment_id));
            let environment = view
                .deployments
                .iter()
                .flatten()
                .find(|d| d.id == deployment_id)
                .and_then(|d| d.environment);
            (live_in, environment)
        };

        if let Some(live_in) = live_in {
            warn!("Deployment {} is active in {}, not deleting", deployment_id, live_in);
            self.view.write().await.notice = Some(Notice::ActiveDeploymentBlocked(Some(live_in)));
            return Err(ConsoleError::ActiveDeployment(Some(live_in)));
        }

        let backend = self.backend.clone();
        let project_id = self.project_id.clone();
        self.dispatch(
            "delete",
            Some("Failed to delete deployment: "),
            Some("Deployment deleted successfully!"),
            environment,
            move |token| async move {
                backend
                    .delete_deployment(&project_id, &deployment_id, &token)
                    .await
            },
        )
        .await
    }

    async fn dispatch<F, Fut>(
        &self,
        action: &str,
        failure_prefix: Option<&str>,
        success_notice: Option<&str>,
        environment: Option<Environment>,
        call: F,
    ) -> Result<(), ConsoleError>
    where
        F: FnOnce(SecretString) -> Fut,
        Fut: Future<Output = Result<(), ConsoleError>>,
    {
        let Some(token) = self.credentials.bearer().await else {
            return Err(ConsoleError::NotAuthenticated);
        };

        self.busy.store(true, Ordering::SeqCst);
        let _busy = BusyGuard(&self.busy);
        {
            let mut view = self.view.write().await;
            view.error = None;
            view.notice = None;
        }

        info!("Deployment action {} on project {}", action, self.project_id);
        match call(token).await {
            Ok(()) => {
                if let Some(message) = success_notice {
                    self.view.write().await.notice = Some(Notice::Success(message.to_string()));
                }
                self.refresh().await;
                Ok(())
            }
            Err(e) => {
                if e.api().is_some_and(|a| a.is(400, ACTIVE_DEPLOYMENT_MESSAGE)) {
                    warn!("Backend refused {}: deployment is active", action);
                    self.view.write().await.notice =
                        Some(Notice::ActiveDeploymentBlocked(environment));
                    return Err(ConsoleError::ActiveDeployment(environment));
                }

                error!("Deployment action {} failed: {}", action, e);
                let message = e.user_message();
                self.view.write().await.error = Some(match failure_prefix {
                    Some(prefix) => format!("{}{}", prefix, message),
                    None => message,
                });
                Err(e)
            }
        }
    }
}

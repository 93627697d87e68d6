//! Deployment dispatcher tests

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use buildzy::deploy::dispatcher::{
    ActiveDeployments, DeploymentBackend, DeploymentDispatcher, Notice,
};
use buildzy::errors::ConsoleError;
use buildzy_api::models::{
    ActiveDeploymentRef, ActiveDeploymentsResponse, CreateDeploymentRequest, Deployment,
    DeploymentStatus, Environment, ResourceId,
};
use secrecy::SecretString;
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};

use crate::support::{api_error, StaticCredentials};

fn deployment(id: i64, environment: Environment) -> Deployment {
    serde_json::from_value(json!({
        "id": id,
        "status": "SUCCESS",
        "environment": environment.as_str(),
        "gitBranch": "main",
    }))
    .unwrap()
}

#[derive(Default)]
struct FakeBackend {
    calls: Mutex<Vec<String>>,
    /// `None` answers 404 on the active lookup
    active: Mutex<Option<Result<ActiveDeploymentsResponse, u16>>>,
    fail_action: Mutex<Option<(u16, Value)>>,
}

impl FakeBackend {
    fn with_active(production: Option<i64>, staging: Option<i64>) -> Self {
        let backend = Self::default();
        *backend.active.lock().unwrap() = Some(Ok(ActiveDeploymentsResponse {
            production: production.map(|id| ActiveDeploymentRef { id: id.into() }),
            staging: staging.map(|id| ActiveDeploymentRef { id: id.into() }),
        }));
        backend
    }

    fn failing_with(self, status: u16, body: Value) -> Self {
        *self.fail_action.lock().unwrap() = Some((status, body));
        self
    }

    fn record(&self, call: String) -> Result<(), ConsoleError> {
        self.calls.lock().unwrap().push(call);
        match self.fail_action.lock().unwrap().clone() {
            Some((status, body)) => Err(api_error(status, body)),
            None => Ok(()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

#[async_trait]
impl DeploymentBackend for FakeBackend {
    async fn list_deployments(
        &self,
        _project_id: &ResourceId,
        _token: &SecretString,
    ) -> Result<Vec<Deployment>, ConsoleError> {
        self.calls.lock().unwrap().push("list".to_string());
        Ok(vec![
            deployment(10, Environment::Production),
            deployment(11, Environment::Staging),
            deployment(12, Environment::Staging),
        ])
    }

    async fn active_deployments(
        &self,
        _project_id: &ResourceId,
        _token: &SecretString,
    ) -> Result<ActiveDeploymentsResponse, ConsoleError> {
        match self.active.lock().unwrap().clone() {
            Some(Ok(active)) => Ok(active),
            Some(Err(status)) => Err(api_error(status, json!({"message": "boom"}))),
            None => Err(api_error(404, json!({"message": "Not found"}))),
        }
    }

    async fn create_deployment(
        &self,
        _project_id: &ResourceId,
        request: &CreateDeploymentRequest,
        _token: &SecretString,
    ) -> Result<(), ConsoleError> {
        self.record(format!("create {} {}", request.git_branch, request.environment))
    }

    async fn deploy(
        &self,
        _project_id: &ResourceId,
        deployment_id: &ResourceId,
        environment: Environment,
        _token: &SecretString,
    ) -> Result<(), ConsoleError> {
        self.record(format!("deploy {} {}", deployment_id, environment))
    }

    async fn promote(
        &self,
        _project_id: &ResourceId,
        deployment_id: &ResourceId,
        _token: &SecretString,
    ) -> Result<(), ConsoleError> {
        self.record(format!("promote {}", deployment_id))
    }

    async fn rollback(
        &self,
        _project_id: &ResourceId,
        deployment_id: &ResourceId,
        environment: Option<Environment>,
        _token: &SecretString,
    ) -> Result<(), ConsoleError> {
        self.record(format!("rollback {} {:?}", deployment_id, environment))
    }

    async fn delete_deployment(
        &self,
        _project_id: &ResourceId,
        deployment_id: &ResourceId,
        _token: &SecretString,
    ) -> Result<(), ConsoleError> {
        self.record(format!("delete {}", deployment_id))
    }
}

fn dispatcher(backend: Arc<FakeBackend>) -> DeploymentDispatcher {
    DeploymentDispatcher::new(
        ResourceId::from(1i64),
        backend,
        Arc::new(StaticCredentials::signed_in()),
    )
}

#[tokio::test]
async fn test_refresh_loads_list_and_active_mapping() {
    let backend = Arc::new(FakeBackend::with_active(Some(10), Some(11)));
    let dispatcher = dispatcher(backend.clone());

    dispatcher.refresh().await;

    let view = dispatcher.view().await;
    assert_eq!(view.deployments.map(|d| d.len()), Some(3));
    let active = view.active.unwrap();
    assert_eq!(active.environment_of(&10i64.into()), Some(Environment::Production));
    assert_eq!(active.environment_of(&11i64.into()), Some(Environment::Staging));
    assert_eq!(active.environment_of(&12i64.into()), None);
    assert!(view.error.is_none());
}

#[tokio::test]
async fn test_refresh_without_active_deployments() {
    let dispatcher = dispatcher(Arc::new(FakeBackend::default()));
    dispatcher.refresh().await;

    let view = dispatcher.view().await;
    assert_eq!(view.active, Some(ActiveDeployments::default()));
    assert_eq!(view.error.as_deref(), Some("No active deployments for this project."));
}

#[tokio::test]
async fn test_refresh_active_lookup_failure() {
    let backend = FakeBackend::default();
    *backend.active.lock().unwrap() = Some(Err(500));
    let dispatcher = dispatcher(Arc::new(backend));
    dispatcher.refresh().await;

    let view = dispatcher.view().await;
    assert!(view.deployments.is_some());
    assert_eq!(view.error.as_deref(), Some("Failed to load active deployments."));
}

#[tokio::test]
async fn test_delete_of_live_deployment_is_refused_locally() {
    let backend = Arc::new(FakeBackend::with_active(Some(10), None));
    let dispatcher = dispatcher(backend.clone());
    dispatcher.refresh().await;

    let result = dispatcher.delete_deployment(10i64.into()).await;

    assert!(matches!(
        result,
        Err(ConsoleError::ActiveDeployment(Some(Environment::Production)))
    ));
    assert_eq!(backend.count("delete"), 0);
    assert_eq!(
        dispatcher.view().await.notice,
        Some(Notice::ActiveDeploymentBlocked(Some(Environment::Production)))
    );
}

#[tokio::test]
async fn test_delete_rejected_by_backend_shows_notice_not_error() {
    let backend = Arc::new(
        FakeBackend::with_active(None, None)
            .failing_with(400, json!({"message": "Cannot delete active deployment"})),
    );
    let dispatcher = dispatcher(backend.clone());
    dispatcher.refresh().await;

    let result = dispatcher.delete_deployment(11i64.into()).await;

    assert!(matches!(
        result,
        Err(ConsoleError::ActiveDeployment(Some(Environment::Staging)))
    ));
    let view = dispatcher.view().await;
    assert_eq!(
        view.notice,
        Some(Notice::ActiveDeploymentBlocked(Some(Environment::Staging)))
    );
    assert!(view.error.is_none());
    assert!(!dispatcher.is_busy());
}

#[tokio::test]
async fn test_delete_success_refreshes() {
    let backend = Arc::new(FakeBackend::with_active(Some(10), None));
    let dispatcher = dispatcher(backend.clone());
    dispatcher.refresh().await;

    assert_ok!(dispatcher.delete_deployment(12i64.into()).await);

    assert_eq!(backend.count("delete 12"), 1);
    assert_eq!(backend.count("list"), 2);
    assert_eq!(
        dispatcher.view().await.notice,
        Some(Notice::Success("Deployment deleted successfully!".to_string()))
    );
}

#[tokio::test]
async fn test_promote_and_rollback_notices() {
    let backend = Arc::new(FakeBackend::with_active(Some(10), Some(11)));
    let dispatcher = dispatcher(backend.clone());

    assert_ok!(dispatcher.promote(11i64.into()).await);
    assert_eq!(
        dispatcher.view().await.notice,
        Some(Notice::Success("Successfully promoted to Production!".to_string()))
    );

    assert_ok!(
        dispatcher
            .rollback(10i64.into(), Some(Environment::Production))
            .await
    );
    assert_eq!(
        dispatcher.view().await.notice,
        Some(Notice::Success("Successfully rolled back Production!".to_string()))
    );
    assert_eq!(
        backend.calls().into_iter().filter(|c| !c.starts_with("list")).collect::<Vec<_>>(),
        vec!["promote 11", "rollback 10 Some(Production)"]
    );
}

#[tokio::test]
async fn test_failed_action_prefixes_error() {
    let backend = Arc::new(
        FakeBackend::with_active(Some(10), None).failing_with(500, json!({"message": "boom"})),
    );
    let dispatcher = dispatcher(backend.clone());

    assert_err!(dispatcher.rollback(10i64.into(), None).await);
    let view = dispatcher.view().await;
    assert_eq!(view.error.as_deref(), Some("Failed to rollback deployment: boom"));
    assert!(view.notice.is_none());
    assert_eq!(backend.count("list"), 0);
    assert!(!dispatcher.is_busy());
}

#[tokio::test]
async fn test_create_and_deploy_refresh_views() {
    let backend = Arc::new(FakeBackend::with_active(None, Some(12)));
    let dispatcher = dispatcher(backend.clone());

    dispatcher
        .create_deployment(CreateDeploymentRequest {
            git_commit_hash: String::new(),
            git_branch: "main".to_string(),
            environment: Environment::Staging,
        })
        .await
        .unwrap();
    dispatcher
        .deploy_to(Environment::Production, 12i64.into())
        .await
        .unwrap();

    assert_eq!(backend.count("create main STAGING"), 1);
    assert_eq!(backend.count("deploy 12 PRODUCTION"), 1);
    assert_eq!(backend.count("list"), 2);
    let view = dispatcher.view().await;
    assert!(view.notice.is_none());
    assert_eq!(view.deployments.unwrap()[0].status, DeploymentStatus::Success);
}

#[tokio::test]
async fn test_actions_require_a_session() {
    let backend = Arc::new(FakeBackend::with_active(None, None));
    let dispatcher = DeploymentDispatcher::new(
        ResourceId::from(1i64),
        backend.clone(),
        Arc::new(StaticCredentials::signed_out()),
    );

    let result = dispatcher.promote(10i64.into()).await;
    assert!(matches!(result, Err(ConsoleError::NotAuthenticated)));
    assert!(backend.calls().is_empty());
}

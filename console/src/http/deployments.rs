//! Deployment API client

use async_trait::async_trait;
use buildzy_api::models::{
    ActiveDeploymentsResponse, CreateDeploymentRequest, Deployment, DeploymentStatusResponse,
    Environment, Page, ResourceId,
};
use secrecy::SecretString;

use crate::deploy::dispatcher::DeploymentBackend;
use crate::errors::ConsoleError;
use crate::http::client::{HttpClient, RequestOptions};
use crate::tail::{PollSession, StatusSource};

impl HttpClient {
    /// Get the status of a single deployment
    pub async fn get_deployment_status(
        &self,
        session: &PollSession,
        token: &SecretString,
    ) -> Result<DeploymentStatusResponse, ConsoleError> {
        let path = format!(
            "/api/projects/{}/deployments/{}",
            session.project_id, session.deployment_id
        );
        self.get(&path, token).await
    }

    async fn post_action(&self, path: &str, token: &SecretString) -> Result<(), ConsoleError> {
        self.api_fetch_auth_body(path, token, RequestOptions::post())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl StatusSource for HttpClient {
    async fn fetch_status(
        &self,
        session: &PollSession,
        token: &SecretString,
    ) -> Result<DeploymentStatusResponse, ConsoleError> {
        self.get_deployment_status(session, token).await
    }
}

#[async_trait]
impl DeploymentBackend for HttpClient {
    async fn list_deployments(
        &self,
        project_id: &ResourceId,
        token: &SecretString,
    ) -> Result<Vec<Deployment>, ConsoleError> {
        let path = format!("/api/projects/{}/deployments?page=0&size=20", project_id);
        let page: Page<Deployment> = self.get(&path, token).await?;
        Ok(page.content)
    }

    async fn active_deployments(
        &self,
        project_id: &ResourceId,
        token: &SecretString,
    ) -> Result<ActiveDeploymentsResponse, ConsoleError> {
        let path = format!("/api/projects/{}/deployments/active", project_id);
        self.get(&path, token).await
    }

    async fn create_deployment(
        &self,
        project_id: &ResourceId,
        request: &CreateDeploymentRequest,
        token: &SecretString,
    ) -> Result<(), ConsoleError> {
        let path = format!("/api/projects/{}/deployments", project_id);
        self.api_fetch_auth_body(&path, token, RequestOptions::post().json(request)?)
            .await?;
        Ok(())
    }

    async fn deploy(
        &self,
        project_id: &ResourceId,
        deployment_id: &ResourceId,
        environment: Environment,
        token: &SecretString,
    ) -> Result<(), ConsoleError> {
        let path = format!(
            "/api/projects/{}/deployments/{}/deploy?environment={}",
            project_id, deployment_id, environment
        );
        self.post_action(&path, token).await
    }

    async fn promote(
        &self,
        project_id: &ResourceId,
        deployment_id: &ResourceId,
        token: &SecretString,
    ) -> Result<(), ConsoleError> {
        let path = format!(
            "/api/projects/{}/deployments/{}/promote",
            project_id, deployment_id
        );
        self.post_action(&path, token).await
    }

    async fn rollback(
        &self,
        project_id: &ResourceId,
        deployment_id: &ResourceId,
        environment: Option<Environment>,
        token: &SecretString,
    ) -> Result<(), ConsoleError> {
        let mut path = format!(
            "/api/projects/{}/deployments/{}/rollback",
            project_id, deployment_id
        );
        if let Some(environment) = environment {
            path.push_str(&format!("?environment={}", environment));
        }
        self.post_action(&path, token).await
    }

    async fn delete_deployment(
        &self,
        project_id: &ResourceId,
        deployment_id: &ResourceId,
        token: &SecretString,
    ) -> Result<(), ConsoleError> {
        let path = format!("/api/projects/{}/deployments/{}", project_id, deployment_id);
        self.api_fetch_auth_body(&path, token, RequestOptions::delete())
            .await?;
        Ok(())
    }
}

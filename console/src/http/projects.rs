//! Project API client

use async_trait::async_trait;
use buildzy_api::models::{
    CreateProjectRequest, CreateProjectResponse, DomainAvailability, Page, Project, ResourceId,
    UpdateProjectRequest,
};
use secrecy::SecretString;

use crate::deploy::domain::DomainLookup;
use crate::errors::ConsoleError;
use crate::http::client::{HttpClient, RequestOptions};

impl HttpClient {
    /// List the first page of projects
    pub async fn list_projects(&self, token: &SecretString) -> Result<Vec<Project>, ConsoleError> {
        let page: Page<Project> = self.get("/api/projects?page=0&size=20", token).await?;
        Ok(page.content)
    }

    /// Create a project
    pub async fn create_project(
        &self,
        token: &SecretString,
        request: &CreateProjectRequest,
    ) -> Result<CreateProjectResponse, ConsoleError> {
        self.post("/api/projects", token, request).await
    }

    /// Update a project's settings
    pub async fn update_project(
        &self,
        project_id: &ResourceId,
        token: &SecretString,
        request: &UpdateProjectRequest,
    ) -> Result<(), ConsoleError> {
        let path = format!("/api/projects/{}", project_id);
        self.api_fetch_auth_body(&path, token, RequestOptions::put().json(request)?)
            .await?;
        Ok(())
    }

    /// Delete a project
    pub async fn delete_project(
        &self,
        project_id: &ResourceId,
        token: &SecretString,
    ) -> Result<(), ConsoleError> {
        let path = format!("/api/projects/{}", project_id);
        self.api_fetch_auth_body(&path, token, RequestOptions::delete())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl DomainLookup for HttpClient {
    async fn domain_available(
        &self,
        subdomain: &str,
        token: &SecretString,
    ) -> Result<bool, ConsoleError> {
        let encoded: String = url::form_urlencoded::byte_serialize(subdomain.as_bytes()).collect();
        let path = format!("/api/projects/domain-available?domain={}", encoded);
        let availability: DomainAvailability = self.get(&path, token).await?;
        Ok(availability.available)
    }
}

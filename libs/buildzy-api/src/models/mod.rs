//! API models

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier as returned by the backend.
///
/// Some endpoints return numeric ids, others strings; both are accepted and
/// rendered verbatim in URL paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceId {
    Number(i64),
    Text(String),
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceId::Number(n) => write!(f, "{}", n),
            ResourceId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ResourceId {
    fn from(value: i64) -> Self {
        ResourceId::Number(value)
    }
}

impl From<&str> for ResourceId {
    fn from(value: &str) -> Self {
        value.parse().unwrap_or_else(|_| ResourceId::Text(value.to_string()))
    }
}

impl FromStr for ResourceId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // only canonical integers, so "007" or "+12" render back unchanged
        Ok(match s.parse::<i64>() {
            Ok(n) if n.to_string() == s => ResourceId::Number(n),
            _ => ResourceId::Text(s.to_string()),
        })
    }
}

// ================================== AUTH ========================================= //

/// Authenticated user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    #[serde(default)]
    pub id: Option<ResourceId>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

/// Login and registration response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: AuthUser,
}

// ================================= PROJECTS ====================================== //

/// A page of results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
}

/// A project bound to a git repository and subdomain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "gitURL")]
    pub git_url: Option<String>,
    #[serde(default)]
    pub git_branch: Option<String>,
    #[serde(default)]
    pub subdomain: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Project creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: String,
    #[serde(rename = "gitURL")]
    pub git_url: String,
    pub git_branch: String,
    pub subdomain: String,
    pub auto_deploy_enabled: bool,
    /// Sent as `null` when auto-deploy is disabled
    pub auto_deploy_env: Option<Environment>,
}

/// Project creation response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectResponse {
    pub id: ResourceId,
    /// Present when the backend started an initial deployment
    #[serde(default)]
    pub deployment_id: Option<ResourceId>,
}

/// Project update request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub name: String,
    pub description: String,
    #[serde(rename = "gitURL")]
    pub git_url: String,
    pub git_branch: String,
    pub subdomain: String,
}

/// Subdomain availability
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DomainAvailability {
    pub available: bool,
}

// =============================== DEPLOYMENTS ===================================== //

/// Deployment target environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Environment {
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Staging => "STAGING",
            Environment::Production => "PRODUCTION",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "STAGING" => Ok(Environment::Staging),
            "PRODUCTION" | "PROD" => Ok(Environment::Production),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

/// Last action applied to a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentAction {
    Deployed,
    Promoted,
    Rollbacked,
}

/// Deployment status reported by the backend.
///
/// Unknown values are carried through untouched in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeploymentStatus {
    Pending,
    Deploying,
    Running,
    Success,
    Completed,
    Failed,
    Other(String),
}

impl DeploymentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            DeploymentStatus::Pending => "PENDING",
            DeploymentStatus::Deploying => "DEPLOYING",
            DeploymentStatus::Running => "RUNNING",
            DeploymentStatus::Success => "SUCCESS",
            DeploymentStatus::Completed => "COMPLETED",
            DeploymentStatus::Failed => "FAILED",
            DeploymentStatus::Other(s) => s,
        }
    }

    /// `SUCCESS` and `COMPLETED` end a deployment. `RUNNING` does not.
    pub fn is_terminal_success(&self) -> bool {
        matches!(self, DeploymentStatus::Success | DeploymentStatus::Completed)
    }
}

impl From<String> for DeploymentStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PENDING" => DeploymentStatus::Pending,
            "DEPLOYING" => DeploymentStatus::Deploying,
            "RUNNING" => DeploymentStatus::Running,
            "SUCCESS" => DeploymentStatus::Success,
            "COMPLETED" => DeploymentStatus::Completed,
            "FAILED" => DeploymentStatus::Failed,
            _ => DeploymentStatus::Other(value),
        }
    }
}

impl From<DeploymentStatus> for String {
    fn from(value: DeploymentStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deployment of a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: ResourceId,
    pub status: DeploymentStatus,
    #[serde(default)]
    pub environment: Option<Environment>,
    #[serde(default)]
    pub last_action: Option<DeploymentAction>,
    #[serde(default)]
    pub git_commit_hash: Option<String>,
    #[serde(default)]
    pub git_branch: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub deployed_at: Option<String>,
    #[serde(default)]
    pub deployed_url: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Single deployment status lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStatusResponse {
    pub status: DeploymentStatus,
    #[serde(default)]
    pub deployed_url: Option<String>,
}

/// Deployment creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeploymentRequest {
    pub git_commit_hash: String,
    pub git_branch: String,
    pub environment: Environment,
}

/// Reference to the deployment active in an environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveDeploymentRef {
    pub id: ResourceId,
}

/// Active deployments per environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActiveDeploymentsResponse {
    #[serde(default, rename = "PRODUCTION")]
    pub production: Option<ActiveDeploymentRef>,
    #[serde(default, rename = "STAGING")]
    pub staging: Option<ActiveDeploymentRef>,
}

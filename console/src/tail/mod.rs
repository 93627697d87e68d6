//! Live log tailing and deployment status reconciliation

pub mod buffer;
pub mod entry;
pub mod status;
pub mod tailer;

use std::fmt;

use async_trait::async_trait;
use buildzy_api::models::{DeploymentStatusResponse, ResourceId};
use secrecy::SecretString;

use crate::errors::ConsoleError;
use crate::tail::entry::LogResponse;

/// The (project, deployment) pair both pollers are scoped to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PollSession {
    pub project_id: ResourceId,
    pub deployment_id: ResourceId,
}

impl PollSession {
    pub fn new(project_id: impl Into<ResourceId>, deployment_id: impl Into<ResourceId>) -> Self {
        Self {
            project_id: project_id.into(),
            deployment_id: deployment_id.into(),
        }
    }

    /// Both halves are required; a missing one leaves the pollers inactive
    pub fn from_parts(project_id: Option<&str>, deployment_id: Option<&str>) -> Option<Self> {
        match (project_id, deployment_id) {
            (Some(p), Some(d)) if !p.is_empty() && !d.is_empty() => Some(Self::new(p, d)),
            _ => None,
        }
    }
}

impl fmt::Display for PollSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "project {} / deployment {}", self.project_id, self.deployment_id)
    }
}

/// Where log tails come from
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn fetch_logs(
        &self,
        session: &PollSession,
        token: &SecretString,
    ) -> Result<LogResponse, ConsoleError>;
}

/// Where deployment status comes from
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(
        &self,
        session: &PollSession,
        token: &SecretString,
    ) -> Result<DeploymentStatusResponse, ConsoleError>;
}

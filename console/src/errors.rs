//! Error types for the Buildzy console

use std::fmt;

use thiserror::Error;

/// Body of a failed API response
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorBody {
    Empty,
    Json(serde_json::Value),
    Text(String),
}

/// Structured failure for a non-2xx API response
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: u16,
    pub data: ErrorBody,
}

impl ApiError {
    /// Human readable message: the `message` field of a JSON body, the raw
    /// text of a plain body, or the status code.
    pub fn message(&self) -> String {
        match &self.data {
            ErrorBody::Json(value) => match value.get("message").and_then(|m| m.as_str()) {
                Some(message) => message.to_string(),
                None => value.to_string(),
            },
            ErrorBody::Text(text) if !text.trim().is_empty() => text.clone(),
            _ => format!("Request failed: {}", self.status),
        }
    }

    /// Matches the status code and the `message` field of a JSON body
    pub fn is(&self, status: u16, message: &str) -> bool {
        self.status == status
            && matches!(
                &self.data,
                ErrorBody::Json(value)
                    if value.get("message").and_then(|m| m.as_str()) == Some(message)
            )
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.status)
    }
}

/// Main error type for the Buildzy console
#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(ApiError),

    #[error("Cannot delete active deployment")]
    ActiveDeployment(Option<buildzy_api::models::Environment>),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConsoleError {
    /// Structured API failure, if this is one
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            ConsoleError::Api(e) => Some(e),
            _ => None,
        }
    }

    /// Message shown to the user in place of the failed view
    pub fn user_message(&self) -> String {
        match self {
            ConsoleError::Api(e) => e.message(),
            other => other.to_string(),
        }
    }
}

impl From<ApiError> for ConsoleError {
    fn from(err: ApiError) -> Self {
        ConsoleError::Api(err)
    }
}

impl From<anyhow::Error> for ConsoleError {
    fn from(err: anyhow::Error) -> Self {
        ConsoleError::Internal(err.to_string())
    }
}

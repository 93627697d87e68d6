//! Bearer token persistence

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;
use tracing::debug;

use crate::errors::ConsoleError;
use crate::filesys::file::File;

/// Persists an opaque bearer token. Makes no trust decisions about it.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get_token(&self) -> Result<Option<SecretString>, ConsoleError>;

    async fn set_token(&self, token: &SecretString) -> Result<(), ConsoleError>;

    async fn clear_token(&self) -> Result<(), ConsoleError>;
}

/// Copy a token without exposing it outside this module's callers
pub fn duplicate(token: &SecretString) -> SecretString {
    SecretString::from(token.expose_secret().to_string())
}

/// Token kept in a file readable only by the owner
#[derive(Debug)]
pub struct FileTokenStore {
    file: File,
}

impl FileTokenStore {
    pub fn new(file: File) -> Self {
        Self { file }
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get_token(&self) -> Result<Option<SecretString>, ConsoleError> {
        let contents = self.file.read_string_opt().await?;
        Ok(contents
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(SecretString::from))
    }

    async fn set_token(&self, token: &SecretString) -> Result<(), ConsoleError> {
        self.file
            .write_atomic(token.expose_secret().as_bytes())
            .await?;
        debug!("Token saved to {}", self.file.path().display());
        Ok(())
    }

    async fn clear_token(&self) -> Result<(), ConsoleError> {
        self.file.delete().await
    }
}

/// Token kept for the lifetime of the process only
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<SecretString>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            token: RwLock::new(Some(SecretString::from(token.to_string()))),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get_token(&self) -> Result<Option<SecretString>, ConsoleError> {
        Ok(self.token.read().await.as_ref().map(duplicate))
    }

    async fn set_token(&self, token: &SecretString) -> Result<(), ConsoleError> {
        *self.token.write().await = Some(duplicate(token));
        Ok(())
    }

    async fn clear_token(&self) -> Result<(), ConsoleError> {
        *self.token.write().await = None;
        Ok(())
    }
}

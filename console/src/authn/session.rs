//! Session and authentication state

use std::sync::Arc;

use async_trait::async_trait;
use buildzy_api::models::{AuthResponse, AuthUser, LoginRequest, RegisterRequest};
use secrecy::SecretString;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::authn::token_store::{duplicate, TokenStore};
use crate::errors::ConsoleError;

/// Authentication status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Loading,
    Authenticated,
    Unauthenticated,
}

/// Current session
#[derive(Debug)]
pub struct AuthState {
    pub user: Option<AuthUser>,
    pub token: Option<SecretString>,
    pub status: AuthStatus,
}

impl AuthState {
    fn loading() -> Self {
        Self {
            user: None,
            token: None,
            status: AuthStatus::Loading,
        }
    }

    fn unauthenticated() -> Self {
        Self {
            user: None,
            token: None,
            status: AuthStatus::Unauthenticated,
        }
    }

    fn authenticated(user: AuthUser, token: SecretString) -> Self {
        Self {
            user: Some(user),
            token: Some(token),
            status: AuthStatus::Authenticated,
        }
    }
}

impl Clone for AuthState {
    fn clone(&self) -> Self {
        Self {
            user: self.user.clone(),
            token: self.token.as_ref().map(duplicate),
            status: self.status,
        }
    }
}

/// Backend calls the session depends on
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ConsoleError>;

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ConsoleError>;

    async fn me(&self, token: &SecretString) -> Result<AuthUser, ConsoleError>;

    /// Server-side logout; the response body is ignored
    async fn logout(&self, token: &SecretString) -> Result<(), ConsoleError>;
}

/// Supplies the bearer token for authenticated calls
#[async_trait]
pub trait Credentials: Send + Sync {
    /// The token, only while the session is authenticated
    async fn bearer(&self) -> Option<SecretString>;
}

/// Three-state session machine: loading, authenticated, unauthenticated.
///
/// Calls are not coalesced; callers gate on [`SessionManager::status`].
pub struct SessionManager {
    backend: Arc<dyn AuthBackend>,
    store: Arc<dyn TokenStore>,
    state: RwLock<AuthState>,
}

impl SessionManager {
    pub fn new(backend: Arc<dyn AuthBackend>, store: Arc<dyn TokenStore>) -> Self {
        Self {
            backend,
            store,
            state: RwLock::new(AuthState::loading()),
        }
    }

    pub async fn state(&self) -> AuthState {
        self.state.read().await.clone()
    }

    pub async fn status(&self) -> AuthStatus {
        self.state.read().await.status
    }

    pub async fn user(&self) -> Option<AuthUser> {
        self.state.read().await.user.clone()
    }

    /// Restore the session from the stored token, validating it with the
    /// whoami endpoint. A rejected token is removed from the store.
    pub async fn init(&self) -> AuthStatus {
        *self.state.write().await = AuthState::loading();

        let token = match self.store.get_token().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!("No stored token");
                return self.set_unauthenticated().await;
            }
            Err(e) => {
                error!("Failed to read stored token: {}", e);
                return self.set_unauthenticated().await;
            }
        };

        match self.backend.me(&token).await {
            Ok(user) => {
                info!("Session restored for {}", user.email.as_deref().unwrap_or("user"));
                *self.state.write().await = AuthState::authenticated(user, token);
                AuthStatus::Authenticated
            }
            Err(e) => {
                warn!("Stored token rejected: {}", e);
                if let Err(e) = self.store.clear_token().await {
                    error!("Failed to clear stored token: {}", e);
                }
                self.set_unauthenticated().await
            }
        }
    }

    /// Log in and store the returned token
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthUser, ConsoleError> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self.backend.login(&request).await?;
        self.accept(response).await
    }

    /// Register and store the returned token
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthUser, ConsoleError> {
        let response = self.backend.register(request).await?;
        self.accept(response).await
    }

    /// End the session. The server call is best effort and never blocks the
    /// local logout.
    pub async fn logout(&self) {
        let token = self.state.read().await.token.as_ref().map(duplicate);
        if let Some(token) = token {
            if let Err(e) = self.backend.logout(&token).await {
                warn!("Backend logout failed: {}", e);
            }
        }

        if let Err(e) = self.store.clear_token().await {
            error!("Failed to clear stored token: {}", e);
        }
        self.set_unauthenticated().await;
        info!("Logged out");
    }

    async fn accept(&self, response: AuthResponse) -> Result<AuthUser, ConsoleError> {
        let token = SecretString::from(response.token);
        self.store.set_token(&token).await?;
        *self.state.write().await = AuthState::authenticated(response.user.clone(), token);
        Ok(response.user)
    }

    async fn set_unauthenticated(&self) -> AuthStatus {
        *self.state.write().await = AuthState::unauthenticated();
        AuthStatus::Unauthenticated
    }
}

#[async_trait]
impl Credentials for SessionManager {
    async fn bearer(&self) -> Option<SecretString> {
        let state = self.state.read().await;
        match state.status {
            AuthStatus::Authenticated => state.token.as_ref().map(duplicate),
            _ => None,
        }
    }
}

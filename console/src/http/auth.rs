//! Auth API client

use async_trait::async_trait;
use buildzy_api::models::{AuthResponse, AuthUser, LoginRequest, RegisterRequest};
use secrecy::SecretString;

use crate::authn::session::AuthBackend;
use crate::errors::ConsoleError;
use crate::http::client::{HttpClient, RequestOptions};

#[async_trait]
impl AuthBackend for HttpClient {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ConsoleError> {
        self.api_fetch("/api/auth/login", RequestOptions::post().json(request)?)
            .await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ConsoleError> {
        self.api_fetch("/api/auth/register", RequestOptions::post().json(request)?)
            .await
    }

    async fn me(&self, token: &SecretString) -> Result<AuthUser, ConsoleError> {
        self.get("/api/auth/me", token).await
    }

    async fn logout(&self, token: &SecretString) -> Result<(), ConsoleError> {
        // plain text response
        self.api_fetch_auth_body("/api/auth/logout", token, RequestOptions::post())
            .await?;
        Ok(())
    }
}

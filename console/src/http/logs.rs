//! Log service client

use async_trait::async_trait;
use reqwest::header::{self, HeaderValue};
use secrecy::SecretString;
use tracing::debug;

use crate::errors::{ApiError, ConsoleError, ErrorBody};
use crate::http::client::{bearer_header, HttpClient};
use crate::tail::entry::LogResponse;
use crate::tail::{LogSource, PollSession};

impl HttpClient {
    /// Fetch the current log tail of a deployment
    pub async fn get_deployment_logs(
        &self,
        session: &PollSession,
        token: &SecretString,
    ) -> Result<LogResponse, ConsoleError> {
        let url = format!(
            "{}/logs/{}/{}",
            self.log_service_url(),
            session.project_id,
            session.deployment_id
        );
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header(header::AUTHORIZATION, bearer_header(token)?)
            .header(header::ACCEPT, HeaderValue::from_static("text/plain, */*"))
            .header(header::CACHE_CONTROL, HeaderValue::from_static("no-store"))
            .send()
            .await?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.text().await?;

        if !status.is_success() {
            let data = if body.is_empty() {
                ErrorBody::Empty
            } else {
                ErrorBody::Text(body)
            };
            return Err(ApiError {
                status: status.as_u16(),
                data,
            }
            .into());
        }

        Ok(LogResponse::classify(&content_type, body)?)
    }
}

#[async_trait]
impl LogSource for HttpClient {
    async fn fetch_logs(
        &self,
        session: &PollSession,
        token: &SecretString,
    ) -> Result<LogResponse, ConsoleError> {
        self.get_deployment_logs(session, token).await
    }
}

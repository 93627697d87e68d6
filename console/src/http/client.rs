//! HTTP client implementation

use std::time::Duration;

use http::Method;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};

use crate::errors::{ApiError, ConsoleError, ErrorBody};

/// Per-request options
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::with_method(Method::GET)
    }

    pub fn post() -> Self {
        Self::with_method(Method::POST)
    }

    pub fn put() -> Self {
        Self::with_method(Method::PUT)
    }

    pub fn delete() -> Self {
        Self::with_method(Method::DELETE)
    }

    fn with_method(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Attach a JSON body
    pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self, ConsoleError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Add a header; caller headers win over the client defaults
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::get()
    }
}

/// Successful response body.
///
/// Bodies that are not valid JSON are kept as raw text since some endpoints
/// answer with plain text.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Empty,
    Json(serde_json::Value),
    Text(String),
}

impl ResponseBody {
    pub fn parse(raw: String) -> Self {
        if raw.is_empty() {
            return ResponseBody::Empty;
        }
        match serde_json::from_str(&raw) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(raw),
        }
    }

    pub fn into_value(self) -> serde_json::Value {
        match self {
            ResponseBody::Empty => serde_json::Value::Null,
            ResponseBody::Json(value) => value,
            ResponseBody::Text(text) => serde_json::Value::String(text),
        }
    }
}

impl From<ResponseBody> for ErrorBody {
    fn from(body: ResponseBody) -> Self {
        match body {
            ResponseBody::Empty => ErrorBody::Empty,
            ResponseBody::Json(value) => ErrorBody::Json(value),
            ResponseBody::Text(text) => ErrorBody::Text(text),
        }
    }
}

/// HTTP client for backend communication
pub struct HttpClient {
    pub(crate) client: Client,
    base_url: String,
    log_service_url: String,
}

impl HttpClient {
    /// Create a new HTTP client. The log service shares the API base URL
    /// until [`HttpClient::with_log_service`] says otherwise.
    pub fn new(base_url: &str) -> Result<Self, ConsoleError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        let base_url = base_url.trim_end_matches('/').to_string();
        Ok(Self {
            client,
            log_service_url: base_url.clone(),
            base_url,
        })
    }

    /// Use a separate base URL for the log service
    pub fn with_log_service(mut self, log_service_url: &str) -> Self {
        self.log_service_url = log_service_url.trim_end_matches('/').to_string();
        self
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the log service base URL
    pub fn log_service_url(&self) -> &str {
        &self.log_service_url
    }

    /// Perform a JSON request and return the raw response body
    pub async fn api_fetch_body(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<ResponseBody, ConsoleError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", options.method, url);

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        for (name, value) in options.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }

        let mut request = self
            .client
            .request(options.method.clone(), &url)
            .headers(headers);
        if let Some(body) = &options.body {
            request = request.body(serde_json::to_vec(body)?);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = ResponseBody::parse(response.text().await?);

        if !status.is_success() {
            error!("HTTP {} {} failed: {} - {:?}", options.method, path, status, body);
            return Err(ApiError {
                status: status.as_u16(),
                data: body.into(),
            }
            .into());
        }

        Ok(body)
    }

    /// Perform a JSON request and decode the body into `T`
    pub async fn api_fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ConsoleError> {
        let body = self.api_fetch_body(path, options).await?;
        Ok(serde_json::from_value(body.into_value())?)
    }

    /// [`HttpClient::api_fetch`] with a bearer token attached
    pub async fn api_fetch_auth<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &SecretString,
        options: RequestOptions,
    ) -> Result<T, ConsoleError> {
        let options = authorize(options, token)?;
        self.api_fetch(path, options).await
    }

    /// [`HttpClient::api_fetch_body`] with a bearer token attached
    pub async fn api_fetch_auth_body(
        &self,
        path: &str,
        token: &SecretString,
        options: RequestOptions,
    ) -> Result<ResponseBody, ConsoleError> {
        let options = authorize(options, token)?;
        self.api_fetch_body(path, options).await
    }

    /// Make an authenticated GET request
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &SecretString,
    ) -> Result<T, ConsoleError> {
        self.api_fetch_auth(path, token, RequestOptions::get()).await
    }

    /// Make an authenticated POST request
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        token: &SecretString,
        body: &B,
    ) -> Result<T, ConsoleError> {
        self.api_fetch_auth(path, token, RequestOptions::post().json(body)?)
            .await
    }

    /// Make an authenticated PUT request
    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        token: &SecretString,
        body: &B,
    ) -> Result<T, ConsoleError> {
        self.api_fetch_auth(path, token, RequestOptions::put().json(body)?)
            .await
    }
}

/// Build an `Authorization: Bearer` header value
pub(crate) fn bearer_header(token: &SecretString) -> Result<HeaderValue, ConsoleError> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
        .map_err(|e| ConsoleError::ValidationError(format!("Invalid token: {}", e)))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Merge the bearer header in below the caller's own headers
fn authorize(mut options: RequestOptions, token: &SecretString) -> Result<RequestOptions, ConsoleError> {
    if !options.headers.contains_key(header::AUTHORIZATION) {
        options
            .headers
            .insert(header::AUTHORIZATION, bearer_header(token)?);
    }
    Ok(options)
}

//! In-memory fakes behind the console's trait seams

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use buildzy::authn::session::Credentials;
use buildzy::errors::{ApiError, ConsoleError, ErrorBody};
use buildzy::tail::entry::LogResponse;
use buildzy::tail::{LogSource, PollSession, StatusSource};
use buildzy_api::models::{DeploymentStatus, DeploymentStatusResponse};
use secrecy::SecretString;
use serde_json::Value;

pub fn api_error(status: u16, body: Value) -> ConsoleError {
    ApiError {
        status,
        data: ErrorBody::Json(body),
    }
    .into()
}

/// Credentials with a fixed token, or none
pub struct StaticCredentials(pub Option<&'static str>);

impl StaticCredentials {
    pub fn signed_in() -> Self {
        Self(Some("test-token"))
    }

    pub fn signed_out() -> Self {
        Self(None)
    }
}

#[async_trait]
impl Credentials for StaticCredentials {
    async fn bearer(&self) -> Option<SecretString> {
        self.0.map(|t| SecretString::from(t.to_string()))
    }
}

/// Log source replaying queued replies; an empty queue answers `[]`
#[derive(Default)]
pub struct ScriptedLogs {
    replies: Mutex<VecDeque<Result<LogResponse, u16>>>,
    calls: AtomicUsize,
}

impl ScriptedLogs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply_json(&self, value: Value) -> &Self {
        self.push(Ok(LogResponse::from_json(value)))
    }

    pub fn reply_text(&self, text: &str) -> &Self {
        self.push(Ok(LogResponse::RawText(text.to_string())))
    }

    pub fn fail(&self, status: u16) -> &Self {
        self.push(Err(status))
    }

    fn push(&self, reply: Result<LogResponse, u16>) -> &Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogSource for ScriptedLogs {
    async fn fetch_logs(
        &self,
        _session: &PollSession,
        _token: &SecretString,
    ) -> Result<LogResponse, ConsoleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(status)) => Err(ApiError {
                status,
                data: ErrorBody::Text("log service unavailable".to_string()),
            }
            .into()),
            None => Ok(LogResponse::Entries(Vec::new())),
        }
    }
}

/// Status source replaying queued statuses; the last one repeats
#[derive(Default)]
pub struct ScriptedStatus {
    replies: Mutex<VecDeque<Result<(String, Option<String>), u16>>>,
    calls: AtomicUsize,
}

impl ScriptedStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, status: &str, deployed_url: Option<&str>) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok((status.to_string(), deployed_url.map(str::to_string))));
        self
    }

    pub fn fail(&self, status: u16) -> &Self {
        self.replies.lock().unwrap().push_back(Err(status));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusSource for ScriptedStatus {
    async fn fetch_status(
        &self,
        _session: &PollSession,
        _token: &SecretString,
    ) -> Result<DeploymentStatusResponse, ConsoleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut replies = self.replies.lock().unwrap();
        let reply = if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().cloned()
        };
        match reply {
            Some(Ok((status, deployed_url))) => Ok(DeploymentStatusResponse {
                status: DeploymentStatus::from(status),
                deployed_url,
            }),
            Some(Err(status)) => Err(ApiError {
                status,
                data: ErrorBody::Empty,
            }
            .into()),
            None => Ok(DeploymentStatusResponse {
                status: DeploymentStatus::Pending,
                deployed_url: None,
            }),
        }
    }
}

pub fn session() -> PollSession {
    PollSession::new(1i64, 42i64)
}

//! Log tail cycle tests

use std::sync::Arc;

use async_trait::async_trait;
use buildzy::errors::ConsoleError;
use buildzy::tail::entry::LogResponse;
use buildzy::tail::tailer::{CycleOutcome, LogTail, SkipReason};
use buildzy::tail::{LogSource, PollSession};
use secrecy::SecretString;
use serde_json::json;
use tokio::sync::Notify;

use crate::support::{session, ScriptedLogs, StaticCredentials};

fn entry(id: i64, message: &str) -> serde_json::Value {
    json!({"id": id, "timestamp": "2025-03-01T12:00:00Z", "message": message})
}

fn messages(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .map(|l| l.rsplit("] ").next().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn test_inactive_without_session_or_token() {
    let tail = LogTail::new(10);
    let logs = ScriptedLogs::new();

    assert_eq!(
        tail.poll_once(&logs, &StaticCredentials::signed_in()).await,
        CycleOutcome::Skipped(SkipReason::NoSession)
    );

    tail.switch_to(Some(session())).await;
    assert_eq!(
        tail.poll_once(&logs, &StaticCredentials::signed_out()).await,
        CycleOutcome::Skipped(SkipReason::NotAuthenticated)
    );
    assert_eq!(logs.calls(), 0);
}

#[tokio::test]
async fn test_entries_are_deduplicated_across_polls() {
    let tail = LogTail::new(100);
    tail.switch_to(Some(session())).await;
    let logs = ScriptedLogs::new();
    logs.reply_json(json!([entry(1, "cloning"), entry(2, "building")]))
        .reply_json(json!([entry(2, "building"), entry(3, "pushing"), entry(3, "pushing")]));
    let creds = StaticCredentials::signed_in();

    let CycleOutcome::Appended(first) = tail.poll_once(&logs, &creds).await else {
        panic!("expected lines");
    };
    assert_eq!(messages(&first), vec!["cloning", "building"]);

    let CycleOutcome::Appended(second) = tail.poll_once(&logs, &creds).await else {
        panic!("expected lines");
    };
    assert_eq!(messages(&second), vec!["pushing"]);

    let snapshot = tail.snapshot().await;
    assert_eq!(messages(&snapshot.lines), vec!["cloning", "building", "pushing"]);
    assert!(snapshot.error.is_none());
}

#[tokio::test]
async fn test_failure_keeps_lines_and_next_success_clears_error() {
    let tail = LogTail::new(100);
    tail.switch_to(Some(session())).await;
    let logs = ScriptedLogs::new();
    logs.reply_json(json!([entry(1, "cloning")]))
        .fail(503)
        .reply_json(json!([entry(2, "building")]));
    let creds = StaticCredentials::signed_in();

    tail.poll_once(&logs, &creds).await;
    let outcome = tail.poll_once(&logs, &creds).await;
    assert_eq!(outcome, CycleOutcome::Failed("log service unavailable".to_string()));

    let snapshot = tail.snapshot().await;
    assert_eq!(messages(&snapshot.lines), vec!["cloning"]);
    assert_eq!(snapshot.error.as_deref(), Some("log service unavailable"));

    tail.poll_once(&logs, &creds).await;
    let snapshot = tail.snapshot().await;
    assert_eq!(messages(&snapshot.lines), vec!["cloning", "building"]);
    assert!(snapshot.error.is_none());
}

#[tokio::test]
async fn test_diagnostic_object_replaces_buffer() {
    let tail = LogTail::new(100);
    tail.switch_to(Some(session())).await;
    let logs = ScriptedLogs::new();
    logs.reply_json(json!([entry(1, "cloning")]))
        .reply_json(json!({"error": "no pods"}));
    let creds = StaticCredentials::signed_in();

    tail.poll_once(&logs, &creds).await;
    let CycleOutcome::Replaced(document) = tail.poll_once(&logs, &creds).await else {
        panic!("expected a diagnostic");
    };
    assert!(document.contains("\"error\": \"no pods\""));
    assert_eq!(tail.snapshot().await.lines, vec![document]);
}

#[tokio::test]
async fn test_plain_text_appends_only_unseen_lines() {
    let tail = LogTail::new(100);
    tail.switch_to(Some(session())).await;
    let logs = ScriptedLogs::new();
    logs.reply_text("line1\nline2\n").reply_text("line2\nline3\n");
    let creds = StaticCredentials::signed_in();

    tail.poll_once(&logs, &creds).await;
    tail.poll_once(&logs, &creds).await;
    assert_eq!(tail.snapshot().await.lines, vec!["line1", "line2", "line3"]);
}

#[tokio::test]
async fn test_capacity_keeps_most_recent_lines() {
    let tail = LogTail::new(5);
    tail.switch_to(Some(session())).await;
    let logs = ScriptedLogs::new();
    let batch: Vec<_> = (1..=8).map(|i| entry(i, &format!("step {}", i))).collect();
    logs.reply_json(json!(batch));

    tail.poll_once(&logs, &StaticCredentials::signed_in()).await;
    let lines = tail.snapshot().await.lines;
    assert_eq!(
        messages(&lines),
        vec!["step 4", "step 5", "step 6", "step 7", "step 8"]
    );
}

#[tokio::test]
async fn test_switch_resets_history() {
    let tail = LogTail::new(100);
    tail.switch_to(Some(session())).await;
    let logs = ScriptedLogs::new();
    logs.reply_json(json!([entry(1, "cloning")]))
        .reply_json(json!([entry(1, "cloning")]));
    let creds = StaticCredentials::signed_in();

    tail.poll_once(&logs, &creds).await;
    tail.pause();
    tail.switch_to(Some(PollSession::new(1i64, 43i64))).await;
    assert!(!tail.is_paused());
    assert!(tail.snapshot().await.lines.is_empty());

    // same id, new session: shown again
    let CycleOutcome::Appended(lines) = tail.poll_once(&logs, &creds).await else {
        panic!("expected lines");
    };
    assert_eq!(messages(&lines), vec!["cloning"]);
}

#[tokio::test]
async fn test_paused_tail_does_not_fetch() {
    let tail = LogTail::new(100);
    tail.switch_to(Some(session())).await;
    let logs = ScriptedLogs::new();
    let creds = StaticCredentials::signed_in();

    tail.pause();
    assert_eq!(
        tail.poll_once(&logs, &creds).await,
        CycleOutcome::Skipped(SkipReason::Paused)
    );
    assert_eq!(logs.calls(), 0);

    tail.resume();
    tail.poll_once(&logs, &creds).await;
    assert_eq!(logs.calls(), 1);
}

/// Holds every response until released
struct GatedLogs {
    started: Notify,
    release: Notify,
}

#[async_trait]
impl LogSource for GatedLogs {
    async fn fetch_logs(
        &self,
        _session: &PollSession,
        _token: &SecretString,
    ) -> Result<LogResponse, ConsoleError> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(LogResponse::from_json(json!([entry(1, "from the old session")])))
    }
}

#[tokio::test]
async fn test_response_for_previous_session_is_discarded() {
    let tail = Arc::new(LogTail::new(100));
    tail.switch_to(Some(session())).await;
    let logs = Arc::new(GatedLogs {
        started: Notify::new(),
        release: Notify::new(),
    });

    let in_flight = {
        let tail = tail.clone();
        let logs = logs.clone();
        tokio::spawn(async move {
            tail.poll_once(logs.as_ref(), &StaticCredentials::signed_in())
                .await
        })
    };

    logs.started.notified().await;
    tail.switch_to(Some(PollSession::new(2i64, 7i64))).await;
    logs.release.notify_one();

    assert_eq!(in_flight.await.unwrap(), CycleOutcome::Stale);
    assert!(tail.snapshot().await.lines.is_empty());
}

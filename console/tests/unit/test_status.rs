//! Deployment status latch tests

use buildzy::tail::status::{StatusOutcome, StatusTracker};
use buildzy::tail::tailer::{LogTail, SkipReason};
use buildzy_api::models::DeploymentStatus;
use url::Url;

use crate::support::{session, ScriptedStatus, StaticCredentials};

#[tokio::test]
async fn test_success_latches_and_pauses_tail() {
    let tracker = StatusTracker::new();
    let tail = LogTail::new(100);
    tracker.switch_to(Some(session())).await;
    tail.switch_to(Some(session())).await;

    let status = ScriptedStatus::new();
    status
        .reply("PENDING", None)
        .reply("DEPLOYING", None)
        .reply("SUCCESS", Some("my-app.wareality.tech"));
    let creds = StaticCredentials::signed_in();

    assert_eq!(
        tracker.poll_once(&status, &creds, &tail).await,
        StatusOutcome::Updated(DeploymentStatus::Pending)
    );
    assert_eq!(
        tracker.poll_once(&status, &creds, &tail).await,
        StatusOutcome::Updated(DeploymentStatus::Deploying)
    );
    assert!(!tail.is_paused());

    let expected = Url::parse("https://my-app.wareality.tech").unwrap();
    assert_eq!(
        tracker.poll_once(&status, &creds, &tail).await,
        StatusOutcome::Latched(Some(expected.clone()))
    );
    assert!(tail.is_paused());

    let view = tracker.view().await;
    assert!(view.succeeded);
    assert_eq!(view.status, Some(DeploymentStatus::Success));
    assert_eq!(view.deployed_url, Some(expected));

    // latched: no more fetches
    assert_eq!(tracker.poll_once(&status, &creds, &tail).await, StatusOutcome::Finished);
    assert_eq!(status.calls(), 3);
}

#[tokio::test]
async fn test_completed_also_latches_but_running_does_not() {
    let tracker = StatusTracker::new();
    let tail = LogTail::new(100);
    tracker.switch_to(Some(session())).await;

    let status = ScriptedStatus::new();
    status.reply("RUNNING", None).reply("COMPLETED", None);
    let creds = StaticCredentials::signed_in();

    tracker.poll_once(&status, &creds, &tail).await;
    assert!(!tracker.is_latched().await);

    assert_eq!(
        tracker.poll_once(&status, &creds, &tail).await,
        StatusOutcome::Latched(None)
    );
    assert!(tracker.is_latched().await);
}

#[tokio::test]
async fn test_failed_fetch_keeps_last_status() {
    let tracker = StatusTracker::new();
    let tail = LogTail::new(100);
    tracker.switch_to(Some(session())).await;

    let status = ScriptedStatus::new();
    status.reply("DEPLOYING", None).fail(500).reply("DEPLOYING", None);
    let creds = StaticCredentials::signed_in();

    tracker.poll_once(&status, &creds, &tail).await;
    let outcome = tracker.poll_once(&status, &creds, &tail).await;
    assert!(matches!(outcome, StatusOutcome::Failed(_)));
    assert_eq!(tracker.view().await.status, Some(DeploymentStatus::Deploying));
}

#[tokio::test]
async fn test_switch_clears_latch() {
    let tracker = StatusTracker::new();
    let tail = LogTail::new(100);
    tracker.switch_to(Some(session())).await;

    let status = ScriptedStatus::new();
    status.reply("SUCCESS", None);
    let creds = StaticCredentials::signed_in();

    tracker.poll_once(&status, &creds, &tail).await;
    assert!(tracker.is_latched().await);

    tracker.switch_to(None).await;
    assert!(!tracker.is_latched().await);
    assert_eq!(tracker.view().await.status, None);
    assert_eq!(
        tracker.poll_once(&status, &creds, &tail).await,
        StatusOutcome::Skipped(SkipReason::NoSession)
    );
}

#[tokio::test]
async fn test_unknown_status_is_shown_verbatim() {
    let tracker = StatusTracker::new();
    let tail = LogTail::new(100);
    tracker.switch_to(Some(session())).await;

    let status = ScriptedStatus::new();
    status.reply("QUEUED", None);

    let outcome = tracker
        .poll_once(&status, &StaticCredentials::signed_in(), &tail)
        .await;
    assert_eq!(
        outcome,
        StatusOutcome::Updated(DeploymentStatus::Other("QUEUED".to_string()))
    );
}

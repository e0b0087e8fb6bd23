// tests/snapshot_policy.rs

use std::path::PathBuf;
use std::time::Duration;

use labpilot::config::AiSection;
use labpilot::errors::LabpilotError;
use labpilot::retry::RetryPolicy;
use labpilot::types::{NOT_A_GIT_REPO, UNKNOWN};
use labpilot::vcs::{AiCommitMessenger, SnapshotPolicy, Snapshotter};
use labpilot_test_utils::fakes::{FakeRepoState, FakeVcs};
use labpilot_test_utils::init_tracing;
use labpilot_test_utils::mock_http::{HangupServer, MockHttpServer, MockResponse};
use regex::Regex;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn policy(require_clean: bool, auto_snapshot: bool) -> SnapshotPolicy {
    SnapshotPolicy {
        require_clean,
        auto_snapshot,
    }
}

#[tokio::test]
async fn outside_a_repository_returns_sentinel_and_touches_nothing() -> TestResult {
    init_tracing();
    let vcs = FakeVcs::not_a_repo();
    let snap = Snapshotter::new(vcs.clone(), policy(true, true));

    assert_eq!(snap.ensure_snapshot(&[], None).await?, NOT_A_GIT_REPO);
    assert_eq!(snap.commit_body().await, NOT_A_GIT_REPO);
    assert_eq!(snap.git_info().await.commit_hash, NOT_A_GIT_REPO);
    assert!(vcs.state().staged.is_empty());
    assert!(vcs.state().commits.is_empty());
    Ok(())
}

#[tokio::test]
async fn clean_tree_returns_head_without_committing() -> TestResult {
    let vcs = FakeVcs::clean();
    let head = vcs.state().head;
    let snap = Snapshotter::new(vcs.clone(), SnapshotPolicy::default());

    assert_eq!(snap.ensure_snapshot(&[], None).await?, head);
    assert!(vcs.state().commits.is_empty());
    Ok(())
}

#[tokio::test]
async fn dirty_tree_with_require_clean_is_a_policy_violation() {
    let vcs = FakeVcs::dirty();
    let snap = Snapshotter::new(vcs.clone(), policy(true, true));

    let err = snap.ensure_snapshot(&[], None).await.unwrap_err();
    assert!(matches!(err, LabpilotError::PolicyViolation(_)), "got {err:?}");
    assert!(vcs.state().staged.is_empty());
    assert!(vcs.state().commits.is_empty());
}

#[tokio::test]
async fn dirty_tree_is_committed_with_explicit_message() -> TestResult {
    let vcs = FakeVcs::dirty();
    let before = vcs.state().head;
    let snap = Snapshotter::new(vcs.clone(), SnapshotPolicy::default());
    let targets = vec![PathBuf::from("train.py")];

    let hash = snap.ensure_snapshot(&targets, Some("try cosine lr")).await?;

    let state = vcs.state();
    assert_ne!(hash, before);
    assert_eq!(hash, state.head);
    assert_eq!(state.commits, vec!["try cosine lr".to_string()]);
    assert_eq!(state.staged, vec![targets]);
    assert_eq!(snap.commit_body().await, "try cosine lr");
    Ok(())
}

#[tokio::test]
async fn without_ai_the_timestamped_label_is_used() -> TestResult {
    let vcs = FakeVcs::dirty();
    let snap = Snapshotter::new(vcs.clone(), SnapshotPolicy::default());

    snap.ensure_snapshot(&[], None).await?;

    let state = vcs.state();
    let label = Regex::new(
        r"^Auto-snapshot before experiment run \[labpilot-\d{8}-\d{6}\]$",
    )?;
    assert_eq!(state.commits.len(), 1);
    assert!(label.is_match(&state.commits[0]), "got {:?}", state.commits[0]);
    // Whole tree staged when no target is given.
    assert_eq!(state.staged, vec![Vec::<PathBuf>::new()]);
    Ok(())
}

#[tokio::test]
async fn commit_failure_returns_previous_identity() -> TestResult {
    let vcs = FakeVcs::new(FakeRepoState {
        dirty: true,
        fail_commit: true,
        ..FakeRepoState::default()
    });
    let before = vcs.state().head;
    let snap = Snapshotter::new(vcs.clone(), SnapshotPolicy::default());

    assert_eq!(snap.ensure_snapshot(&[], Some("msg")).await?, before);
    Ok(())
}

#[tokio::test]
async fn dirty_tree_without_auto_snapshot_runs_on_head() -> TestResult {
    let vcs = FakeVcs::dirty();
    let head = vcs.state().head;
    let snap = Snapshotter::new(vcs.clone(), policy(false, false));

    assert_eq!(snap.ensure_snapshot(&[], None).await?, head);
    assert!(vcs.state().commits.is_empty());
    Ok(())
}

#[tokio::test]
async fn head_query_failure_reports_unknown() -> TestResult {
    let vcs = FakeVcs::new(FakeRepoState {
        fail_head: true,
        ..FakeRepoState::default()
    });
    let snap = Snapshotter::new(vcs, SnapshotPolicy::default());

    assert_eq!(snap.ensure_snapshot(&[], None).await?, UNKNOWN);
    assert_eq!(snap.git_info().await.commit_hash, UNKNOWN);
    Ok(())
}

fn ai_section(base_url: &str) -> AiSection {
    AiSection {
        api_key: Some("test-key".to_string()),
        base_url: base_url.to_string(),
        timeout: 5,
        ..AiSection::default()
    }
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(10))
}

#[tokio::test]
async fn ai_message_is_used_for_the_snapshot() -> TestResult {
    init_tracing();
    let server = MockHttpServer::start(MockResponse::json(
        200,
        r#"{"choices":[{"message":{"content":"  Tune learning rate\n\nLower lr to 0.01  "}}]}"#,
    ))
    .await?;
    let ai = AiCommitMessenger::from_config(reqwest::Client::new(), &ai_section(server.url()))
        .expect("api key configured")
        .with_retry_policy(fast_retry());
    let vcs = FakeVcs::dirty();
    let snap = Snapshotter::new(vcs.clone(), SnapshotPolicy::default()).with_ai(Some(ai));

    snap.ensure_snapshot(&[PathBuf::from("train.py")], None).await?;

    assert_eq!(
        vcs.state().commits,
        vec!["Tune learning rate\n\nLower lr to 0.01".to_string()]
    );
    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "/chat/completions");
    assert_eq!(requests[0].header("authorization"), Some("Bearer test-key"));
    assert!(requests[0].body.contains("lr = 0.01"));

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn ai_rate_limit_is_retried_then_succeeds() -> TestResult {
    init_tracing();
    let server = MockHttpServer::start(MockResponse::json(
        200,
        r#"{"choices":[{"message":{"content":"Second try"}}]}"#,
    ))
    .await?;
    server.enqueue(MockResponse::json(429, r#"{"error":"slow down"}"#));
    let ai = AiCommitMessenger::from_config(reqwest::Client::new(), &ai_section(server.url()))
        .expect("api key configured")
        .with_retry_policy(fast_retry());

    assert_eq!(ai.generate("diff --git a b").await.as_deref(), Some("Second try"));
    assert_eq!(server.requests().len(), 2);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn ai_rate_limit_exhaustion_falls_back_after_three_attempts() -> TestResult {
    init_tracing();
    let server = MockHttpServer::start(MockResponse::json(429, "{}")).await?;
    let ai = AiCommitMessenger::from_config(reqwest::Client::new(), &ai_section(server.url()))
        .expect("api key configured")
        .with_retry_policy(fast_retry());
    let vcs = FakeVcs::dirty();
    let snap = Snapshotter::new(vcs.clone(), SnapshotPolicy::default()).with_ai(Some(ai));

    snap.ensure_snapshot(&[], None).await?;

    assert_eq!(server.requests().len(), 3);
    assert!(vcs.state().commits[0].starts_with("Auto-snapshot before experiment run [labpilot-"));

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn ai_other_errors_short_circuit_to_fallback() -> TestResult {
    init_tracing();
    let server = MockHttpServer::start(MockResponse::json(401, r#"{"error":"bad key"}"#)).await?;
    let ai = AiCommitMessenger::from_config(reqwest::Client::new(), &ai_section(server.url()))
        .expect("api key configured")
        .with_retry_policy(fast_retry());

    assert_eq!(ai.generate("diff").await, None);
    assert_eq!(server.requests().len(), 1);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn ai_dropped_connection_is_retried_until_exhausted() -> TestResult {
    init_tracing();
    let server = HangupServer::start().await?;
    let ai = AiCommitMessenger::from_config(reqwest::Client::new(), &ai_section(server.url()))
        .expect("api key configured")
        .with_retry_policy(fast_retry());
    let vcs = FakeVcs::dirty();
    let snap = Snapshotter::new(vcs.clone(), SnapshotPolicy::default()).with_ai(Some(ai));

    snap.ensure_snapshot(&[], None).await?;

    assert_eq!(server.accepted(), 3);
    assert!(vcs.state().commits[0].starts_with("Auto-snapshot before experiment run [labpilot-"));

    server.shutdown();
    Ok(())
}

#[test]
fn ai_is_disabled_without_key() {
    let section = AiSection::default();
    assert!(AiCommitMessenger::from_config(reqwest::Client::new(), &section).is_none());
}

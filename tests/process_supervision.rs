// tests/process_supervision.rs
//
// Real child processes through `ProcessExecutor`; Unix shells only.
#![cfg(unix)]

use std::time::{Duration, Instant};

use labpilot::exec::{CommandExecutor, ExecRequest, ProcessExecutor, Termination};
use labpilot_test_utils::{init_tracing, with_timeout_secs};

fn sh(script: &str, timeout: Option<Duration>) -> ExecRequest {
    ExecRequest::new(
        vec!["sh".to_string(), "-c".to_string(), script.to_string()],
        timeout,
    )
    .quiet()
}

#[tokio::test]
async fn captures_both_streams_and_exit_code() {
    init_tracing();
    let outcome = with_timeout_secs(10, ProcessExecutor::new().execute(&sh(
        "echo epoch 1; echo warn >&2; echo saved model to out/final.pt; exit 0",
        None,
    )))
    .await;

    assert_eq!(outcome.termination, Termination::Completed);
    assert_eq!(outcome.exit_code, 0);
    assert!(outcome.output.contains("epoch 1\n"));
    assert!(outcome.output.contains("warn\n"));
    assert!(outcome.output.contains("saved model to out/final.pt\n"));
}

#[tokio::test]
async fn nonzero_exit_code_is_reported() {
    let outcome = with_timeout_secs(10, ProcessExecutor::new().execute(&sh("exit 3", None))).await;
    assert_eq!(outcome.termination, Termination::Completed);
    assert_eq!(outcome.exit_code, 3);
    assert_eq!(outcome.output, "");
}

#[tokio::test]
async fn deadline_kills_a_silent_child() {
    init_tracing();
    let started = Instant::now();
    let outcome = with_timeout_secs(
        10,
        ProcessExecutor::new().execute(&sh("sleep 30", Some(Duration::from_millis(300)))),
    )
    .await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(outcome.termination, Termination::TimedOut);
    assert_eq!(outcome.exit_code, 124);
    assert!(outcome
        .output
        .ends_with("Experiment timed out after 0s and was killed\n"));
}

#[tokio::test]
async fn deadline_keeps_output_printed_before_the_kill() {
    let outcome = with_timeout_secs(
        10,
        ProcessExecutor::new().execute(&sh(
            "echo step 1; sleep 30",
            Some(Duration::from_secs(1)),
        )),
    )
    .await;

    assert_eq!(outcome.termination, Termination::TimedOut);
    assert!(outcome.output.starts_with("step 1\n"));
    assert!(outcome
        .output
        .ends_with("\n\nExperiment timed out after 1s and was killed\n"));
}

#[tokio::test]
async fn missing_program_is_a_launch_failure() {
    init_tracing();
    let request = ExecRequest::new(vec!["labpilot-no-such-program".to_string()], None).quiet();
    let outcome = ProcessExecutor::new().execute(&request).await;

    assert_eq!(outcome.termination, Termination::LaunchFailed);
    assert_eq!(outcome.exit_code, 1);
    assert!(outcome.output.contains("labpilot-no-such-program"));
}

#[tokio::test]
async fn killed_by_signal_maps_to_128_plus_signal() {
    let outcome = with_timeout_secs(10, ProcessExecutor::new().execute(&sh("kill -9 $$", None))).await;
    assert_eq!(outcome.termination, Termination::Completed);
    assert_eq!(outcome.exit_code, 128 + 9);
}

#[tokio::test]
async fn invalid_utf8_and_missing_final_newline_survive() {
    let outcome = with_timeout_secs(
        10,
        ProcessExecutor::new().execute(&sh(r"printf 'loss \377\nlast'", None)),
    )
    .await;

    assert_eq!(outcome.exit_code, 0);
    assert_eq!(outcome.output, "loss \u{fffd}\nlast");
}

#[tokio::test]
async fn arguments_are_not_shell_interpreted() {
    let request = ExecRequest::new(
        vec!["echo".to_string(), "$HOME".to_string(), "a;b".to_string()],
        None,
    )
    .quiet();
    let outcome = with_timeout_secs(10, ProcessExecutor::new().execute(&request)).await;
    assert_eq!(outcome.output, "$HOME a;b\n");
}

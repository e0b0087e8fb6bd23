use std::sync::{Arc, Mutex};

use labpilot::exec::{CommandExecutor, ExecOutcome, ExecRequest, Termination};
use labpilot::types::{BoxFuture, LAUNCH_FAILURE_EXIT_CODE, TIMEOUT_EXIT_CODE};

/// A fake executor that:
/// - records every request it was asked to run
/// - immediately returns a scripted outcome without spawning anything.
#[derive(Clone)]
pub struct FakeExecutor {
    outcome: ExecOutcome,
    executed: Arc<Mutex<Vec<ExecRequest>>>,
}

impl FakeExecutor {
    pub fn new(outcome: ExecOutcome) -> Self {
        Self {
            outcome,
            executed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The child "exits" with `exit_code` after printing `output`.
    pub fn completing(exit_code: i32, output: &str) -> Self {
        Self::new(ExecOutcome {
            exit_code,
            output: output.to_string(),
            termination: Termination::Completed,
        })
    }

    pub fn timing_out(output: &str) -> Self {
        Self::new(ExecOutcome {
            exit_code: TIMEOUT_EXIT_CODE,
            output: output.to_string(),
            termination: Termination::TimedOut,
        })
    }

    pub fn launch_failure(error: &str) -> Self {
        Self::new(ExecOutcome {
            exit_code: LAUNCH_FAILURE_EXIT_CODE,
            output: error.to_string(),
            termination: Termination::LaunchFailed,
        })
    }

    pub fn executed(&self) -> Vec<ExecRequest> {
        self.executed.lock().unwrap().clone()
    }
}

impl CommandExecutor for FakeExecutor {
    fn execute<'a>(&'a self, request: &'a ExecRequest) -> BoxFuture<'a, ExecOutcome> {
        Box::pin(async move {
            self.executed.lock().unwrap().push(request.clone());
            self.outcome.clone()
        })
    }
}

// src/exec/backend.rs

//! Production executor backend.

use tracing::info;

use crate::exec::{child, CommandExecutor, ExecOutcome, ExecRequest};
use crate::types::BoxFuture;

/// Spawns the command as a real OS process via `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

impl ProcessExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for ProcessExecutor {
    fn execute<'a>(&'a self, request: &'a ExecRequest) -> BoxFuture<'a, ExecOutcome> {
        Box::pin(async move {
            let outcome = child::supervise(request).await;
            info!(
                exit_code = outcome.exit_code,
                termination = ?outcome.termination,
                captured_bytes = outcome.output.len(),
                "child process finished"
            );
            outcome
        })
    }
}

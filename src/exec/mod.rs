// src/exec/mod.rs

//! Process execution layer of the run supervisor.
//!
//! The engine talks to a [`CommandExecutor`] instead of spawning processes
//! itself, so tests can substitute a scripted executor.
//!
//! - [`backend`] holds [`ProcessExecutor`], the production implementation.
//! - [`child`] owns the supervision loop: output draining, echo, timeout and
//!   forced kill.
//! - [`capture`] is the in-memory buffer the output is collected into.

pub mod backend;
pub mod capture;
pub mod child;

use std::time::Duration;

pub use backend::ProcessExecutor;
pub use capture::{CaptureBuffer, OutputLine, OutputStream};

use crate::types::BoxFuture;

/// What to run and under which limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
    /// Argument vector; `argv[0]` is the program. Not shell interpreted.
    pub argv: Vec<String>,
    /// Wall-clock limit. `None` means unbounded.
    pub timeout: Option<Duration>,
    /// Mirror the child's output to our own stdout / stderr.
    pub echo: bool,
}

impl ExecRequest {
    pub fn new(argv: Vec<String>, timeout: Option<Duration>) -> Self {
        Self {
            argv,
            timeout,
            echo: true,
        }
    }

    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }
}

/// How the child left the `Running` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The child exited on its own (or was killed by an outside signal).
    Completed,
    /// The wall-clock limit expired and the child was force-killed.
    TimedOut,
    /// The child could not be spawned at all.
    LaunchFailed,
}

/// Result of one supervised execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutcome {
    pub exit_code: i32,
    /// Everything the child printed, in arrival order, plus any notice we
    /// appended (timeout) or the spawn error text for launch failures.
    pub output: String,
    pub termination: Termination,
}

/// Runs one command to completion.
///
/// Implementations never fail: every problem is folded into the returned
/// [`ExecOutcome`].
pub trait CommandExecutor: Send + Sync {
    fn execute<'a>(&'a self, request: &'a ExecRequest) -> BoxFuture<'a, ExecOutcome>;
}

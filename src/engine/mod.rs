// src/engine/mod.rs

//! Run supervisor for labpilot.
//!
//! This module ties together one invocation of `labrun`:
//! - the VCS snapshot that pins the code being run
//! - the record store (one insert, one terminal update)
//! - the executor that runs and watches the child process
//! - lifecycle notifications
//!
//! The pure terminal-state derivation lives in [`core`]; the async shell that
//! sequences the collaborators is implemented in [`runtime`]. Metadata
//! heuristics (params, log snippet, checkpoint path) live in [`extract`].

use std::fmt;

use crate::exec::Termination;

/// Phases of a single run, in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Snapshot taken, record not yet inserted.
    Pending,
    /// Record inserted as `running`, child launched.
    Running,
    Completed,
    TimedOut,
    LaunchFailed,
    /// Terminal update written (or attempted).
    Recorded,
}

impl RunPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            RunPhase::Pending => "pending",
            RunPhase::Running => "running",
            RunPhase::Completed => "completed",
            RunPhase::TimedOut => "timed_out",
            RunPhase::LaunchFailed => "launch_failed",
            RunPhase::Recorded => "recorded",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Termination> for RunPhase {
    fn from(termination: Termination) -> Self {
        match termination {
            Termination::Completed => RunPhase::Completed,
            Termination::TimedOut => RunPhase::TimedOut,
            Termination::LaunchFailed => RunPhase::LaunchFailed,
        }
    }
}

pub mod core;
pub mod extract;
pub mod runtime;

pub use self::core::terminal_update;
pub use extract::{extract_ckpt_path, extract_params, log_snippet, script_target};
pub use runtime::{RunReport, RunRequest, Supervisor};

// src/engine/core.rs

//! Pure terminal-state derivation.
//!
//! Given what the executor reported, compute the fields of the single
//! terminal update. No IO, no clocks: the caller passes in the elapsed time
//! and the end timestamp, which keeps this unit testable.

use std::time::Duration;

use crate::engine::extract::{extract_ckpt_path, log_snippet};
use crate::exec::ExecOutcome;
use crate::store::TerminalUpdate;
use crate::types::RunStatus;

pub fn terminal_update(
    outcome: &ExecOutcome,
    elapsed: Duration,
    end_time: String,
    max_log_lines: usize,
) -> TerminalUpdate {
    TerminalUpdate {
        end_time,
        duration: elapsed.as_secs_f64(),
        status: RunStatus::from_exit_code(outcome.exit_code),
        log_snippet: log_snippet(&outcome.output, max_log_lines),
        exit_code: outcome.exit_code,
        ckpt_path: extract_ckpt_path(&outcome.output),
    }
}

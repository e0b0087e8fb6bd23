// src/engine/runtime.rs

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::clock;
use crate::engine::core::terminal_update;
use crate::engine::extract::{extract_params, script_target};
use crate::engine::RunPhase;
use crate::errors::Result;
use crate::exec::{CommandExecutor, ExecRequest, Termination};
use crate::notify::{Notifier, RunSummary};
use crate::store::{NewRun, RecordStore, TerminalUpdate};
use crate::types::RunStatus;
use crate::vcs::{Snapshotter, VcsProvider};

/// Everything one invocation needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// The literal command; `argv[0]` is the program.
    pub argv: Vec<String>,
    /// `None` means unbounded.
    pub timeout: Option<Duration>,
    /// Explicit message for the auto-snapshot commit.
    pub commit_message: Option<String>,
    pub server: String,
    pub max_log_lines: usize,
    /// Directory relative to which `.py` targets are looked up.
    pub workdir: PathBuf,
    pub echo: bool,
}

/// What happened, for the caller to turn into an exit code.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub record_id: i64,
    pub commit_hash: String,
    pub termination: Termination,
    pub update: TerminalUpdate,
    /// `false` if the terminal update could not be written.
    pub recorded: bool,
}

impl RunReport {
    /// Exit code of the child (124 on timeout, 1 on launch failure).
    pub fn exit_code(&self) -> i32 {
        self.update.exit_code
    }

    pub fn status(&self) -> RunStatus {
        self.update.status
    }
}

/// Sequences one run: snapshot, insert, notify, execute, update, notify.
///
/// Collaborators are borrowed; they are built once in `lib.rs` (or by a
/// test) and handed in, so any of them can be a fake.
pub struct Supervisor<'a, V: VcsProvider, E: CommandExecutor> {
    store: &'a dyn RecordStore,
    snapshotter: &'a Snapshotter<V>,
    notifier: &'a Notifier,
    executor: &'a E,
}

impl<V: VcsProvider, E: CommandExecutor> fmt::Debug for Supervisor<'_, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("notifier", &self.notifier.sink_name())
            .finish_non_exhaustive()
    }
}

impl<'a, V: VcsProvider, E: CommandExecutor> Supervisor<'a, V, E> {
    pub fn new(
        store: &'a dyn RecordStore,
        snapshotter: &'a Snapshotter<V>,
        notifier: &'a Notifier,
        executor: &'a E,
    ) -> Self {
        Self {
            store,
            snapshotter,
            notifier,
            executor,
        }
    }

    /// Drive one run to its terminal record.
    ///
    /// Errors only before the child is launched: a `PolicyViolation` from the
    /// snapshot step or a store failure at insert. Everything after that is
    /// recovered and reflected in the returned report.
    pub async fn run(&self, request: &RunRequest) -> Result<RunReport> {
        let command = request.argv.join(" ");
        info!(phase = %RunPhase::Pending, command = %command, "preparing run");

        let targets: Vec<PathBuf> = script_target(&request.argv, &request.workdir)
            .into_iter()
            .collect();
        let commit_hash = self
            .snapshotter
            .ensure_snapshot(&targets, request.commit_message.as_deref())
            .await?;
        let commit_message = self.snapshotter.commit_body().await;

        let new_run = NewRun {
            start_time: clock::now_timestamp(),
            server: request.server.clone(),
            command: command.clone(),
            commit_hash: commit_hash.clone(),
            commit_message,
            params: extract_params(&request.argv),
            status: RunStatus::Running,
        };
        let record_id = self.store.insert(&new_run).inspect_err(|e| {
            error!(error = %e, "could not record run start; command not launched");
        })?;
        info!(phase = %RunPhase::Running, record_id, commit = %commit_hash, "run recorded");

        let summary = RunSummary {
            server: request.server.clone(),
            command,
            commit_hash: commit_hash.clone(),
        };
        self.notifier.start(&summary).await;

        let exec_request = ExecRequest {
            argv: request.argv.clone(),
            timeout: request.timeout,
            echo: request.echo,
        };
        let started = Instant::now();
        let outcome = self.executor.execute(&exec_request).await;
        let elapsed = started.elapsed();
        info!(
            phase = %RunPhase::from(outcome.termination),
            record_id,
            exit_code = outcome.exit_code,
            "child finished"
        );

        let update = terminal_update(
            &outcome,
            elapsed,
            clock::now_timestamp(),
            request.max_log_lines,
        );
        let recorded = match self.store.update(record_id, &update) {
            Ok(()) => {
                info!(phase = %RunPhase::Recorded, record_id, status = %update.status, "run finished");
                true
            }
            Err(e) => {
                error!(record_id, error = %e, "could not record terminal state");
                false
            }
        };

        let delivered = match update.status {
            RunStatus::Success => {
                self.notifier
                    .success(&summary, elapsed, &update.ckpt_path, &update.log_snippet)
                    .await
            }
            _ => {
                self.notifier
                    .failure(&summary, update.exit_code, elapsed, &update.log_snippet)
                    .await
            }
        };
        if !delivered {
            warn!(record_id, "terminal notification was not delivered");
        }

        Ok(RunReport {
            record_id,
            commit_hash,
            termination: outcome.termination,
            update,
            recorded,
        })
    }
}

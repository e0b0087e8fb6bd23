//! Version-control snapshotting.
//!
//! - [`git`] talks to the `git` CLI ([`GitCli`]).
//! - [`message`] produces snapshot commit messages (AI summary or a
//!   timestamped label).
//! - [`snapshot`] applies the clean-tree / auto-snapshot policy and reports
//!   the commit identity recorded with each run.
//!
//! The snapshotter only talks to a [`VcsProvider`], so tests can substitute a
//! fake repository.

pub mod git;
pub mod message;
pub mod snapshot;

pub use git::GitCli;
pub use message::{AiCommitMessenger, fallback_message};
pub use snapshot::{GitInfo, SnapshotPolicy, Snapshotter};

use std::path::PathBuf;

use anyhow::Result;

use crate::types::BoxFuture;

/// Repository operations needed to snapshot a run.
pub trait VcsProvider: Send + Sync {
    /// Whether the working directory is inside a repository.
    fn is_repo(&self) -> BoxFuture<'_, bool>;

    /// Full hash of `HEAD`.
    fn head_commit(&self) -> BoxFuture<'_, Result<String>>;

    /// Subject line of the `HEAD` commit message.
    fn head_subject(&self) -> BoxFuture<'_, Result<String>>;

    /// Full `HEAD` commit message (subject and body).
    fn head_message(&self) -> BoxFuture<'_, Result<String>>;

    /// True when there are staged, unstaged or untracked changes.
    fn is_dirty(&self) -> BoxFuture<'_, Result<bool>>;

    /// Staged diff followed by the working-tree diff.
    fn diff(&self) -> BoxFuture<'_, Result<String>>;

    /// Stage `paths`, or the whole tree when `paths` is empty.
    fn stage<'a>(&'a self, paths: &'a [PathBuf]) -> BoxFuture<'a, Result<()>>;

    fn commit<'a>(&'a self, message: &'a str) -> BoxFuture<'a, Result<()>>;
}

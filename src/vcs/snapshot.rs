//! Clean-tree policy and auto-snapshot commits.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::clock;
use crate::config::GitSection;
use crate::errors::{LabpilotError, Result};
use crate::types::{NOT_A_GIT_REPO, UNKNOWN};
use crate::vcs::message::{fallback_message, AiCommitMessenger};
use crate::vcs::VcsProvider;

/// The `git.*` switches that govern a dirty tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotPolicy {
    pub require_clean: bool,
    pub auto_snapshot: bool,
}

impl Default for SnapshotPolicy {
    fn default() -> Self {
        Self {
            require_clean: false,
            auto_snapshot: true,
        }
    }
}

impl From<&GitSection> for SnapshotPolicy {
    fn from(git: &GitSection) -> Self {
        Self {
            require_clean: git.require_clean,
            auto_snapshot: git.auto_snapshot,
        }
    }
}

/// Commit identity recorded with a run.
///
/// Outside a repository both fields are `"not-a-git-repo"`; a failed query
/// inside a repository yields `"unknown"` for that field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitInfo {
    pub commit_hash: String,
    pub commit_message: String,
}

impl GitInfo {
    pub fn not_a_repo() -> Self {
        Self {
            commit_hash: NOT_A_GIT_REPO.to_string(),
            commit_message: NOT_A_GIT_REPO.to_string(),
        }
    }
}

pub struct Snapshotter<V> {
    vcs: V,
    policy: SnapshotPolicy,
    ai: Option<AiCommitMessenger>,
}

impl<V: VcsProvider> Snapshotter<V> {
    pub fn new(vcs: V, policy: SnapshotPolicy) -> Self {
        Self {
            vcs,
            policy,
            ai: None,
        }
    }

    pub fn with_ai(mut self, ai: Option<AiCommitMessenger>) -> Self {
        self.ai = ai;
        self
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    /// Make sure the code about to run is captured by a commit and return
    /// that commit's identity.
    ///
    /// - not a repository: `"not-a-git-repo"`, nothing else happens
    /// - dirty and `require_clean`: `PolicyViolation`
    /// - dirty and `auto_snapshot`: stage `targets` (or everything) and commit
    /// - otherwise: current `HEAD`
    ///
    /// Failing to commit is not an error; the pre-attempt `HEAD` is returned.
    pub async fn ensure_snapshot(
        &self,
        targets: &[PathBuf],
        explicit_message: Option<&str>,
    ) -> Result<String> {
        if !self.vcs.is_repo().await {
            debug!("not inside a git repository; skipping snapshot");
            return Ok(NOT_A_GIT_REPO.to_string());
        }

        let dirty = match self.vcs.is_dirty().await {
            Ok(dirty) => dirty,
            Err(e) => {
                warn!(error = %e, "could not determine working tree status; assuming clean");
                false
            }
        };

        if dirty && self.policy.require_clean {
            return Err(LabpilotError::PolicyViolation(
                "git repository has uncommitted changes and git.require_clean is true"
                    .to_string(),
            ));
        }

        if !dirty {
            return Ok(self.current_hash().await);
        }

        if !self.policy.auto_snapshot {
            warn!("working tree is dirty and git.auto_snapshot is false; running on current HEAD");
            return Ok(self.current_hash().await);
        }

        Ok(self.auto_commit(targets, explicit_message).await)
    }

    async fn auto_commit(&self, targets: &[PathBuf], explicit_message: Option<&str>) -> String {
        let before = self.current_hash().await;

        let message = match explicit_message {
            Some(message) => message.to_string(),
            None => self.generated_message(targets).await,
        };

        if let Err(e) = self.vcs.stage(targets).await {
            warn!(error = %e, "staging snapshot files failed; keeping current commit");
            return before;
        }

        match self.vcs.commit(&message).await {
            Ok(()) => {
                let after = self.current_hash().await;
                info!(commit = %after, ?targets, "created auto-snapshot commit");
                after
            }
            Err(e) => {
                warn!(error = %e, "auto-snapshot commit failed; keeping current commit");
                before
            }
        }
    }

    /// AI summary of the staged targets, falling back to the timestamp label.
    async fn generated_message(&self, targets: &[PathBuf]) -> String {
        if let Some(ai) = &self.ai {
            // Stage first so the diff covers new files as well.
            if let Err(e) = self.vcs.stage(targets).await {
                debug!(error = %e, "pre-staging for diff failed");
            }
            match self.vcs.diff().await {
                Ok(diff) => {
                    if let Some(message) = ai.generate(&diff).await {
                        return message;
                    }
                }
                Err(e) => warn!(error = %e, "could not read diff for AI commit message"),
            }
        }
        fallback_message(&clock::label_stamp())
    }

    async fn current_hash(&self) -> String {
        self.vcs
            .head_commit()
            .await
            .unwrap_or_else(|_| UNKNOWN.to_string())
    }

    /// `(commit_hash, subject)` of `HEAD`.
    pub async fn git_info(&self) -> GitInfo {
        if !self.vcs.is_repo().await {
            return GitInfo::not_a_repo();
        }
        GitInfo {
            commit_hash: self.current_hash().await,
            commit_message: self
                .vcs
                .head_subject()
                .await
                .unwrap_or_else(|_| UNKNOWN.to_string()),
        }
    }

    /// Full `HEAD` message, with the same sentinels as [`Self::git_info`].
    pub async fn commit_body(&self) -> String {
        if !self.vcs.is_repo().await {
            return NOT_A_GIT_REPO.to_string();
        }
        self.vcs
            .head_message()
            .await
            .unwrap_or_else(|_| UNKNOWN.to_string())
    }
}

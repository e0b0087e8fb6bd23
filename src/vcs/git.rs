//! [`VcsProvider`] backed by the `git` command line.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::process::Command;
use tracing::debug;

use crate::types::BoxFuture;
use crate::vcs::VcsProvider;

/// Runs `git` in a fixed working directory.
#[derive(Debug, Clone)]
pub struct GitCli {
    workdir: PathBuf,
}

impl GitCli {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// Git in the current working directory.
    pub fn current_dir() -> Result<Self> {
        let dir = std::env::current_dir().context("resolving current directory")?;
        Ok(Self::new(dir))
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Run `git <args>` and return stdout; non-zero exit is an error that
    /// carries stderr.
    async fn run(&self, args: &[&str]) -> Result<String> {
        debug!(?args, workdir = %self.workdir.display(), "running git");

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("spawning git {}", args.join(" ")))?;

        if !output.status.success() {
            bail!(
                "git {} failed ({}): {}",
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl VcsProvider for GitCli {
    fn is_repo(&self) -> BoxFuture<'_, bool> {
        Box::pin(async move { self.run(&["rev-parse", "--git-dir"]).await.is_ok() })
    }

    fn head_commit(&self) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            let out = self.run(&["rev-parse", "HEAD"]).await?;
            Ok(out.trim().to_string())
        })
    }

    fn head_subject(&self) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            let out = self.run(&["log", "-1", "--pretty=%s"]).await?;
            Ok(out.trim().to_string())
        })
    }

    fn head_message(&self) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            let out = self.run(&["log", "-1", "--pretty=%B"]).await?;
            Ok(out.trim().to_string())
        })
    }

    fn is_dirty(&self) -> BoxFuture<'_, Result<bool>> {
        Box::pin(async move {
            let out = self.run(&["status", "--porcelain"]).await?;
            Ok(!out.trim().is_empty())
        })
    }

    fn diff(&self) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            let mut diff = self.run(&["diff", "--cached"]).await?;
            diff.push_str(&self.run(&["diff"]).await?);
            Ok(diff)
        })
    }

    fn stage<'a>(&'a self, paths: &'a [PathBuf]) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let path_args: Vec<String> = paths
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect();

            let mut args = vec!["add"];
            if path_args.is_empty() {
                args.push(".");
            } else {
                args.push("--");
                args.extend(path_args.iter().map(String::as_str));
            }

            self.run(&args).await.map(|_| ())
        })
    }

    fn commit<'a>(&'a self, message: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move { self.run(&["commit", "-m", message]).await.map(|_| ()) })
    }
}

//! In-memory stand-ins for the run collaborators.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::bail;
use labpilot::errors::{LabpilotError, Result as StoreResult};
use labpilot::notify::{Notification, NotificationSink};
use labpilot::store::{
    ExperimentRecord, NewRun, RecordFilter, RecordStore, SqliteStore, StoreStats, TerminalUpdate,
};
use labpilot::types::BoxFuture;
use labpilot::vcs::VcsProvider;

/// Mutable state behind [`FakeVcs`].
#[derive(Debug, Clone)]
pub struct FakeRepoState {
    pub is_repo: bool,
    pub dirty: bool,
    pub head: String,
    pub subject: String,
    pub body: String,
    pub diff: String,
    pub fail_head: bool,
    pub fail_commit: bool,
    /// Messages of commits made through the fake, in order.
    pub commits: Vec<String>,
    /// Paths passed to every `stage` call.
    pub staged: Vec<Vec<PathBuf>>,
}

impl Default for FakeRepoState {
    fn default() -> Self {
        Self {
            is_repo: true,
            dirty: false,
            head: "a1b2c3d4e5f60718293a4b5c6d7e8f9012345678".to_string(),
            subject: "initial".to_string(),
            body: "initial\n\nfirst commit".to_string(),
            diff: "diff --git a/train.py b/train.py\n+lr = 0.01\n".to_string(),
            fail_head: false,
            fail_commit: false,
            commits: Vec::new(),
            staged: Vec::new(),
        }
    }
}

/// Scriptable repository. Clones share state, so a test can keep one handle
/// after moving another into a `Snapshotter`.
#[derive(Debug, Clone, Default)]
pub struct FakeVcs {
    state: Arc<Mutex<FakeRepoState>>,
}

impl FakeVcs {
    pub fn new(state: FakeRepoState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn clean() -> Self {
        Self::default()
    }

    pub fn dirty() -> Self {
        Self::new(FakeRepoState {
            dirty: true,
            ..FakeRepoState::default()
        })
    }

    pub fn not_a_repo() -> Self {
        Self::new(FakeRepoState {
            is_repo: false,
            ..FakeRepoState::default()
        })
    }

    pub fn state(&self) -> FakeRepoState {
        self.state.lock().unwrap().clone()
    }

    pub fn update(&self, f: impl FnOnce(&mut FakeRepoState)) {
        f(&mut self.state.lock().unwrap());
    }
}

impl VcsProvider for FakeVcs {
    fn is_repo(&self) -> BoxFuture<'_, bool> {
        Box::pin(async move { self.state.lock().unwrap().is_repo })
    }

    fn head_commit(&self) -> BoxFuture<'_, anyhow::Result<String>> {
        Box::pin(async move {
            let state = self.state.lock().unwrap();
            if state.fail_head {
                bail!("fatal: bad revision 'HEAD'");
            }
            Ok(state.head.clone())
        })
    }

    fn head_subject(&self) -> BoxFuture<'_, anyhow::Result<String>> {
        Box::pin(async move { Ok(self.state.lock().unwrap().subject.clone()) })
    }

    fn head_message(&self) -> BoxFuture<'_, anyhow::Result<String>> {
        Box::pin(async move { Ok(self.state.lock().unwrap().body.clone()) })
    }

    fn is_dirty(&self) -> BoxFuture<'_, anyhow::Result<bool>> {
        Box::pin(async move { Ok(self.state.lock().unwrap().dirty) })
    }

    fn diff(&self) -> BoxFuture<'_, anyhow::Result<String>> {
        Box::pin(async move { Ok(self.state.lock().unwrap().diff.clone()) })
    }

    fn stage<'a>(&'a self, paths: &'a [PathBuf]) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.state.lock().unwrap().staged.push(paths.to_vec());
            Ok(())
        })
    }

    fn commit<'a>(&'a self, message: &'a str) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            if state.fail_commit {
                bail!("nothing to commit, working tree clean");
            }
            state.commits.push(message.to_string());
            state.head = format!("{:040x}", state.commits.len());
            state.subject = message.lines().next().unwrap_or_default().to_string();
            state.body = message.to_string();
            state.dirty = false;
            Ok(())
        })
    }
}

/// Sink that records what it was asked to send and answers with a fixed
/// verdict.
#[derive(Debug, Clone)]
pub struct RecordingSink {
    name: String,
    accept: bool,
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingSink {
    pub fn accepting(name: &str) -> Self {
        Self::with_verdict(name, true)
    }

    pub fn rejecting(name: &str) -> Self {
        Self::with_verdict(name, false)
    }

    fn with_verdict(name: &str, accept: bool) -> Self {
        Self {
            name: name.to_string(),
            accept,
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.sent().into_iter().map(|n| n.title).collect()
    }
}

impl NotificationSink for RecordingSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn send<'a>(&'a self, notification: &'a Notification) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            self.sent.lock().unwrap().push(notification.clone());
            self.accept
        })
    }
}

/// In-memory SQLite store that can be told to fail inserts or updates.
pub struct FlakyStore {
    inner: SqliteStore,
    pub fail_insert: bool,
    pub fail_update: bool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteStore::open_in_memory().expect("in-memory store"),
            fail_insert: false,
            fail_update: false,
        }
    }

    pub fn inner(&self) -> &SqliteStore {
        &self.inner
    }
}

impl Default for FlakyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for FlakyStore {
    fn insert(&self, run: &NewRun) -> StoreResult<i64> {
        if self.fail_insert {
            return Err(LabpilotError::StoreError("database is locked".to_string()));
        }
        self.inner.insert(run)
    }

    fn update(&self, id: i64, update: &TerminalUpdate) -> StoreResult<()> {
        if self.fail_update {
            return Err(LabpilotError::StoreError("disk I/O error".to_string()));
        }
        self.inner.update(id, update)
    }

    fn get(&self, id: i64) -> StoreResult<Option<ExperimentRecord>> {
        self.inner.get(id)
    }

    fn list(&self, filter: &RecordFilter) -> StoreResult<Vec<ExperimentRecord>> {
        self.inner.list(filter)
    }

    fn stats(&self) -> StoreResult<StoreStats> {
        self.inner.stats()
    }

    fn delete(&self, id: i64) -> StoreResult<()> {
        self.inner.delete(id)
    }
}

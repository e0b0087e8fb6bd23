use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::RunStatus;

/// One row of the `experiments` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRecord {
    pub id: i64,
    pub start_time: String,
    /// Absent while `status` is `running`.
    pub end_time: Option<String>,
    pub server: Option<String>,
    pub command: String,
    pub commit_hash: Option<String>,
    pub commit_message: Option<String>,
    pub params: Option<String>,
    pub ckpt_path: Option<String>,
    pub duration: Option<f64>,
    pub status: RunStatus,
    pub log_snippet: Option<String>,
    pub exit_code: Option<i32>,
}

/// Fields written when a run starts.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRun {
    pub start_time: String,
    pub server: String,
    pub command: String,
    pub commit_hash: String,
    pub commit_message: String,
    pub params: String,
    pub status: RunStatus,
}

/// Fields written once when a run reaches its terminal state.
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalUpdate {
    pub end_time: String,
    pub duration: f64,
    pub status: RunStatus,
    pub log_snippet: String,
    pub exit_code: i32,
    pub ckpt_path: String,
}

/// Query parameters for [`RecordStore::list`](super::RecordStore::list).
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub status: Option<RunStatus>,
    pub server: Option<String>,
    /// Substring match over command, log snippet and checkpoint path.
    pub search: Option<String>,
    pub skip: usize,
    /// Clamped to `1..=1000`; defaults to 100.
    pub limit: Option<usize>,
}

pub const DEFAULT_LIST_LIMIT: usize = 100;
pub const MAX_LIST_LIMIT: usize = 1000;

impl RecordFilter {
    pub fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT)
    }
}

/// Aggregate counts over all records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreStats {
    pub total_experiments: u64,
    pub status_counts: BTreeMap<String, u64>,
    pub server_counts: BTreeMap<String, u64>,
    /// Records started within the last 24 hours.
    pub recent_experiments: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_clamped() {
        let mut filter = RecordFilter::default();
        assert_eq!(filter.effective_limit(), 100);
        filter.limit = Some(0);
        assert_eq!(filter.effective_limit(), 1);
        filter.limit = Some(50_000);
        assert_eq!(filter.effective_limit(), 1000);
    }
}

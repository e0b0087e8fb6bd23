//! SQLite implementation of [`RecordStore`].

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, ToSql};
use tracing::debug;

use crate::clock;
use crate::errors::{LabpilotError, Result};
use crate::store::model::{ExperimentRecord, NewRun, RecordFilter, StoreStats, TerminalUpdate};
use crate::store::RecordStore;
use crate::types::RunStatus;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS experiments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    start_time TEXT NOT NULL,
    end_time TEXT,
    server TEXT,
    command TEXT NOT NULL,
    commit_hash TEXT,
    commit_message TEXT,
    params TEXT,
    ckpt_path TEXT,
    duration REAL,
    status TEXT,
    log_snippet TEXT,
    exit_code INTEGER
);
CREATE INDEX IF NOT EXISTS idx_experiments_start_time ON experiments(start_time);
";

const SELECT_COLUMNS: &str = "id, start_time, end_time, server, command, commit_hash, \
     commit_message, params, ckpt_path, duration, status, log_snippet, exit_code";

/// How long a writer waits on a lock held by another `labrun` process.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

const RECENT_WINDOW: time::Duration = time::Duration::hours(24);

/// Record store backed by a single SQLite database file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(path = %path.display(), journal_mode = %mode, "opened record store");

        Self::init(conn)
    }

    /// Private in-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| LabpilotError::StoreError("connection mutex poisoned".to_string()))
    }
}

impl RecordStore for SqliteStore {
    fn insert(&self, run: &NewRun) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO experiments
                (start_time, server, command, commit_hash, commit_message, params, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                run.start_time,
                run.server,
                run.command,
                run.commit_hash,
                run.commit_message,
                run.params,
                run.status,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update(&self, id: i64, update: &TerminalUpdate) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE experiments
             SET end_time = ?1, duration = ?2, status = ?3, log_snippet = ?4,
                 exit_code = ?5, ckpt_path = ?6
             WHERE id = ?7",
            params![
                update.end_time,
                update.duration,
                update.status,
                update.log_snippet,
                update.exit_code,
                update.ckpt_path,
                id,
            ],
        )?;
        if changed == 0 {
            return Err(LabpilotError::RecordNotFound(id));
        }
        Ok(())
    }

    fn get(&self, id: i64) -> Result<Option<ExperimentRecord>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {SELECT_COLUMNS} FROM experiments WHERE id = ?1");
        let record = conn.query_row(&sql, params![id], row_to_record).optional()?;
        Ok(record)
    }

    fn list(&self, filter: &RecordFilter) -> Result<Vec<ExperimentRecord>> {
        let mut conditions: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(status) = filter.status {
            conditions.push("status = ?");
            values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(server) = &filter.server {
            conditions.push("server = ?");
            values.push(Value::Text(server.clone()));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            conditions.push("(command LIKE ? OR log_snippet LIKE ? OR ckpt_path LIKE ?)");
            let term = format!("%{search}%");
            for _ in 0..3 {
                values.push(Value::Text(term.clone()));
            }
        }

        let mut sql = format!("SELECT {SELECT_COLUMNS} FROM experiments");
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY start_time DESC, id DESC LIMIT ? OFFSET ?");
        values.push(Value::Integer(filter.effective_limit() as i64));
        values.push(Value::Integer(filter.skip as i64));

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), row_to_record)?;
        let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn()?;

        let total: i64 = conn.query_row("SELECT COUNT(*) FROM experiments", [], |row| row.get(0))?;

        let mut stats = StoreStats {
            total_experiments: total as u64,
            ..StoreStats::default()
        };

        let mut stmt = conn.prepare(
            "SELECT COALESCE(status, 'unknown'), COUNT(*) FROM experiments GROUP BY status",
        )?;
        for row in stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))? {
            let (status, count) = row?;
            stats.status_counts.insert(status, count as u64);
        }

        let mut stmt = conn.prepare(
            "SELECT server, COUNT(*) FROM experiments WHERE server IS NOT NULL GROUP BY server",
        )?;
        for row in stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))? {
            let (server, count) = row?;
            stats.server_counts.insert(server, count as u64);
        }

        let cutoff = clock::timestamp_before_now(RECENT_WINDOW);
        let recent: i64 = conn.query_row(
            "SELECT COUNT(*) FROM experiments WHERE start_time >= ?1",
            params![cutoff],
            |row| row.get(0),
        )?;
        stats.recent_experiments = recent as u64;

        Ok(stats)
    }

    fn delete(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM experiments WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(LabpilotError::RecordNotFound(id));
        }
        Ok(())
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ExperimentRecord> {
    Ok(ExperimentRecord {
        id: row.get("id")?,
        start_time: row.get("start_time")?,
        end_time: row.get("end_time")?,
        server: row.get("server")?,
        command: row.get("command")?,
        commit_hash: row.get("commit_hash")?,
        commit_message: row.get("commit_message")?,
        params: row.get("params")?,
        ckpt_path: row.get("ckpt_path")?,
        duration: row.get("duration")?,
        status: row.get("status")?,
        log_snippet: row.get("log_snippet")?,
        exit_code: row.get("exit_code")?,
    })
}

impl ToSql for RunStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for RunStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_run(command: &str, server: &str, start_time: &str) -> NewRun {
        NewRun {
            start_time: start_time.to_string(),
            server: server.to_string(),
            command: command.to_string(),
            commit_hash: "abc1234".to_string(),
            commit_message: "init".to_string(),
            params: String::new(),
            status: RunStatus::Running,
        }
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let store = SqliteStore::open_in_memory().unwrap();
        let now = clock::now_timestamp();
        let first = store.insert(&new_run("a", "s", &now)).unwrap();
        let second = store.insert(&new_run("b", "s", &now)).unwrap();
        assert!(second > first);

        store.delete(second).unwrap();
        let third = store.insert(&new_run("c", "s", &now)).unwrap();
        assert!(third > second);
    }

    #[test]
    fn running_record_has_no_end_time() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store
            .insert(&new_run("python train.py", "gpu-1", &clock::now_timestamp()))
            .unwrap();
        let record = store.get(id).unwrap().unwrap();
        assert_eq!(record.status, RunStatus::Running);
        assert_eq!(record.end_time, None);
        assert_eq!(record.exit_code, None);
        assert_eq!(record.commit_message.as_deref(), Some("init"));
    }
}

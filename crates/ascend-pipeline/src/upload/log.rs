//! Durable upload log
//!
//! Records one entry per `(version, destination)` plus every upload run, so
//! a restarted process can tell which destinations hold data for a version
//! and whether the last run finished.

use super::state::{EntryStatus, RunState, UploadEntry, UploadRun};
use crate::error::{PipelineError, Result};
use ascend_common::SnapshotVersion;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Upload log storage (dependency injection seam for the orchestrator)
#[async_trait]
pub trait UploadLog: Send + Sync {
    /// Open a new run for `version` in `NotStarted`
    async fn start_run(&self, version: SnapshotVersion) -> Result<UploadRun>;

    /// Move a run to a new state; terminal states also stamp `finished_at`
    async fn set_run_state(&self, run_id: Uuid, state: &RunState) -> Result<()>;

    async fn latest_run(&self, version: SnapshotVersion) -> Result<Option<UploadRun>>;

    /// All runs for a version, oldest first
    async fn runs(&self, version: SnapshotVersion) -> Result<Vec<UploadRun>>;

    async fn set_entry(
        &self,
        version: SnapshotVersion,
        destination: &str,
        status: EntryStatus,
        detail: Option<&str>,
    ) -> Result<()>;

    async fn entry(&self, version: SnapshotVersion, destination: &str) -> Result<Option<UploadEntry>>;

    /// Entries for a version in the order destinations were first recorded
    async fn entries(&self, version: SnapshotVersion) -> Result<Vec<UploadEntry>>;

    /// "Is vX live on these destinations"
    ///
    /// True when the last run for the version has settled and every named
    /// destination holds a `success` entry. A run that is still in flight or
    /// left compensation unfinished never counts as delivered.
    async fn is_delivered(&self, version: SnapshotVersion, destinations: &[&str]) -> Result<bool> {
        if destinations.is_empty() {
            return Ok(false);
        }
        match self.latest_run(version).await? {
            Some(run) if run.state.is_terminal() && !run.state.needs_recovery() => {},
            _ => return Ok(false),
        }
        for name in destinations {
            match self.entry(version, name).await? {
                Some(entry) if entry.status == EntryStatus::Success => {},
                _ => return Ok(false),
            }
        }
        Ok(true)
    }
}

/// SQLite-backed upload log
pub struct SqliteUploadLog {
    db: Arc<Mutex<Connection>>,
}

impl SqliteUploadLog {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|e| {
            PipelineError::upload_log(format!(
                "Failed to open upload log {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::with_connection(conn)
    }

    /// In-memory log for tests and dry runs
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            PipelineError::upload_log(format!("Failed to create in-memory upload log: {}", e))
        })?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|e| PipelineError::upload_log(format!("Failed to acquire upload log lock: {}", e)))
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS upload_runs (
            run_id TEXT PRIMARY KEY,
            version TEXT NOT NULL,
            state TEXT NOT NULL,
            destination TEXT,
            started_at TEXT NOT NULL,
            finished_at TEXT
        );

        CREATE TABLE IF NOT EXISTS upload_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            version TEXT NOT NULL,
            destination TEXT NOT NULL,
            status TEXT NOT NULL,
            detail TEXT,
            updated_at TEXT NOT NULL,
            UNIQUE(version, destination)
        );

        CREATE INDEX IF NOT EXISTS idx_runs_version ON upload_runs(version);
        CREATE INDEX IF NOT EXISTS idx_entries_version ON upload_entries(version);
        "#,
    )?;
    Ok(())
}

fn conversion_error(column: usize, err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

fn parse_time(column: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(column, e))
}

fn parse_version(column: usize, raw: &str) -> rusqlite::Result<SnapshotVersion> {
    raw.parse().map_err(|e| conversion_error(column, e))
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<UploadRun> {
    let run_id: String = row.get(0)?;
    let state: String = row.get(2)?;
    let finished_at: Option<String> = row.get(5)?;

    Ok(UploadRun {
        run_id: Uuid::parse_str(&run_id).map_err(|e| conversion_error(0, e))?,
        version: parse_version(1, &row.get::<_, String>(1)?)?,
        state: RunState::from_parts(&state, row.get(3)?).map_err(|e| conversion_error(2, e))?,
        started_at: parse_time(4, &row.get::<_, String>(4)?)?,
        finished_at: finished_at.as_deref().map(|t| parse_time(5, t)).transpose()?,
    })
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<UploadEntry> {
    let status: String = row.get(2)?;
    Ok(UploadEntry {
        version: parse_version(0, &row.get::<_, String>(0)?)?,
        destination: row.get(1)?,
        status: status.parse().map_err(|e| conversion_error(2, e))?,
        detail: row.get(3)?,
        updated_at: parse_time(4, &row.get::<_, String>(4)?)?,
    })
}

const RUN_COLUMNS: &str = "run_id, version, state, destination, started_at, finished_at";
const ENTRY_COLUMNS: &str = "version, destination, status, detail, updated_at";

#[async_trait]
impl UploadLog for SqliteUploadLog {
    async fn start_run(&self, version: SnapshotVersion) -> Result<UploadRun> {
        let run = UploadRun {
            run_id: Uuid::new_v4(),
            version,
            state: RunState::NotStarted,
            started_at: Utc::now(),
            finished_at: None,
        };

        self.conn()?.execute(
            "INSERT INTO upload_runs (run_id, version, state, destination, started_at) \
             VALUES (?1, ?2, ?3, NULL, ?4)",
            params![
                run.run_id.to_string(),
                version.to_string(),
                run.state.as_str(),
                run.started_at.to_rfc3339(),
            ],
        )?;
        Ok(run)
    }

    async fn set_run_state(&self, run_id: Uuid, state: &RunState) -> Result<()> {
        let finished_at = state.is_terminal().then(|| Utc::now().to_rfc3339());
        let updated = self.conn()?.execute(
            "UPDATE upload_runs SET state = ?1, destination = ?2, finished_at = ?3 WHERE run_id = ?4",
            params![state.as_str(), state.destination(), finished_at, run_id.to_string()],
        )?;
        if updated == 0 {
            return Err(PipelineError::upload_log(format!("Unknown upload run {run_id}")));
        }
        Ok(())
    }

    async fn latest_run(&self, version: SnapshotVersion) -> Result<Option<UploadRun>> {
        let conn = self.conn()?;
        let run = conn
            .query_row(
                &format!(
                    "SELECT {RUN_COLUMNS} FROM upload_runs WHERE version = ?1 \
                     ORDER BY rowid DESC LIMIT 1"
                ),
                params![version.to_string()],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    async fn runs(&self, version: SnapshotVersion) -> Result<Vec<UploadRun>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RUN_COLUMNS} FROM upload_runs WHERE version = ?1 ORDER BY rowid ASC"
        ))?;
        let runs = stmt
            .query_map(params![version.to_string()], run_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(runs)
    }

    async fn set_entry(
        &self,
        version: SnapshotVersion,
        destination: &str,
        status: EntryStatus,
        detail: Option<&str>,
    ) -> Result<()> {
        self.conn()?.execute(
            r#"
            INSERT INTO upload_entries (version, destination, status, detail, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(version, destination) DO UPDATE SET
                status = excluded.status,
                detail = excluded.detail,
                updated_at = excluded.updated_at
            "#,
            params![
                version.to_string(),
                destination,
                status.as_str(),
                detail,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn entry(&self, version: SnapshotVersion, destination: &str) -> Result<Option<UploadEntry>> {
        let conn = self.conn()?;
        let entry = conn
            .query_row(
                &format!(
                    "SELECT {ENTRY_COLUMNS} FROM upload_entries WHERE version = ?1 AND destination = ?2"
                ),
                params![version.to_string(), destination],
                entry_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    async fn entries(&self, version: SnapshotVersion) -> Result<Vec<UploadEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM upload_entries WHERE version = ?1 ORDER BY id ASC"
        ))?;
        let entries = stmt
            .query_map(params![version.to_string()], entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn v1() -> SnapshotVersion {
        SnapshotVersion::new(1, 0, 0)
    }

    #[tokio::test]
    async fn test_entries_keep_first_recorded_order() {
        let log = SqliteUploadLog::in_memory().unwrap();

        log.set_entry(v1(), "objects", EntryStatus::Pending, None).await.unwrap();
        log.set_entry(v1(), "metadata", EntryStatus::Pending, None).await.unwrap();
        log.set_entry(v1(), "objects", EntryStatus::Success, None).await.unwrap();
        log.set_entry(v1(), "metadata", EntryStatus::Failed, Some("timeout"))
            .await
            .unwrap();

        let entries = log.entries(v1()).await.unwrap();
        let summary: Vec<(&str, EntryStatus)> = entries
            .iter()
            .map(|e| (e.destination.as_str(), e.status))
            .collect();
        assert_eq!(
            summary,
            vec![("objects", EntryStatus::Success), ("metadata", EntryStatus::Failed)]
        );
        assert_eq!(entries[1].detail.as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn test_run_lifecycle() {
        let log = SqliteUploadLog::in_memory().unwrap();
        assert!(log.latest_run(v1()).await.unwrap().is_none());

        let run = log.start_run(v1()).await.unwrap();
        log.set_run_state(run.run_id, &RunState::Uploading("objects".to_string()))
            .await
            .unwrap();

        let latest = log.latest_run(v1()).await.unwrap().unwrap();
        assert_eq!(latest.state, RunState::Uploading("objects".to_string()));
        assert!(latest.finished_at.is_none());
        log.set_entry(v1(), "objects", EntryStatus::Success, None).await.unwrap();
        assert!(!log.is_delivered(v1(), &["objects"]).await.unwrap());

        log.set_run_state(run.run_id, &RunState::Delivered).await.unwrap();
        let latest = log.latest_run(v1()).await.unwrap().unwrap();
        assert!(latest.finished_at.is_some());
        assert!(log.is_delivered(v1(), &["objects"]).await.unwrap());
        assert!(!log.is_delivered(SnapshotVersion::new(2, 0, 0), &["objects"]).await.unwrap());
    }

    #[tokio::test]
    async fn test_delivered_is_answered_per_destination() {
        let log = SqliteUploadLog::in_memory().unwrap();
        let run = log.start_run(v1()).await.unwrap();
        log.set_entry(v1(), "objects", EntryStatus::Success, None).await.unwrap();
        log.set_entry(v1(), "metadata", EntryStatus::RolledBack, None).await.unwrap();
        log.set_run_state(run.run_id, &RunState::Delivered).await.unwrap();

        assert!(log.is_delivered(v1(), &["objects"]).await.unwrap());
        assert!(!log.is_delivered(v1(), &["objects", "metadata"]).await.unwrap());
        assert!(!log.is_delivered(v1(), &["objects", "search"]).await.unwrap());
        assert!(!log.is_delivered(v1(), &[]).await.unwrap());

        let retry = log.start_run(v1()).await.unwrap();
        log.set_run_state(retry.run_id, &RunState::RollbackFailed).await.unwrap();
        assert!(!log.is_delivered(v1(), &["objects"]).await.unwrap());
    }

    #[tokio::test]
    async fn test_latest_run_wins() {
        let log = SqliteUploadLog::in_memory().unwrap();
        let first = log.start_run(v1()).await.unwrap();
        log.set_run_state(first.run_id, &RunState::RolledBack).await.unwrap();
        let second = log.start_run(v1()).await.unwrap();

        assert_eq!(log.latest_run(v1()).await.unwrap().unwrap().run_id, second.run_id);
        assert_eq!(log.runs(v1()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("upload-log.db");
        {
            let log = SqliteUploadLog::open(&path).unwrap();
            log.set_entry(v1(), "objects", EntryStatus::Success, None).await.unwrap();
        }

        let log = SqliteUploadLog::open(&path).unwrap();
        let entry = log.entry(v1(), "objects").await.unwrap().unwrap();
        assert_eq!(entry.status, EntryStatus::Success);
    }

    #[tokio::test]
    async fn test_unknown_run_is_an_error() {
        let log = SqliteUploadLog::in_memory().unwrap();
        assert!(log
            .set_run_state(Uuid::new_v4(), &RunState::Delivered)
            .await
            .is_err());
    }
}

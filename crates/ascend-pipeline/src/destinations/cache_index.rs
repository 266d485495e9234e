//! Per-version lookup summaries (SQLite)

use crate::snapshot::SnapshotHandle;
use crate::upload::{Compensation, Destination};
use anyhow::{Context, Result};
use ascend_common::{RecordBatch, SnapshotVersion};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, instrument};

pub const NAME: &str = "cache";

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS cache_summaries (
        snapshot_version TEXT NOT NULL,
        facet TEXT NOT NULL,
        key TEXT NOT NULL,
        problem_count INTEGER NOT NULL,
        PRIMARY KEY (snapshot_version, facet, key)
    )
"#;

/// Summary facet stored per version
pub const FACET_TOPIC: &str = "topic";
pub const FACET_DIFFICULTY: &str = "difficulty";

/// Problem counts per topic and per difficulty
///
/// Entries are derived data, so compensation is best-effort: an entry that
/// is already gone counts as removed and a failure does not block rollback.
#[derive(Clone)]
pub struct CacheIndex {
    pool: SqlitePool,
}

impl CacheIndex {
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open cache index {}", path.display()))?;
        Self::with_pool(pool).await
    }

    pub async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .context("Failed to initialize cache index schema")?;
        Ok(Self { pool })
    }

    /// `key -> problem_count` for one facet of one version
    pub async fn summary(&self, version: SnapshotVersion, facet: &str) -> Result<BTreeMap<String, i64>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT key, problem_count FROM cache_summaries \
             WHERE snapshot_version = ?1 AND facet = ?2 ORDER BY key",
        )
        .bind(version.to_string())
        .bind(facet)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }
}

/// `(facet, key, count)` rows for a batch
fn summarize(records: &RecordBatch) -> Vec<(&'static str, String, i64)> {
    let mut topics: BTreeMap<&str, i64> = BTreeMap::new();
    let mut difficulties: BTreeMap<&str, i64> = BTreeMap::new();

    for problem in &records.problems {
        for topic in &problem.topics {
            *topics.entry(topic).or_default() += 1;
        }
        let difficulty = problem.difficulty.map_or("unrated", |d| d.as_str());
        *difficulties.entry(difficulty).or_default() += 1;
    }

    topics
        .into_iter()
        .map(|(k, n)| (FACET_TOPIC, k.to_string(), n))
        .chain(
            difficulties
                .into_iter()
                .map(|(k, n)| (FACET_DIFFICULTY, k.to_string(), n)),
        )
        .collect()
}

#[async_trait]
impl Destination for CacheIndex {
    fn name(&self) -> &str {
        NAME
    }

    fn compensation(&self) -> Compensation {
        Compensation::BestEffort
    }

    #[instrument(skip(self, snapshot), fields(version = %snapshot.version()))]
    async fn deliver(&self, snapshot: &SnapshotHandle) -> Result<()> {
        let records = snapshot.records()?;
        let version = snapshot.version().to_string();
        let rows = summarize(&records);

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM cache_summaries WHERE snapshot_version = ?1")
            .bind(&version)
            .execute(&mut *tx)
            .await?;
        for (facet, key, count) in &rows {
            sqlx::query(
                "INSERT INTO cache_summaries (snapshot_version, facet, key, problem_count) \
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(&version)
            .bind(*facet)
            .bind(key)
            .bind(*count)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await.context("Failed to commit cache summaries")?;

        info!(entries = rows.len(), "Cache index updated");
        Ok(())
    }

    #[instrument(skip(self, snapshot), fields(version = %snapshot.version()))]
    async fn compensate(&self, snapshot: &SnapshotHandle) -> Result<()> {
        let removed = sqlx::query("DELETE FROM cache_summaries WHERE snapshot_version = ?1")
            .bind(snapshot.version().to_string())
            .execute(&self.pool)
            .await
            .context("Failed to remove cache summaries")?
            .rows_affected();
        info!(removed, "Cache index entries removed");
        Ok(())
    }
}

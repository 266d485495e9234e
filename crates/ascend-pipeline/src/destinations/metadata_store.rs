//! Relational metadata store (PostgreSQL)

use crate::config::DatabaseConfig;
use crate::snapshot::SnapshotHandle;
use crate::upload::Destination;
use anyhow::{Context, Result};
use ascend_common::{ids, Contest, Problem, SnapshotVersion, Topic};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{Postgres, Transaction};
use tracing::{info, instrument};

pub const NAME: &str = "metadata";

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS topics (
        snapshot_version TEXT NOT NULL,
        topic_id TEXT NOT NULL,
        name TEXT NOT NULL,
        parent TEXT,
        category TEXT NOT NULL,
        PRIMARY KEY (snapshot_version, topic_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS problems (
        snapshot_version TEXT NOT NULL,
        problem_id TEXT NOT NULL,
        source TEXT NOT NULL,
        external_id TEXT NOT NULL,
        slug TEXT NOT NULL,
        title TEXT NOT NULL,
        difficulty TEXT,
        rating BIGINT,
        topics JSONB NOT NULL,
        content_refs JSONB NOT NULL,
        metadata JSONB NOT NULL,
        PRIMARY KEY (snapshot_version, problem_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS contests (
        snapshot_version TEXT NOT NULL,
        contest_id TEXT NOT NULL,
        source TEXT NOT NULL,
        external_id TEXT NOT NULL,
        name TEXT NOT NULL,
        contest_type TEXT NOT NULL,
        duration_seconds BIGINT,
        start_time TIMESTAMPTZ,
        phase TEXT,
        PRIMARY KEY (snapshot_version, contest_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS contest_problems (
        snapshot_version TEXT NOT NULL,
        contest_id TEXT NOT NULL,
        problem_id TEXT NOT NULL,
        problem_index TEXT NOT NULL,
        PRIMARY KEY (snapshot_version, contest_id, problem_index)
    )
    "#,
];

/// Child tables first, so deletes never strand references
const TABLES: [&str; 4] = ["contest_problems", "contests", "problems", "topics"];

/// Writes every record of a snapshot, tagged with its version
///
/// Delivery replaces the version's rows inside one transaction, so running
/// it twice leaves the same rows. Compensation deletes the version's rows.
#[derive(Clone)]
pub struct MetadataStore {
    pool: PgPool,
}

impl MetadataStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .context("Failed to connect to metadata database")?;
        Self::with_pool(pool).await
    }

    pub async fn with_pool(pool: PgPool) -> Result<Self> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .context("Failed to initialize metadata schema")?;
        }
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Row count per table for one version
    pub async fn row_counts(&self, version: SnapshotVersion) -> Result<Vec<(&'static str, i64)>> {
        let mut counts = Vec::with_capacity(TABLES.len());
        for table in TABLES {
            let count: i64 = sqlx::query_scalar(&format!(
                "SELECT COUNT(*) FROM {table} WHERE snapshot_version = $1"
            ))
            .bind(version.to_string())
            .fetch_one(&self.pool)
            .await?;
            counts.push((table, count));
        }
        Ok(counts)
    }
}

async fn delete_version(tx: &mut Transaction<'_, Postgres>, version: &str) -> Result<()> {
    for table in TABLES {
        sqlx::query(&format!("DELETE FROM {table} WHERE snapshot_version = $1"))
            .bind(version)
            .execute(&mut **tx)
            .await
            .with_context(|| format!("Failed to clear {table}"))?;
    }
    Ok(())
}

async fn insert_topic(tx: &mut Transaction<'_, Postgres>, version: &str, topic: &Topic) -> Result<()> {
    sqlx::query(
        "INSERT INTO topics (snapshot_version, topic_id, name, parent, category) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(version)
    .bind(&topic.topic_id)
    .bind(&topic.name)
    .bind(&topic.parent)
    .bind(topic.category.as_str())
    .execute(&mut **tx)
    .await
    .with_context(|| format!("Failed to insert topic '{}'", topic.name))?;
    Ok(())
}

async fn insert_problem(
    tx: &mut Transaction<'_, Postgres>,
    version: &str,
    problem: &Problem,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO problems (snapshot_version, problem_id, source, external_id, slug, title, \
         difficulty, rating, topics, content_refs, metadata) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(version)
    .bind(&problem.problem_id)
    .bind(problem.source.as_str())
    .bind(&problem.external_id)
    .bind(&problem.slug)
    .bind(&problem.title)
    .bind(problem.difficulty.map(|d| d.as_str()))
    .bind(problem.rating)
    .bind(Json(&problem.topics))
    .bind(Json(&problem.content_refs))
    .bind(Json(&problem.metadata))
    .execute(&mut **tx)
    .await
    .with_context(|| format!("Failed to insert problem {}:{}", problem.source, problem.external_id))?;
    Ok(())
}

async fn insert_contest(
    tx: &mut Transaction<'_, Postgres>,
    version: &str,
    contest: &Contest,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO contests (snapshot_version, contest_id, source, external_id, name, \
         contest_type, duration_seconds, start_time, phase) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(version)
    .bind(&contest.contest_id)
    .bind(contest.source.as_str())
    .bind(&contest.external_id)
    .bind(&contest.name)
    .bind(contest.contest_type.as_str())
    .bind(contest.duration_seconds)
    .bind(contest.start_time)
    .bind(&contest.phase)
    .execute(&mut **tx)
    .await
    .with_context(|| format!("Failed to insert contest {}:{}", contest.source, contest.external_id))?;

    for slot in &contest.problems {
        sqlx::query(
            "INSERT INTO contest_problems (snapshot_version, contest_id, problem_id, problem_index) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(version)
        .bind(&contest.contest_id)
        .bind(ids::problem_id(contest.source, &slot.problem_external_id).to_string())
        .bind(&slot.index)
        .execute(&mut **tx)
        .await
        .with_context(|| format!("Failed to link problem {} to contest", slot.index))?;
    }
    Ok(())
}

#[async_trait]
impl Destination for MetadataStore {
    fn name(&self) -> &str {
        NAME
    }

    #[instrument(skip(self, snapshot), fields(version = %snapshot.version()))]
    async fn deliver(&self, snapshot: &SnapshotHandle) -> Result<()> {
        let records = snapshot.records()?;
        let version = snapshot.version().to_string();

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        delete_version(&mut tx, &version).await?;

        for topic in &records.topics {
            insert_topic(&mut tx, &version, topic).await?;
        }
        for problem in &records.problems {
            insert_problem(&mut tx, &version, problem).await?;
        }
        for contest in &records.contests {
            insert_contest(&mut tx, &version, contest).await?;
        }

        tx.commit().await.context("Failed to commit metadata")?;
        info!(records = snapshot.manifest().total_records(), "Metadata written");
        Ok(())
    }

    #[instrument(skip(self, snapshot), fields(version = %snapshot.version()))]
    async fn compensate(&self, snapshot: &SnapshotHandle) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        delete_version(&mut tx, &snapshot.version().to_string()).await?;
        tx.commit().await.context("Failed to commit metadata removal")?;
        info!("Metadata removed");
        Ok(())
    }
}

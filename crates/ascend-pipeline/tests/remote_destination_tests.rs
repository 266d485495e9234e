//! Object store and metadata store against live services
//!
//! **Requirements**:
//! - `S3_ENDPOINT` (MinIO or S3) for the object store tests
//! - `DATABASE_URL` (PostgreSQL) for the metadata store tests
//!
//! Each test returns early when its service is not configured.
//!
//! ```bash
//! S3_ENDPOINT=http://localhost:9000 S3_PATH_STYLE=true \
//! S3_ACCESS_KEY=minioadmin S3_SECRET_KEY=minioadmin \
//! DATABASE_URL=postgresql://localhost/ascend_test \
//!     cargo test -p ascend-pipeline --test remote_destination_tests
//! ```
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use ascend_common::{RecordBatch, SnapshotVersion};
use ascend_pipeline::destinations::{MetadataStore, ObjectStore};
use ascend_pipeline::{CreateOptions, Destination, PipelineConfig, SnapshotHandle};
use common::TestEnv;

fn snapshot(env: &TestEnv, version: SnapshotVersion) -> SnapshotHandle {
    let records = RecordBatch::new(common::problems(), common::contests(), common::topics());
    env.snapshots()
        .create(version, &records, &CreateOptions::new("v1.0.0"))
        .unwrap();
    env.snapshots().open(version).unwrap()
}

/// Unique per test run so concurrent runs do not collide
fn scratch_version() -> SnapshotVersion {
    let n = uuid::Uuid::new_v4().as_u128() as u32;
    SnapshotVersion::new(0, n % 100_000, n / 100_000 % 100_000)
}

async fn object_store() -> Option<ObjectStore> {
    if std::env::var("S3_ENDPOINT").is_err() {
        return None;
    }
    let config = PipelineConfig::from_env().ok()?;
    match ObjectStore::new(&config.storage).await {
        Ok(store) => Some(store),
        Err(e) => {
            eprintln!("Failed to create object store client: {e:#}");
            None
        },
    }
}

async fn metadata_store() -> Option<MetadataStore> {
    if std::env::var("DATABASE_URL").is_err() {
        return None;
    }
    let config = PipelineConfig::from_env().ok()?;
    match MetadataStore::connect(&config.database).await {
        Ok(store) => Some(store),
        Err(e) => {
            eprintln!("Failed to connect to metadata store: {e:#}");
            None
        },
    }
}

#[tokio::test]
async fn test_object_store_round_trip() {
    let Some(store) = object_store().await else {
        eprintln!("Skipping: S3_ENDPOINT not set");
        return;
    };
    let env = TestEnv::new();
    let version = scratch_version();
    let handle = snapshot(&env, version);

    store.deliver(&handle).await.unwrap();
    store.deliver(&handle).await.unwrap();

    let key = store.key(version, "problems.json");
    assert_eq!(
        store.download(&key).await.unwrap(),
        handle.read_file("problems.json").unwrap()
    );
    assert!(store.exists(&store.key(version, "manifest.json")).await.unwrap());

    store.compensate(&handle).await.unwrap();
    store.compensate(&handle).await.unwrap();
    assert!(!store.exists(&key).await.unwrap());
}

#[tokio::test]
async fn test_metadata_store_round_trip() {
    let Some(store) = metadata_store().await else {
        eprintln!("Skipping: DATABASE_URL not set");
        return;
    };
    let env = TestEnv::new();
    let version = scratch_version();
    let handle = snapshot(&env, version);

    store.deliver(&handle).await.unwrap();
    store.deliver(&handle).await.unwrap();

    let counts = store.row_counts(version).await.unwrap();
    assert_eq!(
        counts,
        vec![("contest_problems", 1), ("contests", 1), ("problems", 2), ("topics", 4)]
    );

    store.compensate(&handle).await.unwrap();
    store.compensate(&handle).await.unwrap();
    assert!(store.row_counts(version).await.unwrap().iter().all(|(_, n)| *n == 0));
}

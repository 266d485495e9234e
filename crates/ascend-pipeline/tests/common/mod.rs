//! Shared fixtures for pipeline integration tests
#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use ascend_common::{Contest, ContestType, Difficulty, Problem, Source, Topic, TopicCategory};
use ascend_pipeline::{Pipeline, RejectionLog, SnapshotManager};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub struct TestEnv {
    pub dir: TempDir,
    pub pipeline: Pipeline,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(
            Arc::new(SnapshotManager::new(dir.path().join("snapshots"))),
            RejectionLog::new(dir.path().join("rejected")),
        )
        .unwrap();
        Self { dir, pipeline }
    }

    pub fn snapshots(&self) -> &Arc<SnapshotManager> {
        self.pipeline.snapshots()
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

pub fn problems() -> Vec<Problem> {
    vec![
        Problem::new(Source::Leetcode, "1", "two-sum", "Two Sum")
            .with_difficulty(Difficulty::Easy)
            .with_topics(["array", "hash-table"])
            .with_content_ref(
                "description",
                Some("r2://problems/leetcode/two-sum/description.md".to_string()),
            )
            .with_metadata("source_url", json!("https://leetcode.com/problems/two-sum/")),
        Problem::new(Source::Codeforces, "4A", "watermelon", "Watermelon")
            .with_rating(800)
            .with_topics(["math"]),
    ]
}

pub fn contests() -> Vec<Contest> {
    vec![Contest::new(Source::Codeforces, "4", "Codeforces Beta Round 4", ContestType::Cf)
        .with_problem("4A", "A")]
}

pub fn topics() -> Vec<Topic> {
    vec![
        Topic::new("data-structures", TopicCategory::Dsa),
        Topic::new("array", TopicCategory::Dsa).with_parent("data-structures"),
        Topic::new("hash-table", TopicCategory::Dsa).with_parent("data-structures"),
        Topic::new("math", TopicCategory::Cp),
    ]
}

pub fn write_json(dir: &Path, file: &str, value: &Value) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join(file), serde_json::to_vec_pretty(value).unwrap()).unwrap();
}

/// Write a batch directory; `None` leaves the file out
pub fn write_batch(dir: &Path, problems: Value, contests: Option<Value>, topics: Value) {
    write_json(dir, "problems.json", &problems);
    write_json(dir, "topics.json", &topics);
    if let Some(contests) = contests {
        write_json(dir, "contests.json", &contests);
    }
}

pub fn write_valid_batch(dir: &Path) {
    write_batch(
        dir,
        serde_json::to_value(problems()).unwrap(),
        Some(serde_json::to_value(contests()).unwrap()),
        serde_json::to_value(topics()).unwrap(),
    );
}

//! End-to-end batch behavior: validation, rejection and snapshot creation
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use ascend_common::{ids, Problem, SnapshotVersion, Source};
use ascend_pipeline::{
    BatchOutcome, CreateOptions, PipelineError, Rule, Stage, CURRENT_SCHEMA_VERSION,
};
use common::{write_batch, write_valid_batch, TestEnv};
use serde_json::json;

fn options() -> CreateOptions {
    CreateOptions::new(CURRENT_SCHEMA_VERSION)
}

fn v(raw: &str) -> SnapshotVersion {
    raw.parse().unwrap()
}

#[test]
fn test_valid_batch_produces_verifiable_snapshot() {
    let env = TestEnv::new();
    let input = env.path("batch");
    write_valid_batch(&input);

    let outcome = env
        .pipeline
        .process_batch(&input, v("v1.0.0"), "valid", &options())
        .unwrap();

    let BatchOutcome::Accepted(manifest) = outcome else {
        panic!("valid batch was rejected");
    };
    assert_eq!(manifest.record_counts["problems"], 2);
    assert_eq!(manifest.record_counts["contests"], 1);
    assert_eq!(manifest.record_counts["topics"], 4);
    assert_eq!(manifest.schema_version, CURRENT_SCHEMA_VERSION);

    let verified = env.snapshots().verify(v("v1.0.0")).unwrap();
    assert_eq!(verified, manifest);
}

#[test]
fn test_duplicate_natural_key_is_reported_once_with_both_indices() {
    let env = TestEnv::new();
    let input = env.path("dupes");
    let twice = vec![
        Problem::new(Source::Leetcode, "1", "two-sum", "Two Sum"),
        Problem::new(Source::Leetcode, "1", "two-sum-again", "Two Sum Again"),
    ];
    write_batch(&input, serde_json::to_value(twice).unwrap(), None, json!([]));

    let outcome = env
        .pipeline
        .process_batch(&input, v("v1.0.0"), "dupes", &options())
        .unwrap();

    let BatchOutcome::Rejected(rejection) = outcome else {
        panic!("duplicate batch was accepted");
    };
    assert_eq!(rejection.stage, Stage::Integrity);
    let duplicates: Vec<_> = rejection
        .violations
        .iter()
        .filter(|v| v.rule == Rule::Duplicate)
        .collect();
    assert_eq!(duplicates.len(), 1);
    assert!(duplicates[0].detail.contains("[0, 1]"));
    assert!(!env.snapshots().exists(v("v1.0.0")));

    let report = env.pipeline.rejections().load("dupes").unwrap();
    assert_eq!(report.stage, Stage::Integrity);
    assert_eq!(report.errors, rejection.violations);
}

#[test]
fn test_orphan_topic_blocks_snapshot() {
    let env = TestEnv::new();
    let input = env.path("orphans");
    let problems = vec![Problem::new(Source::Leetcode, "70", "climbing-stairs", "Climbing Stairs")
        .with_topics(["dp"])];
    write_batch(&input, serde_json::to_value(problems).unwrap(), None, json!([]));

    let outcome = env
        .pipeline
        .process_batch(&input, v("v1.0.0"), "orphans", &options())
        .unwrap();

    let BatchOutcome::Rejected(rejection) = outcome else {
        panic!("orphan batch was accepted");
    };
    assert!(rejection
        .violations
        .iter()
        .any(|v| v.rule == Rule::OrphanTopic && v.detail.contains("dp")));
    assert!(env.snapshots().list().unwrap().is_empty());
}

#[test]
fn test_rejection_report_files_exist() {
    let env = TestEnv::new();
    let input = env.path("bad");
    write_batch(&input, json!([{ "source": "leetcode" }]), None, json!([]));

    let outcome = env
        .pipeline
        .process_batch(&input, v("v1.0.0"), "bad", &options())
        .unwrap();

    let BatchOutcome::Rejected(rejection) = outcome else {
        panic!("bad batch was accepted");
    };
    assert_eq!(rejection.stage, Stage::Schema);
    let report_dir = rejection.report.unwrap();
    assert!(report_dir.join("errors.json").is_file());
    let summary = std::fs::read_to_string(report_dir.join("errors.log")).unwrap();
    assert!(summary.contains("problems[0].title"));
}

#[test]
fn test_malformed_file_is_rejected_not_fatal() {
    let env = TestEnv::new();
    let input = env.path("broken");
    write_valid_batch(&input);
    std::fs::write(input.join("contests.json"), b"{ not json").unwrap();

    let outcome = env
        .pipeline
        .process_batch(&input, v("v1.0.0"), "broken", &options())
        .unwrap();

    let BatchOutcome::Rejected(rejection) = outcome else {
        panic!("malformed batch was accepted");
    };
    assert!(rejection.violations.iter().any(|v| v.rule == Rule::Malformed));
}

#[test]
fn test_batch_without_problems_is_rejected() {
    let env = TestEnv::new();
    let input = env.path("empty");
    write_batch(&input, json!([]), None, json!([]));

    let outcome = env
        .pipeline
        .process_batch(&input, v("v1.0.0"), "empty", &options())
        .unwrap();

    let BatchOutcome::Rejected(rejection) = outcome else {
        panic!("empty batch was accepted");
    };
    assert_eq!(rejection.stage, Stage::Schema);
    assert_eq!(rejection.violations.len(), 1);
    assert_eq!(rejection.violations[0].rule, Rule::Empty);
    assert!(rejection.report.is_some());
    assert!(!env.snapshots().exists(v("v1.0.0")));
}

#[test]
fn test_recreating_a_version_conflicts_and_leaves_it_untouched() {
    let env = TestEnv::new();
    let input = env.path("batch");
    write_valid_batch(&input);
    let version = v("v1.0.0");

    env.pipeline
        .process_batch(&input, version, "first", &options())
        .unwrap();
    let dir = env.snapshots().root().join("v1.0.0");
    let before: Vec<Vec<u8>> = ["problems.json", "manifest.json", "checksum.txt"]
        .iter()
        .map(|f| std::fs::read(dir.join(f)).unwrap())
        .collect();

    let records = env.snapshots().open(version).unwrap().records().unwrap();
    let err = env
        .snapshots()
        .create(version, &records, &options().with_notes("second attempt"))
        .unwrap_err();
    assert!(matches!(err, PipelineError::VersionConflict(_)));

    let after: Vec<Vec<u8>> = ["problems.json", "manifest.json", "checksum.txt"]
        .iter()
        .map(|f| std::fs::read(dir.join(f)).unwrap())
        .collect();
    assert_eq!(before, after);
}

#[test]
fn test_corrupted_byte_fails_verification_naming_the_file() {
    let env = TestEnv::new();
    let input = env.path("batch");
    write_valid_batch(&input);
    env.pipeline
        .process_batch(&input, v("v1.0.0"), "b", &options())
        .unwrap();

    let path = env.snapshots().root().join("v1.0.0").join("topics.json");
    let mut bytes = std::fs::read(&path).unwrap();
    let last = bytes.len() - 2;
    bytes[last] ^= 0x20;
    std::fs::write(&path, bytes).unwrap();

    match env.snapshots().verify(v("v1.0.0")) {
        Err(PipelineError::SnapshotCorruption { files, .. }) => {
            assert_eq!(files, vec!["topics.json".to_string()]);
        },
        other => panic!("expected corruption, got {other:?}"),
    }
}

#[test]
fn test_identical_batches_have_identical_checksums_across_versions() {
    let env = TestEnv::new();
    let input = env.path("batch");
    write_valid_batch(&input);

    let first = env
        .pipeline
        .process_batch(&input, v("v1.0.0"), "one", &options())
        .unwrap();
    let second = env
        .pipeline
        .process_batch(&input, v("v1.1.0"), "two", &options())
        .unwrap();

    let (BatchOutcome::Accepted(a), BatchOutcome::Accepted(b)) = (first, second) else {
        panic!("batch was rejected");
    };
    assert_eq!(a.checksums(), b.checksums());
    assert_ne!(a.version, b.version);
}

#[test]
fn test_validation_is_deterministic() {
    let env = TestEnv::new();
    let input = env.path("mixed");
    write_batch(
        &input,
        json!([{ "source": "atcoder", "slug": "Bad Slug" }, { "title": 5 }]),
        None,
        json!([{ "name": "Not Kebab" }]),
    );

    let run = |id: &str| match env
        .pipeline
        .check_batch(&input, id, CURRENT_SCHEMA_VERSION, false)
        .unwrap()
    {
        BatchOutcome::Rejected(rejection) => rejection.violations,
        BatchOutcome::Accepted(_) => panic!("invalid batch accepted"),
    };
    assert_eq!(run("a"), run("b"));
}

#[test]
fn test_record_ids_are_deterministic() {
    let a = Problem::new(Source::Codeforces, "4A", "watermelon", "Watermelon");
    let b = Problem::new(Source::Codeforces, "4A", "watermelon-renamed", "Renamed");
    assert_eq!(a.problem_id, b.problem_id);
    assert_eq!(a.problem_id, ids::problem_id(Source::Codeforces, "4A").to_string());
    assert_ne!(a.problem_id, ids::problem_id(Source::Leetcode, "4A").to_string());
}

#[test]
fn test_missing_required_file_is_a_config_error() {
    let env = TestEnv::new();
    let input = env.path("partial");
    common::write_json(&input, "problems.json", &json!([]));

    assert!(matches!(
        env.pipeline
            .process_batch(&input, v("v1.0.0"), "partial", &options()),
        Err(PipelineError::Config(_))
    ));
}

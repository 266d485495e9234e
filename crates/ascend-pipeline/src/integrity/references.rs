use crate::violation::{record_path, Rule, Violation};
use ascend_common::RecordBatch;
use regex::Regex;
use serde_json::Value;
use uuid::Uuid;

pub(super) fn check(
    batch: &RecordBatch,
    content_ref: &Regex,
    source_url: &Regex,
    violations: &mut Vec<Violation>,
) {
    for (index, problem) in batch.problems.iter().enumerate() {
        let base = record_path("problems", index);
        check_uuid(&base, "problem_id", &problem.problem_id, violations);

        for (name, pointer) in &problem.content_refs {
            let Some(pointer) = pointer else {
                continue;
            };
            if !content_ref.is_match(pointer) {
                violations.push(Violation::new(
                    format!("{base}.content_refs.{name}"),
                    Rule::ContentRef,
                    format!(
                        "pointer '{}' does not match {}",
                        pointer,
                        content_ref.as_str()
                    ),
                ));
            }
        }

        match problem.metadata.get("source_url") {
            None | Some(Value::Null) => {},
            Some(Value::String(url)) if source_url.is_match(url) => {},
            Some(other) => violations.push(Violation::new(
                format!("{base}.metadata.source_url"),
                Rule::SourceUrl,
                format!("expected an http(s) URL, got {}", other),
            )),
        }
    }

    for (index, contest) in batch.contests.iter().enumerate() {
        check_uuid(
            &record_path("contests", index),
            "contest_id",
            &contest.contest_id,
            violations,
        );
    }

    for (index, topic) in batch.topics.iter().enumerate() {
        check_uuid(&record_path("topics", index), "topic_id", &topic.topic_id, violations);
    }
}

fn check_uuid(base: &str, field: &str, value: &str, violations: &mut Vec<Violation>) {
    if let Err(e) = Uuid::parse_str(value) {
        violations.push(Violation::new(
            format!("{base}.{field}"),
            Rule::Uuid,
            format!("'{}' is not a valid UUID: {}", value, e),
        ));
    }
}

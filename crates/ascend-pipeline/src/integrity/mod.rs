//! Batch-level integrity rules
//!
//! Unlike schema validation these rules need the whole candidate batch in
//! memory. Every rule runs to completion and all findings are returned
//! together, so one rejection report covers everything that needs fixing.

mod duplicates;
mod orphans;
mod references;

use crate::error::{PipelineError, Result};
use crate::violation::Violation;
use ascend_common::RecordBatch;
use regex::Regex;
use tracing::debug;

/// Grammar for external content pointers, e.g. `r2://problems/leetcode/two-sum/description.md`
pub const CONTENT_REF_PATTERN: &str = r"^r2://[a-z0-9-]+/[\w/.-]+$";

/// Accepted shape of `metadata.source_url`
pub const SOURCE_URL_PATTERN: &str = r"^https?://[\w.-]+(?:/[\w./?%&=-]*)?$";

pub struct IntegrityChecker {
    content_ref: Regex,
    source_url: Regex,
}

impl IntegrityChecker {
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| {
                PipelineError::config(format!("Invalid integrity pattern '{pattern}': {e}"))
            })
        };

        Ok(Self {
            content_ref: compile(CONTENT_REF_PATTERN)?,
            source_url: compile(SOURCE_URL_PATTERN)?,
        })
    }

    /// Run every rule against the batch
    pub fn check(&self, batch: &RecordBatch) -> Vec<Violation> {
        let mut violations = Vec::new();

        duplicates::check(batch, &mut violations);
        let after_duplicates = violations.len();

        orphans::check(batch, &mut violations);
        let after_orphans = violations.len();

        references::check(batch, &self.content_ref, &self.source_url, &mut violations);

        debug!(
            duplicates = after_duplicates,
            orphans = after_orphans - after_duplicates,
            references = violations.len() - after_orphans,
            "Integrity check finished"
        );

        violations
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::violation::Rule;
    use ascend_common::{
        Contest, ContestType, Difficulty, Problem, Source, Topic, TopicCategory,
    };
    use serde_json::json;

    fn checker() -> IntegrityChecker {
        IntegrityChecker::new().unwrap()
    }

    fn two_sum() -> Problem {
        Problem::new(Source::Leetcode, "1", "two-sum", "Two Sum")
            .with_difficulty(Difficulty::Easy)
            .with_topics(["array", "hash-table"])
            .with_content_ref(
                "description",
                Some("r2://problems/leetcode/two-sum/description.md".to_string()),
            )
            .with_metadata("source_url", json!("https://leetcode.com/problems/two-sum/"))
    }

    fn topics() -> Vec<Topic> {
        vec![
            Topic::new("array", TopicCategory::Dsa),
            Topic::new("hash-table", TopicCategory::Dsa).with_parent("array"),
        ]
    }

    fn rules(violations: &[Violation]) -> Vec<Rule> {
        violations.iter().map(|v| v.rule).collect()
    }

    #[test]
    fn test_clean_batch() {
        let cf = Problem::new(Source::Codeforces, "1500A", "1500a", "Going Home")
            .with_rating(1800)
            .with_topics(["array"]);
        let contest = Contest::new(Source::Codeforces, "1500", "Round 1500", ContestType::Cf)
            .with_problem("1500A", "A");
        let batch = RecordBatch::new(vec![two_sum(), cf], vec![contest], topics());

        assert!(checker().check(&batch).is_empty());
    }

    #[test]
    fn test_duplicate_problem_reported_once_with_both_indices() {
        let batch = RecordBatch::new(vec![two_sum(), two_sum()], vec![], topics());

        let violations = checker().check(&batch);
        assert_eq!(violations.len(), 1, "{violations:?}");
        assert_eq!(violations[0].rule, Rule::Duplicate);
        assert!(violations[0].detail.contains("[0, 1]"), "{}", violations[0].detail);
    }

    #[test]
    fn test_orphan_topic() {
        let problem = two_sum().with_topics(["dp"]);
        let batch = RecordBatch::new(vec![problem], vec![], topics());

        let violations = checker().check(&batch);
        assert_eq!(rules(&violations), vec![Rule::OrphanTopic]);
        assert_eq!(violations[0].path, "problems[0].topics");
        assert!(violations[0].detail.contains("'dp'"));
    }

    #[test]
    fn test_orphan_contest_problem_respects_source() {
        // Same external id exists, but under a different source
        let lc = Problem::new(Source::Leetcode, "1500A", "x", "X");
        let contest = Contest::new(Source::Codeforces, "1500", "Round 1500", ContestType::Cf)
            .with_problem("1500A", "A");
        let batch = RecordBatch::new(vec![lc], vec![contest], vec![]);

        let violations = checker().check(&batch);
        assert_eq!(rules(&violations), vec![Rule::OrphanProblem]);
        assert_eq!(violations[0].path, "contests[0].problems[0]");
    }

    #[test]
    fn test_topic_cycle_and_orphan_parent() {
        let topics = vec![
            Topic::new("graphs", TopicCategory::Dsa).with_parent("trees"),
            Topic::new("trees", TopicCategory::Dsa).with_parent("graphs"),
            Topic::new("greedy", TopicCategory::Cp).with_parent("heuristics"),
            Topic::new("math", TopicCategory::Cp).with_parent("math"),
        ];
        let batch = RecordBatch::new(vec![], vec![], topics);

        let violations = checker().check(&batch);
        let mut found = rules(&violations);
        found.sort_by_key(|r| r.as_str().to_string());
        assert_eq!(found, vec![Rule::OrphanParent, Rule::TopicCycle, Rule::TopicCycle]);
    }

    #[test]
    fn test_reference_rules_collect_everything() {
        let mut problem = two_sum()
            .with_content_ref("editorial", Some("https://example.com/editorial".to_string()))
            .with_content_ref("hints", None)
            .with_metadata("source_url", json!("ftp://leetcode.com/two-sum"));
        problem.problem_id = "not-a-uuid".to_string();
        let mut topic = Topic::new("array", TopicCategory::Dsa);
        topic.topic_id = "1234".to_string();

        let batch = RecordBatch::new(vec![problem], vec![], vec![topic, topics()[1].clone()]);
        let violations = checker().check(&batch);

        let paths: Vec<&str> = violations.iter().map(|v| v.path.as_str()).collect();
        assert!(paths.contains(&"problems[0].content_refs.editorial"));
        assert!(paths.contains(&"problems[0].metadata.source_url"));
        assert!(paths.contains(&"problems[0].problem_id"));
        assert!(paths.contains(&"topics[0].topic_id"));
        assert_eq!(violations.len(), 4, "{violations:?}");
    }

    #[test]
    fn test_id_collision_between_distinct_records() {
        let a = Problem::new(Source::Leetcode, "1", "two-sum", "Two Sum");
        let mut b = Problem::new(Source::Leetcode, "2", "add-two-numbers", "Add Two Numbers");
        b.problem_id = a.problem_id.clone();
        let batch = RecordBatch::new(vec![a, b], vec![], vec![]);

        let violations = checker().check(&batch);
        assert_eq!(rules(&violations), vec![Rule::IdCollision]);
    }
}

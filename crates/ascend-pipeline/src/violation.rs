//! Validation findings shared by the schema and integrity stages

use serde::{Deserialize, Serialize};

/// Validation stage that produced a set of violations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Schema,
    Integrity,
}

impl Stage {
    pub fn as_str(&self) -> &str {
        match self {
            Stage::Schema => "schema",
            Stage::Integrity => "integrity",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule a record broke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    // Schema rules
    Required,
    Type,
    NotNull,
    Enum,
    Pattern,
    Malformed,
    Empty,

    // Integrity rules
    Duplicate,
    IdCollision,
    OrphanTopic,
    OrphanProblem,
    OrphanParent,
    TopicCycle,
    ContentRef,
    SourceUrl,
    Uuid,
}

impl Rule {
    pub fn as_str(&self) -> &str {
        match self {
            Rule::Required => "required",
            Rule::Type => "type",
            Rule::NotNull => "not_null",
            Rule::Enum => "enum",
            Rule::Pattern => "pattern",
            Rule::Malformed => "malformed",
            Rule::Empty => "empty",
            Rule::Duplicate => "duplicate",
            Rule::IdCollision => "id_collision",
            Rule::OrphanTopic => "orphan_topic",
            Rule::OrphanProblem => "orphan_problem",
            Rule::OrphanParent => "orphan_parent",
            Rule::TopicCycle => "topic_cycle",
            Rule::ContentRef => "content_ref",
            Rule::SourceUrl => "source_url",
            Rule::Uuid => "uuid",
        }
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One finding: where it is, which rule, and what was wrong
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Location inside the batch, e.g. `problems[3].slug`
    pub path: String,
    pub rule: Rule,
    pub detail: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, rule: Rule, detail: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            rule,
            detail: detail.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}] {}", self.path, self.rule, self.detail)
    }
}

/// `collection[index]` path prefix
pub fn record_path(collection: &str, index: usize) -> String {
    format!("{collection}[{index}]")
}

//! Canonical record model
//!
//! These are the platform-independent shapes produced by normalization and
//! consumed by validation, snapshots and destinations. Identifier fields are
//! kept as strings so malformed ids survive deserialization and can be
//! reported by the integrity checker instead of failing the whole batch.

use crate::error::CommonError;
use crate::ids;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

// ============================================================================
// Enumerations
// ============================================================================

/// Platform a record was normalized from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Leetcode,
    Codeforces,
    Other,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Leetcode, Source::Codeforces, Source::Other];

    pub fn as_str(self) -> &'static str {
        match self {
            Source::Leetcode => "leetcode",
            Source::Codeforces => "codeforces",
            Source::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

/// Contest format as reported by the contest listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContestType {
    Cf,
    Icpc,
    Ioi,
}

impl ContestType {
    pub const ALL: [ContestType; 3] = [ContestType::Cf, ContestType::Icpc, ContestType::Ioi];

    pub fn as_str(self) -> &'static str {
        match self {
            ContestType::Cf => "CF",
            ContestType::Icpc => "ICPC",
            ContestType::Ioi => "IOI",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TopicCategory {
    Dsa,
    Cp,
    SystemDesign,
    Other,
}

impl TopicCategory {
    pub const ALL: [TopicCategory; 4] = [
        TopicCategory::Dsa,
        TopicCategory::Cp,
        TopicCategory::SystemDesign,
        TopicCategory::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TopicCategory::Dsa => "dsa",
            TopicCategory::Cp => "cp",
            TopicCategory::SystemDesign => "system-design",
            TopicCategory::Other => "other",
        }
    }
}

macro_rules! impl_str_enum {
    ($ty:ident, $kind:literal) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = CommonError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $ty::ALL
                    .into_iter()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| CommonError::unknown_variant($kind, s))
            }
        }
    };
}

impl_str_enum!(Source, "source");
impl_str_enum!(Difficulty, "difficulty");
impl_str_enum!(ContestType, "contest type");
impl_str_enum!(TopicCategory, "topic category");

// ============================================================================
// Records
// ============================================================================

/// Canonical problem record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub problem_id: String,
    pub source: Source,
    pub external_id: String,
    pub slug: String,
    pub title: String,
    pub difficulty: Option<Difficulty>,
    pub rating: Option<i64>,
    #[serde(default)]
    pub topics: BTreeSet<String>,
    /// Logical name -> external storage pointer (`r2://bucket/path`)
    #[serde(default)]
    pub content_refs: BTreeMap<String, Option<String>>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Problem {
    /// Build a problem with its id derived from `(source, external_id)`
    pub fn new(
        source: Source,
        external_id: impl Into<String>,
        slug: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        let external_id = external_id.into();
        Self {
            problem_id: ids::problem_id(source, &external_id).to_string(),
            source,
            external_id,
            slug: slug.into(),
            title: title.into(),
            difficulty: None,
            rating: None,
            topics: BTreeSet::new(),
            content_refs: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    pub fn with_rating(mut self, rating: i64) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_content_ref(mut self, name: impl Into<String>, pointer: Option<String>) -> Self {
        self.content_refs.insert(name.into(), pointer);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// One problem slot inside a contest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestProblemRef {
    pub problem_external_id: String,
    /// Position label within the contest (`A`, `B1`, ...)
    pub index: String,
}

/// Canonical contest record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contest {
    pub contest_id: String,
    pub source: Source,
    pub external_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub contest_type: ContestType,
    #[serde(default)]
    pub problems: Vec<ContestProblemRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}

impl Contest {
    pub fn new(
        source: Source,
        external_id: impl Into<String>,
        name: impl Into<String>,
        contest_type: ContestType,
    ) -> Self {
        let external_id = external_id.into();
        Self {
            contest_id: ids::contest_id(source, &external_id).to_string(),
            source,
            external_id,
            name: name.into(),
            contest_type,
            problems: Vec::new(),
            duration_seconds: None,
            start_time: None,
            phase: None,
        }
    }

    pub fn with_problem(
        mut self,
        problem_external_id: impl Into<String>,
        index: impl Into<String>,
    ) -> Self {
        self.problems.push(ContestProblemRef {
            problem_external_id: problem_external_id.into(),
            index: index.into(),
        });
        self
    }
}

/// Topic node; `parent` links form a forest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub topic_id: String,
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    pub category: TopicCategory,
}

impl Topic {
    pub fn new(name: impl Into<String>, category: TopicCategory) -> Self {
        let name = name.into();
        Self {
            topic_id: ids::topic_id(&name).to_string(),
            name,
            parent: None,
            category,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

// ============================================================================
// Batches
// ============================================================================

/// Entity collections making up one snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Problem,
    Contest,
    Topic,
}

impl EntityKind {
    /// Snapshot file order; also the order entries appear in a manifest
    pub const ALL: [EntityKind; 3] = [EntityKind::Problem, EntityKind::Contest, EntityKind::Topic];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Problem => "problem",
            EntityKind::Contest => "contest",
            EntityKind::Topic => "topic",
        }
    }

    /// Collection name used for file names, record counts and error paths
    pub fn collection(self) -> &'static str {
        match self {
            EntityKind::Problem => "problems",
            EntityKind::Contest => "contests",
            EntityKind::Topic => "topics",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.json", self.collection())
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A full candidate batch, held in memory for batch-level checks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordBatch {
    #[serde(default)]
    pub problems: Vec<Problem>,
    #[serde(default)]
    pub contests: Vec<Contest>,
    #[serde(default)]
    pub topics: Vec<Topic>,
}

impl RecordBatch {
    pub fn new(problems: Vec<Problem>, contests: Vec<Contest>, topics: Vec<Topic>) -> Self {
        Self {
            problems,
            contests,
            topics,
        }
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Problem => self.problems.len(),
            EntityKind::Contest => self.contests.len(),
            EntityKind::Topic => self.topics.len(),
        }
    }

    /// Record counts keyed by collection name
    pub fn record_counts(&self) -> BTreeMap<String, usize> {
        EntityKind::ALL
            .into_iter()
            .map(|kind| (kind.collection().to_string(), self.count(kind)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        EntityKind::ALL.into_iter().all(|kind| self.count(kind) == 0)
    }
}

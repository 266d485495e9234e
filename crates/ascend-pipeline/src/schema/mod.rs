//! Versioned record schemas
//!
//! A [`SchemaRegistry`] maps schema version identifiers to immutable
//! [`SchemaDefinition`]s. Validation is a pure function over a JSON record
//! and a definition; asking for a version that was never published is a
//! configuration error.

mod builtin;
mod validator;

use crate::batch::RawBatch;
use crate::error::{PipelineError, Result};
use crate::violation::{Rule, Violation};
use ascend_common::EntityKind;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

pub use builtin::CURRENT_SCHEMA_VERSION;

/// JSON shape a field must have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    /// String holding a UUID; syntax is checked by the integrity stage
    Uuid,
    /// RFC 3339 timestamp string
    Timestamp,
    StringList,
    /// Object whose values are strings or null
    StringMap,
    Object,
    /// Array of `{problem_external_id, index}` objects
    ProblemRefList,
}

impl FieldKind {
    pub fn describe(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Uuid => "uuid string",
            FieldKind::Timestamp => "RFC 3339 timestamp",
            FieldKind::StringList => "array of strings",
            FieldKind::StringMap => "object of string or null values",
            FieldKind::Object => "object",
            FieldKind::ProblemRefList => "array of problem references",
        }
    }
}

/// Constraints for one top-level field
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    pub nullable: bool,
    pub non_empty: bool,
    /// Allowed values for enum-like string fields
    pub allowed: Option<Vec<String>>,
    /// Applied to the string, or to each item of a string list
    pub pattern: Option<Regex>,
}

impl FieldRule {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            nullable: false,
            non_empty: false,
            allowed: None,
            pattern: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn non_empty(mut self) -> Self {
        self.non_empty = true;
        self
    }

    pub fn one_of<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn pattern(mut self, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| {
            PipelineError::config(format!("Invalid pattern for field '{}': {}", self.name, e))
        })?;
        self.pattern = Some(regex);
        Ok(self)
    }
}

/// One published schema version covering every entity kind
#[derive(Debug, Clone)]
pub struct SchemaDefinition {
    pub version: String,
    entities: BTreeMap<EntityKind, Vec<FieldRule>>,
}

impl SchemaDefinition {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            entities: BTreeMap::new(),
        }
    }

    pub fn with_entity(mut self, kind: EntityKind, fields: Vec<FieldRule>) -> Self {
        self.entities.insert(kind, fields);
        self
    }

    pub fn fields(&self, kind: EntityKind) -> &[FieldRule] {
        self.entities.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Check one record; `path` prefixes every reported field path
    pub fn validate_record(&self, kind: EntityKind, path: &str, record: &Value) -> Vec<Violation> {
        validator::validate_record(self.fields(kind), path, record)
    }
}

/// Registry of published schemas
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, SchemaDefinition>,
}

impl SchemaRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in schema published
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::new();
        registry.publish(builtin::v1_0_0()?)?;
        Ok(registry)
    }

    /// Publish a schema; published versions can never be replaced
    pub fn publish(&mut self, schema: SchemaDefinition) -> Result<()> {
        if self.schemas.contains_key(&schema.version) {
            return Err(PipelineError::config(format!(
                "Schema {} is already published and cannot be changed",
                schema.version
            )));
        }
        self.schemas.insert(schema.version.clone(), schema);
        Ok(())
    }

    pub fn get(&self, version: &str) -> Result<&SchemaDefinition> {
        self.schemas.get(version).ok_or_else(|| {
            PipelineError::config(format!(
                "Unknown schema version '{}'. Published versions: {}",
                version,
                self.versions().join(", ")
            ))
        })
    }

    pub fn versions(&self) -> Vec<String> {
        self.schemas.keys().cloned().collect()
    }

    /// Validate a single record against a published version
    pub fn validate(&self, version: &str, kind: EntityKind, record: &Value) -> Result<Vec<Violation>> {
        Ok(self.get(version)?.validate_record(kind, kind.collection(), record))
    }

    /// Validate every record of a raw batch, collecting all findings
    pub fn validate_batch(&self, version: &str, batch: &RawBatch) -> Result<Vec<Violation>> {
        let schema = self.get(version)?;
        let mut violations = batch.malformed().to_vec();

        let problems_file = EntityKind::Problem.file_name();
        if !batch.has_problems() && !violations.iter().any(|v| v.path == problems_file) {
            violations.push(Violation::new(
                EntityKind::Problem.collection(),
                Rule::Empty,
                "batch contains no problems",
            ));
        }

        for kind in EntityKind::ALL {
            for (index, record) in batch.records(kind).iter().enumerate() {
                let path = crate::violation::record_path(kind.collection(), index);
                violations.extend(schema.validate_record(kind, &path, record));
            }
        }

        Ok(violations)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::builtin().unwrap()
    }

    fn valid_problem() -> Value {
        json!({
            "problem_id": "3f1b6a39-5a4c-5b9e-9b6f-0c3c1f2a9e10",
            "source": "leetcode",
            "external_id": "1",
            "slug": "two-sum",
            "title": "Two Sum",
            "difficulty": "easy",
            "rating": null,
            "topics": ["array", "hash-table"],
            "content_refs": {"description": "r2://problems/leetcode/two-sum/description.md"},
            "metadata": {"acceptance_rate": 0.52}
        })
    }

    #[test]
    fn test_valid_problem_has_no_violations() {
        let violations = registry()
            .validate(CURRENT_SCHEMA_VERSION, EntityKind::Problem, &valid_problem())
            .unwrap();
        assert!(violations.is_empty(), "{violations:?}");
    }

    #[test]
    fn test_unknown_version_is_config_error() {
        let err = registry()
            .validate("v9.9.9", EntityKind::Problem, &valid_problem())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_published_schema_is_immutable() {
        let mut registry = registry();
        let err = registry
            .publish(SchemaDefinition::new(CURRENT_SCHEMA_VERSION))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
        assert!(!registry
            .get(CURRENT_SCHEMA_VERSION)
            .unwrap()
            .fields(EntityKind::Problem)
            .is_empty());
    }

    #[test]
    fn test_reports_every_broken_field() {
        let mut record = valid_problem();
        record["slug"] = json!("Two Sum");
        record["difficulty"] = json!("extreme");
        record["rating"] = json!("high");
        record.as_object_mut().unwrap().remove("title");

        let violations = registry()
            .validate(CURRENT_SCHEMA_VERSION, EntityKind::Problem, &record)
            .unwrap();
        let rules: Vec<(String, Rule)> =
            violations.iter().map(|v| (v.path.clone(), v.rule)).collect();

        assert!(rules.contains(&("problems.slug".to_string(), Rule::Pattern)));
        assert!(rules.contains(&("problems.difficulty".to_string(), Rule::Enum)));
        assert!(rules.contains(&("problems.rating".to_string(), Rule::Type)));
        assert!(rules.contains(&("problems.title".to_string(), Rule::Required)));
        assert_eq!(violations.len(), 4);
    }

    #[test]
    fn test_contest_type_enum_and_refs() {
        let contest = json!({
            "contest_id": "5b0ad1d4-6b37-5d59-8d9c-0d6c7a5ad0f3",
            "source": "codeforces",
            "external_id": "1500",
            "name": "Codeforces Round 1500",
            "type": "OPEN",
            "problems": [{"problem_external_id": "1500A"}, "1500B"]
        });

        let violations = registry()
            .validate(CURRENT_SCHEMA_VERSION, EntityKind::Contest, &contest)
            .unwrap();
        let paths: Vec<&str> = violations.iter().map(|v| v.path.as_str()).collect();

        assert!(paths.contains(&"contests.type"));
        assert!(paths.contains(&"contests.problems[0].index"));
        assert!(paths.contains(&"contests.problems[1]"));
    }

    #[test]
    fn test_topic_name_must_be_kebab_case() {
        let topic = json!({
            "topic_id": "2c8a4d7e-1f0b-5c5e-a1c2-7c5a9d4e3b21",
            "name": "Dynamic_Programming",
            "parent": null,
            "category": "dsa"
        });

        let violations = registry()
            .validate(CURRENT_SCHEMA_VERSION, EntityKind::Topic, &topic)
            .unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule, Rule::Pattern);
        assert_eq!(violations[0].path, "topics.name");
    }

    #[test]
    fn test_batch_without_problems_is_flagged_empty() {
        let batch = RawBatch::new(vec![], vec![], vec![]);
        let violations = registry()
            .validate_batch(CURRENT_SCHEMA_VERSION, &batch)
            .unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule, Rule::Empty);
        assert_eq!(violations[0].path, "problems");

        let batch = RawBatch::new(vec![valid_problem()], vec![], vec![]);
        let violations = registry()
            .validate_batch(CURRENT_SCHEMA_VERSION, &batch)
            .unwrap();
        assert!(violations.iter().all(|v| v.rule != Rule::Empty));
    }

    #[test]
    fn test_non_object_record() {
        let violations = registry()
            .validate(CURRENT_SCHEMA_VERSION, EntityKind::Topic, &json!(["dp"]))
            .unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule, Rule::Type);
    }
}

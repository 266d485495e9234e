//! Raw input batches
//!
//! A batch directory holds `problems.json`, `topics.json` and optionally
//! `contests.json`, each a JSON array of canonical records. Records stay as
//! untyped JSON until they pass schema validation.

use crate::error::{PipelineError, Result};
use crate::violation::{record_path, Rule, Violation};
use ascend_common::{EntityKind, RecordBatch};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Default)]
pub struct RawBatch {
    problems: Vec<Value>,
    contests: Vec<Value>,
    topics: Vec<Value>,
    /// Files that exist but are not a JSON array of records
    malformed: Vec<Violation>,
}

impl RawBatch {
    pub fn new(problems: Vec<Value>, contests: Vec<Value>, topics: Vec<Value>) -> Self {
        Self {
            problems,
            contests,
            topics,
            malformed: Vec::new(),
        }
    }

    /// Load a batch directory
    ///
    /// A missing required file is a configuration error. Unparseable files
    /// are kept as findings so they end up in the rejection report together
    /// with everything else.
    #[instrument]
    pub fn from_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(PipelineError::config(format!(
                "Batch directory '{}' does not exist",
                dir.display()
            )));
        }

        let mut batch = Self::default();
        for kind in EntityKind::ALL {
            let file_name = kind.file_name();
            let path = dir.join(&file_name);

            if !path.exists() {
                if kind == EntityKind::Contest {
                    debug!(file = %file_name, "Optional batch file not present");
                    continue;
                }
                return Err(PipelineError::config(format!(
                    "Batch file '{}' is missing",
                    path.display()
                )));
            }

            let content = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<Value>(&content) {
                Ok(Value::Array(records)) => {
                    debug!(file = %file_name, records = records.len(), "Loaded batch file");
                    *batch.records_mut(kind) = records;
                },
                Ok(other) => batch.malformed.push(Violation::new(
                    file_name,
                    Rule::Malformed,
                    format!("expected a JSON array of records, got {}", json_kind(&other)),
                )),
                Err(e) => batch.malformed.push(Violation::new(
                    file_name,
                    Rule::Malformed,
                    format!("invalid JSON: {e}"),
                )),
            }
        }

        Ok(batch)
    }

    /// Raw form of already typed records
    pub fn from_records(records: &RecordBatch) -> Result<Self> {
        Ok(Self::new(
            to_values(&records.problems)?,
            to_values(&records.contests)?,
            to_values(&records.topics)?,
        ))
    }

    pub fn records(&self, kind: EntityKind) -> &[Value] {
        match kind {
            EntityKind::Problem => &self.problems,
            EntityKind::Contest => &self.contests,
            EntityKind::Topic => &self.topics,
        }
    }

    fn records_mut(&mut self, kind: EntityKind) -> &mut Vec<Value> {
        match kind {
            EntityKind::Problem => &mut self.problems,
            EntityKind::Contest => &mut self.contests,
            EntityKind::Topic => &mut self.topics,
        }
    }

    pub fn malformed(&self) -> &[Violation] {
        &self.malformed
    }

    pub fn len(&self) -> usize {
        EntityKind::ALL.into_iter().map(|k| self.records(k).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A batch without problems has nothing to publish
    pub fn has_problems(&self) -> bool {
        !self.problems.is_empty()
    }

    /// Convert schema-valid records into the typed model
    pub fn to_records(&self) -> std::result::Result<RecordBatch, Vec<Violation>> {
        let mut violations = Vec::new();
        let problems = typed(&self.problems, EntityKind::Problem, &mut violations);
        let contests = typed(&self.contests, EntityKind::Contest, &mut violations);
        let topics = typed(&self.topics, EntityKind::Topic, &mut violations);

        if violations.is_empty() {
            Ok(RecordBatch::new(problems, contests, topics))
        } else {
            Err(violations)
        }
    }
}

fn typed<T: DeserializeOwned>(
    values: &[Value],
    kind: EntityKind,
    violations: &mut Vec<Violation>,
) -> Vec<T> {
    values
        .iter()
        .enumerate()
        .filter_map(|(index, value)| match T::deserialize(value) {
            Ok(record) => Some(record),
            Err(e) => {
                violations.push(Violation::new(
                    record_path(kind.collection(), index),
                    Rule::Malformed,
                    e.to_string(),
                ));
                None
            },
        })
        .collect()
}

fn to_values<T: serde::Serialize>(records: &[T]) -> Result<Vec<Value>> {
    records
        .iter()
        .map(|r| serde_json::to_value(r).map_err(PipelineError::from))
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_dir_contests_optional() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("problems.json"), "[]").unwrap();
        std::fs::write(dir.path().join("topics.json"), r#"[{"name": "dp"}]"#).unwrap();

        let batch = RawBatch::from_dir(dir.path()).unwrap();
        assert_eq!(batch.records(EntityKind::Topic).len(), 1);
        assert!(batch.records(EntityKind::Contest).is_empty());
        assert!(batch.malformed().is_empty());
    }

    #[test]
    fn test_from_dir_missing_required_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("problems.json"), "[]").unwrap();

        let err = RawBatch::from_dir(dir.path()).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_from_dir_records_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("problems.json"), "{not json").unwrap();
        std::fs::write(dir.path().join("topics.json"), r#"{"name": "dp"}"#).unwrap();

        let batch = RawBatch::from_dir(dir.path()).unwrap();
        let paths: Vec<&str> = batch.malformed().iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, vec!["problems.json", "topics.json"]);
    }

    #[test]
    fn test_to_records_reports_index() {
        let batch = RawBatch::new(vec![], vec![], vec![json!({"name": "dp"})]);
        let violations = batch.to_records().unwrap_err();
        assert_eq!(violations[0].path, "topics[0]");
        assert_eq!(violations[0].rule, Rule::Malformed);
    }
}

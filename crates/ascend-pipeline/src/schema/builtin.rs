//! Built-in schema versions

use super::{FieldKind, FieldRule, SchemaDefinition};
use crate::error::Result;
use ascend_common::{ContestType, Difficulty, EntityKind, Source, TopicCategory};

/// Schema version used when none is configured
pub const CURRENT_SCHEMA_VERSION: &str = "v1.0.0";

const SLUG_PATTERN: &str = r"^[a-z0-9-]+$";
const KEBAB_CASE_PATTERN: &str = r"^[a-z0-9]+(?:-[a-z0-9]+)*$";

fn sources() -> impl Iterator<Item = &'static str> {
    Source::ALL.into_iter().map(Source::as_str)
}

pub(super) fn v1_0_0() -> Result<SchemaDefinition> {
    let problem = vec![
        FieldRule::new("problem_id", FieldKind::Uuid),
        FieldRule::new("source", FieldKind::String).one_of(sources()),
        FieldRule::new("external_id", FieldKind::String).non_empty(),
        FieldRule::new("slug", FieldKind::String)
            .non_empty()
            .pattern(SLUG_PATTERN)?,
        FieldRule::new("title", FieldKind::String).non_empty(),
        FieldRule::new("difficulty", FieldKind::String)
            .nullable()
            .one_of(Difficulty::ALL.into_iter().map(Difficulty::as_str)),
        FieldRule::new("rating", FieldKind::Integer).nullable(),
        FieldRule::new("topics", FieldKind::StringList).pattern(KEBAB_CASE_PATTERN)?,
        FieldRule::new("content_refs", FieldKind::StringMap).optional(),
        FieldRule::new("metadata", FieldKind::Object).optional(),
    ];

    let contest = vec![
        FieldRule::new("contest_id", FieldKind::Uuid),
        FieldRule::new("source", FieldKind::String).one_of(sources()),
        FieldRule::new("external_id", FieldKind::String).non_empty(),
        FieldRule::new("name", FieldKind::String).non_empty(),
        FieldRule::new("type", FieldKind::String)
            .one_of(ContestType::ALL.into_iter().map(ContestType::as_str)),
        FieldRule::new("problems", FieldKind::ProblemRefList),
        FieldRule::new("duration_seconds", FieldKind::Integer)
            .optional()
            .nullable(),
        FieldRule::new("start_time", FieldKind::Timestamp)
            .optional()
            .nullable(),
        FieldRule::new("phase", FieldKind::String).optional().nullable(),
    ];

    let topic = vec![
        FieldRule::new("topic_id", FieldKind::Uuid),
        FieldRule::new("name", FieldKind::String).pattern(KEBAB_CASE_PATTERN)?,
        FieldRule::new("parent", FieldKind::String)
            .optional()
            .nullable()
            .pattern(KEBAB_CASE_PATTERN)?,
        FieldRule::new("category", FieldKind::String)
            .one_of(TopicCategory::ALL.into_iter().map(TopicCategory::as_str)),
    ];

    Ok(SchemaDefinition::new(CURRENT_SCHEMA_VERSION)
        .with_entity(EntityKind::Problem, problem)
        .with_entity(EntityKind::Contest, contest)
        .with_entity(EntityKind::Topic, topic))
}

//! Deterministic record identifiers
//!
//! Ids are UUIDv5 values under a fixed namespace, so normalizing the same
//! source record twice always yields the same id.

use crate::model::Source;
use uuid::Uuid;

/// Namespace for every Ascend record id
pub const NAMESPACE: Uuid = Uuid::from_u128(0xa5ce0d00_0000_4000_8000_000000000000);

fn derive(name: &str) -> Uuid {
    Uuid::new_v5(&NAMESPACE, name.as_bytes())
}

pub fn problem_id(source: Source, external_id: &str) -> Uuid {
    derive(&format!("problem:{}:{}", source.as_str(), external_id))
}

pub fn contest_id(source: Source, external_id: &str) -> Uuid {
    derive(&format!("contest:{}:{}", source.as_str(), external_id))
}

pub fn topic_id(name: &str) -> Uuid {
    derive(&format!("topic:{name}"))
}

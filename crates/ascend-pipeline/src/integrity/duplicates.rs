use crate::violation::{record_path, Rule, Violation};
use ascend_common::{EntityKind, RecordBatch, Source};
use std::collections::{BTreeMap, BTreeSet};

pub(super) fn check(batch: &RecordBatch, violations: &mut Vec<Violation>) {
    report_groups(
        EntityKind::Problem,
        group(batch.problems.iter().map(|p| (p.source, p.external_id.as_str()))),
        violations,
    );
    report_groups(
        EntityKind::Contest,
        group(batch.contests.iter().map(|c| (c.source, c.external_id.as_str()))),
        violations,
    );

    let mut topic_groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (index, topic) in batch.topics.iter().enumerate() {
        topic_groups.entry(topic.name.as_str()).or_default().push(index);
    }
    for (name, indices) in topic_groups.into_iter().filter(|(_, i)| i.len() > 1) {
        violations.push(Violation::new(
            record_path(EntityKind::Topic.collection(), indices[0]),
            Rule::Duplicate,
            format!("topic name '{}' appears at indices {:?}", name, indices),
        ));
    }

    check_id_collisions(batch, violations);
}

fn group<'a>(keys: impl Iterator<Item = (Source, &'a str)>) -> BTreeMap<(Source, &'a str), Vec<usize>> {
    let mut groups: BTreeMap<(Source, &str), Vec<usize>> = BTreeMap::new();
    for (index, key) in keys.enumerate() {
        groups.entry(key).or_default().push(index);
    }
    groups
}

fn report_groups(
    kind: EntityKind,
    groups: BTreeMap<(Source, &str), Vec<usize>>,
    violations: &mut Vec<Violation>,
) {
    for ((source, external_id), indices) in groups.into_iter().filter(|(_, i)| i.len() > 1) {
        violations.push(Violation::new(
            record_path(kind.collection(), indices[0]),
            Rule::Duplicate,
            format!(
                "(source={}, external_id={}) appears at indices {:?}",
                source, external_id, indices
            ),
        ));
    }
}

/// Same id carried by records with different natural keys
fn check_id_collisions(batch: &RecordBatch, violations: &mut Vec<Violation>) {
    // id -> natural keys and the first path each was seen at
    let mut owners: BTreeMap<&str, BTreeMap<String, String>> = BTreeMap::new();

    let problems = batch.problems.iter().enumerate().map(|(i, p)| {
        (
            p.problem_id.as_str(),
            format!("problem:{}:{}", p.source, p.external_id),
            format!("{}.problem_id", record_path("problems", i)),
        )
    });
    let contests = batch.contests.iter().enumerate().map(|(i, c)| {
        (
            c.contest_id.as_str(),
            format!("contest:{}:{}", c.source, c.external_id),
            format!("{}.contest_id", record_path("contests", i)),
        )
    });
    let topics = batch.topics.iter().enumerate().map(|(i, t)| {
        (
            t.topic_id.as_str(),
            format!("topic:{}", t.name),
            format!("{}.topic_id", record_path("topics", i)),
        )
    });

    for (id, key, path) in problems.chain(contests).chain(topics) {
        owners.entry(id).or_default().entry(key).or_insert(path);
    }

    for (id, keys) in owners.into_iter().filter(|(_, keys)| keys.len() > 1) {
        let paths: BTreeSet<&String> = keys.values().collect();
        let first = paths.iter().next().map(|p| p.as_str()).unwrap_or_default();
        violations.push(Violation::new(
            first,
            Rule::IdCollision,
            format!(
                "id {} is shared by distinct records {:?}",
                id,
                keys.keys().collect::<Vec<_>>()
            ),
        ));
    }
}

use crate::violation::{record_path, Rule, Violation};
use ascend_common::{RecordBatch, Source};
use std::collections::{BTreeSet, HashMap, HashSet};

pub(super) fn check(batch: &RecordBatch, violations: &mut Vec<Violation>) {
    let topic_names: HashSet<&str> = batch.topics.iter().map(|t| t.name.as_str()).collect();

    for (index, problem) in batch.problems.iter().enumerate() {
        for topic in problem.topics.iter().filter(|t| !topic_names.contains(t.as_str())) {
            violations.push(Violation::new(
                format!("{}.topics", record_path("problems", index)),
                Rule::OrphanTopic,
                format!("topic '{}' is not defined in this batch", topic),
            ));
        }
    }

    let problem_keys: HashSet<(Source, &str)> = batch
        .problems
        .iter()
        .map(|p| (p.source, p.external_id.as_str()))
        .collect();

    for (index, contest) in batch.contests.iter().enumerate() {
        for (slot, reference) in contest.problems.iter().enumerate() {
            if !problem_keys.contains(&(contest.source, reference.problem_external_id.as_str())) {
                violations.push(Violation::new(
                    format!("{}.problems[{}]", record_path("contests", index), slot),
                    Rule::OrphanProblem,
                    format!(
                        "problem (source={}, external_id={}) at index {} is not in this batch",
                        contest.source, reference.problem_external_id, reference.index
                    ),
                ));
            }
        }
    }

    check_topic_forest(batch, &topic_names, violations);
}

/// Parents must exist and parent links must not loop
fn check_topic_forest(
    batch: &RecordBatch,
    topic_names: &HashSet<&str>,
    violations: &mut Vec<Violation>,
) {
    let mut parents: HashMap<&str, &str> = HashMap::new();
    let mut first_index: HashMap<&str, usize> = HashMap::new();

    for (index, topic) in batch.topics.iter().enumerate() {
        first_index.entry(topic.name.as_str()).or_insert(index);
        let Some(parent) = topic.parent.as_deref() else {
            continue;
        };
        if !topic_names.contains(parent) {
            violations.push(Violation::new(
                format!("{}.parent", record_path("topics", index)),
                Rule::OrphanParent,
                format!("parent topic '{}' is not defined in this batch", parent),
            ));
            continue;
        }
        parents.entry(topic.name.as_str()).or_insert(parent);
    }

    // Walk each chain once; names on the current walk that reappear form a cycle
    let mut finished: HashSet<&str> = HashSet::new();
    for topic in &batch.topics {
        let mut walk: Vec<&str> = Vec::new();
        let mut current = Some(topic.name.as_str());

        while let Some(name) = current {
            if finished.contains(name) {
                break;
            }
            if let Some(start) = walk.iter().position(|n| *n == name) {
                let cycle: BTreeSet<&str> = walk[start..].iter().copied().collect();
                let anchor = cycle
                    .iter()
                    .filter_map(|n| first_index.get(n))
                    .min()
                    .copied()
                    .unwrap_or_default();
                violations.push(Violation::new(
                    format!("{}.parent", record_path("topics", anchor)),
                    Rule::TopicCycle,
                    format!(
                        "parent links form a cycle: {}",
                        walk[start..]
                            .iter()
                            .chain(std::iter::once(&name))
                            .copied()
                            .collect::<Vec<_>>()
                            .join(" -> ")
                    ),
                ));
                break;
            }
            walk.push(name);
            current = parents.get(name).copied();
        }

        finished.extend(walk);
    }
}

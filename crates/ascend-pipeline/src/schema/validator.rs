use super::{FieldKind, FieldRule};
use crate::violation::{Rule, Violation};
use serde_json::{Map, Value};

const MAX_ACTUAL_LEN: usize = 80;

/// Compact rendering of an offending value for error details
fn render(value: &Value) -> String {
    let rendered = value.to_string();
    if rendered.chars().count() <= MAX_ACTUAL_LEN {
        return rendered;
    }
    let truncated: String = rendered.chars().take(MAX_ACTUAL_LEN).collect();
    format!("{truncated}...")
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_violation(path: &str, kind: FieldKind, value: &Value) -> Violation {
    Violation::new(
        path,
        Rule::Type,
        format!("expected {}, got {} {}", kind.describe(), json_type(value), render(value)),
    )
}

pub(super) fn validate_record(fields: &[FieldRule], path: &str, record: &Value) -> Vec<Violation> {
    let Some(object) = record.as_object() else {
        return vec![Violation::new(
            path,
            Rule::Type,
            format!("expected object, got {} {}", json_type(record), render(record)),
        )];
    };

    fields
        .iter()
        .flat_map(|rule| validate_field(rule, path, object))
        .collect()
}

/// Violations for one field; at most one per location
fn validate_field(rule: &FieldRule, path: &str, object: &Map<String, Value>) -> Vec<Violation> {
    let field_path = format!("{path}.{}", rule.name);

    let value = match object.get(&rule.name) {
        None if rule.required => {
            return vec![Violation::new(
                field_path,
                Rule::Required,
                format!("missing required field '{}'", rule.name),
            )];
        },
        None => return Vec::new(),
        Some(Value::Null) if rule.nullable => return Vec::new(),
        Some(Value::Null) => {
            return vec![Violation::new(
                field_path,
                Rule::NotNull,
                format!("expected {}, got null", rule.kind.describe()),
            )];
        },
        Some(value) => value,
    };

    match rule.kind {
        FieldKind::String | FieldKind::Uuid => check_string(rule, &field_path, value),
        FieldKind::Timestamp => check_timestamp(&field_path, value),
        FieldKind::Integer if value.is_i64() => Vec::new(),
        FieldKind::Integer => vec![type_violation(&field_path, rule.kind, value)],
        FieldKind::StringList => check_string_list(rule, &field_path, value),
        FieldKind::StringMap => check_string_map(&field_path, value),
        FieldKind::Object => match value {
            Value::Object(_) => Vec::new(),
            other => vec![type_violation(&field_path, rule.kind, other)],
        },
        FieldKind::ProblemRefList => check_problem_refs(&field_path, value),
    }
}

fn check_string(rule: &FieldRule, path: &str, value: &Value) -> Vec<Violation> {
    let Some(text) = value.as_str() else {
        return vec![type_violation(path, rule.kind, value)];
    };

    if rule.non_empty && text.trim().is_empty() {
        return vec![Violation::new(path, Rule::Pattern, "expected non-empty string")];
    }

    if let Some(allowed) = &rule.allowed {
        if !allowed.iter().any(|a| a == text) {
            return vec![Violation::new(
                path,
                Rule::Enum,
                format!("expected one of [{}], got {}", allowed.join(", "), render(value)),
            )];
        }
    }

    if let Some(pattern) = &rule.pattern {
        if !pattern.is_match(text) {
            return vec![Violation::new(
                path,
                Rule::Pattern,
                format!("expected match for {}, got {}", pattern.as_str(), render(value)),
            )];
        }
    }

    Vec::new()
}

fn check_timestamp(path: &str, value: &Value) -> Vec<Violation> {
    match value.as_str() {
        Some(text) if chrono::DateTime::parse_from_rfc3339(text).is_ok() => Vec::new(),
        _ => vec![type_violation(path, FieldKind::Timestamp, value)],
    }
}

fn check_string_list(rule: &FieldRule, path: &str, value: &Value) -> Vec<Violation> {
    let Some(items) = value.as_array() else {
        return vec![type_violation(path, rule.kind, value)];
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let item_path = format!("{path}[{i}]");
            match item.as_str() {
                None => Some(type_violation(&item_path, FieldKind::String, item)),
                Some(text) => match &rule.pattern {
                    Some(pattern) if !pattern.is_match(text) => Some(Violation::new(
                        item_path,
                        Rule::Pattern,
                        format!("expected match for {}, got {}", pattern.as_str(), render(item)),
                    )),
                    _ => None,
                },
            }
        })
        .collect()
}

fn check_string_map(path: &str, value: &Value) -> Vec<Violation> {
    let Some(map) = value.as_object() else {
        return vec![type_violation(path, FieldKind::StringMap, value)];
    };

    map.iter()
        .filter(|(_, v)| !(v.is_string() || v.is_null()))
        .map(|(key, v)| type_violation(&format!("{path}.{key}"), FieldKind::String, v))
        .collect()
}

fn check_problem_refs(path: &str, value: &Value) -> Vec<Violation> {
    let Some(items) = value.as_array() else {
        return vec![type_violation(path, FieldKind::ProblemRefList, value)];
    };

    let mut violations = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let item_path = format!("{path}[{i}]");
        let Some(object) = item.as_object() else {
            violations.push(type_violation(&item_path, FieldKind::Object, item));
            continue;
        };

        for key in ["problem_external_id", "index"] {
            match object.get(key) {
                Some(Value::String(s)) if !s.trim().is_empty() => {},
                Some(other) => violations.push(type_violation(
                    &format!("{item_path}.{key}"),
                    FieldKind::String,
                    other,
                )),
                None => violations.push(Violation::new(
                    format!("{item_path}.{key}"),
                    Rule::Required,
                    format!("missing required field '{key}'"),
                )),
            }
        }
    }
    violations
}

//! Condition key parsing.
//!
//! A key is `<field spec>[<whitespace>]<operator token>`, where the field spec is
//! a column name, a column with a JSON path (`data ->> name`, `data #> '{a,b}'`)
//! or a verbatim SQL expression containing `"`.

use super::operator::{self, ValueMutator};
use crate::{Result, TesseraError};

/// Parsed form of a condition key.
#[derive(Debug, Clone)]
pub struct ConditionKey {
    /// Column name (or the verbatim expression)
    pub field: String,
    /// SQL reference to the field, quoted and mutated
    pub quoted_field: String,
    /// SQL operator
    pub operator: &'static str,
    pub mutator: Option<ValueMutator>,
    /// True when the operator wrapped the field (e.g. `LOWER(...)`)
    pub field_mutated: bool,
}

const JSON_PATH_OPERATORS: [&str; 4] = ["->>", "#>>", "->", "#>"];

/// Parses a raw condition key.
///
/// The operator is the longest suffix of the trimmed key that is a registered
/// token; without one the operator is `=` and the whole key is the field.
///
/// Word operators (`like`, `ilike`, `is not`, `similar to`, ...) only match
/// after whitespace, so `"alike"` is the column `alike` compared with `=`,
/// never `a LIKE`.
pub fn parse_key(raw: &str) -> Result<ConditionKey> {
    let key = raw.trim();
    let (spec, descriptor) = split_operator(key);

    if spec.is_empty() {
        return Err(TesseraError::InvalidConditionKey(raw.to_string()));
    }

    let (field, quoted_field) = if spec.contains('"') {
        (spec.to_string(), spec.to_string())
    } else if let Some(path_start) = find_json_path(spec) {
        let base = spec[..path_start].trim_end();
        if base.is_empty() {
            return Err(TesseraError::InvalidConditionKey(raw.to_string()));
        }
        let path = render_json_path(&spec[path_start..], raw)?;
        (base.to_string(), format!("\"{}\"{}", base, path))
    } else {
        (spec.to_string(), format!("\"{}\"", spec))
    };

    let field_mutator = descriptor.and_then(|op| op.field_mutator);
    let quoted_field = match field_mutator {
        Some(mutate) => mutate(&field, &quoted_field),
        None => quoted_field,
    };

    Ok(ConditionKey {
        field,
        quoted_field,
        operator: descriptor.map(|op| op.sql).unwrap_or("="),
        mutator: descriptor.and_then(|op| op.value_mutator),
        field_mutated: field_mutator.is_some(),
    })
}

/// Returns the field spec and the matched operator, if any.
fn split_operator(key: &str) -> (&str, Option<&'static operator::OperatorDescriptor>) {
    // Ascending start index visits the longest suffix first.
    for (start, _) in key.char_indices() {
        let Some(op) = operator::lookup(&key[start..]) else {
            continue;
        };
        let head = &key[..start];
        if op.is_word() && !head.ends_with(char::is_whitespace) {
            continue;
        }
        return (head.trim_end(), Some(op));
    }
    (key, None)
}

/// Byte index of the first JSON path operator in `spec`.
fn find_json_path(spec: &str) -> Option<usize> {
    spec.char_indices()
        .find(|&(i, _)| path_operator_at(spec, i).is_some())
        .map(|(i, _)| i)
}

fn path_operator_at(spec: &str, index: usize) -> Option<&'static str> {
    let rest = &spec[index..];
    JSON_PATH_OPERATORS.into_iter().find(|op| rest.starts_with(op))
}

/// Renders `->> a -> 0 #> '{x,y}'` as `->>'a'->0#>'{x,y}'`.
fn render_json_path(path: &str, raw: &str) -> Result<String> {
    let mut rendered = String::new();
    let mut rest = path;

    while let Some(op) = path_operator_at(rest, 0) {
        rest = &rest[op.len()..];
        let end = find_json_path(rest).unwrap_or(rest.len());
        let segment = rest[..end].trim();
        if segment.is_empty() {
            return Err(TesseraError::InvalidConditionKey(raw.to_string()));
        }
        rendered.push_str(op);
        rendered.push_str(&quote_path_key(segment));
        rest = &rest[end..];
    }

    Ok(rendered)
}

fn quote_path_key(segment: &str) -> String {
    if segment.chars().all(|c| c.is_ascii_digit()) {
        return segment.to_string();
    }
    if segment.len() >= 2 && segment.starts_with('\'') && segment.ends_with('\'') {
        return segment.to_string();
    }
    format!("'{}'", segment.replace('\'', "''"))
}

//! WHERE compilation tests over JSON condition documents.

use serde_json::json;
use tessera_postgres::{
    compile_where, parse_key, Conditions, ExtractedValue, FieldKind, FieldKinds, TesseraError,
};

/// Placeholder numbers in order of appearance.
fn placeholders(sql: &str) -> Vec<usize> {
    let mut numbers = Vec::new();
    let mut chars = sql.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '$' {
            continue;
        }
        let mut digits = String::new();
        while let Some(next) = chars.peek().copied().filter(char::is_ascii_digit) {
            digits.push(next);
            chars.next();
        }
        if let Ok(number) = digits.parse() {
            numbers.push(number);
        }
    }
    numbers
}

fn member_kinds() -> FieldKinds {
    FieldKinds::new()
        .with("favourites", FieldKind::Array)
        .with("jsonObject", FieldKind::Json)
        .with("created", FieldKind::Time)
}

// ============================================================================
// Key parsing
// ============================================================================

#[test]
fn test_parse_key_scenarios() {
    let key = parse_key("favourites @>").unwrap();
    assert_eq!(key.operator, "@>");
    assert_eq!(key.field, "favourites");

    let key = parse_key("name !~*").unwrap();
    assert_eq!(key.operator, "!~*");
    assert_eq!(key.field, "name");

    let key = parse_key("jsonObject ->> realName").unwrap();
    assert_eq!(key.quoted_field, "\"jsonObject\"->>'realName'");
}

// ============================================================================
// Compilation scenarios
// ============================================================================

#[test]
fn test_empty_conditions() {
    let compiled = compile_where(&Conditions::from_json(&json!({})).unwrap(), &member_kinds(), "", 0)
        .unwrap();
    assert_eq!(compiled.sql, "");
    assert!(compiled.params.is_empty());
}

#[test]
fn test_array_contains_scenario() {
    let conditions = Conditions::from_json(&json!({"favourites @>": ["sport"]})).unwrap();
    let compiled = compile_where(&conditions, &member_kinds(), "\"members\"", 0).unwrap();
    assert_eq!(compiled.sql, "\"favourites\" @> $1");
    assert_eq!(
        compiled.params,
        vec![ExtractedValue::Array(vec![ExtractedValue::from("sport")])]
    );
}

#[test]
fn test_membership_or_scenario() {
    let conditions = Conditions::from_json(&json!({
        "membership": "bronze",
        "or": [
            {"name": "BC"},
            {"favourites": "food", "name": "E"}
        ]
    }))
    .unwrap();
    let compiled = compile_where(&conditions, &member_kinds(), "\"members\"", 0).unwrap();

    assert_eq!(
        compiled.sql,
        "\"membership\" = $1 AND ((\"name\" = $2) OR ($3 = ANY(\"favourites\") AND \"name\" = $4))"
    );
    assert_eq!(
        compiled.params,
        vec![
            ExtractedValue::from("bronze"),
            ExtractedValue::from("BC"),
            ExtractedValue::from("food"),
            ExtractedValue::from("E"),
        ]
    );
    assert_eq!(placeholders(&compiled.sql), vec![1, 2, 3, 4]);
}

#[test]
fn test_null_scenarios() {
    let compiled = compile_where(
        &Conditions::from_json(&json!({"field": null})).unwrap(),
        &FieldKinds::new(),
        "",
        0,
    )
    .unwrap();
    assert_eq!(compiled.sql, "\"field\" IS NULL");
    assert!(compiled.params.is_empty());

    let compiled = compile_where(
        &Conditions::from_json(&json!({"field !": null})).unwrap(),
        &FieldKinds::new(),
        "",
        0,
    )
    .unwrap();
    assert_eq!(compiled.sql, "\"field\" IS NOT NULL");

    for key in ["field !=", "field <>"] {
        let compiled = compile_where(
            &Conditions::from_json(&json!({ key: null })).unwrap(),
            &FieldKinds::new(),
            "",
            0,
        )
        .unwrap();
        assert_eq!(compiled.sql, "\"field\" IS NOT NULL");
        assert!(compiled.params.is_empty());
    }

    let compiled = compile_where(
        &Conditions::from_json(&json!({"email =*": null})).unwrap(),
        &FieldKinds::new(),
        "",
        0,
    )
    .unwrap();
    assert_eq!(compiled.sql, "LOWER(\"email\") IS NULL");
}

#[test]
fn test_null_inside_in_list() {
    let compiled = compile_where(
        &Conditions::from_json(&json!({"id": [1, null], "name": "x"})).unwrap(),
        &FieldKinds::new(),
        "",
        0,
    )
    .unwrap();
    assert_eq!(compiled.sql, "\"id\" IN ($1, NULL) AND \"name\" = $2");
    assert_eq!(placeholders(&compiled.sql), vec![1, 2]);
}

#[test]
fn test_empty_array_scenario() {
    let kinds = FieldKinds::new().with("field", FieldKind::Scalar);
    let err = compile_where(
        &Conditions::from_json(&json!({"field": []})).unwrap(),
        &kinds,
        "",
        0,
    )
    .unwrap_err();
    assert!(matches!(err, TesseraError::EmptyArrayCondition { .. }));
    assert!(err.is_compile_error());
    assert!(!err.is_retryable());
}

#[test]
fn test_empty_groups_match_everything() {
    for document in [json!({"or": []}), json!({"and": []})] {
        let compiled = compile_where(
            &Conditions::from_json(&document).unwrap(),
            &FieldKinds::new(),
            "",
            0,
        )
        .unwrap();
        assert_eq!(compiled.sql, "");
        assert!(compiled.params.is_empty());
    }
}

#[test]
fn test_json_path_with_operator() {
    let conditions = Conditions::from_json(&json!({
        "jsonObject ->> realName ilike": "ann%",
        "jsonObject @>": {"active": true}
    }))
    .unwrap();
    let compiled = compile_where(&conditions, &member_kinds(), "", 0).unwrap();
    assert_eq!(
        compiled.sql,
        "\"jsonObject\"->>'realName' ILIKE $1 AND \"jsonObject\" @> $2"
    );
    assert_eq!(
        compiled.params[1],
        ExtractedValue::Json(json!({"active": true}))
    );
}

// ============================================================================
// Placeholder numbering
// ============================================================================

#[test]
fn test_placeholders_are_contiguous_at_any_offset() {
    let document = json!({
        "a": 1,
        "b": [1, 2, 3],
        "or": [
            {"c": "x", "and": [{"d": 1}, {"e": [4, 5]}]},
            {"f": null},
            {"g ilike": ["p%", "q%"]}
        ],
        "favourites": "food",
        "created >": "2024-01-01",
        "h": [6]
    });
    let conditions = Conditions::from_json(&document).unwrap();

    for offset in [0, 1, 7, 100] {
        let compiled = compile_where(&conditions, &member_kinds(), "\"t\"", offset).unwrap();
        let expected: Vec<usize> = (offset + 1..=offset + compiled.params.len()).collect();
        assert_eq!(placeholders(&compiled.sql), expected);
        assert_eq!(compiled.next_offset, offset + compiled.params.len());
    }
}

#[test]
fn test_compilation_is_deterministic() {
    let document = json!({
        "z": 1,
        "or": [{"y": 2}, {"x": [3, 4]}],
        "w <>": "v"
    });
    let first = compile_where(&Conditions::from_json(&document).unwrap(), &FieldKinds::new(), "", 0)
        .unwrap();
    for _ in 0..10 {
        let again =
            compile_where(&Conditions::from_json(&document).unwrap(), &FieldKinds::new(), "", 0)
                .unwrap();
        assert_eq!(again, first);
    }
    assert_eq!(
        first.sql,
        "\"z\" = $1 AND ((\"y\" = $2) OR (\"x\" IN ($3, $4))) AND \"w\" <> $5"
    );
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_unsupported_operator_for_kind() {
    let err = compile_where(
        &Conditions::from_json(&json!({"favourites ~": "x"})).unwrap(),
        &member_kinds(),
        "",
        0,
    )
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Operator '~' is not supported for array field 'favourites' with scalar value"
    );
}

#[test]
fn test_invalid_date_value() {
    let err = compile_where(
        &Conditions::from_json(&json!({"created": "not a date"})).unwrap(),
        &member_kinds(),
        "",
        0,
    )
    .unwrap_err();
    assert!(matches!(err, TesseraError::InvalidValue(_)));
}

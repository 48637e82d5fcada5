//! Codec tests: text literals read back from PostgreSQL, values sent as parameters.

use chrono::{TimeZone, Utc};
use serde_json::json;
use tessera_postgres::{
    decode_array, decode_composite, decode_composite_array, decode_text_value, encode_param,
    ExtractedValue, FieldKind, TesseraError,
};

// ============================================================================
// Array literals
// ============================================================================

#[test]
fn test_array_literal_examples() {
    assert_eq!(decode_array("{}").unwrap(), Vec::<Option<String>>::new());
    assert_eq!(
        decode_array("{a,NULL,\"\",\"NULL\"}").unwrap(),
        vec![
            Some("a".to_string()),
            None,
            Some(String::new()),
            Some("NULL".to_string()),
        ]
    );
    assert_eq!(
        decode_array(r#"{"say \"hi\"","back\\slash","a,b"}"#).unwrap(),
        vec![
            Some("say \"hi\"".to_string()),
            Some("back\\slash".to_string()),
            Some("a,b".to_string()),
        ]
    );
}

#[test]
fn test_malformed_literals_are_decode_errors() {
    for text in ["a,b", "{\"open}", "{a"] {
        let err = decode_array(text).unwrap_err();
        assert!(matches!(err, TesseraError::Decode(_)), "{}", text);
    }
    assert!(matches!(
        decode_composite("(1,2"),
        Err(TesseraError::Decode(_))
    ));
}

// ============================================================================
// Composite literals
// ============================================================================

#[test]
fn test_composite_literal_examples() {
    assert_eq!(
        decode_composite("(1,\"Main St, 5\",)").unwrap(),
        vec![Some("1".to_string()), Some("Main St, 5".to_string()), None]
    );
    assert_eq!(
        decode_composite(r#"("he said ""yes""","")"#).unwrap(),
        vec![Some("he said \"yes\"".to_string()), Some(String::new())]
    );
}

#[test]
fn test_composite_into_json_column() {
    let fields: Vec<ExtractedValue> = decode_composite("(42,\"a b\",)")
        .unwrap()
        .into_iter()
        .map(|field| field.map(ExtractedValue::from).unwrap_or(ExtractedValue::Null))
        .collect();

    assert_eq!(
        encode_param(ExtractedValue::Array(fields), FieldKind::Json).unwrap(),
        ExtractedValue::Json(json!(["42", "a b", null]))
    );
}

#[test]
fn test_composite_array_into_json_column() {
    let rows = decode_composite_array(r#"{"(1,alice)","(2,\"bob smith\")",NULL}"#).unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows[2].is_none());

    let as_objects: Vec<ExtractedValue> = rows
        .into_iter()
        .flatten()
        .map(|fields| {
            let id = fields[0].clone().unwrap_or_default();
            let name = fields[1].clone().unwrap_or_default();
            ExtractedValue::Json(json!({"id": id, "name": name}))
        })
        .collect();

    let encoded = encode_param(ExtractedValue::Array(as_objects), FieldKind::Json).unwrap();
    assert_eq!(
        encoded,
        ExtractedValue::Json(json!([
            {"id": "1", "name": "alice"},
            {"id": "2", "name": "bob smith"}
        ]))
    );
}

// ============================================================================
// Typed column values
// ============================================================================

#[test]
fn test_text_values_by_type_name() {
    assert_eq!(
        decode_text_value("_int4", Some("{1,NULL,3}")).unwrap(),
        ExtractedValue::Array(vec![
            ExtractedValue::Int(1),
            ExtractedValue::Null,
            ExtractedValue::Int(3),
        ])
    );
    assert_eq!(
        decode_text_value("int8", Some("9007199254740993")).unwrap(),
        ExtractedValue::BigInt(9_007_199_254_740_993)
    );
    assert_eq!(decode_text_value("jsonb", None).unwrap(), ExtractedValue::Null);
}

#[test]
fn test_timestamp_round_trip_through_time_column() {
    let decoded = decode_text_value("timestamptz", Some("2024-03-01 12:30:00+00")).unwrap();
    let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
    assert_eq!(decoded, ExtractedValue::TimestampTz(expected));

    let from_millis =
        encode_param(ExtractedValue::BigInt(expected.timestamp_millis()), FieldKind::Time).unwrap();
    assert_eq!(from_millis, decoded);
}

//! Decoders for PostgreSQL's text-format literals.
//!
//! Array literals look like `{a,"b c",NULL}` and composite (row) literals look
//! like `(a,"b c",)`. Both share one tokenizer; they differ in their outer
//! delimiters and in how a null element is spelled.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use std::str::FromStr;
use uuid::Uuid;

use crate::{ExtractedValue, Result, TesseraError};

/// Largest integer an `f64` represents exactly (2^53 - 1).
pub const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LiteralKind {
    Array,
    Composite,
}

impl LiteralKind {
    fn delimiters(self) -> (char, char) {
        match self {
            LiteralKind::Array => ('{', '}'),
            LiteralKind::Composite => ('(', ')'),
        }
    }

    fn name(self) -> &'static str {
        match self {
            LiteralKind::Array => "array",
            LiteralKind::Composite => "composite",
        }
    }
}

/// Splits an array or composite literal into its raw elements.
///
/// Quoted elements are unescaped (`\"` -> `"`, `\\` -> `\`, and `""` -> `"` inside
/// composites). Unquoted `NULL` is null in arrays; an empty unquoted field is null
/// in composites. Nested array elements are returned as their raw literal text.
fn split_literal(text: &str, kind: LiteralKind) -> Result<Vec<Option<String>>> {
    let (open, close) = kind.delimiters();
    let inner = text
        .strip_prefix(open)
        .and_then(|rest| rest.strip_suffix(close))
        .ok_or_else(|| {
            TesseraError::Decode(format!("Malformed {} literal '{}'", kind.name(), text))
        })?;

    if inner.is_empty() && kind == LiteralKind::Array {
        return Ok(Vec::new());
    }

    let mut elements = Vec::new();
    let mut chars = inner.chars().peekable();

    loop {
        if chars.peek() == Some(&'"') {
            chars.next();
            let mut buf = String::new();
            let mut closed = false;
            while let Some(ch) = chars.next() {
                match ch {
                    '\\' => match chars.next() {
                        Some(escaped) => buf.push(escaped),
                        None => break,
                    },
                    '"' if kind == LiteralKind::Composite && chars.peek() == Some(&'"') => {
                        chars.next();
                        buf.push('"');
                    }
                    '"' => {
                        closed = true;
                        break;
                    }
                    other => buf.push(other),
                }
            }
            if !closed {
                return Err(TesseraError::Decode(format!(
                    "Unterminated quoted element in {} literal '{}'",
                    kind.name(),
                    text
                )));
            }
            elements.push(Some(buf));
        } else {
            let mut raw = String::new();
            let mut depth = 0usize;
            let mut in_quotes = false;
            let mut escaped = false;
            while let Some(&ch) = chars.peek() {
                if ch == ',' && depth == 0 && !in_quotes {
                    break;
                }
                if escaped {
                    escaped = false;
                } else if kind == LiteralKind::Array {
                    match ch {
                        '\\' if in_quotes => escaped = true,
                        '"' => in_quotes = !in_quotes,
                        '{' if !in_quotes => depth += 1,
                        '}' if !in_quotes => depth = depth.saturating_sub(1),
                        _ => {}
                    }
                }
                raw.push(ch);
                chars.next();
            }
            elements.push(match kind {
                LiteralKind::Array if raw == "NULL" => None,
                LiteralKind::Composite if raw.is_empty() => None,
                _ => Some(raw),
            });
        }

        match chars.next() {
            None => break,
            Some(',') => continue,
            Some(other) => {
                return Err(TesseraError::Decode(format!(
                    "Unexpected '{}' after quoted element in {} literal '{}'",
                    other,
                    kind.name(),
                    text
                )))
            }
        }
    }

    Ok(elements)
}

/// Decodes an array literal into its elements, `None` for `NULL`.
///
/// ```ignore
/// assert_eq!(decode_array("{1,NULL,\"a b\"}")?, vec![Some("1".into()), None, Some("a b".into())]);
/// ```
pub fn decode_array(text: &str) -> Result<Vec<Option<String>>> {
    split_literal(text, LiteralKind::Array)
}

/// Decodes a composite (row) literal. An empty unquoted field is `None`,
/// an explicitly quoted empty field (`""`) is `Some("")`.
pub fn decode_composite(text: &str) -> Result<Vec<Option<String>>> {
    split_literal(text, LiteralKind::Composite)
}

/// Decodes an array of composite values, e.g. `{"(1,a)","(2,b)",NULL}`.
pub fn decode_composite_array(text: &str) -> Result<Vec<Option<Vec<Option<String>>>>> {
    decode_array(text)?
        .into_iter()
        .map(|element| element.as_deref().map(decode_composite).transpose())
        .collect()
}

/// Decodes a boolean array; anything other than `t`/`f` becomes `None`.
pub fn decode_bool_array(text: &str) -> Result<Vec<Option<bool>>> {
    Ok(decode_array(text)?
        .into_iter()
        .map(|element| match element.as_deref() {
            Some("t") => Some(true),
            Some("f") => Some(false),
            _ => None,
        })
        .collect())
}

/// Decodes a numeric array into doubles.
pub fn decode_number_array(text: &str) -> Result<Vec<Option<f64>>> {
    decode_array(text)?
        .into_iter()
        .map(|element| element.as_deref().map(parse_number).transpose())
        .collect()
}

/// Decodes a numeric array into doubles, rejecting values that cannot be held exactly.
///
/// Used for BIGINT / DOUBLE PRECISION arrays read into `f64`.
pub fn decode_checked_number_array(text: &str) -> Result<Vec<Option<f64>>> {
    decode_array(text)?
        .into_iter()
        .map(|element| element.as_deref().map(parse_checked_number).transpose())
        .collect()
}

/// Decodes a timestamp/date array.
pub fn decode_date_array(text: &str) -> Result<Vec<Option<DateTime<Utc>>>> {
    decode_array(text)?
        .into_iter()
        .map(|element| {
            element
                .as_deref()
                .map(|raw| {
                    let unquoted = raw
                        .strip_prefix('"')
                        .and_then(|s| s.strip_suffix('"'))
                        .unwrap_or(raw);
                    parse_timestamp(unquoted).ok_or_else(|| {
                        TesseraError::Decode(format!("Invalid date '{}' in array '{}'", raw, text))
                    })
                })
                .transpose()
        })
        .collect()
}

/// Decodes a JSON/JSONB array; `NULL` elements become JSON `null`.
pub fn decode_json_array(text: &str) -> Result<Vec<JsonValue>> {
    decode_array(text)?
        .into_iter()
        .map(|element| match element {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                TesseraError::Decode(format!("Invalid JSON element '{}': {}", raw, e))
            }),
            None => Ok(JsonValue::Null),
        })
        .collect()
}

/// Parses a number without any range check.
pub fn parse_number(text: &str) -> Result<f64> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| TesseraError::Decode(format!("Invalid number '{}'", text)))
}

/// Parses a number and fails if it lies outside ±(2^53 - 1).
pub fn parse_checked_number(text: &str) -> Result<f64> {
    let value = parse_number(text)?;
    if value.abs() > MAX_SAFE_INTEGER {
        return Err(TesseraError::NumericPrecision(text.to_string()));
    }
    Ok(value)
}

/// Parses the timestamp spellings PostgreSQL and applications commonly produce.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.f][+TZ]`, naive timestamps (read as UTC)
/// and plain dates (midnight UTC).
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"] {
        if let Ok(parsed) = DateTime::parse_from_str(text, format) {
            return Some(parsed.with_timezone(&Utc));
        }
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(parsed.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
}

/// Decodes one text-format column value given its PostgreSQL type name.
///
/// Array types (`_int4`, `_jsonb`, ...) are split with [`decode_array`] and each
/// element is decoded with the element type. Unknown types are kept as text.
pub fn decode_text_value(type_name: &str, text: Option<&str>) -> Result<ExtractedValue> {
    let Some(text) = text else {
        return Ok(ExtractedValue::Null);
    };
    let type_name = type_name.to_ascii_lowercase();

    if let Some(element_type) = type_name.strip_prefix('_') {
        let values = decode_array(text)?
            .into_iter()
            .map(|element| decode_text_value(element_type, element.as_deref()))
            .collect::<Result<Vec<_>>>()?;
        return Ok(ExtractedValue::Array(values));
    }

    let invalid = |what: &str| {
        TesseraError::Decode(format!("Invalid {} value '{}'", what, text))
    };

    let value = match type_name.as_str() {
        "bool" | "boolean" => match text {
            "t" | "true" => ExtractedValue::Bool(true),
            "f" | "false" => ExtractedValue::Bool(false),
            _ => return Err(invalid("BOOLEAN")),
        },
        "int2" | "smallint" => {
            ExtractedValue::SmallInt(text.parse().map_err(|_| invalid("SMALLINT"))?)
        }
        "int4" | "integer" | "int" | "oid" => {
            ExtractedValue::Int(text.parse().map_err(|_| invalid("INTEGER"))?)
        }
        "int8" | "bigint" => ExtractedValue::BigInt(text.parse().map_err(|_| invalid("BIGINT"))?),
        "float4" | "real" => ExtractedValue::Float(text.parse().map_err(|_| invalid("REAL"))?),
        "float8" | "double precision" => ExtractedValue::Double(parse_number(text)?),
        "numeric" | "decimal" => {
            ExtractedValue::Decimal(Decimal::from_str(text).map_err(|_| invalid("NUMERIC"))?)
        }
        "text" | "varchar" | "bpchar" | "char" | "name" | "citext" | "tsvector" => {
            ExtractedValue::String(text.to_string())
        }
        "uuid" => ExtractedValue::Uuid(Uuid::parse_str(text).map_err(|_| invalid("UUID"))?),
        "json" | "jsonb" => ExtractedValue::Json(serde_json::from_str(text)?),
        "date" => ExtractedValue::Date(
            NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| invalid("DATE"))?,
        ),
        "time" => ExtractedValue::Time(
            NaiveTime::parse_from_str(text, "%H:%M:%S%.f").map_err(|_| invalid("TIME"))?,
        ),
        "timestamp" => ExtractedValue::Timestamp(
            NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
                .map_err(|_| invalid("TIMESTAMP"))?,
        ),
        "timestamptz" => {
            ExtractedValue::TimestampTz(parse_timestamp(text).ok_or_else(|| invalid("TIMESTAMPTZ"))?)
        }
        "bytea" => ExtractedValue::Bytes(decode_hex_bytea(text).ok_or_else(|| invalid("BYTEA"))?),
        unknown => {
            tracing::warn!("Unknown PostgreSQL type '{}', keeping value as text", unknown);
            ExtractedValue::String(text.to_string())
        }
    };

    Ok(value)
}

/// Decodes the `\x`-prefixed hex output format of BYTEA.
fn decode_hex_bytea(text: &str) -> Option<Vec<u8>> {
    let hex = text.strip_prefix("\\x")?;
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn strings(items: &[Option<&str>]) -> Vec<Option<String>> {
        items.iter().map(|i| i.map(str::to_string)).collect()
    }

    #[test]
    fn test_decode_empty_array() {
        assert_eq!(decode_array("{}").unwrap(), Vec::<Option<String>>::new());
    }

    #[test]
    fn test_decode_simple_array() {
        assert_eq!(decode_array("{1,2}").unwrap(), strings(&[Some("1"), Some("2")]));
    }

    #[test]
    fn test_decode_null_and_empty_string() {
        assert_eq!(decode_array(r#"{NULL,""}"#).unwrap(), strings(&[None, Some("")]));
    }

    #[test]
    fn test_decode_null_is_case_sensitive() {
        assert_eq!(
            decode_array("{null,Null,NULL}").unwrap(),
            strings(&[Some("null"), Some("Null"), None])
        );
        assert_eq!(decode_array(r#"{"NULL"}"#).unwrap(), strings(&[Some("NULL")]));
    }

    #[test]
    fn test_decode_escapes() {
        assert_eq!(decode_array(r#"{"\\","\""}"#).unwrap(), strings(&[Some("\\"), Some("\"")]));
        assert_eq!(
            decode_array(r#"{"a,b","c \"d\"",e}"#).unwrap(),
            strings(&[Some("a,b"), Some("c \"d\""), Some("e")])
        );
    }

    #[test]
    fn test_decode_nested_array_kept_raw() {
        assert_eq!(
            decode_array(r#"{{1,2},{"x,}",4}}"#).unwrap(),
            strings(&[Some("{1,2}"), Some(r#"{"x,}",4}"#)])
        );
    }

    #[test]
    fn test_decode_malformed_array() {
        assert!(matches!(decode_array("1,2"), Err(TesseraError::Decode(_))));
        assert!(matches!(decode_array(r#"{"abc}"#), Err(TesseraError::Decode(_))));
        assert!(matches!(decode_array(r#"{"a"b}"#), Err(TesseraError::Decode(_))));
    }

    #[test]
    fn test_decode_composite() {
        assert_eq!(
            decode_composite(r#"(1,,"a b","",x)"#).unwrap(),
            strings(&[Some("1"), None, Some("a b"), Some(""), Some("x")])
        );
        assert_eq!(decode_composite("(,)").unwrap(), strings(&[None, None]));
        assert_eq!(decode_composite(r#"("say ""hi""")"#).unwrap(), strings(&[Some("say \"hi\"")]));
    }

    #[test]
    fn test_decode_composite_null_is_text() {
        assert_eq!(decode_composite("(NULL)").unwrap(), strings(&[Some("NULL")]));
    }

    #[test]
    fn test_decode_composite_array() {
        let rows = decode_composite_array(r#"{"(1,a)","(2,\"b c\")",NULL}"#).unwrap();
        assert_eq!(
            rows,
            vec![
                Some(strings(&[Some("1"), Some("a")])),
                Some(strings(&[Some("2"), Some("b c")])),
                None,
            ]
        );
    }

    #[test]
    fn test_decode_bool_array() {
        assert_eq!(
            decode_bool_array("{t,f,NULL,x}").unwrap(),
            vec![Some(true), Some(false), None, None]
        );
    }

    #[test]
    fn test_decode_number_arrays() {
        assert_eq!(
            decode_number_array("{1,2.5,NULL,-3}").unwrap(),
            vec![Some(1.0), Some(2.5), None, Some(-3.0)]
        );
        assert!(decode_number_array("{abc}").is_err());
    }

    #[test]
    fn test_decode_checked_number_array_precision() {
        assert_eq!(
            decode_checked_number_array("{9007199254740991,-9007199254740991}").unwrap(),
            vec![Some(9007199254740991.0), Some(-9007199254740991.0)]
        );
        let err = decode_checked_number_array("{1,9007199254740993}").unwrap_err();
        assert_eq!(err, TesseraError::NumericPrecision("9007199254740993".to_string()));
    }

    #[test]
    fn test_decode_date_array() {
        let dates = decode_date_array(r#"{"2024-01-02 03:04:05+00",2024-05-06,NULL}"#).unwrap();
        assert_eq!(dates[0], Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()));
        assert_eq!(dates[1], Some(Utc.with_ymd_and_hms(2024, 5, 6, 0, 0, 0).unwrap()));
        assert_eq!(dates[2], None);
        assert!(decode_date_array("{yesterday}").is_err());
    }

    #[test]
    fn test_decode_json_array() {
        let values = decode_json_array(r#"{"{\"a\":1}","[1,2]",NULL}"#).unwrap();
        assert_eq!(values, vec![json!({"a": 1}), json!([1, 2]), JsonValue::Null]);
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-01T12:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01 14:30:00+02"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01 12:30:00"), Some(expected));
        assert_eq!(parse_timestamp("not a date"), None);
    }

    #[test]
    fn test_decode_text_value_scalars() {
        assert_eq!(decode_text_value("bool", Some("t")).unwrap(), ExtractedValue::Bool(true));
        assert_eq!(decode_text_value("INT4", Some("42")).unwrap(), ExtractedValue::Int(42));
        assert_eq!(
            decode_text_value("int8", Some("9007199254740993")).unwrap(),
            ExtractedValue::BigInt(9007199254740993)
        );
        assert_eq!(decode_text_value("text", None).unwrap(), ExtractedValue::Null);
        assert_eq!(
            decode_text_value("jsonb", Some(r#"{"a":[1]}"#)).unwrap(),
            ExtractedValue::Json(json!({"a": [1]}))
        );
        assert_eq!(
            decode_text_value("bytea", Some("\\xdead")).unwrap(),
            ExtractedValue::Bytes(vec![0xde, 0xad])
        );
        assert!(decode_text_value("int4", Some("x")).is_err());
    }

    #[test]
    fn test_decode_text_value_arrays() {
        assert_eq!(
            decode_text_value("_int4", Some("{1,NULL,3}")).unwrap(),
            ExtractedValue::Array(vec![
                ExtractedValue::Int(1),
                ExtractedValue::Null,
                ExtractedValue::Int(3),
            ])
        );
        assert_eq!(
            decode_text_value("_text", Some(r#"{"a b",c}"#)).unwrap(),
            ExtractedValue::Array(vec!["a b".into(), "c".into()])
        );
    }

    #[test]
    fn test_decode_text_value_unknown_type_falls_back_to_text() {
        assert_eq!(
            decode_text_value("point", Some("(1,2)")).unwrap(),
            ExtractedValue::String("(1,2)".to_string())
        );
    }
}

//! Encoding of application values into bind parameters.

use chrono::{DateTime, Utc};

use super::decode::parse_timestamp;
use crate::{ExtractedValue, FieldKind, Result, TesseraError};

/// Prepares a value for binding against a column of the given kind.
///
/// JSON columns receive a JSON document, time columns receive a calendar value;
/// every other kind passes the value through unchanged. NULL is never touched.
pub fn encode_param(value: ExtractedValue, kind: FieldKind) -> Result<ExtractedValue> {
    if value.is_null() {
        return Ok(value);
    }
    match kind {
        FieldKind::Json => Ok(match value {
            json @ ExtractedValue::Json(_) => json,
            other => ExtractedValue::Json(other.to_json()),
        }),
        FieldKind::Time => coerce_date(value),
        FieldKind::Scalar | FieldKind::Array | FieldKind::TsVector => Ok(value),
    }
}

/// Converts a value into a date value unless it already is one.
///
/// Strings are parsed, integers are epoch milliseconds, arrays are coerced
/// element-wise.
pub fn coerce_date(value: ExtractedValue) -> Result<ExtractedValue> {
    match value {
        value if value.is_null() || value.is_date() => Ok(value),
        ExtractedValue::String(ref text) => parse_timestamp(text)
            .map(ExtractedValue::TimestampTz)
            .ok_or_else(|| TesseraError::InvalidValue(format!("'{}' is not a valid date", text))),
        ExtractedValue::SmallInt(ms) => from_millis(ms as i64),
        ExtractedValue::Int(ms) => from_millis(ms as i64),
        ExtractedValue::BigInt(ms) => from_millis(ms),
        ExtractedValue::Float(ms) if ms.is_finite() => from_millis(ms as i64),
        ExtractedValue::Double(ms) if ms.is_finite() => from_millis(ms as i64),
        ExtractedValue::Array(values) => values
            .into_iter()
            .map(coerce_date)
            .collect::<Result<Vec<_>>>()
            .map(ExtractedValue::Array),
        other => Err(TesseraError::InvalidValue(format!(
            "{} value cannot be used as a date",
            other.pg_type_name()
        ))),
    }
}

fn from_millis(ms: i64) -> Result<ExtractedValue> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(ExtractedValue::TimestampTz)
        .ok_or_else(|| TesseraError::InvalidValue(format!("{} ms is out of the date range", ms)))
}

//! Value and column-kind types shared by the compiler and the codec.
//!
//! `ExtractedValue` is what flows through the whole crate: condition values,
//! bind parameters and decoded column values. `FieldKind` is the semantic
//! classification of a column that drives predicate and codec behaviour.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::postgres::PgArguments;
use sqlx::Arguments;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::{Result, TesseraError};

/// A value bound to, or decoded from, a PostgreSQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedValue {
    /// NULL value
    Null,
    /// Boolean (BOOLEAN)
    Bool(bool),
    /// Small integer (SMALLINT)
    SmallInt(i16),
    /// Integer (INTEGER)
    Int(i32),
    /// Big integer (BIGINT)
    BigInt(i64),
    /// Single-precision float (REAL)
    Float(f32),
    /// Double-precision float (DOUBLE PRECISION)
    Double(f64),
    /// Variable-length string (VARCHAR, TEXT)
    String(String),
    /// Binary data (BYTEA)
    Bytes(Vec<u8>),
    /// UUID (UUID)
    Uuid(Uuid),
    /// Date (DATE)
    Date(NaiveDate),
    /// Time (TIME)
    Time(NaiveTime),
    /// Timestamp without timezone (TIMESTAMP)
    Timestamp(NaiveDateTime),
    /// Timestamp with timezone (TIMESTAMPTZ)
    TimestampTz(DateTime<Utc>),
    /// JSON/JSONB (JSON, JSONB)
    Json(JsonValue),
    /// Array of values (ARRAY)
    Array(Vec<ExtractedValue>),
    /// Decimal/Numeric (NUMERIC, DECIMAL)
    Decimal(Decimal),
}

impl ExtractedValue {
    /// Returns the PostgreSQL type name for this value.
    pub fn pg_type_name(&self) -> &'static str {
        match self {
            ExtractedValue::Null => "NULL",
            ExtractedValue::Bool(_) => "BOOLEAN",
            ExtractedValue::SmallInt(_) => "SMALLINT",
            ExtractedValue::Int(_) => "INTEGER",
            ExtractedValue::BigInt(_) => "BIGINT",
            ExtractedValue::Float(_) => "REAL",
            ExtractedValue::Double(_) => "DOUBLE PRECISION",
            ExtractedValue::String(_) => "TEXT",
            ExtractedValue::Bytes(_) => "BYTEA",
            ExtractedValue::Uuid(_) => "UUID",
            ExtractedValue::Date(_) => "DATE",
            ExtractedValue::Time(_) => "TIME",
            ExtractedValue::Timestamp(_) => "TIMESTAMP",
            ExtractedValue::TimestampTz(_) => "TIMESTAMPTZ",
            ExtractedValue::Json(_) => "JSONB",
            ExtractedValue::Array(_) => "ARRAY",
            ExtractedValue::Decimal(_) => "NUMERIC",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ExtractedValue::Null)
    }

    /// True for the variants that already carry a calendar value.
    pub fn is_date(&self) -> bool {
        matches!(
            self,
            ExtractedValue::Date(_) | ExtractedValue::Timestamp(_) | ExtractedValue::TimestampTz(_)
        )
    }

    /// Converts the value into its JSON representation.
    ///
    /// Temporal values become strings, bytes become a lowercase hex string and
    /// non-finite floats become `null`.
    pub fn to_json(&self) -> JsonValue {
        match self {
            ExtractedValue::Null => JsonValue::Null,
            ExtractedValue::Bool(v) => JsonValue::Bool(*v),
            ExtractedValue::SmallInt(v) => JsonValue::Number((*v).into()),
            ExtractedValue::Int(v) => JsonValue::Number((*v).into()),
            ExtractedValue::BigInt(v) => JsonValue::Number((*v).into()),
            ExtractedValue::Float(v) => serde_json::Number::from_f64(*v as f64)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            ExtractedValue::Double(v) => serde_json::Number::from_f64(*v)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            ExtractedValue::String(v) => JsonValue::String(v.clone()),
            ExtractedValue::Bytes(v) => {
                JsonValue::String(v.iter().map(|b| format!("{:02x}", b)).collect())
            }
            ExtractedValue::Uuid(v) => JsonValue::String(v.to_string()),
            ExtractedValue::Date(v) => JsonValue::String(v.to_string()),
            ExtractedValue::Time(v) => JsonValue::String(v.to_string()),
            ExtractedValue::Timestamp(v) => JsonValue::String(v.to_string()),
            ExtractedValue::TimestampTz(v) => JsonValue::String(v.to_rfc3339()),
            ExtractedValue::Json(v) => v.clone(),
            ExtractedValue::Array(values) => {
                JsonValue::Array(values.iter().map(ExtractedValue::to_json).collect())
            }
            ExtractedValue::Decimal(v) => JsonValue::String(v.to_string()),
        }
    }

    /// Bind this value to a sqlx argument list.
    ///
    /// Homogeneous arrays are bound as native PostgreSQL arrays (INT4[], TEXT[], ...);
    /// mixed arrays fall back to a JSON array. NULL is bound as a TEXT null, so
    /// statement builders write a literal `NULL` rather than binding it.
    ///
    /// # Errors
    ///
    /// Returns error if binding fails (e.g., type incompatibility).
    pub fn bind_to_arguments(&self, arguments: &mut PgArguments) -> Result<()> {
        let bound = match self {
            ExtractedValue::Null => arguments.add(Option::<String>::None),
            ExtractedValue::Bool(v) => arguments.add(*v),
            ExtractedValue::SmallInt(v) => arguments.add(*v),
            ExtractedValue::Int(v) => arguments.add(*v),
            ExtractedValue::BigInt(v) => arguments.add(*v),
            ExtractedValue::Float(v) => arguments.add(*v),
            ExtractedValue::Double(v) => arguments.add(*v),
            ExtractedValue::String(v) => arguments.add(v.clone()),
            ExtractedValue::Bytes(v) => arguments.add(v.clone()),
            ExtractedValue::Uuid(v) => arguments.add(*v),
            ExtractedValue::Date(v) => arguments.add(*v),
            ExtractedValue::Time(v) => arguments.add(*v),
            ExtractedValue::Timestamp(v) => arguments.add(*v),
            ExtractedValue::TimestampTz(v) => arguments.add(*v),
            ExtractedValue::Json(v) => arguments.add(v.clone()),
            ExtractedValue::Decimal(v) => arguments.add(*v),
            ExtractedValue::Array(values) => return bind_array(values, arguments),
        };
        bound.map_err(|e| {
            TesseraError::Query(format!("Failed to bind {}: {}", self.pg_type_name(), e))
        })
    }
}

/// Binds every parameter, in order, into a fresh argument list.
pub fn bind_all(params: &[ExtractedValue]) -> Result<PgArguments> {
    let mut arguments = PgArguments::default();
    for param in params {
        param.bind_to_arguments(&mut arguments)?;
    }
    Ok(arguments)
}

/// Binds `values` as `Vec<Option<T>>` when every element is `$variant` or NULL.
macro_rules! bind_native_array {
    ($values:expr, $arguments:expr, $variant:ident, $label:literal) => {
        if $values
            .iter()
            .all(|v| matches!(v, ExtractedValue::$variant(_) | ExtractedValue::Null))
        {
            let items: Vec<Option<_>> = $values
                .iter()
                .map(|v| match v {
                    ExtractedValue::$variant(x) => Some(x.clone()),
                    _ => None,
                })
                .collect();
            return $arguments.add(items).map_err(|e| {
                TesseraError::Query(format!("Failed to bind {}: {}", $label, e))
            });
        }
    };
}

/// Empty arrays carry no element type and go over the wire as `TEXT[]`; the
/// compiler and statement builder inline `'{}'` instead of binding them.
fn bind_array(values: &[ExtractedValue], arguments: &mut PgArguments) -> Result<()> {
    if values.is_empty() {
        return arguments
            .add(Vec::<String>::new())
            .map_err(|e| TesseraError::Query(format!("Failed to bind empty ARRAY: {}", e)));
    }

    // Element type comes from the first non-null value
    match values.iter().find(|v| !v.is_null()) {
        Some(ExtractedValue::Bool(_)) => bind_native_array!(values, arguments, Bool, "BOOL[]"),
        Some(ExtractedValue::SmallInt(_)) => {
            bind_native_array!(values, arguments, SmallInt, "INT2[]")
        }
        Some(ExtractedValue::Int(_)) => bind_native_array!(values, arguments, Int, "INT4[]"),
        Some(ExtractedValue::BigInt(_)) => bind_native_array!(values, arguments, BigInt, "INT8[]"),
        Some(ExtractedValue::Double(_)) => {
            bind_native_array!(values, arguments, Double, "FLOAT8[]")
        }
        Some(ExtractedValue::String(_)) | None => {
            bind_native_array!(values, arguments, String, "TEXT[]")
        }
        Some(ExtractedValue::Uuid(_)) => bind_native_array!(values, arguments, Uuid, "UUID[]"),
        Some(ExtractedValue::Date(_)) => bind_native_array!(values, arguments, Date, "DATE[]"),
        Some(ExtractedValue::TimestampTz(_)) => {
            bind_native_array!(values, arguments, TimestampTz, "TIMESTAMPTZ[]")
        }
        _ => {}
    }

    // Heterogeneous or nested arrays go over the wire as JSON
    let json = JsonValue::Array(values.iter().map(ExtractedValue::to_json).collect());
    arguments
        .add(json)
        .map_err(|e| TesseraError::Query(format!("Failed to bind ARRAY as JSON: {}", e)))
}

impl From<JsonValue> for ExtractedValue {
    /// Objects stay JSON; every other JSON shape maps onto the matching scalar or array.
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => ExtractedValue::Null,
            JsonValue::Bool(b) => ExtractedValue::Bool(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => ExtractedValue::BigInt(i),
                None => ExtractedValue::Double(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => ExtractedValue::String(s),
            JsonValue::Array(items) => {
                ExtractedValue::Array(items.into_iter().map(ExtractedValue::from).collect())
            }
            object @ JsonValue::Object(_) => ExtractedValue::Json(object),
        }
    }
}

impl From<&str> for ExtractedValue {
    fn from(value: &str) -> Self {
        ExtractedValue::String(value.to_string())
    }
}

impl From<String> for ExtractedValue {
    fn from(value: String) -> Self {
        ExtractedValue::String(value)
    }
}

impl From<bool> for ExtractedValue {
    fn from(value: bool) -> Self {
        ExtractedValue::Bool(value)
    }
}

impl From<i32> for ExtractedValue {
    fn from(value: i32) -> Self {
        ExtractedValue::Int(value)
    }
}

impl From<i64> for ExtractedValue {
    fn from(value: i64) -> Self {
        ExtractedValue::BigInt(value)
    }
}

impl From<f64> for ExtractedValue {
    fn from(value: f64) -> Self {
        ExtractedValue::Double(value)
    }
}

impl From<Uuid> for ExtractedValue {
    fn from(value: Uuid) -> Self {
        ExtractedValue::Uuid(value)
    }
}

impl From<NaiveDate> for ExtractedValue {
    fn from(value: NaiveDate) -> Self {
        ExtractedValue::Date(value)
    }
}

impl From<DateTime<Utc>> for ExtractedValue {
    fn from(value: DateTime<Utc>) -> Self {
        ExtractedValue::TimestampTz(value)
    }
}

impl<T: Into<ExtractedValue>> From<Option<T>> for ExtractedValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ExtractedValue::Null)
    }
}

impl<T: Into<ExtractedValue>> From<Vec<T>> for ExtractedValue {
    fn from(values: Vec<T>) -> Self {
        ExtractedValue::Array(values.into_iter().map(Into::into).collect())
    }
}

/// Semantic classification of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Plain column (text, numbers, booleans, ...)
    #[default]
    Scalar,
    /// PostgreSQL array column
    Array,
    /// JSON or JSONB column
    Json,
    /// DATE / TIMESTAMP / TIMESTAMPTZ column
    Time,
    /// Full-text search vector
    TsVector,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Scalar => "scalar",
            FieldKind::Array => "array",
            FieldKind::Json => "json",
            FieldKind::Time => "time",
            FieldKind::TsVector => "tsvector",
        };
        f.write_str(name)
    }
}

/// Looks up the kind of a column. Unknown columns are `Scalar`.
pub trait FieldKindLookup {
    fn kind_of(&self, column: &str) -> FieldKind;
}

/// Column name -> field kind for one table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldKinds {
    kinds: HashMap<String, FieldKind>,
}

impl FieldKinds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column kind, builder style.
    pub fn with(mut self, column: impl Into<String>, kind: FieldKind) -> Self {
        self.kinds.insert(column.into(), kind);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, kind: FieldKind) {
        self.kinds.insert(column.into(), kind);
    }

    pub fn get(&self, column: &str) -> Option<FieldKind> {
        self.kinds.get(column).copied()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl FieldKindLookup for FieldKinds {
    fn kind_of(&self, column: &str) -> FieldKind {
        self.get(column).unwrap_or_default()
    }
}

impl FieldKindLookup for HashMap<String, FieldKind> {
    fn kind_of(&self, column: &str) -> FieldKind {
        self.get(column).copied().unwrap_or_default()
    }
}

impl<K: Into<String>> FromIterator<(K, FieldKind)> for FieldKinds {
    fn from_iter<I: IntoIterator<Item = (K, FieldKind)>>(iter: I) -> Self {
        Self {
            kinds: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

//! Condition trees.

use serde_json::Value as JsonValue;

use crate::{ExtractedValue, Result, TesseraError};

/// Value side of a condition entry.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionValue {
    /// Absent value; the entry is skipped by the compiler
    Undefined,
    Value(ExtractedValue),
    /// Sub-conditions under an `and`/`or` key
    Group(Vec<Conditions>),
}

/// Returns true for the grouping keys `and` / `or`.
pub fn is_group_key(key: &str) -> bool {
    key == "and" || key == "or"
}

/// Ordered condition map.
///
/// Entries keep insertion order, which is the order placeholders are allocated in.
///
/// # Example
///
/// ```ignore
/// let conditions = Conditions::new()
///     .with("membership", "bronze")
///     .or(vec![
///         Conditions::new().with("name", "BC"),
///         Conditions::new().with("favourites", "food").with("name", "E"),
///     ]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditions {
    entries: Vec<(String, ConditionValue)>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, replacing an earlier entry with the same key in place.
    pub fn insert(&mut self, key: impl Into<String>, value: ConditionValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ExtractedValue>) -> Self {
        self.insert(key, ConditionValue::Value(value.into()));
        self
    }

    pub fn null(mut self, key: impl Into<String>) -> Self {
        self.insert(key, ConditionValue::Value(ExtractedValue::Null));
        self
    }

    pub fn undefined(mut self, key: impl Into<String>) -> Self {
        self.insert(key, ConditionValue::Undefined);
        self
    }

    pub fn and(mut self, groups: Vec<Conditions>) -> Self {
        self.insert("and", ConditionValue::Group(groups));
        self
    }

    pub fn or(mut self, groups: Vec<Conditions>) -> Self {
        self.insert("or", ConditionValue::Group(groups));
        self
    }

    pub fn get(&self, key: &str) -> Option<&ConditionValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConditionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys of undefined entries, depth first, in document order.
    pub fn undefined_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        self.collect_undefined(&mut keys);
        keys
    }

    fn collect_undefined(&self, keys: &mut Vec<String>) {
        for (key, value) in &self.entries {
            match value {
                ConditionValue::Undefined => keys.push(key.clone()),
                ConditionValue::Group(groups) => {
                    groups.iter().for_each(|group| group.collect_undefined(keys))
                }
                ConditionValue::Value(_) => {}
            }
        }
    }

    /// Builds a condition tree from a JSON object.
    ///
    /// `and`/`or` take an object or an array of objects. JSON `null` is a NULL
    /// comparison; there is no JSON spelling of an undefined value.
    pub fn from_json(value: &JsonValue) -> Result<Self> {
        let JsonValue::Object(map) = value else {
            return Err(TesseraError::InvalidCondition(format!(
                "conditions must be a JSON object, got {}",
                value
            )));
        };

        let mut conditions = Self::new();
        for (key, value) in map {
            let entry = if is_group_key(key) {
                ConditionValue::Group(groups_from_json(key, value)?)
            } else {
                ConditionValue::Value(ExtractedValue::from(value.clone()))
            };
            conditions.entries.push((key.clone(), entry));
        }
        Ok(conditions)
    }
}

fn groups_from_json(key: &str, value: &JsonValue) -> Result<Vec<Conditions>> {
    match value {
        JsonValue::Object(_) => Ok(vec![Conditions::from_json(value)?]),
        JsonValue::Array(items) => items
            .iter()
            .map(|item| match item {
                JsonValue::Object(_) => Conditions::from_json(item),
                other => Err(TesseraError::InvalidCondition(format!(
                    "'{}' expects objects, got {}",
                    key, other
                ))),
            })
            .collect(),
        other => Err(TesseraError::InvalidCondition(format!(
            "'{}' expects an object or a list of objects, got {}",
            key, other
        ))),
    }
}

impl TryFrom<&JsonValue> for Conditions {
    type Error = TesseraError;

    fn try_from(value: &JsonValue) -> Result<Self> {
        Self::from_json(value)
    }
}

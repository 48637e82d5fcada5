//! Compiler configuration.

use serde::{Deserialize, Serialize};

use crate::Result;

/// Per-clause identifier escaping defaults.
///
/// Deserializes from either a single boolean (applies to every clause) or an
/// object with `select`, `order_by` and `group_by` keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ForceEscapeRepr")]
pub struct ForceEscapeColumns {
    pub select: bool,
    pub order_by: bool,
    pub group_by: bool,
}

impl Default for ForceEscapeColumns {
    fn default() -> Self {
        Self::all(true)
    }
}

impl ForceEscapeColumns {
    /// Same setting for every clause.
    pub fn all(escape: bool) -> Self {
        Self {
            select: escape,
            order_by: escape,
            group_by: escape,
        }
    }

    /// Applies a per-call override; an explicit call-level value wins for every clause.
    pub fn resolve(self, call_override: Option<bool>) -> Self {
        match call_override {
            Some(escape) => Self::all(escape),
            None => self,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ForceEscapeRepr {
    All(bool),
    PerClause {
        #[serde(default = "default_true")]
        select: bool,
        #[serde(default = "default_true")]
        order_by: bool,
        #[serde(default = "default_true")]
        group_by: bool,
    },
}

fn default_true() -> bool {
    true
}

impl From<ForceEscapeRepr> for ForceEscapeColumns {
    fn from(repr: ForceEscapeRepr) -> Self {
        match repr {
            ForceEscapeRepr::All(escape) => Self::all(escape),
            ForceEscapeRepr::PerClause {
                select,
                order_by,
                group_by,
            } => Self {
                select,
                order_by,
                group_by,
            },
        }
    }
}

/// What a statement builder does with undefined condition values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UndefinedPolicy {
    /// Drop the entry (the compiler's own behavior)
    #[default]
    Skip,
    /// Reject the statement with `UndefinedValue`
    Error,
}

impl UndefinedPolicy {
    /// Applies a per-call `skip_undefined` override.
    pub fn resolve(self, skip_undefined: Option<bool>) -> Self {
        match skip_undefined {
            Some(true) => UndefinedPolicy::Skip,
            Some(false) => UndefinedPolicy::Error,
            None => self,
        }
    }
}

/// Configuration shared by every statement built for a table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Identifier escaping in SELECT lists, ORDER BY and GROUP BY
    pub force_escape_columns: ForceEscapeColumns,
    pub undefined_policy: UndefinedPolicy,
}

impl CompilerConfig {
    /// Loads a configuration from a JSON document; missing keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Config that passes identifiers through unescaped.
    pub fn unescaped() -> Self {
        Self {
            force_escape_columns: ForceEscapeColumns::all(false),
            ..Default::default()
        }
    }

    /// Config that rejects undefined condition values.
    pub fn strict() -> Self {
        Self {
            undefined_policy: UndefinedPolicy::Error,
            ..Default::default()
        }
    }
}

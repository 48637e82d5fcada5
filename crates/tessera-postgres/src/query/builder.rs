//! TableQuery struct and shared compilation steps.

use super::helpers::{quote_identifier, validate_identifier};
use crate::codec::encode_param;
use crate::condition::{compile_where, CompiledPredicate, Conditions};
use crate::config::{CompilerConfig, UndefinedPolicy};
use crate::{ExtractedValue, FieldKindLookup, FieldKinds, Result, TesseraError};

/// Statement builder for one table.
///
/// Combines the table's field kinds and the compiler configuration with
/// per-call conditions and options. Every `build_*` method returns the SQL
/// text and its bind parameters in placeholder order.
#[derive(Debug, Clone)]
pub struct TableQuery {
    pub(crate) table: String,
    pub(crate) field_kinds: FieldKinds,
    pub(crate) config: CompilerConfig,
}

impl TableQuery {
    /// Creates a builder for a table.
    ///
    /// # Errors
    ///
    /// Returns error if the table name is not a valid (optionally schema-qualified)
    /// identifier.
    pub fn new(table: &str) -> Result<Self> {
        validate_identifier(table)?;
        Ok(Self {
            table: table.to_string(),
            field_kinds: FieldKinds::default(),
            config: CompilerConfig::default(),
        })
    }

    pub fn with_field_kinds(mut self, field_kinds: FieldKinds) -> Self {
        self.field_kinds = field_kinds;
        self
    }

    pub fn with_config(mut self, config: CompilerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn quoted_table(&self) -> String {
        quote_identifier(&self.table)
    }

    pub fn field_kinds(&self) -> &FieldKinds {
        &self.field_kinds
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compiles a WHERE clause after applying the undefined-value policy.
    pub(crate) fn compile_conditions(
        &self,
        conditions: &Conditions,
        offset: usize,
        skip_undefined: Option<bool>,
    ) -> Result<CompiledPredicate> {
        if self.config.undefined_policy.resolve(skip_undefined) == UndefinedPolicy::Error {
            if let Some(key) = conditions.undefined_keys().into_iter().next() {
                return Err(TesseraError::UndefinedValue { key });
            }
        }
        compile_where(conditions, &self.field_kinds, &self.quoted_table(), offset)
    }

    /// Encodes a column value for binding.
    pub(crate) fn encode_value(&self, column: &str, value: &ExtractedValue) -> Result<ExtractedValue> {
        encode_param(value.clone(), self.field_kinds.kind_of(column))
    }
}

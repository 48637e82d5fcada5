//! SELECT and COUNT statements for TableQuery.

use tracing::debug;

use super::builder::TableQuery;
use super::options::{compile_fields, compile_query_options, QueryOptions};
use crate::condition::Conditions;
use crate::{ExtractedValue, Result};

impl TableQuery {
    /// Builds `SELECT <fields> FROM <table> [WHERE ...] <options>`.
    pub fn build_select(
        &self,
        conditions: &Conditions,
        options: &QueryOptions,
    ) -> Result<(String, Vec<ExtractedValue>)> {
        let escape = &self.config.force_escape_columns;
        let fields = compile_fields(options, escape)?;
        let predicate = self.compile_conditions(conditions, 0, options.skip_undefined)?;
        let tail = compile_query_options(options, escape)?;

        let sql = format!(
            "SELECT {} FROM {}{}{}",
            fields,
            self.quoted_table(),
            predicate.where_clause(),
            tail
        );
        debug!(table = %self.table, params = predicate.params.len(), "Built SELECT statement");

        Ok((sql, predicate.params))
    }

    /// Builds `SELECT COUNT(*) FROM <table> [WHERE ...]`.
    pub fn build_count(&self, conditions: &Conditions) -> Result<(String, Vec<ExtractedValue>)> {
        let predicate = self.compile_conditions(conditions, 0, None)?;
        let sql = format!(
            "SELECT COUNT(*) FROM {}{}",
            self.quoted_table(),
            predicate.where_clause()
        );
        Ok((sql, predicate.params))
    }
}

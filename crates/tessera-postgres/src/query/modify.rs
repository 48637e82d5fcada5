//! INSERT, UPDATE and DELETE statements for TableQuery.

use tracing::debug;

use super::builder::TableQuery;
use super::helpers::escape_identifier;
use crate::condition::Conditions;
use crate::{ExtractedValue, Result, TesseraError};

impl TableQuery {
    /// Builds `INSERT INTO <table> (...) VALUES (...) RETURNING *`.
    ///
    /// Values are encoded for their column's field kind.
    pub fn build_insert(&self, values: &[(String, ExtractedValue)]) -> Result<(String, Vec<ExtractedValue>)> {
        if values.is_empty() {
            return Err(TesseraError::Query("Cannot insert with no values".to_string()));
        }

        let columns = values
            .iter()
            .map(|(column, _)| escape_identifier(column))
            .collect::<Result<Vec<_>>>()?;

        let mut params = Vec::with_capacity(values.len());
        let mut placeholders = Vec::with_capacity(values.len());
        for (column, value) in values {
            placeholders.push(value_sql(&mut params, self.encode_value(column, value)?));
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            self.quoted_table(),
            columns.join(", "),
            placeholders.join(", ")
        );

        Ok((sql, params))
    }

    /// Builds a multi-row INSERT.
    ///
    /// The first row fixes the column list; every other row must provide the
    /// same columns, in any order.
    pub fn build_insert_many(
        &self,
        rows: &[Vec<(String, ExtractedValue)>],
    ) -> Result<(String, Vec<ExtractedValue>)> {
        let first = rows
            .first()
            .filter(|row| !row.is_empty())
            .ok_or_else(|| TesseraError::Query("Cannot insert with no rows".to_string()))?;

        let column_names: Vec<&str> = first.iter().map(|(column, _)| column.as_str()).collect();
        let columns = column_names
            .iter()
            .map(|column| escape_identifier(column))
            .collect::<Result<Vec<_>>>()?;

        let mut params = Vec::with_capacity(rows.len() * column_names.len());
        let mut tuples = Vec::with_capacity(rows.len());

        for (index, row) in rows.iter().enumerate() {
            if row.len() != column_names.len() {
                return Err(TesseraError::Query(format!(
                    "Row {} has {} columns, expected {}",
                    index,
                    row.len(),
                    column_names.len()
                )));
            }

            let mut placeholders = Vec::with_capacity(column_names.len());
            for column in &column_names {
                let value = row
                    .iter()
                    .find(|(name, _)| name.as_str() == *column)
                    .map(|(_, value)| value)
                    .ok_or_else(|| {
                        TesseraError::Query(format!("Row {} is missing column '{}'", index, column))
                    })?;
                placeholders.push(value_sql(&mut params, self.encode_value(column, value)?));
            }
            tuples.push(format!("({})", placeholders.join(", ")));
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES {} RETURNING *",
            self.quoted_table(),
            columns.join(", "),
            tuples.join(", ")
        );
        debug!(table = %self.table, rows = rows.len(), params = params.len(), "Built INSERT statement");

        Ok((sql, params))
    }

    /// Builds `UPDATE <table> SET ... [WHERE ...]`.
    ///
    /// SET parameters come first; the WHERE clause continues numbering after them.
    pub fn build_update(
        &self,
        conditions: &Conditions,
        values: &[(String, ExtractedValue)],
    ) -> Result<(String, Vec<ExtractedValue>)> {
        if values.is_empty() {
            return Err(TesseraError::Query("Cannot update with no values".to_string()));
        }

        let mut params = Vec::with_capacity(values.len());
        let mut set_parts = Vec::with_capacity(values.len());
        for (column, value) in values {
            let value = value_sql(&mut params, self.encode_value(column, value)?);
            set_parts.push(format!("{} = {}", escape_identifier(column)?, value));
        }

        let predicate = self.compile_conditions(conditions, params.len(), None)?;
        let sql = format!(
            "UPDATE {} SET {}{}",
            self.quoted_table(),
            set_parts.join(", "),
            predicate.where_clause()
        );
        params.extend(predicate.params);

        Ok((sql, params))
    }

    /// Builds `DELETE FROM <table> [WHERE ...]`.
    pub fn build_delete(&self, conditions: &Conditions) -> Result<(String, Vec<ExtractedValue>)> {
        let predicate = self.compile_conditions(conditions, 0, None)?;
        let sql = format!("DELETE FROM {}{}", self.quoted_table(), predicate.where_clause());
        Ok((sql, predicate.params))
    }
}

/// SQL for one VALUES/SET entry.
///
/// NULL and empty arrays are written inline so the server types them from the
/// target column; everything else is bound as the next parameter.
fn value_sql(params: &mut Vec<ExtractedValue>, value: ExtractedValue) -> String {
    match value {
        ExtractedValue::Null => "NULL".to_string(),
        ExtractedValue::Array(ref items) if items.is_empty() => "'{}'".to_string(),
        value => {
            params.push(value);
            format!("${}", params.len())
        }
    }
}

//! Query option compilation: field lists and the trailing clauses.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::helpers::{check_unescaped, escape_identifier};
use crate::config::ForceEscapeColumns;
use crate::{Result, TesseraError};

/// SELECT list: column names or one free-form expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Fields {
    Columns(Vec<String>),
    Expression(String),
}

/// ORDER BY: `"a, -b"`, `["a desc", "2"]` or `{"a": "asc", "b": "desc"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderBy {
    Expression(String),
    Columns(Vec<String>),
    Directions(IndexMap<String, String>),
}

/// GROUP BY: `"a, b"` or `["a", "1"]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupBy {
    Expression(String),
    Columns(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

/// Options for a SELECT statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    pub fields: Option<Fields>,
    pub distinct: bool,
    pub order_by: Option<OrderBy>,
    /// `Some(true)` emits `NULLS FIRST`, `Some(false)` emits `NULLS LAST`
    pub order_by_nulls_first: Option<bool>,
    pub group_by: Option<GroupBy>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub for_update: bool,
    /// Call-level escaping override for every clause
    pub force_escape_columns: Option<bool>,
    /// Call-level override of the undefined-value policy
    pub skip_undefined: Option<bool>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(Fields::Columns(columns.into_iter().map(Into::into).collect()));
        self
    }

    pub fn expression(mut self, expression: impl Into<String>) -> Self {
        self.fields = Some(Fields::Expression(expression.into()));
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(OrderBy::Expression(order_by.into()));
        self
    }

    pub fn nulls_first(mut self, first: bool) -> Self {
        self.order_by_nulls_first = Some(first);
        self
    }

    pub fn group_by(mut self, group_by: impl Into<String>) -> Self {
        self.group_by = Some(GroupBy::Expression(group_by.into()));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn for_update(mut self) -> Self {
        self.for_update = true;
        self
    }

    pub fn escape_columns(mut self, escape: bool) -> Self {
        self.force_escape_columns = Some(escape);
        self
    }

    pub fn skip_undefined(mut self, skip: bool) -> Self {
        self.skip_undefined = Some(skip);
        self
    }
}

/// Compiles the SELECT list, `*` when no fields are given.
pub fn compile_fields(options: &QueryOptions, escape: &ForceEscapeColumns) -> Result<String> {
    let escape = escape.resolve(options.force_escape_columns);

    let list = match &options.fields {
        None => "*".to_string(),
        Some(Fields::Columns(columns)) if columns.is_empty() => "*".to_string(),
        Some(Fields::Columns(columns)) => columns
            .iter()
            .map(|column| column_reference(column, escape.select))
            .collect::<Result<Vec<_>>>()?
            .join(", "),
        Some(Fields::Expression(expression)) => {
            check_unescaped(expression)?;
            expression.trim().to_string()
        }
    };

    if options.distinct {
        Ok(format!("DISTINCT {}", list))
    } else {
        Ok(list)
    }
}

/// Compiles GROUP BY, ORDER BY, LIMIT, OFFSET and FOR UPDATE.
///
/// Every clause is prefixed with a space; the result is empty when no option is set.
pub fn compile_query_options(options: &QueryOptions, escape: &ForceEscapeColumns) -> Result<String> {
    let escape = escape.resolve(options.force_escape_columns);
    let mut sql = String::new();

    if let Some(group_by) = &options.group_by {
        let items = match group_by {
            GroupBy::Expression(text) => split_list(text),
            GroupBy::Columns(columns) => columns.iter().map(String::as_str).collect(),
        };
        let columns = items
            .into_iter()
            .map(|item| parse_sort_item(item).and_then(|(target, _)| target.render(escape.group_by)))
            .collect::<Result<Vec<_>>>()?;
        if !columns.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&columns.join(", "));
        }
    }

    if let Some(order_by) = &options.order_by {
        let items = compile_order_by(order_by, options.order_by_nulls_first, escape.order_by)?;
        if !items.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&items.join(", "));
        }
    }

    if let Some(limit) = options.limit {
        sql.push_str(&format!(" LIMIT {}", non_negative("LIMIT", limit)?));
    }

    if let Some(offset) = options.offset {
        sql.push_str(&format!(" OFFSET {}", non_negative("OFFSET", offset)?));
    }

    if options.for_update {
        sql.push_str(" FOR UPDATE");
    }

    Ok(sql)
}

fn compile_order_by(order_by: &OrderBy, nulls_first: Option<bool>, escape: bool) -> Result<Vec<String>> {
    let items: Vec<(SortTarget, SortDirection)> = match order_by {
        OrderBy::Expression(text) => split_list(text)
            .into_iter()
            .map(parse_sort_item)
            .collect::<Result<_>>()?,
        OrderBy::Columns(columns) => columns
            .iter()
            .map(|column| parse_sort_item(column))
            .collect::<Result<_>>()?,
        OrderBy::Directions(map) => map
            .iter()
            .map(|(column, direction)| directed(column, direction))
            .collect::<Result<_>>()?,
    };

    let nulls = match nulls_first {
        Some(true) => " NULLS FIRST",
        Some(false) => " NULLS LAST",
        None => "",
    };

    let mut rendered = Vec::with_capacity(items.len());
    for (target, direction) in items {
        rendered.push(format!("{} {}{}", target.render(escape)?, direction.to_sql(), nulls));
    }
    Ok(rendered)
}

/// ORDER BY / GROUP BY target.
enum SortTarget<'a> {
    Position(&'a str),
    Column(&'a str),
}

impl SortTarget<'_> {
    fn render(&self, escape: bool) -> Result<String> {
        match self {
            SortTarget::Position(position) => Ok(position.to_string()),
            SortTarget::Column(column) => column_reference(column, escape),
        }
    }
}

fn sort_target(text: &str) -> Result<SortTarget<'_>> {
    if text.is_empty() {
        return Err(TesseraError::InvalidOrderBy("empty sort column".to_string()));
    }
    if text.chars().all(|c| c.is_ascii_digit()) {
        Ok(SortTarget::Position(text))
    } else {
        Ok(SortTarget::Column(text))
    }
}

fn directed<'a>(column: &'a str, direction: &str) -> Result<(SortTarget<'a>, SortDirection)> {
    let parsed = SortDirection::parse(direction).ok_or_else(|| {
        TesseraError::InvalidOrderBy(format!(
            "direction for '{}' must be 'asc' or 'desc', got '{}'",
            column, direction
        ))
    })?;
    Ok((sort_target(column.trim())?, parsed))
}

/// Parses `+col`, `-col`, `col desc`, `2` or `col`.
fn parse_sort_item(item: &str) -> Result<(SortTarget<'_>, SortDirection)> {
    let item = item.trim();

    if let Some(rest) = item.strip_prefix('+') {
        return Ok((sort_target(rest.trim())?, SortDirection::Asc));
    }
    if let Some(rest) = item.strip_prefix('-') {
        return Ok((sort_target(rest.trim())?, SortDirection::Desc));
    }

    if let Some((head, tail)) = item.rsplit_once(char::is_whitespace) {
        if let Some(direction) = SortDirection::parse(tail) {
            return Ok((sort_target(head.trim())?, direction));
        }
    }

    Ok((sort_target(item)?, SortDirection::Asc))
}

fn split_list(text: &str) -> Vec<&str> {
    text.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect()
}

fn column_reference(column: &str, escape: bool) -> Result<String> {
    if escape {
        escape_identifier(column)
    } else {
        check_unescaped(column)?;
        Ok(column.to_string())
    }
}

fn non_negative(clause: &str, value: i64) -> Result<i64> {
    if value < 0 {
        return Err(TesseraError::InvalidLimitOffset(format!(
            "{} must be a non-negative integer, got {}",
            clause, value
        )));
    }
    Ok(value)
}

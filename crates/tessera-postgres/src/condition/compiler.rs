//! WHERE clause compiler.
//!
//! Turns a [`Conditions`] tree into a parameterized predicate. Placeholders are
//! allocated from one running counter in document order, so nested `and`/`or`
//! groups continue numbering from wherever their parent had reached.

use tracing::debug;

use super::key::{parse_key, ConditionKey};
use super::value::{is_group_key, ConditionValue, Conditions};
use crate::codec::coerce_date;
use crate::{ExtractedValue, FieldKind, FieldKindLookup, Result, TesseraError};

/// Compiled predicate body (without the `WHERE` keyword).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompiledPredicate {
    pub sql: String,
    pub params: Vec<ExtractedValue>,
    /// Placeholder offset after this predicate; the next bound value gets `$next_offset + 1`
    pub next_offset: usize,
}

impl CompiledPredicate {
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// `" WHERE <sql>"`, or an empty string when nothing restricts the rows.
    pub fn where_clause(&self) -> String {
        if self.sql.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.sql)
        }
    }
}

/// Compiles `conditions` with placeholders starting at `$offset + 1`.
///
/// `table_qualifier` is already quoted; it prefixes array columns inside the
/// `EXISTS (... UNNEST(...))` form. Undefined values are skipped.
pub fn compile_where<K>(
    conditions: &Conditions,
    field_kinds: &K,
    table_qualifier: &str,
    offset: usize,
) -> Result<CompiledPredicate>
where
    K: FieldKindLookup + ?Sized,
{
    PredicateCompiler::new(field_kinds, table_qualifier).compile(conditions, offset)
}

/// Running parameter list for one level of the tree.
struct Bindings {
    params: Vec<ExtractedValue>,
    offset: usize,
}

impl Bindings {
    fn starting_at(offset: usize) -> Self {
        Self {
            params: Vec::new(),
            offset,
        }
    }

    fn bind(&mut self, value: ExtractedValue) -> String {
        self.params.push(value);
        format!("${}", self.next_offset())
    }

    /// Binds an array, or inlines `'{}'` when it is empty so the server
    /// infers the array type from the other operand.
    fn bind_array(&mut self, items: Vec<ExtractedValue>) -> String {
        if items.is_empty() {
            "'{}'".to_string()
        } else {
            self.bind(ExtractedValue::Array(items))
        }
    }

    fn next_offset(&self) -> usize {
        self.offset + self.params.len()
    }

    fn absorb(&mut self, child: Bindings) {
        self.params.extend(child.params);
    }
}

pub struct PredicateCompiler<'a, K: ?Sized> {
    field_kinds: &'a K,
    table_qualifier: &'a str,
}

impl<'a, K> PredicateCompiler<'a, K>
where
    K: FieldKindLookup + ?Sized,
{
    pub fn new(field_kinds: &'a K, table_qualifier: &'a str) -> Self {
        Self {
            field_kinds,
            table_qualifier,
        }
    }

    pub fn compile(&self, conditions: &Conditions, offset: usize) -> Result<CompiledPredicate> {
        let mut bindings = Bindings::starting_at(offset);
        let predicates = self.predicates(conditions, &mut bindings)?;

        debug!(
            predicates = predicates.len(),
            params = bindings.params.len(),
            offset,
            "Compiled WHERE clause"
        );

        Ok(CompiledPredicate {
            sql: predicates.join(" AND "),
            next_offset: bindings.next_offset(),
            params: bindings.params,
        })
    }

    fn predicates(&self, conditions: &Conditions, bindings: &mut Bindings) -> Result<Vec<String>> {
        let mut predicates = Vec::with_capacity(conditions.len());

        for (key, value) in conditions.iter() {
            match value {
                ConditionValue::Undefined => {}
                ConditionValue::Group(groups) if is_group_key(key) => {
                    if let Some(sql) = self.group(key, groups, bindings)? {
                        predicates.push(sql);
                    }
                }
                ConditionValue::Group(_) => {
                    return Err(TesseraError::InvalidCondition(format!(
                        "nested conditions are only allowed under 'and'/'or', found under '{}'",
                        key
                    )));
                }
                ConditionValue::Value(_) if is_group_key(key) => {
                    return Err(TesseraError::InvalidCondition(format!(
                        "'{}' expects a list of conditions",
                        key
                    )));
                }
                ConditionValue::Value(value) => {
                    predicates.push(self.predicate(key, value.clone(), bindings)?);
                }
            }
        }

        Ok(predicates)
    }

    fn group(
        &self,
        key: &str,
        groups: &[Conditions],
        bindings: &mut Bindings,
    ) -> Result<Option<String>> {
        if groups.is_empty() {
            return Ok(None);
        }

        let joiner = if key == "or" { " OR " } else { " AND " };
        let mut parts = Vec::with_capacity(groups.len());

        for group in groups {
            let mut local = Bindings::starting_at(bindings.next_offset());
            let predicates = self.predicates(group, &mut local)?;
            if predicates.is_empty() {
                parts.push("(TRUE)".to_string());
            } else {
                parts.push(format!("({})", predicates.join(" AND ")));
            }
            bindings.absorb(local);
        }

        Ok(Some(format!("({})", parts.join(joiner))))
    }

    fn predicate(&self, raw_key: &str, value: ExtractedValue, bindings: &mut Bindings) -> Result<String> {
        let key = parse_key(raw_key)?;
        let kind = self.field_kinds.kind_of(&key.field);

        let value = match key.mutator {
            Some(mutate) => match value {
                ExtractedValue::Array(items) => {
                    ExtractedValue::Array(items.into_iter().map(mutate).collect())
                }
                other => mutate(other),
            },
            None => value,
        };

        match value {
            ExtractedValue::Null => null_predicate(&key),
            ExtractedValue::Array(items) => self.array_predicate(&key, kind, items, bindings),
            scalar => self.scalar_predicate(&key, kind, scalar, bindings),
        }
    }

    fn array_predicate(
        &self,
        key: &ConditionKey,
        kind: FieldKind,
        items: Vec<ExtractedValue>,
        bindings: &mut Bindings,
    ) -> Result<String> {
        let field = &key.quoted_field;
        let op = key.operator;

        match kind {
            FieldKind::Json => match op {
                "?|" | "?&" => Ok(format!("{} {} {}", field, op, bindings.bind_array(items))),
                "@>" | "<@" | "&&" => {
                    let document = ExtractedValue::Array(items).to_json();
                    Ok(format!(
                        "{} {} {}",
                        field,
                        op,
                        bindings.bind(ExtractedValue::Json(document))
                    ))
                }
                _ => Err(unsupported(key, kind, "array")),
            },
            FieldKind::Array if key.field_mutated => Err(unsupported(key, kind, "array")),
            FieldKind::Array => match op {
                "=" | "<>" | "!=" | "<" | ">" | "<=" | ">=" | "@>" | "<@" | "&&" => {
                    Ok(format!("{} {} {}", field, op, bindings.bind_array(items)))
                }
                _ => Err(unsupported(key, kind, "array")),
            },
            FieldKind::Scalar | FieldKind::Time | FieldKind::TsVector => match op {
                "=" | "<>" | "!=" => {
                    if items.is_empty() {
                        return Err(TesseraError::EmptyArrayCondition {
                            field: key.field.clone(),
                        });
                    }
                    let mut placeholders = Vec::with_capacity(items.len());
                    for item in items {
                        if item.is_null() {
                            placeholders.push("NULL".to_string());
                            continue;
                        }
                        let item = if kind == FieldKind::Time {
                            coerce_date(item)?
                        } else {
                            item
                        };
                        placeholders.push(bindings.bind(item));
                    }
                    let membership = if op == "=" { "IN" } else { "NOT IN" };
                    Ok(format!("{} {} ({})", field, membership, placeholders.join(", ")))
                }
                "LIKE" | "ILIKE" | "SIMILAR TO" | "~" | "~*" => {
                    Ok(format!("{} {} ANY({})", field, op, bindings.bind_array(items)))
                }
                "NOT LIKE" | "NOT ILIKE" | "NOT SIMILAR TO" | "!~" | "!~*" => {
                    Ok(format!("{} {} ALL({})", field, op, bindings.bind_array(items)))
                }
                _ => Err(unsupported(key, kind, "array")),
            },
        }
    }

    fn scalar_predicate(
        &self,
        key: &ConditionKey,
        kind: FieldKind,
        value: ExtractedValue,
        bindings: &mut Bindings,
    ) -> Result<String> {
        let field = &key.quoted_field;
        let op = key.operator;

        match kind {
            // LOWER(text[]) does not exist
            FieldKind::Array if key.field_mutated => Err(unsupported(key, kind, "scalar")),
            FieldKind::Array => match op {
                "=" | "<>" | "!=" => Ok(format!("{} {} ANY({})", bindings.bind(value), op, field)),
                "LIKE" | "ILIKE" | "NOT LIKE" | "NOT ILIKE" | "SIMILAR TO" | "NOT SIMILAR TO" => {
                    let column = if self.table_qualifier.is_empty() {
                        field.to_string()
                    } else {
                        format!("{}.{}", self.table_qualifier, field)
                    };
                    Ok(format!(
                        "EXISTS (SELECT * FROM (SELECT UNNEST({}) _el) _arr WHERE _arr._el {} {})",
                        column,
                        op,
                        bindings.bind(value)
                    ))
                }
                _ => Err(unsupported(key, kind, "scalar")),
            },
            FieldKind::Time => Ok(format!("{} {} {}", field, op, bindings.bind(coerce_date(value)?))),
            FieldKind::Scalar | FieldKind::Json | FieldKind::TsVector => {
                Ok(format!("{} {} {}", field, op, bindings.bind(value)))
            }
        }
    }
}

fn null_predicate(key: &ConditionKey) -> Result<String> {
    let op = match key.operator {
        "=" | "IS" => "IS",
        "<>" | "!=" | "IS NOT" => "IS NOT",
        "IS DISTINCT FROM" | "IS NOT DISTINCT FROM" => key.operator,
        _ => return Err(unsupported(key, FieldKind::Scalar, "null")),
    };
    Ok(format!("{} {} NULL", key.quoted_field, op))
}

fn unsupported(key: &ConditionKey, kind: FieldKind, shape: &'static str) -> TesseraError {
    TesseraError::UnsupportedOperatorForType {
        field: key.field.clone(),
        operator: key.operator.to_string(),
        kind: kind.to_string(),
        shape,
    }
}

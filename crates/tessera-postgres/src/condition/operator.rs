//! Operator registry for condition keys.
//!
//! A condition key may end in an operator token (`"age >="`, `"name ilike"`).
//! This module holds the fixed table of tokens and what each one compiles to.

use crate::ExtractedValue;

/// Rewrites a bound value before it is compiled.
pub type ValueMutator = fn(ExtractedValue) -> ExtractedValue;

/// Rewrites the SQL field reference; receives the field name and its quoted form.
pub type FieldMutator = fn(&str, &str) -> String;

/// One entry of the operator registry.
#[derive(Debug, Clone, Copy)]
pub struct OperatorDescriptor {
    /// Token as written at the end of a condition key (case-sensitive)
    pub token: &'static str,
    /// SQL operator emitted for the token
    pub sql: &'static str,
    pub value_mutator: Option<ValueMutator>,
    pub field_mutator: Option<FieldMutator>,
}

impl OperatorDescriptor {
    const fn plain(token: &'static str, sql: &'static str) -> Self {
        Self {
            token,
            sql,
            value_mutator: None,
            field_mutator: None,
        }
    }

    /// Word tokens (`like`, `is not`, ...) must be separated from the field by whitespace.
    pub fn is_word(&self) -> bool {
        self.token.starts_with(|c: char| c.is_ascii_alphabetic())
    }
}

static OPERATORS: &[OperatorDescriptor] = &[
    OperatorDescriptor::plain("=", "="),
    OperatorDescriptor::plain("!", "<>"),
    OperatorDescriptor::plain(">", ">"),
    OperatorDescriptor::plain("<", "<"),
    OperatorDescriptor::plain(">=", ">="),
    OperatorDescriptor::plain("<=", "<="),
    OperatorDescriptor::plain("!=", "!="),
    OperatorDescriptor::plain("<>", "<>"),
    OperatorDescriptor::plain("is not", "IS NOT"),
    OperatorDescriptor::plain("@@", "@@"),
    OperatorDescriptor::plain("@>", "@>"),
    OperatorDescriptor::plain("<@", "<@"),
    OperatorDescriptor::plain("&&", "&&"),
    OperatorDescriptor::plain("?", "?"),
    OperatorDescriptor::plain("?|", "?|"),
    OperatorDescriptor::plain("?&", "?&"),
    OperatorDescriptor::plain("~~", "LIKE"),
    OperatorDescriptor::plain("like", "LIKE"),
    OperatorDescriptor::plain("!~~", "NOT LIKE"),
    OperatorDescriptor::plain("not like", "NOT LIKE"),
    OperatorDescriptor::plain("~~*", "ILIKE"),
    OperatorDescriptor::plain("ilike", "ILIKE"),
    OperatorDescriptor::plain("!~~*", "NOT ILIKE"),
    OperatorDescriptor::plain("not ilike", "NOT ILIKE"),
    OperatorDescriptor::plain("similar to", "SIMILAR TO"),
    OperatorDescriptor::plain("not similar to", "NOT SIMILAR TO"),
    OperatorDescriptor::plain("~", "~"),
    OperatorDescriptor::plain("!~", "!~"),
    OperatorDescriptor::plain("~*", "~*"),
    OperatorDescriptor::plain("!~*", "!~*"),
    OperatorDescriptor::plain("is distinct from", "IS DISTINCT FROM"),
    OperatorDescriptor::plain("is not distinct from", "IS NOT DISTINCT FROM"),
    OperatorDescriptor {
        token: "=*",
        sql: "=",
        value_mutator: Some(lower_case),
        field_mutator: Some(lower_field),
    },
    OperatorDescriptor {
        token: "icontains",
        sql: "ILIKE",
        value_mutator: Some(contains_pattern),
        field_mutator: None,
    },
];

/// Exact, case-sensitive token lookup.
pub fn lookup(token: &str) -> Option<&'static OperatorDescriptor> {
    OPERATORS.iter().find(|op| op.token == token)
}

/// All registered operators, in registry order.
pub fn operators() -> &'static [OperatorDescriptor] {
    OPERATORS
}

fn lower_case(value: ExtractedValue) -> ExtractedValue {
    match value {
        ExtractedValue::String(s) => ExtractedValue::String(s.to_lowercase()),
        other => other,
    }
}

fn lower_field(_field: &str, quoted_field: &str) -> String {
    format!("LOWER({})", quoted_field)
}

fn contains_pattern(value: ExtractedValue) -> ExtractedValue {
    match value {
        ExtractedValue::String(s) => ExtractedValue::String(format!("%{}%", escape_like(&s))),
        other => other,
    }
}

/// Backslash-escapes the LIKE metacharacters `%`, `_` and `\`.
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_exact() {
        assert_eq!(lookup("ilike").map(|op| op.sql), Some("ILIKE"));
        assert!(lookup("ILIKE").is_none());
        assert!(lookup(" like").is_none());
    }

    #[test]
    fn test_aliases() {
        assert_eq!(lookup("!").unwrap().sql, "<>");
        assert_eq!(lookup("~~").unwrap().sql, "LIKE");
        assert_eq!(lookup("!~~*").unwrap().sql, "NOT ILIKE");
        assert_eq!(lookup("not similar to").unwrap().sql, "NOT SIMILAR TO");
    }

    #[test]
    fn test_tokens_are_unique() {
        let all = operators();
        for (i, op) in all.iter().enumerate() {
            assert!(all[i + 1..].iter().all(|other| other.token != op.token), "{}", op.token);
        }
        assert_eq!(all.len(), 34);
    }

    #[test]
    fn test_case_insensitive_equality_mutators() {
        let op = lookup("=*").unwrap();
        let value = (op.value_mutator.unwrap())(ExtractedValue::from("MiXeD"));
        assert_eq!(value, ExtractedValue::from("mixed"));
        assert_eq!((op.field_mutator.unwrap())("name", "\"name\""), "LOWER(\"name\")");
    }

    #[test]
    fn test_icontains_escapes_like_metacharacters() {
        let op = lookup("icontains").unwrap();
        let value = (op.value_mutator.unwrap())(ExtractedValue::from("50%_off\\"));
        assert_eq!(value, ExtractedValue::from("%50\\%\\_off\\\\%"));
        assert_eq!(op.sql, "ILIKE");
    }

    #[test]
    fn test_word_operators() {
        assert!(lookup("is not").unwrap().is_word());
        assert!(lookup("icontains").unwrap().is_word());
        assert!(!lookup("!~*").unwrap().is_word());
    }
}

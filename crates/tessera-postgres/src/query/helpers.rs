//! Identifier quoting and validation.

use crate::{Result, TesseraError};
use unicode_normalization::UnicodeNormalization;

/// Quotes a validated identifier.
///
/// Handles schema-qualified names by quoting each part separately.
pub fn quote_identifier(name: &str) -> String {
    if name.contains('.') {
        name.split('.')
            .map(|part| format!("\"{}\"", part))
            .collect::<Vec<_>>()
            .join(".")
    } else {
        format!("\"{}\"", name)
    }
}

/// Wraps an arbitrary column name in double quotes, doubling embedded quotes.
pub fn escape_identifier(name: &str) -> Result<String> {
    if name.is_empty() {
        return Err(TesseraError::InvalidIdentifier(
            "Identifier cannot be empty".to_string(),
        ));
    }
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// Minimal checks for identifiers and expressions passed through unescaped.
pub fn check_unescaped(expression: &str) -> Result<()> {
    let trimmed = expression.trim();
    if trimmed.is_empty() {
        return Err(TesseraError::InvalidIdentifier(
            "Identifier cannot be empty".to_string(),
        ));
    }
    for forbidden in [";", "--", "/*", "*/"] {
        if trimmed.contains(forbidden) {
            return Err(TesseraError::InvalidIdentifier(format!(
                "'{}' contains forbidden sequence '{}'",
                trimmed, forbidden
            )));
        }
    }
    Ok(())
}

/// Validates a table name.
///
/// Supports both simple identifiers and schema-qualified names (e.g., "public.users").
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(TesseraError::InvalidIdentifier("Identifier cannot be empty".to_string()));
    }

    if name.contains('.') {
        let parts: Vec<&str> = name.split('.').collect();

        if parts.len() != 2 {
            return Err(TesseraError::InvalidIdentifier(format!(
                "Invalid schema-qualified identifier '{}': must be in format 'schema.table'",
                name
            )));
        }

        for part in parts {
            validate_identifier_part(part)?;
        }

        return Ok(());
    }

    validate_identifier_part(name)
}

/// Validates a single part of an identifier (no dots allowed).
pub fn validate_identifier_part(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(TesseraError::InvalidIdentifier(
            "Identifier part cannot be empty".to_string(),
        ));
    }

    // NFKC folds compatibility characters before the ASCII checks
    let name = name.nfkc().collect::<String>();

    // PostgreSQL truncates identifiers at 63 bytes
    if name.len() > 63 {
        return Err(TesseraError::InvalidIdentifier(format!(
            "Identifier '{}' exceeds maximum length of 63",
            name
        )));
    }

    let first_char = name.chars().next().ok_or_else(|| {
        TesseraError::InvalidIdentifier(format!("Identifier '{}' is empty or invalid", name))
    })?;
    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return Err(TesseraError::InvalidIdentifier(format!(
            "Identifier '{}' must start with a letter or underscore",
            name
        )));
    }

    if let Some(ch) = name.chars().find(|ch| !ch.is_ascii_alphanumeric() && *ch != '_') {
        return Err(TesseraError::InvalidIdentifier(format!(
            "Identifier '{}' contains invalid character '{}'",
            name, ch
        )));
    }

    let name_lower = name.to_lowercase();
    if name_lower.starts_with("pg_") || name_lower == "information_schema" {
        return Err(TesseraError::InvalidIdentifier(format!(
            "Access to system catalog '{}' is not allowed",
            name
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("users"), "\"users\"");
        assert_eq!(quote_identifier("public.users"), "\"public\".\"users\"");
    }

    #[test]
    fn test_escape_identifier_doubles_quotes() {
        assert_eq!(escape_identifier("name").unwrap(), "\"name\"");
        assert_eq!(escape_identifier("a\"b").unwrap(), "\"a\"\"b\"");
        assert_eq!(escape_identifier("Mixed Case").unwrap(), "\"Mixed Case\"");
        assert!(matches!(
            escape_identifier(""),
            Err(TesseraError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_check_unescaped() {
        assert!(check_unescaped("count(*) AS total").is_ok());
        assert!(check_unescaped("users.name").is_ok());
        assert!(check_unescaped("name; DROP TABLE users").is_err());
        assert!(check_unescaped("name -- comment").is_err());
        assert!(check_unescaped("/* x */ name").is_err());
        assert!(check_unescaped("  ").is_err());
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("users").is_ok());
        assert!(validate_identifier("_private").is_ok());
        assert!(validate_identifier("public.users").is_ok());

        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("1users").is_err());
        assert!(validate_identifier("users; DROP").is_err());
        assert!(validate_identifier("a.b.c").is_err());
        assert!(validate_identifier("pg_catalog.pg_class").is_err());
        assert!(validate_identifier("information_schema").is_err());
        assert!(validate_identifier(&"a".repeat(64)).is_err());
    }
}

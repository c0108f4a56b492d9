//! Shared helper functions for SQL dialect implementations.
//!
//! This module provides reusable building blocks that dialects can compose
//! to implement the `SqlDialect` trait with minimal duplication.

use crate::sql::token::{Token, TokenStream};

// =============================================================================
// Identifier Quoting
// =============================================================================

/// Words that always need quoting when used as identifiers.
const RESERVED: &[&str] = &[
    "ALL", "AND", "AS", "ASC", "BETWEEN", "BY", "CASE", "CROSS", "DESC", "DISTINCT", "ELSE",
    "END", "FALSE", "FROM", "FULL", "GROUP", "HAVING", "IN", "INNER", "IS", "JOIN", "LEFT",
    "LIMIT", "NOT", "NULL", "OFFSET", "ON", "OR", "ORDER", "QUALIFY", "RIGHT", "SELECT", "TABLE",
    "THEN", "TRUE", "UNION", "WHEN", "WHERE", "WITH",
];

/// Quote identifier with double quotes (ANSI style).
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Leave `UPPER_SNAKE` identifiers bare, double-quote everything else.
///
/// Both Snowflake and DuckDB resolve a bare uppercase name to the same object
/// as its quoted form, so bare output is equivalent and easier to read.
pub fn quote_if_needed(ident: &str) -> String {
    let mut chars = ident.chars();
    let plain = matches!(chars.next(), Some(c) if c.is_ascii_uppercase() || c == '_')
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        && !RESERVED.contains(&ident);

    if plain {
        ident.to_string()
    } else {
        quote_double(ident)
    }
}

// =============================================================================
// String Quoting
// =============================================================================

/// Quote string with single quotes (standard SQL).
pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

// =============================================================================
// Boolean Formatting
// =============================================================================

/// Format boolean as literal true/false.
pub fn format_bool_literal(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// Standard `LIMIT n`.
pub fn emit_limit_standard(limit: u64) -> TokenStream {
    let mut ts = TokenStream::new();
    ts.push(Token::Limit).space().push(Token::LitInt(limit as i64));
    ts
}

// =============================================================================
// Function Remapping
// =============================================================================

/// Remap functions for DuckDB dialect.
pub fn remap_function_duckdb(name: &str) -> Option<&'static str> {
    match name.to_uppercase().as_str() {
        "TO_CHAR" => Some("STRFTIME"),
        "NVL" => Some("COALESCE"),
        "IFNULL" => Some("COALESCE"),
        "ZEROIFNULL" => Some("COALESCE"),
        _ => None,
    }
}

/// Remap functions for Snowflake dialect.
pub fn remap_function_snowflake(name: &str) -> Option<&'static str> {
    match name.to_uppercase().as_str() {
        "STRFTIME" => Some("TO_CHAR"),
        "IFNULL" => Some("NVL"),
        _ => None,
    }
}

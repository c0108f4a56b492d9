//! SQL Dialect definitions and formatting rules.
//!
//! This module provides a trait-based abstraction for SQL dialect differences.
//! Each dialect implements `SqlDialect` to handle its specific syntax:
//!
//! - Identifier quoting (only when an identifier would not survive unquoted)
//! - Placeholders for bound parameters
//! - Month bucketing: `TO_CHAR(x, 'YYYY-MM')` vs `strftime(x, '%Y-%m')`
//! - Function names that differ between engines
//!
//! # Usage
//!
//! ```ignore
//! use profitlens::sql::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::Snowflake;
//! let quoted = dialect.quote_identifier("order");  // "order"
//! ```

mod duckdb;
pub mod helpers;
mod snowflake;

pub use duckdb::DuckDb;
pub use snowflake::Snowflake;

use super::token::{Token, TokenStream};

/// SQL dialect trait - defines how SQL constructs are rendered.
///
/// The default implementations follow ANSI SQL where possible.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Identifier and Literal Quoting
    // =========================================================================

    /// Quote an identifier (table, column, alias).
    fn quote_identifier(&self, ident: &str) -> String;

    /// Quote a string literal with `''` escaping.
    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_single(s)
    }

    /// Format a boolean literal.
    fn format_bool(&self, b: bool) -> &'static str;

    /// Format a NULL literal.
    fn format_null(&self) -> &'static str {
        "NULL"
    }

    /// Placeholder for a positional bound parameter.
    fn placeholder(&self) -> &'static str {
        "?"
    }

    // =========================================================================
    // Pagination
    // =========================================================================

    /// Emit `LIMIT n`.
    fn emit_limit(&self, limit: u64) -> TokenStream {
        helpers::emit_limit_standard(limit)
    }

    // =========================================================================
    // Date/Time
    // =========================================================================

    /// Format a timestamp expression as a `YYYY-MM` month label.
    fn month_bucket(&self, inner: &TokenStream) -> TokenStream;

    // =========================================================================
    // Function Remapping
    // =========================================================================

    /// Remap a function name for this dialect.
    ///
    /// Returns `Some(new_name)` if the function should be remapped, `None` to keep original.
    /// The input is matched case-insensitively.
    fn remap_function(&self, name: &str) -> Option<&'static str> {
        let _ = name;
        None
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Snowflake,
    DuckDb,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Snowflake => &Snowflake,
            Dialect::DuckDb => &DuckDb,
        }
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        self.dialect().quote_string(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        self.dialect().format_bool(b)
    }

    fn format_null(&self) -> &'static str {
        self.dialect().format_null()
    }

    fn placeholder(&self) -> &'static str {
        self.dialect().placeholder()
    }

    fn emit_limit(&self, limit: u64) -> TokenStream {
        self.dialect().emit_limit(limit)
    }

    fn month_bucket(&self, inner: &TokenStream) -> TokenStream {
        self.dialect().month_bucket(inner)
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        self.dialect().remap_function(name)
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// `FUNC(inner, 'format')`, shared by the month bucket implementations.
pub(crate) fn format_call(function: &str, inner: &TokenStream, format: &str) -> TokenStream {
    let mut ts = TokenStream::new();
    ts.push(Token::FunctionName(function.into()))
        .lparen()
        .append(inner)
        .comma()
        .space()
        .push(Token::LitString(format.into()))
        .rparen();
    ts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_names() {
        assert_eq!(Dialect::Snowflake.name(), "snowflake");
        assert_eq!(Dialect::DuckDb.to_string(), "duckdb");
    }

    #[test]
    fn test_month_bucket() {
        let mut inner = TokenStream::new();
        inner.push(Token::Ident("ORDER_TIMESTAMP".into()));

        assert_eq!(
            Dialect::Snowflake.month_bucket(&inner).serialize(Dialect::Snowflake),
            "TO_CHAR(ORDER_TIMESTAMP, 'YYYY-MM')"
        );
        assert_eq!(
            Dialect::DuckDb.month_bucket(&inner).serialize(Dialect::DuckDb),
            "STRFTIME(ORDER_TIMESTAMP, '%Y-%m')"
        );
    }

    #[test]
    fn test_limit() {
        let ts = Dialect::DuckDb.emit_limit(10);
        assert_eq!(ts.serialize(Dialect::DuckDb), "LIMIT 10");
    }

    #[test]
    fn test_function_remap() {
        assert_eq!(Dialect::DuckDb.remap_function("nvl"), Some("COALESCE"));
        assert_eq!(Dialect::Snowflake.remap_function("IFNULL"), Some("NVL"));
        assert_eq!(Dialect::Snowflake.remap_function("SUM"), None);
    }
}

//! DuckDB SQL dialect, used against local extracts of the warehouse schema.
//!
//! DuckDB differences from Snowflake:
//! - Quoted identifiers are matched case-insensitively, plain names stay bare
//! - `strftime` instead of `TO_CHAR`
//! - No `NVL`

use super::helpers;
use super::SqlDialect;
use crate::sql::token::TokenStream;

/// DuckDB SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct DuckDb;

impl SqlDialect for DuckDb {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_if_needed(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }

    fn month_bucket(&self, inner: &TokenStream) -> TokenStream {
        super::format_call("STRFTIME", inner, "%Y-%m")
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        helpers::remap_function_duckdb(name)
    }
}

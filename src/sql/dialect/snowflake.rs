//! Snowflake SQL dialect.
//!
//! Snowflake features:
//! - Unquoted identifiers resolve uppercase, so uppercase names stay bare
//! - `?` positional binds (connector and SQL API)
//! - `TO_CHAR` date formatting
//! - `SNOWFLAKE.CORTEX.COMPLETE` for hosted completions

use super::helpers;
use super::SqlDialect;
use crate::sql::token::TokenStream;

/// Snowflake SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Snowflake;

impl SqlDialect for Snowflake {
    fn name(&self) -> &'static str {
        "snowflake"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_if_needed(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }

    fn month_bucket(&self, inner: &TokenStream) -> TokenStream {
        super::format_call("TO_CHAR", inner, "YYYY-MM")
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        helpers::remap_function_snowflake(name)
    }
}

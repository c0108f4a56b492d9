//! SQL generation module.
//!
//! A small type-safe SQL builder for the dashboard's read-only queries.
//! Every user-influenced value is a bound parameter.
//!
//! - [`query`] - SELECT query builder
//! - [`expr`] - Expression AST and builder DSL
//! - [`statement`] - SQL text plus bind values
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - Snowflake and DuckDB dialects

pub mod dialect;
pub mod expr;
pub mod query;
pub mod statement;
pub mod token;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types at the sql module level
pub use dialect::{Dialect, SqlDialect};
pub use expr::{
    avg, case_when, col, count, count_distinct, func, lit_float, lit_int,
    lit_str, max, min, month_bucket, nullif, param, round, star, sum, table_col, BinaryOperator,
    Expr, ExprExt, Literal,
};
pub use query::{Cte, Join, OrderByExpr, Query, SelectExpr, SortDir, TableRef};
pub use statement::{BindValue, Statement};
pub use token::{Token, TokenStream};

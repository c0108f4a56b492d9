//! # ProfitLens
//!
//! Profitability, restaurant and customer analytics for a food-delivery
//! platform whose data lives in Snowflake.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        FilterSelection (cities, restaurants,             │
//! │        cuisines, date range) + Top-N                     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [filter + sql]
//! ┌─────────────────────────────────────────────────────────┐
//! │        Statement { sql, bound params }                   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [runner: TTL cache]
//! ┌─────────────────────────────────────────────────────────┐
//! │        Warehouse (SQL API session | driver worker)       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [dashboard | assistant]
//! ┌─────────────────────────────────────────────────────────┐
//! │        KPIs, Vega-Lite charts, insights, answers         │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod assistant;
pub mod cache;
pub mod chart;
pub mod config;
pub mod dashboard;
pub mod filter;
pub mod format;
pub mod runner;
pub mod sql;
pub mod table;
pub mod warehouse;

#[cfg(feature = "ui")]
pub mod web;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::assistant::{Answer, Assistant, CompletionModel};
    pub use crate::chart::{Chart, Theme};
    pub use crate::config::Settings;
    pub use crate::dashboard::{Dashboard, Tab, TabView, TopN};
    pub use crate::filter::{comparison_dimension, predicate, ColumnScope, Dimension, FilterSelection};
    pub use crate::format::{fmt_int, fmt_money, fmt_number, fmt_percent};
    pub use crate::runner::QueryRunner;
    pub use crate::sql::{Dialect, Query, Statement};
    pub use crate::warehouse::{ConnectionManager, QueryResult, Warehouse, WarehouseError};
}

//! WHERE-clause construction from a [`FilterSelection`].
//!
//! Every selected value is a bound parameter. Conditions are emitted in a
//! fixed order (city, restaurant, cuisine, date) and joined with AND.

use crate::sql::{col, param, table_col, Dialect, Expr, ExprExt};

use super::{Dimension, FilterSelection};

/// Alias of `FACT_ORDERS` in joined queries.
pub const ORDERS_ALIAS: &str = "O";
/// Alias of `DIM_RESTAURANT` in joined queries.
pub const RESTAURANT_ALIAS: &str = "R";

const ORDER_TIMESTAMP: &str = "ORDER_TIMESTAMP";

/// How filter columns are addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnScope {
    /// Bare column names on `V_PLATFORM_PROFITABILITY`.
    Unaliased,
    /// `R.` / `O.` prefixed names on `FACT_ORDERS O JOIN DIM_RESTAURANT R`.
    Aliased,
}

impl ColumnScope {
    /// Reference to a dimension column.
    pub fn dimension(&self, dimension: Dimension) -> Expr {
        match self {
            ColumnScope::Unaliased => col(dimension.column()),
            ColumnScope::Aliased => table_col(RESTAURANT_ALIAS, dimension.column()),
        }
    }

    /// Reference to the order timestamp.
    pub fn order_timestamp(&self) -> Expr {
        match self {
            ColumnScope::Unaliased => col(ORDER_TIMESTAMP),
            ColumnScope::Aliased => table_col(ORDERS_ALIAS, ORDER_TIMESTAMP),
        }
    }
}

const PREDICATE_ORDER: [Dimension; 3] = [Dimension::City, Dimension::Restaurant, Dimension::Cuisine];

/// Build the filter predicate, or `None` when nothing is selected.
pub fn predicate(selection: &FilterSelection, scope: ColumnScope) -> Option<Expr> {
    let mut conditions = Vec::new();

    for dimension in PREDICATE_ORDER {
        let values = selection.values(dimension);
        if values.is_empty() {
            continue;
        }
        let params = values.iter().map(|v| param(v.as_str())).collect();
        conditions.push(scope.dimension(dimension).in_list(params));
    }

    if let Some(range) = selection.date_range() {
        conditions.push(
            scope
                .order_timestamp()
                .between(param(range.start()), param(range.end())),
        );
    }

    conditions.into_iter().reduce(|acc, c| acc.and(c))
}

/// Human-readable predicate with values inlined, for prompts and logs.
pub fn predicate_text(
    selection: &FilterSelection,
    scope: ColumnScope,
    dialect: Dialect,
) -> Option<String> {
    predicate(selection, scope).map(|p| p.to_display_sql(dialect))
}

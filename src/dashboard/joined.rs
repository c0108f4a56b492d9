//! Building blocks for queries over `FACT_ORDERS O JOIN DIM_RESTAURANT R`.

use crate::filter::{predicate, ColumnScope, FilterSelection, ORDERS_ALIAS, RESTAURANT_ALIAS};
use crate::sql::{col, table_col, Expr, ExprExt, OrderByExpr, Query, SelectExpr, TableRef};

pub(crate) const VIEW: &str = "V_PLATFORM_PROFITABILITY";
pub(crate) const CUSTOMER_ALIAS: &str = "C";

pub(crate) fn o(column: &str) -> Expr {
    table_col(ORDERS_ALIAS, column)
}

pub(crate) fn r(column: &str) -> Expr {
    table_col(RESTAURANT_ALIAS, column)
}

pub(crate) fn c(column: &str) -> Expr {
    table_col(CUSTOMER_ALIAS, column)
}

/// `O.TOTAL_AMOUNT`, the order GMV.
pub(crate) fn gmv() -> Expr {
    o("TOTAL_AMOUNT")
}

/// `(delivery fee + commission) - (discount + payment processing fee)`.
pub(crate) fn net_profit() -> Expr {
    o("DELIVERY_FEE")
        .add(o("COMMISSION_REVENUE"))
        .paren()
        .sub(o("DISCOUNT_AMOUNT").add(o("PAYMENT_PROCESSING_FEE")).paren())
}

/// Orders joined to restaurants.
pub(crate) fn orders() -> Query {
    Query::new()
        .from(TableRef::new("FACT_ORDERS").with_alias(ORDERS_ALIAS))
        .inner_join(
            TableRef::new("DIM_RESTAURANT").with_alias(RESTAURANT_ALIAS),
            o("RESTAURANT_ID").eq(r("RESTAURANT_ID")),
        )
}

/// Orders joined to restaurants, filtered by the selection.
pub(crate) fn filtered_orders(filters: &FilterSelection) -> Query {
    orders().filter_opt(predicate(filters, ColumnScope::Aliased))
}

/// Orders joined to customers and restaurants, filtered by the selection.
pub(crate) fn filtered_customer_orders(filters: &FilterSelection) -> Query {
    Query::new()
        .from(TableRef::new("FACT_ORDERS").with_alias(ORDERS_ALIAS))
        .inner_join(
            TableRef::new("DIM_CUSTOMER").with_alias(CUSTOMER_ALIAS),
            o("CUSTOMER_ID").eq(c("CUSTOMER_ID")),
        )
        .inner_join(
            TableRef::new("DIM_RESTAURANT").with_alias(RESTAURANT_ALIAS),
            o("RESTAURANT_ID").eq(r("RESTAURANT_ID")),
        )
        .filter_opt(predicate(filters, ColumnScope::Aliased))
}

/// `SELECT key, measure AS alias ... GROUP BY key ORDER BY alias DESC LIMIT n`.
pub(crate) fn ranked(base: Query, key: Expr, measure: Expr, alias: &str, limit: u64) -> Query {
    base.select(vec![SelectExpr::from(key.clone()), measure.alias(alias)])
        .group_by(vec![key])
        .order_by(vec![OrderByExpr::desc(col(alias))])
        .limit(limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::{sum, Dialect};

    #[test]
    fn test_net_profit_expression() {
        assert_eq!(
            net_profit().to_sql(Dialect::Snowflake),
            "(O.DELIVERY_FEE + O.COMMISSION_REVENUE) - (O.DISCOUNT_AMOUNT + O.PAYMENT_PROCESSING_FEE)"
        );
    }

    #[test]
    fn test_filtered_orders_uses_aliased_predicate() {
        let filters = FilterSelection::new().with_cities(["Pune"]);
        let sql = filtered_orders(&filters)
            .select(vec![sum(gmv()).alias("GMV")])
            .to_sql(Dialect::Snowflake);
        assert!(sql.contains("INNER JOIN DIM_RESTAURANT R ON O.RESTAURANT_ID = R.RESTAURANT_ID"));
        assert!(sql.ends_with("WHERE R.CITY IN (?)"));
        let unfiltered = filtered_orders(&FilterSelection::new())
            .select(vec![col("X")])
            .to_sql(Dialect::Snowflake);
        assert!(!unfiltered.contains("WHERE"));
    }
}

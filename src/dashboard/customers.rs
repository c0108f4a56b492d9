//! Customer loyalty, activity and satisfaction.

use super::joined::{c, filtered_customer_orders, filtered_orders, gmv, o, r};
use super::{Kpi, Section, Tab, TabView, TopN};
use crate::chart::{labeled_records, Chart, FieldType};
use crate::filter::{comparison_dimension, FilterSelection};
use crate::format::{fmt_int, fmt_money};
use crate::runner::QueryRunner;
use crate::sql::{
    avg, case_when, col, count, count_distinct, lit_float, lit_int, lit_str, month_bucket, nullif,
    round, sum, table_col, Cte, Expr, ExprExt, OrderByExpr, Query, SelectExpr, TableRef,
};
use crate::warehouse::QueryResult;

pub(crate) const RATING_BUCKETS: [&str; 4] = [
    "Excellent (4.5–5)",
    "Good (3.5–4.49)",
    "Average (2.5–3.49)",
    "Poor (<2.5)",
];

fn sub(column: &str) -> Expr {
    table_col("SUB", column)
}

/// Per-customer aggregates in a CTE, summarized once.
pub(crate) fn kpi_query(filters: &FilterSelection) -> Query {
    let per_customer = filtered_orders(filters)
        .select(vec![
            SelectExpr::from(o("CUSTOMER_ID")),
            count(o("ORDER_ID")).alias("CUSTOMER_ORDER_COUNT"),
            sum(gmv()).alias("CUSTOMER_GMV"),
        ])
        .group_by(vec![o("CUSTOMER_ID")]);

    let repeat = || {
        count_distinct(case_when(
            vec![(sub("CUSTOMER_ORDER_COUNT").gt(lit_int(1)), sub("CUSTOMER_ID"))],
            None,
        ))
    };
    let total = || count_distinct(sub("CUSTOMER_ID"));

    Query::new()
        .with_cte(Cte::new("SUB", per_customer))
        .select(vec![
            total().alias("TOTAL_CUSTOMERS"),
            repeat().alias("REPEAT_CUSTOMERS"),
            round(
                repeat().mul(lit_float(100.0)).div(nullif(total(), lit_int(0))),
                2,
            )
            .alias("REPEAT_RATE"),
            round(avg(sub("CUSTOMER_ORDER_COUNT")), 2).alias("AVG_ORDERS_PER_CUSTOMER"),
            round(avg(sub("CUSTOMER_GMV")), 2).alias("AVG_GMV_PER_CUSTOMER"),
        ])
        .from(TableRef::new("SUB"))
}

/// Distinct active customers per month, optionally per `split` column.
pub(crate) fn monthly_active_query(filters: &FilterSelection, split: Option<&str>) -> Query {
    let month = month_bucket(o("ORDER_TIMESTAMP"));
    let mut select = vec![month.clone().alias("MONTH")];
    let mut group = vec![month];
    if let Some(column) = split {
        select.push(SelectExpr::from(r(column)));
        group.push(r(column));
    }
    select.push(count_distinct(o("CUSTOMER_ID")).alias("ACTIVE_CUSTOMERS"));

    filtered_orders(filters)
        .select(select)
        .group_by(group)
        .order_by(vec![OrderByExpr::asc(col("MONTH"))])
}

pub(crate) fn loyal_query(filters: &FilterSelection, limit: u64) -> Query {
    filtered_customer_orders(filters)
        .select(vec![
            SelectExpr::from(c("CUSTOMER_NAME")),
            count(o("ORDER_ID")).alias("TOTAL_ORDERS"),
            round(sum(gmv()), 2).alias("TOTAL_SPENT"),
        ])
        .group_by(vec![c("CUSTOMER_NAME")])
        .order_by(vec![OrderByExpr::desc(col("TOTAL_ORDERS"))])
        .limit(limit)
}

pub(crate) fn rating_distribution_query(filters: &FilterSelection) -> Query {
    let rating = || o("ORDER_RATING");
    let bucket = case_when(
        vec![
            (
                rating().between(lit_float(4.5), lit_int(5)),
                lit_str(RATING_BUCKETS[0]),
            ),
            (
                rating().between(lit_float(3.5), lit_float(4.49)),
                lit_str(RATING_BUCKETS[1]),
            ),
            (
                rating().between(lit_float(2.5), lit_float(3.49)),
                lit_str(RATING_BUCKETS[2]),
            ),
        ],
        Some(lit_str(RATING_BUCKETS[3])),
    );
    filtered_orders(filters)
        .filter(rating().is_not_null())
        .select(vec![
            bucket.clone().alias("RATING_CATEGORY"),
            count(o("ORDER_ID")).alias("RATING_COUNT"),
        ])
        .group_by(vec![bucket])
        .order_by(vec![OrderByExpr::desc(col("RATING_COUNT"))])
}

pub async fn render(runner: &QueryRunner, filters: &FilterSelection, top_n: TopN) -> TabView {
    let mut view = TabView::new(
        Tab::Customers,
        "Customer Insights",
        "Loyalty, ratings, and monthly active users",
    );
    view.cross_filter_notice(filters);

    match runner.run_query(&kpi_query(filters)).await {
        Ok(res) if !res.is_empty() => {
            let (kpis, insight) = customer_kpis(&res);
            view.kpis = kpis;
            view.push(Section::new("Customer KPIs", "").text(insight));
        }
        Ok(_) => view.push(
            Section::new("Customer KPIs", "").empty("No customer KPI data found for selected filters."),
        ),
        Err(e) => view.push(Section::new("Customer KPIs", "").failed(&e)),
    }

    let split = comparison_dimension(filters).map(|d| d.column());
    view.push(
        Section::new(
            "Monthly Active Customers (MAC)",
            "Unique customers placing orders each month",
        )
        .from_result(
            runner.run_query(&monthly_active_query(filters, split)).await,
            "No monthly active customer data found for selected filters.",
            |s, res| monthly_active(s, res, split),
        ),
    );

    view.push(
        Section::new(format!("Top {} Loyal Customers (Most Orders)", top_n.get()), "Most orders placed")
            .from_result(
                runner.run_query(&loyal_query(filters, top_n.limit())).await,
                "No loyal customer data available for selected filters.",
                loyal,
            ),
    );

    view.push(
        Section::new("Customer Rating Distribution", "How customers rate their orders").from_result(
            runner.run_query(&rating_distribution_query(filters)).await,
            "No rating data available for selected filters.",
            |s, res| {
                let chart = Chart::donut(
                    "Rating Distribution",
                    "RATING_CATEGORY",
                    "RATING_COUNT",
                    res.to_records(),
                );
                let s = s.chart(chart);
                match res.str_at(0, "RATING_CATEGORY") {
                    Some(top) => s.insight(format!(
                        "Majority of customer ratings fall in the {} category.",
                        top
                    )),
                    None => s,
                }
            },
        ),
    );

    view
}

fn customer_kpis(res: &QueryResult) -> (Vec<Kpi>, String) {
    let total = res.f64_at(0, "TOTAL_CUSTOMERS").unwrap_or(0.0);
    let repeat = res.f64_at(0, "REPEAT_CUSTOMERS").unwrap_or(0.0);
    let rate = res.f64_at(0, "REPEAT_RATE").unwrap_or(0.0);
    let avg_orders = res.f64_at(0, "AVG_ORDERS_PER_CUSTOMER").unwrap_or(0.0);
    let avg_gmv = res.f64_at(0, "AVG_GMV_PER_CUSTOMER").unwrap_or(0.0);
    let kpis = vec![
        Kpi::new("Total Customers", fmt_int(&total), "Unique customers in scope"),
        Kpi::new("Repeat Customers", fmt_int(&repeat), "Placed >1 orders"),
        Kpi::new("Repeat Rate", format!("{:.2} %", rate), "Repeat / total customers"),
        Kpi::new("Avg Orders/Customer", format!("{:.2}", avg_orders), "Order frequency"),
        Kpi::new("Avg GMV/Customer", fmt_money(&avg_gmv), "Spend per customer"),
    ];
    let insight = format!(
        "Across the filter scope, {} customers are active, with a repeat rate of {:.2}%.",
        fmt_int(&total),
        rate
    );
    (kpis, insight)
}

fn monthly_active(section: Section, res: &QueryResult, split: Option<&str>) -> Section {
    let mut chart = Chart::line("Monthly Active Customers", "MONTH", "ACTIVE_CUSTOMERS", res.to_records());
    if let Some(column) = split {
        chart = chart.split_by(column);
    }
    let section = section.chart(chart);
    if split.is_some() || res.row_count() < 2 {
        return section;
    }
    let n = res.row_count();
    let last = res.f64_at(n - 1, "ACTIVE_CUSTOMERS").unwrap_or(0.0);
    let prev = res.f64_at(n - 2, "ACTIVE_CUSTOMERS").unwrap_or(0.0);
    let delta = last - prev;
    let direction = if delta > 0.0 {
        "increased"
    } else if delta < 0.0 {
        "decreased"
    } else {
        "stable"
    };
    section.insight(format!(
        "Monthly active customers have {} by {} compared to the previous month.",
        direction,
        delta.abs()
    ))
}

fn loyal(section: Section, res: &QueryResult) -> Section {
    let values = labeled_records(res, "TOTAL_ORDERS", |v| fmt_int(&v));
    let chart = Chart::bar("Loyal Customers", "CUSTOMER_NAME", "TOTAL_ORDERS", values)
        .with_label("LABEL")
        .with_tooltip("TOTAL_SPENT", FieldType::Quantitative);
    let section = section.chart(chart);
    match res.str_at(0, "CUSTOMER_NAME") {
        Some(name) => section.insight(format!(
            "{} is the most loyal customer with {} orders totaling {} spent.",
            name,
            fmt_int(&res.f64_at(0, "TOTAL_ORDERS").unwrap_or(0.0)),
            fmt_money(&res.f64_at(0, "TOTAL_SPENT").unwrap_or(0.0))
        )),
        None => section,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::test_utils::validate_sql;
    use crate::sql::Dialect;
    use crate::warehouse::Column;
    use insta::assert_snapshot;
    use serde_json::json;

    const SF: Dialect = Dialect::Snowflake;

    #[test]
    fn test_kpi_query_uses_cte() {
        let stmt = kpi_query(&FilterSelection::new()).to_statement(SF);
        assert!(stmt.sql.starts_with("WITH SUB AS ("));
        assert!(stmt.sql.contains("NULLIF(COUNT(DISTINCT SUB.CUSTOMER_ID), 0)"));
        validate_sql(&stmt.sql, SF).unwrap();
    }

    #[test]
    fn test_monthly_active_split() {
        let stmt = monthly_active_query(&FilterSelection::new(), Some("CITY")).to_statement(SF);
        assert_snapshot!(stmt.sql, @r"
        SELECT
          TO_CHAR(O.ORDER_TIMESTAMP, 'YYYY-MM') AS MONTH,
          R.CITY,
          COUNT(DISTINCT O.CUSTOMER_ID) AS ACTIVE_CUSTOMERS
        FROM FACT_ORDERS O
        INNER JOIN DIM_RESTAURANT R ON O.RESTAURANT_ID = R.RESTAURANT_ID
        GROUP BY TO_CHAR(O.ORDER_TIMESTAMP, 'YYYY-MM'), R.CITY
        ORDER BY MONTH ASC
        ");
        validate_sql(&stmt.sql, SF).unwrap();
    }

    #[test]
    fn test_rating_distribution_validates() {
        let stmt = rating_distribution_query(&FilterSelection::new().with_cities(["Pune"])).to_statement(SF);
        assert!(stmt.sql.contains("'Excellent (4.5–5)'"));
        assert!(stmt.sql.contains("WHERE R.CITY IN (?) AND O.ORDER_RATING IS NOT NULL"));
        validate_sql(&stmt.sql, SF).unwrap();
    }

    #[test]
    fn test_monthly_delta_insight() {
        let res = QueryResult::new(
            vec![Column::new("MONTH", "TEXT"), Column::new("ACTIVE_CUSTOMERS", "FIXED")],
            vec![vec![json!("2024-01"), json!(40)], vec![json!("2024-02"), json!(35)]],
        );
        let section = monthly_active(Section::new("MAC", ""), &res, None);
        assert_eq!(
            section.insights,
            vec!["Monthly active customers have decreased by 5 compared to the previous month."]
        );
        let split = monthly_active(Section::new("MAC", ""), &res, Some("CITY"));
        assert!(split.insights.is_empty());
    }
}

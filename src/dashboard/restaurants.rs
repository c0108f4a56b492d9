//! Restaurant and menu insights over the joined order tables.

use serde_json::Value;

use super::joined::{c, filtered_customer_orders, filtered_orders, gmv, net_profit, o, r, ranked};
use super::{Kpi, Section, Tab, TabView, TopN};
use crate::chart::{display_title, labeled_records, Chart, FieldType};
use crate::filter::{predicate, ColumnScope, FilterSelection, ORDERS_ALIAS, RESTAURANT_ALIAS};
use crate::format::{fmt_money, fmt_number};
use crate::runner::QueryRunner;
use crate::sql::{
    avg, col, count, lit_int, max, min, round, sum, table_col, ExprExt, OrderByExpr, Query,
    SelectExpr, TableRef,
};
use crate::table;
use crate::warehouse::QueryResult;

pub(crate) fn rating_kpis_query(filters: &FilterSelection) -> Query {
    filtered_orders(filters)
        .filter(o("ORDER_RATING").is_not_null())
        .select(vec![
            round(avg(o("ORDER_RATING")), 2).alias("AVG_RATING"),
            max(o("ORDER_RATING")).alias("MAX_RATING"),
            min(o("ORDER_RATING")).alias("MIN_RATING"),
        ])
}

pub(crate) fn rated_restaurant_query(filters: &FilterSelection, highest: bool) -> Query {
    let order = if highest {
        OrderByExpr::desc(col("AVG_RATING"))
    } else {
        OrderByExpr::asc(col("AVG_RATING"))
    };
    filtered_orders(filters)
        .filter(o("ORDER_RATING").is_not_null())
        .select(vec![
            SelectExpr::from(r("RESTAURANT_NAME")),
            round(avg(o("ORDER_RATING")), 2).alias("AVG_RATING"),
        ])
        .group_by(vec![r("RESTAURANT_NAME")])
        .order_by(vec![order])
        .limit(1)
}

pub(crate) fn commission_profit_query(filters: &FilterSelection) -> Query {
    filtered_orders(filters)
        .filter(r("COMMISSION_RATE").is_not_null())
        .select(vec![
            SelectExpr::from(r("COMMISSION_RATE")),
            sum(net_profit()).alias("TOTAL_NET_PROFIT"),
        ])
        .group_by(vec![r("COMMISSION_RATE")])
        .having(count(o("ORDER_ID")).gt(lit_int(10)))
}

pub(crate) fn menu_categories_query(filters: &FilterSelection, limit: u64) -> Query {
    let base = Query::new()
        .from(TableRef::new("FACT_ORDER_ITEMS").with_alias("I"))
        .inner_join(
            TableRef::new("DIM_MENU_ITEM").with_alias("M"),
            table_col("I", "MENU_ITEM_ID").eq(table_col("M", "MENU_ITEM_ID")),
        )
        .inner_join(
            TableRef::new("FACT_ORDERS").with_alias(ORDERS_ALIAS),
            table_col("I", "ORDER_ID").eq(o("ORDER_ID")),
        )
        .inner_join(
            TableRef::new("DIM_RESTAURANT").with_alias(RESTAURANT_ALIAS),
            o("RESTAURANT_ID").eq(r("RESTAURANT_ID")),
        )
        .filter_opt(predicate(filters, ColumnScope::Aliased));
    ranked(
        base,
        table_col("M", "CATEGORY"),
        sum(table_col("I", "ITEM_PRICE_AT_ORDER").mul(table_col("I", "QUANTITY"))),
        "TOTAL_REVENUE",
        limit,
    )
}

pub(crate) fn rating_volume_query(filters: &FilterSelection) -> Query {
    filtered_orders(filters)
        .select(vec![
            SelectExpr::from(r("RESTAURANT_NAME")),
            SelectExpr::from(r("AVERAGE_RATING")),
            count(o("ORDER_ID")).alias("ORDER_VOLUME"),
        ])
        .group_by(vec![r("RESTAURANT_NAME"), r("AVERAGE_RATING")])
        .having(count(o("ORDER_ID")).gt(lit_int(3)))
}

pub async fn render(runner: &QueryRunner, filters: &FilterSelection, top_n: TopN) -> TabView {
    let mut view = TabView::new(
        Tab::Restaurants,
        "Restaurant Deep Dive",
        "Profitability, ratings, cuisine performance, and commission dynamics",
    );
    view.cross_filter_notice(filters);
    let n = top_n.get();
    let limit = top_n.limit();

    match rating_kpis(runner, filters).await {
        Ok(kpis) => view.kpis = kpis,
        Err(section) => view.push(section),
    }

    let money = |v: f64| fmt_money(&v);

    let q = ranked(filtered_orders(filters), r("RESTAURANT_NAME"), sum(net_profit()), "TOTAL_PROFIT", limit);
    view.push(
        Section::new(
            format!("Top {} Restaurants by Profit", n),
            "Which restaurants contribute the most profit",
        )
        .from_result(runner.run_query(&q).await, "No profit data found for restaurants.", |s, res| {
            ranked_bar(s, res, "RESTAURANT_NAME", "TOTAL_PROFIT", money)
        }),
    );

    let q = ranked(filtered_orders(filters), r("RESTAURANT_NAME"), sum(gmv()), "TOTAL_GMV", limit);
    view.push(
        Section::new(
            format!("Top {} Restaurants by GMV", n),
            "Restaurants driving the highest gross sales value",
        )
        .from_result(runner.run_query(&q).await, "No GMV data found for restaurants.", |s, res| {
            ranked_bar(s, res, "RESTAURANT_NAME", "TOTAL_GMV", money)
        }),
    );

    let q = ranked(filtered_orders(filters), r("CUISINE_TYPE"), sum(net_profit()), "TOTAL_NET_PROFIT", limit);
    view.push(
        Section::new(
            format!("Top {} Cuisine Performance by Net Profit", n),
            "Which cuisines drive profitability",
        )
        .from_result(runner.run_query(&q).await, "No cuisine profit data found.", |s, res| {
            ranked_bar(s, res, "CUISINE_TYPE", "TOTAL_NET_PROFIT", money)
        }),
    );

    let q = ranked(filtered_orders(filters), r("CUISINE_TYPE"), sum(gmv()), "TOTAL_GMV", limit);
    view.push(
        Section::new(format!("Top {} Cuisine Comparison by GMV", n), "Top cuisines by total GMV")
            .from_result(runner.run_query(&q).await, "No cuisine GMV data found.", |s, res| {
                ranked_bar(s, res, "CUISINE_TYPE", "TOTAL_GMV", money)
            }),
    );

    let q = ranked(filtered_customer_orders(filters), c("CUSTOMER_NAME"), sum(gmv()), "TOTAL_GMV", limit);
    view.push(
        Section::new(
            format!("Top {} High Value Customers by GMV", n),
            "Who are your biggest spenders",
        )
        .from_result(runner.run_query(&q).await, "No customer GMV data found.", |s, res| {
            ranked_bar(s, res, "CUSTOMER_NAME", "TOTAL_GMV", money)
        }),
    );

    view.push(
        Section::new(
            "Commission Rate vs Profitability (r)",
            "Do higher commission rates drive more profit?",
        )
        .from_result(
            runner.run_query(&commission_profit_query(filters)).await,
            "No commission data available.",
            |s, res| {
                let chart = Chart::scatter(
                    "Commission Rate vs Net Profit",
                    "COMMISSION_RATE",
                    "TOTAL_NET_PROFIT",
                    res.to_records(),
                )
                .with_axis_titles("Commission Rate", "Total Net Profit (₹)");
                correlation_insight(s.chart(chart), res, "COMMISSION_RATE", "TOTAL_NET_PROFIT")
            },
        ),
    );

    let q = ranked(
        filtered_orders(filters),
        r("CUISINE_TYPE"),
        round(avg(r("COMMISSION_RATE")), 3),
        "AVG_COMMISSION",
        limit,
    );
    view.push(
        Section::new(
            format!("Top {} Avg Commission by Cuisine Type", n),
            "Average commission rate across cuisines",
        )
        .from_result(runner.run_query(&q).await, "No commission per cuisine data found.", |s, res| {
            ranked_bar(s, res, "CUISINE_TYPE", "AVG_COMMISSION", percent_of_rate)
        }),
    );

    view.push(
        Section::new(
            format!("Top {} Menu Categories by Revenue", n),
            "Most revenue-generating food categories",
        )
        .from_result(
            runner.run_query(&menu_categories_query(filters, limit)).await,
            "No category revenue data found.",
            |s, res| ranked_bar(s, res, "CATEGORY", "TOTAL_REVENUE", money),
        ),
    );

    view.push(
        Section::new(
            "Restaurant Rating vs Order Volume (r)",
            "Do higher ratings correlate with more orders?",
        )
        .from_result(
            runner.run_query(&rating_volume_query(filters)).await,
            "No rating/order volume data found.",
            |s, res| {
                let chart = Chart::scatter(
                    "Rating vs Order Volume",
                    "AVERAGE_RATING",
                    "ORDER_VOLUME",
                    res.to_records(),
                )
                .with_tooltip("RESTAURANT_NAME", FieldType::Nominal)
                .with_axis_titles("Average Rating (0.00)", "Order Volume");
                correlation_insight(s.chart(chart), res, "AVERAGE_RATING", "ORDER_VOLUME")
            },
        ),
    );

    view
}

/// Rating tiles. A failed KPI query becomes a failed section.
async fn rating_kpis(runner: &QueryRunner, filters: &FilterSelection) -> Result<Vec<Kpi>, Section> {
    let overview = runner
        .run_query(&rating_kpis_query(filters))
        .await
        .map_err(|e| Section::new("Ratings Overview", "").failed(&e))?;
    let avg_rating = overview.f64_at(0, "AVG_RATING").unwrap_or(0.0);

    let mut kpis = vec![Kpi::new(
        "Avg Platform Rating",
        format!("{:.2}", avg_rating),
        "Mean order rating",
    )];
    for (highest, label, caption) in [
        (true, "Highest Rated", "Top average rating"),
        (false, "Lowest Rated", "Lowest average rating"),
    ] {
        let value = match runner.run_query(&rated_restaurant_query(filters, highest)).await {
            Ok(res) => rated_label(&res),
            Err(e) => return Err(Section::new("Ratings Overview", "").failed(&e)),
        };
        kpis.push(Kpi::new(label, value, caption));
    }
    Ok(kpis)
}

/// `"Name (4.62)"`, or `"N/A (0.00)"` without a match.
fn rated_label(result: &QueryResult) -> String {
    let name = result
        .str_at(0, "RESTAURANT_NAME")
        .unwrap_or_else(|| "N/A".to_string());
    let rating = result.f64_at(0, "AVG_RATING").unwrap_or(0.0);
    format!("{} ({:.2})", name, rating)
}

fn ranked_bar<F>(section: Section, result: &QueryResult, key: &str, metric: &str, label: F) -> Section
where
    F: Fn(f64) -> String,
{
    let values: Vec<Value> = labeled_records(result, metric, &label);
    let title = format!("{} by {}", display_title(metric), display_title(key));
    let leader = result.str_at(0, key);
    let top = result.f64_at(0, metric).unwrap_or(0.0);
    let section = section.chart(Chart::bar(title, key, metric, values).with_label("LABEL"));
    match leader {
        Some(leader) => section.insight(format!("{} ranks first at {}.", leader, label(top))),
        None => section,
    }
}

/// Commission rates are fractions; labels show them as percentages.
fn percent_of_rate(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

fn correlation_insight(section: Section, result: &QueryResult, x: &str, y: &str) -> Section {
    match table::pearson(&table::pairs(result, x, y)) {
        Some(r) => section.insight(format!(
            "Correlation (r): {} ({})",
            fmt_number(&table::round2(r)),
            table::correlation_direction(r)
        )),
        None => section.insight("Correlation (r): not enough variation to compute"),
    }
}

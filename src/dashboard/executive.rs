//! Executive overview: KPIs and breakdowns over the profitability view.
//!
//! One `SELECT *` with the unaliased predicate feeds every tile and chart;
//! aggregation happens in memory.

use serde_json::{json, Value};

use super::joined::VIEW;
use super::{Kpi, Section, Tab, TabView, TopN};
use crate::chart::{display_title, pair_records, Chart};
use crate::filter::{comparison_dimension, predicate, ColumnScope, FilterSelection};
use crate::format::{fmt_int, fmt_money, fmt_percent};
use crate::runner::QueryRunner;
use crate::sql::{Query, TableRef};
use crate::table;
use crate::warehouse::QueryResult;

pub(crate) fn base_query(filters: &FilterSelection) -> Query {
    Query::new()
        .select_star()
        .from(TableRef::new(VIEW))
        .filter_opt(predicate(filters, ColumnScope::Unaliased))
}

pub async fn render(runner: &QueryRunner, filters: &FilterSelection, top_n: TopN) -> TabView {
    let mut view = TabView::new(
        Tab::Executive,
        "Executive Dashboard",
        "Operational insights and profitability overview powered by Snowflake",
    );
    view.cross_filter_notice(filters);

    let data = match runner.run_query(&base_query(filters)).await {
        Ok(data) => data,
        Err(e) => {
            view.push(Section::new("Executive KPIs", "").failed(&e));
            return view;
        }
    };
    if data.is_empty() {
        view.notice("No data found for selected filters.");
        return view;
    }

    view.kpis = kpis(&data);

    let comparison = comparison_dimension(filters);
    let group = comparison.map_or("CITY", |d| d.column());
    let n = top_n.get() as usize;

    view.push(monthly_trend(&data, comparison.map(|d| d.column())));
    view.push(order_share(&data, group, n));
    view.push(ranked_bar(
        &data,
        group,
        "GMV",
        n,
        format!("Top {} {} by GMV", n, display_title(group)),
        "Where sales value is concentrated",
        "No GMV data found for this grouping.",
    ));
    view.push(ranked_bar(
        &data,
        group,
        "NET_PROFIT",
        n,
        format!("Top {} {} by Net Profit", n, display_title(group)),
        "Ranking segments based on total net profit",
        "No Net Profit data found for this grouping.",
    ));
    view
}

fn kpis(data: &QueryResult) -> Vec<Kpi> {
    let total_gmv = table::sum(data, "GMV");
    let total_orders = table::nunique(data, "ORDER_ID");
    let net_profit = table::sum(data, "NET_PROFIT");
    let aov = if total_orders > 0 {
        total_gmv / total_orders as f64
    } else {
        0.0
    };
    let margin = if total_gmv != 0.0 {
        net_profit / total_gmv * 100.0
    } else {
        0.0
    };
    vec![
        Kpi::new("Total GMV", fmt_money(&total_gmv), "Gross Merchandise Value"),
        Kpi::new("Total Orders", fmt_int(&total_orders), "Unique Orders"),
        Kpi::new("Avg Order Value", fmt_money(&aov), "GMV / Orders"),
        Kpi::new("Profit Margin", fmt_percent(&margin), "Net Profit / GMV"),
    ]
}

fn monthly_trend(data: &QueryResult, comparison: Option<&str>) -> Section {
    let split = comparison.filter(|column| table::nunique(data, column) > 1);
    let grouped_by = comparison.map_or_else(|| "Overall".to_string(), display_title);
    let section = Section::new(
        format!("Monthly GMV Trend (Grouped by {})", grouped_by),
        "Tracks month-over-month revenue trajectory",
    );

    let points = table::monthly_sum(data, "ORDER_TIMESTAMP", split, "GMV");
    if points.is_empty() {
        return section.empty("No dated orders found for selected filters.");
    }
    let values: Vec<Value> = points
        .iter()
        .map(|(month, series, gmv)| {
            let mut record = json!({ "MONTH": month, "GMV": gmv });
            if let (Some(column), Some(series)) = (split, series) {
                record[column] = json!(series);
            }
            record
        })
        .collect();

    let mut chart = Chart::line("Monthly GMV", "MONTH", "GMV", values);
    if let Some(column) = split {
        chart = chart.split_by(column);
    }
    let mut section = section.chart(chart);
    if split.is_none() {
        if let Some((month, _, gmv)) = points.last() {
            section = section.insight(format!("{} closed at {} GMV.", month, fmt_money(gmv)));
        }
    }
    section
}

fn order_share(data: &QueryResult, group: &str, n: usize) -> Section {
    let section = Section::new(
        format!("Top {} Order Share by {}", n, display_title(group)),
        "Distribution of order volume across segments",
    );
    let counts = table::top_n(table::group_nunique(data, group, "ORDER_ID"), n);
    if counts.is_empty() {
        return section.empty("No order share data found for this grouping.");
    }
    let orders: Vec<f64> = counts.iter().map(|(_, c)| *c as f64).collect();
    let shares = table::calc_share(&orders);
    let values = counts
        .iter()
        .zip(&shares)
        .map(|((k, c), share)| json!({ group: k, "ORDERS": c, "SHARE": share }))
        .collect();

    let (leader, _) = &counts[0];
    section
        .chart(Chart::donut("Order Share", group, "ORDERS", values))
        .insight(format!(
            "{} accounts for {:.2}% of orders among the top {}.",
            leader,
            shares.first().copied().unwrap_or(0.0),
            counts.len()
        ))
}

fn ranked_bar(
    data: &QueryResult,
    group: &str,
    metric: &str,
    n: usize,
    title: String,
    caption: &str,
    empty: &str,
) -> Section {
    let section = Section::new(title, caption);
    let ranked = table::top_n(table::group_sum(data, group, metric), n);
    if ranked.is_empty() {
        return section.empty(empty);
    }
    let values = pair_records(group, metric, &ranked, |v| fmt_money(&v));
    let (leader, top) = &ranked[0];
    let chart_title = format!("{} by {}", display_title(metric), display_title(group));
    section
        .chart(Chart::bar(chart_title, group, metric, values).with_label("LABEL"))
        .insight(format!("{} leads with {} {}.", leader, fmt_money(top), display_title(metric)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::test_utils::validate_sql;
    use crate::sql::Dialect;
    use insta::assert_snapshot;

    #[test]
    fn test_base_query_unaliased() {
        let filters = FilterSelection::new().with_cuisines(["Thai"]);
        let stmt = base_query(&filters).to_statement(Dialect::Snowflake);
        assert_snapshot!(stmt.sql, @r"
        SELECT
          *
        FROM V_PLATFORM_PROFITABILITY
        WHERE CUISINE_TYPE IN (?)
        ");
        validate_sql(&stmt.sql, Dialect::Snowflake).unwrap();
    }
}

//! Pick a chart for an ad-hoc query result.

use crate::chart::{display_title, labeled_records, Chart};
use crate::format::{fmt_int, fmt_money};
use crate::warehouse::{value_as_f64, QueryResult};

/// Grouping columns, in priority order.
const GROUP_COLUMNS: [&str; 3] = ["CITY", "CUISINE_TYPE", "RESTAURANT_NAME"];

/// Metric name fragments, in priority order.
const METRIC_FRAGMENTS: [&str; 3] = ["GMV", "PROFIT", "ORDER"];

/// A bar chart for grouped metrics, a line chart for metrics over time,
/// otherwise `None` and the caller shows the table alone.
pub fn suggest_chart(result: &QueryResult) -> Option<Chart> {
    if result.is_empty() {
        return None;
    }
    let metric = metric_column(result)?;
    let monetary = metric.contains("GMV") || metric.contains("PROFIT");
    let values = labeled_records(result, &metric, |v| {
        if monetary {
            fmt_money(&v)
        } else {
            fmt_int(&v)
        }
    });

    if let Some(group) = GROUP_COLUMNS.iter().find(|g| result.column_index(g).is_some()) {
        let title = format!("{} by {}", display_title(&metric), display_title(group));
        return Some(Chart::bar(title, group, &metric, values).with_label("LABEL"));
    }

    let time = result
        .columns
        .iter()
        .map(|c| c.name.as_str())
        .find(|name| name.contains("TIMESTAMP") || name.contains("MONTH"))?;
    Some(Chart::line(format!("{} Trend", metric), time, &metric, values))
}

/// First numeric column whose name contains a metric fragment.
///
/// Identifier, timestamp and rating columns are never metrics.
fn metric_column(result: &QueryResult) -> Option<String> {
    METRIC_FRAGMENTS.iter().find_map(|fragment| {
        result
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .filter(|name| name.contains(fragment))
            .filter(|name| !name.ends_with("_ID") && !name.contains("TIMESTAMP") && !name.contains("RATING"))
            .find(|name| is_numeric(result, name))
            .map(str::to_string)
    })
}

fn is_numeric(result: &QueryResult, column: &str) -> bool {
    result
        .column_values(column)
        .iter()
        .find(|v| !v.is_null())
        .is_some_and(|v| value_as_f64(v).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartKind;
    use crate::warehouse::Column;
    use serde_json::json;

    fn result(columns: &[&str], rows: Vec<Vec<serde_json::Value>>) -> QueryResult {
        QueryResult::new(columns.iter().map(|c| Column::new(*c, "TEXT")).collect(), rows)
    }

    #[test]
    fn test_grouped_metric_is_a_bar() {
        let res = result(
            &["CITY", "TOTAL_GMV"],
            vec![vec![json!("Pune"), json!(1500000.0)], vec![json!("Goa"), json!(900.0)]],
        );
        let chart = suggest_chart(&res).unwrap();
        assert_eq!(chart.kind, ChartKind::Bar);
        assert_eq!(chart.title, "Total Gmv by City");
        assert_eq!(chart.values[0]["LABEL"], "₹1.50M");
    }

    #[test]
    fn test_order_counts_use_integer_labels() {
        let res = result(
            &["CUISINE_TYPE", "TOTAL_ORDERS"],
            vec![vec![json!("Thai"), json!("42")]],
        );
        let chart = suggest_chart(&res).unwrap();
        assert_eq!(chart.title, "Total Orders by Cuisine Type");
        assert_eq!(chart.values[0]["LABEL"], "42.00");
    }

    #[test]
    fn test_metric_over_time_is_a_line() {
        let res = result(
            &["MONTH", "NET_PROFIT"],
            vec![vec![json!("2024-01"), json!(10.5)], vec![json!("2024-02"), json!(12.0)]],
        );
        let chart = suggest_chart(&res).unwrap();
        assert_eq!(chart.kind, ChartKind::Line);
        assert_eq!(chart.title, "NET_PROFIT Trend");
        assert_eq!(chart.x.name, "MONTH");
    }

    #[test]
    fn test_no_chart_without_metric() {
        let res = result(
            &["RESTAURANT_NAME", "AVERAGE_RATING"],
            vec![vec![json!("Spice Hub"), json!(4.5)]],
        );
        assert!(suggest_chart(&res).is_none());

        let ids = result(&["CITY", "ORDER_ID"], vec![vec![json!("Pune"), json!(7)]]);
        assert!(suggest_chart(&ids).is_none());
    }
}

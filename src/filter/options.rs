//! Selectable filter values, loaded from the profitability view.

use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::warn;

use crate::runner::QueryRunner;
use crate::sql::{col, max, min, ExprExt, OrderByExpr, Query, TableRef};
use crate::warehouse::QueryResult;

use super::Dimension;

const VIEW: &str = "V_PLATFORM_PROFITABILITY";

/// Values offered for each filter, plus the default date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOptions {
    pub cities: Vec<String>,
    pub restaurants: Vec<String>,
    pub cuisines: Vec<String>,
    pub min_date: NaiveDate,
    pub max_date: NaiveDate,
}

/// Load distinct dimension values and the order date span.
///
/// A failed value list comes back empty; a failed or unparseable date span
/// falls back to 2020-01-01 through today.
pub async fn load_options(runner: &QueryRunner) -> FilterOptions {
    let cities = distinct_values(runner, Dimension::City).await;
    let restaurants = distinct_values(runner, Dimension::Restaurant).await;
    let cuisines = distinct_values(runner, Dimension::Cuisine).await;

    let span = Query::new()
        .select(vec![
            min(col("ORDER_TIMESTAMP")).alias("MIN_DATE"),
            max(col("ORDER_TIMESTAMP")).alias("MAX_DATE"),
        ])
        .from(TableRef::new(VIEW));
    let (min_date, max_date) = match runner.run_query(&span).await {
        Ok(result) => date_span(&result).unwrap_or_else(fallback_span),
        Err(e) => {
            warn!(error = %e, "could not load the order date span");
            fallback_span()
        }
    };

    FilterOptions {
        cities,
        restaurants,
        cuisines,
        min_date,
        max_date,
    }
}

async fn distinct_values(runner: &QueryRunner, dimension: Dimension) -> Vec<String> {
    let column = dimension.column();
    let query = Query::new()
        .select(vec![col(column)])
        .distinct()
        .from(TableRef::new(VIEW))
        .order_by(vec![OrderByExpr::asc(col(column))]);
    match runner.run_query(&query).await {
        Ok(result) => (0..result.row_count())
            .filter_map(|row| result.str_at(row, column))
            .collect(),
        Err(e) => {
            warn!(error = %e, column, "could not load filter values");
            Vec::new()
        }
    }
}

fn date_span(result: &QueryResult) -> Option<(NaiveDate, NaiveDate)> {
    let start = parse_date(&result.str_at(0, "MIN_DATE")?)?;
    let end = parse_date(&result.str_at(0, "MAX_DATE")?)?;
    Some(if start <= end { (start, end) } else { (end, start) })
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(text.get(..10)?, "%Y-%m-%d").ok()
}

fn fallback_span() -> (NaiveDate, NaiveDate) {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or(NaiveDate::MIN);
    (start, Local::now().date_naive())
}

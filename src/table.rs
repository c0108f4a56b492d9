//! In-memory aggregates over query results.
//!
//! Rows whose grouping key is null are dropped; null measures count as
//! absent rather than zero.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::warehouse::QueryResult;

/// Sum of a numeric column, skipping nulls.
pub fn sum(result: &QueryResult, column: &str) -> f64 {
    result.column_f64(column).into_iter().flatten().sum()
}

/// Distinct non-null values of a column.
pub fn nunique(result: &QueryResult, column: &str) -> usize {
    (0..result.row_count())
        .filter_map(|row| result.str_at(row, column))
        .collect::<HashSet<_>>()
        .len()
}

/// Sum of `value` per `key`, in first-seen key order.
pub fn group_sum(result: &QueryResult, key: &str, value: &str) -> Vec<(String, f64)> {
    let mut order = Vec::new();
    let mut totals: HashMap<String, f64> = HashMap::new();
    for row in 0..result.row_count() {
        let Some(k) = result.str_at(row, key) else {
            continue;
        };
        let v = result.f64_at(row, value).unwrap_or(0.0);
        match totals.get_mut(&k) {
            Some(total) => *total += v,
            None => {
                order.push(k.clone());
                totals.insert(k, v);
            }
        }
    }
    order
        .into_iter()
        .map(|k| {
            let total = totals.get(&k).copied().unwrap_or(0.0);
            (k, total)
        })
        .collect()
}

/// Distinct count of `value` per `key`, in first-seen key order.
pub fn group_nunique(result: &QueryResult, key: &str, value: &str) -> Vec<(String, usize)> {
    let mut order = Vec::new();
    let mut seen: HashMap<String, HashSet<String>> = HashMap::new();
    for row in 0..result.row_count() {
        let Some(k) = result.str_at(row, key) else {
            continue;
        };
        let entry = seen.entry(k.clone()).or_insert_with(|| {
            order.push(k);
            HashSet::new()
        });
        if let Some(v) = result.str_at(row, value) {
            entry.insert(v);
        }
    }
    order
        .into_iter()
        .map(|k| {
            let n = seen.get(&k).map_or(0, HashSet::len);
            (k, n)
        })
        .collect()
}

/// The `n` largest entries, descending; ties keep their input order.
pub fn top_n<T: PartialOrd + Copy>(mut groups: Vec<(String, T)>, n: usize) -> Vec<(String, T)> {
    groups.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    groups.truncate(n);
    groups
}

/// Monthly totals of `value`, optionally split by `split`.
///
/// `timestamp` holds normalized ISO timestamps; the month is its
/// `YYYY-MM` prefix. Output is ordered by month, then split value.
pub fn monthly_sum(
    result: &QueryResult,
    timestamp: &str,
    split: Option<&str>,
    value: &str,
) -> Vec<(String, Option<String>, f64)> {
    let mut totals: BTreeMap<(String, Option<String>), f64> = BTreeMap::new();
    for row in 0..result.row_count() {
        let Some(month) = result.str_at(row, timestamp).and_then(|ts| month_label(&ts)) else {
            continue;
        };
        let series = match split {
            Some(column) => match result.str_at(row, column) {
                Some(s) => Some(s),
                None => continue,
            },
            None => None,
        };
        *totals.entry((month, series)).or_insert(0.0) += result.f64_at(row, value).unwrap_or(0.0);
    }
    totals
        .into_iter()
        .map(|((month, series), total)| (month, series, round2(total)))
        .collect()
}

/// `YYYY-MM` of an ISO date or timestamp.
pub fn month_label(timestamp: &str) -> Option<String> {
    let label = timestamp.trim().get(..7)?;
    let (year, month) = label.split_once('-')?;
    if year.len() == 4
        && month.len() == 2
        && year.chars().all(|c| c.is_ascii_digit())
        && month.chars().all(|c| c.is_ascii_digit())
    {
        Some(label.to_string())
    } else {
        None
    }
}

/// Percent share of each value in the total, two decimals; all zero when
/// the total is zero.
pub fn calc_share(values: &[f64]) -> Vec<f64> {
    let total: f64 = values.iter().sum();
    if total == 0.0 || !total.is_finite() {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| round2(v / total * 100.0)).collect()
}

/// Pearson correlation over pairs; `None` with fewer than two pairs or a
/// constant side.
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    let pairs: Vec<_> = pairs
        .iter()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    let n = pairs.len();
    if n < 2 {
        return None;
    }
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n as f64;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n as f64;
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Numeric pairs of two columns, skipping rows where either is null.
pub fn pairs(result: &QueryResult, x: &str, y: &str) -> Vec<(f64, f64)> {
    (0..result.row_count())
        .filter_map(|row| Some((result.f64_at(row, x)?, result.f64_at(row, y)?)))
        .collect()
}

/// Direction of a correlation at the ±0.15 threshold.
pub fn correlation_direction(r: f64) -> &'static str {
    if r > 0.15 {
        "positive"
    } else if r < -0.15 {
        "negative"
    } else {
        "weak/no clear"
    }
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

//! Integration tests for filter predicates.
//!
//! These tests verify the WHERE-clause builder and the comparison dimension.

use chrono::NaiveDate;
use profitlens::filter::{comparison_dimension, predicate, ColumnScope, Dimension, FilterSelection};
use profitlens::sql::{BindValue, Dialect};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_empty_categories_leave_only_date_condition() {
    let sel = FilterSelection::new().with_date_range(date(2024, 1, 1), date(2024, 12, 31));

    let unaliased = predicate(&sel, ColumnScope::Unaliased).unwrap();
    assert_eq!(
        unaliased.to_sql(Dialect::Snowflake),
        "ORDER_TIMESTAMP BETWEEN ? AND ?"
    );
    assert_eq!(
        unaliased.params(Dialect::Snowflake),
        vec![BindValue::from(date(2024, 1, 1)), BindValue::from(date(2024, 12, 31))]
    );

    let aliased = predicate(&sel, ColumnScope::Aliased).unwrap();
    assert_eq!(
        aliased.to_sql(Dialect::Snowflake),
        "O.ORDER_TIMESTAMP BETWEEN ? AND ?"
    );
}

#[test]
fn test_no_filters_no_predicate() {
    assert!(predicate(&FilterSelection::new(), ColumnScope::Unaliased).is_none());
    // Blank values are dropped on construction.
    let blank = FilterSelection::new().with_cities(["", "  "]);
    assert!(predicate(&blank, ColumnScope::Aliased).is_none());
}

#[test]
fn test_aliased_and_unaliased_are_equivalent() {
    let sel = FilterSelection::new()
        .with_cities(["Pune", "Delhi"])
        .with_restaurants(["Spice Hub"])
        .with_cuisines(["Thai"])
        .with_date_range(date(2024, 3, 1), date(2024, 3, 31));

    let unaliased = predicate(&sel, ColumnScope::Unaliased).unwrap();
    let aliased = predicate(&sel, ColumnScope::Aliased).unwrap();

    let stripped = aliased
        .to_sql(Dialect::Snowflake)
        .replace("R.", "")
        .replace("O.", "");
    assert_eq!(stripped, unaliased.to_sql(Dialect::Snowflake));
    assert_eq!(
        aliased.params(Dialect::Snowflake),
        unaliased.params(Dialect::Snowflake)
    );
}

#[test]
fn test_values_are_bound_not_inlined() {
    let sel = FilterSelection::new().with_cities(["O'Brien's Town"]);
    let expr = predicate(&sel, ColumnScope::Unaliased).unwrap();
    let sql = expr.to_sql(Dialect::Snowflake);
    assert_eq!(sql, "CITY IN (?)");
    assert_eq!(
        expr.params(Dialect::Snowflake),
        vec![BindValue::from("O'Brien's Town")]
    );
}

#[test]
fn test_city_outranks_larger_cuisine_set() {
    let sel = FilterSelection::new()
        .with_cities(["Pune", "Delhi"])
        .with_cuisines(["Thai", "Italian", "Chinese"])
        .with_restaurants(["Spice Hub"]);
    assert_eq!(comparison_dimension(&sel), Some(Dimension::City));
    assert_eq!(Dimension::City.column(), "CITY");
}

#[test]
fn test_cross_filter_notice() {
    assert!(FilterSelection::new()
        .with_cities(["Pune"])
        .cross_filter_notice()
        .is_none());
    assert!(FilterSelection::new()
        .with_cities(["Pune"])
        .with_cuisines(["Thai"])
        .cross_filter_notice()
        .is_some());
}

//! Integration tests for the query runner.
//!
//! These tests verify result caching against a fixture warehouse.

use profitlens::runner::QueryRunner;
use profitlens::sql::{col, sum, BindValue, Dialect, ExprExt, Query, SelectExpr, Statement, TableRef};
use profitlens::warehouse::{Column, FixtureWarehouse, QueryResult};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const TTL: Duration = Duration::from_secs(600);

fn gmv_by_city() -> QueryResult {
    QueryResult::new(
        vec![Column::new("CITY", "TEXT"), Column::new("TOTAL_GMV", "FIXED")],
        vec![vec![json!("Pune"), json!("1500.50")]],
    )
}

fn statement() -> Statement {
    Query::new()
        .select(vec![SelectExpr::from(col("CITY")), sum(col("GMV")).alias("TOTAL_GMV")])
        .from(TableRef::new("V_PLATFORM_PROFITABILITY"))
        .group_by(vec![col("CITY")])
        .to_statement(Dialect::Snowflake)
}

#[tokio::test(start_paused = true)]
async fn test_cached_within_ttl() {
    let wh = Arc::new(FixtureWarehouse::new().on("SUM(GMV)", gmv_by_city()));
    let runner = QueryRunner::new(wh.clone(), Dialect::Snowflake, TTL);

    let first = runner.run(&statement()).await.unwrap();
    tokio::time::advance(Duration::from_secs(599)).await;
    let second = runner.run(&statement()).await.unwrap();

    assert_eq!(wh.calls(), 1);
    assert_eq!(first, second);
    assert_eq!(second.rows[0][1], json!(1500.5));
    let stats = runner.cache_stats();
    assert_eq!((stats.hits, stats.entries), (1, 1));
}

#[tokio::test(start_paused = true)]
async fn test_round_trip_after_ttl() {
    let wh = Arc::new(FixtureWarehouse::new().on("SUM(GMV)", gmv_by_city()));
    let runner = QueryRunner::new(wh.clone(), Dialect::Snowflake, TTL);

    runner.run(&statement()).await.unwrap();
    tokio::time::advance(TTL).await;
    runner.run(&statement()).await.unwrap();
    assert_eq!(wh.calls(), 2);

    // The refreshed entry is fresh again.
    runner.run(&statement()).await.unwrap();
    assert_eq!(wh.calls(), 2);
}

#[tokio::test]
async fn test_params_are_part_of_the_key() {
    let wh = Arc::new(FixtureWarehouse::new());
    let runner = QueryRunner::new(wh.clone(), Dialect::Snowflake, TTL);

    let sql = "SELECT * FROM V_PLATFORM_PROFITABILITY WHERE CITY IN (?)";
    runner
        .run(&Statement::new(sql, vec![BindValue::from("Pune")]))
        .await
        .unwrap();
    runner
        .run(&Statement::new(sql, vec![BindValue::from("Delhi")]))
        .await
        .unwrap();
    runner
        .run(&Statement::new(sql, vec![BindValue::from("Pune")]))
        .await
        .unwrap();
    assert_eq!(wh.calls(), 2);
}

#[tokio::test]
async fn test_clones_share_the_cache() {
    let wh = Arc::new(FixtureWarehouse::new().on("SUM(GMV)", gmv_by_city()));
    let runner = QueryRunner::new(wh.clone(), Dialect::Snowflake, TTL);
    let other = runner.clone();

    runner.run(&statement()).await.unwrap();
    other.run(&statement()).await.unwrap();
    assert_eq!(wh.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_expired_entries_do_not_accumulate() {
    let wh = Arc::new(FixtureWarehouse::new());
    let runner = QueryRunner::new(wh.clone(), Dialect::Snowflake, TTL);

    for i in 0..500 {
        runner
            .run(&Statement::raw(format!("SELECT {i} AS N")))
            .await
            .unwrap();
    }
    assert_eq!(runner.cache_stats().entries, 500);

    tokio::time::advance(Duration::from_secs(3600)).await;
    runner.run(&Statement::raw("SELECT 'late' AS N")).await.unwrap();
    assert_eq!(runner.cache_stats().entries, 1);
}

//! Query runner: executes statements and memoizes results.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::cache::{statement_key, CacheStats, QueryCache};
use crate::sql::{Dialect, Query, Statement};
use crate::warehouse::{BackendKind, Connection, QueryResult, Warehouse, WarehouseResult};

/// Executes statements against the warehouse through a shared result cache.
///
/// Cloning is cheap; clones share the connection and the cache.
#[derive(Clone)]
pub struct QueryRunner {
    warehouse: Arc<dyn Warehouse>,
    cache: Arc<QueryCache>,
    dialect: Dialect,
}

impl QueryRunner {
    pub fn new(warehouse: Arc<dyn Warehouse>, dialect: Dialect, ttl: Duration) -> Self {
        Self {
            warehouse,
            cache: Arc::new(QueryCache::new(ttl)),
            dialect,
        }
    }

    pub fn from_connection(connection: Connection, ttl: Duration) -> Self {
        Self::new(connection.warehouse, connection.dialect, ttl)
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn backend(&self) -> BackendKind {
        self.warehouse.kind()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Render and run a built query.
    pub async fn run_query(&self, query: &Query) -> WarehouseResult<QueryResult> {
        self.run(&query.to_statement(self.dialect)).await
    }

    /// Run a statement, answering from cache while the entry is fresh.
    pub async fn run(&self, statement: &Statement) -> WarehouseResult<QueryResult> {
        let key = statement_key(statement);
        if let Some(hit) = self.cache.get(&key) {
            debug!(key = &key[..12], rows = hit.row_count(), "cache hit");
            return Ok(hit);
        }
        debug!(key = &key[..12], "cache miss");
        let result = self.run_uncached(statement).await?;
        self.cache.insert(key, result.clone());
        Ok(result)
    }

    /// Run a statement without consulting or filling the cache.
    pub async fn run_uncached(&self, statement: &Statement) -> WarehouseResult<QueryResult> {
        let started = Instant::now();
        let result = self.warehouse.execute(statement).await?.normalize();
        info!(
            rows = result.row_count(),
            params = statement.params.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "query executed"
        );
        debug!(sql = %statement.sql, "executed statement");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::{Column, FixtureWarehouse};
    use serde_json::json;

    fn runner(wh: Arc<FixtureWarehouse>) -> QueryRunner {
        QueryRunner::new(wh, Dialect::Snowflake, Duration::from_secs(600))
    }

    #[tokio::test]
    async fn test_results_are_normalized() {
        let wh = Arc::new(FixtureWarehouse::new().on(
            "SUM(GMV)",
            QueryResult::new(vec![Column::new("total_gmv", "FIXED")], vec![vec![json!("10.5")]]),
        ));
        let result = runner(wh)
            .run(&Statement::raw("SELECT SUM(GMV) AS TOTAL_GMV FROM V_PLATFORM_PROFITABILITY"))
            .await
            .unwrap();
        assert_eq!(result.columns[0].name, "TOTAL_GMV");
        assert_eq!(result.rows[0][0], json!(10.5));
    }

    #[tokio::test]
    async fn test_uncached_always_round_trips() {
        let wh = Arc::new(FixtureWarehouse::new());
        let r = runner(wh.clone());
        let stmt = Statement::raw("SELECT 1");
        r.run_uncached(&stmt).await.unwrap();
        r.run_uncached(&stmt).await.unwrap();
        assert_eq!(wh.calls(), 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let wh = Arc::new(FixtureWarehouse::new().fail_on("BROKEN", "invalid identifier"));
        let r = runner(wh.clone());
        let stmt = Statement::raw("SELECT BROKEN FROM V_PLATFORM_PROFITABILITY");
        assert!(r.run(&stmt).await.is_err());
        assert!(r.run(&stmt).await.is_err());
        assert_eq!(wh.calls(), 2);
    }
}

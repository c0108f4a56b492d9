//! In-memory warehouse returning canned results.
//!
//! Statements are matched against registered SQL fragments in registration
//! order; the first fragment contained in the statement text wins. Every
//! call is recorded, so tests can assert how many round-trips happened.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::error::{WarehouseError, WarehouseResult};
use super::result::QueryResult;
use super::{BackendKind, Warehouse};
use crate::sql::Statement;

enum Reply {
    Rows(QueryResult),
    Fail(String),
}

pub struct FixtureWarehouse {
    replies: Vec<(String, Reply)>,
    calls: AtomicUsize,
    executed: Mutex<Vec<Statement>>,
    kind: BackendKind,
}

impl Default for FixtureWarehouse {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureWarehouse {
    pub fn new() -> Self {
        Self {
            replies: Vec::new(),
            calls: AtomicUsize::new(0),
            executed: Mutex::new(Vec::new()),
            kind: BackendKind::Fixture,
        }
    }

    /// Answer statements containing `fragment` with `result`.
    pub fn on(mut self, fragment: impl Into<String>, result: QueryResult) -> Self {
        self.replies.push((fragment.into(), Reply::Rows(result)));
        self
    }

    /// Fail statements containing `fragment` with a remote error.
    pub fn fail_on(mut self, fragment: impl Into<String>, message: impl Into<String>) -> Self {
        self.replies.push((fragment.into(), Reply::Fail(message.into())));
        self
    }

    pub fn with_kind(mut self, kind: BackendKind) -> Self {
        self.kind = kind;
        self
    }

    /// Number of `execute` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Statements executed so far, in order.
    pub fn executed(&self) -> Vec<Statement> {
        self.executed
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Warehouse for FixtureWarehouse {
    async fn execute(&self, statement: &Statement) -> WarehouseResult<QueryResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(statement.clone());
        }
        let reply = self
            .replies
            .iter()
            .find(|(fragment, _)| statement.sql.contains(fragment.as_str()));
        match reply {
            Some((_, Reply::Rows(result))) => Ok(result.clone()),
            Some((_, Reply::Fail(message))) => Err(WarehouseError::remote("FIXTURE", message.clone())),
            None => Ok(QueryResult::default()),
        }
    }

    fn kind(&self) -> BackendKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::Column;
    use serde_json::json;

    #[tokio::test]
    async fn test_first_matching_fragment_wins() {
        let wh = FixtureWarehouse::new()
            .on(
                "COUNT",
                QueryResult::new(vec![Column::new("N", "FIXED")], vec![vec![json!(3)]]),
            )
            .fail_on("FACT_ORDERS", "boom");

        let ok = wh.execute(&Statement::raw("SELECT COUNT(*) AS N FROM FACT_ORDERS")).await;
        assert_eq!(ok.unwrap().rows[0][0], json!(3));

        let err = wh.execute(&Statement::raw("SELECT * FROM FACT_ORDERS")).await;
        assert!(err.is_err());

        let empty = wh.execute(&Statement::raw("SELECT 1")).await.unwrap();
        assert!(empty.is_empty());
        assert_eq!(wh.calls(), 3);
        assert_eq!(wh.executed().len(), 3);
    }
}

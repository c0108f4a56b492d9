//! Integration tests for the question-to-SQL assistant.

use profitlens::assistant::{extract_sql, Answer, Assistant, RejectReason, ScriptedModel};
use profitlens::chart::ChartKind;
use profitlens::filter::FilterSelection;
use profitlens::runner::QueryRunner;
use profitlens::sql::Dialect;
use profitlens::warehouse::{Column, FixtureWarehouse, QueryResult};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const FENCED: &str = "Sure! ```sql\nSELECT CITY, SUM(GMV) AS TOTAL_GMV FROM V_PLATFORM_PROFITABILITY GROUP BY CITY;\n```";
const EXTRACTED: &str = "SELECT CITY, SUM(GMV) AS TOTAL_GMV FROM V_PLATFORM_PROFITABILITY GROUP BY CITY;";

fn gmv_by_city() -> QueryResult {
    QueryResult::new(
        vec![Column::new("CITY", "TEXT"), Column::new("TOTAL_GMV", "FIXED")],
        vec![
            vec![json!("Pune"), json!("1500000")],
            vec![json!("Delhi"), json!("950")],
        ],
    )
}

fn assistant(wh: &Arc<FixtureWarehouse>, model: &Arc<ScriptedModel>) -> Assistant {
    let runner = QueryRunner::new(wh.clone(), Dialect::Snowflake, Duration::from_secs(600));
    Assistant::new(runner, model.clone())
}

#[test]
fn test_extraction_example() {
    assert_eq!(extract_sql(FENCED).as_deref(), Some(EXTRACTED));
}

#[tokio::test]
async fn test_out_of_scope_executes_nothing() {
    for reply in ["OUT-OF-SCOPE", "out-of-scope", "  Out-Of-Scope: not in schema"] {
        let wh = Arc::new(FixtureWarehouse::new());
        let model = Arc::new(ScriptedModel::new([reply]));

        let answer = assistant(&wh, &model)
            .ask("What is the refund rate per city?", &FilterSelection::new())
            .await;

        assert_eq!(
            answer,
            Answer::Rejected {
                reason: RejectReason::ModelOutOfScope
            }
        );
        assert_eq!(model.calls(), 1);
        assert_eq!(wh.calls(), 0);
    }
}

#[tokio::test]
async fn test_refusal_is_ungenerated() {
    let wh = Arc::new(FixtureWarehouse::new());
    let model = Arc::new(ScriptedModel::new(["I cannot help with that."]));

    let answer = assistant(&wh, &model)
        .ask("Which cuisine has the highest net profit?", &FilterSelection::new())
        .await;

    assert_eq!(
        answer,
        Answer::Ungenerated {
            raw: "I cannot help with that.".into()
        }
    );
    assert_eq!(wh.calls(), 0);
}

#[tokio::test]
async fn test_guard_skips_the_model() {
    let wh = Arc::new(FixtureWarehouse::new());
    let model = Arc::new(ScriptedModel::new([EXTRACTED]));
    let assistant = assistant(&wh, &model);

    let blank = assistant.ask("   ", &FilterSelection::new()).await;
    assert_eq!(
        blank,
        Answer::Rejected {
            reason: RejectReason::EmptyQuestion
        }
    );
    let gps = assistant
        .ask("Show GPS coordinates of each order", &FilterSelection::new())
        .await;
    assert_eq!(
        gps,
        Answer::Rejected {
            reason: RejectReason::OutOfDomain
        }
    );
    assert_eq!(model.calls(), 0);
    assert_eq!(wh.calls(), 0);
}

#[tokio::test]
async fn test_answer_with_chart() {
    let wh = Arc::new(FixtureWarehouse::new().on("SUM(GMV)", gmv_by_city()));
    let model = Arc::new(ScriptedModel::new([FENCED]));
    let filters = FilterSelection::new().with_cities(["Pune", "Delhi"]);

    let answer = assistant(&wh, &model)
        .ask("Compare GMV across cities", &filters)
        .await;

    let (sql, result, chart) = match answer {
        Answer::Answered { sql, result, chart } => (sql, result, chart),
        other => panic!("expected an answer, got {:?}", other),
    };
    assert_eq!(sql, EXTRACTED);
    assert_eq!(result.row_count(), 2);
    let chart = chart.unwrap();
    assert_eq!(chart.kind, ChartKind::Bar);
    assert_eq!(chart.title, "Total Gmv by City");
    assert_eq!(chart.values[0]["LABEL"], "₹1.50M");

    assert_eq!(wh.executed()[0].sql, EXTRACTED);
    assert!(model.prompts()[0].contains("CITY IN ('Delhi', 'Pune')"));
}

#[tokio::test]
async fn test_unsafe_statement_is_not_executed() {
    let wh = Arc::new(FixtureWarehouse::new());
    let model = Arc::new(ScriptedModel::new([
        "SELECT 1 AS X; DELETE FROM FACT_ORDERS;",
    ]));

    let answer = assistant(&wh, &model)
        .ask("Total orders?", &FilterSelection::new())
        .await;

    assert!(matches!(answer, Answer::Unsafe { .. }));
    assert_eq!(wh.calls(), 0);
}

#[tokio::test]
async fn test_execution_failure_and_no_rows() {
    let wh = Arc::new(
        FixtureWarehouse::new().fail_on("NO_SUCH_COLUMN", "invalid identifier 'NO_SUCH_COLUMN'"),
    );
    let model = Arc::new(ScriptedModel::new([
        "SELECT NO_SUCH_COLUMN FROM V_PLATFORM_PROFITABILITY;",
        "SELECT CITY, COUNT(*) AS TOTAL_ORDERS FROM V_PLATFORM_PROFITABILITY GROUP BY CITY;",
    ]));
    let assistant = assistant(&wh, &model);

    let failed = assistant.ask("Total orders?", &FilterSelection::new()).await;
    let (sql, error) = match failed {
        Answer::ExecutionFailed { sql, error } => (sql, error),
        other => panic!("expected an execution failure, got {:?}", other),
    };
    assert_eq!(sql, "SELECT NO_SUCH_COLUMN FROM V_PLATFORM_PROFITABILITY;");
    assert!(error.contains("NO_SUCH_COLUMN"));

    let empty = assistant.ask("Orders per city?", &FilterSelection::new()).await;
    assert!(matches!(empty, Answer::NoRows { .. }));
    assert_eq!(wh.calls(), 2);
}

#[tokio::test]
async fn test_model_failure() {
    let wh = Arc::new(FixtureWarehouse::new());
    let model = Arc::new(ScriptedModel::failing("rate limited"));

    let answer = assistant(&wh, &model)
        .ask("Total GMV?", &FilterSelection::new())
        .await;

    assert!(matches!(answer, Answer::ModelFailed { .. }));
    assert_eq!(wh.calls(), 0);
}

#[tokio::test]
async fn test_trailing_prose_is_never_executed() {
    let wh = Arc::new(FixtureWarehouse::new());
    let model = Arc::new(ScriptedModel::new([
        "select city, sum(gmv) as total_gmv from v_platform_profitability group by city\nThis will SHOW the totals per city.",
        "This will SHOW the totals per city.",
    ]));
    let assistant = assistant(&wh, &model);

    for _ in 0..2 {
        let answer = assistant.ask("GMV per city?", &FilterSelection::new()).await;
        assert!(matches!(answer, Answer::Unsafe { .. }), "got {:?}", answer);
    }
    assert_eq!(wh.calls(), 0);
}

#[test]
fn test_inline_lower_case_statement_is_extracted() {
    assert_eq!(
        extract_sql("Sure: select city from v_platform_profitability").as_deref(),
        Some("select city from v_platform_profitability")
    );
}

//! Question → SQL → result → chart.
//!
//! ```text
//! question ─► guard ─► prompt ─► model ─► scope check ─► extract ─► validate
//!                                                                      │
//!                      Answer ◄── chart ◄── empty check ◄── execute ◄──┘
//! ```
//!
//! Each stage can end the run with its own [`Answer`]; nothing is retried
//! and no state survives between questions.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::extract::extract_sql;
use super::guard::{screen, Rejection};
use super::model::CompletionModel;
use super::prompt::{build_prompt, OUT_OF_SCOPE};
use super::validate::validate_sql;
use super::visualize::suggest_chart;
use crate::chart::{Chart, Theme};
use crate::filter::FilterSelection;
use crate::runner::QueryRunner;
use crate::sql::Statement;
use crate::warehouse::QueryResult;

pub const MODEL_OUT_OF_SCOPE: &str = "This question is outside the scope of the current dataset. \
The model confirmed it cannot be answered from the available data (e.g., driver details, GPS, or \
complex unmodeled metrics).";
pub const UNGENERATED: &str =
    "SQL generation failed: the model did not return a recognizable SQL query (SELECT/WITH/SHOW/CALL).";
pub const NO_ROWS: &str = "Query executed successfully, but no data returned for this query. Try \
widening your date range or adjusting the filters.";
pub const NO_CHART: &str = "No suitable visualization detected for this query. Showing raw results.";

/// Outcome of one question.
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    /// Stopped before the model was called, or the model declined.
    Rejected { reason: RejectReason },
    /// The model call itself failed.
    ModelFailed { error: String },
    /// The model replied without a statement.
    Ungenerated { raw: String },
    /// A statement was found but is not a single read-only query.
    Unsafe { sql: String, reason: String },
    ExecutionFailed { sql: String, error: String },
    NoRows { sql: String },
    Answered {
        sql: String,
        result: QueryResult,
        chart: Option<Chart>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    EmptyQuestion,
    OutOfDomain,
    ModelOutOfScope,
}

impl Answer {
    pub fn status(&self) -> &'static str {
        match self {
            Answer::Rejected { .. } => "rejected",
            Answer::ModelFailed { .. } => "model_failed",
            Answer::Ungenerated { .. } => "ungenerated",
            Answer::Unsafe { .. } => "unsafe",
            Answer::ExecutionFailed { .. } => "execution_failed",
            Answer::NoRows { .. } => "no_rows",
            Answer::Answered { .. } => "answered",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Answer::Rejected { reason } => match reason {
                RejectReason::EmptyQuestion => Rejection::EmptyQuestion.message().to_string(),
                RejectReason::OutOfDomain => Rejection::OutOfDomain("").message().to_string(),
                RejectReason::ModelOutOfScope => MODEL_OUT_OF_SCOPE.to_string(),
            },
            Answer::ModelFailed { error } => format!("An error occurred while calling the model: {}", error),
            Answer::Ungenerated { .. } => UNGENERATED.to_string(),
            Answer::Unsafe { reason, .. } => format!("The generated query was not executed: {}", reason),
            Answer::ExecutionFailed { error, .. } => format!(
                "SQL execution error: the generated query failed in the warehouse.\n\nError details:\n{}",
                error
            ),
            Answer::NoRows { .. } => NO_ROWS.to_string(),
            Answer::Answered { chart: None, .. } => NO_CHART.to_string(),
            Answer::Answered { result, .. } => format!("Query executed successfully ({} rows).", result.row_count()),
        }
    }

    /// The statement that was (or would have been) executed.
    pub fn sql(&self) -> Option<&str> {
        match self {
            Answer::Unsafe { sql, .. }
            | Answer::ExecutionFailed { sql, .. }
            | Answer::NoRows { sql }
            | Answer::Answered { sql, .. } => Some(sql),
            _ => None,
        }
    }

    pub fn is_answered(&self) -> bool {
        matches!(self, Answer::Answered { .. })
    }

    pub fn to_json(&self, theme: Theme) -> Value {
        let mut out = json!({
            "status": self.status(),
            "message": self.message(),
            "sql": self.sql(),
        });
        match self {
            Answer::Ungenerated { raw } => out["raw"] = json!(raw),
            Answer::Answered { result, chart, .. } => {
                out["columns"] = json!(result.columns);
                out["rows"] = json!(result.to_records());
                out["chart"] = chart
                    .as_ref()
                    .map(|c| c.to_vega_lite(theme))
                    .unwrap_or(Value::Null);
            }
            _ => {}
        }
        out
    }
}

/// Answers free-text questions against the warehouse.
#[derive(Clone)]
pub struct Assistant {
    runner: QueryRunner,
    model: Arc<dyn CompletionModel>,
}

impl Assistant {
    pub fn new(runner: QueryRunner, model: Arc<dyn CompletionModel>) -> Self {
        Self { runner, model }
    }

    pub async fn ask(&self, question: &str, filters: &FilterSelection) -> Answer {
        if let Err(rejection) = screen(question) {
            info!(?rejection, "question rejected before model call");
            let reason = match rejection {
                Rejection::EmptyQuestion => RejectReason::EmptyQuestion,
                Rejection::OutOfDomain(_) => RejectReason::OutOfDomain,
            };
            return Answer::Rejected { reason };
        }

        let prompt = build_prompt(question, filters);
        let raw = match self.model.complete(&prompt).await {
            Ok(raw) => raw.trim().to_string(),
            Err(e) => {
                warn!(model = self.model.name(), error = %e, "model call failed");
                return Answer::ModelFailed { error: e.to_string() };
            }
        };

        if is_out_of_scope(&raw) {
            info!("model declared the question out of scope");
            return Answer::Rejected {
                reason: RejectReason::ModelOutOfScope,
            };
        }

        let Some(sql) = extract_sql(&raw) else {
            warn!(chars = raw.len(), "no statement in model output");
            return Answer::Ungenerated { raw };
        };

        if let Err(e) = validate_sql(&sql) {
            warn!(error = %e, "generated statement rejected");
            return Answer::Unsafe {
                sql,
                reason: e.to_string(),
            };
        }

        debug!(sql = %sql, "executing generated statement");
        let result = match self.runner.run(&Statement::raw(sql.clone())).await {
            Ok(result) => result,
            Err(e) => {
                return Answer::ExecutionFailed {
                    sql,
                    error: e.to_string(),
                }
            }
        };

        if result.is_empty() {
            return Answer::NoRows { sql };
        }
        let chart = suggest_chart(&result);
        info!(rows = result.row_count(), charted = chart.is_some(), "question answered");
        Answer::Answered { sql, result, chart }
    }
}

fn is_out_of_scope(raw: &str) -> bool {
    raw.get(..OUT_OF_SCOPE.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(OUT_OF_SCOPE))
}

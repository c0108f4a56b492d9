//! Natural-language questions answered with generated SQL.
//!
//! - [`guard`] - blank and out-of-domain questions, before any model call
//! - [`prompt`] - schema context and instructions
//! - [`model`] - completion backends (Cortex in the warehouse, OpenAI-compatible HTTP)
//! - [`extract`] - statement extraction from model output
//! - [`validate`] - read-only allow-list
//! - [`visualize`] - chart selection for the result
//! - [`pipeline`] - the stages wired together

pub mod extract;
pub mod guard;
pub mod model;
pub mod pipeline;
pub mod prompt;
pub mod validate;
pub mod visualize;

pub use extract::extract_sql;
pub use guard::{screen, Rejection};
pub use model::{
    model_from_settings, CompletionModel, CortexModel, ModelError, ModelResult, OpenAiModel, ScriptedModel,
};
pub use pipeline::{Answer, Assistant, RejectReason};
pub use prompt::build_prompt;
pub use validate::{validate_sql, ValidationError};
pub use visualize::suggest_chart;

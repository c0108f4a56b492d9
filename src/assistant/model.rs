//! Text completion backends.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::config::{AssistantSettings, ModelProvider, SettingsError};
use crate::runner::QueryRunner;
use crate::sql::{BindValue, Statement};
use crate::warehouse::WarehouseError;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("completion query failed: {0}")]
    Warehouse(#[from] WarehouseError),

    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("completion response had no text")]
    Empty,

    #[error("model configuration error: {0}")]
    Config(String),
}

impl From<SettingsError> for ModelError {
    fn from(e: SettingsError) -> Self {
        ModelError::Config(e.to_string())
    }
}

pub type ModelResult<T> = Result<T, ModelError>;

/// A model that turns one prompt into one text completion.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Model identifier, for logs and captions.
    fn name(&self) -> &str;

    async fn complete(&self, prompt: &str) -> ModelResult<String>;
}

/// `SNOWFLAKE.CORTEX.COMPLETE` evaluated in the warehouse.
///
/// The model name and prompt are bound parameters. Completions bypass the
/// query cache.
pub struct CortexModel {
    runner: QueryRunner,
    model: String,
}

impl CortexModel {
    pub const STATEMENT: &'static str = "SELECT SNOWFLAKE.CORTEX.COMPLETE(?, ?) AS COMPLETION";

    pub fn new(runner: QueryRunner, model: impl Into<String>) -> Self {
        Self {
            runner,
            model: model.into(),
        }
    }

    pub fn statement(&self, prompt: &str) -> Statement {
        Statement::new(
            Self::STATEMENT,
            vec![BindValue::from(self.model.as_str()), BindValue::from(prompt)],
        )
    }
}

#[async_trait]
impl CompletionModel for CortexModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> ModelResult<String> {
        let result = self.runner.run_uncached(&self.statement(prompt)).await?;
        result.str_at(0, "COMPLETION").ok_or(ModelError::Empty)
    }
}

/// Any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiModel {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiModel {
    pub fn new(settings: &AssistantSettings) -> ModelResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.resolved_api_key()?,
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        })
    }
}

#[async_trait]
impl CompletionModel for OpenAiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> ModelResult<String> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });
        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let payload: serde_json::Value = response.json().await?;
        debug!(model = %self.model, "chat completion received");
        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or(ModelError::Empty)
    }
}

/// Build the configured completion model.
pub fn model_from_settings(
    settings: &AssistantSettings,
    runner: &QueryRunner,
) -> ModelResult<Box<dyn CompletionModel>> {
    Ok(match settings.provider {
        ModelProvider::Cortex => Box::new(CortexModel::new(runner.clone(), settings.model.clone())),
        ModelProvider::OpenAi => Box::new(OpenAiModel::new(settings)?),
    })
}

/// Replays canned completions in order; for tests and offline demos.
///
/// Once the script runs out, the last response repeats.
pub struct ScriptedModel {
    responses: Mutex<VecDeque<Result<String, String>>>,
    last: Mutex<Option<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_results(responses.into_iter().map(|s| Ok(s.into())))
    }

    /// A model whose every call fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::from_results([Err(message.into())])
    }

    fn from_results(results: impl IntoIterator<Item = Result<String, String>>) -> Self {
        Self {
            responses: Mutex::new(results.into_iter().collect()),
            last: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, prompt: &str) -> ModelResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        let next = self.responses.lock().ok().and_then(|mut r| r.pop_front());
        let outcome = match (next, self.last.lock()) {
            (Some(outcome), Ok(mut last)) => {
                *last = Some(outcome.clone());
                outcome
            }
            (Some(outcome), Err(_)) => outcome,
            (None, Ok(last)) => last.clone().unwrap_or_else(|| Ok(String::new())),
            (None, Err(_)) => Ok(String::new()),
        };
        outcome.map_err(ModelError::Config)
    }
}

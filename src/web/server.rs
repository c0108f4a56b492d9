//! Axum server for the dashboard API.
//!
//! Tabs and answers are rendered to JSON with Vega-Lite chart specs; the
//! client only lays them out.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::assistant::Assistant;
use crate::chart::Theme;
use crate::dashboard::{Dashboard, Tab, TopN};
use crate::filter::{load_options, FilterSelection};

/// Application state shared across handlers.
pub struct AppState {
    pub dashboard: Dashboard,
    pub assistant: Assistant,
    /// Theme used when a request names none.
    pub theme: Theme,
}

/// Build the axum router with all routes.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/filters", get(filters))
        .route("/api/tabs/{tab}", post(render_tab))
        .route("/api/ask", post(ask))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind `host:port` and serve until the process is stopped.
pub async fn serve(state: Arc<AppState>, host: &str, port: u16) -> std::io::Result<()> {
    let app = router(state);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "dashboard API listening");
    axum::serve(listener, app).await
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Backend kind and cache counters
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let runner = state.dashboard.runner();
    Json(json!({
        "status": "ok",
        "backend": runner.backend(),
        "dialect": format!("{:?}", runner.dialect()),
        "cache": runner.cache_stats(),
    }))
}

/// GET /api/filters - Selectable values and the default date range
async fn filters(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(load_options(state.dashboard.runner()).await)
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct TabRequest {
    filters: FilterSelection,
    top_n: TopN,
    theme: Option<Theme>,
}

/// POST /api/tabs/{tab} - Render one tab
async fn render_tab(
    State(state): State<Arc<AppState>>,
    Path(tab): Path<String>,
    Json(req): Json<TabRequest>,
) -> Response {
    let tab: Tab = match tab.parse() {
        Ok(tab) => tab,
        Err(e) => return (StatusCode::NOT_FOUND, Json(json!({ "error": e }))).into_response(),
    };
    let view = state.dashboard.render(tab, &req.filters, req.top_n).await;
    Json(view.to_json(req.theme.unwrap_or(state.theme))).into_response()
}

#[derive(Deserialize)]
struct AskRequest {
    question: String,
    #[serde(default)]
    filters: FilterSelection,
    #[serde(default)]
    theme: Option<Theme>,
}

/// POST /api/ask - Answer a free-text question
///
/// Every pipeline outcome, including rejections, is a 200 with a `status`.
async fn ask(State(state): State<Arc<AppState>>, Json(req): Json<AskRequest>) -> impl IntoResponse {
    let answer = state.assistant.ask(&req.question, &req.filters).await;
    Json(answer.to_json(req.theme.unwrap_or(state.theme)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::ScriptedModel;
    use crate::runner::QueryRunner;
    use crate::sql::Dialect;
    use crate::warehouse::FixtureWarehouse;
    use std::time::Duration;

    #[test]
    fn test_tab_request_defaults() {
        let req: TabRequest = serde_json::from_str(r#"{"top_n": 1}"#).unwrap();
        assert_eq!(req.top_n.get(), 3);
        assert!(req.theme.is_none());
        assert_eq!(req.filters, FilterSelection::new());

        let req: TabRequest =
            serde_json::from_str(r#"{"filters": {"cities": ["Pune"]}, "theme": "dark"}"#).unwrap();
        assert_eq!(req.theme, Some(Theme::Dark));
        assert_eq!(req.filters.cities().len(), 1);
    }

    #[test]
    fn test_router_builds() {
        let runner = QueryRunner::new(
            Arc::new(FixtureWarehouse::new()),
            Dialect::Snowflake,
            Duration::from_secs(600),
        );
        let model = Arc::new(ScriptedModel::new(["OUT-OF-SCOPE"]));
        let state = Arc::new(AppState {
            dashboard: Dashboard::new(runner.clone(), model.clone(), Duration::from_secs(3600)),
            assistant: Assistant::new(runner, model),
            theme: Theme::Light,
        });
        let _ = router(state);
    }
}

//! Portal summary, written by the completion model.

use tracing::{info, warn};

use super::{Section, Tab, TabView};
use crate::assistant::CompletionModel;
use crate::cache::TtlCache;

pub(crate) const PORTAL_PROMPT: &str = "You are an AI Analyst summarizing a Snowflake-based \
analytics portal for food delivery.
The portal is designed to analyze Platform Profitability, Restaurant Performance, and Customer Loyalty.

The underlying data structure includes the following main tables:
1. DIM_CUSTOMER: Customer demographics, join dates.
2. DIM_RESTAURANT: Restaurant details, cuisine type, ratings, and commission rates.
3. FACT_ORDERS: Order transactions, total GMV, Delivery Fees, Commission Revenue, Discount Amount, Net Profit.
4. FACT_ORDER_ITEMS: Links orders to specific menu items and quantities.

Provide a concise, engaging summary (max 200 words) of the portal's purpose and the key insights \
the user will gain from analyzing this data.";

pub const SUMMARY_FAILED: &str = "AI summary failed to load or returned empty content.";

const CACHE_KEY: &str = "portal-summary";

fn structure() -> Vec<String> {
    [
        "Executive Dashboard: high-level financial (GMV, Profit) and operational KPIs, with side-by-side comparison of cities, cuisines, or restaurants.",
        "Restaurant Deep Dive: restaurant profitability, commission impact, menu category performance, and rating correlation with order volume.",
        "AI Executive Q&A: ask a business question; the assistant generates SQL, executes it live and charts the result.",
        "Customer Insights: customer loyalty, repeat rate, monthly activity, and satisfaction distribution.",
        "Strategic Conclusion & Recommendations: an executive overview combining insights from all dashboards with data-backed next actions.",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

pub async fn render(model: &dyn CompletionModel, cache: &TtlCache<String>) -> TabView {
    let mut view = TabView::new(
        Tab::Summary,
        "Food Delivery Analytics Portal Summary",
        "A brief overview of the dashboard's objective and underlying data structure.",
    );

    let overview = Section::new("Portal Overview", format!("Generated by {}", model.name()));
    view.push(match portal_summary(model, cache).await {
        Some(text) => overview.text(text),
        None => overview.empty(SUMMARY_FAILED),
    });
    view.push(
        Section::new(
            "Dashboard Structure & Objectives",
            "This portal provides a multi-dimensional view of the food delivery business.",
        )
        .bullets(structure()),
    );
    view
}

/// Cached model summary. Failures and blank output are not cached.
pub async fn portal_summary(model: &dyn CompletionModel, cache: &TtlCache<String>) -> Option<String> {
    if let Some(text) = cache.get(CACHE_KEY) {
        return Some(text);
    }
    match model.complete(PORTAL_PROMPT).await {
        Ok(text) if !text.trim().is_empty() => {
            let text = text.trim().to_string();
            info!(model = model.name(), chars = text.len(), "portal summary generated");
            cache.insert(CACHE_KEY, text.clone());
            Some(text)
        }
        Ok(_) => {
            warn!(model = model.name(), "portal summary was empty");
            None
        }
        Err(e) => {
            warn!(model = model.name(), error = %e, "portal summary failed");
            None
        }
    }
}

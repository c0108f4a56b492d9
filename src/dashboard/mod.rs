//! Tab renderers.
//!
//! Each tab is rebuilt from scratch for every request from the filter
//! selection and a Top-N value. Renderers never fail as a whole: a query
//! error degrades only the section that issued it.
//!
//! ```text
//! FilterSelection ──► predicate ──► Query ──► QueryRunner ──► Section
//!                                                               │
//!                                   TabView { kpis, sections } ◄┘
//! ```

pub mod conclusion;
pub mod customers;
pub mod executive;
mod joined;
pub mod restaurants;
pub mod summary;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::assistant::CompletionModel;
use crate::cache::TtlCache;
use crate::chart::{Chart, Theme};
use crate::filter::FilterSelection;
use crate::runner::QueryRunner;
use crate::warehouse::{QueryResult, WarehouseError, WarehouseResult};

/// The dashboard tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    Summary,
    Executive,
    Restaurants,
    Customers,
    Conclusion,
}

impl Tab {
    pub const ALL: [Tab; 5] = [
        Tab::Summary,
        Tab::Executive,
        Tab::Restaurants,
        Tab::Customers,
        Tab::Conclusion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tab::Summary => "summary",
            Tab::Executive => "executive",
            Tab::Restaurants => "restaurants",
            Tab::Customers => "customers",
            Tab::Conclusion => "conclusion",
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tab::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!(
                    "unknown tab '{}' (expected one of: summary, executive, restaurants, customers, conclusion)",
                    s
                )
            })
    }
}

/// Number of entries in ranked charts, always within 3..=20.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TopN(u32);

impl TopN {
    pub const MIN: u32 = 3;
    pub const MAX: u32 = 20;

    pub fn new(n: u32) -> Self {
        Self(n.clamp(Self::MIN, Self::MAX))
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    pub(crate) fn limit(&self) -> u64 {
        u64::from(self.0)
    }
}

impl Default for TopN {
    fn default() -> Self {
        Self(10)
    }
}

impl<'de> Deserialize<'de> for TopN {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u32::deserialize(deserializer).map(TopN::new)
    }
}

/// A headline number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpi {
    pub label: String,
    pub value: String,
    pub caption: String,
}

impl Kpi {
    pub fn new(label: impl Into<String>, value: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            caption: caption.into(),
        }
    }
}

/// What a section shows.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionBody {
    Chart(Chart),
    Text(String),
    Bullets(Vec<String>),
    /// The query ran and returned nothing.
    Empty(String),
    /// The query failed; only this section is affected.
    Failed(String),
}

/// One card on a tab.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: String,
    pub caption: String,
    pub body: SectionBody,
    pub insights: Vec<String>,
}

impl Section {
    pub fn new(title: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            caption: caption.into(),
            body: SectionBody::Empty(String::new()),
            insights: Vec::new(),
        }
    }

    pub fn chart(mut self, chart: Chart) -> Self {
        self.body = SectionBody::Chart(chart);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.body = SectionBody::Text(text.into());
        self
    }

    pub fn bullets(mut self, bullets: Vec<String>) -> Self {
        self.body = SectionBody::Bullets(bullets);
        self
    }

    pub fn empty(mut self, message: impl Into<String>) -> Self {
        self.body = SectionBody::Empty(message.into());
        self
    }

    pub fn failed(mut self, error: &WarehouseError) -> Self {
        warn!(section = %self.title, error = %error, "section query failed");
        self.body = SectionBody::Failed(error.to_string());
        self
    }

    pub fn insight(mut self, text: impl Into<String>) -> Self {
        self.insights.push(text.into());
        self
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.body, SectionBody::Failed(_))
    }

    pub fn chart_ref(&self) -> Option<&Chart> {
        match &self.body {
            SectionBody::Chart(chart) => Some(chart),
            _ => None,
        }
    }

    /// Fill from a query outcome: failure, empty message, or `build`.
    pub(crate) fn from_result<F>(self, result: WarehouseResult<QueryResult>, empty: &str, build: F) -> Self
    where
        F: FnOnce(Self, &QueryResult) -> Self,
    {
        match result {
            Err(e) => self.failed(&e),
            Ok(r) if r.is_empty() => self.empty(empty),
            Ok(r) => build(self, &r),
        }
    }

    pub fn to_json(&self, theme: Theme) -> Value {
        let body = match &self.body {
            SectionBody::Chart(chart) => json!({ "type": "chart", "spec": chart.to_vega_lite(theme) }),
            SectionBody::Text(text) => json!({ "type": "text", "text": text }),
            SectionBody::Bullets(items) => json!({ "type": "bullets", "items": items }),
            SectionBody::Empty(message) => json!({ "type": "empty", "message": message }),
            SectionBody::Failed(error) => json!({ "type": "error", "error": error }),
        };
        json!({
            "title": self.title,
            "caption": self.caption,
            "body": body,
            "insights": self.insights,
        })
    }
}

/// A fully rendered tab.
#[derive(Debug, Clone, PartialEq)]
pub struct TabView {
    pub tab: Tab,
    pub title: String,
    pub subtitle: String,
    pub notices: Vec<String>,
    pub kpis: Vec<Kpi>,
    pub sections: Vec<Section>,
}

impl TabView {
    pub fn new(tab: Tab, title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        Self {
            tab,
            title: title.into(),
            subtitle: subtitle.into(),
            notices: Vec::new(),
            kpis: Vec::new(),
            sections: Vec::new(),
        }
    }

    pub fn notice(&mut self, text: impl Into<String>) {
        self.notices.push(text.into());
    }

    pub fn push(&mut self, section: Section) {
        self.sections.push(section);
    }

    /// Add the cross-filter notice when the selection warrants it.
    pub(crate) fn cross_filter_notice(&mut self, filters: &FilterSelection) {
        if let Some(notice) = filters.cross_filter_notice() {
            self.notice(notice);
        }
    }

    pub fn section(&self, title_prefix: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.title.starts_with(title_prefix))
    }

    /// JSON view with charts rendered in `theme`.
    pub fn to_json(&self, theme: Theme) -> Value {
        json!({
            "tab": self.tab,
            "title": self.title,
            "subtitle": self.subtitle,
            "theme": theme,
            "notices": self.notices,
            "kpis": self.kpis,
            "sections": self.sections.iter().map(|s| s.to_json(theme)).collect::<Vec<_>>(),
        })
    }
}

/// Renders tabs against a shared runner and completion model.
#[derive(Clone)]
pub struct Dashboard {
    runner: QueryRunner,
    model: Arc<dyn CompletionModel>,
    summaries: Arc<TtlCache<String>>,
}

impl Dashboard {
    pub fn new(runner: QueryRunner, model: Arc<dyn CompletionModel>, summary_ttl: Duration) -> Self {
        Self {
            runner,
            model,
            summaries: Arc::new(TtlCache::new(summary_ttl)),
        }
    }

    pub fn runner(&self) -> &QueryRunner {
        &self.runner
    }

    pub async fn render(&self, tab: Tab, filters: &FilterSelection, top_n: TopN) -> TabView {
        match tab {
            Tab::Summary => summary::render(self.model.as_ref(), &self.summaries).await,
            Tab::Executive => executive::render(&self.runner, filters, top_n).await,
            Tab::Restaurants => restaurants::render(&self.runner, filters, top_n).await,
            Tab::Customers => customers::render(&self.runner, filters, top_n).await,
            Tab::Conclusion => conclusion::render(&self.runner, filters).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_n_is_clamped() {
        assert_eq!(TopN::new(1).get(), 3);
        assert_eq!(TopN::new(12).get(), 12);
        assert_eq!(TopN::new(50).get(), 20);
        assert_eq!(TopN::default().get(), 10);
        let parsed: TopN = serde_json::from_str("99").unwrap();
        assert_eq!(parsed.get(), 20);
    }

    #[test]
    fn test_tab_parse() {
        assert_eq!("Executive".parse::<Tab>().unwrap(), Tab::Executive);
        assert!("sales".parse::<Tab>().is_err());
        assert_eq!(Tab::Customers.to_string(), "customers");
    }

    #[test]
    fn test_from_result_branches() {
        let failed = Section::new("A", "").from_result(
            Err(WarehouseError::ConnectionFailed("down".into())),
            "none",
            |s, _| s.text("unreachable"),
        );
        assert!(failed.is_failed());

        let empty = Section::new("B", "").from_result(Ok(QueryResult::default()), "No data", |s, _| {
            s.text("unreachable")
        });
        assert_eq!(empty.body, SectionBody::Empty("No data".into()));
    }

    #[test]
    fn test_section_json() {
        let section = Section::new("Notes", "caption").text("hello").insight("one");
        let value = section.to_json(Theme::Light);
        assert_eq!(value["body"]["type"], "text");
        assert_eq!(value["insights"][0], "one");
    }
}

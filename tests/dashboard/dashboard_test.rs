//! Integration tests for the dashboard tabs.
//!
//! These tests render whole tabs against canned warehouse results.

use profitlens::assistant::ScriptedModel;
use profitlens::chart::Theme;
use profitlens::dashboard::{Dashboard, SectionBody, Tab, TopN};
use profitlens::filter::FilterSelection;
use profitlens::runner::QueryRunner;
use profitlens::sql::Dialect;
use profitlens::warehouse::{Column, FixtureWarehouse, QueryResult};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn orders() -> QueryResult {
    QueryResult::new(
        vec![
            Column::new("ORDER_ID", "FIXED"),
            Column::new("ORDER_TIMESTAMP", "TEXT"),
            Column::new("CITY", "TEXT"),
            Column::new("GMV", "FIXED"),
            Column::new("NET_PROFIT", "FIXED"),
        ],
        vec![
            vec![json!(1), json!("2024-01-05 10:00:00"), json!("Pune"), json!(1000), json!(100)],
            vec![json!(2), json!("2024-01-20 19:30:00"), json!("Delhi"), json!(2000), json!(200)],
            vec![json!(3), json!("2024-02-03 12:15:00"), json!("Pune"), json!(500), json!(50)],
        ],
    )
}

fn dashboard(wh: FixtureWarehouse, model: ScriptedModel) -> (Dashboard, Arc<FixtureWarehouse>) {
    let wh = Arc::new(wh);
    let runner = QueryRunner::new(wh.clone(), Dialect::Snowflake, Duration::from_secs(600));
    (
        Dashboard::new(runner, Arc::new(model), Duration::from_secs(3600)),
        wh,
    )
}

#[tokio::test]
async fn test_executive_kpis_and_split_trend() {
    let (dashboard, _) = dashboard(
        FixtureWarehouse::new().on("FROM V_PLATFORM_PROFITABILITY", orders()),
        ScriptedModel::new(["unused"]),
    );
    let filters = FilterSelection::new().with_cities(["Pune", "Delhi"]);

    let view = dashboard.render(Tab::Executive, &filters, TopN::new(5)).await;

    let kpis: Vec<(&str, &str)> = view
        .kpis
        .iter()
        .map(|k| (k.label.as_str(), k.value.as_str()))
        .collect();
    assert_eq!(
        kpis,
        vec![
            ("Total GMV", "₹3.50K"),
            ("Total Orders", "3.00"),
            ("Avg Order Value", "₹1.17K"),
            ("Profit Margin", "10.00 %"),
        ]
    );

    let trend = view.section("Monthly GMV Trend").unwrap();
    assert_eq!(trend.title, "Monthly GMV Trend (Grouped by City)");
    let chart = trend.chart_ref().unwrap();
    assert_eq!(chart.color.as_ref().map(|f| f.name.as_str()), Some("CITY"));

    let gmv = view.section("Top 5 City by GMV").unwrap();
    assert_eq!(gmv.insights, vec!["Delhi leads with ₹2.00K Gmv."]);
    assert!(view.notices.is_empty());
}

#[tokio::test]
async fn test_executive_without_rows() {
    let (dashboard, _) = dashboard(FixtureWarehouse::new(), ScriptedModel::new(["unused"]));
    let view = dashboard
        .render(Tab::Executive, &FilterSelection::new(), TopN::default())
        .await;
    assert_eq!(view.notices, vec!["No data found for selected filters."]);
    assert!(view.sections.is_empty());
}

#[tokio::test]
async fn test_failed_query_only_degrades_its_section() {
    let (dashboard, wh) = dashboard(
        FixtureWarehouse::new().fail_on("FACT_ORDER_ITEMS", "object 'DIM_MENU_ITEM' does not exist"),
        ScriptedModel::new(["unused"]),
    );

    let view = dashboard
        .render(Tab::Restaurants, &FilterSelection::new(), TopN::new(5))
        .await;

    let failed: Vec<&str> = view
        .sections
        .iter()
        .filter(|s| s.is_failed())
        .map(|s| s.title.as_str())
        .collect();
    assert_eq!(failed, vec!["Top 5 Menu Categories by Revenue"]);
    assert_eq!(view.kpis.len(), 3);
    assert!(wh.calls() > 5);

    let json = view.to_json(Theme::Dark);
    assert_eq!(json["theme"], "dark");
    assert_eq!(json["tab"], "restaurants");
}

#[tokio::test]
async fn test_cross_filter_notice_on_restaurants() {
    let (dashboard, _) = dashboard(FixtureWarehouse::new(), ScriptedModel::new(["unused"]));
    let filters = FilterSelection::new()
        .with_cities(["Pune"])
        .with_cuisines(["Thai"]);
    let view = dashboard.render(Tab::Restaurants, &filters, TopN::default()).await;
    assert_eq!(view.notices.len(), 1);
}

#[tokio::test]
async fn test_conclusion_falls_back_without_leaders() {
    let (dashboard, _) = dashboard(FixtureWarehouse::new(), ScriptedModel::new(["unused"]));
    let view = dashboard
        .render(Tab::Conclusion, &FilterSelection::new(), TopN::default())
        .await;

    let steps = view.section("Platform Growth").unwrap();
    match &steps.body {
        SectionBody::Bullets(items) => {
            assert!(items[0].contains("key markets"));
            assert!(items[1].contains("repeat customers"));
        }
        other => panic!("expected bullets, got {:?}", other),
    }
    assert_eq!(view.kpis[0].value, "₹0.00");
}

#[tokio::test]
async fn test_summary_tab_uses_the_model_once() {
    let model = ScriptedModel::new(["ProfitLens tracks GMV, profit and loyalty."]);
    let wh = Arc::new(FixtureWarehouse::new());
    let runner = QueryRunner::new(wh.clone(), Dialect::Snowflake, Duration::from_secs(600));
    let model = Arc::new(model);
    let dashboard = Dashboard::new(runner, model.clone(), Duration::from_secs(3600));

    for _ in 0..2 {
        let view = dashboard
            .render(Tab::Summary, &FilterSelection::new(), TopN::default())
            .await;
        assert_eq!(
            view.sections[0].body,
            SectionBody::Text("ProfitLens tracks GMV, profit and loyalty.".into())
        );
    }
    assert_eq!(model.calls(), 1);
    assert_eq!(wh.calls(), 0);
}

//! Strategic conclusion: headline KPIs, leaders and recommendations.

use tracing::warn;

use super::joined::{c, filtered_customer_orders, filtered_orders, gmv, net_profit, o, orders, r, ranked};
use super::{Kpi, Section, Tab, TabView};
use crate::filter::FilterSelection;
use crate::format::{fmt_int, fmt_money};
use crate::runner::QueryRunner;
use crate::sql::{avg, count, count_distinct, round, sum, ExprExt, Query, SelectExpr};
use crate::table;
use crate::warehouse::QueryResult;

pub(crate) const FILTER_NOTE: &str = "The insights and recommendations shown on this page \
dynamically update based on the filters you apply. To view the overall, platform-wide strategic \
summary, please clear all filters.";

pub(crate) fn kpi_query(filters: &FilterSelection) -> Query {
    filtered_orders(filters).select(vec![
        sum(gmv()).alias("TOTAL_GMV"),
        count_distinct(o("ORDER_ID")).alias("TOTAL_ORDERS"),
        round(avg(o("ORDER_RATING")), 2).alias("AVG_RATING"),
        count_distinct(o("CUSTOMER_ID")).alias("UNIQUE_CUSTOMERS"),
    ])
}

/// Commission rate against profit over all orders, ignoring filters.
pub(crate) fn commission_query() -> Query {
    orders()
        .filter(r("COMMISSION_RATE").is_not_null())
        .select(vec![
            SelectExpr::from(r("COMMISSION_RATE")),
            sum(net_profit()).alias("PROFIT"),
        ])
        .group_by(vec![r("COMMISSION_RATE")])
}

/// Leaders across the filter scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Leaders {
    pub city: Option<String>,
    pub cuisine: Option<String>,
    pub restaurant: Option<String>,
    pub customer: Option<String>,
}

pub async fn render(runner: &QueryRunner, filters: &FilterSelection) -> TabView {
    let mut view = TabView::new(
        Tab::Conclusion,
        "Strategic Conclusion & Recommendations",
        "An executive overview combining insights from all dashboards with data-backed next actions.",
    );
    view.notice(FILTER_NOTE);

    match runner.run_query(&kpi_query(filters)).await {
        Ok(res) => view.kpis = kpis(&res),
        Err(e) => view.push(Section::new("Key Metrics", "").failed(&e)),
    }

    let (city, cuisine, restaurant, customer) = futures::join!(
        leader(
            runner,
            ranked(filtered_orders(filters), r("CITY"), sum(net_profit()), "PROFIT", 1),
            "CITY",
        ),
        leader(
            runner,
            ranked(filtered_orders(filters), r("CUISINE_TYPE"), sum(gmv()), "GMV", 1),
            "CUISINE_TYPE",
        ),
        leader(
            runner,
            ranked(filtered_orders(filters), r("RESTAURANT_NAME"), sum(gmv()), "GMV", 1),
            "RESTAURANT_NAME",
        ),
        leader(
            runner,
            ranked(
                filtered_customer_orders(filters),
                c("CUSTOMER_NAME"),
                count(o("ORDER_ID")),
                "ORDERS",
                1,
            ),
            "CUSTOMER_NAME",
        ),
    );
    let leaders = Leaders {
        city,
        cuisine,
        restaurant,
        customer,
    };

    let correlation = match runner.run_query(&commission_query()).await {
        Ok(res) => table::pearson(&table::pairs(&res, "COMMISSION_RATE", "PROFIT")),
        Err(e) => {
            warn!(error = %e, "commission correlation unavailable");
            None
        }
    };

    view.push(Section::new("Data-Driven Recommendations", "").bullets(recommendations(&leaders, correlation)));
    view.push(Section::new("Platform Growth & Optimization", "Strategic next steps").bullets(next_steps(&leaders)));
    view.push(Section::new("In Summary", "").text(
        "Centering strategies on the most profitable cities, cuisines, and customers, while \
         optimizing commissions and leveraging loyalty, can drive both sustainable revenue growth \
         and improved partner relationships.",
    ));
    view
}

fn kpis(res: &QueryResult) -> Vec<Kpi> {
    vec![
        Kpi::new(
            "Total GMV",
            fmt_money(&res.f64_at(0, "TOTAL_GMV").unwrap_or(0.0)),
            "Overall platform revenue",
        ),
        Kpi::new(
            "Total Orders",
            fmt_int(&res.f64_at(0, "TOTAL_ORDERS").unwrap_or(0.0)),
            "Orders completed",
        ),
        Kpi::new(
            "Avg Rating",
            format!("{:.2}", res.f64_at(0, "AVG_RATING").unwrap_or(0.0)),
            "Customer satisfaction index",
        ),
        Kpi::new(
            "Unique Customers",
            fmt_int(&res.f64_at(0, "UNIQUE_CUSTOMERS").unwrap_or(0.0)),
            "Active customer base",
        ),
    ]
}

/// First value of `column`, or `None` on failure or no rows.
async fn leader(runner: &QueryRunner, query: Query, column: &str) -> Option<String> {
    match runner.run_query(&query).await {
        Ok(res) => res.str_at(0, column),
        Err(e) => {
            warn!(error = %e, column, "leader query failed");
            None
        }
    }
}

pub fn recommendations(leaders: &Leaders, commission_correlation: Option<f64>) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(city) = &leaders.city {
        out.push(format!(
            "Focus expansion and marketing on {}, which currently delivers the highest profit contribution.",
            city
        ));
    }
    if let Some(cuisine) = &leaders.cuisine {
        out.push(format!(
            "Promote {} cuisine; it drives the highest GMV share across all orders.",
            cuisine
        ));
    }
    if let Some(restaurant) = &leaders.restaurant {
        out.push(format!(
            "Feature {} as a flagship partner and replicate its operational model in other cities.",
            restaurant
        ));
    }
    if let Some(customer) = &leaders.customer {
        out.push(format!(
            "Reward loyal customer {} through personalized offers or premium engagement tiers.",
            customer
        ));
    }
    if let Some(r) = commission_correlation {
        out.push(
            if r > 0.3 {
                "Higher commission rates correlate positively with profit; maintain incentive-based partner models."
            } else if r < -0.3 {
                "Profitability decreases as commission rates rise; consider revising commission slabs for low-margin categories."
            } else {
                "Commission rate impact on profit is neutral; keep rates stable but continue monitoring partner satisfaction."
            }
            .to_string(),
        );
    }
    out
}

pub fn next_steps(leaders: &Leaders) -> Vec<String> {
    let or = |v: &Option<String>, fallback: &str| v.clone().unwrap_or_else(|| fallback.to_string());
    vec![
        format!(
            "Expand coverage in {} and replicate success frameworks from {}.",
            or(&leaders.city, "key markets"),
            or(&leaders.restaurant, "leading restaurants")
        ),
        format!(
            "Strengthen promotions for {} and incentivize loyal users like {}.",
            or(&leaders.cuisine, "popular cuisines"),
            or(&leaders.customer, "repeat customers")
        ),
        "Re-evaluate commission structures periodically to sustain balanced profitability.".to_string(),
        "Integrate predictive dashboards and real-time Snowflake analytics for proactive decisions."
            .to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::test_utils::validate_sql;
    use crate::sql::Dialect;

    #[test]
    fn test_commission_query_ignores_filters() {
        let sql = commission_query().to_sql(Dialect::Snowflake);
        assert!(sql.contains("WHERE R.COMMISSION_RATE IS NOT NULL\nGROUP BY R.COMMISSION_RATE"));
        validate_sql(&sql, Dialect::Snowflake).unwrap();
    }

    #[test]
    fn test_recommendations_thresholds() {
        let leaders = Leaders {
            city: Some("Pune".into()),
            ..Leaders::default()
        };
        let recs = recommendations(&leaders, Some(0.45));
        assert_eq!(recs.len(), 2);
        assert!(recs[0].contains("Pune"));
        assert!(recs[1].starts_with("Higher commission rates"));
        assert!(recommendations(&leaders, Some(-0.31))[1].starts_with("Profitability decreases"));
        assert!(recommendations(&leaders, Some(0.3))[1].starts_with("Commission rate impact"));
        assert!(recommendations(&Leaders::default(), None).is_empty());
    }

    #[test]
    fn test_next_steps_fallbacks() {
        let steps = next_steps(&Leaders::default());
        assert_eq!(
            steps[0],
            "Expand coverage in key markets and replicate success frameworks from leading restaurants."
        );
        assert!(steps[1].contains("popular cuisines") && steps[1].contains("repeat customers"));
    }
}

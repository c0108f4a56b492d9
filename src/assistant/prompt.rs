//! Text-to-SQL prompt.

use crate::filter::{predicate_text, ColumnScope, FilterSelection};
use crate::sql::Dialect;

pub const SCHEMA_CONTEXT: &str = "\
Table: V_PLATFORM_PROFITABILITY
Columns: ORDER_ID, ORDER_TIMESTAMP, CUSTOMER_ID, CUSTOMER_NAME, RESTAURANT_ID, RESTAURANT_NAME,
CITY, CUISINE_TYPE, GMV, DELIVERY_FEE, COMMISSION_REVENUE, DISCOUNT_AMOUNT,
PAYMENT_PROCESSING_FEE, NET_PROFIT, ORDER_RATING

Table: DIM_RESTAURANT
Columns: RESTAURANT_ID, RESTAURANT_NAME, CITY, CUISINE_TYPE, AVERAGE_RATING, COMMISSION_RATE

Table: DIM_CUSTOMER
Columns: CUSTOMER_ID, CUSTOMER_NAME, CITY, JOIN_DATE, EMAIL, PHONE

Table: FACT_ORDERS
Columns: ORDER_ID, CUSTOMER_ID, RESTAURANT_ID, COUPON_ID, ORDER_TIMESTAMP, DELIVERY_FEE, SUB_TOTAL_AMOUNT,
DISCOUNT_AMOUNT, COMMISSION_REVENUE, PAYMENT_PROCESSING_FEE, TOTAL_AMOUNT, ORDER_RATING
";

pub const NO_FILTERS: &str = "No filters applied";

/// Sentinel the model returns for unanswerable questions.
pub const OUT_OF_SCOPE: &str = "OUT-OF-SCOPE";

/// Build the prompt for `question` under the current filters.
pub fn build_prompt(question: &str, filters: &FilterSelection) -> String {
    let filter_text = predicate_text(filters, ColumnScope::Unaliased, Dialect::Snowflake)
        .unwrap_or_else(|| NO_FILTERS.to_string());

    format!(
        "You are a Snowflake SQL expert analyzing a food delivery analytics dataset.

Schema context:
{SCHEMA_CONTEXT}
Current dashboard filters: {filter_text}

User Question: \"{question}\"

Guidelines:
- For GMV, profit, or city-level metrics -> use V_PLATFORM_PROFITABILITY.
- CITY column exists directly in V_PLATFORM_PROFITABILITY.
- For restaurant-level questions -> use DIM_RESTAURANT.
- CRITICAL: Every aggregate function (SUM, COUNT, AVG, MAX) MUST be explicitly aliased (e.g., SUM(GMV) AS TOTAL_GMV, COUNT(*) AS TOTAL_ORDERS).
- Return only the SQL query. Do not include any commentary, explanations, or markdown formatting.
- If the question is irrelevant or cannot be answered from the schema, return exactly: {OUT_OF_SCOPE}
",
        question = question.trim(),
    )
}

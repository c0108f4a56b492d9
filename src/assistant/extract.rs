//! Pull a SQL statement out of free-form model output.

use std::sync::LazyLock;

use regex::Regex;

static FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)```sql|```").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(select|with|show|call)\b").unwrap());
/// Lower-case keywords inside prose only count when a statement follows.
static STATEMENT_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)^(select\b.+?\bfrom\b|with\s+\w+\s+as\s*\(|show\s+(terse\s+)?(tables|views|schemas|databases|columns|warehouses|objects|functions)\b|call\s+[\w.$]+\s*\()",
    )
    .unwrap()
});

/// View name models sometimes invent for the filtered dataset.
const FILTERED_VIEW: &str = "V_PLATFORM_FILTERED";
const VIEW: &str = "V_PLATFORM_PROFITABILITY";

/// Extract the statement from `raw`, or `None` if no statement keyword is found.
///
/// Code fences are removed and everything before the first statement keyword
/// dropped. A keyword counts when it is upper case, opens a line, or is
/// followed by a statement (`select .. from`, `with x as (`, ...), so words in
/// ordinary prose are skipped. Text after the last `;` is cut and whitespace
/// runs collapse to one space.
pub fn extract_sql(raw: &str) -> Option<String> {
    let cleaned = FENCE.replace_all(raw, "").replace(FILTERED_VIEW, VIEW);
    let start = KEYWORD
        .find_iter(&cleaned)
        .find(|m| starts_statement(&cleaned, m.start(), m.as_str()))?
        .start();

    let mut sql = cleaned[start..].trim();
    if let Some(end) = sql.rfind(';') {
        sql = &sql[..=end];
    }
    let sql = WHITESPACE.replace_all(sql, " ").trim().to_string();
    (!sql.is_empty()).then_some(sql)
}

fn starts_statement(text: &str, at: usize, keyword: &str) -> bool {
    let line_start = text[..at].rfind('\n').map_or(0, |i| i + 1);
    keyword.bytes().all(|b| b.is_ascii_uppercase())
        || text[line_start..at].trim().is_empty()
        || STATEMENT_SHAPE.is_match(&text[at..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_reply() {
        let raw = "Sure! ```sql\nSELECT CITY, SUM(GMV) AS TOTAL_GMV FROM V_PLATFORM_PROFITABILITY GROUP BY CITY;\n```";
        assert_eq!(
            extract_sql(raw).unwrap(),
            "SELECT CITY, SUM(GMV) AS TOTAL_GMV FROM V_PLATFORM_PROFITABILITY GROUP BY CITY;"
        );
    }

    #[test]
    fn test_refusal_has_no_sql() {
        assert_eq!(extract_sql("I cannot help with that."), None);
        assert_eq!(extract_sql(""), None);
    }

    #[test]
    fn test_trailing_commentary_is_cut() {
        let raw = "SELECT COUNT(*) AS TOTAL_ORDERS\n  FROM V_PLATFORM_FILTERED;\nThis counts all orders.";
        assert_eq!(
            extract_sql(raw).unwrap(),
            "SELECT COUNT(*) AS TOTAL_ORDERS FROM V_PLATFORM_PROFITABILITY;"
        );
    }

    #[test]
    fn test_lowercase_statement_on_its_own_line() {
        let raw = "Here you go:\nwith t as (select 1 as x)\nselect x from t";
        assert_eq!(
            extract_sql(raw).unwrap(),
            "with t as (select 1 as x) select x from t"
        );
    }

    #[test]
    fn test_without_semicolon_keeps_everything() {
        assert_eq!(
            extract_sql("```SELECT CITY FROM DIM_RESTAURANT```").unwrap(),
            "SELECT CITY FROM DIM_RESTAURANT"
        );
    }

    #[test]
    fn test_earliest_statement_beats_later_upper_case_prose() {
        let raw = "select city, sum(gmv) as total_gmv from v_platform_profitability group by city\nThis will SHOW the totals per city.";
        assert_eq!(
            extract_sql(raw).unwrap(),
            "select city, sum(gmv) as total_gmv from v_platform_profitability group by city This will SHOW the totals per city."
        );
    }

    #[test]
    fn test_inline_lower_case_statement() {
        assert_eq!(
            extract_sql("Sure: select city from v_platform_profitability").unwrap(),
            "select city from v_platform_profitability"
        );
        assert_eq!(
            extract_sql("Try this; with t as (select 1 as x) select x from t").unwrap(),
            "with t as (select 1 as x) select x from t"
        );
    }

    #[test]
    fn test_prose_keywords_are_skipped() {
        assert_eq!(extract_sql("Happy to help with that, but the schema has no refunds."), None);
        assert_eq!(extract_sql("I can show you the totals per city."), None);
    }
}

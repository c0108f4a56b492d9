//! Read-only allow-list for generated SQL.
//!
//! A statement passes when it is a single `SELECT`, `WITH` or `SHOW`
//! statement that parses, and no unquoted word is a data- or schema-changing
//! keyword.

use sqlparser::dialect::SnowflakeDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, Tokenizer};
use thiserror::Error;
use tracing::{debug, warn};

const ALLOWED_VERBS: [&str; 3] = ["SELECT", "WITH", "SHOW"];

/// Objects a `SHOW` may list.
const SHOW_OBJECTS: [&str; 8] = [
    "TABLES", "VIEWS", "SCHEMAS", "DATABASES", "COLUMNS", "WAREHOUSES", "OBJECTS", "FUNCTIONS",
];

const FORBIDDEN_KEYWORDS: [&str; 20] = [
    "INSERT", "UPDATE", "DELETE", "MERGE", "UPSERT", "TRUNCATE", "DROP", "CREATE",
    "ALTER", "RENAME", "GRANT", "REVOKE", "COPY", "PUT", "REMOVE", "CALL", "EXECUTE", "USE",
    "UNDROP", "COMMIT",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("statement could not be tokenized: {0}")]
    Tokenize(String),

    #[error("only one statement may be executed")]
    MultipleStatements,

    #[error("statements must start with SELECT, WITH or SHOW, found {0}")]
    DisallowedVerb(String),

    #[error("statement contains forbidden keyword {0}")]
    ForbiddenKeyword(String),

    #[error("statement is empty")]
    Empty,

    #[error("SHOW must list tables, views or another known object, found {0}")]
    UnknownShowObject(String),

    #[error("statement could not be parsed: {0}")]
    Unparseable(String),
}

/// Check that `sql` is a single read-only statement.
///
/// `SHOW` must name a known object list (`SHOW [TERSE] TABLES ..`). Anything
/// the parser rejects is rejected too, except such `SHOW` forms.
pub fn validate_sql(sql: &str) -> Result<(), ValidationError> {
    let dialect = SnowflakeDialect {};
    let tokens = Tokenizer::new(&dialect, sql)
        .tokenize()
        .map_err(|e| ValidationError::Tokenize(e.to_string()))?;

    let significant: Vec<&Token> = tokens
        .iter()
        .filter(|t| !matches!(t, Token::Whitespace(_)))
        .collect();

    // Anything after a semicolon other than more semicolons is a second statement.
    if let Some(pos) = significant.iter().position(|t| matches!(t, Token::SemiColon)) {
        if significant[pos..].iter().any(|t| !matches!(t, Token::SemiColon)) {
            return Err(ValidationError::MultipleStatements);
        }
    }

    let words: Vec<String> = significant
        .iter()
        .filter_map(|t| match t {
            Token::Word(w) if w.quote_style.is_none() => Some(w.value.to_uppercase()),
            _ => None,
        })
        .collect();

    let verb = match significant.first() {
        Some(Token::Word(w)) if w.quote_style.is_none() => w.value.to_uppercase(),
        Some(Token::LParen) => words.first().cloned().unwrap_or_default(),
        Some(other) => return Err(ValidationError::DisallowedVerb(other.to_string())),
        None => return Err(ValidationError::Empty),
    };
    if !ALLOWED_VERBS.contains(&verb.as_str()) {
        return Err(ValidationError::DisallowedVerb(verb));
    }

    if let Some(word) = words.iter().find(|w| FORBIDDEN_KEYWORDS.contains(&w.as_str())) {
        return Err(ValidationError::ForbiddenKeyword(word.clone()));
    }
    if verb == "SHOW" {
        if let Some(object) = unknown_show_object(&words) {
            return Err(ValidationError::UnknownShowObject(object));
        }
    }

    match Parser::parse_sql(&dialect, sql) {
        Ok(statements) if statements.len() > 1 => Err(ValidationError::MultipleStatements),
        Ok(_) => Ok(()),
        Err(e) if verb == "SHOW" => {
            debug!(error = %e, "unparsed SHOW accepted");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "generated SQL did not parse");
            Err(ValidationError::Unparseable(e.to_string()))
        }
    }
}

/// The word after `SHOW [TERSE]` when it is not a known object list.
fn unknown_show_object(words: &[String]) -> Option<String> {
    let object = match words.get(1).map(String::as_str) {
        Some("TERSE") => words.get(2),
        _ => words.get(1),
    };
    match object {
        Some(o) if SHOW_OBJECTS.contains(&o.as_str()) => None,
        Some(o) => Some(o.clone()),
        None => Some(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_read_only_statements() {
        validate_sql("SELECT CITY, SUM(GMV) AS TOTAL_GMV FROM V_PLATFORM_PROFITABILITY GROUP BY CITY;")
            .unwrap();
        validate_sql("WITH T AS (SELECT 1 AS X) SELECT X FROM T").unwrap();
        validate_sql("SHOW TABLES").unwrap();
        validate_sql("(SELECT 1)").unwrap();
    }

    #[test]
    fn test_rejects_multiple_statements() {
        assert_eq!(
            validate_sql("SELECT 1; DROP TABLE FACT_ORDERS;"),
            Err(ValidationError::MultipleStatements)
        );
        validate_sql("SELECT 1;;").unwrap();
    }

    #[test]
    fn test_rejects_writes_and_ddl() {
        assert_eq!(
            validate_sql("DELETE FROM FACT_ORDERS"),
            Err(ValidationError::DisallowedVerb("DELETE".into()))
        );
        assert_eq!(
            validate_sql("CALL REFRESH_STATS(10)"),
            Err(ValidationError::DisallowedVerb("CALL".into()))
        );
        assert_eq!(
            validate_sql("WITH X AS (DELETE FROM FACT_ORDERS) SELECT 1"),
            Err(ValidationError::ForbiddenKeyword("DELETE".into()))
        );
    }

    #[test]
    fn test_keywords_inside_literals_are_allowed() {
        validate_sql("SELECT * FROM DIM_RESTAURANT WHERE RESTAURANT_NAME = 'Drop Inn'").unwrap();
    }

    #[test]
    fn test_empty_statement() {
        assert_eq!(validate_sql("   "), Err(ValidationError::Empty));
    }

    #[test]
    fn test_prose_is_rejected() {
        assert_eq!(
            validate_sql("SHOW the totals per city."),
            Err(ValidationError::UnknownShowObject("THE".into()))
        );
        assert!(matches!(
            validate_sql("select city from v_platform_profitability group by city This will SHOW the totals per city."),
            Err(ValidationError::Unparseable(_))
        ));
    }

    #[test]
    fn test_show_of_known_objects() {
        validate_sql("SHOW TERSE VIEWS IN SCHEMA ANALYTICS").unwrap();
        assert_eq!(
            validate_sql("SHOW ME THE MONEY"),
            Err(ValidationError::UnknownShowObject("ME".into()))
        );
    }
}

//! Executable statements: SQL text plus positional bind values.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::dialect::{Dialect, SqlDialect};
use super::token::format_float;

/// A value bound to a `?` placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum BindValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Null,
}

impl BindValue {
    /// Plain JSON form, as the driver worker expects query args.
    pub fn to_json(&self) -> Value {
        match self {
            BindValue::Text(s) => Value::String(s.clone()),
            BindValue::Int(n) => Value::from(*n),
            BindValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            BindValue::Bool(b) => Value::Bool(*b),
            BindValue::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            BindValue::Null => Value::Null,
        }
    }

    /// Render as an SQL literal. Display only.
    pub fn to_literal(&self, dialect: Dialect) -> String {
        match self {
            BindValue::Text(s) => dialect.quote_string(s),
            BindValue::Int(n) => n.to_string(),
            BindValue::Float(f) => format_float(*f, dialect),
            BindValue::Bool(b) => dialect.format_bool(*b).into(),
            BindValue::Date(d) => dialect.quote_string(&d.format("%Y-%m-%d").to_string()),
            BindValue::Null => dialect.format_null().into(),
        }
    }
}

impl From<&str> for BindValue {
    fn from(s: &str) -> Self {
        BindValue::Text(s.to_string())
    }
}

impl From<String> for BindValue {
    fn from(s: String) -> Self {
        BindValue::Text(s)
    }
}

impl From<i64> for BindValue {
    fn from(n: i64) -> Self {
        BindValue::Int(n)
    }
}

impl From<f64> for BindValue {
    fn from(f: f64) -> Self {
        BindValue::Float(f)
    }
}

impl From<NaiveDate> for BindValue {
    fn from(d: NaiveDate) -> Self {
        BindValue::Date(d)
    }
}

/// SQL text with `?` placeholders and the values bound to them.
///
/// Two statements are the same cache entry exactly when both the text and
/// the parameters match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub sql: String,
    #[serde(default)]
    pub params: Vec<BindValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<BindValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// A statement with no bound parameters.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }

    pub fn has_params(&self) -> bool {
        !self.params.is_empty()
    }

    /// JSON args for drivers that take positional parameters.
    pub fn json_args(&self) -> Option<Vec<Value>> {
        if self.params.is_empty() {
            None
        } else {
            Some(self.params.iter().map(BindValue::to_json).collect())
        }
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bind_value_json() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(BindValue::Date(date).to_json(), json!("2024-03-09"));
        assert_eq!(BindValue::Float(f64::NAN).to_json(), Value::Null);
        assert_eq!(BindValue::from("Pune").to_json(), json!("Pune"));
    }

    #[test]
    fn test_literal_escapes_quotes() {
        let v = BindValue::Text("Domino's".into());
        assert_eq!(v.to_literal(Dialect::Snowflake), "'Domino''s'");
    }

    #[test]
    fn test_json_args() {
        assert_eq!(Statement::raw("SELECT 1").json_args(), None);
        let stmt = Statement::new("SELECT ?", vec![BindValue::Int(7)]);
        assert_eq!(stmt.json_args(), Some(vec![json!(7)]));
        assert_eq!(stmt.to_string(), "SELECT ?");
    }
}

//! Tabular query results and their normalization.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Column description in a result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name or alias.
    pub name: String,
    /// Backend type name (e.g. `FIXED`, `TEXT`, `TIMESTAMP_NTZ`, `DECIMAL`).
    #[serde(default)]
    pub data_type: String,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }

    fn is_numeric(&self) -> bool {
        let t = self.data_type.to_ascii_uppercase();
        ["FIXED", "REAL", "NUMBER", "DECIMAL", "NUMERIC", "INT", "FLOAT", "DOUBLE"]
            .iter()
            .any(|k| t.contains(k))
    }

    fn is_timestamp(&self) -> bool {
        let t = self.data_type.to_ascii_uppercase();
        t.contains("TIMESTAMP") || t == "DATE" || t.contains("DATETIME")
    }
}

/// An ordered set of named columns with uniform rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Case-insensitive column lookup.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)
    }

    /// Numeric cell; missing, null and non-numeric cells are `None`.
    pub fn f64_at(&self, row: usize, column: &str) -> Option<f64> {
        self.value(row, column).and_then(value_as_f64)
    }

    /// Text cell; numbers are rendered, null is `None`.
    pub fn str_at(&self, row: usize, column: &str) -> Option<String> {
        match self.value(row, column)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Every row's value of a numeric column, `None` where absent.
    pub fn column_f64(&self, column: &str) -> Vec<Option<f64>> {
        (0..self.rows.len())
            .map(|row| self.f64_at(row, column))
            .collect()
    }

    /// Every row's value of a column.
    pub fn column_values(&self, column: &str) -> Vec<Value> {
        match self.column_index(column) {
            Some(idx) => self
                .rows
                .iter()
                .map(|r| r.get(idx).cloned().unwrap_or(Value::Null))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Rows as JSON objects keyed by column name.
    pub fn to_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let mut obj = Map::new();
                for (col, value) in self.columns.iter().zip(row) {
                    obj.insert(col.name.clone(), value.clone());
                }
                Value::Object(obj)
            })
            .collect()
    }

    /// Uppercase column names and coerce values by column type.
    ///
    /// Numeric columns delivered as strings become numbers (unparseable
    /// values become null). Timestamp columns delivered as epoch seconds
    /// (`"1704067200.000000000"`) or text become ISO-8601 strings.
    pub fn normalize(mut self) -> Self {
        for col in &mut self.columns {
            col.name = col.name.to_uppercase();
        }
        for (idx, col) in self.columns.iter().enumerate() {
            let numeric = col.is_numeric();
            let timestamp = col.is_timestamp();
            if !numeric && !timestamp {
                continue;
            }
            for row in &mut self.rows {
                if let Some(cell) = row.get_mut(idx) {
                    if numeric {
                        *cell = coerce_number(cell);
                    } else {
                        *cell = coerce_timestamp(cell);
                    }
                }
            }
        }
        self
    }
}

/// Numeric view of a JSON value, accepting numeric strings.
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn coerce_number(value: &Value) -> Value {
    match value {
        Value::Number(_) | Value::Null => value.clone(),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(n) = s.parse::<i64>() {
                Value::from(n)
            } else {
                s.parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        _ => Value::Null,
    }
}

fn coerce_timestamp(value: &Value) -> Value {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return value.clone(),
    };
    parse_timestamp(&text)
        .map(|ts| Value::String(ts.format("%Y-%m-%dT%H:%M:%S").to_string()))
        .unwrap_or_else(|| value.clone())
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    // Epoch seconds, optionally with a fractional part and a timezone offset
    // suffix as the SQL API sends TIMESTAMP_TZ ("1704067200.000 1440").
    let epoch = text.split_whitespace().next().unwrap_or(text);
    let unsigned = epoch.strip_prefix('-').unwrap_or(epoch);
    if !unsigned.is_empty()
        && unsigned.starts_with(|c: char| c.is_ascii_digit())
        && unsigned.chars().all(|c| c.is_ascii_digit() || c == '.')
    {
        let (secs, frac) = epoch.split_once('.').unwrap_or((epoch, "0"));
        let secs: i64 = secs.parse().ok()?;
        let nanos: u32 = format!("{:0<9}", frac).get(..9)?.parse().ok()?;
        return DateTime::from_timestamp(secs, nanos).map(|dt| dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw() -> QueryResult {
        QueryResult::new(
            vec![
                Column::new("city", "TEXT"),
                Column::new("total_gmv", "FIXED"),
                Column::new("order_timestamp", "TIMESTAMP_NTZ"),
            ],
            vec![
                vec![json!("Pune"), json!("1200.50"), json!("1704067200.000000000")],
                vec![json!("Goa"), json!("n/a"), json!("2024-02-01 10:30:00.000")],
            ],
        )
    }

    #[test]
    fn test_normalize_uppercases_names() {
        let result = raw().normalize();
        assert_eq!(
            result.column_names(),
            vec!["CITY", "TOTAL_GMV", "ORDER_TIMESTAMP"]
        );
    }

    #[test]
    fn test_normalize_coerces_numbers() {
        let result = raw().normalize();
        assert_eq!(result.value(0, "TOTAL_GMV"), Some(&json!(1200.5)));
        assert_eq!(result.value(1, "TOTAL_GMV"), Some(&Value::Null));
        assert_eq!(result.value(0, "CITY"), Some(&json!("Pune")));
    }

    #[test]
    fn test_normalize_coerces_timestamps() {
        let result = raw().normalize();
        assert_eq!(
            result.value(0, "ORDER_TIMESTAMP"),
            Some(&json!("2024-01-01T00:00:00"))
        );
        assert_eq!(
            result.value(1, "ORDER_TIMESTAMP"),
            Some(&json!("2024-02-01T10:30:00"))
        );
    }

    #[test]
    fn test_accessors() {
        let result = raw().normalize();
        assert_eq!(result.column_index("city"), Some(0));
        assert_eq!(result.f64_at(0, "total_gmv"), Some(1200.5));
        assert_eq!(result.str_at(1, "CITY").as_deref(), Some("Goa"));
        assert_eq!(result.column_f64("TOTAL_GMV"), vec![Some(1200.5), None]);

        let records = result.to_records();
        assert_eq!(records[0]["CITY"], json!("Pune"));
    }

    #[test]
    fn test_value_as_f64() {
        assert_eq!(value_as_f64(&json!(" 3.5 ")), Some(3.5));
        assert_eq!(value_as_f64(&json!("abc")), None);
        assert_eq!(value_as_f64(&Value::Null), None);
    }
}

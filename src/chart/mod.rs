//! Chart descriptions and their Vega-Lite rendering.
//!
//! Renderers describe a chart as a [`Chart`]: a mark, the fields it encodes
//! and inline records. The description is theme-free; [`Chart::to_vega_lite`]
//! applies a [`Theme`] and produces a Vega-Lite v6 spec.

mod theme;

pub use theme::{Palette, Theme, CATEGORY_COLORS};

use inflector::Inflector;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::warehouse::QueryResult;

const SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v6.json";
const HEIGHT: u32 = 340;
/// Donut hole as a fraction of the radius.
const DONUT_HOLE: f64 = 0.45;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Donut,
    Scatter,
}

/// Vega-Lite measurement type of an encoded field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Nominal,
    Ordinal,
    Quantitative,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    pub title: String,
    pub field_type: FieldType,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            title: display_title(&name),
            name,
            field_type,
        }
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    fn encoding(&self) -> Value {
        json!({ "field": self.name, "type": self.field_type, "title": self.title })
    }
}

/// A theme-free chart description.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub kind: ChartKind,
    pub title: String,
    pub x: Field,
    pub y: Field,
    pub color: Option<Field>,
    /// Field printed as a text label on each mark.
    pub label: Option<String>,
    pub tooltip: Vec<Field>,
    pub values: Vec<Value>,
}

impl Chart {
    fn new(kind: ChartKind, title: impl Into<String>, x: Field, y: Field, values: Vec<Value>) -> Self {
        Self {
            kind,
            title: title.into(),
            x,
            y,
            color: None,
            label: None,
            tooltip: Vec::new(),
            values,
        }
    }

    /// Bars of `value` per `category`, tallest first.
    pub fn bar(title: impl Into<String>, category: &str, value: &str, values: Vec<Value>) -> Self {
        Self::new(
            ChartKind::Bar,
            title,
            Field::new(category, FieldType::Nominal),
            Field::new(value, FieldType::Quantitative),
            values,
        )
    }

    /// A line of `value` over an ordered `x` such as `MONTH`.
    pub fn line(title: impl Into<String>, x: &str, value: &str, values: Vec<Value>) -> Self {
        Self::new(
            ChartKind::Line,
            title,
            Field::new(x, FieldType::Ordinal),
            Field::new(value, FieldType::Quantitative),
            values,
        )
    }

    /// Donut slices of `value` per `category`.
    pub fn donut(title: impl Into<String>, category: &str, value: &str, values: Vec<Value>) -> Self {
        Self::new(
            ChartKind::Donut,
            title,
            Field::new(category, FieldType::Nominal),
            Field::new(value, FieldType::Quantitative),
            values,
        )
    }

    pub fn scatter(title: impl Into<String>, x: &str, y: &str, values: Vec<Value>) -> Self {
        Self::new(
            ChartKind::Scatter,
            title,
            Field::new(x, FieldType::Quantitative),
            Field::new(y, FieldType::Quantitative),
            values,
        )
    }

    /// Split series (lines) or color points by a nominal field.
    pub fn split_by(mut self, field: &str) -> Self {
        self.color = Some(Field::new(field, FieldType::Nominal));
        self
    }

    pub fn with_label(mut self, field: impl Into<String>) -> Self {
        self.label = Some(field.into());
        self
    }

    pub fn with_tooltip(mut self, field: &str, field_type: FieldType) -> Self {
        self.tooltip.push(Field::new(field, field_type));
        self
    }

    pub fn with_axis_titles(mut self, x: impl Into<String>, y: impl Into<String>) -> Self {
        self.x.title = x.into();
        self.y.title = y.into();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Render as a Vega-Lite v6 spec in the given theme.
    pub fn to_vega_lite(&self, theme: Theme) -> Value {
        let palette = theme.palette();
        let mut spec = json!({
            "$schema": SCHEMA,
            "title": self.title,
            "width": "container",
            "height": HEIGHT,
            "data": { "values": self.values },
            "config": theme.vega_config(),
        });

        let mut tooltip: Vec<Value> = vec![self.x.encoding(), self.y.encoding()];
        if let Some(color) = &self.color {
            tooltip.push(color.encoding());
        }
        tooltip.extend(self.tooltip.iter().map(Field::encoding));

        match self.kind {
            ChartKind::Bar => {
                let mut x = self.x.encoding();
                x["sort"] = json!("-y");
                let mut encoding = Map::new();
                encoding.insert("x".into(), x);
                encoding.insert("y".into(), self.y.encoding());
                encoding.insert("tooltip".into(), json!(tooltip));
                let bar = json!({
                    "mark": { "type": "bar", "color": palette.brand, "cornerRadiusEnd": 3 },
                });
                let mut layers = vec![bar];
                if let Some(label) = &self.label {
                    layers.push(text_layer(label, palette, "bottom"));
                }
                spec["encoding"] = Value::Object(encoding);
                spec["layer"] = Value::Array(layers);
            }
            ChartKind::Line => {
                let mut encoding = json!({
                    "x": self.x.encoding(),
                    "y": self.y.encoding(),
                    "tooltip": tooltip,
                });
                if let Some(color) = &self.color {
                    encoding["color"] = color.encoding();
                }
                let mut mark = json!({ "type": "line", "point": true });
                if self.color.is_none() {
                    mark["color"] = json!(palette.brand);
                }
                spec["mark"] = mark;
                spec["encoding"] = encoding;
            }
            ChartKind::Donut => {
                let outer = f64::from(HEIGHT) / 2.0 - 10.0;
                spec["mark"] = json!({
                    "type": "arc",
                    "innerRadius": (outer * DONUT_HOLE).round(),
                    "outerRadius": outer,
                });
                spec["encoding"] = json!({
                    "theta": self.y.encoding(),
                    "color": self.x.encoding(),
                    "tooltip": tooltip,
                });
            }
            ChartKind::Scatter => {
                let mut encoding = json!({
                    "x": self.x.encoding(),
                    "y": self.y.encoding(),
                    "tooltip": tooltip,
                });
                let mut mark = json!({ "type": "point", "filled": true, "size": 70 });
                match &self.color {
                    Some(color) => encoding["color"] = color.encoding(),
                    None => mark["color"] = json!(palette.accent),
                }
                spec["mark"] = mark;
                spec["encoding"] = encoding;
            }
        }
        spec
    }
}

fn text_layer(field: &str, palette: Palette, baseline: &str) -> Value {
    json!({
        "mark": { "type": "text", "baseline": baseline, "dy": -4, "color": palette.ink },
        "encoding": { "text": { "field": field, "type": "nominal" } }
    })
}

/// `"TOTAL_NET_PROFIT"` → `"Total Net Profit"`.
pub fn display_title(column: &str) -> String {
    column.to_lowercase().to_title_case()
}

/// Records of `(category, value)` pairs, with a formatted label column.
pub fn pair_records<F>(category: &str, value: &str, pairs: &[(String, f64)], label: F) -> Vec<Value>
where
    F: Fn(f64) -> String,
{
    pairs
        .iter()
        .map(|(k, v)| json!({ category: k, value: v, "LABEL": label(*v) }))
        .collect()
}

/// Result rows as records, adding a formatted `LABEL` from `value`.
pub fn labeled_records<F>(result: &QueryResult, value: &str, label: F) -> Vec<Value>
where
    F: Fn(f64) -> String,
{
    result
        .to_records()
        .into_iter()
        .enumerate()
        .map(|(row, mut record)| {
            let text = label(result.f64_at(row, value).unwrap_or(0.0));
            if let Some(map) = record.as_object_mut() {
                map.insert("LABEL".into(), Value::String(text));
            }
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Value> {
        vec![
            json!({ "CITY": "Pune", "TOTAL_GMV": 1500.0, "LABEL": "₹1.50K" }),
            json!({ "CITY": "Goa", "TOTAL_GMV": 900.0, "LABEL": "₹900.00" }),
        ]
    }

    #[test]
    fn test_display_title() {
        assert_eq!(display_title("TOTAL_NET_PROFIT"), "Total Net Profit");
        assert_eq!(display_title("CITY"), "City");
    }

    #[test]
    fn test_bar_spec() {
        let spec = Chart::bar("GMV by City", "CITY", "TOTAL_GMV", sample())
            .with_label("LABEL")
            .to_vega_lite(Theme::Light);
        assert_eq!(spec["$schema"], SCHEMA);
        assert_eq!(spec["encoding"]["x"]["field"], "CITY");
        assert_eq!(spec["encoding"]["x"]["sort"], "-y");
        assert_eq!(spec["encoding"]["y"]["title"], "Total Gmv");
        assert_eq!(spec["layer"].as_array().unwrap().len(), 2);
        assert_eq!(spec["layer"][0]["mark"]["color"], "#0A66C2");
        assert_eq!(spec["data"]["values"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_line_split_uses_color() {
        let spec = Chart::line("Monthly GMV", "MONTH", "GMV", vec![])
            .split_by("CITY")
            .to_vega_lite(Theme::Dark);
        assert_eq!(spec["encoding"]["color"]["field"], "CITY");
        assert!(spec["mark"].get("color").is_none());
        assert_eq!(spec["config"]["background"], "#0B1120");
    }

    #[test]
    fn test_donut_spec() {
        let spec = Chart::donut("Order Share", "CITY", "ORDERS", sample()).to_vega_lite(Theme::Light);
        assert_eq!(spec["mark"]["type"], "arc");
        assert_eq!(spec["encoding"]["theta"]["field"], "ORDERS");
        assert_eq!(spec["encoding"]["color"]["field"], "CITY");
        assert!(spec["mark"]["innerRadius"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn test_scatter_tooltip() {
        let spec = Chart::scatter("Rating vs Volume", "AVERAGE_RATING", "ORDER_VOLUME", vec![])
            .with_tooltip("RESTAURANT_NAME", FieldType::Nominal)
            .to_vega_lite(Theme::Light);
        let tooltip = spec["encoding"]["tooltip"].as_array().unwrap();
        assert_eq!(tooltip.len(), 3);
        assert_eq!(tooltip[2]["field"], "RESTAURANT_NAME");
    }

    #[test]
    fn test_pair_records() {
        let records = pair_records("CITY", "GMV", &[("Pune".into(), 2000.0)], |v| format!("{v}"));
        assert_eq!(records[0]["CITY"], "Pune");
        assert_eq!(records[0]["GMV"], 2000.0);
        assert_eq!(records[0]["LABEL"], "2000");
    }
}

//! Light and dark chart themes.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Categorical palette shared by both themes.
pub const CATEGORY_COLORS: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Resolved colors for one theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub background: &'static str,
    pub card: &'static str,
    pub ink: &'static str,
    pub muted: &'static str,
    pub grid: &'static str,
    pub brand: &'static str,
    pub accent: &'static str,
}

impl Theme {
    pub fn palette(self) -> Palette {
        match self {
            Theme::Light => Palette {
                background: "#F8FAFC",
                card: "#FFFFFF",
                ink: "#1E293B",
                muted: "#64748B",
                grid: "#E2E8F0",
                brand: "#0A66C2",
                accent: "#059669",
            },
            Theme::Dark => Palette {
                background: "#0B1120",
                card: "#1E293B",
                ink: "#E2E8F0",
                muted: "#94A3B8",
                grid: "#334155",
                brand: "#1E40AF",
                accent: "#22C55E",
            },
        }
    }

    /// Vega-Lite `config` block for this theme.
    pub fn vega_config(self) -> Value {
        let p = self.palette();
        json!({
            "background": p.background,
            "font": "Inter, sans-serif",
            "title": { "color": p.ink, "fontSize": 15, "anchor": "start" },
            "axis": {
                "labelColor": p.muted,
                "titleColor": p.ink,
                "gridColor": p.grid,
                "domainColor": p.grid,
                "tickColor": p.grid,
                "labelAngle": 0
            },
            "legend": { "labelColor": p.ink, "titleColor": p.ink },
            "view": { "stroke": null },
            "text": { "color": p.ink },
            "range": { "category": CATEGORY_COLORS }
        })
    }
}

impl std::str::FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme '{}' (expected light or dark)", other)),
        }
    }
}

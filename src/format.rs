//! Display formatting for KPI tiles, chart labels and insights.
//!
//! Magnitudes are abbreviated with `K`, `M` and `B` at 1e3, 1e6 and 1e9
//! (compared on the absolute value) and always show two decimals. Anything
//! that is not a finite number formats as zero.

use serde_json::Value;

/// Currency symbol prefixed by [`fmt_money`].
pub const CURRENCY: &str = "₹";

/// Loose numeric conversion for formatter input.
pub trait AsNumber {
    fn as_number(&self) -> Option<f64>;
}

impl AsNumber for f64 {
    fn as_number(&self) -> Option<f64> {
        Some(*self)
    }
}

impl AsNumber for f32 {
    fn as_number(&self) -> Option<f64> {
        Some(f64::from(*self))
    }
}

impl AsNumber for i64 {
    fn as_number(&self) -> Option<f64> {
        Some(*self as f64)
    }
}

impl AsNumber for i32 {
    fn as_number(&self) -> Option<f64> {
        Some(f64::from(*self))
    }
}

impl AsNumber for u64 {
    fn as_number(&self) -> Option<f64> {
        Some(*self as f64)
    }
}

impl AsNumber for usize {
    fn as_number(&self) -> Option<f64> {
        Some(*self as f64)
    }
}

impl AsNumber for str {
    fn as_number(&self) -> Option<f64> {
        self.trim().parse().ok()
    }
}

impl AsNumber for String {
    fn as_number(&self) -> Option<f64> {
        self.as_str().as_number()
    }
}

impl AsNumber for Value {
    fn as_number(&self) -> Option<f64> {
        crate::warehouse::value_as_f64(self)
    }
}

impl<T: AsNumber + ?Sized> AsNumber for &T {
    fn as_number(&self) -> Option<f64> {
        (**self).as_number()
    }
}

impl<T: AsNumber> AsNumber for Option<T> {
    fn as_number(&self) -> Option<f64> {
        self.as_ref().and_then(AsNumber::as_number)
    }
}

fn finite<T: AsNumber + ?Sized>(x: &T) -> Option<f64> {
    x.as_number().filter(|f| f.is_finite())
}

fn abbreviate(x: f64) -> String {
    let magnitude = x.abs();
    if magnitude >= 1_000_000_000.0 {
        format!("{:.2}B", x / 1_000_000_000.0)
    } else if magnitude >= 1_000_000.0 {
        format!("{:.2}M", x / 1_000_000.0)
    } else if magnitude >= 1_000.0 {
        format!("{:.2}K", x / 1_000.0)
    } else {
        format!("{:.2}", x)
    }
}

/// `950` → `"950.00"`, `1_500_000` → `"1.50M"`, garbage → `"0.00"`.
pub fn fmt_number<T: AsNumber + ?Sized>(x: &T) -> String {
    finite(x).map(abbreviate).unwrap_or_else(|| "0.00".to_string())
}

/// [`fmt_number`] with the currency symbol: `1_500_000` → `"₹1.50M"`.
pub fn fmt_money<T: AsNumber + ?Sized>(x: &T) -> String {
    format!("{}{}", CURRENCY, fmt_number(x))
}

/// Counts use the same abbreviation as other numbers.
pub fn fmt_int<T: AsNumber + ?Sized>(x: &T) -> String {
    fmt_number(x)
}

/// Two decimals followed by `" %"`.
pub fn fmt_percent<T: AsNumber + ?Sized>(x: &T) -> String {
    format!("{:.2} %", finite(x).unwrap_or(0.0))
}

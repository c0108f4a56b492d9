//! Dashboard filter state.
//!
//! A [`FilterSelection`] is built once per request and passed by reference
//! into every query builder and renderer. Nothing mutates it afterwards.

mod comparison;
mod options;
mod predicate;

pub use comparison::comparison_dimension;
pub use options::{load_options, FilterOptions};
pub use predicate::{predicate, predicate_text, ColumnScope, ORDERS_ALIAS, RESTAURANT_ALIAS};

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Shown whenever more than one categorical filter is active.
pub const CROSS_FILTER_NOTICE: &str = "Applying filters (City/Cuisine/Restaurant) may result in \
errors if the selections are contradictory (e.g., selecting a restaurant not found in the chosen \
city). Clear one filter before applying a dependency.";

/// A categorical filter dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    City,
    Cuisine,
    Restaurant,
}

impl Dimension {
    /// Comparison priority, highest first.
    pub const PRIORITY: [Dimension; 3] = [Dimension::City, Dimension::Cuisine, Dimension::Restaurant];

    /// Column name shared by the view and `DIM_RESTAURANT`.
    pub fn column(&self) -> &'static str {
        match self {
            Dimension::City => "CITY",
            Dimension::Cuisine => "CUISINE_TYPE",
            Dimension::Restaurant => "RESTAURANT_NAME",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Dimension::City => "City",
            Dimension::Cuisine => "Cuisine",
            Dimension::Restaurant => "Restaurant",
        }
    }
}

/// An inclusive date range, always ordered `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawDateRange")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawDateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl From<RawDateRange> for DateRange {
    fn from(raw: RawDateRange) -> Self {
        DateRange::new(raw.start, raw.end)
    }
}

impl DateRange {
    /// Build a range; a reversed pair is swapped.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

/// The user's current filter choices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawFilterSelection")]
pub struct FilterSelection {
    cities: BTreeSet<String>,
    restaurants: BTreeSet<String>,
    cuisines: BTreeSet<String>,
    date_range: Option<DateRange>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct RawFilterSelection {
    cities: Vec<String>,
    restaurants: Vec<String>,
    cuisines: Vec<String>,
    date_range: Option<DateRange>,
}

impl From<RawFilterSelection> for FilterSelection {
    fn from(raw: RawFilterSelection) -> Self {
        Self {
            cities: collect_values(raw.cities),
            restaurants: collect_values(raw.restaurants),
            cuisines: collect_values(raw.cuisines),
            date_range: raw.date_range,
        }
    }
}

impl FilterSelection {
    /// An empty selection: no filters at all.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cities<I, S>(mut self, cities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cities = collect_values(cities);
        self
    }

    pub fn with_restaurants<I, S>(mut self, restaurants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.restaurants = collect_values(restaurants);
        self
    }

    pub fn with_cuisines<I, S>(mut self, cuisines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cuisines = collect_values(cuisines);
        self
    }

    pub fn with_date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_range = Some(DateRange::new(start, end));
        self
    }

    pub fn cities(&self) -> &BTreeSet<String> {
        &self.cities
    }

    pub fn restaurants(&self) -> &BTreeSet<String> {
        &self.restaurants
    }

    pub fn cuisines(&self) -> &BTreeSet<String> {
        &self.cuisines
    }

    pub fn date_range(&self) -> Option<DateRange> {
        self.date_range
    }

    /// Selected values for one dimension.
    pub fn values(&self, dimension: Dimension) -> &BTreeSet<String> {
        match dimension {
            Dimension::City => &self.cities,
            Dimension::Cuisine => &self.cuisines,
            Dimension::Restaurant => &self.restaurants,
        }
    }

    pub fn is_unfiltered(&self) -> bool {
        self.cities.is_empty()
            && self.restaurants.is_empty()
            && self.cuisines.is_empty()
            && self.date_range.is_none()
    }

    /// Informational notice when two or more categorical filters are active.
    ///
    /// Combinations are never validated against the data; contradictory
    /// selections simply return empty results.
    pub fn cross_filter_notice(&self) -> Option<&'static str> {
        let active = Dimension::PRIORITY
            .iter()
            .filter(|d| !self.values(**d).is_empty())
            .count();
        (active >= 2).then_some(CROSS_FILTER_NOTICE)
    }
}

fn collect_values<I, S>(values: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values
        .into_iter()
        .map(Into::into)
        .map(|v: String| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

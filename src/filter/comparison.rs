//! Picks the dimension used to split charts into series.

use super::{Dimension, FilterSelection};

/// The first dimension in priority order (city, cuisine, restaurant) with
/// more than one selected value.
///
/// Set sizes never outrank priority: two cities beat three cuisines.
pub fn comparison_dimension(selection: &FilterSelection) -> Option<Dimension> {
    Dimension::PRIORITY
        .into_iter()
        .find(|d| selection.values(*d).len() > 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_beats_size() {
        let sel = FilterSelection::new()
            .with_cities(["Pune", "Delhi"])
            .with_cuisines(["Thai", "Italian", "Chinese"])
            .with_restaurants(["Spice Hub"]);
        assert_eq!(comparison_dimension(&sel), Some(Dimension::City));
    }

    #[test]
    fn test_single_values_do_not_count() {
        let sel = FilterSelection::new()
            .with_cities(["Pune"])
            .with_restaurants(["A", "B"]);
        assert_eq!(comparison_dimension(&sel), Some(Dimension::Restaurant));
    }

    #[test]
    fn test_none() {
        let sel = FilterSelection::new().with_cities(["Pune"]).with_cuisines(["Thai"]);
        assert_eq!(comparison_dimension(&sel), None);
        assert_eq!(comparison_dimension(&FilterSelection::new()), None);
    }
}

//! The four dashboard views. Each one reads the immutable `Dashboard` state and returns plain
//! data for a front end to draw; none of them mutate it.

use serde::Serialize;
use strum_macros::{Display, EnumIter, EnumString};

pub mod bar;
pub mod change_map;
pub mod intro;
pub mod summary;
pub mod trend;

pub const YEAR_LABEL: &str = "Year";
pub const NO2_LABEL: &str = "NO₂ (mol/m²)";

/// The navigation surface: exactly one view is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, Serialize)]
#[strum(ascii_case_insensitive)]
pub enum View {
    #[strum(to_string = "Introduction", serialize = "intro")]
    Introduction,
    #[strum(to_string = "Change Map", serialize = "map")]
    ChangeMap,
    #[strum(to_string = "Line Chart", serialize = "line")]
    LineChart,
    #[strum(to_string = "Bar Chart", serialize = "bar")]
    BarChart,
}

/// Shown instead of a chart when the user has not selected anything to compare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmptySelectionNotice {
    pub message: String,
}

impl Default for EmptySelectionNotice {
    fn default() -> Self {
        Self {
            message: "Please select at least one country to display the comparison chart.".into(),
        }
    }
}

/// Result of a view that depends on a user selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewOutcome<T> {
    Ready(T),
    Notice(EmptySelectionNotice),
}

impl<T> ViewOutcome<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            ViewOutcome::Ready(value) => Some(value),
            ViewOutcome::Notice(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn views_parse_from_titles_and_short_names() {
        assert_eq!(View::from_str("Change Map").unwrap(), View::ChangeMap);
        assert_eq!(View::from_str("MAP").unwrap(), View::ChangeMap);
        assert_eq!(View::from_str("bar").unwrap(), View::BarChart);
        assert!(View::from_str("pie").is_err());
    }

    #[test]
    fn four_views_in_menu_order() {
        let titles: Vec<String> = View::iter().map(|v| v.to_string()).collect();
        assert_eq!(
            titles,
            vec!["Introduction", "Change Map", "Line Chart", "Bar Chart"]
        );
    }
}

//! Bar Chart view: the four yearly means of one country.

use itertools::Itertools;
use serde::Serialize;

use crate::{
    error::{No2Error, No2Result},
    loader::Measurements,
    views::{NO2_LABEL, YEAR_LABEL},
    COL,
};

pub const BAR_CHART_TITLE: &str = "NO₂ Change Bar Chart (2018 - 2024)";
pub const BAR_COLOR_SCALE: &str = "OrRd";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    /// Source column of the value, e.g. `2018_mean`
    pub label: &'static str,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChart {
    pub title: String,
    pub x_label: &'static str,
    pub y_label: &'static str,
    /// Continuous scale the bars are coloured by, keyed on `value`
    pub color_scale: &'static str,
    pub bars: Vec<Bar>,
}

/// Country names in first-appearance order.
pub fn bar_options(measurements: &Measurements) -> No2Result<Vec<String>> {
    Ok(measurements
        .records()?
        .into_iter()
        .map(|record| record.name)
        .unique()
        .collect())
}

pub fn bar_chart(measurements: &Measurements, country: &str) -> No2Result<BarChart> {
    let record = measurements
        .records()?
        .into_iter()
        .find(|record| record.name == country)
        .ok_or_else(|| No2Error::UnknownCountry(country.to_string()))?;
    Ok(BarChart {
        title: format!("NO₂ Trend for {country}"),
        x_label: YEAR_LABEL,
        y_label: NO2_LABEL,
        color_scale: BAR_COLOR_SCALE,
        bars: COL::YEARLY_MEANS
            .into_iter()
            .zip(record.means)
            .map(|(label, value)| Bar { label, value })
            .collect(),
    })
}

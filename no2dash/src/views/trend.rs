//! Line Chart view: one country's trend, and several countries compared.

use itertools::Itertools;
use log::warn;
use nonempty::NonEmpty;
use serde::Serialize;

use crate::{
    error::{No2Error, No2Result},
    loader::{CountryMeasurement, Measurements},
    views::{EmptySelectionNotice, ViewOutcome, NO2_LABEL, YEAR_LABEL},
    COL,
};

pub const SINGLE_TREND_COLOR: &str = "teal";
pub const COMPARISON_TITLE: &str = "NO₂ Trend Comparison (Multiple Countries)";

/// One row of the long-format table: a country in a year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub country: String,
    pub year: i32,
    pub no2: f64,
}

/// Reshapes measurements into one row per country and year, countries in input order.
pub fn long_format(records: &[CountryMeasurement]) -> Vec<TrendPoint> {
    records
        .iter()
        .flat_map(|record| {
            COL::YEARS
                .iter()
                .zip(record.means)
                .map(move |(year, no2)| TrendPoint {
                    country: record.name.clone(),
                    year: *year,
                    no2,
                })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSeries {
    pub country: String,
    /// (year, NO₂) pairs in year order
    pub points: Vec<(i32, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendChart {
    pub title: String,
    pub x_label: &'static str,
    pub y_label: &'static str,
    /// Fixed line colour; `None` lets the front end colour each series.
    pub color: Option<&'static str>,
    pub markers: bool,
    pub series: Vec<TrendSeries>,
}

/// Sorted, de-duplicated country names offered by the trend selectors.
pub fn country_options(measurements: &Measurements) -> No2Result<Vec<String>> {
    Ok(measurements
        .records()?
        .into_iter()
        .map(|record| record.name)
        .sorted()
        .dedup()
        .collect())
}

/// Keeps the configured default comparison countries that exist in `options`.
pub fn default_selection(options: &[String], defaults: &[String]) -> Vec<String> {
    defaults
        .iter()
        .filter(|name| {
            let available = options.contains(*name);
            if !available {
                warn!("Default comparison country `{name}` is not in the data");
            }
            available
        })
        .cloned()
        .collect()
}

fn series_for(points: &[TrendPoint], country: &str) -> No2Result<TrendSeries> {
    let points: Vec<(i32, f64)> = points
        .iter()
        .filter(|point| point.country == country)
        .map(|point| (point.year, point.no2))
        .collect();
    if points.is_empty() {
        return Err(No2Error::UnknownCountry(country.to_string()));
    }
    Ok(TrendSeries {
        country: country.to_string(),
        points,
    })
}

pub fn single_country_trend(measurements: &Measurements, country: &str) -> No2Result<TrendChart> {
    let points = long_format(&measurements.records()?);
    Ok(TrendChart {
        title: format!("NO₂ Trend for {country}"),
        x_label: YEAR_LABEL,
        y_label: NO2_LABEL,
        color: Some(SINGLE_TREND_COLOR),
        markers: true,
        series: vec![series_for(&points, country)?],
    })
}

/// One series per selected country, in selection order. An empty selection yields a notice.
pub fn compare_trends(
    measurements: &Measurements,
    selection: &[String],
) -> No2Result<ViewOutcome<TrendChart>> {
    let Some(selection) = NonEmpty::from_slice(selection) else {
        return Ok(ViewOutcome::Notice(EmptySelectionNotice::default()));
    };
    let points = long_format(&measurements.records()?);
    let series = selection
        .iter()
        .unique()
        .map(|country| series_for(&points, country))
        .collect::<No2Result<Vec<_>>>()?;
    Ok(ViewOutcome::Ready(TrendChart {
        title: COMPARISON_TITLE.into(),
        x_label: YEAR_LABEL,
        y_label: NO2_LABEL,
        color: None,
        markers: true,
        series,
    }))
}

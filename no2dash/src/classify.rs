//! Bucketing of the 2018 to 2024 NO₂ delta into the three change categories shown on the map.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{error::No2Result, COL};

/// Upper bound of `Decrease` (exclusive) and lower bound of `SlightDecrease` (inclusive).
pub const DECREASE_THRESHOLD: f64 = -0.000005;
/// Upper bound of `SlightDecrease` (inclusive).
pub const INCREASE_THRESHOLD: f64 = 0.0;

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
pub enum ChangeCategory {
    #[strum(serialize = "Decrease")]
    #[serde(rename = "Decrease")]
    Decrease,
    #[strum(serialize = "Slight Decrease")]
    #[serde(rename = "Slight Decrease")]
    SlightDecrease,
    #[strum(serialize = "Increase")]
    #[serde(rename = "Increase")]
    Increase,
}

impl ChangeCategory {
    pub fn label(&self) -> &'static str {
        self.into()
    }
}

/// Classify a delta value. NaN fails both comparisons and lands in `Increase`.
pub fn classify(delta: f64) -> ChangeCategory {
    if delta < DECREASE_THRESHOLD {
        ChangeCategory::Decrease
    } else if (DECREASE_THRESHOLD..=INCREASE_THRESHOLD).contains(&delta) {
        ChangeCategory::SlightDecrease
    } else {
        ChangeCategory::Increase
    }
}

/// Adds a `Change_Category` label column derived from the `2024 - 2018` column.
pub fn with_change_category(mut df: DataFrame) -> No2Result<DataFrame> {
    let labels: Vec<&'static str> = df
        .column(COL::DELTA_2024_2018)?
        .f64()?
        .into_iter()
        .map(|delta| classify(delta.unwrap_or(f64::NAN)).label())
        .collect();
    df.with_column(Series::new(COL::CHANGE_CATEGORY, labels))?;
    Ok(df)
}

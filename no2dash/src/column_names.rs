//! Column names of the measurement table, the geometry table and the derived columns added by the
//! pipeline. The input names must match the upstream export exactly.

pub const NAME: &str = "NAME";
pub const GEOMETRY: &str = "geometry";

pub const MEAN_2018: &str = "2018_mean";
pub const MEAN_2020: &str = "2020_mean";
pub const MEAN_2022: &str = "2022_mean";
pub const MEAN_2024: &str = "2024_mean";
pub const DELTA_2024_2018: &str = "2024 - 2018";

pub const CHANGE_CATEGORY: &str = "Change_Category";

// Style columns written onto change map features
pub const FILL: &str = "fill";
pub const STROKE: &str = "stroke";
pub const STROKE_WIDTH: &str = "stroke-width";
pub const FILL_OPACITY: &str = "fill-opacity";

/// Years with a yearly mean column, in column order.
pub const YEARS: [i32; 4] = [2018, 2020, 2022, 2024];

/// Yearly mean columns, aligned with `YEARS`.
pub const YEARLY_MEANS: [&str; 4] = [MEAN_2018, MEAN_2020, MEAN_2022, MEAN_2024];

/// Every column the measurement table must provide.
pub const MEASUREMENT_COLUMNS: [&str; 6] = [
    NAME,
    MEAN_2018,
    MEAN_2020,
    MEAN_2022,
    MEAN_2024,
    DELTA_2024_2018,
];

//! Change Map view: the choropleth of change categories with its legend.

use std::str::FromStr;

use geojson::JsonObject;
use polars::prelude::*;
use serde::Serialize;
use strum::IntoEnumIterator;

use crate::{
    classify::ChangeCategory,
    config::{Config, LegendColors, MapSettings},
    error::{No2Error, No2Result},
    formatters::GeoJSONFormatter,
    join::Joined,
    COL,
};

pub const DECREASE_COLOR: &str = "#1f78b4";
pub const SLIGHT_DECREASE_COLOR: &str = "#ffcc00";
pub const INCREASE_COLOR: &str = "#e31a1c";
pub const FALLBACK_COLOR: &str = "gray";

pub const CHANGE_MAP_TITLE: &str = "NO₂ Change Map (2018 - 2024)";
pub const LEGEND_TITLE: &str = "NO₂ Change Legend";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub category: ChangeCategory,
    pub color: String,
}

/// The fixed three-entry colour key, in category order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub title: &'static str,
    pub entries: Vec<LegendEntry>,
}

impl Legend {
    pub fn new(colors: &LegendColors) -> Self {
        Self {
            title: LEGEND_TITLE,
            entries: ChangeCategory::iter()
                .map(|category| LegendEntry {
                    category,
                    color: colors.color(Some(category)).to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TooltipField {
    pub field: &'static str,
    pub alias: &'static str,
}

pub const TOOLTIP: [TooltipField; 2] = [
    TooltipField {
        field: COL::NAME,
        alias: "Country:",
    },
    TooltipField {
        field: COL::CHANGE_CATEGORY,
        alias: "Category:",
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
struct MapMetadata<'a> {
    title: &'static str,
    legend: &'a Legend,
    settings: &'a MapSettings,
    tooltip: &'a [TooltipField],
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeMap {
    pub legend: Legend,
    pub settings: MapSettings,
    features: DataFrame,
}

impl ChangeMap {
    pub fn new(joined: &Joined, config: &Config) -> No2Result<Self> {
        let mut features = joined.as_df().select([
            COL::NAME,
            COL::CHANGE_CATEGORY,
            COL::DELTA_2024_2018,
            COL::GEOMETRY,
        ])?;
        let height = features.height();
        let fill: Vec<&str> = features
            .column(COL::CHANGE_CATEGORY)?
            .str()?
            .into_iter()
            .map(|label| {
                let category = label.and_then(|label| ChangeCategory::from_str(label).ok());
                config.legend.color(category)
            })
            .collect();
        let settings = &config.map;
        features.with_column(Series::new(COL::FILL, fill))?;
        features.with_column(Series::new(
            COL::STROKE,
            vec![settings.stroke.as_str(); height],
        ))?;
        features.with_column(Series::new(
            COL::STROKE_WIDTH,
            vec![settings.stroke_width; height],
        ))?;
        features.with_column(Series::new(
            COL::FILL_OPACITY,
            vec![settings.fill_opacity; height],
        ))?;
        Ok(Self {
            legend: Legend::new(&config.legend),
            settings: config.map.clone(),
            features,
        })
    }

    pub fn title(&self) -> &'static str {
        CHANGE_MAP_TITLE
    }

    /// One row per country with its category, style columns and WKT geometry.
    pub fn features(&self) -> &DataFrame {
        &self.features
    }

    /// Title, legend, map settings and tooltip fields as a JSON object.
    pub fn metadata(&self) -> No2Result<JsonObject> {
        let metadata = MapMetadata {
            title: CHANGE_MAP_TITLE,
            legend: &self.legend,
            settings: &self.settings,
            tooltip: &TOOLTIP,
        };
        match serde_json::to_value(metadata)? {
            serde_json::Value::Object(object) => Ok(object),
            other => Err(No2Error::AnyhowError(anyhow::anyhow!(
                "Map metadata serialized to {other} instead of an object"
            ))),
        }
    }

    /// GeoJSON formatter that writes the map metadata next to the features.
    pub fn geojson_formatter(&self) -> No2Result<GeoJSONFormatter> {
        Ok(GeoJSONFormatter {
            foreign_members: Some(self.metadata()?),
        })
    }
}

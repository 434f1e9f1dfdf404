use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{
    classify::ChangeCategory,
    error::No2Result,
    reconcile::NameAliases,
    views::change_map::{
        DECREASE_COLOR, FALLBACK_COLOR, INCREASE_COLOR, SLIGHT_DECREASE_COLOR,
    },
};

/// Identity of the Sentinel-5P table export the default alias table was written for.
pub const DEFAULT_MEASUREMENT_SOURCE: &str = "sentinel5p_no2";

/// What to do when a country name occurs more than once in one of the source files.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail the load with `LoadError::DuplicateKey`.
    #[default]
    Reject,
    /// Keep the first row for each name and log the rest.
    KeepFirst,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LegendColors {
    pub decrease: String,
    pub slight_decrease: String,
    pub increase: String,
    pub fallback: String,
}

impl Default for LegendColors {
    fn default() -> Self {
        LegendColors {
            decrease: DECREASE_COLOR.into(),
            slight_decrease: SLIGHT_DECREASE_COLOR.into(),
            increase: INCREASE_COLOR.into(),
            fallback: FALLBACK_COLOR.into(),
        }
    }
}

impl LegendColors {
    pub fn color(&self, category: Option<ChangeCategory>) -> &str {
        match category {
            Some(ChangeCategory::Decrease) => &self.decrease,
            Some(ChangeCategory::SlightDecrease) => &self.slight_decrease,
            Some(ChangeCategory::Increase) => &self.increase,
            None => &self.fallback,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MapSettings {
    /// Latitude, longitude
    pub center: [f64; 2],
    pub zoom: u8,
    pub tiles: String,
    pub stroke: String,
    pub stroke_width: f64,
    pub fill_opacity: f64,
}

impl Default for MapSettings {
    fn default() -> Self {
        MapSettings {
            center: [0.0, 20.0],
            zoom: 3,
            tiles: "cartodb positron".into(),
            stroke: "black".into(),
            stroke_width: 0.5,
            fill_opacity: 0.7,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub measurements_path: PathBuf,
    pub geometries_path: PathBuf,
    /// Selects which table in `aliases` applies to the measurement file.
    pub measurement_source: String,
    /// Source identity -> (source country name -> canonical geometry name)
    pub aliases: BTreeMap<String, BTreeMap<String, String>>,
    pub duplicate_policy: DuplicatePolicy,
    pub legend: LegendColors,
    pub map: MapSettings,
    pub default_comparison: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        let sentinel_aliases =
            BTreeMap::from([("Ivory Coast".to_string(), "Côte d'Ivoire".to_string())]);
        Config {
            measurements_path: "Book.csv".into(),
            geometries_path: "Africa_NO2.geojson".into(),
            measurement_source: DEFAULT_MEASUREMENT_SOURCE.into(),
            aliases: BTreeMap::from([(DEFAULT_MEASUREMENT_SOURCE.to_string(), sentinel_aliases)]),
            duplicate_policy: DuplicatePolicy::default(),
            legend: LegendColors::default(),
            map: MapSettings::default(),
            default_comparison: vec!["Nigeria".into(), "South Africa".into()],
        }
    }
}

impl Config {
    /// Alias table for the configured measurement source. A source without a table gets an
    /// empty one.
    pub fn name_aliases(&self) -> No2Result<NameAliases> {
        match self.aliases.get(&self.measurement_source) {
            Some(table) => NameAliases::new(table.clone()),
            None => {
                log::warn!(
                    "No alias table for measurement source `{}`, names are joined verbatim",
                    self.measurement_source
                );
                Ok(NameAliases::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r##"
            measurements_path = "data/no2.csv"
            duplicate_policy = "keep_first"

            [legend]
            increase = "#ff0000"
            "##,
        )
        .unwrap();
        assert_eq!(config.measurements_path, PathBuf::from("data/no2.csv"));
        assert_eq!(config.geometries_path, PathBuf::from("Africa_NO2.geojson"));
        assert_eq!(config.duplicate_policy, DuplicatePolicy::KeepFirst);
        assert_eq!(config.legend.increase, "#ff0000");
        assert_eq!(config.legend.decrease, DECREASE_COLOR);
        assert_eq!(config.map, MapSettings::default());
    }

    #[test]
    fn alias_tables_are_keyed_by_source() {
        let config: Config = toml::from_str(
            r#"
            measurement_source = "other_export"

            [aliases.other_export]
            "Congo (Kinshasa)" = "Democratic Republic of the Congo"
            "#,
        )
        .unwrap();
        let aliases = config.name_aliases().unwrap();
        assert_eq!(
            aliases.canonical("Congo (Kinshasa)"),
            "Democratic Republic of the Congo"
        );
        assert_eq!(aliases.canonical("Ivory Coast"), "Ivory Coast");
    }

    #[test]
    fn unknown_source_gets_empty_aliases() {
        let config = Config {
            measurement_source: "unlisted".into(),
            ..Config::default()
        };
        assert!(config.name_aliases().unwrap().is_empty());
    }

    #[test]
    fn legend_falls_back_for_unclassified() {
        let legend = LegendColors::default();
        assert_eq!(legend.color(Some(ChangeCategory::Increase)), INCREASE_COLOR);
        assert_eq!(legend.color(None), "gray");
    }
}

//! Process-scoped dashboard state and its memoization.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use log::{debug, info};

use crate::{
    config::Config,
    error::{LoadError, No2Result},
    join::{join, JoinReport, Joined},
    loader::{Geometries, Measurements},
    views::{
        bar::{bar_chart, bar_options, BarChart},
        change_map::ChangeMap,
        intro::Introduction,
        summary::Summary,
        trend::{compare_trends, country_options, default_selection, single_country_trend, TrendChart},
        ViewOutcome,
    },
};

/// Loaded, reconciled, joined and classified data. Immutable once built; every view reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub config: Config,
    /// Measurements with canonical names
    pub measurements: Measurements,
    pub geometries: Geometries,
    pub joined: Joined,
    pub report: JoinReport,
}

impl Dashboard {
    /// Setup the Dashboard from the default configuration
    pub fn new() -> No2Result<Self> {
        Self::new_with_config(Config::default())
    }

    /// Loads both source files named in `config` and runs the pipeline.
    pub fn new_with_config(config: Config) -> No2Result<Self> {
        debug!("config: {config:?}");
        let measurements =
            Measurements::from_path(&config.measurements_path, config.duplicate_policy)?;
        let geometries = Geometries::from_path(&config.geometries_path, config.duplicate_policy)?;
        Self::from_sources(config, measurements, geometries)
    }

    /// Runs reconcile, join and classify over already loaded sources.
    pub fn from_sources(
        config: Config,
        measurements: Measurements,
        geometries: Geometries,
    ) -> No2Result<Self> {
        let aliases = config.name_aliases()?;
        let measurements = aliases
            .apply(&measurements)?
            .enforce_unique(&config.measurements_path, config.duplicate_policy)?;
        let (joined, report) = join(&measurements, &geometries)?;
        info!(
            "Dashboard ready: {} countries joined, {} dropped",
            joined.len(),
            report.warnings.len()
        );
        Ok(Self {
            config,
            measurements,
            geometries,
            joined,
            report,
        })
    }

    pub fn introduction(&self) -> Introduction {
        Introduction::default()
    }

    pub fn change_map(&self) -> No2Result<ChangeMap> {
        ChangeMap::new(&self.joined, &self.config)
    }

    pub fn country_options(&self) -> No2Result<Vec<String>> {
        country_options(&self.measurements)
    }

    pub fn single_country_trend(&self, country: &str) -> No2Result<TrendChart> {
        single_country_trend(&self.measurements, country)
    }

    /// The configured default comparison, limited to countries in the data.
    pub fn default_comparison(&self) -> No2Result<Vec<String>> {
        Ok(default_selection(
            &self.country_options()?,
            &self.config.default_comparison,
        ))
    }

    pub fn compare_trends(&self, selection: &[String]) -> No2Result<ViewOutcome<TrendChart>> {
        compare_trends(&self.measurements, selection)
    }

    pub fn bar_options(&self) -> No2Result<Vec<String>> {
        bar_options(&self.measurements)
    }

    pub fn bar_chart(&self, country: &str) -> No2Result<BarChart> {
        bar_chart(&self.measurements, country)
    }

    pub fn summary(&self) -> No2Result<Summary> {
        Summary::new(
            self.measurements.len(),
            self.geometries.len(),
            &self.joined,
            &self.report,
        )
    }
}

/// Modification time and length of a source file, used to notice edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SourceStamp {
    modified: Option<SystemTime>,
    len: u64,
}

impl SourceStamp {
    fn of(path: &Path) -> No2Result<Self> {
        let metadata = fs::metadata(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => LoadError::MissingFile(path.to_path_buf()),
            _ => LoadError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;
        Ok(Self {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        })
    }
}

/// Runs the pipeline once and hands out the same `Dashboard` until either source file changes.
#[derive(Debug)]
pub struct DashboardCache {
    config: Config,
    cached: Option<([SourceStamp; 2], Arc<Dashboard>)>,
    loads: usize,
}

impl DashboardCache {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            cached: None,
            loads: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn get(&mut self) -> No2Result<Arc<Dashboard>> {
        let stamps = [
            SourceStamp::of(&self.config.measurements_path)?,
            SourceStamp::of(&self.config.geometries_path)?,
        ];
        if let Some((cached_stamps, dashboard)) = &self.cached {
            if *cached_stamps == stamps {
                return Ok(Arc::clone(dashboard));
            }
            info!("Source files changed, reloading dashboard");
        }
        let dashboard = Arc::new(Dashboard::new_with_config(self.config.clone())?);
        self.loads += 1;
        self.cached = Some((stamps, Arc::clone(&dashboard)));
        Ok(dashboard)
    }

    /// Forces the next `get` to reload.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    /// Number of times the pipeline has run.
    pub fn loads(&self) -> usize {
        self.loads
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;
    use crate::classify::ChangeCategory;
    use crate::config::DuplicatePolicy;
    use crate::error::No2Error;
    use crate::join::MismatchSide;
    use crate::loader::tests::measurements_from_csv;

    fn test_data(file: &str) -> PathBuf {
        PathBuf::from(format!("{}/../test_data/{file}", env!("CARGO_MANIFEST_DIR")))
    }

    fn sample_config() -> Config {
        Config {
            measurements_path: test_data("no2_sample.csv"),
            geometries_path: test_data("africa_sample.geojson"),
            ..Config::default()
        }
    }

    #[test]
    fn sample_data_builds_a_dashboard() {
        let dashboard = Dashboard::new_with_config(sample_config()).unwrap();
        assert_eq!(
            dashboard.joined.names().unwrap(),
            vec!["Côte d'Ivoire", "Ghana", "Kenya", "Nigeria", "South Africa"]
        );
        assert_eq!(
            dashboard
                .report
                .dropped(MismatchSide::MeasurementsOnly)
                .collect::<Vec<_>>(),
            vec!["Eswatini"]
        );
        assert_eq!(
            dashboard
                .report
                .dropped(MismatchSide::GeometriesOnly)
                .collect::<Vec<_>>(),
            vec!["Swaziland"]
        );
        let categories: Vec<(String, ChangeCategory)> = dashboard
            .joined
            .records()
            .unwrap()
            .into_iter()
            .map(|r| (r.measurement.name, r.category))
            .collect();
        assert_eq!(
            categories,
            vec![
                ("Côte d'Ivoire".to_string(), ChangeCategory::Decrease),
                ("Ghana".to_string(), ChangeCategory::SlightDecrease),
                ("Kenya".to_string(), ChangeCategory::SlightDecrease),
                ("Nigeria".to_string(), ChangeCategory::Increase),
                ("South Africa".to_string(), ChangeCategory::Decrease),
            ]
        );
    }

    #[test]
    fn views_read_canonical_names() {
        let dashboard = Dashboard::new_with_config(sample_config()).unwrap();
        let options = dashboard.country_options().unwrap();
        assert!(options.contains(&"Côte d'Ivoire".to_string()));
        assert!(!options.contains(&"Ivory Coast".to_string()));
        // Trend views use the measurements, so countries without geometry still appear
        assert!(options.contains(&"Eswatini".to_string()));
        assert_eq!(
            dashboard.default_comparison().unwrap(),
            vec!["Nigeria", "South Africa"]
        );
        let chart = dashboard.bar_chart("Côte d'Ivoire").unwrap();
        assert_eq!(chart.bars[0].value, 5.0e-5);
    }

    #[test]
    fn aliasing_into_an_existing_name_is_a_duplicate() {
        let measurements = measurements_from_csv(
            "NAME,2018_mean,2020_mean,2022_mean,2024_mean,2024 - 2018
Ivory Coast,5e-5,4.8e-5,4.5e-5,4e-5,-1e-5
Côte d'Ivoire,5e-5,4.8e-5,4.5e-5,4e-5,-1e-5
",
        );
        let geometries =
            Geometries::from_path(test_data("africa_sample.geojson"), DuplicatePolicy::Reject)
                .unwrap();
        let result = Dashboard::from_sources(Config::default(), measurements, geometries);
        assert!(matches!(
            result,
            Err(No2Error::Load(LoadError::DuplicateKey { .. }))
        ));
    }

    #[test]
    fn missing_source_is_fatal() {
        let config = Config {
            measurements_path: "missing.csv".into(),
            ..sample_config()
        };
        assert!(matches!(
            Dashboard::new_with_config(config.clone()),
            Err(No2Error::Load(LoadError::MissingFile(_)))
        ));
        assert!(DashboardCache::new(config).get().is_err());
    }

    fn copy_sample_to(dir: &TempDir) -> Config {
        let measurements_path = dir.path().join("no2.csv");
        let geometries_path = dir.path().join("africa.geojson");
        fs::copy(test_data("no2_sample.csv"), &measurements_path).unwrap();
        fs::copy(test_data("africa_sample.geojson"), &geometries_path).unwrap();
        Config {
            measurements_path,
            geometries_path,
            ..Config::default()
        }
    }

    #[test]
    fn cache_runs_the_pipeline_once() {
        let dir = TempDir::new().unwrap();
        let mut cache = DashboardCache::new(copy_sample_to(&dir));
        let first = cache.get().unwrap();
        let second = cache.get().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.loads(), 1);
    }

    #[test]
    fn cache_reloads_when_a_source_changes() {
        let dir = TempDir::new().unwrap();
        let config = copy_sample_to(&dir);
        let mut cache = DashboardCache::new(config.clone());
        assert_eq!(cache.get().unwrap().joined.len(), 5);

        let mut csv = fs::read_to_string(&config.measurements_path).unwrap();
        csv.push_str("6,Swaziland,6.2e-05,5.9e-05,6.0e-05,6.4e-05,2.0e-06\n");
        fs::write(&config.measurements_path, csv).unwrap();

        let reloaded = cache.get().unwrap();
        assert_eq!(cache.loads(), 2);
        assert_eq!(reloaded.joined.len(), 6);
    }

    #[test]
    fn cache_reloads_when_the_geometries_change() {
        let dir = TempDir::new().unwrap();
        let config = copy_sample_to(&dir);
        let mut cache = DashboardCache::new(config.clone());
        assert_eq!(cache.get().unwrap().joined.len(), 5);

        let mut collection: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&config.geometries_path).unwrap()).unwrap();
        collection["features"]
            .as_array_mut()
            .unwrap()
            .retain(|feature| feature["properties"]["NAME"] != "Ghana");
        fs::write(&config.geometries_path, collection.to_string()).unwrap();

        let reloaded = cache.get().unwrap();
        assert_eq!(cache.loads(), 2);
        assert_eq!(reloaded.joined.len(), 4);
        assert!(!reloaded.joined.names().unwrap().contains(&"Ghana".to_string()));
    }

    #[test]
    fn cache_reloads_when_only_the_mtime_changes() {
        let dir = TempDir::new().unwrap();
        let config = copy_sample_to(&dir);
        let mut cache = DashboardCache::new(config.clone());
        let first = cache.get().unwrap();

        let len = fs::metadata(&config.measurements_path).unwrap().len();
        let modified = fs::metadata(&config.measurements_path)
            .unwrap()
            .modified()
            .unwrap();
        fs::OpenOptions::new()
            .write(true)
            .open(&config.measurements_path)
            .unwrap()
            .set_modified(modified + Duration::from_secs(60))
            .unwrap();
        assert_eq!(fs::metadata(&config.measurements_path).unwrap().len(), len);

        let second = cache.get().unwrap();
        assert_eq!(cache.loads(), 2);
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn invalidate_forces_a_reload() {
        let dir = TempDir::new().unwrap();
        let mut cache = DashboardCache::new(copy_sample_to(&dir));
        cache.get().unwrap();
        cache.invalidate();
        cache.get().unwrap();
        assert_eq!(cache.loads(), 2);
    }
}

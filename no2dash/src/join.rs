//! Inner join of canonical measurements with the boundary layer.

use std::collections::BTreeSet;
use std::fmt::Display;
use std::str::FromStr;

use geo::Geometry;
use itertools::izip;
use log::{debug, warn};
use polars::prelude::*;
use serde::Serialize;
use wkt::TryFromWkt;

use crate::{
    classify::{with_change_category, ChangeCategory},
    error::No2Result,
    loader::{CountryMeasurement, Geometries, Measurements},
    COL,
};

/// Which source a dropped country was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum MismatchSide {
    MeasurementsOnly,
    GeometriesOnly,
}

/// A country present in one source but not the other. It is left out of the joined data.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct JoinMismatchWarning {
    pub side: MismatchSide,
    pub name: String,
}

impl Display for JoinMismatchWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.side {
            MismatchSide::MeasurementsOnly => write!(
                f,
                "`{}` has measurements but no matching geometry and is dropped",
                self.name
            ),
            MismatchSide::GeometriesOnly => write!(
                f,
                "`{}` has a geometry but no matching measurements and is dropped",
                self.name
            ),
        }
    }
}

/// Every country the join dropped, sorted by side then name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JoinReport {
    pub warnings: Vec<JoinMismatchWarning>,
}

impl JoinReport {
    pub fn compare(measurements: &Measurements, geometries: &Geometries) -> No2Result<Self> {
        let measured = names(measurements.as_df())?;
        let outlined = names(geometries.as_df())?;
        let measurements_only = measured.difference(&outlined).map(|name| JoinMismatchWarning {
            side: MismatchSide::MeasurementsOnly,
            name: name.to_string(),
        });
        let geometries_only = outlined.difference(&measured).map(|name| JoinMismatchWarning {
            side: MismatchSide::GeometriesOnly,
            name: name.to_string(),
        });
        Ok(Self {
            warnings: measurements_only.chain(geometries_only).collect(),
        })
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn dropped(&self, side: MismatchSide) -> impl Iterator<Item = &str> {
        self.warnings
            .iter()
            .filter(move |w| w.side == side)
            .map(|w| w.name.as_str())
    }
}

fn names(df: &DataFrame) -> No2Result<BTreeSet<&str>> {
    Ok(df.column(COL::NAME)?.str()?.into_iter().flatten().collect())
}

/// One country with measurements, boundary and change category.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRecord {
    pub measurement: CountryMeasurement,
    pub geometry: Geometry<f64>,
    pub category: ChangeCategory,
}

/// Joined and classified frame, sorted by `NAME`: the measurement columns, `geometry` as WKT and
/// `Change_Category`.
#[derive(Debug, Clone, PartialEq)]
pub struct Joined(DataFrame);

impl Joined {
    pub fn as_df(&self) -> &DataFrame {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.height()
    }

    pub fn is_empty(&self) -> bool {
        self.0.height() == 0
    }

    pub fn names(&self) -> No2Result<Vec<String>> {
        Ok(self
            .0
            .column(COL::NAME)?
            .str()?
            .into_iter()
            .flatten()
            .map(String::from)
            .collect())
    }

    pub fn records(&self) -> No2Result<Vec<JoinedRecord>> {
        let measurements = Measurements::from_validated(self.0.select(COL::MEASUREMENT_COLUMNS)?);
        izip!(
            measurements.records()?,
            self.0.column(COL::GEOMETRY)?.str()?,
            self.0.column(COL::CHANGE_CATEGORY)?.str()?,
        )
        .map(|(measurement, wkt, category)| -> No2Result<JoinedRecord> {
            let geometry = Geometry::try_from_wkt_str(wkt.unwrap_or_default())
                .map_err(|err| anyhow::anyhow!("Invalid geometry WKT: {err}"))?;
            let category = ChangeCategory::from_str(category.unwrap_or_default())
                .map_err(|err| anyhow::anyhow!("Invalid change category: {err}"))?;
            Ok(JoinedRecord {
                measurement,
                geometry,
                category,
            })
        })
        .collect()
    }
}

/// Joins on `NAME`, keeping only countries present in both sources, and classifies each delta.
/// Dropped countries are logged and returned in the `JoinReport`.
pub fn join(measurements: &Measurements, geometries: &Geometries) -> No2Result<(Joined, JoinReport)> {
    let report = JoinReport::compare(measurements, geometries)?;
    for warning in &report.warnings {
        warn!("{warning}");
    }
    let df = measurements
        .as_df()
        .join(
            geometries.as_df(),
            [COL::NAME],
            [COL::NAME],
            JoinArgs::new(JoinType::Inner),
        )?
        .sort([COL::NAME], SortMultipleOptions::default())?;
    let df = with_change_category(df)?;
    debug!(
        "Joined {} of {} measured countries",
        df.height(),
        measurements.len()
    );
    Ok((Joined(df), report))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::loader::tests::{
        feature_collection, geometries_from_geojson, measurements_from_csv, square_feature,
    };
    use crate::reconcile::NameAliases;

    const HEADER: &str = "NAME,2018_mean,2020_mean,2022_mean,2024_mean,2024 - 2018";

    fn csv(rows: &[&str]) -> String {
        std::iter::once(HEADER)
            .chain(rows.iter().copied())
            .collect::<Vec<_>>()
            .join("\n")
            + "\n"
    }

    const IVORY_COAST: &str = "Ivory Coast,5e-5,4.8e-5,4.5e-5,4e-5,-1e-5";
    const NIGERIA: &str = "Nigeria,7e-5,7.1e-5,7.3e-5,7.4e-5,4e-6";
    const ATLANTIS: &str = "Atlantis,1e-5,1e-5,1e-5,1e-5,0";

    fn sentinel_aliases() -> NameAliases {
        NameAliases::new(BTreeMap::from([(
            "Ivory Coast".to_string(),
            "Côte d'Ivoire".to_string(),
        )]))
        .unwrap()
    }

    #[test]
    fn ivory_coast_joins_through_alias() {
        let measurements = measurements_from_csv(&csv(&[IVORY_COAST]));
        let geometries =
            geometries_from_geojson(&feature_collection(&[square_feature("Côte d'Ivoire", -8.0, 5.0)]));
        let canonical = sentinel_aliases().apply(&measurements).unwrap();

        let (joined, report) = join(&canonical, &geometries).unwrap();
        assert!(report.is_clean());
        let records = joined.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].measurement.name, "Côte d'Ivoire");
        assert_eq!(records[0].category, ChangeCategory::Decrease);
        assert!(matches!(records[0].geometry, Geometry::Polygon(_)));
    }

    #[test]
    fn without_alias_the_country_is_dropped() {
        let measurements = measurements_from_csv(&csv(&[IVORY_COAST]));
        let geometries =
            geometries_from_geojson(&feature_collection(&[square_feature("Côte d'Ivoire", -8.0, 5.0)]));
        let (joined, report) = join(&measurements, &geometries).unwrap();
        assert!(joined.is_empty());
        assert_eq!(
            report.dropped(MismatchSide::MeasurementsOnly).collect::<Vec<_>>(),
            vec!["Ivory Coast"]
        );
        assert_eq!(
            report.dropped(MismatchSide::GeometriesOnly).collect::<Vec<_>>(),
            vec!["Côte d'Ivoire"]
        );
    }

    #[test]
    fn unmatched_country_is_dropped_silently_and_deterministically() {
        let measurements = measurements_from_csv(&csv(&[NIGERIA, ATLANTIS]));
        let geometries =
            geometries_from_geojson(&feature_collection(&[square_feature("Nigeria", 3.0, 4.0)]));

        let first = join(&measurements, &geometries);
        assert!(first.is_ok(), "A missing geometry should not be an error");
        let (joined, report) = first.unwrap();
        assert_eq!(joined.names().unwrap(), vec!["Nigeria"]);
        assert_eq!(
            report.warnings,
            vec![JoinMismatchWarning {
                side: MismatchSide::MeasurementsOnly,
                name: "Atlantis".into()
            }]
        );

        let (again, again_report) = join(&measurements, &geometries).unwrap();
        assert_eq!(again, joined);
        assert_eq!(again_report, report);
    }

    #[test]
    fn join_is_independent_of_row_order() {
        let rows = [IVORY_COAST, NIGERIA, ATLANTIS];
        let features = [
            square_feature("Nigeria", 3.0, 4.0),
            square_feature("Ivory Coast", -8.0, 5.0),
            square_feature("Ghana", -3.0, 5.0),
        ];
        let (expected, expected_report) = join(
            &measurements_from_csv(&csv(&rows)),
            &geometries_from_geojson(&feature_collection(&features)),
        )
        .unwrap();

        let reversed_rows: Vec<&str> = rows.iter().rev().copied().collect();
        let rotated_features = [
            features[2].clone(),
            features[0].clone(),
            features[1].clone(),
        ];
        let (actual, actual_report) = join(
            &measurements_from_csv(&csv(&reversed_rows)),
            &geometries_from_geojson(&feature_collection(&rotated_features)),
        )
        .unwrap();

        assert_eq!(actual, expected);
        assert_eq!(actual_report, expected_report);
        assert_eq!(actual.names().unwrap(), vec!["Ivory Coast", "Nigeria"]);
    }

    #[test]
    fn joined_names_all_exist_in_geometry_source() {
        let measurements = sentinel_aliases()
            .apply(&measurements_from_csv(&csv(&[IVORY_COAST, NIGERIA, ATLANTIS])))
            .unwrap();
        let geometries = geometries_from_geojson(&feature_collection(&[
            square_feature("Côte d'Ivoire", -8.0, 5.0),
            square_feature("Nigeria", 3.0, 4.0),
            square_feature("Ghana", -3.0, 5.0),
        ]));
        let (joined, _) = join(&measurements, &geometries).unwrap();
        let outlined: Vec<String> = geometries
            .records()
            .unwrap()
            .into_iter()
            .map(|g| g.name)
            .collect();
        let joined_names = joined.names().unwrap();
        assert_eq!(joined_names.len(), 2);
        for name in joined_names {
            assert!(outlined.contains(&name), "{name} has no geometry");
        }
    }

    #[test]
    fn joined_frame_has_category_and_geometry() {
        let (joined, _) = join(
            &measurements_from_csv(&csv(&[NIGERIA])),
            &geometries_from_geojson(&feature_collection(&[square_feature("Nigeria", 3.0, 4.0)])),
        )
        .unwrap();
        let columns = joined.as_df().get_column_names();
        assert!(columns.contains(&COL::GEOMETRY));
        assert!(columns.contains(&COL::CHANGE_CATEGORY));
        assert_eq!(
            joined.records().unwrap()[0].category,
            ChangeCategory::Increase
        );
    }

    #[test]
    fn warnings_read_well() {
        let warning = JoinMismatchWarning {
            side: MismatchSide::MeasurementsOnly,
            name: "Atlantis".into(),
        };
        assert_eq!(
            warning.to_string(),
            "`Atlantis` has measurements but no matching geometry and is dropped"
        );
    }
}

//! Reading the measurement table and the country boundary layer into validated dataframes.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use geo::Geometry;
use geojson::GeoJson;
use itertools::izip;
use log::{debug, warn};
use polars::io::mmap::MmapBytesReader;
use polars::prelude::*;
use serde::Serialize;
use wkt::{ToWkt, TryFromWkt};

use crate::{
    config::DuplicatePolicy,
    error::{LoadError, No2Result},
    COL,
};

/// One row of the measurement table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryMeasurement {
    pub name: String,
    /// Yearly means in mol/m², aligned with `COL::YEARS`
    pub means: [f64; 4],
    /// 2024 mean minus 2018 mean, as exported
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CountryGeometry {
    pub name: String,
    pub geometry: Geometry<f64>,
}

/// The measurement table with the columns in `COL::MEASUREMENT_COLUMNS`, names as strings and
/// every value column as non-null `f64`.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurements(DataFrame);

/// The boundary layer as a `NAME` column and a `geometry` column of WKT strings.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometries(DataFrame);

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => LoadError::MissingFile(path.to_path_buf()),
        _ => LoadError::Io {
            path: path.to_path_buf(),
            source,
        },
    })
}

/// Drops or rejects repeated names according to `policy`. The first occurrence always wins.
fn enforce_unique_names(df: DataFrame, path: &Path, policy: DuplicatePolicy) -> No2Result<DataFrame> {
    let keep = {
        let names = df.column(COL::NAME)?.str()?;
        let mut seen = HashSet::with_capacity(df.height());
        let mut keep = Vec::with_capacity(df.height());
        for name in names.into_iter() {
            let name = name.unwrap_or_default();
            let first = seen.insert(name);
            if !first {
                match policy {
                    DuplicatePolicy::Reject => {
                        return Err(LoadError::DuplicateKey {
                            path: path.to_path_buf(),
                            name: name.to_string(),
                        }
                        .into())
                    }
                    DuplicatePolicy::KeepFirst => {
                        warn!("Dropping repeated row for `{name}` in {}", path.display())
                    }
                }
            }
            keep.push(first);
        }
        keep
    };
    if keep.iter().all(|k| *k) {
        return Ok(df);
    }
    let mask = BooleanChunked::from_slice("keep", &keep);
    Ok(df.filter(&mask)?)
}

impl Measurements {
    pub fn from_path<P: AsRef<Path>>(path: P, policy: DuplicatePolicy) -> No2Result<Self> {
        let path = path.as_ref();
        debug!("Loading measurements from {}", path.display());
        Self::from_reader(open(path)?, path, policy)
    }

    /// Reads CSV from `reader`; `origin` is only used in error messages.
    pub fn from_reader<R: MmapBytesReader>(
        reader: R,
        origin: &Path,
        policy: DuplicatePolicy,
    ) -> No2Result<Self> {
        let raw = CsvReadOptions::default()
            .with_has_header(true)
            .into_reader_with_file_handle(reader)
            .finish()
            .map_err(|source| LoadError::MalformedTable {
                path: origin.to_path_buf(),
                source,
            })?;

        let present = raw.get_column_names();
        if let Some(missing) = COL::MEASUREMENT_COLUMNS
            .iter()
            .find(|column| !present.contains(*column))
        {
            return Err(LoadError::MissingColumn {
                path: origin.to_path_buf(),
                column: missing.to_string(),
            }
            .into());
        }

        let mut columns = Vec::with_capacity(COL::MEASUREMENT_COLUMNS.len());
        for column in COL::MEASUREMENT_COLUMNS {
            let dtype = if column == COL::NAME {
                DataType::String
            } else {
                DataType::Float64
            };
            let series = raw.column(column)?.cast(&dtype)?;
            if series.null_count() > 0 {
                return Err(LoadError::MissingValues {
                    path: origin.to_path_buf(),
                    column: column.to_string(),
                    count: series.null_count(),
                }
                .into());
            }
            columns.push(series);
        }
        let df = enforce_unique_names(DataFrame::new(columns)?, origin, policy)?;
        debug!("Loaded {} measurement rows", df.height());
        Ok(Self(df))
    }

    /// Wraps a frame that already has the validated schema.
    pub(crate) fn from_validated(df: DataFrame) -> Self {
        Self(df)
    }

    /// Re-checks name uniqueness, e.g. after aliasing has merged two spellings of one country.
    pub(crate) fn enforce_unique(self, origin: &Path, policy: DuplicatePolicy) -> No2Result<Self> {
        Ok(Self(enforce_unique_names(self.0, origin, policy)?))
    }

    pub fn as_df(&self) -> &DataFrame {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.height()
    }

    pub fn is_empty(&self) -> bool {
        self.0.height() == 0
    }

    pub fn records(&self) -> No2Result<Vec<CountryMeasurement>> {
        let df = &self.0;
        Ok(izip!(
            df.column(COL::NAME)?.str()?,
            df.column(COL::MEAN_2018)?.f64()?,
            df.column(COL::MEAN_2020)?.f64()?,
            df.column(COL::MEAN_2022)?.f64()?,
            df.column(COL::MEAN_2024)?.f64()?,
            df.column(COL::DELTA_2024_2018)?.f64()?,
        )
        .map(|(name, m2018, m2020, m2022, m2024, delta)| CountryMeasurement {
            name: name.unwrap_or_default().to_string(),
            means: [m2018, m2020, m2022, m2024].map(|m| m.unwrap_or(f64::NAN)),
            delta: delta.unwrap_or(f64::NAN),
        })
        .collect())
    }
}

impl Geometries {
    pub fn from_path<P: AsRef<Path>>(path: P, policy: DuplicatePolicy) -> No2Result<Self> {
        let path = path.as_ref();
        debug!("Loading geometries from {}", path.display());
        Self::from_reader(open(path)?, path, policy)
    }

    /// Reads a GeoJSON FeatureCollection from `reader`; `origin` is only used in error messages.
    pub fn from_reader<R: Read>(reader: R, origin: &Path, policy: DuplicatePolicy) -> No2Result<Self> {
        let text = io::read_to_string(reader).map_err(|source| LoadError::Io {
            path: origin.to_path_buf(),
            source,
        })?;
        let geojson = text
            .parse::<GeoJson>()
            .map_err(|source| LoadError::MalformedGeoJson {
                path: origin.to_path_buf(),
                source,
            })?;
        let GeoJson::FeatureCollection(collection) = geojson else {
            return Err(LoadError::NotAFeatureCollection(origin.to_path_buf()).into());
        };

        let mut names = Vec::with_capacity(collection.features.len());
        let mut geoms = Vec::with_capacity(collection.features.len());
        for (index, feature) in collection.features.into_iter().enumerate() {
            let name = feature
                .property(COL::NAME)
                .and_then(|value| value.as_str())
                .ok_or_else(|| LoadError::MissingName {
                    path: origin.to_path_buf(),
                    index,
                })?
                .to_string();
            let geometry = feature.geometry.ok_or_else(|| LoadError::MissingGeometry {
                path: origin.to_path_buf(),
                name: name.clone(),
            })?;
            let invalid = |reason: String| LoadError::InvalidGeometry {
                path: origin.to_path_buf(),
                name: name.clone(),
                reason,
            };
            let geom = Geometry::<f64>::try_from(geometry).map_err(|err| invalid(err.to_string()))?;
            if !matches!(geom, Geometry::Polygon(_) | Geometry::MultiPolygon(_)) {
                return Err(invalid("expected Polygon or MultiPolygon".into()).into());
            }
            geoms.push(geom.wkt_string());
            names.push(name);
        }

        let df = DataFrame::new(vec![
            Series::new(COL::NAME, names),
            Series::new(COL::GEOMETRY, geoms),
        ])?;
        let df = enforce_unique_names(df, origin, policy)?;
        debug!("Loaded {} geometry features", df.height());
        Ok(Self(df))
    }

    pub fn as_df(&self) -> &DataFrame {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.height()
    }

    pub fn is_empty(&self) -> bool {
        self.0.height() == 0
    }

    pub fn records(&self) -> No2Result<Vec<CountryGeometry>> {
        let df = &self.0;
        izip!(df.column(COL::NAME)?.str()?, df.column(COL::GEOMETRY)?.str()?)
            .map(|(name, wkt)| -> No2Result<CountryGeometry> {
                let geometry = Geometry::try_from_wkt_str(wkt.unwrap_or_default())
                    .map_err(|err| anyhow::anyhow!("Invalid geometry WKT: {err}"))?;
                Ok(CountryGeometry {
                    name: name.unwrap_or_default().to_string(),
                    geometry,
                })
            })
            .collect()
    }
}

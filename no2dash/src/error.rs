//! Error types.

use std::path::PathBuf;

/// Failures while reading either source file. All of them are fatal for the session.
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("Input file not found: {0}")]
    MissingFile(PathBuf),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed table in {path}: {source}")]
    MalformedTable {
        path: PathBuf,
        #[source]
        source: polars::error::PolarsError,
    },
    #[error("Malformed GeoJSON in {path}: {source}")]
    MalformedGeoJson {
        path: PathBuf,
        #[source]
        source: geojson::Error,
    },
    #[error("Expected a FeatureCollection in {0}")]
    NotAFeatureCollection(PathBuf),
    #[error("Missing column `{column}` in {path}")]
    MissingColumn { path: PathBuf, column: String },
    #[error("Column `{column}` in {path} has {count} missing or non-numeric value(s)")]
    MissingValues {
        path: PathBuf,
        column: String,
        count: usize,
    },
    #[error("Feature {index} in {path} has no string `NAME` property")]
    MissingName { path: PathBuf, index: usize },
    #[error("Feature `{name}` in {path} has no geometry")]
    MissingGeometry { path: PathBuf, name: String },
    #[error("Feature `{name}` in {path} has unsupported geometry: {reason}")]
    InvalidGeometry {
        path: PathBuf,
        name: String,
        reason: String,
    },
    #[error("Duplicate country name `{name}` in {path}")]
    DuplicateKey { path: PathBuf, name: String },
}

#[derive(thiserror::Error, Debug)]
pub enum No2Error {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("Invalid alias table: {0}")]
    InvalidAliases(String),
    #[error("Unknown country: {0}")]
    UnknownCountry(String),
    #[error("Wrapped serde JSON error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
    #[error("Wrapped polars error: {0}")]
    PolarsError(#[from] polars::error::PolarsError),
    #[error("Wrapped anyhow error: {0}")]
    AnyhowError(#[from] anyhow::Error),
}

pub type No2Result<T> = Result<T, No2Error>;

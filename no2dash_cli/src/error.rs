use no2dash::error::No2Error;
use polars::error::PolarsError;

#[derive(thiserror::Error, Debug)]
pub enum No2CliError {
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
    #[error("serde JSON error")]
    SerdeJSONError(#[from] serde_json::Error),
    #[error("polars error")]
    PolarsError(#[from] PolarsError),
    #[error(transparent)]
    No2Error(#[from] No2Error),
    #[error("std IO error")]
    IOError(#[from] std::io::Error),
    #[error("Invalid TOML in config file")]
    TomlError(#[from] toml::de::Error),
    #[error("Invalid country filter")]
    RegexError(#[from] regex::Error),
}

pub type No2CliResult<T> = Result<T, No2CliError>;

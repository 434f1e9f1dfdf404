mod cli;
mod display;
mod error;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use cli::{Cli, RunCommand};
use error::No2CliResult;
use log::debug;
use no2dash::config::Config;

const DEFAULT_LOGGING_LEVEL: &str = "warn";

fn main() -> No2CliResult<()> {
    // Set RUST_LOG to `DEFAULT_LOGGING_LEVEL` if not set
    let _ =
        std::env::var("RUST_LOG").map_err(|_| std::env::set_var("RUST_LOG", DEFAULT_LOGGING_LEVEL));
    pretty_env_logger::init_timed();
    let args = Cli::parse();
    debug!("args: {args:?}");
    let config = match &args.config {
        Some(path) => read_config_from_toml(path)?,
        None => match default_config_path() {
            Some(path) if path.exists() => read_config_from_toml(&path)?,
            _ => Config::default(),
        },
    };
    let config = args.apply_overrides(config);
    debug!("config: {config:?}");

    if let Some(command) = args.command {
        command.run(config)?;
    }
    Ok(())
}

// Linux: ~/.config/no2dash/config.toml
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("no2dash").join("config.toml"))
}

fn read_config_from_toml(path: &Path) -> No2CliResult<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Error reading config file {}", path.display()))?;
    Ok(toml::from_str(&contents)?)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use no2dash::config::DuplicatePolicy;
    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn config_file_is_read() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "measurements_path = \"Book.csv\"\nduplicate_policy = \"keep_first\""
        )
        .unwrap();
        let config = read_config_from_toml(file.path()).unwrap();
        assert_eq!(config.duplicate_policy, DuplicatePolicy::KeepFirst);
        assert_eq!(config.default_comparison, vec!["Nigeria", "South Africa"]);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        assert!(read_config_from_toml(Path::new("does/not/exist.toml")).is_err());
    }
}

//! `pvcat.toml`: catalog settings plus where to find the data lake and the
//! local data directory. Every field has a default, so the file is optional.
//!
//! ```toml
//! [paths]
//! data_dir = "data"
//!
//! [lake]
//! endpoint = "https://oedi-data-lake.s3.amazonaws.com"
//! max_retries = 3
//!
//! [reconcile]
//! known_orphans = [2045]
//!
//! [first_year]
//! horizon = 2024
//! scope = "irradiance"
//!
//! [[prize.systems]]
//! id = 7333
//! name = "7333_5_min"
//! ```

use std::path::{Path, PathBuf};

use pvcat_catalog::CatalogConfig;
use pvcat_lake::LakeConfig;
use serde::Deserialize;
use tracing::debug;

use crate::exit_codes::EXIT_CONFIG;
use crate::CliError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PvcatConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub lake: LakeConfig,
    #[serde(flatten)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            data_dir: default_data_dir(),
        }
    }
}

impl PvcatConfig {
    pub fn from_toml(s: &str) -> Result<Self, CliError> {
        let config: PvcatConfig = toml::from_str(s).map_err(|e| config_err(e.to_string()))?;
        config.catalog.validate().map_err(|e| config_err(e.to_string()))?;
        Ok(config)
    }

    /// Load `path`. A missing file is only an error when it was asked for
    /// explicitly.
    pub fn load(path: &Path, explicit: bool) -> Result<Self, CliError> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                debug!(file = %path.display(), "config loaded");
                Self::from_toml(&text).map_err(|e| CliError {
                    message: format!("{}: {}", path.display(), e.message),
                    ..e
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !explicit => {
                debug!(file = %path.display(), "no config file, using defaults");
                Ok(PvcatConfig::default())
            }
            Err(e) => Err(config_err(format!("cannot read {}: {e}", path.display()))),
        }
    }
}

fn config_err(message: String) -> CliError {
    CliError {
        code: EXIT_CONFIG,
        message,
        hint: Some("see the pvcat.toml example in `pvcat --help`".into()),
    }
}

//! CLI configuration
//!
//! Sources, lowest priority first: `cohort.toml` in the working directory (or
//! the file given with `--config`), then `COHORT__*` environment variables,
//! e.g. `COHORT__LOGGING__LEVEL=debug`.

use anyhow::Context;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "cohort.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    /// JSON file with concepts, encounter types, forms and locations.
    #[serde(default)]
    pub catalog: Option<PathBuf>,
    #[serde(default = "default_pretty")]
    pub pretty: bool,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

fn default_pretty() -> bool {
    true
}

fn default_level() -> String {
    "info".to_string()
}

impl CliConfig {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                // An explicit path must exist.
                builder = builder.add_source(File::from(p.to_path_buf()).required(true));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        builder = builder.add_source(
            Environment::with_prefix("COHORT")
                .try_parsing(true)
                .separator("__"),
        );

        let cfg = builder.build().context("Failed to build configuration")?;
        cfg.try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

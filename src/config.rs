use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use config::{Config, ConfigError, Environment, File, FileFormat};
use log::debug;
use serde::Deserialize;

use crate::model::module_path::Protocol;

pub const DEFAULT_JOBS: usize = 8;

/// User-level settings from `~/.cpkg/config.toml` and `CPKG_*` variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpkgConfig {
    pub dep_root: Option<String>,
    pub protocol: Protocol,
    pub jobs: usize,
}

impl Default for CpkgConfig {
    fn default() -> Self {
        CpkgConfig {
            dep_root: None,
            protocol: Protocol::default(),
            jobs: DEFAULT_JOBS,
        }
    }
}

impl CpkgConfig {
    pub fn load() -> anyhow::Result<Self> {
        let file = home::home_dir().map(|home| home.join(".cpkg").join("config.toml"));
        let raw_config = RawConfig::load(file.as_deref(), None)?;
        Ok(raw_config.into())
    }
}

impl From<RawConfig> for CpkgConfig {
    fn from(raw: RawConfig) -> Self {
        CpkgConfig {
            dep_root: raw.dep.root.filter(|root| !root.is_empty()),
            protocol: raw.git.protocol.unwrap_or_default(),
            jobs: raw.resolve.jobs.unwrap_or(DEFAULT_JOBS).max(1),
        }
    }
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct RawConfig {
    #[serde(default)]
    dep: DepConfig,
    #[serde(default)]
    git: GitConfig,
    #[serde(default)]
    resolve: ResolveConfig,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct DepConfig {
    root: Option<String>,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct GitConfig {
    protocol: Option<Protocol>,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct ResolveConfig {
    jobs: Option<usize>,
}

impl RawConfig {
    fn load(file: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(file) = file {
            debug!("Reading configuration from {}", file.display());
            builder = builder.add_source(
                File::from(PathBuf::from(file))
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }
        builder
            .add_source(
                Environment::with_prefix("CPKG")
                    .separator("_")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()
    }
}

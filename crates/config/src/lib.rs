//! Layered configuration.
//!
//! Values are merged from, lowest priority first:
//!
//! 1. built-in defaults, with paths under the platform's project directories,
//! 2. a configuration file (TOML, YAML or JSON, picked by extension),
//! 3. `ZIMVIEW_`-prefixed environment variables, nested keys separated by
//!    `__` (`ZIMVIEW_CACHE__TIER=memory`).

pub mod error;

use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};
use zimview_cache::{Capability, DetectorOptions};

use crate::error::{ErrorKind, Result};

pub const ENV_PREFIX: &str = "ZIMVIEW_";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "zimview", "zimview")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    /// JSON file holding the persisted preference flags. `None` keeps them in
    /// memory only.
    pub preferences: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// SQLite database for the structured tier. `None` disables the tier.
    pub database: Option<PathBuf>,
    /// Root of the simple key/value tier. `None` disables the tier.
    pub directory: Option<PathBuf>,
    /// Skip the ranking and only try this tier.
    pub tier: Option<Capability>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            preferences: project_dirs().map(|dirs| dirs.config_dir().join("preferences.json")),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        let dirs = project_dirs();
        Self {
            database: dirs.as_ref().map(|dirs| dirs.data_dir().join("cache.sqlite")),
            directory: dirs.as_ref().map(|dirs| dirs.cache_dir().join("assets")),
            tier: None,
        }
    }
}

impl CacheConfig {
    pub fn detector_options(&self) -> DetectorOptions {
        DetectorOptions {
            database: self.database.clone(),
            directory: self.directory.clone(),
            force: self.tier.unwrap_or_default(),
        }
    }
}

/// Configuration file used when none is given explicitly.
pub fn default_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}

fn file_provider(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
    Ok(match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file_exact(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
        Some("json") => figment.merge(Json::file_exact(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
    })
}

impl Config {
    /// Every layer except the environment, for `file` (or the default file,
    /// if it exists).
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let figment = Figment::from(Serialized::defaults(Self::default()));
        match file {
            Some(path) => {
                if !path.is_file() {
                    exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
                }
                file_provider(figment, path)
            },
            None => match default_file().filter(|path| path.is_file()) {
                Some(path) => file_provider(figment, &path),
                None => Ok(figment),
            },
        }
    }

    /// Load the configuration from all layers.
    #[instrument(level = "debug")]
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let figment = Self::figment(file)?.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::extract(&figment)
    }

    /// Extract and check a configuration from an assembled figment.
    pub fn extract(figment: &Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Invalid)?;
        if config.cache.tier == Some(Capability::Unknown) {
            exn::bail!(ErrorKind::Invalid);
        }
        debug!(?config, "configuration loaded");
        Ok(config)
    }
}

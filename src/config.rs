//! Application configuration.
//!
//! Settings live in an optional JSON file. A missing file yields defaults; the
//! catalog root can always be overridden with `INSIGHT_CATALOG_ROOT`.

use crate::error::{CatalogError, Result, ResultExt as _};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding [`AppConfig::catalog_root`].
pub const CATALOG_ROOT_ENV: &str = "INSIGHT_CATALOG_ROOT";

/// Default on-disk root of the catalog.
pub const DEFAULT_CATALOG_ROOT: &str = "domain/catalog";

/// The only schema version tag currently written.
pub const DEFAULT_KIND_VERSION: &str = "v1";

/// Maximum number of distinct values kept per filterable column.
pub const DEFAULT_PROFILE_VALUE_CAP: usize = 200;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AIConfig {
    pub enabled: bool,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for AIConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: "gpt-3.5-turbo".to_owned(),
            temperature: 0.0,
            max_tokens: 256,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding `kinds/` and `datasets/`
    pub catalog_root: PathBuf,
    /// Version tag of the kind directory layout
    pub kind_version: String,
    /// Cap on distinct values per profiled column
    pub profile_value_cap: usize,
    /// Completion collaborator settings
    pub ai: AIConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog_root: PathBuf::from(DEFAULT_CATALOG_ROOT),
            kind_version: DEFAULT_KIND_VERSION.to_owned(),
            profile_value_cap: DEFAULT_PROFILE_VALUE_CAP,
            ai: AIConfig::default(),
        }
    }
}

impl AppConfig {
    fn validate(&self) -> Result<()> {
        if self.profile_value_cap == 0 {
            return Err(CatalogError::Config(
                "profile_value_cap must be at least 1".to_owned(),
            ));
        }
        if self.kind_version.trim().is_empty() {
            return Err(CatalogError::Config("kind_version must not be blank".to_owned()));
        }
        Ok(())
    }
}

/// Load the configuration from `path` (if given and present) and apply the
/// environment override.
///
/// # Errors
///
/// Returns [`CatalogError::Config`] if the file exists but is not valid JSON
/// for [`AppConfig`], or if a loaded value is out of range.
pub fn load_app_config(path: Option<&Path>) -> Result<AppConfig> {
    let mut config = match path {
        Some(p) if p.exists() => {
            let content = std::fs::read_to_string(p)
                .with_context(|| format!("Failed to read config file {}", p.display()))?;
            serde_json::from_str::<AppConfig>(&content).map_err(|e| {
                CatalogError::Config(format!("Failed to parse {}: {e}", p.display()))
            })?
        }
        Some(p) => {
            tracing::warn!("Config file {} not found, using defaults", p.display());
            AppConfig::default()
        }
        None => AppConfig::default(),
    };

    if let Ok(root) = std::env::var(CATALOG_ROOT_ENV)
        && !root.trim().is_empty()
    {
        config.catalog_root = PathBuf::from(root);
    }

    config.validate()?;
    Ok(config)
}

/// Write the configuration as pretty JSON, creating parent directories.
///
/// # Errors
///
/// Returns [`CatalogError::Persist`] if the file cannot be written.
pub fn save_app_config(config: &AppConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content).context("Failed to write config file")?;
    Ok(())
}

//! On-disk layout of the catalog.
//!
//! ```text
//! <root>/kinds/<kind>/<version>/
//!     required_mapping.csv
//!     nice_mapping.csv          (only when a sample was supplied)
//!     mapping_effective.json
//!     autofill_report.md        (only when a sample was supplied)
//!     description.md            (optional, hand-written)
//! <root>/datasets/<kind>/
//!     latest.parquet
//!     profile.json
//! <root>/.staging/<uuid>/       (transient, see [`staging`])
//! ```
//!
//! Every artifact is replaced as a whole file; nothing is edited in place.

pub mod staging;

pub use staging::Staging;

use crate::config::AppConfig;
use crate::error::{CatalogError, Result};
use std::path::{Path, PathBuf};

pub const REQUIRED_MAPPING_FILE: &str = "required_mapping.csv";
pub const NICE_MAPPING_FILE: &str = "nice_mapping.csv";
pub const EFFECTIVE_MAPPING_FILE: &str = "mapping_effective.json";
pub const AUTOFILL_REPORT_FILE: &str = "autofill_report.md";
pub const DESCRIPTION_FILE: &str = "description.md";
pub const SNAPSHOT_FILE: &str = "latest.parquet";
pub const PROFILE_FILE: &str = "profile.json";

const KINDS_DIR: &str = "kinds";
const DATASETS_DIR: &str = "datasets";
const STAGING_DIR: &str = ".staging";

/// Resolves every path the catalog reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogLayout {
    root: PathBuf,
    version: String,
}

impl CatalogLayout {
    pub fn new(root: impl Into<PathBuf>, version: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            version: version.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.catalog_root.clone(), config.kind_version.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn kinds_dir(&self) -> PathBuf {
        self.root.join(KINDS_DIR)
    }

    /// `<root>/kinds/<kind>/<version>`
    pub fn kind_dir(&self, kind: &str) -> PathBuf {
        self.kinds_dir().join(kind).join(&self.version)
    }

    pub fn required_mapping_path(&self, kind: &str) -> PathBuf {
        self.kind_dir(kind).join(REQUIRED_MAPPING_FILE)
    }

    pub fn nice_mapping_path(&self, kind: &str) -> PathBuf {
        self.kind_dir(kind).join(NICE_MAPPING_FILE)
    }

    pub fn effective_mapping_path(&self, kind: &str) -> PathBuf {
        self.kind_dir(kind).join(EFFECTIVE_MAPPING_FILE)
    }

    pub fn autofill_report_path(&self, kind: &str) -> PathBuf {
        self.kind_dir(kind).join(AUTOFILL_REPORT_FILE)
    }

    pub fn description_path(&self, kind: &str) -> PathBuf {
        self.kind_dir(kind).join(DESCRIPTION_FILE)
    }

    /// `<root>/datasets/<kind>`
    pub fn dataset_dir(&self, kind: &str) -> PathBuf {
        self.root.join(DATASETS_DIR).join(kind)
    }

    /// Stable location of the single current snapshot of a kind.
    pub fn snapshot_path(&self, kind: &str) -> PathBuf {
        self.dataset_dir(kind).join(SNAPSHOT_FILE)
    }

    pub fn profile_path(&self, kind: &str) -> PathBuf {
        self.dataset_dir(kind).join(PROFILE_FILE)
    }

    pub(crate) fn staging_root(&self) -> PathBuf {
        self.root.join(STAGING_DIR)
    }
}

/// Check that a kind name can be used as a single directory component.
///
/// # Errors
///
/// Returns [`CatalogError::InvalidKindName`] for blank names, names with path
/// separators, and names starting with a dot.
pub fn validate_kind_name(name: &str) -> Result<()> {
    let invalid = name.trim().is_empty()
        || name != name.trim()
        || name.starts_with('.')
        || name.contains(['/', '\\', ':', '\0']);

    if invalid {
        return Err(CatalogError::InvalidKindName(name.to_owned()));
    }
    Ok(())
}

//! Error taxonomy for the catalog.
//!
//! Every stage of kind creation and onboarding returns a [`Result`] whose
//! error is a [`CatalogError`]. Errors never cross a component boundary as
//! panics; callers surface the [`Display`](std::fmt::Display) text verbatim.
//!
//! ```
//! use insight_agent::error::CatalogError;
//!
//! let err = CatalogError::SchemaMismatch {
//!     missing: vec!["b".to_owned()],
//!     extra: vec!["c".to_owned()],
//! };
//! assert_eq!(
//!     err.to_string(),
//!     "Instance columns do not match. Missing: [\"b\"]. Extra: [\"c\"]."
//! );
//! ```
//!
//! ## Context
//!
//! [`ResultExt`] adds `.context()` to any result whose error converts into a
//! [`CatalogError`]. Unlike a plain string wrapper it keeps the category, so a
//! polars failure while reading an upload is still a [`CatalogError::FileRead`]
//! after context has been attached.

use thiserror::Error;

/// Main error type for catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The uploaded file could not be parsed at all.
    #[error("Error reading file: {0}")]
    FileRead(String),

    /// A mapping upload lacks some of the required header columns.
    #[error("Missing required columns: {}", .missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    /// Mapping rows violate a record-level invariant (duplicate names, ...).
    #[error("Invalid mapping: {0}")]
    InvalidMapping(String),

    /// Kind names become directory names and must be safe for that.
    #[error("Invalid kind name '{0}': must be non-empty and must not contain path separators")]
    InvalidKindName(String),

    /// No effective mapping has been published for the kind.
    #[error("Effective mapping not found for kind '{0}'")]
    KindNotFound(String),

    /// No dataset snapshot has been published for the kind.
    #[error("No dataset snapshot found for kind '{0}'")]
    SnapshotNotFound(String),

    /// Instance columns differ from the effective mapping's original names.
    #[error("Instance columns do not match. Missing: {missing:?}. Extra: {extra:?}.")]
    SchemaMismatch {
        missing: Vec<String>,
        extra: Vec<String>,
    },

    /// Scanning or aggregating the freshly written snapshot failed.
    #[error("Error profiling instance data: {0}")]
    Profiling(String),

    /// Writing or publishing an artifact failed.
    #[error("Error saving {0}")]
    Persist(String),

    /// SQL execution against the snapshot failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// The language-model collaborator failed or returned nothing usable.
    #[error("Completion failed: {0}")]
    Completion(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Data processing error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

impl CatalogError {
    /// Same category, message prefixed with `msg`.
    fn with_prefix(self, msg: &str) -> Self {
        match self {
            Self::FileRead(m) => Self::FileRead(format!("{msg}: {m}")),
            Self::InvalidMapping(m) => Self::InvalidMapping(format!("{msg}: {m}")),
            Self::Profiling(m) => Self::Profiling(format!("{msg}: {m}")),
            Self::Persist(m) => Self::Persist(format!("{msg}: {m}")),
            Self::Query(m) => Self::Query(format!("{msg}: {m}")),
            Self::Completion(m) => Self::Completion(format!("{msg}: {m}")),
            Self::Config(m) => Self::Config(format!("{msg}: {m}")),
            Self::Io(e) => Self::Persist(format!("{msg}: {e}")),
            Self::Json(e) => Self::Persist(format!("{msg}: {e}")),
            Self::Polars(e) => Self::Persist(format!("{msg}: {e}")),
            other => other,
        }
    }

    /// Reinterpret an error raised while reading an upload as [`Self::FileRead`].
    pub fn into_file_read(self, msg: &str) -> Self {
        match self {
            Self::Io(e) => Self::FileRead(format!("{msg}: {e}")),
            Self::Polars(e) => Self::FileRead(format!("{msg}: {e}")),
            Self::FileRead(m) => Self::FileRead(format!("{msg}: {m}")),
            other => other,
        }
    }

    /// Reinterpret any failure inside the profiler as [`Self::Profiling`].
    pub fn into_profiling(self) -> Self {
        match self {
            Self::Profiling(_) => self,
            other => Self::Profiling(other.to_string()),
        }
    }
}

// Plain string errors for callers that only render messages.
impl From<CatalogError> for String {
    fn from(err: CatalogError) -> Self {
        err.to_string()
    }
}

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Extension trait to add context to results.
pub trait ResultExt<T> {
    /// Add context to an error.
    ///
    /// # Errors
    ///
    /// Returns the original error, re-categorised and prefixed with `msg`.
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Add context using a closure (lazy evaluation).
    ///
    /// # Errors
    ///
    /// Returns the original error, re-categorised and prefixed with `f()`.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<CatalogError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_prefix(&msg.into()))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_prefix(&f()))
    }
}

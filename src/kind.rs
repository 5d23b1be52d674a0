//! Kinds: named schema definitions and their mappings.
//!
//! Creating a kind is one operation covering registration of the required
//! mapping and, when a sample file accompanies it, reconciliation with the
//! format hints inferred from that sample. All artifacts of a creation are
//! staged and published together:
//!
//! - `required_mapping.csv`: the mapping upload, verbatim
//! - `nice_mapping.csv`: `original_name`, `format_hint` per sample column
//! - `autofill_report.md`: the same hints, for humans
//! - `mapping_effective.json`: the merged records every later stage reads
//!
//! The last one is written even without a sample so the kind can be
//! onboarded straight away. Re-creating a kind without a sample removes the
//! sample-derived files of the previous creation.
//!
//! ## Usage
//!
//! ```no_run
//! use insight_agent::catalog::CatalogLayout;
//! use insight_agent::kind;
//! use std::path::Path;
//!
//! # fn example() -> insight_agent::error::Result<()> {
//! let layout = CatalogLayout::new("domain/catalog", "v1");
//! let summary = kind::create_kind(
//!     &layout,
//!     "store_sales",
//!     Path::new("mapping.xlsx"),
//!     Some(Path::new("sample.csv")),
//! )?;
//! println!("{}", summary.message());
//!
//! let mapping = kind::load_effective_mapping(&layout, "store_sales")?;
//! assert!(!mapping.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod mapping;
pub mod reconcile;
pub mod registry;
pub mod report;

pub use mapping::{EffectiveMapping, FormatHint, MappingRecord};
pub use reconcile::{ColumnHint, infer_format_hints, reconcile};
pub use registry::{RequiredMapping, parse_required_mapping, register_mapping};
pub use report::render_autofill_report;

use crate::catalog::{self, CatalogLayout, Staging};
use crate::error::{CatalogError, Result, ResultExt as _};
use crate::io;
use std::fs;
use std::path::{Path, PathBuf};

/// Outcome of a successful [`create_kind`].
#[derive(Debug, Clone)]
pub struct KindSummary {
    pub kind: String,
    /// Records in the effective mapping
    pub columns: usize,
    /// Sample hints, empty when no sample was supplied
    pub hints: Vec<ColumnHint>,
    /// Every file published by the operation
    pub published: Vec<PathBuf>,
}

impl KindSummary {
    pub fn message(&self) -> String {
        if self.hints.is_empty() {
            format!("Success! Kind '{}' has been created.", self.kind)
        } else {
            format!(
                "Success! Kind '{}' has been created with {} inferred format hint(s).",
                self.kind,
                self.hints.len()
            )
        }
    }
}

/// Register a mapping and, if given, reconcile it with a sample.
///
/// Nothing is published unless every step succeeds, so a sample that cannot
/// be read leaves the kind exactly as it was.
///
/// # Errors
///
/// - [`CatalogError::InvalidKindName`] if `kind` is not directory-safe
/// - [`CatalogError::FileRead`] if the mapping or the sample cannot be parsed
/// - [`CatalogError::MissingColumns`] if the mapping lacks a required header
/// - [`CatalogError::InvalidMapping`] if names collide after reconciliation
/// - [`CatalogError::Persist`] if an artifact cannot be written or published
pub fn create_kind(
    layout: &CatalogLayout,
    kind: &str,
    mapping_path: &Path,
    sample_path: Option<&Path>,
) -> Result<KindSummary> {
    catalog::validate_kind_name(kind)?;
    tracing::info!("Creating kind '{kind}' from {}", mapping_path.display());

    let mut required = registry::parse_required_mapping(mapping_path)?;
    let mut staging = Staging::new(layout)?;
    registry::stage_required_mapping(&mut staging, layout, kind, &mut required)?;

    let hints = match sample_path {
        Some(sample_path) => {
            let sample = io::load_table_as_text(sample_path)?;
            let hints = infer_format_hints(&sample)?;
            tracing::info!(
                "Inferred format hints for {} sample column(s) of {}",
                hints.len(),
                sample_path.display()
            );

            let staged = staging.stage(layout.nice_mapping_path(kind))?;
            io::write_csv(&mut reconcile::hints_table(&hints)?, &staged)?;

            let staged = staging.stage(layout.autofill_report_path(kind))?;
            let report = render_autofill_report(kind, &hints, &required.records);
            fs::write(&staged, report).context("Failed to write autofill report")?;
            hints
        }
        None => {
            staging.retire(layout.nice_mapping_path(kind));
            staging.retire(layout.autofill_report_path(kind));
            Vec::new()
        }
    };

    let effective = reconcile(required.records, &hints)?;
    let staged = staging.stage(layout.effective_mapping_path(kind))?;
    fs::write(&staged, effective.to_json()?).context("Failed to write effective mapping")?;

    let published = staging.commit()?;
    tracing::info!(
        "Kind '{kind}' published with {} effective column(s)",
        effective.len()
    );

    Ok(KindSummary {
        kind: kind.to_owned(),
        columns: effective.len(),
        hints,
        published,
    })
}

/// Load the effective mapping of a kind.
///
/// # Errors
///
/// Returns [`CatalogError::KindNotFound`] if the kind has no effective mapping
/// and [`CatalogError::InvalidMapping`] if the file cannot be interpreted.
pub fn load_effective_mapping(layout: &CatalogLayout, kind: &str) -> Result<EffectiveMapping> {
    catalog::validate_kind_name(kind)?;
    let path = layout.effective_mapping_path(kind);
    if !path.exists() {
        return Err(CatalogError::KindNotFound(kind.to_owned()));
    }

    let json = fs::read_to_string(&path)
        .map_err(|e| CatalogError::InvalidMapping(format!("{}: {e}", path.display())))?;
    EffectiveMapping::from_json(&json)
}

/// Names of every kind with a published effective mapping, sorted.
///
/// # Errors
///
/// Returns an error if the kinds directory exists but cannot be listed.
pub fn list_kinds(layout: &CatalogLayout) -> Result<Vec<String>> {
    let kinds_dir = layout.kinds_dir();
    if !kinds_dir.exists() {
        return Ok(Vec::new());
    }

    let mut kinds = Vec::new();
    let entries = fs::read_dir(&kinds_dir)
        .with_context(|| format!("Failed to list {}", kinds_dir.display()))?;
    for entry in entries {
        let entry = entry?;
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if layout.effective_mapping_path(&name).exists() {
            kinds.push(name);
        }
    }

    kinds.sort();
    Ok(kinds)
}

/// The hand-written `description.md` of a kind, if there is one.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn load_description(layout: &CatalogLayout, kind: &str) -> Result<Option<String>> {
    let path = layout.description_path(kind);
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(&path)?;
    Ok(Some(text))
}

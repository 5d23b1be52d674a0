//! Required mapping registration.
//!
//! A required mapping is the author's declaration of a kind's columns. It is
//! checked for the [`mapping::REQUIRED_COLUMNS`] header and written back verbatim as
//! `required_mapping.csv`, all rows and columns included.

use super::mapping::{self, MappingRecord};
use crate::catalog::{self, CatalogLayout, Staging};
use crate::error::{CatalogError, Result};
use crate::io;
use polars::prelude::DataFrame;
use std::path::Path;

/// A parsed mapping upload: the verbatim table plus its normalised records.
#[derive(Debug, Clone)]
pub struct RequiredMapping {
    pub table: DataFrame,
    pub records: Vec<MappingRecord>,
}

/// Parse a mapping upload.
///
/// Every cell is read as text so the table can be written back unchanged.
///
/// # Errors
///
/// Returns [`CatalogError::FileRead`] if the file cannot be parsed,
/// [`CatalogError::MissingColumns`] if any of [`mapping::REQUIRED_COLUMNS`] is absent,
/// and [`CatalogError::InvalidMapping`] if two rows share an `original_name`
/// or a storage name.
pub fn parse_required_mapping(path: &Path) -> Result<RequiredMapping> {
    let table = io::load_table_as_text(path)?;

    let missing = mapping::missing_required_columns(&io::column_names(&table));
    if !missing.is_empty() {
        tracing::warn!(
            "Mapping {} lacks required columns: {}",
            path.display(),
            missing.join(", ")
        );
        return Err(CatalogError::MissingColumns { missing });
    }

    let records = mapping::records_from_table(&table)?;
    // Uniqueness is a property of the mapping set, checked before anything is staged.
    mapping::EffectiveMapping::new(records.clone())?;

    tracing::debug!("Parsed {} mapping record(s) from {}", records.len(), path.display());
    Ok(RequiredMapping { table, records })
}

/// Write the verbatim mapping table into `staging`, bound for the kind's
/// `required_mapping.csv`.
///
/// # Errors
///
/// Returns [`CatalogError::Persist`] if the staged file cannot be written.
pub(crate) fn stage_required_mapping(
    staging: &mut Staging,
    layout: &CatalogLayout,
    kind: &str,
    required: &mut RequiredMapping,
) -> Result<()> {
    let staged = staging.stage(layout.required_mapping_path(kind))?;
    io::write_csv(&mut required.table, &staged)
}

/// Validate a mapping upload and publish it as the kind's required mapping.
///
/// Overwrites any previous `required_mapping.csv` of the kind and creates the
/// kind's directory tree if needed. Returns a success message naming the kind.
///
/// # Errors
///
/// Returns [`CatalogError::InvalidKindName`] for unsafe kind names, plus
/// every error of [`parse_required_mapping`] and [`CatalogError::Persist`]
/// when publishing fails.
pub fn register_mapping(layout: &CatalogLayout, kind: &str, path: &Path) -> Result<String> {
    catalog::validate_kind_name(kind)?;
    let mut required = parse_required_mapping(path)?;

    let mut staging = Staging::new(layout)?;
    stage_required_mapping(&mut staging, layout, kind, &mut required)?;
    staging.commit()?;

    tracing::info!(
        "Registered required mapping for kind '{kind}' ({} columns)",
        required.records.len()
    );
    Ok(format!("Success! Mapping for Kind '{kind}' has been saved."))
}

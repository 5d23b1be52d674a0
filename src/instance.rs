//! Instance onboarding.
//!
//! An instance upload is accepted only if its column set equals the original
//! names of the kind's effective mapping, in any order. Accepted data is
//! renamed to storage names, written as the kind's single snapshot, and
//! profiled. Snapshot and profile are staged and published together, so a
//! failed onboarding leaves the previous pair in place.

pub mod profiler;

pub use profiler::{ColumnProfile, FilterProfile};

use crate::catalog::{self, CatalogLayout, Staging};
use crate::error::{CatalogError, Result, ResultExt as _};
use crate::io;
use crate::kind::{self, EffectiveMapping};
use polars::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Outcome of a successful [`onboard`].
#[derive(Debug, Clone)]
pub struct OnboardSummary {
    pub kind: String,
    pub rows: usize,
    /// Snapshot column names, in upload order
    pub columns: Vec<String>,
    /// Profiled columns, in display order
    pub filters: Vec<String>,
    pub published: Vec<PathBuf>,
}

impl OnboardSummary {
    pub fn message(&self) -> String {
        format!(
            "Success! Instance for '{}' has been saved and profiled.",
            self.kind
        )
    }
}

/// Compare upload columns with the mapping's original names.
///
/// # Errors
///
/// Returns [`CatalogError::SchemaMismatch`] unless the two sets are equal.
/// `missing` follows mapping order, `extra` follows upload order.
pub fn check_columns(mapping: &EffectiveMapping, actual: &[String]) -> Result<()> {
    let expected = mapping.expected_columns();
    let expected_set: HashSet<&str> = expected.iter().copied().collect();
    let actual_set: HashSet<&str> = actual.iter().map(String::as_str).collect();

    if expected_set == actual_set {
        return Ok(());
    }

    let missing = expected
        .iter()
        .filter(|name| !actual_set.contains(**name))
        .map(|name| (*name).to_owned())
        .collect();
    let extra = actual
        .iter()
        .filter(|name| !expected_set.contains(name.as_str()))
        .cloned()
        .collect();
    Err(CatalogError::SchemaMismatch { missing, extra })
}

/// Rename every column to its storage name, keeping upload column order.
///
/// # Errors
///
/// Returns an error if a column has no mapping record or the rename fails.
pub fn rename_to_storage(df: DataFrame, mapping: &EffectiveMapping) -> Result<DataFrame> {
    let exprs = df
        .get_column_names()
        .into_iter()
        .map(|name| {
            let rec = mapping.get(name.as_str()).ok_or_else(|| {
                CatalogError::InvalidMapping(format!("no mapping record for column '{name}'"))
            })?;
            Ok(col(name.as_str()).alias(rec.storage_name()))
        })
        .collect::<Result<Vec<Expr>>>()?;

    Ok(df.lazy().select(exprs).collect()?)
}

/// Validate an instance upload against a kind and publish it.
///
/// The new snapshot replaces the previous one unconditionally.
///
/// # Errors
///
/// - [`CatalogError::KindNotFound`] if the kind has no effective mapping
/// - [`CatalogError::FileRead`] if the upload cannot be parsed
/// - [`CatalogError::SchemaMismatch`] if the column sets differ
/// - [`CatalogError::Profiling`] if the written snapshot cannot be profiled
/// - [`CatalogError::Persist`] if an artifact cannot be written or published
pub fn onboard(
    layout: &CatalogLayout,
    kind: &str,
    instance_path: &Path,
    value_cap: usize,
) -> Result<OnboardSummary> {
    catalog::validate_kind_name(kind)?;
    let mapping = kind::load_effective_mapping(layout, kind)?;

    let df = io::load_table(instance_path)?;
    let actual = io::column_names(&df);
    if let Err(e) = check_columns(&mapping, &actual) {
        tracing::warn!("Rejected instance {} for kind '{kind}': {e}", instance_path.display());
        return Err(e);
    }

    let mut snapshot = rename_to_storage(df, &mapping)?;
    let rows = snapshot.height();

    let mut staging = Staging::new(layout)?;
    let staged_snapshot = staging.stage(layout.snapshot_path(kind))?;
    io::write_snapshot(&mut snapshot, &staged_snapshot)?;

    let profile = profiler::profile_snapshot(&staged_snapshot, &mapping, value_cap)?;
    let staged_profile = staging.stage(layout.profile_path(kind))?;
    fs::write(&staged_profile, profile.to_json()?).context("Failed to write profile")?;

    let published = staging.commit()?;
    tracing::info!(
        "Onboarded {rows} row(s) for kind '{kind}', {} filter(s) profiled",
        profile.len()
    );

    Ok(OnboardSummary {
        kind: kind.to_owned(),
        rows,
        columns: io::column_names(&snapshot),
        filters: profile.columns().into_iter().map(str::to_owned).collect(),
        published,
    })
}

/// The published filter profile of a kind.
///
/// # Errors
///
/// Returns [`CatalogError::SnapshotNotFound`] if the kind was never onboarded.
pub fn load_profile(layout: &CatalogLayout, kind: &str) -> Result<FilterProfile> {
    catalog::validate_kind_name(kind)?;
    let path = layout.profile_path(kind);
    if !path.exists() {
        return Err(CatalogError::SnapshotNotFound(kind.to_owned()));
    }
    let json = fs::read_to_string(&path)?;
    FilterProfile::from_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::{FormatHint, MappingRecord};

    fn mapping() -> Result<EffectiveMapping> {
        let mut a = MappingRecord::sample_only("a", FormatHint::String);
        a.canonical_name = "store_id".to_owned();
        let mut b = MappingRecord::sample_only("b", FormatHint::String);
        b.canonical_name = "label".to_owned();
        EffectiveMapping::new(vec![a, b])
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn test_check_columns_ignores_order() -> Result<()> {
        check_columns(&mapping()?, &names(&["b", "a"]))
    }

    #[test]
    fn test_check_columns_reports_both_sides() -> Result<()> {
        match check_columns(&mapping()?, &names(&["a", "c"])) {
            Err(CatalogError::SchemaMismatch { missing, extra }) => {
                assert_eq!(missing, vec!["b"]);
                assert_eq!(extra, vec!["c"]);
            }
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_rename_keeps_upload_order() -> Result<()> {
        let df = df!("b" => &["x"], "a" => &["s1"])?;
        let renamed = rename_to_storage(df, &mapping()?)?;
        assert_eq!(io::column_names(&renamed), vec!["label", "store_id"]);
        Ok(())
    }

    #[test]
    fn test_rename_handles_swaps() -> Result<()> {
        let mut a = MappingRecord::sample_only("a", FormatHint::String);
        a.canonical_name = "b".to_owned();
        let mut b = MappingRecord::sample_only("b", FormatHint::String);
        b.canonical_name = "a".to_owned();
        let mapping = EffectiveMapping::new(vec![a, b])?;

        let df = df!("a" => &[1i64], "b" => &[2i64])?;
        let renamed = rename_to_storage(df, &mapping)?;
        assert_eq!(io::column_names(&renamed), vec!["b", "a"]);
        assert_eq!(renamed.column("b")?.i64()?.get(0), Some(1));
        Ok(())
    }
}

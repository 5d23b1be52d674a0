//! SQL execution over a kind's snapshot.
//!
//! The snapshot is registered as the table `data`, and additionally as
//! `dataset` for queries written against the older name.

use crate::catalog::{self, CatalogLayout};
use crate::error::{CatalogError, Result};
use crate::io;
use polars::prelude::*;
use polars::sql::SQLContext;

pub const TABLE_NAME: &str = "data";
const LEGACY_TABLE_NAME: &str = "dataset";

/// Run `sql` verbatim against the current snapshot of `kind`.
///
/// # Errors
///
/// Returns [`CatalogError::SnapshotNotFound`] if the kind has no snapshot and
/// [`CatalogError::Query`] if the statement fails to plan or execute.
pub fn execute_query(layout: &CatalogLayout, kind: &str, sql: &str) -> Result<DataFrame> {
    catalog::validate_kind_name(kind)?;
    let path = layout.snapshot_path(kind);
    if !path.exists() {
        return Err(CatalogError::SnapshotNotFound(kind.to_owned()));
    }

    let snapshot = io::scan_snapshot(&path)?;
    let mut ctx = SQLContext::new();
    ctx.register(TABLE_NAME, snapshot.clone());
    ctx.register(LEGACY_TABLE_NAME, snapshot);

    tracing::debug!("Executing against '{kind}': {sql}");
    let df = ctx
        .execute(sql)
        .and_then(LazyFrame::collect)
        .map_err(|e| CatalogError::Query(e.to_string()))?;

    tracing::info!("Query on '{kind}' returned {} row(s)", df.height());
    Ok(df)
}

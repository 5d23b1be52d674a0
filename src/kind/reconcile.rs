//! Format-hint inference and mapping reconciliation.
//!
//! A sample file yields one [`FormatHint`] per column. The hint is the first
//! of `numeric`, `datetime`, `string` that *every* non-null value of the
//! column can be coerced to, so a single odd value is enough to fall through
//! to the next, coarser shape. A column without any value is `numeric`.
//!
//! [`reconcile`] then outer-joins the required records with the hints on
//! `original_name`.

use super::mapping::{EffectiveMapping, FormatHint, MappingRecord};
use crate::error::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

const DATE_FORMATS: [&str; 8] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

const DATETIME_FORMATS: [&str; 9] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Inferred shape of one sample column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnHint {
    pub original_name: String,
    pub format_hint: FormatHint,
}

pub fn is_numeric_value(value: &str) -> bool {
    value.trim().parse::<f64>().is_ok()
}

/// Parse a date or date-time in any of the accepted layouts.
pub fn parse_datetime_value(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.naive_utc());
    }
    if let Some(ts) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
    {
        return Some(ts);
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Hint for a list of cell values; blank cells count as null.
pub fn infer_values_hint<'a>(values: impl IntoIterator<Item = Option<&'a str>>) -> FormatHint {
    let present: Vec<&str> = values
        .into_iter()
        .flatten()
        .filter(|v| !v.trim().is_empty())
        .collect();

    if present.iter().all(|v| is_numeric_value(v)) {
        FormatHint::Numeric
    } else if present.iter().all(|v| parse_datetime_value(v).is_some()) {
        FormatHint::Datetime
    } else {
        FormatHint::String
    }
}

/// Hint for one column of a frame.
///
/// # Errors
///
/// Returns an error if the column cannot be viewed as text.
pub fn infer_column_hint(column: &Column) -> Result<FormatHint> {
    let dtype = column.dtype();
    if dtype.is_primitive_numeric() {
        return Ok(FormatHint::Numeric);
    }
    if dtype.is_temporal() {
        return Ok(FormatHint::Datetime);
    }

    let text = column.cast(&DataType::String)?;
    Ok(infer_values_hint(text.str()?))
}

/// One hint per sample column, in sample column order.
///
/// # Errors
///
/// Returns an error if a column cannot be viewed as text.
pub fn infer_format_hints(sample: &DataFrame) -> Result<Vec<ColumnHint>> {
    sample
        .get_columns()
        .iter()
        .map(|column| {
            let format_hint = infer_column_hint(column)?;
            tracing::debug!("Column '{}' inferred as {format_hint}", column.name());
            Ok(ColumnHint {
                original_name: column.name().to_string(),
                format_hint,
            })
        })
        .collect()
}

/// Hints as a two-column table (`original_name`, `format_hint`).
///
/// # Errors
///
/// Returns an error if the frame cannot be built.
pub fn hints_table(hints: &[ColumnHint]) -> Result<DataFrame> {
    let names: Vec<&str> = hints.iter().map(|h| h.original_name.as_str()).collect();
    let formats: Vec<&str> = hints.iter().map(|h| h.format_hint.as_str()).collect();
    Ok(df!(
        "original_name" => names,
        "format_hint" => formats
    )?)
}

/// Full outer join of required records and sample hints on `original_name`.
///
/// Required records keep their declaration order and take the sample's hint
/// when the sample has the column. Columns only the sample has follow, in
/// sample order, with every required field empty.
///
/// # Errors
///
/// Returns [`crate::error::CatalogError::InvalidMapping`] if the merged
/// records break name uniqueness.
pub fn reconcile(required: Vec<MappingRecord>, hints: &[ColumnHint]) -> Result<EffectiveMapping> {
    let hint_by_name: HashMap<&str, FormatHint> = hints
        .iter()
        .map(|h| (h.original_name.as_str(), h.format_hint))
        .collect();

    let required_names: HashSet<String> =
        required.iter().map(|r| r.original_name.clone()).collect();

    let mut records = required;
    for rec in &mut records {
        if let Some(hint) = hint_by_name.get(rec.original_name.as_str()) {
            rec.format_hint = Some(*hint);
        }
    }

    let sample_only: Vec<MappingRecord> = hints
        .iter()
        .filter(|h| !required_names.contains(&h.original_name))
        .map(|h| MappingRecord::sample_only(h.original_name.clone(), h.format_hint))
        .collect();

    if !sample_only.is_empty() {
        tracing::info!(
            "{} sample column(s) not in the required mapping: {}",
            sample_only.len(),
            sample_only
                .iter()
                .map(|r| r.original_name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    records.extend(sample_only);

    EffectiveMapping::new(records)
}

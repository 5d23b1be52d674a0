//! Spreadsheet uploads.
//!
//! Reads the first worksheet; the first row is the header. With `typed`
//! set, a column whose non-empty cells are all integers (or all numbers, or
//! all booleans) keeps that type; every other column is text.

use crate::error::{CatalogError, Result};
use calamine::{Data, Reader as _, open_workbook_auto};
use polars::prelude::*;
use std::path::Path;

static EMPTY: Data = Data::Empty;

/// Read the first worksheet of `path` into a frame.
///
/// # Errors
///
/// Returns [`CatalogError::FileRead`] if the workbook cannot be opened, has no
/// worksheet, or has no header row.
pub fn read_sheet(path: &Path, typed: bool) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| CatalogError::FileRead(format!("Failed to open workbook: {e}")))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| CatalogError::FileRead("Workbook has no worksheets".to_owned()))?
        .map_err(|e| CatalogError::FileRead(format!("Failed to read worksheet: {e}")))?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| CatalogError::FileRead("Worksheet has no header row".to_owned()))?;

    let names: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(i, cell)| match cell_text(cell) {
            Some(name) => name,
            None => {
                tracing::warn!("Header cell {i} is blank, naming it column_{i}");
                format!("column_{i}")
            }
        })
        .collect();

    // Rows of a range share the header's width.
    let mut cells: Vec<Vec<&Data>> = vec![Vec::new(); names.len()];
    for row in rows {
        for (i, column) in cells.iter_mut().enumerate() {
            column.push(row.get(i).unwrap_or(&EMPTY));
        }
    }

    let columns = names
        .iter()
        .zip(&cells)
        .map(|(name, values)| build_column(name, values, typed))
        .collect::<Vec<_>>();

    Ok(DataFrame::new(columns)?)
}

fn build_column(name: &str, values: &[&Data], typed: bool) -> Column {
    let present = || values.iter().filter(|v| !is_blank(v));

    if typed && present().count() > 0 {
        if present().all(|v| matches!(v, Data::Int(_)) || is_integral_float(v)) {
            let ints: Vec<Option<i64>> = values.iter().map(|v| cell_i64(v)).collect();
            return Column::from(Series::new(name.into(), ints));
        }
        if present().all(|v| matches!(v, Data::Int(_) | Data::Float(_))) {
            let floats: Vec<Option<f64>> = values.iter().map(|v| cell_f64(v)).collect();
            return Column::from(Series::new(name.into(), floats));
        }
        if present().all(|v| matches!(v, Data::Bool(_))) {
            let bools: Vec<Option<bool>> = values
                .iter()
                .map(|v| match v {
                    Data::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect();
            return Column::from(Series::new(name.into(), bools));
        }
    }

    let text: Vec<Option<String>> = values.iter().map(|v| cell_text(v)).collect();
    Column::from(Series::new(name.into(), text))
}

fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn is_integral_float(cell: &Data) -> bool {
    matches!(cell, Data::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15)
}

fn cell_i64(cell: &Data) -> Option<i64> {
    match cell {
        Data::Int(i) => Some(*i),
        Data::Float(f) => Some(*f as i64),
        _ => None,
    }
}

fn cell_f64(cell: &Data) -> Option<f64> {
    match cell {
        Data::Int(i) => Some(*i as f64),
        Data::Float(f) => Some(*f),
        _ => None,
    }
}

/// Text form of a cell; `None` for empty cells.
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) if s.trim().is_empty() => None,
        Data::String(s) => Some(s.clone()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) if ts.time() == chrono::NaiveTime::MIN => {
                Some(ts.date().format("%Y-%m-%d").to_string())
            }
            Some(ts) => Some(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => Some(dt.as_f64().to_string()),
        },
        other => Some(other.to_string()),
    }
}

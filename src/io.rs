//! Table input/output.
//!
//! Uploads are detected by file extension: spreadsheet extensions go through
//! [`spreadsheet`], everything else (including no extension) is parsed as
//! delimited text. Snapshots are written as zstd-compressed Parquet.

pub mod spreadsheet;

use crate::error::{CatalogError, Result, ResultExt as _};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

const SPREADSHEET_EXTENSIONS: [&str; 4] = ["xlsx", "xls", "xlsm", "ods"];

/// How an uploaded table file is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Delimited,
    Spreadsheet,
}

impl TableFormat {
    pub fn detect(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();

        if SPREADSHEET_EXTENSIONS.contains(&ext.as_str()) {
            Self::Spreadsheet
        } else {
            Self::Delimited
        }
    }
}

/// Load an upload with inferred column types (instance data).
///
/// Delimited files are inferred over every row, so a type change late in
/// the file widens the column instead of failing the parse.
///
/// # Errors
///
/// Returns [`CatalogError::FileRead`] if the file cannot be parsed.
pub fn load_table(path: &Path) -> Result<DataFrame> {
    let df = match TableFormat::detect(path) {
        TableFormat::Delimited => read_delimited(path, None),
        TableFormat::Spreadsheet => spreadsheet::read_sheet(path, true),
    };
    df.map_err(|e| e.into_file_read(&path.display().to_string()))
}

/// Load an upload with every column read as text (mapping tables, samples).
///
/// Nothing is coerced, so cells survive verbatim and format inference sees
/// exactly what the author typed.
///
/// # Errors
///
/// Returns [`CatalogError::FileRead`] if the file cannot be parsed.
pub fn load_table_as_text(path: &Path) -> Result<DataFrame> {
    let df = match TableFormat::detect(path) {
        // An inference window of zero rows reads every column as String.
        TableFormat::Delimited => read_delimited(path, Some(0)),
        TableFormat::Spreadsheet => spreadsheet::read_sheet(path, false),
    };
    df.map_err(|e| e.into_file_read(&path.display().to_string()))
}

fn read_delimited(path: &Path, infer_schema_length: Option<usize>) -> Result<DataFrame> {
    let df = LazyCsvReader::new(path)
        .with_infer_schema_length(infer_schema_length)
        .with_has_header(true)
        .finish()?
        .collect()?;
    Ok(df)
}

/// Write a table as CSV with a header row.
///
/// # Errors
///
/// Returns [`CatalogError::Persist`] if the file cannot be written.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    CsvWriter::new(file)
        .include_header(true)
        .finish(df)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Write a snapshot as zstd-compressed Parquet.
///
/// # Errors
///
/// Returns [`CatalogError::Persist`] if the file cannot be written.
pub fn write_snapshot(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    ParquetWriter::new(file)
        .with_compression(ParquetCompression::Zstd(None))
        .finish(df)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Lazily scan a snapshot.
///
/// # Errors
///
/// Returns an error if the file is missing or is not valid Parquet.
pub fn scan_snapshot(path: &Path) -> Result<LazyFrame> {
    if !path.exists() {
        return Err(CatalogError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("snapshot {} does not exist", path.display()),
        )));
    }
    let lf = LazyFrame::scan_parquet(path, ScanArgsParquet::default())?;
    Ok(lf)
}

/// Column names of a frame, in order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.as_str().to_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_detection() {
        assert_eq!(TableFormat::detect(Path::new("m.xlsx")), TableFormat::Spreadsheet);
        assert_eq!(TableFormat::detect(Path::new("m.XLS")), TableFormat::Spreadsheet);
        assert_eq!(TableFormat::detect(Path::new("m.csv")), TableFormat::Delimited);
        assert_eq!(TableFormat::detect(Path::new("m.txt")), TableFormat::Delimited);
        assert_eq!(TableFormat::detect(Path::new("mapping")), TableFormat::Delimited);
    }

    #[test]
    fn test_text_load_keeps_cells_verbatim() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("sample.csv");
        std::fs::write(&path, "id,amount\n007,1.50\n008,2\n")?;

        let df = load_table_as_text(&path)?;
        assert_eq!(df.column("id")?.dtype(), &DataType::String);
        assert_eq!(df.column("id")?.str()?.get(0), Some("007"));
        assert_eq!(df.column("amount")?.str()?.get(0), Some("1.50"));
        Ok(())
    }

    #[test]
    fn test_typed_load_infers_numbers() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("instance.csv");
        std::fs::write(&path, "a,b\n1,x\n2,y\n")?;

        let df = load_table(&path)?;
        assert!(df.column("a")?.dtype().is_integer());
        assert_eq!(df.column("b")?.dtype(), &DataType::String);
        Ok(())
    }

    #[test]
    fn test_late_type_change_widens_column() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("instance.csv");
        let mut rows = String::from("code\n");
        for i in 0..10_050 {
            rows.push_str(&format!("{i}\n"));
        }
        rows.push_str("A17\n");
        std::fs::write(&path, rows)?;

        let df = load_table(&path)?;
        assert_eq!(df.height(), 10_051);
        assert_eq!(df.column("code")?.dtype(), &DataType::String);
        assert_eq!(df.column("code")?.str()?.get(10_050), Some("A17"));
        Ok(())
    }

    #[test]
    fn test_unreadable_file_is_file_read_error() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("empty.csv");
        std::fs::write(&path, "")?;

        assert!(matches!(load_table(&path), Err(CatalogError::FileRead(_))));

        let missing = temp.path().join("nope.csv");
        assert!(matches!(load_table_as_text(&missing), Err(CatalogError::FileRead(_))));
        Ok(())
    }

    #[test]
    fn test_snapshot_roundtrip_keeps_names() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("latest.parquet");
        let mut df = df!(
            "store_id" => &["s1", "s2"],
            "units" => &[3i64, 4]
        )?;

        write_snapshot(&mut df, &path)?;
        let loaded = scan_snapshot(&path)?.collect()?;
        assert_eq!(column_names(&loaded), vec!["store_id", "units"]);
        assert_eq!(loaded.height(), 2);
        Ok(())
    }
}

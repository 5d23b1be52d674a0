//! Mapping records and the effective mapping of a kind.
//!
//! Mapping tables arrive as loosely typed rows (CSV or spreadsheet, every
//! cell text). They are turned into [`MappingRecord`]s exactly once, here,
//! and nothing downstream looks at raw rows again.
//!
//! ## Filterability
//!
//! Two table layouts exist in the wild: a boolean `is_filterable` column, or
//! a numeric `filter_display_order` column whose presence alone marks a
//! column as filterable. Both normalise to the same pair of fields:
//!
//! | table has `is_filterable` | `is_filterable`            | `filter_display_order`          |
//! |---------------------------|----------------------------|---------------------------------|
//! | yes                       | truthiness of the cell     | parsed order, only if filterable |
//! | no                        | order cell parses as int   | parsed order                    |

use crate::error::{CatalogError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Header columns every required mapping must have.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "original_name",
    "canonical_name",
    "type",
    "description",
    "data_type",
];

pub const IS_FILTERABLE_COLUMN: &str = "is_filterable";
pub const FILTER_DISPLAY_ORDER_COLUMN: &str = "filter_display_order";

/// Primitive shape inferred from sample values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatHint {
    Numeric,
    Datetime,
    String,
}

impl FormatHint {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Datetime => "datetime",
            Self::String => "string",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "numeric" => Some(Self::Numeric),
            "datetime" => Some(Self::Datetime),
            "string" => Some(Self::String),
            _ => None,
        }
    }
}

impl fmt::Display for FormatHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One column of a kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingRecord {
    /// Column name in uploaded instance files
    pub original_name: String,
    /// Column name in the snapshot; blank means "same as original"
    pub canonical_name: String,
    /// Free-form semantic tag
    #[serde(rename = "type")]
    pub semantic_type: String,
    pub description: String,
    /// Declared primitive type
    pub data_type: String,
    pub is_filterable: bool,
    /// Position among the filters; `None` sorts after every ordered filter
    pub filter_display_order: Option<i64>,
    /// Inferred from the sample, if one was supplied and had this column
    pub format_hint: Option<FormatHint>,
}

impl MappingRecord {
    /// The name this column carries inside the snapshot.
    pub fn storage_name(&self) -> &str {
        if self.canonical_name.trim().is_empty() {
            &self.original_name
        } else {
            &self.canonical_name
        }
    }

    /// A column that only the sample knows about.
    pub fn sample_only(original_name: impl Into<String>, hint: FormatHint) -> Self {
        Self {
            original_name: original_name.into(),
            canonical_name: String::new(),
            semantic_type: String::new(),
            description: String::new(),
            data_type: String::new(),
            is_filterable: false,
            filter_display_order: None,
            format_hint: Some(hint),
        }
    }
}

/// Loosely typed cells of one mapping row, before normalisation.
#[derive(Debug, Default)]
struct RawFields {
    original_name: Option<String>,
    canonical_name: Option<String>,
    semantic_type: Option<String>,
    description: Option<String>,
    data_type: Option<String>,
    /// `None` when the source has no `is_filterable` field at all
    is_filterable: Option<String>,
    filter_display_order: Option<String>,
    format_hint: Option<String>,
}

impl RawFields {
    /// Normalise into a record. Rows without an `original_name` yield `None`.
    fn into_record(self, row: usize) -> Option<MappingRecord> {
        let original_name = match self.original_name {
            Some(name) if !name.trim().is_empty() => name,
            _ => {
                tracing::warn!("Skipping mapping row {row}: blank original_name");
                return None;
            }
        };

        let order_cell = self.filter_display_order.filter(|s| !s.trim().is_empty());
        let order = order_cell.as_deref().and_then(parse_order);
        if let (Some(cell), None) = (&order_cell, order) {
            tracing::warn!(
                "Ignoring unparsable filter_display_order '{cell}' for column '{original_name}'"
            );
        }

        let (is_filterable, filter_display_order) = match self.is_filterable {
            Some(flag) if is_truthy(&flag) => (true, order),
            Some(_) => (false, None),
            None => (order.is_some(), order),
        };

        let format_hint = self.format_hint.as_deref().and_then(|hint| {
            let parsed = FormatHint::parse(hint);
            if parsed.is_none() && !hint.trim().is_empty() {
                tracing::warn!("Ignoring unknown format_hint '{hint}' for '{original_name}'");
            }
            parsed
        });

        Some(MappingRecord {
            original_name,
            canonical_name: self.canonical_name.unwrap_or_default(),
            semantic_type: self.semantic_type.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            data_type: self.data_type.unwrap_or_default(),
            is_filterable,
            filter_display_order,
            format_hint,
        })
    }
}

fn parse_order(cell: &str) -> Option<i64> {
    let cell = cell.trim();
    if let Ok(order) = cell.parse::<i64>() {
        return Some(order);
    }
    // Spreadsheets hand back whole numbers as "3.0".
    match cell.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 => Some(f as i64),
        _ => None,
    }
}

fn is_truthy(cell: &str) -> bool {
    matches!(
        cell.trim().to_lowercase().as_str(),
        "true" | "t" | "yes" | "y" | "1" | "1.0" | "x"
    )
}

/// Header columns from [`REQUIRED_COLUMNS`] absent in `header`, in declaration order.
pub fn missing_required_columns<S: AsRef<str>>(header: &[S]) -> Vec<String> {
    let present: HashSet<&str> = header.iter().map(AsRef::as_ref).collect();
    REQUIRED_COLUMNS
        .iter()
        .filter(|required| !present.contains(**required))
        .map(|s| (*s).to_owned())
        .collect()
}

/// Convert a text-loaded mapping table into records.
///
/// # Errors
///
/// Returns [`CatalogError::MissingColumns`] if a required header is absent.
pub fn records_from_table(df: &DataFrame) -> Result<Vec<MappingRecord>> {
    let header = crate::io::column_names(df);
    let missing = missing_required_columns(&header);
    if !missing.is_empty() {
        return Err(CatalogError::MissingColumns { missing });
    }

    let text = |name: &str| -> Result<Option<Vec<Option<String>>>> {
        if !header.iter().any(|h| h == name) {
            return Ok(None);
        }
        let column = df.column(name)?.cast(&DataType::String)?;
        let values = column
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_owned))
            .collect();
        Ok(Some(values))
    };

    let original = text("original_name")?.unwrap_or_default();
    let canonical = text("canonical_name")?.unwrap_or_default();
    let semantic_type = text("type")?.unwrap_or_default();
    let description = text("description")?.unwrap_or_default();
    let data_type = text("data_type")?.unwrap_or_default();
    let is_filterable = text(IS_FILTERABLE_COLUMN)?;
    let order = text(FILTER_DISPLAY_ORDER_COLUMN)?;
    let format_hint = text("format_hint")?;

    fn cell(values: &[Option<String>], i: usize) -> Option<String> {
        values.get(i).cloned().flatten()
    }

    let records = (0..df.height())
        .filter_map(|i| {
            RawFields {
                original_name: cell(&original, i),
                canonical_name: cell(&canonical, i),
                semantic_type: cell(&semantic_type, i),
                description: cell(&description, i),
                data_type: cell(&data_type, i),
                // A present column with an empty cell means "not filterable".
                is_filterable: is_filterable
                    .as_ref()
                    .map(|values| cell(values, i).unwrap_or_default()),
                filter_display_order: order.as_ref().and_then(|values| cell(values, i)),
                format_hint: format_hint.as_ref().and_then(|values| cell(values, i)),
            }
            .into_record(i)
        })
        .collect();

    Ok(records)
}

/// A record as found in `mapping_effective.json`, which may have been
/// written by hand or by an older layout.
#[derive(Debug, Deserialize)]
struct JsonRecord {
    #[serde(default)]
    original_name: Option<serde_json::Value>,
    #[serde(default)]
    canonical_name: Option<serde_json::Value>,
    #[serde(default, rename = "type")]
    semantic_type: Option<serde_json::Value>,
    #[serde(default)]
    description: Option<serde_json::Value>,
    #[serde(default)]
    data_type: Option<serde_json::Value>,
    #[serde(default)]
    is_filterable: Option<serde_json::Value>,
    #[serde(default)]
    filter_display_order: Option<serde_json::Value>,
    #[serde(default)]
    format_hint: Option<serde_json::Value>,
}

fn json_text(value: Option<serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

impl From<JsonRecord> for RawFields {
    fn from(rec: JsonRecord) -> Self {
        let has_flag = rec.is_filterable.is_some();
        Self {
            original_name: json_text(rec.original_name),
            canonical_name: json_text(rec.canonical_name),
            semantic_type: json_text(rec.semantic_type),
            description: json_text(rec.description),
            data_type: json_text(rec.data_type),
            is_filterable: has_flag.then(|| json_text(rec.is_filterable).unwrap_or_default()),
            filter_display_order: json_text(rec.filter_display_order),
            format_hint: json_text(rec.format_hint),
        }
    }
}

/// Merged view of the required mapping and the sample hints.
///
/// Original names are unique, and so are storage names, which keeps the
/// original-to-canonical rename one-to-one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectiveMapping {
    #[serde(deserialize_with = "deserialize_records")]
    records: Vec<MappingRecord>,
}

fn deserialize_records<'de, D>(deserializer: D) -> std::result::Result<Vec<MappingRecord>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Vec::<JsonRecord>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .enumerate()
        .filter_map(|(i, rec)| RawFields::from(rec).into_record(i))
        .collect())
}

impl EffectiveMapping {
    /// Build from records, checking name uniqueness.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidMapping`] on a duplicate original name or
    /// when two records would share a storage name.
    pub fn new(records: Vec<MappingRecord>) -> Result<Self> {
        let mapping = Self { records };
        mapping.validate()?;
        Ok(mapping)
    }

    fn validate(&self) -> Result<()> {
        let mut originals = HashSet::new();
        let mut storage = HashSet::new();
        for rec in &self.records {
            if !originals.insert(rec.original_name.as_str()) {
                return Err(CatalogError::InvalidMapping(format!(
                    "duplicate original_name '{}'",
                    rec.original_name
                )));
            }
            if !storage.insert(rec.storage_name()) {
                return Err(CatalogError::InvalidMapping(format!(
                    "more than one column maps to '{}'",
                    rec.storage_name()
                )));
            }
        }
        Ok(())
    }

    /// Parse `mapping_effective.json` contents.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidMapping`] if the JSON is not a list of
    /// records or violates name uniqueness.
    pub fn from_json(json: &str) -> Result<Self> {
        let mapping: Self = serde_json::from_str(json)
            .map_err(|e| CatalogError::InvalidMapping(format!("unreadable effective mapping: {e}")))?;
        mapping.validate()?;
        Ok(mapping)
    }

    /// Pretty JSON list of flat records.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.records)?)
    }

    pub fn records(&self) -> &[MappingRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, original_name: &str) -> Option<&MappingRecord> {
        self.records.iter().find(|r| r.original_name == original_name)
    }

    /// Original names in declaration order: the columns an instance must have.
    pub fn expected_columns(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.original_name.as_str()).collect()
    }

    /// `(original, canonical)` pairs where the two differ.
    pub fn renames(&self) -> Vec<(&str, &str)> {
        self.records
            .iter()
            .filter(|r| r.original_name != r.storage_name())
            .map(|r| (r.original_name.as_str(), r.storage_name()))
            .collect()
    }

    /// Filterable records in declaration order.
    pub fn filterable(&self) -> impl Iterator<Item = &MappingRecord> {
        self.records.iter().filter(|r| r.is_filterable)
    }
}

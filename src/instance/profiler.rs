//! Filter profile of a dataset snapshot.
//!
//! For every filterable column of the effective mapping that the snapshot
//! actually has, the profile keeps the distinct non-null values in first-seen
//! order, capped at a fixed count. Blank strings and float NaN are dropped
//! along with nulls. Columns are keyed by their storage name, which is the name they
//! carry in the snapshot.
//!
//! Entries are ordered by `filter_display_order` ascending; entries without
//! an order follow in mapping declaration order. The JSON object written to
//! `profile.json` keeps that order.

use crate::error::{CatalogError, Result};
use crate::io;
use crate::kind::EffectiveMapping;
use polars::prelude::*;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;

/// Candidate values of one filterable column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub values: Vec<serde_json::Value>,
    pub filter_display_order: Option<i64>,
}

/// Ordered column name to [`ColumnProfile`] index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterProfile {
    entries: Vec<(String, ColumnProfile)>,
}

impl FilterProfile {
    /// Build from entries, applying the display ordering.
    pub fn new(mut entries: Vec<(String, ColumnProfile)>) -> Self {
        // Stable: ties and unordered entries keep their incoming order.
        entries.sort_by_key(|(_, p)| (p.filter_display_order.is_none(), p.filter_display_order));
        Self { entries }
    }

    pub fn get(&self, column: &str) -> Option<&ColumnProfile> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, p)| p)
    }

    /// Column names in display order.
    pub fn columns(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// # Errors
    ///
    /// Returns [`CatalogError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// # Errors
    ///
    /// Returns [`CatalogError::Json`] if `json` is not a profile object.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Serialize for FilterProfile {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, profile) in &self.entries {
            map.serialize_entry(name, profile)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FilterProfile {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ProfileVisitor;

        impl<'de> Visitor<'de> for ProfileVisitor {
            type Value = FilterProfile;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of column name to filter profile")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, profile)) = access.next_entry::<String, ColumnProfile>()? {
                    entries.push((name, profile));
                }
                // Files are written in display order; keep whatever order they have.
                Ok(FilterProfile { entries })
            }
        }

        deserializer.deserialize_map(ProfileVisitor)
    }
}

/// Profile a lazily scanned snapshot.
///
/// Filterable records whose storage name is not a snapshot column are
/// skipped.
///
/// # Errors
///
/// Returns an error if the snapshot cannot be scanned or a column cannot be
/// aggregated.
pub fn profile(
    mut snapshot: LazyFrame,
    mapping: &EffectiveMapping,
    cap: usize,
) -> Result<FilterProfile> {
    let schema = snapshot.collect_schema()?;

    let wanted: Vec<_> = mapping
        .filterable()
        .filter(|rec| {
            let present = schema.contains(rec.storage_name());
            if !present {
                tracing::debug!(
                    "Filterable column '{}' not in snapshot, skipping",
                    rec.storage_name()
                );
            }
            present
        })
        .collect();

    if wanted.is_empty() {
        return Ok(FilterProfile::default());
    }

    let exprs: Vec<Expr> = wanted.iter().map(|rec| col(rec.storage_name())).collect();
    let df = snapshot.select(exprs).collect()?;

    let mut entries = Vec::with_capacity(wanted.len());
    for rec in wanted {
        let name = rec.storage_name();
        let values = distinct_values(df.column(name)?, cap)?;
        tracing::debug!("Profiled '{name}': {} distinct value(s)", values.len());
        entries.push((
            name.to_owned(),
            ColumnProfile {
                values,
                filter_display_order: rec.filter_display_order,
            },
        ));
    }

    Ok(FilterProfile::new(entries))
}

/// Profile the snapshot file at `path`.
///
/// # Errors
///
/// Returns [`CatalogError::Profiling`] for any failure.
pub fn profile_snapshot(path: &Path, mapping: &EffectiveMapping, cap: usize) -> Result<FilterProfile> {
    io::scan_snapshot(path)
        .and_then(|lf| profile(lf, mapping, cap))
        .map_err(CatalogError::into_profiling)
}

/// First `cap` distinct non-null, non-blank, non-NaN values, in first-seen
/// order.
fn distinct_values(column: &Column, cap: usize) -> Result<Vec<serde_json::Value>> {
    let mut series = column.as_materialized_series().drop_nulls();

    if series.dtype() == &DataType::String {
        let non_blank: BooleanChunked = series
            .str()?
            .into_iter()
            .map(|v| v.is_some_and(|s| !s.trim().is_empty()))
            .collect();
        series = series.filter(&non_blank)?;
    } else if series.dtype().is_float() {
        let not_nan: BooleanChunked = series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.is_some_and(|f| !f.is_nan()))
            .collect();
        series = series.filter(&not_nan)?;
    }

    let distinct = series.unique_stable()?.head(Some(cap));
    let distinct = json_ready(&distinct)?;
    Ok(distinct.iter().map(to_json_value).collect())
}

/// Cast to a dtype whose values map directly onto JSON scalars.
fn json_ready(series: &Series) -> Result<Series> {
    let dtype = series.dtype();
    if dtype.is_bool() || dtype == &DataType::String {
        return Ok(series.clone());
    }

    let target = if dtype.is_unsigned_integer() {
        DataType::UInt64
    } else if dtype.is_integer() {
        DataType::Int64
    } else if dtype.is_float() {
        DataType::Float64
    } else {
        // Dates and times become ISO strings.
        DataType::String
    };
    Ok(series.cast(&target)?)
}

fn to_json_value(value: AnyValue<'_>) -> serde_json::Value {
    use serde_json::Value;

    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(b),
        AnyValue::Int64(i) => Value::from(i),
        AnyValue::UInt64(u) => Value::from(u),
        AnyValue::Float64(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        AnyValue::String(s) => Value::String(s.to_owned()),
        AnyValue::StringOwned(s) => Value::String(s.to_string()),
        other => Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::{FormatHint, MappingRecord};

    fn filterable(name: &str, canonical: &str, order: Option<i64>) -> MappingRecord {
        let mut rec = MappingRecord::sample_only(name, FormatHint::String);
        rec.canonical_name = canonical.to_owned();
        rec.is_filterable = true;
        rec.filter_display_order = order;
        rec
    }

    #[test]
    fn test_values_are_distinct_and_first_seen() -> Result<()> {
        let df = df!(
            "store_id" => &[Some("store2"), Some("store1"), None, Some("store2"), Some(" ")],
            "label" => &["x", "y", "z", "w", "v"]
        )?;
        let mapping = EffectiveMapping::new(vec![
            filterable("a", "store_id", Some(1)),
            MappingRecord::sample_only("label", FormatHint::String),
        ])?;

        let profile = profile(df.lazy(), &mapping, 200)?;

        assert_eq!(profile.columns(), vec!["store_id"]);
        let store = profile.get("store_id").expect("store_id profiled");
        assert_eq!(store.values, vec!["store2", "store1"]);
        assert_eq!(store.filter_display_order, Some(1));
        Ok(())
    }

    #[test]
    fn test_nan_is_dropped() -> Result<()> {
        let df = df!("price" => &[1.5, f64::NAN, 2.5, f64::NAN])?;
        let mapping = EffectiveMapping::new(vec![filterable("price", "", Some(1))])?;

        let profile = profile(df.lazy(), &mapping, 200)?;
        let values = &profile.get("price").expect("price profiled").values;

        assert_eq!(values, &vec![serde_json::json!(1.5), serde_json::json!(2.5)]);
        assert!(!profile.to_json()?.contains("null"));
        Ok(())
    }

    #[test]
    fn test_cap_truncates_positionally() -> Result<()> {
        let ids: Vec<i64> = (0..250).collect();
        let df = df!("id" => ids)?;
        let mapping = EffectiveMapping::new(vec![filterable("id", "", None)])?;

        let profile = profile(df.lazy(), &mapping, 200)?;
        let values = &profile.get("id").expect("id profiled").values;

        assert_eq!(values.len(), 200);
        assert_eq!(values[0], serde_json::json!(0));
        assert_eq!(values[199], serde_json::json!(199));
        Ok(())
    }

    #[test]
    fn test_ordering_and_missing_columns() -> Result<()> {
        let df = df!(
            "c" => &["1"],
            "b" => &["1"],
            "a" => &["1"],
            "d" => &["1"]
        )?;
        let mapping = EffectiveMapping::new(vec![
            filterable("d", "", None),
            filterable("a", "", Some(3)),
            filterable("ghost", "", Some(0)),
            filterable("b", "", None),
            filterable("c", "", Some(1)),
        ])?;

        let profile = profile(df.lazy(), &mapping, 200)?;
        assert_eq!(profile.columns(), vec!["c", "a", "d", "b"]);
        Ok(())
    }

    #[test]
    fn test_dates_become_strings() -> Result<()> {
        let dates = [
            chrono::NaiveDate::from_ymd_opt(2024, 1, 31).expect("valid date"),
            chrono::NaiveDate::from_ymd_opt(2024, 2, 29).expect("valid date"),
        ];
        let df = df!("day" => dates)?;
        let mapping = EffectiveMapping::new(vec![filterable("day", "", Some(1))])?;

        let profile = profile(df.lazy(), &mapping, 200)?;
        assert_eq!(
            profile.get("day").expect("day profiled").values,
            vec!["2024-01-31", "2024-02-29"]
        );
        Ok(())
    }

    #[test]
    fn test_json_keeps_display_order() -> Result<()> {
        let profile = FilterProfile::new(vec![
            (
                "zeta".to_owned(),
                ColumnProfile {
                    values: vec![serde_json::json!("z")],
                    filter_display_order: Some(1),
                },
            ),
            (
                "alpha".to_owned(),
                ColumnProfile {
                    values: vec![serde_json::json!(2.5), serde_json::json!(true)],
                    filter_display_order: None,
                },
            ),
        ]);

        let json = profile.to_json()?;
        assert!(json.find("zeta") < json.find("alpha"));
        assert!(json.contains("\"filter_display_order\": null"));
        assert_eq!(FilterProfile::from_json(&json)?, profile);
        Ok(())
    }

    #[test]
    fn test_unreadable_snapshot_is_profiling_error() {
        let mapping = EffectiveMapping::default();
        let err = profile_snapshot(Path::new("/no/such/latest.parquet"), &mapping, 200).unwrap_err();
        assert!(matches!(err, CatalogError::Profiling(_)));
    }
}

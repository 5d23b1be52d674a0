//! End-to-end: kind creation, onboarding, profiling and querying inside a
//! temporary catalog root.

use insight_agent::catalog::CatalogLayout;
use insight_agent::config::DEFAULT_PROFILE_VALUE_CAP;
use insight_agent::error::{CatalogError, Result};
use insight_agent::query::{self, CompletionClient, Question};
use insight_agent::{instance, io, kind};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const MAPPING_CSV: &str = "\
original_name,canonical_name,type,description,data_type,filter_display_order
a,store_id,market_or_store,Store,text,1
b,label,string,Label,text,
";

struct Catalog {
    temp: TempDir,
    layout: CatalogLayout,
}

impl Catalog {
    fn new() -> anyhow::Result<Self> {
        let temp = TempDir::new()?;
        let layout = CatalogLayout::new(temp.path().join("catalog"), "v1");
        Ok(Self { temp, layout })
    }

    fn file(&self, name: &str, contents: &str) -> anyhow::Result<PathBuf> {
        let path = self.temp.path().join(name);
        fs::write(&path, contents)?;
        Ok(path)
    }

    fn create(&self, kind_name: &str, mapping: &str) -> anyhow::Result<()> {
        let mapping = self.file("mapping.csv", mapping)?;
        kind::create_kind(&self.layout, kind_name, &mapping, None)?;
        Ok(())
    }

    fn onboard(&self, kind_name: &str, path: &Path) -> Result<instance::OnboardSummary> {
        instance::onboard(&self.layout, kind_name, path, DEFAULT_PROFILE_VALUE_CAP)
    }
}

#[test]
fn test_onboard_renames_and_profiles() -> anyhow::Result<()> {
    let catalog = Catalog::new()?;
    catalog.create("test_kind", MAPPING_CSV)?;
    let upload = catalog.file("instance.csv", "a,b\nstore1,x\nstore2,y\nstore1,z\n")?;

    let summary = catalog.onboard("test_kind", &upload)?;
    assert!(summary.message().contains("test_kind"));
    assert_eq!(summary.rows, 3);
    assert_eq!(summary.columns, vec!["store_id", "label"]);

    let snapshot = io::scan_snapshot(&catalog.layout.snapshot_path("test_kind"))?.collect()?;
    assert_eq!(io::column_names(&snapshot), vec!["store_id", "label"]);

    let profile = instance::load_profile(&catalog.layout, "test_kind")?;
    assert_eq!(profile.columns(), vec!["store_id"]);
    let store = profile.get("store_id").expect("store_id profiled");
    assert_eq!(store.values, vec!["store1", "store2"]);
    assert_eq!(store.filter_display_order, Some(1));
    Ok(())
}

#[test]
fn test_schema_mismatch_keeps_previous_snapshot() -> anyhow::Result<()> {
    let catalog = Catalog::new()?;
    catalog.create("test_kind", MAPPING_CSV)?;

    let good = catalog.file("good.csv", "b,a\nx,store1\n")?;
    catalog.onboard("test_kind", &good)?;
    let before = fs::read(catalog.layout.snapshot_path("test_kind"))?;

    let bad = catalog.file("bad.csv", "a,c\nstore1,1\n")?;
    match catalog.onboard("test_kind", &bad) {
        Err(CatalogError::SchemaMismatch { missing, extra }) => {
            assert_eq!(missing, vec!["b"]);
            assert_eq!(extra, vec!["c"]);
        }
        other => panic!("expected SchemaMismatch, got {other:?}"),
    }
    assert_eq!(fs::read(catalog.layout.snapshot_path("test_kind"))?, before);
    Ok(())
}

#[test]
fn test_unknown_kind_and_unreadable_upload() -> anyhow::Result<()> {
    let catalog = Catalog::new()?;
    let upload = catalog.file("instance.csv", "a,b\n1,2\n")?;
    assert!(matches!(
        catalog.onboard("missing_kind", &upload),
        Err(CatalogError::KindNotFound(_))
    ));

    catalog.create("test_kind", MAPPING_CSV)?;
    let broken = catalog.temp.path().join("does_not_exist.xlsx");
    assert!(matches!(
        catalog.onboard("test_kind", &broken),
        Err(CatalogError::FileRead(_))
    ));
    Ok(())
}

#[test]
fn test_profile_cap_and_ordering() -> anyhow::Result<()> {
    let catalog = Catalog::new()?;
    catalog.create(
        "wide",
        "original_name,canonical_name,type,description,data_type,is_filterable,filter_display_order\n\
         region,,geo,,text,yes,\n\
         id,,id,,int,yes,2\n\
         note,,text,,text,no,1\n\
         store,,store,,text,yes,1\n",
    )?;

    let mut rows = String::from("region,id,note,store\n");
    for i in 0..250 {
        rows.push_str(&format!("r{},{i},n,s{}\n", i % 3, i % 2));
    }
    let upload = catalog.file("wide.csv", &rows)?;
    catalog.onboard("wide", &upload)?;

    let profile = instance::load_profile(&catalog.layout, "wide")?;
    assert_eq!(profile.columns(), vec!["store", "id", "region"]);

    let ids = &profile.get("id").expect("id profiled").values;
    assert_eq!(ids.len(), 200);
    assert_eq!(ids[0], serde_json::json!(0));
    assert_eq!(profile.get("region").expect("region profiled").values.len(), 3);
    assert!(profile.get("note").is_none());
    Ok(())
}

#[test]
fn test_onboarding_is_idempotent() -> anyhow::Result<()> {
    let catalog = Catalog::new()?;
    catalog.create("test_kind", MAPPING_CSV)?;
    let upload = catalog.file("instance.csv", "a,b\nstore1,x\nstore2,y\n")?;

    catalog.onboard("test_kind", &upload)?;
    let snapshot = fs::read(catalog.layout.snapshot_path("test_kind"))?;
    let profile = fs::read(catalog.layout.profile_path("test_kind"))?;

    catalog.onboard("test_kind", &upload)?;
    assert_eq!(fs::read(catalog.layout.snapshot_path("test_kind"))?, snapshot);
    assert_eq!(fs::read(catalog.layout.profile_path("test_kind"))?, profile);
    Ok(())
}

#[test]
fn test_sample_only_columns_are_onboardable() -> anyhow::Result<()> {
    let catalog = Catalog::new()?;
    let mapping = catalog.file("mapping.csv", MAPPING_CSV)?;
    let sample = catalog.file("sample.csv", "a,b,units\nstore1,x,3\n")?;
    kind::create_kind(&catalog.layout, "sales", &mapping, Some(&sample))?;

    let upload = catalog.file("instance.csv", "units,a,b\n3,store1,x\n4,store2,y\n")?;
    let summary = catalog.onboard("sales", &upload)?;
    assert_eq!(summary.columns, vec!["units", "store_id", "label"]);
    Ok(())
}

#[test]
fn test_query_snapshot_as_data() -> anyhow::Result<()> {
    let catalog = Catalog::new()?;
    catalog.create("test_kind", MAPPING_CSV)?;
    let upload = catalog.file("instance.csv", "a,b\nstore1,x\nstore2,y\nstore1,z\n")?;
    catalog.onboard("test_kind", &upload)?;

    let df = query::execute_query(
        &catalog.layout,
        "test_kind",
        "SELECT store_id, COUNT(*) AS n FROM data GROUP BY store_id ORDER BY store_id",
    )?;
    assert_eq!(df.height(), 2);
    assert_eq!(df.column("store_id")?.str()?.get(0), Some("store1"));
    Ok(())
}

/// Write `rows` to the first sheet; cells that parse as numbers are stored
/// as numbers, empty cells are left out.
fn write_workbook(path: &Path, rows: &[&[&str]]) -> anyhow::Result<()> {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let (r, c) = (u32::try_from(r)?, u16::try_from(c)?);
            if cell.is_empty() {
                continue;
            }
            match cell.parse::<f64>() {
                Ok(n) => sheet.write_number(r, c, n)?,
                Err(_) => sheet.write_string(r, c, *cell)?,
            };
        }
    }
    workbook.save(path)?;
    Ok(())
}

#[test]
fn test_spreadsheet_kind_and_instance() -> anyhow::Result<()> {
    let catalog = Catalog::new()?;
    let mapping = catalog.temp.path().join("mapping.xlsx");
    write_workbook(
        &mapping,
        &[
            &[
                "original_name",
                "canonical_name",
                "type",
                "description",
                "data_type",
                "filter_display_order",
            ],
            &["a", "store_id", "market_or_store", "Store", "text", "1"],
            &["b", "label", "string", "Label", "text", ""],
        ],
    )?;
    kind::create_kind(&catalog.layout, "sheet_kind", &mapping, None)?;

    let upload = catalog.temp.path().join("instance.xlsx");
    write_workbook(&upload, &[&["b", "a"], &["x", "store1"], &["y", "store2"], &["z", "store1"]])?;
    let summary = catalog.onboard("sheet_kind", &upload)?;
    assert_eq!(summary.rows, 3);
    assert_eq!(summary.columns, vec!["label", "store_id"]);

    let profile = instance::load_profile(&catalog.layout, "sheet_kind")?;
    let store = profile.get("store_id").expect("store_id profiled");
    assert_eq!(store.values, vec!["store1", "store2"]);
    assert_eq!(store.filter_display_order, Some(1));
    Ok(())
}

struct CannedClient(&'static str);

impl CompletionClient for CannedClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        assert!(prompt.contains("- store_id (source column: a): Store"));
        Ok(self.0.to_owned())
    }
}

#[tokio::test]
async fn test_ask_returns_sql_with_result() -> anyhow::Result<()> {
    let catalog = Catalog::new()?;
    catalog.create("test_kind", MAPPING_CSV)?;
    let upload = catalog.file("instance.csv", "a,b\nstore1,x\nstore2,y\n")?;
    catalog.onboard("test_kind", &upload)?;

    let question = Question {
        text: "How many rows?".to_owned(),
        filters: vec![("store_id".to_owned(), vec!["store1".to_owned()])],
    };
    let client = CannedClient(r#"Here: {"sql": "SELECT COUNT(*) AS n FROM data"}"#);
    let answer = query::ask(&catalog.layout, &client, "test_kind", &question).await?;

    assert_eq!(answer.sql, "SELECT COUNT(*) AS n FROM data");
    assert_eq!(answer.result.height(), 1);

    let silent = CannedClient("I cannot help with that.");
    assert!(matches!(
        query::ask(&catalog.layout, &silent, "test_kind", &question).await,
        Err(CatalogError::Completion(_))
    ));
    Ok(())
}

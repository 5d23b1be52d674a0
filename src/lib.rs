//! # Insight Agent - Kind Catalog for Tabular Data
//!
//! Insight Agent keeps a catalog of *kinds*: named schemas describing one
//! category of tabular data. For each kind it stores a column mapping, the
//! single current snapshot of its data, and a filter profile used to build
//! natural-language questions that are answered with SQL.
//!
//! ## Quick Start
//!
//! ```no_run
//! use insight_agent::catalog::CatalogLayout;
//! use insight_agent::{instance, kind, query};
//! use std::path::Path;
//!
//! # fn example() -> insight_agent::error::Result<()> {
//! let layout = CatalogLayout::new("domain/catalog", "v1");
//!
//! // Register the mapping, reconciled with a sample file
//! kind::create_kind(&layout, "sales", Path::new("mapping.csv"), Some(Path::new("sample.csv")))?;
//!
//! // Onboard data; the filter profile is written alongside the snapshot
//! let summary = instance::onboard(&layout, "sales", Path::new("week_12.csv"), 200)?;
//! println!("{}", summary.message());
//!
//! // Query the snapshot as the table `data`
//! let df = query::execute_query(&layout, "sales", "SELECT COUNT(*) FROM data")?;
//! println!("{df}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Modules
//!
//! - [`kind`]: Mapping registration, format-hint inference, reconciliation
//! - [`instance`]: Onboarding of instance data and filter profiling
//! - [`query`]: Prompt construction, completion, and SQL execution
//! - [`catalog`]: On-disk layout and staged publishing
//! - [`io`]: Table loading (delimited text, spreadsheets) and snapshot I/O
//! - [`config`]: Application configuration
//! - [`error`]: Error types and handling utilities
//! - [`logging`]: Console and rolling-file log setup
//!
//! ## Pipeline
//!
//! ```text
//! mapping upload ──► required_mapping.csv ─┐
//!                                           ├─► mapping_effective.json
//! sample upload  ──► format hints ─────────┘            │
//!                                                        ▼
//! instance upload ──► column check ──► rename ──► latest.parquet ──► profile.json
//! ```
//!
//! Each stage hands off to the next through its on-disk artifact only.

#![warn(clippy::all, rust_2018_idioms)]

pub mod catalog;
pub mod config;
pub mod error;
pub mod instance;
pub mod io;
pub mod kind;
pub mod logging;
pub mod query;

//! # Insight Agent Entry Point
//!
//! ```text
//! main()
//!   │
//!   ├─> Parse CLI arguments (clap)
//!   ├─> Install logging (console + rolling files)
//!   ├─> Load configuration
//!   └─> Run the command on a Tokio runtime
//! ```
//!
//! ```bash
//! insight-agent create-kind --kind sales --mapping mapping.xlsx --sample sample.csv
//! insight-agent onboard --kind sales --file week_12.csv
//! insight-agent ask --kind sales --question "Units per store?" --filter store_id=store1
//! ```

#![warn(clippy::all, rust_2018_idioms)]
#![expect(clippy::print_stderr)] // Reported before any subscriber exists

mod cli;

use anyhow::Result;
use clap::Parser as _;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    if let Err(e) = insight_agent::logging::init() {
        eprintln!("Warning: logging disabled: {e:#}");
    }

    tokio::runtime::Runtime::new()?.block_on(cli::run(cli))
}

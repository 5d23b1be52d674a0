#![expect(clippy::print_stdout)] // Command results go to stdout

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use insight_agent::catalog::CatalogLayout;
use insight_agent::config::{self, AppConfig};
use insight_agent::query::{self, FilterSelection, OpenAiClient, Question};
use insight_agent::{instance, kind, logging};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "insight-agent",
    about = "Kind catalog: mappings, onboarding, filter profiles and questions over tabular data"
)]
pub struct Cli {
    /// Path to a JSON configuration file
    #[arg(long, global = true, env = "INSIGHT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Catalog root directory, overriding the configuration
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a kind from a required mapping and an optional sample file
    CreateKind {
        /// Kind name (used as a directory name)
        #[arg(short, long)]
        kind: String,

        /// Required mapping (CSV or spreadsheet)
        #[arg(short, long)]
        mapping: PathBuf,

        /// Sample data used to infer format hints
        #[arg(short, long)]
        sample: Option<PathBuf>,
    },
    /// Validate and store a required mapping only
    RegisterMapping {
        #[arg(short, long)]
        kind: String,

        #[arg(short, long)]
        mapping: PathBuf,
    },
    /// Validate an instance file and publish it as the kind's snapshot
    Onboard {
        #[arg(short, long)]
        kind: String,

        /// Instance data (CSV or spreadsheet)
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Print the filter profile of a kind
    Profile {
        #[arg(short, long)]
        kind: String,
    },
    /// List registered kinds
    Kinds,
    /// Run SQL against a kind's snapshot (table `data`)
    Query {
        #[arg(short, long)]
        kind: String,

        #[arg(long)]
        sql: String,
    },
    /// Ask a question in plain language
    Ask {
        #[arg(short, long)]
        kind: String,

        #[arg(short, long)]
        question: String,

        /// Filter selection as `column=value`; repeat for more values
        #[arg(long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, String)>,

        /// Print the prompt instead of calling the model
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the effective configuration and today's log file
    Config {
        /// Write the effective configuration to the `--config` path
        #[arg(long)]
        save: bool,
    },
}

pub async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    let mut app_config = config::load_app_config(config_path.as_deref())?;
    if let Some(root) = cli.root {
        app_config.catalog_root = root;
    }
    let layout = CatalogLayout::from_config(&app_config);
    tracing::debug!("Catalog root: {}", layout.root().display());

    match cli.command {
        Commands::CreateKind {
            kind,
            mapping,
            sample,
        } => {
            let summary = kind::create_kind(&layout, &kind, &mapping, sample.as_deref())?;
            println!("{}", summary.message());
            for hint in &summary.hints {
                println!("  {}: {}", hint.original_name, hint.format_hint);
            }
        }
        Commands::RegisterMapping { kind, mapping } => {
            println!("{}", kind::register_mapping(&layout, &kind, &mapping)?);
        }
        Commands::Onboard { kind, file } => {
            let summary = instance::onboard(&layout, &kind, &file, app_config.profile_value_cap)?;
            println!("{}", summary.message());
            println!("  rows: {}", summary.rows);
            println!("  filters: {}", summary.filters.join(", "));
        }
        Commands::Profile { kind } => {
            let profile = instance::load_profile(&layout, &kind)?;
            println!("{}", profile.to_json()?);
        }
        Commands::Kinds => {
            for name in kind::list_kinds(&layout)? {
                println!("{name}");
            }
        }
        Commands::Query { kind, sql } => {
            let df = query::execute_query(&layout, &kind, &sql)?;
            println!("{df}");
        }
        Commands::Ask {
            kind,
            question,
            filters,
            dry_run,
        } => handle_ask(&layout, &app_config, &kind, question, filters, dry_run).await?,
        Commands::Config { save } => {
            println!("{}", serde_json::to_string_pretty(&app_config)?);
            println!("kind layout version: {}", layout.version());
            match logging::get_current_log_path() {
                Ok(path) => println!("log file: {}", path.display()),
                Err(e) => println!("log file: unavailable ({e})"),
            }
            if save {
                let path = config_path
                    .as_deref()
                    .context("--save needs --config or INSIGHT_CONFIG")?;
                config::save_app_config(&app_config, path)?;
                println!("Saved configuration to {}", path.display());
            }
        }
    }
    Ok(())
}

async fn handle_ask(
    layout: &CatalogLayout,
    app_config: &AppConfig,
    kind: &str,
    text: String,
    filters: Vec<(String, String)>,
    dry_run: bool,
) -> Result<()> {
    let question = Question {
        text,
        filters: group_filters(filters),
    };

    if dry_run {
        println!("{}", query::prepare_prompt(layout, kind, &question)?);
        return Ok(());
    }

    let client =
        OpenAiClient::from_env(app_config.ai.clone()).context("Failed to set up completion")?;
    let answer = query::ask(layout, &client, kind, &question).await?;
    println!("SQL: {}", answer.sql);
    println!("{}", answer.result);
    Ok(())
}

fn parse_filter(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((column, value)) if !column.trim().is_empty() => {
            Ok((column.trim().to_owned(), value.trim().to_owned()))
        }
        _ => Err(format!("expected `column=value`, got `{arg}`")),
    }
}

/// Merge repeated columns, keeping first-seen column order.
fn group_filters(pairs: Vec<(String, String)>) -> Vec<FilterSelection> {
    let mut grouped: Vec<FilterSelection> = Vec::new();
    for (column, value) in pairs {
        match grouped.iter_mut().find(|(c, _)| *c == column) {
            Some((_, values)) => values.push(value),
            None => grouped.push((column, vec![value])),
        }
    }
    grouped
}

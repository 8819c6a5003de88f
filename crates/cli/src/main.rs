//! Stockroom search CLI
//!
//! Runs one inventory search against a SQLite database and prints the
//! resulting page as JSON.

mod config;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use stockroom_search::backends::sqlite::SqliteBackend;
use stockroom_search::{ResultAssembler, SearchDispatcher};
use tracing::info;

use crate::config::CliConfig;

/// Initializes the tracing subscriber. `RUST_LOG` takes precedence.
fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("stockroom={},stockroom_search={}", level, level))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn open_backend(config: &CliConfig) -> anyhow::Result<SqliteBackend> {
    info!(database = %config.database, "Opening SQLite backend");

    let backend = if config.is_memory() {
        SqliteBackend::in_memory()?
    } else {
        SqliteBackend::open(&config.database)
            .with_context(|| format!("failed to open {}", config.database))?
    };

    // A fresh in-memory database has no tables to search.
    if config.init_schema || config.is_memory() {
        backend.init_schema()?;
    }

    Ok(backend)
}

fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    let params = config
        .search_params()
        .context("invalid search parameters")?;
    let dispatcher = SearchDispatcher::new(config.search_config());
    let backend = open_backend(&config)?;

    if config.explain {
        let ctx = dispatcher.build_context(&params, Utc::now());
        println!("{}", backend.debug_query(&ctx));
        return Ok(());
    }

    let page = dispatcher.dispatch(&params, &backend)?;
    info!(
        returned = page.records.len(),
        total = page.total_count,
        "Search complete"
    );
    println!("{}", serde_json::to_string_pretty(&page)?);

    Ok(())
}

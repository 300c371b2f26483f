use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use coldash::server::Dashboard;
use coldash::Table;

#[derive(Parser, Debug)]
#[command(name = "coldash")]
#[command(about = "Serve the cost-of-living-by-country dashboard", long_about = None)]
struct Args {
    /// Path to the dataset CSV
    #[arg(long, default_value = "Cost_of_Living_Index_by_Country_2024.csv")]
    data: PathBuf,

    /// Address to bind the dashboard server to
    #[arg(long, default_value = "127.0.0.1:8050")]
    bind: String,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    // The table is loaded exactly once, before the interactive loop; a
    // missing or malformed dataset is startup-fatal.
    let table = Table::load(&args.data)
        .with_context(|| format!("Failed to load dataset '{}'", args.data.display()))?;
    info!(
        rows = table.rows().len(),
        metrics = table.metric_columns().len(),
        "dataset loaded"
    );

    Dashboard::new(table).serve(&args.bind)
}

// Shelfwatch console
// Inspect shelf images from the terminal and print stock alerts

mod console;

use anyhow::Context;
use clap::Parser;
use console::ShelfConsole;
use shelfwatch_core::{banner, ShelfConfig, Threshold};
use shelfwatch_eye::{shared_detector, ShelfMonitor};
use shelfwatch_storage::open_stock_log;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shelfwatch")]
#[command(about = "Smart shelf monitoring console", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (JSON, TOML or YAML)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Stock threshold for this session (overrides the configuration)
    #[arg(long, short)]
    threshold: Option<u32>,

    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ShelfConfig::load(cli.config.as_deref())?;
    let threshold = match cli.threshold {
        Some(value) => Threshold::new(value).context("invalid --threshold")?,
        None => config.stock.threshold,
    };

    let level = if cli.verbose { "debug" } else { config.log_level.as_str() };
    // Diagnostics on stderr so they don't interleave with the menu
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    banner::print_colored_banner();

    println!("Loading shelf model...");
    let detector = shared_detector(&config.model).await?;
    let stock_log = open_stock_log(&config.log_store)?;
    let monitor = Arc::new(ShelfMonitor::new(detector).with_log(stock_log));
    info!("Console ready (threshold {})", threshold);

    let console = ShelfConsole::new(
        monitor,
        config.camera.clone(),
        threshold,
        config.console.annotated_output.clone(),
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    console.run(stdin.lock(), &mut stdout).await
}

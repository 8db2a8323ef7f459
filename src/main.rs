//! legco-votes - LegCo voting records as one spreadsheet
//!
//! A CLI tool that walks the Legislative Council's per-meeting vote
//! listings, downloads every vote XML file, and exports a single table
//! with one row per vote and one column per member.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (invalid arguments, config, listing failure, write failure)

mod aggregate;
mod cli;
mod config;
mod error;
mod export;
mod extract;
mod fetch;
mod markup;
mod models;
mod pipeline;
mod source;

use aggregate::{Aggregator, Roster};
use anyhow::{Context, Result};
use cli::Args;
use config::{Config, CONFIG_FILE};
use fetch::HttpFetcher;
use pipeline::{Pipeline, PipelineConfig};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("legco-votes v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run_export(args).await {
        error!("Export failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .legco-votes.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to change terms, meetings, output and merge rules.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete collect-and-export workflow.
async fn run_export(args: Args) -> Result<()> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args)?;

    let groups = config.source.groups.clone();
    if groups.is_empty() {
        warn!("No source groups configured; the export will be empty");
    }

    let fetcher = HttpFetcher::new(&config.http_options()).context("Failed to set up HTTP client")?;
    let pipeline_config = PipelineConfig {
        concurrency: config.general.concurrency,
        timestamp_policy: config.extract.timestamp_policy,
        show_progress: !args.quiet,
    };
    let pipeline = Pipeline::new(&fetcher, config.enumerator(), pipeline_config);

    // Handle --dry-run: list documents and exit
    if args.dry_run {
        return handle_dry_run(&pipeline, &groups).await;
    }

    // Step 1: Collect
    println!("📥 Collecting votes from {} source groups...", groups.len());
    println!("   Source: {}", config.source.root_url);
    println!("   Concurrency: {}", config.general.concurrency);
    println!("   Title collisions: {}", config.extract.collision_policy);

    let mut aggregator = Aggregator::new(
        Roster::new(&config.extract.placeholder),
        config.extract.collision_policy,
    );
    let summary = pipeline.run(&groups, &mut aggregator).await?;
    if aggregator.is_empty() {
        warn!("No vote events were collected");
    }

    // Step 2: Build the table
    println!("\n📝 Building table...");
    let table = aggregator.materialize();

    // Step 3: Write it
    let output = &config.general.output;
    let embedded_summary = config.export.include_summary.then_some(&summary);
    export::save_table(
        &table,
        embedded_summary,
        output,
        config.general.format,
        config.export.excel_bom,
    )?;

    // Print summary
    let duration = start_time.elapsed().as_secs_f64();
    println!("\n📊 Collection Summary:");
    println!("   Source groups: {}", summary.groups);
    println!(
        "   Documents: {} ok / {} failed",
        summary.documents_ok(),
        summary.documents_failed
    );
    if summary.records_skipped > 0 {
        println!("   Records skipped: {}", summary.records_skipped);
    }
    if aggregator.collisions() > 0 {
        println!("   Title collisions: {}", aggregator.collisions());
    }
    println!("   Votes: {} | Members: {}", table.rows.len(), table.members.len());
    println!("   Duration: {:.1}s", duration);
    println!("\n✅ Export complete! Saved to: {}", output.display());

    Ok(())
}

/// Handle --dry-run: print the document URIs each group would fetch.
async fn handle_dry_run(pipeline: &Pipeline<'_, HttpFetcher>, groups: &[source::SourceGroup]) -> Result<()> {
    println!("\n🔍 Dry run: fetching listings only...\n");

    let listed = pipeline.list(groups).await?;
    let mut total = 0;

    for (group, uris) in &listed {
        println!("   {} ({} documents)", group, uris.len());
        for uri in uris {
            println!("     📄 {}", uri);
        }
        total += uris.len();
    }

    println!("\n   Total: {} documents", total);
    println!("\n✅ Dry run complete. No vote documents were downloaded.");
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

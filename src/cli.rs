//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation. Most options are optional so that values from the
//! configuration file survive unless overridden.

use crate::export::OutputFormat;
use crate::models::CollisionPolicy;
use crate::source::{Meeting, SourceGroup};
use clap::Parser;
use std::path::PathBuf;

/// legco-votes - LegCo voting records as one spreadsheet
///
/// Fetches the per-meeting vote XML files published by the Legislative
/// Council, and writes one row per vote with one column per member.
///
/// Examples:
///   legco-votes
///   legco-votes --terms yr17-18 --meetings cm,fc -o votes.csv
///   legco-votes --listing "https://www.legco.gov.hk/php/detect-votes.php?term=yr18-19&meeting=hc"
///   legco-votes --format json --collision merge --concurrency 4
///   legco-votes --dry-run
///   legco-votes --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Output file path for the export
    ///
    /// Defaults to vote-result.csv (or the value in .legco-votes.toml).
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (csv, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .legco-votes.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only, no progress bar)
    #[arg(short, long)]
    pub quiet: bool,

    /// Terms to collect (comma-separated)
    ///
    /// Example: --terms yr16-17,yr17-18
    #[arg(long, value_name = "TERMS", value_delimiter = ',')]
    pub terms: Option<Vec<String>>,

    /// Meeting categories to collect (comma-separated)
    ///
    /// Known: cm, hc, fc, esc, pwsc. Other codes use the council meeting folder.
    #[arg(long, value_name = "CODES", value_delimiter = ',')]
    pub meetings: Option<Vec<Meeting>>,

    /// Listing URL to collect (repeatable); term and meeting come from its query
    ///
    /// Replaces the configured groups and --terms/--meetings.
    #[arg(long, value_name = "URL")]
    pub listing: Vec<String>,

    /// Root URL that document paths are built under
    #[arg(long, value_name = "URL", env = "LEGCO_SOURCE_ROOT")]
    pub source_root: Option<String>,

    /// Number of documents fetched concurrently (1 = sequential)
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// What to do when two votes share the same title
    #[arg(long, value_name = "POLICY")]
    pub collision: Option<CollisionPolicy>,

    /// Accept records whose time is unusable, timestamped at midnight
    #[arg(long)]
    pub date_only_fallback: bool,

    /// Cell value for members who did not take part in a vote
    #[arg(long, value_name = "TEXT")]
    pub placeholder: Option<String>,

    /// Do not prefix CSV output with a UTF-8 byte order mark
    #[arg(long)]
    pub no_bom: bool,

    /// Dry run: fetch listings and print document URIs without downloading them
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .legco-votes.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref root) = self.source_root {
            if !root.starts_with("http://") && !root.starts_with("https://") {
                return Err("Source root must start with 'http://' or 'https://'".to_string());
            }
        }

        for listing in &self.listing {
            SourceGroup::from_listing_url(listing).map_err(|e| e.to_string())?;
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if let Some(ref terms) = self.terms {
            if terms.iter().any(|t| t.trim().is_empty()) {
                return Err("Terms must not be empty".to_string());
            }
        }

        if let Some(ref config) = self.config {
            if !config.is_file() {
                return Err(format!("Config file does not exist: {}", config.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

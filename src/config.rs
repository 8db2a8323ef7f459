//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.legco-votes.toml` files.

use crate::export::OutputFormat;
use crate::fetch::HttpOptions;
use crate::models::{CollisionPolicy, TimestampPolicy};
use crate::source::{Meeting, SourceEnumerator, SourceGroup};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".legco-votes.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Where vote documents come from.
    #[serde(default)]
    pub source: SourceConfig,

    /// Extraction and merge rules.
    #[serde(default)]
    pub extract: ExtractConfig,

    /// Export file settings.
    #[serde(default)]
    pub export: ExportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Export file path.
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Export file format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Documents fetched concurrently within a group (1 = sequential).
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            format: OutputFormat::default(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_output() -> PathBuf {
    PathBuf::from("vote-result.csv")
}

fn default_concurrency() -> usize {
    1
}

/// Upstream source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Root that document URIs are built under.
    #[serde(default = "default_root_url")]
    pub root_url: String,

    /// Listing endpoint answering with comma-separated file names.
    #[serde(default = "default_listing_url")]
    pub listing_url: String,

    /// Only listed files ending with this suffix are fetched.
    #[serde(default = "default_file_suffix")]
    pub file_suffix: String,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// User-Agent header for all requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Term / meeting pairs to enumerate, in order.
    #[serde(default = "default_groups")]
    pub groups: Vec<SourceGroup>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            root_url: default_root_url(),
            listing_url: default_listing_url(),
            file_suffix: default_file_suffix(),
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
            groups: default_groups(),
        }
    }
}

fn default_root_url() -> String {
    "https://www.legco.gov.hk".to_string()
}

fn default_listing_url() -> String {
    "https://www.legco.gov.hk/php/detect-votes.php".to_string()
}

fn default_file_suffix() -> String {
    ".xml".to_string()
}

fn default_timeout() -> u64 {
    HttpOptions::default().timeout_seconds
}

fn default_user_agent() -> String {
    HttpOptions::default().user_agent
}

/// Default terms.
pub fn default_terms() -> Vec<String> {
    vec!["yr16-17", "yr17-18", "yr18-19"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_groups() -> Vec<SourceGroup> {
    SourceGroup::cross(&default_terms(), &Meeting::known())
}

/// Extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Cell value for members with no vote on an event.
    #[serde(default = "default_placeholder")]
    pub placeholder: String,

    /// What to do when two records share a title.
    #[serde(default)]
    pub collision_policy: CollisionPolicy,

    /// How strictly vote timestamps are parsed.
    #[serde(default)]
    pub timestamp_policy: TimestampPolicy,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            placeholder: default_placeholder(),
            collision_policy: CollisionPolicy::default(),
            timestamp_policy: TimestampPolicy::default(),
        }
    }
}

fn default_placeholder() -> String {
    crate::aggregate::roster::DEFAULT_PLACEHOLDER.to_string()
}

/// Export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Prefix CSV output with a UTF-8 byte order mark.
    #[serde(default = "default_true")]
    pub excel_bom: bool,

    /// Embed the run summary in JSON output.
    #[serde(default = "default_true")]
    pub include_summary: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            excel_bom: true,
            include_summary: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) -> Result<()> {
        if let Some(ref output) = args.output {
            self.general.output = output.clone();
        }
        if let Some(format) = args.format {
            self.general.format = format;
        }
        if let Some(concurrency) = args.concurrency {
            self.general.concurrency = concurrency;
        }

        if let Some(ref root) = args.source_root {
            self.source.root_url = root.clone();
        }
        if let Some(timeout) = args.timeout {
            self.source.timeout_seconds = timeout;
        }

        // Explicit listing URLs replace the group list; --terms/--meetings
        // rebuild it from the given (or configured) terms and meetings.
        if !args.listing.is_empty() {
            self.source.groups = args
                .listing
                .iter()
                .map(|url| SourceGroup::from_listing_url(url))
                .collect::<Result<Vec<_>>>()?;
        } else if args.terms.is_some() || args.meetings.is_some() {
            let terms = args.terms.clone().unwrap_or_else(|| self.configured_terms());
            let meetings = args
                .meetings
                .clone()
                .unwrap_or_else(|| self.configured_meetings());
            self.source.groups = SourceGroup::cross(&terms, &meetings);
        }

        if let Some(ref placeholder) = args.placeholder {
            self.extract.placeholder = placeholder.clone();
        }
        if let Some(policy) = args.collision {
            self.extract.collision_policy = policy;
        }
        if args.date_only_fallback {
            self.extract.timestamp_policy = TimestampPolicy::DateOnlyFallback;
        }

        if args.no_bom {
            self.export.excel_bom = false;
        }

        Ok(())
    }

    /// Distinct terms of the configured groups, in first-seen order.
    fn configured_terms(&self) -> Vec<String> {
        let mut terms: Vec<String> = Vec::new();
        for group in &self.source.groups {
            if !terms.contains(&group.term) {
                terms.push(group.term.clone());
            }
        }
        terms
    }

    /// Distinct meetings of the configured groups, in first-seen order.
    fn configured_meetings(&self) -> Vec<Meeting> {
        let mut meetings: Vec<Meeting> = Vec::new();
        for group in &self.source.groups {
            if !meetings.contains(&group.meeting) {
                meetings.push(group.meeting.clone());
            }
        }
        meetings
    }

    /// Enumerator for the configured source.
    pub fn enumerator(&self) -> SourceEnumerator {
        SourceEnumerator::new(
            &self.source.root_url,
            &self.source.listing_url,
            &self.source.file_suffix,
        )
    }

    /// HTTP client options for the configured source.
    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            timeout_seconds: self.source.timeout_seconds,
            user_agent: self.source.user_agent.clone(),
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

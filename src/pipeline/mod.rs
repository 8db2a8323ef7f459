//! Collection pipeline.
//!
//! Drives the run: for each source group, enumerate its documents, fetch
//! and extract each one, and feed the resulting events into the
//! [`Aggregator`]. Listing failures abort the run; document failures are
//! logged, counted and skipped.
//!
//! Up to `concurrency` document fetches may be in flight at once, but the
//! responses are always processed in listing order by this single task, so
//! the aggregator never needs locking and the output is deterministic.

use crate::aggregate::Aggregator;
use crate::error::DocumentError;
use crate::extract::{self, Extraction};
use crate::fetch::Fetch;
use crate::models::{RunSummary, TimestampPolicy};
use crate::source::{SourceEnumerator, SourceGroup};
use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

/// Settings for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum document fetches in flight (at least 1).
    pub concurrency: usize,
    /// Timestamp parsing rule for vote records.
    pub timestamp_policy: TimestampPolicy,
    /// Draw a progress bar while fetching documents.
    pub show_progress: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            timestamp_policy: TimestampPolicy::Strict,
            show_progress: false,
        }
    }
}

/// Runs enumeration, fetching and extraction against one fetcher.
pub struct Pipeline<'a, F: Fetch> {
    fetcher: &'a F,
    enumerator: SourceEnumerator,
    config: PipelineConfig,
}

impl<'a, F: Fetch + Sync> Pipeline<'a, F> {
    pub fn new(fetcher: &'a F, enumerator: SourceEnumerator, config: PipelineConfig) -> Self {
        Self {
            fetcher,
            enumerator,
            config,
        }
    }

    /// Process every group in order, accumulating into `aggregator`.
    pub async fn run(&self, groups: &[SourceGroup], aggregator: &mut Aggregator) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for group in groups {
            let uris = self
                .enumerator
                .enumerate(self.fetcher, group)
                .await
                .with_context(|| format!("Failed to list vote files for {}", group))?;

            info!("{}: {} documents", group, uris.len());
            summary.groups += 1;
            summary.documents_listed += uris.len();

            self.process_group(&uris, aggregator, &mut summary).await;
        }

        info!(
            "Collected {} events and {} members from {} documents ({} failed, {} records skipped, {} title collisions)",
            aggregator.len(),
            aggregator.roster().len(),
            summary.documents_ok(),
            summary.documents_failed,
            summary.records_skipped,
            aggregator.collisions()
        );

        Ok(summary)
    }

    /// Only enumerate: return each group with its document URIs.
    pub async fn list(&self, groups: &[SourceGroup]) -> Result<Vec<(SourceGroup, Vec<String>)>> {
        let mut listed = Vec::with_capacity(groups.len());

        for group in groups {
            let uris = self
                .enumerator
                .enumerate(self.fetcher, group)
                .await
                .with_context(|| format!("Failed to list vote files for {}", group))?;
            listed.push((group.clone(), uris));
        }

        Ok(listed)
    }

    async fn process_group(&self, uris: &[String], aggregator: &mut Aggregator, summary: &mut RunSummary) {
        let progress = self.progress_bar(uris.len() as u64);
        let fetcher = self.fetcher;
        let policy = self.config.timestamp_policy;

        let mut documents = stream::iter(uris)
            .map(|uri| async move { (uri, fetcher.fetch(uri).await) })
            .buffered(self.config.concurrency.max(1));

        while let Some((uri, fetched)) = documents.next().await {
            progress.inc(1);

            let outcome = fetched
                .map_err(DocumentError::from)
                .and_then(|body| extract::process_document(&body, policy));

            match outcome {
                Ok(Extraction { events, skipped }) => {
                    debug!("{}: {} votes", uri, events.len());
                    summary.records_skipped += skipped;
                    summary.events_ingested += aggregator.ingest_all(events);
                }
                Err(e) => {
                    warn!("Skipping {}: {}", uri, e);
                    summary.documents_failed += 1;
                }
            }
        }

        progress.finish_and_clear();
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }

        let bar = ProgressBar::new(len);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        bar
    }
}

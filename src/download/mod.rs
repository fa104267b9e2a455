//! The download orchestrator: one search, then a bounded worker pool
//! driving every returned record through skip-check → fetch → extract →
//! write.
//!
//! Per-item failures are folded into the run statistics; only a failed
//! search aborts a run. The pool joins every scheduled item before the
//! stats are reported, and sequential mode is simply a pool of one.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::config::{Config, DEFAULT_WORKERS};
use crate::error::HarvestError;
use crate::eutils::{FetchClient, FetchOutcome, SearchClient};
use crate::extract;
use crate::models::{ArticleRecord, DownloadStats, OutputFormat, PmcId};
use crate::storage::{slugify, OutputWriter};
use crate::utils::{build_user_agent, HttpClient, RequestPacer};

/// Options for one harvest run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Free-text PMC query.
    pub query: String,
    /// Cap on the number of records to schedule.
    pub max_results: usize,
    /// Which renderings the artifacts embed.
    pub format: OutputFormat,
    /// Keep the plain-text rendering where the raw XML is also kept.
    pub include_text: bool,
    /// Worker pool size; 1 means fully sequential.
    pub workers: usize,
}

impl RunOptions {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: 100,
            format: OutputFormat::Text,
            include_text: true,
            workers: DEFAULT_WORKERS,
        }
    }

    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn include_text(mut self, include_text: bool) -> Self {
        self.include_text = include_text;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// One record at a time.
    pub fn sequential(self) -> Self {
        self.workers(1)
    }
}

/// Per-run counters, bumped from every worker.
#[derive(Debug, Default)]
struct Counters {
    successful: AtomicUsize,
    skipped: AtomicUsize,
    unavailable: AtomicUsize,
    errors: AtomicUsize,
}

/// Ties search, fetch, extraction, and storage together for whole runs.
pub struct Harvester {
    search: SearchClient,
    fetch: FetchClient,
    writer: OutputWriter,
}

impl Harvester {
    /// Wire up clients from configuration.
    ///
    /// Each harvester owns its pacer, handed to both clients by `Arc`, so
    /// independent harvesters in one process pace independently.
    pub fn new(config: &Config) -> Result<Self, HarvestError> {
        let user_agent = build_user_agent(
            config.http.user_agent.as_deref(),
            config.credentials.email.as_deref(),
        );
        let http = HttpClient::with_user_agent(&user_agent)?;
        let pacer = Arc::new(RequestPacer::new(config.request_interval()));
        let credentials = config.credentials.clone();

        Ok(Self::from_parts(
            SearchClient::new(http.clone(), Arc::clone(&pacer), credentials.clone()),
            FetchClient::new(http, pacer, credentials),
            OutputWriter::new(&config.downloads.output_dir),
        ))
    }

    /// Assemble from prebuilt components; tests point these at mock
    /// endpoints.
    pub fn from_parts(search: SearchClient, fetch: FetchClient, writer: OutputWriter) -> Self {
        Self {
            search,
            fetch,
            writer,
        }
    }

    /// Run one harvest: search once, then drive every returned id to a
    /// terminal state. Returns once the last scheduled item has finished.
    pub async fn run(&self, opts: &RunOptions) -> Result<DownloadStats, HarvestError> {
        let started = Instant::now();

        let hits = self.search.search(&opts.query, opts.max_results).await?;
        let slug = slugify(&opts.query);
        let requested = hits.ids.len();

        info!(
            "found {requested} ids for '{}' ({} total matches)",
            opts.query, hits.total_available
        );

        let counters = Counters::default();
        let workers = opts.workers.max(1);

        stream::iter(hits.ids.iter())
            .for_each_concurrent(workers, |raw| {
                let id = PmcId::parse(raw);
                let counters = &counters;
                let slug = slug.as_str();
                async move {
                    self.process_one(&id, slug, opts, counters).await;
                }
            })
            .await;

        let successful = counters.successful.load(Ordering::SeqCst);
        let skipped = counters.skipped.load(Ordering::SeqCst);
        let unavailable = counters.unavailable.load(Ordering::SeqCst);
        let errors = counters.errors.load(Ordering::SeqCst);

        let stats = DownloadStats {
            query: opts.query.clone(),
            total_found: hits.total_available,
            requested,
            successful,
            skipped,
            failed: unavailable + errors,
            unavailable,
            errors,
            duration: started.elapsed(),
            output_dir: self.writer.namespace_dir(&slug),
        };

        info!(
            "run finished: {successful} downloaded, {skipped} skipped, {} failed in {:.1}s",
            stats.failed,
            stats.duration.as_secs_f64()
        );
        Ok(stats)
    }

    /// Drive one record to a terminal state, recording the outcome.
    async fn process_one(
        &self,
        id: &PmcId,
        namespace: &str,
        opts: &RunOptions,
        counters: &Counters,
    ) {
        if self.writer.exists(namespace, id) {
            debug!("{id} already downloaded, skipping");
            counters.skipped.fetch_add(1, Ordering::SeqCst);
            return;
        }

        let xml = match self.fetch.fetch(id).await {
            FetchOutcome::Content(xml) => xml,
            FetchOutcome::Unavailable(reason) => {
                info!("{id} not available in PMC: {reason}");
                counters.unavailable.fetch_add(1, Ordering::SeqCst);
                return;
            }
            FetchOutcome::Failed { attempts, error } => {
                warn!("{id} failed after {attempts} attempt(s): {error}");
                counters.errors.fetch_add(1, Ordering::SeqCst);
                return;
            }
        };

        let metadata = extract::extract_metadata(&xml);
        if metadata.is_empty() {
            warn!("{id}: no metadata recovered from document");
        }

        let mut record = ArticleRecord::new(id, metadata);
        if opts.format.wants_text(opts.include_text) {
            record = record.with_text(extract::to_plain_text(&xml));
        }
        if opts.format.includes_xml() {
            record = record.with_xml(xml);
        }

        match self.writer.write(namespace, &record) {
            Ok(path) => {
                debug!("saved {}", path.display());
                counters.successful.fetch_add(1, Ordering::SeqCst);
            }
            Err(error) => {
                warn!("{id}: write failed: {error}");
                counters.errors.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_options_builder() {
        let opts = RunOptions::new("frailty")
            .max_results(25)
            .format(OutputFormat::Both)
            .include_text(false)
            .sequential();

        assert_eq!(opts.query, "frailty");
        assert_eq!(opts.max_results, 25);
        assert_eq!(opts.format, OutputFormat::Both);
        assert!(!opts.include_text);
        assert_eq!(opts.workers, 1);
    }
}

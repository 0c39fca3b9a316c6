//! Batch extraction scheduler
//!
//! Picks a bounded batch of links that have no extracted document yet,
//! fetches each one, runs the extraction pipeline on a blocking thread and
//! stores the result. A failing link is counted and recorded against the
//! link; it never aborts the rest of the batch.

use crate::config::ExtractionConfig;
use crate::crawler::Fetcher;
use crate::extract::Pipeline;
use crate::storage::{DiscoveredLink, ExtractInsert, SqliteStorage, Storage};
use crate::Result;
use futures::stream::{self, StreamExt};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Counters for one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub attempted: usize,
    /// Text stored for the first time
    pub succeeded: usize,
    /// Text already existed for the link
    pub skipped: usize,
    /// Every tier came back empty
    pub empty: usize,
    /// Fetch, extraction or storage failed
    pub failed: usize,
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} attempted: {} succeeded, {} skipped, {} empty, {} failed",
            self.attempted, self.succeeded, self.skipped, self.empty, self.failed
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkOutcome {
    Succeeded,
    Skipped,
    Empty,
    Failed,
}

/// Processes unextracted links in bounded batches
pub struct BatchExtractor {
    storage: Arc<Mutex<SqliteStorage>>,
    fetcher: Fetcher,
    pipeline: Arc<Pipeline>,
    config: ExtractionConfig,
}

impl BatchExtractor {
    pub fn new(
        storage: Arc<Mutex<SqliteStorage>>,
        fetcher: Fetcher,
        pipeline: Arc<Pipeline>,
        config: ExtractionConfig,
    ) -> Self {
        Self {
            storage,
            fetcher,
            pipeline,
            config,
        }
    }

    fn lock_storage(&self) -> MutexGuard<'_, SqliteStorage> {
        self.storage
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Processes the next batch of unextracted links
    ///
    /// # Arguments
    ///
    /// * `limit` - Maximum links to process; the configured batch size when None
    /// * `job_id` - Restrict the batch to one job's links
    ///
    /// # Returns
    ///
    /// * `Ok(BatchReport)` - Per-outcome counts for the batch
    /// * `Err(HarvestError)` - The batch could not be selected
    pub async fn process_next_batch(
        &self,
        limit: Option<usize>,
        job_id: Option<i64>,
    ) -> Result<BatchReport> {
        let limit = limit.unwrap_or(self.config.batch_size);
        let links = self
            .lock_storage()
            .select_unextracted(limit, self.config.max_attempts, job_id)?;

        info!("Processing batch of {} links", links.len());

        let outcomes: Vec<LinkOutcome> = stream::iter(links)
            .map(|link| async move { self.process_link(&link).await })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut report = BatchReport {
            attempted: outcomes.len(),
            ..BatchReport::default()
        };
        for outcome in outcomes {
            match outcome {
                LinkOutcome::Succeeded => report.succeeded += 1,
                LinkOutcome::Skipped => report.skipped += 1,
                LinkOutcome::Empty => report.empty += 1,
                LinkOutcome::Failed => report.failed += 1,
            }
        }

        info!("Batch finished: {}", report);
        Ok(report)
    }

    async fn process_link(&self, link: &DiscoveredLink) -> LinkOutcome {
        debug!("Extracting {} ({})", link.url, link.kind);

        let document = match self.fetcher.fetch_kind(&link.url, link.kind).await {
            Ok(document) => document,
            Err(e) => return self.record_failure(link, &e.to_string(), LinkOutcome::Failed),
        };

        let pipeline = Arc::clone(&self.pipeline);
        let kind = link.kind;
        let bytes = document.bytes;
        let extracted =
            match tokio::task::spawn_blocking(move || pipeline.extract(&bytes, kind)).await {
                Ok(extracted) => extracted,
                Err(e) => {
                    let message = format!("extraction task failed: {}", e);
                    return self.record_failure(link, &message, LinkOutcome::Failed);
                }
            };

        let Some(result) = extracted else {
            return self.record_failure(link, "no text extracted", LinkOutcome::Empty);
        };

        let text = result.render_truncated(self.config.max_text_chars);
        let stored = self.lock_storage().insert_extracted(link.id, &text);
        match stored {
            Ok(ExtractInsert::Created(_)) => {
                info!("Extracted {} via {} tier", link.url, result.tier);
                LinkOutcome::Succeeded
            }
            Ok(ExtractInsert::AlreadyExtracted) => {
                debug!("{} was already extracted", link.url);
                LinkOutcome::Skipped
            }
            Err(e) => {
                let message = format!("storing text failed: {}", e);
                self.record_failure(link, &message, LinkOutcome::Failed)
            }
        }
    }

    fn record_failure(
        &self,
        link: &DiscoveredLink,
        message: &str,
        outcome: LinkOutcome,
    ) -> LinkOutcome {
        warn!("Extraction of {} failed: {}", link.url, message);
        if let Err(e) = self.lock_storage().record_failed_attempt(link.id, message) {
            warn!("Could not record failed attempt for {}: {}", link.url, e);
        }
        outcome
    }
}

//! Crawler coordinator - crawl job orchestration
//!
//! This module ties job state, page sources and storage together:
//! - Submitting, pausing and resuming crawl jobs
//! - Running one discovery session per invocation
//! - Recording qualifying document links as they are found
//! - Completing jobs whose pagination is exhausted

use crate::config::{Config, CrawlDriver};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::source::{HttpPageSource, PageSnapshot, PageSource};
use crate::crawler::CrawlError;
use crate::state::{JobAction, JobStatus};
use crate::storage::{CrawlJob, LinkInsert, SqliteStorage, Storage};
use crate::url::{parse_seed_url, qualify_document_link, LinkKind, SeedOrigin};
use crate::{HarvestError, Result};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Why a crawl session stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// No further "next" control, or pagination looped back
    Exhausted,
    /// The configured page cap was reached
    PageLimitReached,
    /// The job left `in_progress` between two pages
    Paused,
}

impl SessionOutcome {
    /// Returns true if the job should be marked completed
    pub fn completes_job(&self) -> bool {
        matches!(self, Self::Exhausted | Self::PageLimitReached)
    }
}

/// Counters for one crawl session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub pages_visited: u32,
    pub new_links: u64,
    pub duplicates: u64,
    pub page_errors: u32,
    pub outcome: SessionOutcome,
}

/// Read-only view of a job and what it discovered so far
#[derive(Debug, Clone)]
pub struct JobSummary {
    pub job: CrawlJob,
    pub pdf_count: u64,
    pub html_count: u64,
    pub total: u64,
    pub extracted: u64,
}

/// Result of `Coordinator::run_job`
#[derive(Debug, Clone)]
pub struct JobRunReport {
    /// None when the job was not in progress and no session ran
    pub session: Option<SessionReport>,
    pub summary: JobSummary,
}

/// Main crawl coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    storage: Arc<Mutex<SqliteStorage>>,
    fetcher: Fetcher,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// Opens the database named in the output section and builds the HTTP
    /// client from the user agent and fetch sections.
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(HarvestError)` - Failed to open storage or build the client
    pub fn new(config: Config) -> Result<Self> {
        let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
        Self::with_storage(config, Arc::new(Mutex::new(storage)))
    }

    /// Creates a coordinator over an already opened storage backend
    pub fn with_storage(config: Config, storage: Arc<Mutex<SqliteStorage>>) -> Result<Self> {
        let fetcher = Fetcher::from_config(
            &config.user_agent,
            Duration::from_secs(config.fetch.timeout_secs),
        )?;

        Ok(Self {
            config: Arc::new(config),
            storage,
            fetcher,
        })
    }

    /// Shared handle to the storage backend
    pub fn storage(&self) -> Arc<Mutex<SqliteStorage>> {
        Arc::clone(&self.storage)
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    fn lock_storage(&self) -> MutexGuard<'_, SqliteStorage> {
        self.storage
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ===== Job Lifecycle =====

    /// Creates a crawl job for a seed URL
    ///
    /// # Returns
    ///
    /// The ID of the new job, which starts `in_progress`
    pub fn submit_job(&self, seed_url: &str) -> Result<i64> {
        let seed = parse_seed_url(seed_url)?;
        let job_id = self.lock_storage().create_job(seed.as_str())?;
        info!("Submitted job {} for {}", job_id, seed);
        Ok(job_id)
    }

    /// Pauses a running job; pausing a paused job is a no-op
    pub fn pause_job(&self, job_id: i64) -> Result<JobStatus> {
        self.transition(job_id, JobAction::Pause)
    }

    /// Resumes a paused job; resuming a running job is a no-op
    ///
    /// Resuming only changes the status. The next `run_job` call starts a
    /// new session from the seed.
    pub fn resume_job(&self, job_id: i64) -> Result<JobStatus> {
        self.transition(job_id, JobAction::Resume)
    }

    fn transition(&self, job_id: i64, action: JobAction) -> Result<JobStatus> {
        let mut storage = self.lock_storage();
        let current = storage.get_job(job_id)?.status;
        let next = current
            .apply(action)
            .map_err(|from| HarvestError::InvalidTransition {
                job_id,
                from,
                action,
            })?;

        if next != current && !storage.set_job_status(job_id, current, next)? {
            // Another process moved the job after we read it
            let from = storage.get_job(job_id)?.status;
            return Err(HarvestError::InvalidTransition {
                job_id,
                from,
                action,
            });
        }

        info!("Job {}: {} -> {}", job_id, current, next);
        Ok(next)
    }

    /// Summarizes a job's discoveries without side effects
    pub fn job_summary(&self, job_id: i64) -> Result<JobSummary> {
        let storage = self.lock_storage();
        let job = storage.get_job(job_id)?;
        let pdf_count = storage.count_links(Some(job_id), Some(LinkKind::Pdf))?;
        let html_count = storage.count_links(Some(job_id), Some(LinkKind::Html))?;
        let extracted = storage.count_extracted(Some(job_id))?;

        Ok(JobSummary {
            job,
            pdf_count,
            html_count,
            total: pdf_count + html_count,
            extracted,
        })
    }

    // ===== Crawl Sessions =====

    /// Runs one crawl session for a job if it is in progress
    ///
    /// A job that is paused or completed is left untouched and only its
    /// summary is returned. A session that runs out of pages (or hits the
    /// page cap) completes the job; a session interrupted by a pause leaves
    /// it paused.
    ///
    /// # Returns
    ///
    /// * `Ok(JobRunReport)` - Session counters (if one ran) and the job summary
    /// * `Err(HarvestError)` - The seed page could not be loaded, or storage failed
    pub async fn run_job(&self, job_id: i64) -> Result<JobRunReport> {
        let job = self.lock_storage().get_job(job_id)?;

        if !job.status.can_crawl() {
            info!("Job {} is {}, not crawling", job_id, job.status);
            return Ok(JobRunReport {
                session: None,
                summary: self.job_summary(job_id)?,
            });
        }

        let mut source = self.page_source()?;
        let session = self.crawl_session(&job, source.as_mut()).await;
        source.close().await;
        let session = session?;

        if session.outcome.completes_job() {
            self.complete_job(job_id)?;
        }

        Ok(JobRunReport {
            session: Some(session),
            summary: self.job_summary(job_id)?,
        })
    }

    /// Completes a job whose session ran out of pages
    ///
    /// A job paused while the session ran stays paused.
    fn complete_job(&self, job_id: i64) -> Result<()> {
        let mut storage = self.lock_storage();
        let current = storage.get_job(job_id)?.status;

        match current.apply(JobAction::Complete) {
            Ok(next) if next == current => debug!("Job {} was already {}", job_id, current),
            Ok(next) => {
                if storage.set_job_status(job_id, current, next)? {
                    info!("Job {} completed", job_id);
                } else {
                    info!("Job {} changed status during the session; not completing", job_id);
                }
            }
            Err(from) => info!("Job {} is {}; not completing", job_id, from),
        }
        Ok(())
    }

    /// Walks a job's listing pages and records qualifying links
    ///
    /// The caller owns `source` and is responsible for closing it.
    pub async fn crawl_session(
        &self,
        job: &CrawlJob,
        source: &mut dyn PageSource,
    ) -> Result<SessionReport> {
        let seed = parse_seed_url(&job.seed_url)?;
        let origin = SeedOrigin::from_url(&seed)?;
        let page_delay = Duration::from_millis(self.config.crawler.page_delay_ms);
        let max_pages = self.config.crawler.max_pages;

        info!("Starting crawl session for job {} at {}", job.id, seed);

        source
            .open(&seed)
            .await
            .map_err(|e| seed_unavailable(&seed, e))?;

        let mut report = SessionReport {
            pages_visited: 0,
            new_links: 0,
            duplicates: 0,
            page_errors: 0,
            outcome: SessionOutcome::Exhausted,
        };
        let mut seen = HashSet::new();

        loop {
            let page = match source.snapshot().await {
                Ok(page) => page,
                Err(e) if report.pages_visited == 0 => return Err(seed_unavailable(&seed, e)),
                Err(e) => {
                    warn!("Failed to read listing page: {}", e);
                    report.page_errors += 1;
                    break;
                }
            };

            if !seen.insert(page.fingerprint()) {
                info!("Pagination returned to {}, stopping", page.url);
                break;
            }

            report.pages_visited += 1;
            self.record_page(job.id, &page, &origin, &mut report)?;

            if report.pages_visited >= max_pages {
                info!("Reached the cap of {} pages for job {}", max_pages, job.id);
                report.outcome = SessionOutcome::PageLimitReached;
                break;
            }

            if !page_delay.is_zero() {
                tokio::time::sleep(page_delay).await;
            }

            let status = self.lock_storage().get_job(job.id)?.status;
            if !status.can_crawl() {
                info!("Job {} is now {}, stopping session", job.id, status);
                report.outcome = SessionOutcome::Paused;
                break;
            }

            match source.follow_next().await {
                Ok(true) => {}
                Ok(false) => {
                    debug!("No next control on {}", page.url);
                    break;
                }
                Err(e) => {
                    warn!("Could not follow next control on {}: {}", page.url, e);
                    report.page_errors += 1;
                    break;
                }
            }
        }

        info!(
            "Session for job {} visited {} pages: {} new links, {} duplicates ({:?})",
            job.id, report.pages_visited, report.new_links, report.duplicates, report.outcome
        );

        Ok(report)
    }

    fn record_page(
        &self,
        job_id: i64,
        page: &PageSnapshot,
        origin: &SeedOrigin,
        report: &mut SessionReport,
    ) -> Result<()> {
        let mut storage = self.lock_storage();
        for anchor in &page.anchors {
            let Some(link) = qualify_document_link(&anchor.href, &page.url, origin) else {
                continue;
            };
            match storage.insert_link(job_id, link.url.as_str(), link.kind)? {
                LinkInsert::Created(_) => {
                    debug!("Discovered {} ({})", link.url, link.kind);
                    report.new_links += 1;
                }
                LinkInsert::Duplicate => report.duplicates += 1,
            }
        }
        Ok(())
    }

    fn page_source(&self) -> Result<Box<dyn PageSource>> {
        match self.config.crawler.driver {
            CrawlDriver::Http => Ok(Box::new(HttpPageSource::new(self.fetcher.clone()))),
            #[cfg(feature = "browser")]
            CrawlDriver::Browser => Ok(Box::new(crate::crawler::BrowserPageSource::new(
                crate::crawler::user_agent_string(&self.config.user_agent),
                Duration::from_secs(self.config.crawler.navigation_timeout_secs),
            ))),
            #[cfg(not(feature = "browser"))]
            CrawlDriver::Browser => Err(crate::ConfigError::Validation(
                "driver = \"browser\" requires building with the `browser` feature".to_string(),
            )
            .into()),
        }
    }
}

fn seed_unavailable(seed: &url::Url, error: CrawlError) -> HarvestError {
    CrawlError::SeedUnavailable {
        url: seed.to_string(),
        reason: error.to_string(),
    }
    .into()
}

//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::analysis::PolicyAnalysis;
use crate::state::JobStatus;
use crate::storage::{
    CrawlJob, DiscoveredLink, ExtractInsert, ExtractedDocument, LinkInsert, UploadSource,
};
use crate::url::LinkKind;
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Job not found: {0}")]
    JobNotFound(i64),

    #[error("Link not found: {0}")]
    LinkNotFound(i64),

    #[error("Corrupt row in {table}: {detail}")]
    CorruptRow { table: &'static str, detail: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This trait defines all database operations needed by the crawler, the
/// batch extractor and the analysis command. Callers share one backend
/// behind a mutex and keep each lock scoped to a single call.
pub trait Storage {
    // ===== Job Management =====

    /// Creates a new crawl job in the `in_progress` state
    ///
    /// # Returns
    ///
    /// The ID of the newly created job
    fn create_job(&mut self, seed_url: &str) -> StorageResult<i64>;

    /// Gets a job by ID
    fn get_job(&self, job_id: i64) -> StorageResult<CrawlJob>;

    /// Moves a job from `expected` to `next`
    ///
    /// The update only applies while the stored status still equals
    /// `expected`. Returns false when another writer got there first.
    fn set_job_status(
        &mut self,
        job_id: i64,
        expected: JobStatus,
        next: JobStatus,
    ) -> StorageResult<bool>;

    // ===== Link Management =====

    /// Records a discovered link unless the job already has this URL
    ///
    /// # Arguments
    ///
    /// * `job_id` - The job that discovered the link
    /// * `url` - Absolute, fragment-free URL
    /// * `kind` - Document kind derived from the URL
    fn insert_link(&mut self, job_id: i64, url: &str, kind: LinkKind)
        -> StorageResult<LinkInsert>;

    /// Gets a link by ID
    fn get_link(&self, link_id: i64) -> StorageResult<DiscoveredLink>;

    /// Counts links, optionally restricted to one job and/or one kind
    fn count_links(&self, job_id: Option<i64>, kind: Option<LinkKind>) -> StorageResult<u64>;

    /// Gets all links of a job ordered by ID
    fn get_links_for_job(&self, job_id: i64) -> StorageResult<Vec<DiscoveredLink>>;

    /// Selects links still waiting for extraction
    ///
    /// Only links without a document and with fewer than `max_attempts`
    /// recorded failures are returned, ordered by ID.
    fn select_unextracted(
        &self,
        limit: usize,
        max_attempts: u32,
        job_id: Option<i64>,
    ) -> StorageResult<Vec<DiscoveredLink>>;

    /// Records a failed or empty extraction attempt
    fn record_failed_attempt(&mut self, link_id: i64, error: &str) -> StorageResult<()>;

    // ===== Extracted Documents =====

    /// Stores extracted text for a link and sets its extracted flag
    ///
    /// Both writes happen in one transaction. A second call for the same
    /// link writes nothing and reports `AlreadyExtracted`.
    fn insert_extracted(&mut self, link_id: i64, text: &str) -> StorageResult<ExtractInsert>;

    /// Gets the extracted document of a link, if any
    fn get_extracted(&self, link_id: i64) -> StorageResult<Option<ExtractedDocument>>;

    /// Counts extracted documents, optionally restricted to one job
    fn count_extracted(&self, job_id: Option<i64>) -> StorageResult<u64>;

    // ===== Policy Analyses =====

    /// Stores a policy analysis
    fn insert_analysis(
        &mut self,
        analysis: &PolicyAnalysis,
        source: UploadSource,
        source_file: Option<&str>,
        source_url: Option<&str>,
    ) -> StorageResult<i64>;

    /// Gets a stored analysis by ID
    fn get_analysis(&self, analysis_id: i64) -> StorageResult<Option<PolicyAnalysis>>;

    /// Counts stored analyses
    fn count_analyses(&self) -> StorageResult<u64>;

    // ===== Statistics =====

    /// Counts jobs grouped by status
    fn count_jobs_by_status(&self) -> StorageResult<HashMap<JobStatus, u64>>;

    /// Counts unextracted links that reached the attempt limit
    fn count_retry_exhausted(&self, max_attempts: u32) -> StorageResult<u64>;
}

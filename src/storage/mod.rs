//! Storage module for persisting crawl and extraction data
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Crawl job lifecycle persistence
//! - Deduplicated discovered links and their retry bookkeeping
//! - Idempotent extracted document records
//! - Stored policy analyses

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::JobStatus;
use crate::url::LinkKind;
use crate::Result;

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(HarvestError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Represents a crawl job in the database
#[derive(Debug, Clone)]
pub struct CrawlJob {
    pub id: i64,
    pub seed_url: String,
    pub status: JobStatus,
    pub created_at: String,
}

/// Represents a discovered document link
#[derive(Debug, Clone)]
pub struct DiscoveredLink {
    pub id: i64,
    pub job_id: i64,
    pub url: String,
    pub kind: LinkKind,
    pub discovered_at: String,
    pub extracted: bool,
    pub attempts: u32,
    pub last_error: Option<String>,
}

/// Represents the persisted text of one link
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub id: i64,
    pub link_id: i64,
    pub text: String,
    pub extracted_at: String,
}

/// Outcome of recording a discovered link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkInsert {
    Created(i64),
    /// The job already knows this URL
    Duplicate,
}

/// Outcome of recording extracted text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractInsert {
    Created(i64),
    /// A document already exists for the link; nothing was written
    AlreadyExtracted,
}

/// Where the text behind a policy analysis came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadSource {
    File,
    Url,
}

impl UploadSource {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Url => "url",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "file" => Some(Self::File),
            "url" => Some(Self::Url),
            _ => None,
        }
    }
}

//! Statistics generation from the harvest database
//!
//! This module provides functionality for extracting and displaying
//! harvest statistics from the storage layer.

use crate::state::JobStatus;
use crate::storage::Storage;
use crate::{LinkKind, Result};
use std::collections::HashMap;

/// Harvest statistics summary
#[derive(Debug, Clone, Default)]
pub struct HarvestStatistics {
    /// Count of jobs by status
    pub jobs_by_status: HashMap<JobStatus, u64>,

    /// Discovered links pointing at PDFs
    pub pdf_links: u64,

    /// Discovered links pointing at HTML pages
    pub html_links: u64,

    /// Links with stored text
    pub extracted: u64,

    /// Links without text that are no longer retried
    pub retry_exhausted: u64,

    /// Stored policy analyses
    pub analyses: u64,
}

impl HarvestStatistics {
    pub fn total_jobs(&self) -> u64 {
        self.jobs_by_status.values().sum()
    }

    pub fn total_links(&self) -> u64 {
        self.pdf_links + self.html_links
    }

    /// Links still eligible for a batch
    pub fn pending(&self) -> u64 {
        self.total_links()
            .saturating_sub(self.extracted)
            .saturating_sub(self.retry_exhausted)
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `max_attempts` - Retry bound used to count exhausted links
///
/// # Returns
///
/// * `Ok(HarvestStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage, max_attempts: u32) -> Result<HarvestStatistics> {
    Ok(HarvestStatistics {
        jobs_by_status: storage.count_jobs_by_status()?,
        pdf_links: storage.count_links(None, Some(LinkKind::Pdf))?,
        html_links: storage.count_links(None, Some(LinkKind::Html))?,
        extracted: storage.count_extracted(None)?,
        retry_exhausted: storage.count_retry_exhausted(max_attempts)?,
        analyses: storage.count_analyses()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Jobs ({}):", stats.total_jobs());
    for status in [
        JobStatus::InProgress,
        JobStatus::Paused,
        JobStatus::Completed,
    ] {
        let count = stats.jobs_by_status.get(&status).copied().unwrap_or(0);
        println!("  {}: {}", status, count);
    }
    println!();

    println!("Links ({}):", stats.total_links());
    println!("  pdf: {}", stats.pdf_links);
    println!("  html: {}", stats.html_links);
    println!();

    println!("Extraction:");
    println!("  extracted: {}", stats.extracted);
    println!("  pending: {}", stats.pending());
    println!("  retry exhausted: {}", stats.retry_exhausted);
    println!();

    let rate = if stats.total_links() > 0 {
        (stats.extracted as f64 / stats.total_links() as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "Extraction Rate: {:.1}% ({} / {} links)",
        rate,
        stats.extracted,
        stats.total_links()
    );
    println!("Policy analyses stored: {}", stats.analyses);
}

//! Console and file output
//!
//! This module handles:
//! - Printing job, session and batch reports
//! - Writing markdown reports for policy analyses
//! - Recording harvest statistics

mod markdown;
pub mod stats;

pub use markdown::{format_analysis_report, write_analysis_report};
pub use stats::{load_statistics, print_statistics, HarvestStatistics};

use crate::analysis::PolicyAnalysis;
use crate::batch::BatchReport;
use crate::crawler::{JobSummary, SessionReport};

/// Prints a job's status and discovery counts
pub fn print_job_summary(summary: &JobSummary) {
    println!("Job {} ({})", summary.job.id, summary.job.status);
    println!("  Seed: {}", summary.job.seed_url);
    println!("  Created: {}", summary.job.created_at);
    println!(
        "  Links: {} ({} pdf, {} html)",
        summary.total, summary.pdf_count, summary.html_count
    );
    println!("  Extracted: {}", summary.extracted);
}

/// Prints the result of one crawl session
pub fn print_session_report(report: &SessionReport) {
    println!("Session {:?}", report.outcome);
    println!("  Pages visited: {}", report.pages_visited);
    println!("  New links: {}", report.new_links);
    println!("  Duplicates: {}", report.duplicates);
    if report.page_errors > 0 {
        println!("  Page errors: {}", report.page_errors);
    }
}

/// Prints the counters of one extraction batch
pub fn print_batch_report(report: &BatchReport) {
    println!("Batch: {} links attempted", report.attempted);
    println!("  Succeeded: {}", report.succeeded);
    println!("  Skipped: {}", report.skipped);
    println!("  Empty: {}", report.empty);
    println!("  Failed: {}", report.failed);
}

/// Prints a policy analysis
pub fn print_analysis(analysis: &PolicyAnalysis) {
    println!("Title: {}", analysis.title);
    println!("Date: {}", analysis.date);
    println!("\nSummary:\n{}", analysis.summary);
    println!("\nAffected:\n{}", analysis.affected);
    println!(
        "\nMost affected sector: {}\n{}",
        analysis.most_sector, analysis.most_text
    );
}

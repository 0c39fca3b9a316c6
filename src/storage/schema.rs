//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Policy Harvester database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Crawl jobs, one per submitted seed URL
CREATE TABLE IF NOT EXISTS jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    seed_url TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);

-- Document links found while paginating a job's listing pages
CREATE TABLE IF NOT EXISTS discovered_links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id INTEGER NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
    url TEXT NOT NULL,
    kind TEXT NOT NULL,
    discovered_at TEXT NOT NULL,
    extracted INTEGER NOT NULL DEFAULT 0,
    attempts INTEGER NOT NULL DEFAULT 0,
    last_error TEXT,
    UNIQUE(job_id, url)
);

CREATE INDEX IF NOT EXISTS idx_links_job ON discovered_links(job_id);
CREATE INDEX IF NOT EXISTS idx_links_pending ON discovered_links(extracted, attempts);

-- Extracted text, at most one row per link
CREATE TABLE IF NOT EXISTS extracted_documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    link_id INTEGER NOT NULL UNIQUE REFERENCES discovered_links(id) ON DELETE CASCADE,
    text TEXT NOT NULL,
    extracted_at TEXT NOT NULL
);

-- Policy analyses produced from uploaded files or URLs
CREATE TABLE IF NOT EXISTS policy_analyses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    date TEXT NOT NULL,
    summary TEXT NOT NULL,
    affected TEXT NOT NULL,
    sector_impacts TEXT NOT NULL,
    most_sector TEXT NOT NULL,
    most_text TEXT NOT NULL,
    source_file TEXT,
    source_url TEXT,
    uploaded_from TEXT NOT NULL,
    created_at TEXT NOT NULL
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

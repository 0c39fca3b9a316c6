//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::analysis::PolicyAnalysis;
use crate::state::JobStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    CrawlJob, DiscoveredLink, ExtractInsert, ExtractedDocument, LinkInsert, UploadSource,
};
use crate::url::LinkKind;
use crate::Result;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

const LINK_COLUMNS: &str =
    "id, job_id, url, kind, discovered_at, extracted, attempts, last_error";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(HarvestError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            PRAGMA mmap_size = 268435456;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// A `discovered_links` row before its kind is decoded
type LinkRow = (i64, i64, String, String, String, bool, u32, Option<String>);

fn read_link_row(row: &Row<'_>) -> rusqlite::Result<LinkRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn link_from_parts(row: LinkRow) -> StorageResult<DiscoveredLink> {
    let (id, job_id, url, kind, discovered_at, extracted, attempts, last_error) = row;
    let kind = LinkKind::from_db_string(&kind).ok_or_else(|| StorageError::CorruptRow {
        table: "discovered_links",
        detail: format!("link {} has unknown kind '{}'", id, kind),
    })?;
    Ok(DiscoveredLink {
        id,
        job_id,
        url,
        kind,
        discovered_at,
        extracted,
        attempts,
        last_error,
    })
}

fn job_from_parts(
    id: i64,
    seed_url: String,
    status: String,
    created_at: String,
) -> StorageResult<CrawlJob> {
    let status = JobStatus::from_db_string(&status).ok_or_else(|| StorageError::CorruptRow {
        table: "jobs",
        detail: format!("job {} has unknown status '{}'", id, status),
    })?;
    Ok(CrawlJob {
        id,
        seed_url,
        status,
        created_at,
    })
}

impl Storage for SqliteStorage {
    // ===== Job Management =====

    fn create_job(&mut self, seed_url: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO jobs (seed_url, status, created_at) VALUES (?1, ?2, ?3)",
            params![seed_url, JobStatus::InProgress.to_db_string(), now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_job(&self, job_id: i64) -> StorageResult<CrawlJob> {
        let row: Option<(i64, String, String, String)> = self
            .conn
            .query_row(
                "SELECT id, seed_url, status, created_at FROM jobs WHERE id = ?1",
                params![job_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        let (id, seed_url, status, created_at) = row.ok_or(StorageError::JobNotFound(job_id))?;
        job_from_parts(id, seed_url, status, created_at)
    }

    fn set_job_status(
        &mut self,
        job_id: i64,
        expected: JobStatus,
        next: JobStatus,
    ) -> StorageResult<bool> {
        let changed = self.conn.execute(
            "UPDATE jobs SET status = ?1 WHERE id = ?2 AND status = ?3",
            params![next.to_db_string(), job_id, expected.to_db_string()],
        )?;
        Ok(changed == 1)
    }

    // ===== Link Management =====

    fn insert_link(
        &mut self,
        job_id: i64,
        url: &str,
        kind: LinkKind,
    ) -> StorageResult<LinkInsert> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO discovered_links (job_id, url, kind, discovered_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![job_id, url, kind.to_db_string(), now],
        )?;

        if changed == 0 {
            Ok(LinkInsert::Duplicate)
        } else {
            Ok(LinkInsert::Created(self.conn.last_insert_rowid()))
        }
    }

    fn get_link(&self, link_id: i64) -> StorageResult<DiscoveredLink> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM discovered_links WHERE id = ?1", LINK_COLUMNS),
                params![link_id],
                read_link_row,
            )
            .optional()?
            .ok_or(StorageError::LinkNotFound(link_id))
            .and_then(link_from_parts)
    }

    fn count_links(&self, job_id: Option<i64>, kind: Option<LinkKind>) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM discovered_links
             WHERE (?1 IS NULL OR job_id = ?1) AND (?2 IS NULL OR kind = ?2)",
            params![job_id, kind.map(|k| k.to_db_string())],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn get_links_for_job(&self, job_id: i64) -> StorageResult<Vec<DiscoveredLink>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM discovered_links WHERE job_id = ?1 ORDER BY id",
            LINK_COLUMNS
        ))?;

        let rows = stmt
            .query_map(params![job_id], read_link_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(link_from_parts).collect()
    }

    fn select_unextracted(
        &self,
        limit: usize,
        max_attempts: u32,
        job_id: Option<i64>,
    ) -> StorageResult<Vec<DiscoveredLink>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM discovered_links l
             WHERE l.extracted = 0
               AND NOT EXISTS (SELECT 1 FROM extracted_documents d WHERE d.link_id = l.id)
               AND l.attempts < ?1
               AND (?2 IS NULL OR l.job_id = ?2)
             ORDER BY l.id
             LIMIT ?3",
            LINK_COLUMNS
        ))?;

        let rows = stmt
            .query_map(params![max_attempts, job_id, limit as i64], read_link_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(link_from_parts).collect()
    }

    fn record_failed_attempt(&mut self, link_id: i64, error: &str) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE discovered_links SET attempts = attempts + 1, last_error = ?1 WHERE id = ?2",
            params![error, link_id],
        )?;
        if changed == 0 {
            return Err(StorageError::LinkNotFound(link_id));
        }
        Ok(())
    }

    // ===== Extracted Documents =====

    fn insert_extracted(&mut self, link_id: i64, text: &str) -> StorageResult<ExtractInsert> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;

        let changed = tx.execute(
            "INSERT OR IGNORE INTO extracted_documents (link_id, text, extracted_at)
             VALUES (?1, ?2, ?3)",
            params![link_id, text, now],
        )?;
        if changed == 0 {
            return Ok(ExtractInsert::AlreadyExtracted);
        }
        let document_id = tx.last_insert_rowid();

        tx.execute(
            "UPDATE discovered_links SET extracted = 1, last_error = NULL WHERE id = ?1",
            params![link_id],
        )?;
        tx.commit()?;

        Ok(ExtractInsert::Created(document_id))
    }

    fn get_extracted(&self, link_id: i64) -> StorageResult<Option<ExtractedDocument>> {
        let document = self
            .conn
            .query_row(
                "SELECT id, link_id, text, extracted_at FROM extracted_documents WHERE link_id = ?1",
                params![link_id],
                |row| {
                    Ok(ExtractedDocument {
                        id: row.get(0)?,
                        link_id: row.get(1)?,
                        text: row.get(2)?,
                        extracted_at: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(document)
    }

    fn count_extracted(&self, job_id: Option<i64>) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM extracted_documents d
             JOIN discovered_links l ON l.id = d.link_id
             WHERE (?1 IS NULL OR l.job_id = ?1)",
            params![job_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Policy Analyses =====

    fn insert_analysis(
        &mut self,
        analysis: &PolicyAnalysis,
        source: UploadSource,
        source_file: Option<&str>,
        source_url: Option<&str>,
    ) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        let sector_impacts = serde_json::to_string(&analysis.sector_impacts)?;
        self.conn.execute(
            "INSERT INTO policy_analyses (title, date, summary, affected, sector_impacts,
             most_sector, most_text, source_file, source_url, uploaded_from, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                analysis.title,
                analysis.date,
                analysis.summary,
                analysis.affected,
                sector_impacts,
                analysis.most_sector,
                analysis.most_text,
                source_file,
                source_url,
                source.to_db_string(),
                now
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_analysis(&self, analysis_id: i64) -> StorageResult<Option<PolicyAnalysis>> {
        let row = self
            .conn
            .query_row(
                "SELECT title, date, summary, affected, sector_impacts, most_sector, most_text
                 FROM policy_analyses WHERE id = ?1",
                params![analysis_id],
                |row| {
                    let analysis = PolicyAnalysis {
                        title: row.get(0)?,
                        date: row.get(1)?,
                        summary: row.get(2)?,
                        affected: row.get(3)?,
                        sector_impacts: BTreeMap::new(),
                        most_sector: row.get(5)?,
                        most_text: row.get(6)?,
                    };
                    Ok((analysis, row.get::<_, String>(4)?))
                },
            )
            .optional()?;

        match row {
            Some((mut analysis, impacts)) => {
                analysis.sector_impacts = serde_json::from_str(&impacts)?;
                Ok(Some(analysis))
            }
            None => Ok(None),
        }
    }

    fn count_analyses(&self) -> StorageResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM policy_analyses", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Statistics =====

    fn count_jobs_by_status(&self) -> StorageResult<HashMap<JobStatus, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM jobs GROUP BY status")?;

        let mut counts = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (status, count) = row?;
            if let Some(status) = JobStatus::from_db_string(&status) {
                counts.insert(status, count as u64);
            }
        }
        Ok(counts)
    }

    fn count_retry_exhausted(&self, max_attempts: u32) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM discovered_links WHERE extracted = 0 AND attempts >= ?1",
            params![max_attempts],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage_with_job() -> (SqliteStorage, i64) {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let job_id = storage.create_job("https://example.org/docs").unwrap();
        (storage, job_id)
    }

    #[test]
    fn test_new_job_is_in_progress() {
        let (storage, job_id) = storage_with_job();
        let job = storage.get_job(job_id).unwrap();
        assert_eq!(job.status, JobStatus::InProgress);
        assert_eq!(job.seed_url, "https://example.org/docs");
    }

    #[test]
    fn test_get_missing_job() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        assert!(matches!(
            storage.get_job(42),
            Err(StorageError::JobNotFound(42))
        ));
    }

    #[test]
    fn test_set_job_status_is_compare_and_set() {
        let (mut storage, job_id) = storage_with_job();

        assert!(storage
            .set_job_status(job_id, JobStatus::InProgress, JobStatus::Paused)
            .unwrap());
        // Stale expectation: the job is no longer in progress
        assert!(!storage
            .set_job_status(job_id, JobStatus::InProgress, JobStatus::Completed)
            .unwrap());
        assert_eq!(storage.get_job(job_id).unwrap().status, JobStatus::Paused);
    }

    #[test]
    fn test_duplicate_link_is_ignored() {
        let (mut storage, job_id) = storage_with_job();
        let url = "https://example.org/docs/a.pdf";

        let first = storage.insert_link(job_id, url, LinkKind::Pdf).unwrap();
        let second = storage.insert_link(job_id, url, LinkKind::Pdf).unwrap();

        assert!(matches!(first, LinkInsert::Created(_)));
        assert_eq!(second, LinkInsert::Duplicate);
        assert_eq!(storage.count_links(Some(job_id), None).unwrap(), 1);
    }

    #[test]
    fn test_same_url_in_two_jobs() {
        let (mut storage, job_a) = storage_with_job();
        let job_b = storage.create_job("https://example.org/docs").unwrap();
        let url = "https://example.org/docs/a.pdf";

        storage.insert_link(job_a, url, LinkKind::Pdf).unwrap();
        let second = storage.insert_link(job_b, url, LinkKind::Pdf).unwrap();

        assert!(matches!(second, LinkInsert::Created(_)));
        assert_eq!(storage.count_links(None, None).unwrap(), 2);
    }

    #[test]
    fn test_count_links_by_kind() {
        let (mut storage, job_id) = storage_with_job();
        storage
            .insert_link(job_id, "https://example.org/a.pdf", LinkKind::Pdf)
            .unwrap();
        storage
            .insert_link(job_id, "https://example.org/b.html", LinkKind::Html)
            .unwrap();
        storage
            .insert_link(job_id, "https://example.org/c.htm", LinkKind::Html)
            .unwrap();

        assert_eq!(storage.count_links(Some(job_id), Some(LinkKind::Pdf)).unwrap(), 1);
        assert_eq!(storage.count_links(Some(job_id), Some(LinkKind::Html)).unwrap(), 2);
        assert_eq!(storage.count_links(None, None).unwrap(), 3);
    }

    #[test]
    fn test_insert_extracted_is_idempotent() {
        let (mut storage, job_id) = storage_with_job();
        let LinkInsert::Created(link_id) = storage
            .insert_link(job_id, "https://example.org/a.pdf", LinkKind::Pdf)
            .unwrap()
        else {
            panic!("link should be new");
        };

        let first = storage.insert_extracted(link_id, "first").unwrap();
        let second = storage.insert_extracted(link_id, "second").unwrap();

        assert!(matches!(first, ExtractInsert::Created(_)));
        assert_eq!(second, ExtractInsert::AlreadyExtracted);
        assert_eq!(storage.count_extracted(None).unwrap(), 1);
        assert_eq!(storage.get_extracted(link_id).unwrap().unwrap().text, "first");
        assert!(storage.get_link(link_id).unwrap().extracted);
    }

    #[test]
    fn test_select_unextracted_respects_order_limit_and_attempts() {
        let (mut storage, job_id) = storage_with_job();
        let mut ids = Vec::new();
        for i in 0..5 {
            match storage
                .insert_link(job_id, &format!("https://example.org/{}.pdf", i), LinkKind::Pdf)
                .unwrap()
            {
                LinkInsert::Created(id) => ids.push(id),
                LinkInsert::Duplicate => panic!("unexpected duplicate"),
            }
        }

        storage.insert_extracted(ids[0], "done").unwrap();
        for _ in 0..3 {
            storage.record_failed_attempt(ids[1], "boom").unwrap();
        }

        let pending = storage.select_unextracted(2, 3, None).unwrap();
        let pending_ids: Vec<i64> = pending.iter().map(|l| l.id).collect();
        assert_eq!(pending_ids, vec![ids[2], ids[3]]);

        assert_eq!(storage.count_retry_exhausted(3).unwrap(), 1);
        let exhausted = storage.get_link(ids[1]).unwrap();
        assert_eq!(exhausted.attempts, 3);
        assert_eq!(exhausted.last_error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_select_unextracted_job_filter() {
        let (mut storage, job_a) = storage_with_job();
        let job_b = storage.create_job("https://example.com/").unwrap();
        storage
            .insert_link(job_a, "https://example.org/a.pdf", LinkKind::Pdf)
            .unwrap();
        storage
            .insert_link(job_b, "https://example.com/b.pdf", LinkKind::Pdf)
            .unwrap();

        let pending = storage.select_unextracted(10, 3, Some(job_b)).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].job_id, job_b);
    }

    #[test]
    fn test_deleting_job_cascades() {
        let (mut storage, job_id) = storage_with_job();
        if let LinkInsert::Created(link_id) = storage
            .insert_link(job_id, "https://example.org/a.pdf", LinkKind::Pdf)
            .unwrap()
        {
            storage.insert_extracted(link_id, "text").unwrap();
        }

        storage
            .conn
            .execute("DELETE FROM jobs WHERE id = ?1", params![job_id])
            .unwrap();

        assert_eq!(storage.count_links(None, None).unwrap(), 0);
        assert_eq!(storage.count_extracted(None).unwrap(), 0);
    }

    #[test]
    fn test_unknown_link_kind_is_corrupt_row() {
        let (mut storage, job_id) = storage_with_job();
        let LinkInsert::Created(link_id) = storage
            .insert_link(job_id, "https://example.org/a.pdf", LinkKind::Pdf)
            .unwrap()
        else {
            panic!("link should be new");
        };
        storage
            .conn
            .execute(
                "UPDATE discovered_links SET kind = 'docx' WHERE id = ?1",
                params![link_id],
            )
            .unwrap();

        assert!(matches!(
            storage.get_link(link_id),
            Err(StorageError::CorruptRow { table: "discovered_links", .. })
        ));
        assert!(matches!(
            storage.select_unextracted(10, 3, None),
            Err(StorageError::CorruptRow { .. })
        ));
    }

    #[test]
    fn test_count_jobs_by_status() {
        let (mut storage, job_id) = storage_with_job();
        storage.create_job("https://example.com/").unwrap();
        storage
            .set_job_status(job_id, JobStatus::InProgress, JobStatus::Completed)
            .unwrap();

        let counts = storage.count_jobs_by_status().unwrap();
        assert_eq!(counts.get(&JobStatus::InProgress), Some(&1));
        assert_eq!(counts.get(&JobStatus::Completed), Some(&1));
        assert_eq!(counts.get(&JobStatus::Paused), None);
    }

    #[test]
    fn test_analysis_roundtrip() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut impacts = BTreeMap::new();
        impacts.insert("Banking".to_string(), "Capital rules tighten.".to_string());
        let analysis = PolicyAnalysis {
            title: "Finance Act".to_string(),
            date: "1st March 2021".to_string(),
            summary: "A summary.".to_string(),
            affected: "Banks.".to_string(),
            sector_impacts: impacts,
            most_sector: "Banking".to_string(),
            most_text: "Capital rules tighten.".to_string(),
        };

        let id = storage
            .insert_analysis(&analysis, UploadSource::File, Some("act.pdf"), None)
            .unwrap();
        let loaded = storage.get_analysis(id).unwrap().unwrap();

        assert_eq!(loaded, analysis);
        assert_eq!(storage.count_analyses().unwrap(), 1);
    }
}

//! Integration tests for batch extraction
//!
//! Documents are served by wiremock; the PDF tiers are replaced with fakes
//! that treat the response body as the document's text layer.

use policy_harvester::batch::{BatchExtractor, BatchReport};
use policy_harvester::config::{ExtractionConfig, UserAgentConfig};
use policy_harvester::crawler::Fetcher;
use policy_harvester::extract::{
    ExtractError, OcrTier, Pipeline, PlainTextTier, PostProcess, StructuredTextTier, TextSpan,
};
use policy_harvester::storage::{SqliteStorage, Storage};
use policy_harvester::LinkKind;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Text layer is the body itself, in one 10pt span
struct BodyAsText;

impl StructuredTextTier for BodyAsText {
    fn spans(&self, bytes: &[u8]) -> Result<Vec<TextSpan>, ExtractError> {
        Ok(vec![TextSpan {
            text: String::from_utf8_lossy(bytes).into_owned(),
            font_size: 10.0,
        }])
    }
}

struct NoText;

impl PlainTextTier for NoText {
    fn text(&self, _bytes: &[u8]) -> Result<String, ExtractError> {
        Ok(String::new())
    }
}

impl OcrTier for NoText {
    fn pages(&self, _bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
        Ok(Vec::new())
    }
}

struct Harness {
    _dir: TempDir,
    storage: Arc<Mutex<SqliteStorage>>,
    extractor: BatchExtractor,
    job_id: i64,
}

fn create_harness(config: ExtractionConfig) -> Harness {
    let dir = TempDir::new().unwrap();
    let mut storage = SqliteStorage::new(&dir.path().join("harvest.db")).unwrap();
    let job_id = storage.create_job("http://127.0.0.1/docs").unwrap();
    let storage = Arc::new(Mutex::new(storage));

    let fetcher = Fetcher::from_config(
        &UserAgentConfig {
            crawler_name: "TestHarvester".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
        },
        Duration::from_secs(5),
    )
    .unwrap();

    let pipeline = Pipeline::new(
        Box::new(BodyAsText),
        Box::new(NoText),
        Box::new(NoText),
        PostProcess::from_config(&config).unwrap(),
    );

    let extractor = BatchExtractor::new(
        Arc::clone(&storage),
        fetcher,
        Arc::new(pipeline),
        config,
    );

    Harness {
        _dir: dir,
        storage,
        extractor,
        job_id,
    }
}

impl Harness {
    fn add_link(&self, url: String, kind: LinkKind) -> i64 {
        let mut storage = self.storage.lock().unwrap();
        storage.insert_link(self.job_id, &url, kind).unwrap();
        storage
            .get_links_for_job(self.job_id)
            .unwrap()
            .into_iter()
            .find(|link| link.url == url)
            .unwrap()
            .id
    }

    fn remaining(&self) -> usize {
        self.storage
            .lock()
            .unwrap()
            .select_unextracted(10_000, 3, None)
            .unwrap()
            .len()
    }
}

fn pdf(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "application/pdf")
        .set_body_bytes(body.as_bytes().to_vec())
}

#[tokio::test]
async fn test_batch_is_bounded_by_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/docs/\d+\.pdf$"))
        .respond_with(pdf("The policy sets new limits. It applies from May."))
        .expect(100)
        .mount(&server)
        .await;

    let config = ExtractionConfig {
        concurrency: 8,
        ..ExtractionConfig::default()
    };
    let harness = create_harness(config);
    for i in 0..250 {
        harness.add_link(format!("{}/docs/{}.pdf", server.uri(), i), LinkKind::Pdf);
    }

    let report = harness
        .extractor
        .process_next_batch(Some(100), None)
        .await
        .unwrap();

    assert_eq!(report.attempted, 100);
    assert_eq!(report.succeeded, 100);
    assert_eq!(harness.remaining(), 150);

    let storage = harness.storage.lock().unwrap();
    assert_eq!(storage.count_extracted(None).unwrap(), 100);
}

#[tokio::test]
async fn test_extracted_text_is_stored_in_document_format() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/a.pdf"))
        .respond_with(pdf("New compliance rules apply. Banks must report."))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/docs/b.html"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<h1>Water Strategy</h1><p>Rivers first.</p>"),
        )
        .mount(&server)
        .await;

    let harness = create_harness(ExtractionConfig::default());
    let pdf_id = harness.add_link(format!("{}/docs/a.pdf", server.uri()), LinkKind::Pdf);
    let html_id = harness.add_link(format!("{}/docs/b.html", server.uri()), LinkKind::Html);

    let report = harness
        .extractor
        .process_next_batch(None, None)
        .await
        .unwrap();
    assert_eq!(report.succeeded, 2);

    let storage = harness.storage.lock().unwrap();
    let pdf_text = storage.get_extracted(pdf_id).unwrap().unwrap().text;
    assert!(pdf_text.starts_with("HEADINGS:\n"));
    assert!(pdf_text.contains("**compliance**"));

    let html_text = storage.get_extracted(html_id).unwrap().unwrap().text;
    assert!(html_text.starts_with("SUMMARY:\n"));
    assert!(html_text.contains("# Water Strategy"));
    assert!(storage.get_link(html_id).unwrap().extracted);
}

#[tokio::test]
async fn test_stored_text_is_truncated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/long.pdf"))
        .respond_with(pdf(&"word ".repeat(5000)))
        .mount(&server)
        .await;

    let config = ExtractionConfig {
        max_text_chars: 500,
        ..ExtractionConfig::default()
    };
    let harness = create_harness(config);
    let id = harness.add_link(format!("{}/docs/long.pdf", server.uri()), LinkKind::Pdf);

    harness
        .extractor
        .process_next_batch(None, None)
        .await
        .unwrap();

    let storage = harness.storage.lock().unwrap();
    let text = storage.get_extracted(id).unwrap().unwrap().text;
    assert_eq!(text.chars().count(), 500);
}

#[tokio::test]
async fn test_non_pdf_response_counts_as_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/fake.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<p>Not found</p>"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/docs/real.pdf"))
        .respond_with(pdf("A real policy."))
        .mount(&server)
        .await;

    let harness = create_harness(ExtractionConfig::default());
    let fake = harness.add_link(format!("{}/docs/fake.pdf", server.uri()), LinkKind::Pdf);
    harness.add_link(format!("{}/docs/real.pdf", server.uri()), LinkKind::Pdf);

    let report = harness
        .extractor
        .process_next_batch(None, None)
        .await
        .unwrap();

    assert_eq!(
        report,
        BatchReport {
            attempted: 2,
            succeeded: 1,
            skipped: 0,
            empty: 0,
            failed: 1,
        }
    );

    let storage = harness.storage.lock().unwrap();
    let link = storage.get_link(fake).unwrap();
    assert_eq!(link.attempts, 1);
    assert!(!link.extracted);
    assert!(link.last_error.unwrap().contains("Expected a PDF"));
    assert!(storage.get_extracted(fake).unwrap().is_none());
}

#[tokio::test]
async fn test_empty_document_records_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/blank.pdf"))
        .respond_with(pdf("   \n  "))
        .mount(&server)
        .await;

    let harness = create_harness(ExtractionConfig::default());
    let id = harness.add_link(format!("{}/docs/blank.pdf", server.uri()), LinkKind::Pdf);

    let report = harness
        .extractor
        .process_next_batch(None, None)
        .await
        .unwrap();

    assert_eq!(report.attempted, 1);
    assert_eq!(report.empty, 1);
    let storage = harness.storage.lock().unwrap();
    assert_eq!(storage.get_link(id).unwrap().attempts, 1);
    assert!(storage.get_extracted(id).unwrap().is_none());
}

#[tokio::test]
async fn test_failing_link_stops_after_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/gone.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .expect(3)
        .mount(&server)
        .await;

    let harness = create_harness(ExtractionConfig::default());
    harness.add_link(format!("{}/docs/gone.pdf", server.uri()), LinkKind::Pdf);

    for _ in 0..3 {
        let report = harness
            .extractor
            .process_next_batch(None, None)
            .await
            .unwrap();
        assert_eq!(report.failed, 1);
    }

    let report = harness
        .extractor
        .process_next_batch(None, None)
        .await
        .unwrap();
    assert_eq!(report.attempted, 0);
    assert_eq!(harness.remaining(), 0);

    let storage = harness.storage.lock().unwrap();
    assert_eq!(storage.count_retry_exhausted(3).unwrap(), 1);
}

#[tokio::test]
async fn test_second_batch_does_not_reprocess_extracted_links() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/a.pdf"))
        .respond_with(pdf("One policy."))
        .expect(1)
        .mount(&server)
        .await;

    let harness = create_harness(ExtractionConfig::default());
    harness.add_link(format!("{}/docs/a.pdf", server.uri()), LinkKind::Pdf);

    let first = harness
        .extractor
        .process_next_batch(None, None)
        .await
        .unwrap();
    let second = harness
        .extractor
        .process_next_batch(None, None)
        .await
        .unwrap();

    assert_eq!(first.succeeded, 1);
    assert_eq!(second.attempted, 0);
    let storage = harness.storage.lock().unwrap();
    assert_eq!(storage.count_extracted(None).unwrap(), 1);
}

#[tokio::test]
async fn test_job_filter_limits_selection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(pdf("Policy."))
        .mount(&server)
        .await;

    let harness = create_harness(ExtractionConfig::default());
    harness.add_link(format!("{}/docs/a.pdf", server.uri()), LinkKind::Pdf);
    let other_job = harness
        .storage
        .lock()
        .unwrap()
        .create_job("http://127.0.0.1/other")
        .unwrap();
    harness
        .storage
        .lock()
        .unwrap()
        .insert_link(other_job, &format!("{}/other/b.pdf", server.uri()), LinkKind::Pdf)
        .unwrap();

    let report = harness
        .extractor
        .process_next_batch(None, Some(other_job))
        .await
        .unwrap();

    assert_eq!(report.succeeded, 1);
    let storage = harness.storage.lock().unwrap();
    assert_eq!(storage.count_extracted(Some(other_job)).unwrap(), 1);
    assert_eq!(storage.count_extracted(Some(harness.job_id)).unwrap(), 0);
}

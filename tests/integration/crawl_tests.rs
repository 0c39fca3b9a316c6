//! Integration tests for the crawler
//!
//! These tests use wiremock to serve paginated listing pages and test
//! job submission, discovery and the job lifecycle end-to-end.

use policy_harvester::config::{
    Config, CrawlDriver, CrawlerConfig, ExtractionConfig, FetchConfig, OutputConfig,
    UserAgentConfig,
};
use policy_harvester::crawler::{Coordinator, CrawlError, HttpPageSource, SessionOutcome};
use policy_harvester::storage::{SqliteStorage, Storage};
use policy_harvester::{HarvestError, JobStatus, LinkKind};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with no delay between pages
fn create_test_config(db_path: &str) -> Config {
    Config {
        crawler: CrawlerConfig {
            driver: CrawlDriver::Http,
            page_delay_ms: 0,
            max_pages: 50,
            navigation_timeout_secs: 5,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestHarvester".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
        },
        fetch: FetchConfig { timeout_secs: 5 },
        extraction: ExtractionConfig::default(),
        output: OutputConfig {
            database_path: db_path.to_string(),
        },
        summarizer: None,
    }
}

fn create_coordinator(dir: &TempDir) -> Coordinator {
    let db_path = dir.path().join("harvest.db");
    let storage = SqliteStorage::new(&db_path).expect("Failed to open database");
    Coordinator::with_storage(
        create_test_config(db_path.to_str().unwrap()),
        Arc::new(Mutex::new(storage)),
    )
    .expect("Failed to create coordinator")
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body)
}

/// Mounts a two page listing under /docs
async fn mount_listing(server: &MockServer) {
    let first = r#"<html><body>
        <a href="/docs/a.pdf">Annual report</a>
        <a href="/docs/b.html?x=1">Search result</a>
        <a href="https://other.org/c.pdf">Elsewhere</a>
        <a href="/docs/page/2">Next &raquo;</a>
    </body></html>"#;
    let second = r#"<html><body>
        <a href="/docs/a.pdf">Annual report again</a>
        <a href="/docs/d.pdf">Strategy</a>
        <a href="/publications/water-review">Water review</a>
        <a href="/about">About us</a>
    </body></html>"#;

    Mock::given(method("GET"))
        .and(path("/docs"))
        .respond_with(html(first.to_string()))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/docs/page/2"))
        .respond_with(html(second.to_string()))
        .mount(server)
        .await;
}

fn discovered_urls(coordinator: &Coordinator, job_id: i64) -> Vec<String> {
    let storage = coordinator.storage();
    let storage = storage.lock().unwrap();
    storage
        .get_links_for_job(job_id)
        .unwrap()
        .into_iter()
        .map(|link| link.url)
        .collect()
}

#[tokio::test]
async fn test_single_page_discovers_only_same_origin_documents() {
    let server = MockServer::start().await;
    let base = server.uri();

    let page = r#"<a href="/docs/a.pdf">A</a>
        <a href="/docs/b.html?x=1">B</a>
        <a href="https://other.org/c.pdf">C</a>"#
        .to_string();
    Mock::given(method("GET"))
        .and(path("/docs"))
        .respond_with(html(page))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let coordinator = create_coordinator(&dir);
    let job_id = coordinator.submit_job(&format!("{}/docs", base)).unwrap();

    let report = coordinator.run_job(job_id).await.unwrap();

    assert_eq!(
        discovered_urls(&coordinator, job_id),
        vec![format!("{}/docs/a.pdf", base)]
    );
    let session = report.session.expect("a session should have run");
    assert_eq!(session.pages_visited, 1);
    assert_eq!(session.new_links, 1);
    assert_eq!(session.outcome, SessionOutcome::Exhausted);
    assert_eq!(report.summary.job.status, JobStatus::Completed);
    assert_eq!(report.summary.pdf_count, 1);
    assert_eq!(report.summary.html_count, 0);
}

#[tokio::test]
async fn test_full_crawl_follows_pagination() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_listing(&server).await;

    let dir = TempDir::new().unwrap();
    let coordinator = create_coordinator(&dir);
    let job_id = coordinator.submit_job(&format!("{}/docs", base)).unwrap();

    let report = coordinator.run_job(job_id).await.unwrap();
    let session = report.session.unwrap();

    assert_eq!(session.pages_visited, 2);
    assert_eq!(session.new_links, 3);
    assert_eq!(session.duplicates, 1);
    assert_eq!(
        discovered_urls(&coordinator, job_id),
        vec![
            format!("{}/docs/a.pdf", base),
            format!("{}/docs/d.pdf", base),
            format!("{}/publications/water-review", base),
        ]
    );

    let summary = report.summary;
    assert_eq!(summary.job.status, JobStatus::Completed);
    assert_eq!(summary.pdf_count, 2);
    assert_eq!(summary.html_count, 1);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.extracted, 0);

    let storage = coordinator.storage();
    let storage = storage.lock().unwrap();
    assert_eq!(storage.count_links(Some(job_id), Some(LinkKind::Pdf)).unwrap(), 2);
}

#[tokio::test]
async fn test_rerunning_session_adds_no_rows() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_listing(&server).await;

    let dir = TempDir::new().unwrap();
    let coordinator = create_coordinator(&dir);
    let job_id = coordinator.submit_job(&format!("{}/docs", base)).unwrap();
    let job = coordinator.storage().lock().unwrap().get_job(job_id).unwrap();

    let mut source = HttpPageSource::new(coordinator.fetcher().clone());
    let first = coordinator.crawl_session(&job, &mut source).await.unwrap();
    let mut source = HttpPageSource::new(coordinator.fetcher().clone());
    let second = coordinator.crawl_session(&job, &mut source).await.unwrap();

    assert_eq!(first.new_links, 3);
    assert_eq!(second.new_links, 0);
    assert_eq!(second.duplicates, 4);
    assert_eq!(discovered_urls(&coordinator, job_id).len(), 3);
}

#[tokio::test]
async fn test_paused_job_is_not_crawled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html("<a href=\"/docs/a.pdf\">A</a>".to_string()))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let coordinator = create_coordinator(&dir);
    let job_id = coordinator
        .submit_job(&format!("{}/docs", server.uri()))
        .unwrap();

    assert_eq!(coordinator.pause_job(job_id).unwrap(), JobStatus::Paused);

    let report = coordinator.run_job(job_id).await.unwrap();
    assert!(report.session.is_none());
    assert_eq!(report.summary.job.status, JobStatus::Paused);
    assert_eq!(report.summary.total, 0);
}

#[tokio::test]
async fn test_pause_and_resume_restores_in_progress() {
    let dir = TempDir::new().unwrap();
    let coordinator = create_coordinator(&dir);
    let job_id = coordinator.submit_job("https://example.org/docs").unwrap();

    assert_eq!(coordinator.pause_job(job_id).unwrap(), JobStatus::Paused);
    assert_eq!(coordinator.pause_job(job_id).unwrap(), JobStatus::Paused);
    assert_eq!(coordinator.resume_job(job_id).unwrap(), JobStatus::InProgress);
    assert_eq!(
        coordinator.job_summary(job_id).unwrap().job.status,
        JobStatus::InProgress
    );
}

#[tokio::test]
async fn test_completed_job_rejects_resume() {
    let server = MockServer::start().await;
    mount_listing(&server).await;

    let dir = TempDir::new().unwrap();
    let coordinator = create_coordinator(&dir);
    let job_id = coordinator
        .submit_job(&format!("{}/docs", server.uri()))
        .unwrap();
    coordinator.run_job(job_id).await.unwrap();

    let err = coordinator.resume_job(job_id).unwrap_err();
    assert!(matches!(
        err,
        HarvestError::InvalidTransition {
            from: JobStatus::Completed,
            ..
        }
    ));

    // A completed job only reports its summary
    let report = coordinator.run_job(job_id).await.unwrap();
    assert!(report.session.is_none());
    assert_eq!(report.summary.total, 3);
}

#[tokio::test]
async fn test_unreachable_seed_leaves_job_in_progress() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let coordinator = create_coordinator(&dir);
    let job_id = coordinator
        .submit_job(&format!("{}/docs", server.uri()))
        .unwrap();

    let err = coordinator.run_job(job_id).await.unwrap_err();
    assert!(matches!(
        err,
        HarvestError::Crawl(CrawlError::SeedUnavailable { .. })
    ));
    assert_eq!(
        coordinator.job_summary(job_id).unwrap().job.status,
        JobStatus::InProgress
    );
}

#[tokio::test]
async fn test_page_cap_completes_job() {
    let server = MockServer::start().await;
    mount_listing(&server).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("harvest.db");
    let mut config = create_test_config(db_path.to_str().unwrap());
    config.crawler.max_pages = 1;
    let coordinator = Coordinator::with_storage(
        config,
        Arc::new(Mutex::new(SqliteStorage::new(&db_path).unwrap())),
    )
    .unwrap();
    let job_id = coordinator
        .submit_job(&format!("{}/docs", server.uri()))
        .unwrap();

    let report = coordinator.run_job(job_id).await.unwrap();
    let session = report.session.unwrap();
    assert_eq!(session.pages_visited, 1);
    assert_eq!(session.outcome, SessionOutcome::PageLimitReached);
    assert_eq!(report.summary.job.status, JobStatus::Completed);
}

#[test]
fn test_submit_rejects_non_http_seed() {
    let dir = TempDir::new().unwrap();
    let coordinator = create_coordinator(&dir);
    assert!(matches!(
        coordinator.submit_job("ftp://example.org/docs"),
        Err(HarvestError::UrlError(_))
    ));
}

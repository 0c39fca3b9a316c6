//! Integration tests for policy analysis
//!
//! A wiremock server stands in for the chat-completions service and answers
//! each prompt by matching on its wording.

use policy_harvester::analysis::{analyze_document, AnalysisError, ModelClient};
use policy_harvester::config::SummarizerConfig;
use policy_harvester::storage::{SqliteStorage, Storage, UploadSource};
use policy_harvester::{ConfigError, HarvestError};
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DOCUMENT: &str = "This Act may be cited as the Clean Rivers Act.\n\
    Made on 4th June 2021.\n\
    Water companies must publish discharge data every month.";

fn completion(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_json(json!({"choices": [{"message": {"role": "assistant", "content": content}}]}))
}

async fn answer(server: &MockServer, prompt_fragment: &str, content: &str) {
    Mock::given(method("POST"))
        .and(body_string_contains(prompt_fragment))
        .respond_with(completion(content))
        .mount(server)
        .await;
}

fn client(server: &MockServer) -> ModelClient {
    ModelClient::new(
        format!("{}/api/v1/chat/completions", server.uri()),
        "test-model",
        "test-key",
        None,
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn test_analysis_collects_sector_impacts() {
    let server = MockServer::start().await;
    answer(&server, "clear professional summary", "Sets river discharge rules.").await;
    answer(&server, "briefly list", "Water companies and regulators.").await;
    answer(
        &server,
        "affects the banking sector",
        "Banks financing utilities face disclosure duties.",
    )
    .await;
    answer(
        &server,
        "affects the environmental sector",
        "Rivers benefit from stricter discharge monitoring and public reporting of spills.",
    )
    .await;
    answer(&server, "affects the legal sector", "N/A").await;
    answer(&server, "affects the public sector", "Not mentioned").await;

    let analysis = analyze_document(DOCUMENT, &client(&server), Duration::ZERO)
        .await
        .unwrap();

    assert_eq!(analysis.title, "Clean Rivers Act");
    assert_eq!(analysis.date, "4th June 2021");
    assert_eq!(analysis.summary, "Sets river discharge rules.");
    assert_eq!(analysis.affected, "Water companies and regulators.");
    assert_eq!(
        analysis.sector_impacts.keys().collect::<Vec<_>>(),
        vec!["Banking", "Environment"]
    );
    assert_eq!(analysis.most_sector, "Environment");
    assert!(analysis.most_text.starts_with("Rivers benefit"));
}

#[tokio::test]
async fn test_analysis_without_sector_answers_uses_defaults() {
    let server = MockServer::start().await;
    answer(&server, "clear professional summary", "A summary.").await;
    answer(&server, "briefly list", "Nobody in particular.").await;

    let analysis = analyze_document("Short note with no date.", &client(&server), Duration::ZERO)
        .await
        .unwrap();

    assert_eq!(analysis.title, "Short note with no date.");
    assert_eq!(analysis.date, "Not specified");
    assert!(analysis.sector_impacts.is_empty());
    assert_eq!(analysis.most_sector, "None");
    assert_eq!(analysis.most_text, "No sector significantly mentioned.");
}

#[tokio::test]
async fn test_failed_summary_fails_analysis() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": {"message": "No auth"}})),
        )
        .mount(&server)
        .await;

    let err = analyze_document(DOCUMENT, &client(&server), Duration::ZERO)
        .await
        .unwrap_err();

    match err {
        AnalysisError::Model(message) => assert!(message.contains("No auth")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_analysis_is_stored() {
    let server = MockServer::start().await;
    answer(&server, "clear professional summary", "Sets river discharge rules.").await;
    answer(&server, "briefly list", "Water companies.").await;
    answer(&server, "affects the employment sector", "Creates monitoring jobs.").await;

    let analysis = analyze_document(DOCUMENT, &client(&server), Duration::ZERO)
        .await
        .unwrap();

    let dir = TempDir::new().unwrap();
    let mut storage = SqliteStorage::new(&dir.path().join("harvest.db")).unwrap();
    let id = storage
        .insert_analysis(&analysis, UploadSource::File, Some("rivers.pdf"), None)
        .unwrap();

    assert_eq!(storage.count_analyses().unwrap(), 1);
    assert_eq!(storage.get_analysis(id).unwrap(), Some(analysis));
}

#[test]
fn test_client_requires_api_key_env() {
    let config = SummarizerConfig {
        endpoint: "https://openrouter.ai/api/v1/chat/completions".to_string(),
        model: "test-model".to_string(),
        api_key_env: "POLICY_HARVESTER_TEST_UNSET_KEY".to_string(),
        referer: None,
        timeout_secs: 30,
        throttle_ms: 0,
    };

    assert!(matches!(
        ModelClient::from_config(&config),
        Err(HarvestError::Config(ConfigError::MissingEnv(_)))
    ));
}

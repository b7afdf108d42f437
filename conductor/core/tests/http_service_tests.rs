//! Integration tests for the HTTP analysis service client.
//!
//! A wiremock server stands in for the analysis service so these tests cover
//! the real request/response path: endpoint paths, JSON bodies, status
//! handling and decode failures.

use std::time::Duration;

use photo_search_core::config::ServiceConfig;
use photo_search_core::service::{AnalysisService, HttpAnalysisService};
use photo_search_core::{
    ControllerConfig, FetchError, PictureCatalog, SearchController, SearchMessage,
    TimelineTiming,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::mpsc;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> HttpAnalysisService {
    HttpAnalysisService::from_config(&ServiceConfig {
        url: server.uri(),
        timeout: Duration::from_secs(5),
    })
    .expect("Failed to build client")
}

fn catalog_body() -> serde_json::Value {
    json!({
        "pictures": [
            {"name": "horse.jpg", "type": "animals", "tags": ["horse", "rider"], "url": "/data/horse.jpg", "score": null},
            {"name": "car.jpg", "type": "vehicles", "tags": ["car", "red"], "url": "/data/car.jpg", "score": null},
            {"name": "dog.jpg", "type": "animals", "tags": ["dog"], "url": "/data/dog.jpg", "score": null}
        ],
        "total": 3
    })
}

#[tokio::test]
async fn test_pictures_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pictures"))
        .respond_with(ResponseTemplate::new(200).set_body_json(catalog_body()))
        .expect(1)
        .mount(&server)
        .await;

    let pictures = client(&server).pictures().await.unwrap();
    assert_eq!(pictures.len(), 3);
    assert_eq!(pictures[0].kind, "animals");
    assert_eq!(pictures[1].url, "/data/car.jpg");
}

#[tokio::test]
async fn test_catalog_load_failure_leaves_empty_catalog() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pictures"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut catalog = PictureCatalog::new();
    let err = catalog.load(&client(&server)).await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 500, .. }));
    assert!(catalog.is_empty());
}

#[tokio::test]
async fn test_process_steps_posts_query_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/process-steps"))
        .and(body_json(json!({"text": "მიპოვე ფოტო რომელშიც ჩანს წითელი მანქანა"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "steps": [
                {"id": 1, "title": "Analyzing Georgian query...", "input": "მიპოვე ფოტო", "output": "Photo search query detected"},
                {"id": 2, "title": "Extracting photo count...", "output": "Not specified (showing all)"},
                {"id": 5, "title": "Searching in picture database...", "input": "წითელი მანქანა"}
            ],
            "final_result": {
                "original": "მიპოვე ფოტო რომელშიც ჩანს წითელი მანქანა",
                "is_photo_search": true,
                "simplified_query": "წითელი მანქანა",
                "photo_count": null,
                "processing_type": "simplify_pipeline",
                "search_results": [],
                "has_search_results": false
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let definitions = client(&server)
        .process_steps("მიპოვე ფოტო რომელშიც ჩანს წითელი მანქანა")
        .await
        .unwrap();
    let ids: Vec<u32> = definitions.steps.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![1, 2, 5]);
    assert_eq!(definitions.final_result.photo_count, None);
    assert_eq!(
        definitions.final_result.simplified_query.as_deref(),
        Some("წითელი მანქანა")
    );
}

#[tokio::test]
async fn test_process_steps_unsuccessful_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/process-steps"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": false, "error": "model offline"})),
        )
        .mount(&server)
        .await;

    let err = client(&server).process_steps("q").await.unwrap_err();
    assert!(matches!(err, FetchError::Unsuccessful { .. }));
    assert_eq!(err.endpoint(), "/process-steps");
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agent"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client(&server).classify("q").await.unwrap_err();
    assert!(matches!(err, FetchError::Decode { .. }));
}

#[tokio::test]
async fn test_agent_classification() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/agent"))
        .and(body_json(json!({"text": "რა კარგი დღეა"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": {"original": "რა კარგი დღეა", "is_photo_search": false}
        })))
        .mount(&server)
        .await;

    let result = client(&server).classify("რა კარგი დღეა").await.unwrap();
    assert!(!result.is_photo_search);
    assert_eq!(result.original, "რა კარგი დღეა");
}

#[tokio::test]
async fn test_health_and_examples() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "healthy",
            "message": "Georgian Language Processing API is running"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/examples"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "correction": ["გამარჯობა"],
            "photo_agent": ["მიპოვე ძაღლი", "მიპოვე კატა"]
        })))
        .mount(&server)
        .await;

    let service = client(&server);
    assert!(service.health_check().await);
    let examples = service.examples().await.unwrap();
    assert_eq!(examples.photo_agent, vec!["მიპოვე ძაღლი", "მიპოვე კატა"]);
}

#[tokio::test]
async fn test_health_check_unreachable() {
    let service =
        HttpAnalysisService::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
    assert!(!service.health_check().await);
}

#[tokio::test]
async fn test_fetch_image_bytes_and_missing_image() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/horse.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/missing.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let service = client(&server);
    let bytes = service.fetch_image("/data/horse.jpg").await.unwrap();
    assert_eq!(bytes.len(), 4);

    let err = service.fetch_image("/data/missing.jpg").await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 404, .. }));
}

/// Step definitions fail, `/agent` answers: the controller falls back over
/// the real HTTP path and reveals without a timeline.
#[tokio::test]
async fn test_controller_fallback_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pictures"))
        .respond_with(ResponseTemplate::new(200).set_body_json(catalog_body()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/process-steps"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/agent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": {
                "original": "მინახე 2 ფოტო",
                "is_photo_search": true,
                "simplified_query": "ძაღლი",
                "photo_count": 2,
                "processing_type": "basic"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let config = ControllerConfig {
        timing: TimelineTiming {
            settle_delay: Duration::from_millis(50),
            ..TimelineTiming::default()
        },
        ..ControllerConfig::default()
    };
    let mut controller = SearchController::new(client(&server), config, tx);
    controller.start().await;
    controller.set_query("მინახე 2 ფოტო");
    assert!(controller.submit().is_started());
    controller.run_until_idle().await;

    let session = controller.session();
    assert!(session.steps.is_empty());
    assert!(session.search_completed);
    assert!(!session.loading);
    assert_eq!(session.pictures.len(), 2);
    assert_eq!(session.pictures[0].name, "horse.jpg");

    let mut saw_fallback = false;
    while let Ok(msg) = rx.try_recv() {
        saw_fallback |= matches!(msg, SearchMessage::FallbackUsed { .. });
    }
    assert!(saw_fallback);
}

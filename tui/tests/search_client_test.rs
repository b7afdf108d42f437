//! Search Client Integration Tests
//!
//! Drives the TUI's search client against an in-memory analysis service and
//! feeds everything it emits through DisplayState, the way the App does each
//! frame. Time is paused so the step timeline runs instantly.

use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tokio_test::assert_ok;

use photo_search_core::{
    AnalysisService, ControllerConfig, FetchError, PictureEntry, SearchMessage, SearchResult,
    StepDefinition, StepDefinitions, StepStatus,
};
use photo_search_tui::display::{
    picture_panel_title, result_lines, visible_pictures, DisplayState, DisplayStatus,
};
use photo_search_tui::SearchClient;

// =============================================================================
// Test Infrastructure
// =============================================================================

struct MockService {
    pictures: Vec<PictureEntry>,
    step_ids: Vec<u32>,
}

impl MockService {
    fn new(count: usize) -> Self {
        Self {
            pictures: (0..count)
                .map(|i| PictureEntry {
                    name: format!("picture_{i}.jpg"),
                    url: format!("/data/picture_{i}.jpg"),
                    kind: "animals".to_string(),
                    tags: vec!["dog".to_string(), "park".to_string()],
                })
                .collect(),
            step_ids: vec![1, 2, 5],
        }
    }

    fn with_step_count(mut self, count: u32) -> Self {
        self.step_ids = (1..=count).collect();
        self
    }
}

#[async_trait]
impl AnalysisService for MockService {
    fn name(&self) -> &str {
        "mock"
    }

    fn origin(&self) -> &str {
        "http://mock"
    }

    async fn health_check(&self) -> bool {
        true
    }

    async fn pictures(&self) -> Result<Vec<PictureEntry>, FetchError> {
        Ok(self.pictures.clone())
    }

    async fn process_steps(&self, text: &str) -> Result<StepDefinitions, FetchError> {
        Ok(StepDefinitions {
            steps: self
                .step_ids
                .iter()
                .map(|&id| StepDefinition {
                    id,
                    title: format!("Step {id}"),
                    input: Some(text.to_string()),
                    output: None,
                })
                .collect(),
            final_result: SearchResult {
                original: text.to_string(),
                is_photo_search: true,
                simplified_query: Some("ძაღლი".to_string()),
                photo_count: Some(2),
                processing_type: Some("simplify_pipeline".to_string()),
            },
        })
    }

    async fn classify(&self, _text: &str) -> Result<SearchResult, FetchError> {
        Err(FetchError::Unsuccessful {
            endpoint: "/agent".to_string(),
        })
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if url.ends_with("picture_1.jpg") {
            return Err(FetchError::Status {
                endpoint: url.to_string(),
                status: 404,
            });
        }
        Ok(vec![0u8; 1024])
    }
}

/// One App frame: poll the controller and apply everything it sent
async fn frame(client: &mut SearchClient<MockService>, display: &mut DisplayState) {
    tokio::time::sleep(Duration::from_millis(100)).await;
    client.poll();
    for msg in client.recv_all() {
        display.apply_message(&msg);
    }
    for image in client.recv_images() {
        display.apply_image(image);
    }
}

async fn started(count: usize) -> (SearchClient<MockService>, DisplayState) {
    let mut client = SearchClient::new(MockService::new(count), ControllerConfig::default());
    let mut display = DisplayState::new();
    client.start().await;
    for msg in client.recv_all() {
        display.apply_message(&msg);
    }
    (client, display)
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_start_shows_catalog() {
    let (client, display) = started(6).await;
    assert_eq!(display.status, DisplayStatus::Ready);
    assert_eq!(display.catalog_count, Some(6));
    assert_eq!(client.examples().len(), 4);
    assert_eq!(picture_panel_title(client.session()), "Available Pictures");
    assert_eq!(
        visible_pictures(client.session(), client.catalog()).len(),
        6
    );
}

#[tokio::test(start_paused = true)]
async fn test_search_cycle_through_display() {
    let (mut client, mut display) = started(6).await;

    assert!(client.select_example(3));
    assert!(client.submit().is_started());
    assert!(!client.set_query("typing while loading"));

    // First frames: steps arrive, nothing revealed yet
    frame(&mut client, &mut display).await;
    assert_eq!(display.status, DisplayStatus::Searching);
    assert_eq!(client.session().steps.len(), 3);
    assert!(result_lines(client.session()).is_empty());

    // Drive until the terminal step completes and the reveal fires
    while !client.session().search_completed {
        frame(&mut client, &mut display).await;
    }
    assert_eq!(picture_panel_title(client.session()), "Found Pictures (2)");
    assert!(client
        .session()
        .steps
        .iter()
        .all(|s| s.status == StepStatus::Completed));
    assert!(result_lines(client.session()).contains(&("Found", "2".to_string())));

    // Then until loading settles
    while client.is_loading() {
        frame(&mut client, &mut display).await;
    }
    assert_eq!(display.status, DisplayStatus::Ready);
    assert_eq!(display.activity.back().unwrap(), "#1 settled");
}

#[tokio::test(start_paused = true)]
async fn test_reset_returns_to_catalog() {
    let (mut client, mut display) = started(3).await;
    client.set_query("მიპოვე ძაღლი");
    client.submit();
    frame(&mut client, &mut display).await;

    client.reset();
    frame(&mut client, &mut display).await;

    assert!(client.session().steps.is_empty());
    assert!(client.session().query.is_empty());
    assert!(!client.is_loading());
    assert_eq!(display.status, DisplayStatus::Ready);
    assert_eq!(picture_panel_title(client.session()), "Available Pictures");
}

#[tokio::test(start_paused = true)]
async fn test_images_fetched_once_and_failures_omitted() {
    let (mut client, mut display) = started(3).await;

    for picture in ["/data/picture_0.jpg", "/data/picture_1.jpg"] {
        assert!(client.request_image(picture));
        display.image_requested(picture);
    }
    assert!(!client.request_image("/data/picture_0.jpg"));
    assert_eq!(
        display.image_marker("/data/picture_0.jpg").as_deref(),
        Some("[loading image]")
    );

    frame(&mut client, &mut display).await;

    assert_eq!(
        display.image_marker("/data/picture_0.jpg").as_deref(),
        Some("[image 1.0 KB]")
    );
    assert_eq!(display.image_marker("/data/picture_1.jpg"), None);
}

#[tokio::test(start_paused = true)]
async fn test_long_timeline_with_stalled_surface() {
    let service = MockService::new(3).with_step_count(60);
    let mut client = SearchClient::new(service, ControllerConfig::default());
    client.start().await;
    client.set_query("მიპოვე ძაღლი");
    assert!(client.submit().is_started());

    // Steps arrive and the timeline is scheduled
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(client.poll());
    assert_eq!(client.session().steps.len(), 60);

    // The surface neither polls nor drains while the whole timeline fires
    tokio::time::sleep(Duration::from_secs(200)).await;
    let changed =
        assert_ok!(tokio::time::timeout(Duration::from_secs(5), async { client.poll() }).await);
    assert!(changed);

    assert!(!client.is_loading());
    assert!(client.session().search_completed);
    assert!(client
        .session()
        .steps
        .iter()
        .all(|s| s.status == StepStatus::Completed));

    let messages = client.recv_all();
    assert!(messages.len() > 120);
    assert!(matches!(messages.last(), Some(SearchMessage::Settled { .. })));
}

//! Analysis Service Traits
//!
//! Wire types and the trait the controller talks to. The remote service owns
//! query classification and picture storage; this crate only consumes its
//! answers, so everything here describes the boundary and nothing more.
//!
//! Implementations handle transport details (HTTP, timeouts, status codes)
//! and map every failure to [`FetchError`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::catalog::PictureEntry;
use crate::error::FetchError;

/// Example queries shipped with the client, used when `GET /examples` is
/// unavailable
pub const BUILTIN_EXAMPLES: &[&str] = &[
    "ჩემს საქაღალდეში მიპოვე ფოტოები რომელშიც ჩანს ცხენზე მჯდომი კაცი",
    "მიპოვე ფოტო რომელშიც ჩანს წითელი მანქანა",
    "რა კარგი დღეა",
    "მინახე 4 ფოტო რომელშიც არის ძაღლი რომელიც ყეფს",
];

/// The service's classification of one query
///
/// Extra fields the service sends alongside (search hits, scores) are
/// ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// The query text as the service received it
    #[serde(default)]
    pub original: String,
    /// Whether the query asks for pictures at all
    pub is_photo_search: bool,
    /// Core search terms after simplification
    #[serde(default)]
    pub simplified_query: Option<String>,
    /// How many pictures the user asked for
    #[serde(default)]
    pub photo_count: Option<u32>,
    /// Which pipeline processed the query (`simplify_pipeline`, ...)
    #[serde(default)]
    pub processing_type: Option<String>,
}

/// One step of the service's query decomposition
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Stable, server-assigned id
    pub id: u32,
    /// Human label, e.g. "Extracting photo count..."
    pub title: String,
    /// What the step consumed
    #[serde(default)]
    pub input: Option<String>,
    /// What the step produced
    #[serde(default)]
    pub output: Option<String>,
}

/// Body of `POST /process-steps`
#[derive(Clone, Debug, Deserialize)]
pub struct ProcessStepsResponse {
    /// Whether the service managed to analyze the query
    #[serde(default)]
    pub success: bool,
    /// Ordered step definitions
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
    /// Classification of the whole query
    pub final_result: Option<SearchResult>,
}

/// Step definitions plus the final classification, fetched once per cycle
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepDefinitions {
    /// Ordered step definitions
    pub steps: Vec<StepDefinition>,
    /// Classification revealed when the terminal step completes
    pub final_result: SearchResult,
}

impl TryFrom<ProcessStepsResponse> for StepDefinitions {
    type Error = FetchError;

    fn try_from(response: ProcessStepsResponse) -> Result<Self, Self::Error> {
        match (response.success, response.final_result) {
            (true, Some(final_result)) => Ok(Self {
                steps: response.steps,
                final_result,
            }),
            _ => Err(FetchError::Unsuccessful {
                endpoint: "/process-steps".to_string(),
            }),
        }
    }
}

/// Body of `POST /agent`
#[derive(Clone, Debug, Deserialize)]
pub struct AgentResponse {
    /// Whether classification succeeded
    #[serde(default)]
    pub success: bool,
    /// The classification
    pub result: Option<SearchResult>,
}

/// Body of `GET /pictures`
#[derive(Clone, Debug, Deserialize)]
pub struct PicturesResponse {
    /// Every picture the service can serve
    #[serde(default)]
    pub pictures: Vec<PictureEntry>,
    /// Count reported by the service
    #[serde(default)]
    pub total: Option<usize>,
}

/// Body of `GET /examples`
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ExampleQueries {
    /// Photo-agent examples
    #[serde(default)]
    pub photo_agent: Vec<String>,
    /// Text-correction examples (not used by the search flow)
    #[serde(default)]
    pub correction: Vec<String>,
}

impl ExampleQueries {
    /// The examples compiled into the client
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            photo_agent: BUILTIN_EXAMPLES.iter().map(|s| (*s).to_string()).collect(),
            correction: Vec::new(),
        }
    }
}

/// Body of `GET /health`
#[derive(Clone, Debug, Deserialize)]
pub struct HealthStatus {
    /// `healthy` when the service is up
    pub status: String,
    /// Free-form message
    #[serde(default)]
    pub message: Option<String>,
}

/// Remote analysis service
///
/// Implement this trait to point the controller at a different service
/// (or at a test double).
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Service name for logs
    fn name(&self) -> &str;

    /// Origin that picture URLs are relative to
    fn origin(&self) -> &str;

    /// Check if the service is reachable
    async fn health_check(&self) -> bool;

    /// `GET /pictures`
    async fn pictures(&self) -> Result<Vec<PictureEntry>, FetchError>;

    /// `POST /process-steps`
    async fn process_steps(&self, text: &str) -> Result<StepDefinitions, FetchError>;

    /// `POST /agent`
    async fn classify(&self, text: &str) -> Result<SearchResult, FetchError>;

    /// Raw image bytes for a picture's server-relative URL
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, FetchError>;

    /// `GET /examples`
    async fn examples(&self) -> Result<ExampleQueries, FetchError> {
        Ok(ExampleQueries::builtin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_result_ignores_extra_fields() {
        let json = r#"{
            "original": "მიპოვე 4 ფოტო",
            "is_photo_search": true,
            "simplified_query": "ძაღლი",
            "photo_count": 4,
            "processing_type": "simplify_pipeline",
            "search_results": [{"score": 91.2}],
            "has_search_results": true
        }"#;
        let result: SearchResult = serde_json::from_str(json).unwrap();
        assert!(result.is_photo_search);
        assert_eq!(result.photo_count, Some(4));
        assert_eq!(result.simplified_query.as_deref(), Some("ძაღლი"));
    }

    #[test]
    fn test_non_search_result_minimal() {
        let result: SearchResult =
            serde_json::from_str(r#"{"original": "რა კარგი დღეა", "is_photo_search": false}"#)
                .unwrap();
        assert!(!result.is_photo_search);
        assert_eq!(result.photo_count, None);
    }

    #[test]
    fn test_process_steps_unsuccessful() {
        let response: ProcessStepsResponse =
            serde_json::from_str(r#"{"success": false, "steps": []}"#).unwrap();
        let converted = StepDefinitions::try_from(response);
        assert!(matches!(converted, Err(FetchError::Unsuccessful { .. })));
    }

    #[test]
    fn test_process_steps_success() {
        let json = r#"{
            "success": true,
            "steps": [
                {"id": 1, "title": "Analyzing Georgian query...", "input": "q", "output": "ok"},
                {"id": 5, "title": "Searching in picture database...", "input": "No search query"}
            ],
            "final_result": {"original": "q", "is_photo_search": false}
        }"#;
        let response: ProcessStepsResponse = serde_json::from_str(json).unwrap();
        let defs = StepDefinitions::try_from(response).unwrap();
        assert_eq!(defs.steps.len(), 2);
        assert_eq!(defs.steps[1].id, 5);
        assert_eq!(defs.steps[1].output, None);
    }

    #[test]
    fn test_builtin_examples() {
        let examples = ExampleQueries::builtin();
        assert_eq!(examples.photo_agent.len(), 4);
    }
}

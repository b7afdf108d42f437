//! HTTP Analysis Service
//!
//! reqwest client for the analysis service's JSON API.
//!
//! # Endpoints
//!
//! - `GET  /health`        - liveness probe
//! - `GET  /pictures`      - full picture catalog
//! - `GET  /examples`      - example queries
//! - `POST /process-steps` - step definitions plus final classification
//! - `POST /agent`         - one-shot classification (fallback path)
//! - `GET  <picture url>`  - image bytes

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::traits::{
    AgentResponse, AnalysisService, ExampleQueries, HealthStatus, PicturesResponse,
    ProcessStepsResponse, SearchResult, StepDefinitions,
};
use crate::catalog::PictureEntry;
use crate::config::ServiceConfig;
use crate::error::FetchError;

#[derive(Serialize)]
struct TextRequest<'a> {
    text: &'a str,
}

/// Analysis service reached over HTTP
#[derive(Clone, Debug)]
pub struct HttpAnalysisService {
    /// Origin without trailing slash, e.g. `http://localhost:5001`
    origin: String,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpAnalysisService {
    /// Create a client for the given origin
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(origin: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let origin = origin.into().trim_end_matches('/').to_string();
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            origin,
            http_client,
        })
    }

    /// Create from the `[service]` configuration section
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, reqwest::Error> {
        Self::new(config.url.clone(), config.timeout)
    }

    /// Full URL for an endpoint path
    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.origin, path)
        } else {
            format!("{}/{}", self.origin, path)
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, FetchError> {
        let request = self.http_client.get(self.url(endpoint));
        Self::execute(request, endpoint).await
    }

    async fn post_text<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        text: &str,
    ) -> Result<T, FetchError> {
        let request = self
            .http_client
            .post(self.url(endpoint))
            .json(&TextRequest { text });
        Self::execute(request, endpoint).await
    }

    async fn execute<T: DeserializeOwned>(
        request: reqwest::RequestBuilder,
        endpoint: &str,
    ) -> Result<T, FetchError> {
        let bytes = Self::execute_raw(request, endpoint).await?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    }

    async fn execute_raw(
        request: reqwest::RequestBuilder,
        endpoint: &str,
    ) -> Result<Vec<u8>, FetchError> {
        let transport = |source: reqwest::Error| FetchError::Transport {
            endpoint: endpoint.to_string(),
            source,
        };

        let response = request.send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(transport)?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl AnalysisService for HttpAnalysisService {
    fn name(&self) -> &str {
        "HTTP"
    }

    fn origin(&self) -> &str {
        &self.origin
    }

    async fn health_check(&self) -> bool {
        let request = self
            .http_client
            .get(self.url("/health"))
            .timeout(Duration::from_secs(5));
        match Self::execute::<HealthStatus>(request, "/health").await {
            Ok(health) => health.status == "healthy",
            Err(e) => {
                tracing::debug!(error = %e, "Health check failed");
                false
            }
        }
    }

    async fn pictures(&self) -> Result<Vec<PictureEntry>, FetchError> {
        let response: PicturesResponse = self.get_json("/pictures").await?;
        if let Some(total) = response.total {
            if total != response.pictures.len() {
                tracing::debug!(
                    total,
                    received = response.pictures.len(),
                    "Picture total disagrees with list length"
                );
            }
        }
        Ok(response.pictures)
    }

    async fn process_steps(&self, text: &str) -> Result<StepDefinitions, FetchError> {
        let response: ProcessStepsResponse = self.post_text("/process-steps", text).await?;
        StepDefinitions::try_from(response)
    }

    async fn classify(&self, text: &str) -> Result<SearchResult, FetchError> {
        let response: AgentResponse = self.post_text("/agent", text).await?;
        match response {
            AgentResponse {
                success: true,
                result: Some(result),
            } => Ok(result),
            _ => Err(FetchError::Unsuccessful {
                endpoint: "/agent".to_string(),
            }),
        }
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let request = self.http_client.get(self.url(url));
        Self::execute_raw(request, url).await
    }

    async fn examples(&self) -> Result<ExampleQueries, FetchError> {
        self.get_json("/examples").await
    }
}

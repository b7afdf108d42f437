//! Analysis Service Integration
//!
//! Access to the remote analysis service through a common trait, so the
//! controller can run against the live HTTP service or a test double.
//!
//! # Usage
//!
//! ```ignore
//! use photo_search_core::service::{AnalysisService, HttpAnalysisService};
//!
//! let service = HttpAnalysisService::new("http://localhost:5001", timeout)?;
//! let defs = service.process_steps("მიპოვე 4 ფოტო").await?;
//! ```

mod http;
mod traits;

pub use http::HttpAnalysisService;
pub use traits::{
    AgentResponse, AnalysisService, ExampleQueries, HealthStatus, PicturesResponse,
    ProcessStepsResponse, SearchResult, StepDefinition, StepDefinitions, BUILTIN_EXAMPLES,
};

//! Photo Search Core - Headless Search-Cycle Orchestration
//!
//! This crate holds the client-side logic of the photo-search assistant,
//! completely independent of any UI framework. It can drive a TUI, a
//! headless command-line runner, or a test harness.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          Surfaces                                 │
//! │        ┌────────────┐               ┌───────────────────┐        │
//! │        │    TUI     │               │  CLI / Headless   │        │
//! │        │ (ratatui)  │               │                   │        │
//! │        └─────┬──────┘               └─────────┬─────────┘        │
//! │              └──────────────┬─────────────────┘                  │
//! │                     SurfaceEvent (up)                            │
//! │                    SearchMessage (down)                          │
//! └─────────────────────────────┼────────────────────────────────────┘
//!                               │
//! ┌─────────────────────────────┼────────────────────────────────────┐
//! │                      PHOTO SEARCH CORE                            │
//! │  ┌──────────────────────────┴─────────────────────────────────┐  │
//! │  │                    SearchController                         │  │
//! │  │  ┌─────────┐  ┌──────────┐  ┌──────────┐  ┌─────────────┐  │  │
//! │  │  │ Catalog │  │ Timeline │  │  Reveal  │  │   Session   │  │  │
//! │  │  │  Cache  │  │ Scheduler│  │   Gate   │  │    State    │  │  │
//! │  │  └─────────┘  └──────────┘  └──────────┘  └─────────────┘  │  │
//! │  └──────────────────────────┬─────────────────────────────────┘  │
//! │                    AnalysisService (HTTP)                         │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`SearchController`]: Owns the session and runs search cycles
//! - [`SearchMessage`]: Notifications sent from the controller to surfaces
//! - [`SurfaceEvent`]: User actions sent from surfaces to the controller
//! - [`SessionState`]: The live session snapshot surfaces render
//! - [`AnalysisService`]: The remote service boundary
//!
//! # Quick Start
//!
//! ```ignore
//! use photo_search_core::{
//!     config, ControllerConfig, HttpAnalysisService, SearchController,
//! };
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = config::load_config()?;
//!     let service = HttpAnalysisService::from_config(&config.service)?;
//!
//!     let (tx, mut rx) = mpsc::unbounded_channel();
//!     let mut controller = SearchController::new(service, ControllerConfig::from(&config), tx);
//!     controller.start().await;
//!
//!     controller.set_query("მინახე 4 ფოტო რომელშიც არის ძაღლი");
//!     controller.submit();
//!
//!     while controller.wait_event().await {
//!         while let Ok(msg) = rx.try_recv() {
//!             println!("{msg}");
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`catalog`]: Picture catalog cache
//! - [`config`]: TOML, environment and CLI configuration
//! - [`controller`]: Query submission and cycle orchestration
//! - [`error`]: Service boundary errors
//! - [`events`]: Events from surfaces to the controller
//! - [`messages`]: Messages from the controller to surfaces
//! - [`reveal`]: Result reveal gate
//! - [`service`]: Analysis service trait and HTTP client
//! - [`session`]: Session state and derived view data
//! - [`timeline`]: Step timeline plans and the task scheduler
//!
//! # No TUI Dependencies
//!
//! This crate has **zero** dependencies on ratatui, crossterm, or any other
//! UI framework.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod messages;
pub mod reveal;
pub mod service;
pub mod session;
pub mod timeline;

pub use catalog::{PictureCatalog, PictureEntry};
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, SearchConfig, ServiceConfig,
};
pub use controller::{ControllerConfig, IgnoreReason, SearchController, SubmitOutcome};
pub use error::{ClassificationError, FetchError};
pub use events::SurfaceEvent;
pub use messages::SearchMessage;
pub use reveal::{TerminalStep, TERMINAL_STEP_ID};
pub use service::{
    AnalysisService, ExampleQueries, HttpAnalysisService, SearchResult, StepDefinition,
    StepDefinitions,
};
pub use session::{
    CycleToken, ProcessStep, ProcessingKind, ResultStats, SessionState, StepStatus, ViewMode,
};
pub use timeline::{TimelinePlan, TimelineTiming, TransitionKind};

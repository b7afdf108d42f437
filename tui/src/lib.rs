//! Photo Search TUI - Terminal interface for photo-search
//!
//! A full-screen terminal UI over the headless search core: a query box
//! with example queries, the animated step timeline, the result block and
//! the picture pane.
//!
//! # Architecture
//!
//! - **SearchClient**: Embeds the controller and collects its messages
//! - **DisplayState**: TUI-only state derived from messages and image fetches
//! - **App**: Event loop and rendering
//! - **Theme**: Timeline and UI colors

pub mod app;
pub mod display;
pub mod search_client;
pub mod theme;

pub use app::App;
pub use search_client::SearchClient;

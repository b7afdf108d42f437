//! Search Client
//!
//! Thin wrapper around the SearchController for TUI integration.
//! The controller is embedded directly (no transport); this client pairs it
//! with the receiving end of its message channel and with a small image
//! fetcher for picture cards.
//!
//! # Architecture
//!
//! The TUI is a "thin client" - it doesn't contain any search logic.
//! All orchestration happens in the controller. The TUI's job is:
//! 1. Convert terminal events to SurfaceEvents
//! 2. Send SurfaceEvents to the controller
//! 3. Receive SearchMessages
//! 4. Render the session snapshot

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;

use photo_search_core::{
    AnalysisService, ControllerConfig, FetchError, HttpAnalysisService, PictureCatalog,
    SearchController, SearchMessage, SessionState, SubmitOutcome, SurfaceEvent,
};

/// Result of one picture image fetch
#[derive(Debug)]
pub struct ImageFetched {
    /// Server-relative picture url
    pub url: String,
    /// Byte length of the image, or why it could not be fetched
    pub result: Result<usize, FetchError>,
}

/// Client for the embedded search controller
pub struct SearchClient<S: AnalysisService + 'static = HttpAnalysisService> {
    /// The embedded controller
    controller: SearchController<S>,
    /// Receiver for messages from the controller
    rx: mpsc::UnboundedReceiver<SearchMessage>,
    /// Sender handed to image fetch tasks
    image_tx: mpsc::UnboundedSender<ImageFetched>,
    /// Receiver for finished image fetches
    image_rx: mpsc::UnboundedReceiver<ImageFetched>,
    /// Urls already requested, so each image is fetched once
    requested_images: HashSet<String>,
}

impl<S: AnalysisService + 'static> SearchClient<S> {
    /// Create a client around a service
    pub fn new(service: S, config: ControllerConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (image_tx, image_rx) = mpsc::unbounded_channel();
        Self {
            controller: SearchController::new(service, config, tx),
            rx,
            image_tx,
            image_rx,
            requested_images: HashSet::new(),
        }
    }

    /// Load the catalog and example queries
    pub async fn start(&mut self) {
        self.controller.start().await;
    }

    /// Replace the query text (ignored while a search runs)
    pub fn set_query(&mut self, text: impl Into<String>) -> bool {
        self.controller.set_query(text)
    }

    /// Pick an example query by index (ignored while a search runs)
    pub fn select_example(&mut self, index: usize) -> bool {
        self.controller.select_example(index)
    }

    /// Submit the current query
    pub fn submit(&mut self) -> SubmitOutcome {
        self.controller.submit()
    }

    /// Reset the session
    pub fn reset(&mut self) {
        self.controller.reset();
    }

    /// Tell the controller the user is leaving
    pub fn request_quit(&mut self) {
        self.controller.handle_event(SurfaceEvent::QuitRequested);
        self.controller.shutdown();
    }

    /// Apply pending timeline and network events (must be called regularly)
    pub fn poll(&mut self) -> bool {
        self.controller.poll()
    }

    /// Receive all pending messages from the controller (non-blocking)
    pub fn recv_all(&mut self) -> Vec<SearchMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// Start fetching the image at `url` unless it was requested before
    ///
    /// Returns whether a fetch was started.
    pub fn request_image(&mut self, url: &str) -> bool {
        if !self.requested_images.insert(url.to_string()) {
            return false;
        }

        let service = self.controller.service();
        let tx = self.image_tx.clone();
        let url = url.to_string();
        tokio::spawn(async move {
            let result = service.fetch_image(&url).await.map(|bytes| bytes.len());
            if let Err(ref e) = result {
                tracing::debug!(url = %url, error = %e, "Picture image unavailable");
            }
            // Receiver only closes when the client is dropped
            let _ = tx.send(ImageFetched { url, result });
        });
        true
    }

    /// Receive all finished image fetches (non-blocking)
    pub fn recv_images(&mut self) -> Vec<ImageFetched> {
        let mut fetched = Vec::new();
        while let Ok(image) = self.image_rx.try_recv() {
            fetched.push(image);
        }
        fetched
    }

    /// The live session
    pub fn session(&self) -> &SessionState {
        self.controller.session()
    }

    /// Example queries
    pub fn examples(&self) -> &[String] {
        self.controller.examples()
    }

    /// The picture catalog
    pub fn catalog(&self) -> &PictureCatalog {
        self.controller.catalog()
    }

    /// Shared handle to the service
    pub fn service(&self) -> Arc<S> {
        self.controller.service()
    }

    /// Whether a search is running
    pub fn is_loading(&self) -> bool {
        self.controller.is_loading()
    }
}

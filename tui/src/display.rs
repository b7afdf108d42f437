//! Display State Types
//!
//! Types that represent the current display state for the TUI.
//! The session snapshot itself lives in the controller; what is kept here is
//! the TUI-only state derived from SearchMessages and image fetches, plus
//! the pure formatting helpers the renderer uses.
//!
//! # Design Philosophy
//!
//! The TUI is a "thin client" - it just renders what the controller tells it
//! to. Everything in this module is free of terminal I/O so it can be unit
//! tested directly.

use std::collections::{HashMap, VecDeque};

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use photo_search_core::{
    PictureCatalog, PictureEntry, ProcessStep, SearchMessage, SessionState, StepStatus, ViewMode,
};

use crate::search_client::ImageFetched;

/// How many activity lines are kept
const ACTIVITY_LIMIT: usize = 50;

/// What the status bar says the app is doing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayStatus {
    /// Catalog and examples are loading
    Starting,
    /// Waiting for a query
    Ready,
    /// A search cycle is running
    Searching,
}

impl DisplayStatus {
    /// Status bar label
    pub fn description(&self) -> &'static str {
        match self {
            Self::Starting => "Loading pictures...",
            Self::Ready => "Ready",
            Self::Searching => "Searching...",
        }
    }
}

/// Fetch state of one picture image
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageState {
    /// Requested, not back yet
    Loading,
    /// Fetched, with its size in bytes
    Loaded(usize),
    /// Fetch failed; the card shows no image
    Unavailable,
}

impl ImageState {
    /// Marker shown on a picture card, `None` when the image is omitted
    pub fn marker(&self) -> Option<String> {
        match self {
            Self::Loading => Some("[loading image]".to_string()),
            Self::Loaded(bytes) => Some(format!("[image {}]", format_size(*bytes))),
            Self::Unavailable => None,
        }
    }
}

/// The TUI-side display state
#[derive(Debug)]
pub struct DisplayState {
    /// Status bar state
    pub status: DisplayStatus,
    /// Recent controller messages, newest last
    pub activity: VecDeque<String>,
    /// Image fetch state by picture url
    pub images: HashMap<String, ImageState>,
    /// Pictures in the catalog once loaded
    pub catalog_count: Option<usize>,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            status: DisplayStatus::Starting,
            activity: VecDeque::with_capacity(ACTIVITY_LIMIT),
            images: HashMap::new(),
            catalog_count: None,
        }
    }
}

impl DisplayState {
    /// Create a new display state
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a SearchMessage to update display state
    pub fn apply_message(&mut self, msg: &SearchMessage) {
        match msg {
            SearchMessage::CatalogLoaded { count } => {
                self.catalog_count = Some(*count);
            }
            SearchMessage::ExamplesLoaded { .. } => {
                self.status = DisplayStatus::Ready;
            }
            SearchMessage::CycleStarted { .. } => {
                self.status = DisplayStatus::Searching;
            }
            msg if msg.ends_loading() => {
                self.status = DisplayStatus::Ready;
            }
            _ => {}
        }
        self.push_activity(msg.to_string());
    }

    /// Record a finished image fetch
    pub fn apply_image(&mut self, image: ImageFetched) {
        let state = match image.result {
            Ok(bytes) => ImageState::Loaded(bytes),
            Err(_) => ImageState::Unavailable,
        };
        self.images.insert(image.url, state);
    }

    /// Mark an image as requested
    pub fn image_requested(&mut self, url: &str) {
        self.images
            .entry(url.to_string())
            .or_insert(ImageState::Loading);
    }

    /// Card marker for the picture at `url`
    ///
    /// Images never requested show nothing, like failed ones.
    pub fn image_marker(&self, url: &str) -> Option<String> {
        self.images.get(url).and_then(ImageState::marker)
    }

    fn push_activity(&mut self, line: String) {
        if self.activity.len() == ACTIVITY_LIMIT {
            self.activity.pop_front();
        }
        self.activity.push_back(line);
    }
}

// ============================================================================
// Formatting Helpers
// ============================================================================

/// Timeline marker: `✓` completed, `⟳` active, the step id while pending
pub fn step_marker(step: &ProcessStep) -> String {
    match step.status {
        StepStatus::Completed => "✓".to_string(),
        StepStatus::Active => "⟳".to_string(),
        StepStatus::Pending => step.id.to_string(),
    }
}

/// Title of the picture pane
pub fn picture_panel_title(session: &SessionState) -> String {
    match session.view_mode() {
        ViewMode::Browse => "Available Pictures".to_string(),
        ViewMode::Found => format!("Found Pictures ({})", session.pictures.len()),
        ViewMode::NotASearch => "No Search Query".to_string(),
    }
}

/// Pictures the picture pane lists
pub fn visible_pictures<'a>(
    session: &'a SessionState,
    catalog: &'a PictureCatalog,
) -> &'a [PictureEntry] {
    match session.view_mode() {
        ViewMode::Browse => catalog.all(),
        ViewMode::Found => &session.pictures,
        ViewMode::NotASearch => &[],
    }
}

/// Labelled lines of the result block, empty until the reveal
pub fn result_lines(session: &SessionState) -> Vec<(&'static str, String)> {
    if !session.search_completed {
        return Vec::new();
    }
    let Some(ref result) = session.result else {
        return Vec::new();
    };

    let mut lines = vec![
        ("Original", result.original.clone()),
        (
            "Photo search",
            if result.is_photo_search { "Yes" } else { "No" }.to_string(),
        ),
    ];
    if let Some(ref terms) = result.simplified_query {
        lines.push(("Search terms", terms.clone()));
    }
    if let Some(stats) = session.stats() {
        if result.is_photo_search {
            let requested = stats
                .requested
                .map_or_else(|| "N/A".to_string(), |n| n.to_string());
            lines.push(("Requested", requested));
        }
        if let Some(found) = stats.found {
            lines.push(("Found", found.to_string()));
        }
        lines.push(("Processing", stats.processing.to_string()));
    }
    lines
}

/// Cut `text` to at most `width` terminal columns, marking the cut with `…`
pub fn truncate_to_width(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

/// Human-readable byte size
pub fn format_size(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;

    #[allow(clippy::cast_precision_loss)]
    let value = bytes as f64;
    if value >= MB {
        format!("{:.1} MB", value / MB)
    } else if value >= KB {
        format!("{:.1} KB", value / KB)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use photo_search_core::{CycleToken, FetchError, SearchResult};
    use pretty_assertions::assert_eq;

    fn step(id: u32, status: StepStatus) -> ProcessStep {
        ProcessStep {
            id,
            text: format!("Step {id}"),
            input: None,
            output: None,
            status,
        }
    }

    fn picture(name: &str) -> PictureEntry {
        PictureEntry {
            name: name.to_string(),
            url: format!("/data/{name}"),
            kind: "animals".to_string(),
            tags: vec!["dog".to_string()],
        }
    }

    fn completed_session(is_photo_search: bool, found: usize) -> SessionState {
        let mut session = SessionState::new();
        session.result = Some(SearchResult {
            original: "მინახე 4 ფოტო".to_string(),
            is_photo_search,
            simplified_query: is_photo_search.then(|| "ძაღლი".to_string()),
            photo_count: is_photo_search.then_some(4),
            processing_type: Some("simplify_pipeline".to_string()),
        });
        session.pictures = (0..found).map(|i| picture(&format!("{i}.jpg"))).collect();
        session.search_completed = true;
        session
    }

    // ========================================================================
    // DisplayState Tests
    // ========================================================================

    #[test]
    fn test_status_follows_cycle() {
        let mut display = DisplayState::new();
        assert_eq!(display.status, DisplayStatus::Starting);

        display.apply_message(&SearchMessage::CatalogLoaded { count: 10 });
        display.apply_message(&SearchMessage::ExamplesLoaded { count: 4 });
        assert_eq!(display.status, DisplayStatus::Ready);
        assert_eq!(display.catalog_count, Some(10));

        let cycle = CycleToken(1);
        display.apply_message(&SearchMessage::CycleStarted {
            cycle,
            query: "q".to_string(),
        });
        assert_eq!(display.status, DisplayStatus::Searching);

        display.apply_message(&SearchMessage::Revealed {
            cycle,
            count: 4,
            is_photo_search: true,
        });
        assert_eq!(display.status, DisplayStatus::Searching);

        display.apply_message(&SearchMessage::Settled { cycle });
        assert_eq!(display.status, DisplayStatus::Ready);
    }

    #[test]
    fn test_failed_cycle_returns_to_ready() {
        let mut display = DisplayState::new();
        let cycle = CycleToken(2);
        display.apply_message(&SearchMessage::CycleStarted {
            cycle,
            query: "q".to_string(),
        });
        display.apply_message(&SearchMessage::CycleFailed {
            cycle,
            reason: "offline".to_string(),
        });
        assert_eq!(display.status, DisplayStatus::Ready);
        assert_eq!(display.activity.back().unwrap(), "#2 failed: offline");
    }

    #[test]
    fn test_activity_is_bounded() {
        let mut display = DisplayState::new();
        for i in 0..(ACTIVITY_LIMIT + 5) {
            display.apply_message(&SearchMessage::Settled {
                cycle: CycleToken(i as u64),
            });
        }
        assert_eq!(display.activity.len(), ACTIVITY_LIMIT);
        assert_eq!(display.activity.front().unwrap(), "#5 settled");
    }

    #[test]
    fn test_image_markers() {
        let mut display = DisplayState::new();
        assert_eq!(display.image_marker("/data/a.jpg"), None);

        display.image_requested("/data/a.jpg");
        assert_eq!(
            display.image_marker("/data/a.jpg").as_deref(),
            Some("[loading image]")
        );

        display.apply_image(ImageFetched {
            url: "/data/a.jpg".to_string(),
            result: Ok(2048),
        });
        assert_eq!(
            display.image_marker("/data/a.jpg").as_deref(),
            Some("[image 2.0 KB]")
        );

        display.image_requested("/data/b.jpg");
        display.apply_image(ImageFetched {
            url: "/data/b.jpg".to_string(),
            result: Err(FetchError::Status {
                endpoint: "/data/b.jpg".to_string(),
                status: 404,
            }),
        });
        assert_eq!(display.image_marker("/data/b.jpg"), None);
    }

    #[test]
    fn test_requested_does_not_overwrite_loaded() {
        let mut display = DisplayState::new();
        display.apply_image(ImageFetched {
            url: "/data/a.jpg".to_string(),
            result: Ok(10),
        });
        display.image_requested("/data/a.jpg");
        assert_eq!(display.images["/data/a.jpg"], ImageState::Loaded(10));
    }

    // ========================================================================
    // Formatting Tests
    // ========================================================================

    #[test]
    fn test_step_marker() {
        assert_eq!(step_marker(&step(3, StepStatus::Pending)), "3");
        assert_eq!(step_marker(&step(3, StepStatus::Active)), "⟳");
        assert_eq!(step_marker(&step(3, StepStatus::Completed)), "✓");
    }

    #[test]
    fn test_picture_panel_title() {
        assert_eq!(
            picture_panel_title(&SessionState::new()),
            "Available Pictures"
        );
        assert_eq!(
            picture_panel_title(&completed_session(true, 4)),
            "Found Pictures (4)"
        );
        assert_eq!(
            picture_panel_title(&completed_session(false, 0)),
            "No Search Query"
        );
    }

    #[test]
    fn test_visible_pictures() {
        let catalog = PictureCatalog::from_entries(vec![
            picture("a.jpg"),
            picture("b.jpg"),
            picture("c.jpg"),
        ]);

        let browsing = SessionState::new();
        assert_eq!(visible_pictures(&browsing, &catalog).len(), 3);

        let found = completed_session(true, 1);
        assert_eq!(visible_pictures(&found, &catalog).len(), 1);

        let not_a_search = completed_session(false, 0);
        assert!(visible_pictures(&not_a_search, &catalog).is_empty());
    }

    #[test]
    fn test_result_lines_photo_search() {
        let lines = result_lines(&completed_session(true, 4));
        assert_eq!(
            lines,
            vec![
                ("Original", "მინახე 4 ფოტო".to_string()),
                ("Photo search", "Yes".to_string()),
                ("Search terms", "ძაღლი".to_string()),
                ("Requested", "4".to_string()),
                ("Found", "4".to_string()),
                ("Processing", "Smart".to_string()),
            ]
        );
    }

    #[test]
    fn test_result_lines_not_a_search() {
        let lines = result_lines(&completed_session(false, 0));
        assert_eq!(
            lines,
            vec![
                ("Original", "მინახე 4 ფოტო".to_string()),
                ("Photo search", "No".to_string()),
                ("Processing", "None".to_string()),
            ]
        );
        assert!(result_lines(&SessionState::new()).is_empty());
    }

    #[test]
    fn test_result_lines_unspecified_count() {
        let mut session = completed_session(true, 3);
        if let Some(ref mut result) = session.result {
            result.photo_count = None;
        }
        let lines = result_lines(&session);
        assert!(lines.contains(&("Requested", "N/A".to_string())));
    }

    #[test]
    fn test_truncate_to_width() {
        assert_eq!(truncate_to_width("abc", 4), "abc");
        assert_eq!(truncate_to_width("abcdef", 4), "abc…");
        assert_eq!(truncate_to_width("მიპოვე ფოტო", 6), "მიპოვ…");
        assert_eq!(truncate_to_width("abc", 0), "");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}

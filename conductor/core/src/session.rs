//! Session State
//!
//! The one live search session: query text, loading flag, animated steps,
//! classification result and revealed pictures.
//!
//! # Design Philosophy
//!
//! Exactly one session is live at a time and the controller is its only
//! writer. Every cycle gets a fresh [`CycleToken`]; anything scheduled for an
//! older token is stale and must not touch the session. Surfaces read a
//! snapshot and derive what to show through [`SessionState::view_mode`] and
//! [`SessionState::stats`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::PictureEntry;
use crate::service::{SearchResult, StepDefinition};

/// Identity of one search cycle
///
/// Monotonically increasing; bumped by every submit that starts a cycle and
/// by every reset.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct CycleToken(pub u64);

impl CycleToken {
    /// The token that follows this one
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl std::fmt::Display for CycleToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of one step
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    /// Not yet started
    #[default]
    Pending,
    /// Currently animating
    Active,
    /// Finished
    Completed,
}

/// A step as shown to the user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessStep {
    /// Server-assigned id, used to target transitions
    pub id: u32,
    /// Human label
    pub text: String,
    /// What the step consumed
    pub input: Option<String>,
    /// What the step produced
    pub output: Option<String>,
    /// Current status
    pub status: StepStatus,
}

impl From<StepDefinition> for ProcessStep {
    fn from(def: StepDefinition) -> Self {
        Self {
            id: def.id,
            text: def.title,
            input: def.input,
            output: def.output,
            status: StepStatus::Pending,
        }
    }
}

/// What the picture pane should show
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewMode {
    /// No completed search: the whole catalog
    Browse,
    /// Completed photo search: the revealed subset
    Found,
    /// Completed, but the query was not a photo search
    NotASearch,
}

/// Which pipeline the service used
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingKind {
    /// The simplification pipeline
    Smart,
    /// Any other pipeline
    Basic,
    /// Not a photo search
    None,
}

impl ProcessingKind {
    /// Classify a result's `processing_type`
    #[must_use]
    pub fn of(result: &SearchResult) -> Self {
        if !result.is_photo_search {
            return Self::None;
        }
        match result.processing_type.as_deref() {
            Some("simplify_pipeline") => Self::Smart,
            _ => Self::Basic,
        }
    }
}

impl std::fmt::Display for ProcessingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Smart => write!(f, "Smart"),
            Self::Basic => write!(f, "Basic"),
            Self::None => write!(f, "None"),
        }
    }
}

/// Summary numbers for the result block
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultStats {
    /// Pictures the user asked for (photo searches only)
    pub requested: Option<u32>,
    /// Pictures revealed (photo searches only)
    pub found: Option<usize>,
    /// Processing pipeline label
    pub processing: ProcessingKind,
}

/// The live session
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SessionState {
    /// Current query text
    pub query: String,
    /// Whether a cycle is in flight
    pub loading: bool,
    /// Steps of the current cycle, in received order
    pub steps: Vec<ProcessStep>,
    /// Classification of the current cycle
    pub result: Option<SearchResult>,
    /// Revealed pictures
    pub pictures: Vec<PictureEntry>,
    /// Whether the reveal has happened
    pub search_completed: bool,
    /// Token of the live cycle
    pub cycle: CycleToken,
    /// When the live cycle was submitted
    pub cycle_started_at: Option<DateTime<Utc>>,
}

impl SessionState {
    /// Create an empty session
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear everything a cycle produces, keeping query and token
    pub fn clear_cycle_output(&mut self) {
        self.steps.clear();
        self.result = None;
        self.pictures.clear();
        self.search_completed = false;
    }

    /// Set the status of every step with `id`
    ///
    /// Returns how many steps matched; unknown ids match nothing.
    pub fn set_step_status(&mut self, id: u32, status: StepStatus) -> usize {
        let mut matched = 0;
        for step in self.steps.iter_mut().filter(|s| s.id == id) {
            step.status = status;
            matched += 1;
        }
        matched
    }

    /// Step with `id`, if any
    #[must_use]
    pub fn step(&self, id: u32) -> Option<&ProcessStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Number of completed steps
    #[must_use]
    pub fn completed_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count()
    }

    /// Whether submit would currently be accepted
    #[must_use]
    pub fn can_submit(&self) -> bool {
        !self.loading && !self.query.trim().is_empty()
    }

    /// Which picture list the view should show
    #[must_use]
    pub fn view_mode(&self) -> ViewMode {
        if !self.search_completed {
            return ViewMode::Browse;
        }
        match self.result {
            Some(ref result) if result.is_photo_search => ViewMode::Found,
            _ => ViewMode::NotASearch,
        }
    }

    /// Stats for the result block, if there is a result
    #[must_use]
    pub fn stats(&self) -> Option<ResultStats> {
        let result = self.result.as_ref()?;
        let is_search = result.is_photo_search;
        Some(ResultStats {
            requested: if is_search { result.photo_count } else { None },
            found: if is_search && self.search_completed {
                Some(self.pictures.len())
            } else {
                None
            },
            processing: ProcessingKind::of(result),
        })
    }
}

//! Search Messages
//!
//! Notifications sent from the controller to surfaces. Surfaces render the
//! session snapshot; these messages tell them when and why it changed, so a
//! headless runner can print a transcript and a TUI can log or redraw.

use serde::{Deserialize, Serialize};

use crate::session::CycleToken;

/// Messages from the controller to a surface
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchMessage {
    /// The picture catalog finished loading (possibly empty)
    CatalogLoaded {
        /// Number of pictures in the catalog
        count: usize,
    },

    /// Example queries are available
    ExamplesLoaded {
        /// Number of examples
        count: usize,
    },

    /// A new cycle was submitted
    CycleStarted {
        /// Token of the new cycle
        cycle: CycleToken,
        /// The query that was submitted
        query: String,
    },

    /// Step definitions arrived and the timeline started
    StepsReceived {
        /// Owning cycle
        cycle: CycleToken,
        /// Number of steps
        count: usize,
    },

    /// A step became active
    StepActivated {
        /// Owning cycle
        cycle: CycleToken,
        /// Step id
        step_id: u32,
    },

    /// A step completed
    StepCompleted {
        /// Owning cycle
        cycle: CycleToken,
        /// Step id
        step_id: u32,
    },

    /// The reveal gate fired
    Revealed {
        /// Owning cycle
        cycle: CycleToken,
        /// Number of revealed pictures
        count: usize,
        /// Whether the query was a photo search
        is_photo_search: bool,
    },

    /// Step definitions failed and the one-shot classification answered
    FallbackUsed {
        /// Owning cycle
        cycle: CycleToken,
    },

    /// Both the step fetch and the fallback failed
    CycleFailed {
        /// Owning cycle
        cycle: CycleToken,
        /// Human-readable cause, for logs
        reason: String,
    },

    /// `loading` cleared; a new submit is accepted
    Settled {
        /// Owning cycle
        cycle: CycleToken,
    },

    /// The session was reset
    Reset {
        /// The token the session moved to
        cycle: CycleToken,
    },
}

impl SearchMessage {
    /// The cycle this message belongs to, if any
    #[must_use]
    pub fn cycle(&self) -> Option<CycleToken> {
        match self {
            Self::CatalogLoaded { .. } | Self::ExamplesLoaded { .. } => None,
            Self::CycleStarted { cycle, .. }
            | Self::StepsReceived { cycle, .. }
            | Self::StepActivated { cycle, .. }
            | Self::StepCompleted { cycle, .. }
            | Self::Revealed { cycle, .. }
            | Self::FallbackUsed { cycle }
            | Self::CycleFailed { cycle, .. }
            | Self::Settled { cycle }
            | Self::Reset { cycle } => Some(*cycle),
        }
    }

    /// Whether this message ends a cycle's loading phase
    #[must_use]
    pub fn ends_loading(&self) -> bool {
        matches!(
            self,
            Self::Settled { .. } | Self::CycleFailed { .. } | Self::Reset { .. }
        )
    }
}

impl std::fmt::Display for SearchMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CatalogLoaded { count } => write!(f, "catalog loaded: {count} pictures"),
            Self::ExamplesLoaded { count } => write!(f, "examples loaded: {count}"),
            Self::CycleStarted { cycle, query } => write!(f, "{cycle} started: {query}"),
            Self::StepsReceived { cycle, count } => write!(f, "{cycle} received {count} steps"),
            Self::StepActivated { cycle, step_id } => write!(f, "{cycle} step {step_id} active"),
            Self::StepCompleted { cycle, step_id } => {
                write!(f, "{cycle} step {step_id} completed")
            }
            Self::Revealed {
                cycle,
                count,
                is_photo_search,
            } => {
                if *is_photo_search {
                    write!(f, "{cycle} revealed {count} pictures")
                } else {
                    write!(f, "{cycle} not a photo search")
                }
            }
            Self::FallbackUsed { cycle } => write!(f, "{cycle} used fallback classification"),
            Self::CycleFailed { cycle, reason } => write!(f, "{cycle} failed: {reason}"),
            Self::Settled { cycle } => write!(f, "{cycle} settled"),
            Self::Reset { cycle } => write!(f, "reset to {cycle}"),
        }
    }
}

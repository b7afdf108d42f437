//! Result Reveal Gate
//!
//! Decides which pictures are disclosed as "matches" once the terminal step
//! of a cycle completes, and flips the session into result mode.
//!
//! The revealed set is a prefix of the catalog sized by the service's
//! `photo_count`, not a relevance ranking: the catalog is treated as an
//! undifferentiated pool.

use serde::{Deserialize, Serialize};

use crate::catalog::{PictureCatalog, PictureEntry};
use crate::service::SearchResult;

/// Id the analysis service gives its final "search the database" step
pub const TERMINAL_STEP_ID: u32 = 5;

/// Which step's completion triggers the reveal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalStep {
    /// The step with this id (service convention: 5)
    FixedId(u32),
    /// Whatever step arrived last in the received sequence
    LastReceived,
}

impl Default for TerminalStep {
    fn default() -> Self {
        Self::FixedId(TERMINAL_STEP_ID)
    }
}

impl TerminalStep {
    /// Parse `"last"` or a numeric step id
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("last") {
            return Some(Self::LastReceived);
        }
        s.parse().ok().map(Self::FixedId)
    }

    /// Resolve to a concrete id for one received step sequence
    ///
    /// Returns `None` when the sequence is empty and the policy depends on
    /// it. A fixed id that is not in the sequence still resolves; the gate
    /// simply never fires for that cycle.
    #[must_use]
    pub fn resolve(self, step_ids: &[u32]) -> Option<u32> {
        match self {
            Self::FixedId(id) => Some(id),
            Self::LastReceived => step_ids.last().copied(),
        }
    }
}

impl std::fmt::Display for TerminalStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FixedId(id) => write!(f, "step {id}"),
            Self::LastReceived => write!(f, "last step"),
        }
    }
}

/// The outcome of evaluating the gate
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reveal {
    /// Pictures to show as matches (possibly empty)
    pub pictures: Vec<PictureEntry>,
    /// Whether the result was a photo search
    pub is_photo_search: bool,
}

/// Select the revealed subset for a classification
///
/// Photo search: the first `min(photo_count, |catalog|)` entries in catalog
/// order; a missing count reveals nothing. Anything else: empty.
#[must_use]
pub fn select(catalog: &PictureCatalog, result: &SearchResult) -> Reveal {
    if !result.is_photo_search {
        return Reveal {
            pictures: Vec::new(),
            is_photo_search: false,
        };
    }

    let requested = result.photo_count.unwrap_or(0) as usize;
    Reveal {
        pictures: catalog.prefix(requested).to_vec(),
        is_photo_search: true,
    }
}

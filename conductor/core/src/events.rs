//! Surface Events
//!
//! Events sent from surfaces to the controller. Surfaces report what the user
//! did; the controller decides what it means (a submit while loading is
//! simply ignored, for instance).

use serde::{Deserialize, Serialize};

/// Events from a surface to the controller
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceEvent {
    /// The input text changed
    QueryChanged {
        /// Full new text
        text: String,
    },

    /// The user picked an example query
    ExampleSelected {
        /// Index into the example list
        index: usize,
    },

    /// The user asked to search
    Submit,

    /// The user asked to start over
    Reset,

    /// The user wants to leave
    QuitRequested,
}

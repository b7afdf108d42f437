//! Theme and Colors
//!
//! The photo-search palette. Step colors follow the timeline: blue while a
//! step runs, green once it is done, a violet accent for headers and the
//! result block.

use ratatui::style::Color;

// ============================================================================
// Timeline Colors
// ============================================================================

/// Active step - sky blue (#0ea5e9)
pub const STEP_ACTIVE: Color = Color::Rgb(14, 165, 233);

/// Completed step - emerald (#10b981)
pub const STEP_COMPLETED: Color = Color::Rgb(16, 185, 129);

/// Pending step - muted slate
pub const STEP_PENDING: Color = Color::Rgb(120, 120, 135);

// ============================================================================
// UI Colors
// ============================================================================

/// Accent violet (#667eea) for titles and borders
pub const ACCENT: Color = Color::Rgb(102, 126, 234);

/// Query input text
pub const INPUT_TEXT: Color = Color::Rgb(230, 230, 240);

/// System/dim text
pub const DIM_GRAY: Color = Color::Rgb(100, 100, 100);

/// Success green
pub const SUCCESS_GREEN: Color = Color::Rgb(120, 230, 120);

/// Picture category label
pub const PICTURE_KIND: Color = Color::Rgb(250, 204, 21);

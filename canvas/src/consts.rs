//! Shared constants for the drawing engine.

use std::f64::consts::FRAC_PI_6;

// ── Viewport ────────────────────────────────────────────────────

/// Lower bound on the viewport scale factor.
pub const MIN_ZOOM: f64 = 0.1;

/// Upper bound on the viewport scale factor.
pub const MAX_ZOOM: f64 = 5.0;

/// Scale increment applied by the zoom in/out controls.
pub const ZOOM_STEP: f64 = 0.1;

// ── Grid ────────────────────────────────────────────────────────

/// Grid line spacing in logical units.
pub const GRID_SPACING: f64 = 20.0;

/// Grid line color.
pub const GRID_COLOR: &str = "rgba(0, 0, 0, 0.1)";

// ── Brush ───────────────────────────────────────────────────────

/// Smallest selectable brush size.
pub const MIN_BRUSH_SIZE: f64 = 1.0;

/// Largest selectable brush size.
pub const MAX_BRUSH_SIZE: f64 = 20.0;

/// Brush size for a fresh engine.
pub const DEFAULT_BRUSH_SIZE: f64 = 3.0;

// ── Eraser ──────────────────────────────────────────────────────

/// Hit-test tolerance around element geometry, in logical units.
pub const ERASE_TOLERANCE: f64 = 10.0;

// ── Arrows ──────────────────────────────────────────────────────

/// Arrowhead wing length in logical units.
pub const ARROW_HEAD_LENGTH: f64 = 15.0;

/// Arrowhead half-angle in radians (30°).
pub const ARROW_HEAD_ANGLE: f64 = FRAC_PI_6;

// ── Stroke styles ───────────────────────────────────────────────

/// Dash segments for the dashed stroke style: 10 on, 5 off.
pub const DASH_PATTERN: &[f64] = &[10.0, 5.0];

/// Dash segments for the dotted stroke style: 2 on, 5 off.
pub const DOT_PATTERN: &[f64] = &[2.0, 5.0];

// ── Colors ──────────────────────────────────────────────────────

/// Canvas background fill.
pub const BACKGROUND_COLOR: &str = "#FFFFFF";

/// Stroke color for a fresh engine (violet).
pub const DEFAULT_STROKE_COLOR: &str = "#8B5CF6";

/// Swatches offered by the color picker.
pub const STROKE_PALETTE: [&str; 8] = [
    "#8B5CF6", "#EC4899", "#3B82F6", "#10B981", "#F59E0B", "#EF4444", "#000000", "#6B7280",
];

/// Full opacity on the 0–100 scale.
pub const MAX_OPACITY: u8 = 100;

/// Opacity for a fresh engine.
pub const DEFAULT_OPACITY: u8 = 100;

// ── Cursor ring ─────────────────────────────────────────────────

/// Outline color of the cursor ring while erasing.
pub const ERASER_RING_COLOR: &str = "#EF4444";

/// Interior tint of the cursor ring while erasing.
pub const ERASER_RING_FILL: &str = "rgba(239, 68, 68, 0.1)";

/// Interior tint of the cursor ring while drawing with the pen.
pub const PEN_RING_FILL: &str = "rgba(139, 92, 246, 0.1)";

/// Outline width of the cursor ring in screen pixels.
pub const CURSOR_RING_WIDTH: f64 = 2.0;

// ── Text ────────────────────────────────────────────────────────

/// Font size is the element's line width times this factor.
pub const TEXT_FONT_SCALE: f64 = 8.0;

/// Font family used for text elements.
pub const TEXT_FONT_FAMILY: &str = "Arial";

// ── Outbox ──────────────────────────────────────────────────────

/// Most unacknowledged writes held before the oldest is dropped.
pub const OUTBOX_CAPACITY: usize = 256;

/// Send attempts per write before it is dropped as unsendable.
pub const MAX_WRITE_ATTEMPTS: u32 = 5;

//! Input model: tools, style settings, and the gesture state machine.
//!
//! `Tool` and `Modifiers` capture the user's intent at the time of a
//! pointer or key event. `InputState` is the active gesture being tracked
//! between pointer-down and pointer-up, carrying the context needed to
//! grow a draft element or compute pan/zoom deltas until release.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::consts::{DEFAULT_BRUSH_SIZE, DEFAULT_OPACITY, DEFAULT_STROKE_COLOR};
use crate::element::{DrawElement, StrokeStyle};
use crate::viewport::Point;

/// Which tool is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    /// Pointer tool; interacts with nothing yet.
    Select,
    /// Freehand drawing (default).
    #[default]
    Pen,
    /// Remove own elements under the cursor.
    Eraser,
    /// Straight line segment.
    Line,
    /// Axis-aligned rectangle outline.
    Rectangle,
    /// Circle from center to edge.
    Circle,
    /// Line with an arrowhead.
    Arrow,
    /// Place literal text.
    Text,
    /// Drag the viewport.
    Pan,
}

impl Tool {
    /// Whether a pointer-down with this tool starts a draft element.
    #[must_use]
    pub fn is_draw(self) -> bool {
        matches!(self, Self::Pen | Self::Line | Self::Rectangle | Self::Circle | Self::Arrow)
    }
}

/// Keyboard modifier keys held during an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Shift key is held.
    pub shift: bool,
    /// Ctrl key is held.
    pub ctrl: bool,
    /// Meta / Command key is held.
    pub meta: bool,
}

impl Modifiers {
    /// Whether the platform shortcut key (Ctrl or Cmd) is held.
    #[must_use]
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }
}

/// A keyboard key.
///
/// The inner string holds the key name as reported by the host (e.g.
/// `"g"`, `"["`, `"1"`). Hosts normalize the spacebar to `"Space"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

impl Key {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One active touch contact in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub x: f64,
    pub y: f64,
    /// Contact pressure in 0.0–1.0 on devices that report it.
    pub force: Option<f64>,
}

impl TouchPoint {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, force: None }
    }

    #[must_use]
    pub fn screen(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Contact pressure, with full pressure assumed when unreported.
    #[must_use]
    pub fn pressure(&self) -> f64 {
        self.force.unwrap_or(1.0)
    }
}

/// Style settings applied to the next drawn element.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSettings {
    /// Stroke color as a `#RRGGBB` hex string.
    pub color: String,
    /// Base stroke width before pressure modulation.
    pub brush_size: f64,
    pub stroke_style: StrokeStyle,
    /// 0–100.
    pub opacity: u8,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            color: DEFAULT_STROKE_COLOR.to_string(),
            brush_size: DEFAULT_BRUSH_SIZE,
            stroke_style: StrokeStyle::Solid,
            opacity: DEFAULT_OPACITY,
        }
    }
}

/// Internal state for the input state machine.
///
/// Each active variant carries the gesture context needed to apply
/// incremental updates and finish cleanly on release.
#[derive(Debug, Clone, PartialEq)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    Idle,
    /// A draft element is being grown from a pointer-down or single touch.
    Drawing {
        /// The in-progress element, committed on release.
        draft: DrawElement,
    },
    /// The viewport is being dragged.
    Panning {
        /// Screen-space position of the previous pointer event, used to
        /// compute the pan delta.
        last_screen: Point,
    },
    /// A two-finger gesture is adjusting zoom and pan together.
    Pinching {
        /// Distance between the two contacts at the previous event.
        last_distance: f64,
        /// Midpoint of the two contacts at the previous event.
        last_midpoint: Point,
    },
    /// Waiting on the host to supply literal text.
    TextPrompt {
        /// Logical point where the text element will be anchored.
        anchor: Point,
    },
}

impl Default for InputState {
    fn default() -> Self {
        Self::Idle
    }
}

//! Rendering: turns the scene into an ordered display list.
//!
//! The renderer is a pure function of its inputs and produces
//! [`DrawCmd`]s instead of pixels, so hosts with different rasterizers
//! (an HTML canvas shell, a terminal preview, a test harness) replay the
//! same list. Commands between [`DrawCmd::PushTransform`] and
//! [`DrawCmd::PopTransform`] are in logical coordinates; everything
//! outside that span is in screen coordinates.
//!
//! Draw order: background, grid, committed elements oldest first, the
//! in-progress draft, then the screen-space cursor ring.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use crate::consts::{
    ARROW_HEAD_ANGLE, ARROW_HEAD_LENGTH, BACKGROUND_COLOR, CURSOR_RING_WIDTH, DASH_PATTERN,
    DOT_PATTERN, ERASER_RING_COLOR, ERASER_RING_FILL, GRID_COLOR, GRID_SPACING, PEN_RING_FILL,
    TEXT_FONT_FAMILY, TEXT_FONT_SCALE,
};
use crate::element::{DrawElement, Shape, StrokeStyle};
use crate::input::{Tool, ToolSettings};
use crate::viewport::{Point, Viewport};

/// Stroke parameters with opacity already baked into the color.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    /// Color with a two-digit hex alpha suffix (`#RRGGBBAA`).
    pub color: String,
    pub width: f64,
    /// Dash segments; empty means solid.
    pub dash: &'static [f64],
}

/// One rasterization step.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCmd {
    /// Fill the whole surface with a solid color.
    Clear { color: &'static str },
    /// Enter the viewport transform: translate by the offset, then scale.
    PushTransform { offset_x: f64, offset_y: f64, scale: f64 },
    /// Leave the viewport transform.
    PopTransform,
    /// Stroke a straight segment.
    Segment { from: Point, to: Point, stroke: Stroke },
    /// Stroke an open polyline through the points in order.
    Polyline { points: Vec<Point>, stroke: Stroke },
    /// Stroke an axis-aligned rectangle outline. Width and height follow
    /// the drag direction and may be negative.
    RectOutline { origin: Point, width: f64, height: f64, stroke: Stroke },
    /// Stroke a full circle.
    CircleOutline { center: Point, radius: f64, stroke: Stroke },
    /// Fill text anchored at its baseline.
    FillText { anchor: Point, text: String, font: String, color: String },
    /// Tool cursor preview in screen space: a filled, outlined ring.
    CursorRing {
        center: Point,
        radius: f64,
        stroke_color: String,
        fill_color: &'static str,
        width: f64,
    },
}

/// Read-only inputs for one frame.
#[derive(Debug, Clone, Copy)]
pub struct Scene<'a> {
    /// Committed elements, oldest first.
    pub elements: &'a [DrawElement],
    /// In-progress element drawn above everything committed.
    pub draft: Option<&'a DrawElement>,
    pub viewport: &'a Viewport,
    /// Viewport width in screen pixels.
    pub width: f64,
    /// Viewport height in screen pixels.
    pub height: f64,
    pub show_grid: bool,
    /// Raw pointer position in screen space, if the pointer is over the
    /// surface.
    pub cursor: Option<Point>,
    pub tool: Tool,
    pub settings: &'a ToolSettings,
}

/// Render the full scene to an ordered display list.
#[must_use]
pub fn draw(scene: &Scene<'_>) -> Vec<DrawCmd> {
    let viewport = scene.viewport;
    let mut cmds = vec![
        DrawCmd::Clear { color: BACKGROUND_COLOR },
        DrawCmd::PushTransform {
            offset_x: viewport.offset_x,
            offset_y: viewport.offset_y,
            scale: viewport.scale,
        },
    ];

    if scene.show_grid {
        push_grid(&mut cmds, viewport, scene.width, scene.height);
    }

    for element in scene.elements {
        push_element(&mut cmds, element);
    }
    if let Some(draft) = scene.draft {
        push_element(&mut cmds, draft);
    }

    cmds.push(DrawCmd::PopTransform);

    if let Some(center) = scene.cursor {
        if matches!(scene.tool, Tool::Pen | Tool::Eraser) {
            cmds.push(cursor_ring(center, scene.tool, scene.settings, viewport.scale));
        }
    }

    cmds
}

/// Bake a 0–100 opacity into a color as a two-digit hex alpha suffix.
#[must_use]
pub fn with_alpha(color: &str, opacity: u8) -> String {
    let alpha = (f64::from(opacity) / 100.0 * 255.0).floor() as u8;
    format!("{color}{alpha:02x}")
}

// =============================================================
// Grid
// =============================================================

/// Vertical and horizontal lines at logical grid multiples covering the
/// visible region. Bounds are snapped outward so lines reach the screen
/// edges at any pan/zoom.
fn push_grid(cmds: &mut Vec<DrawCmd>, viewport: &Viewport, width: f64, height: f64) {
    let start_x = (-viewport.offset_x / viewport.scale / GRID_SPACING).floor() * GRID_SPACING;
    let start_y = (-viewport.offset_y / viewport.scale / GRID_SPACING).floor() * GRID_SPACING;
    let end_x = ((width - viewport.offset_x) / viewport.scale / GRID_SPACING).ceil() * GRID_SPACING;
    let end_y = ((height - viewport.offset_y) / viewport.scale / GRID_SPACING).ceil() * GRID_SPACING;

    // Constant on-screen thickness regardless of zoom.
    let stroke = Stroke {
        color: GRID_COLOR.to_string(),
        width: 1.0 / viewport.scale,
        dash: &[],
    };

    let mut x = start_x;
    while x <= end_x {
        cmds.push(DrawCmd::Segment {
            from: Point::new(x, start_y),
            to: Point::new(x, end_y),
            stroke: stroke.clone(),
        });
        x += GRID_SPACING;
    }
    let mut y = start_y;
    while y <= end_y {
        cmds.push(DrawCmd::Segment {
            from: Point::new(start_x, y),
            to: Point::new(end_x, y),
            stroke: stroke.clone(),
        });
        y += GRID_SPACING;
    }
}

// =============================================================
// Elements
// =============================================================

fn push_element(cmds: &mut Vec<DrawCmd>, element: &DrawElement) {
    let stroke = element_stroke(element);
    match &element.shape {
        Shape::Pen { points } => {
            // A single sample has no segment to stroke yet.
            if points.len() > 1 {
                cmds.push(DrawCmd::Polyline { points: points.clone(), stroke });
            }
        }
        Shape::Line { start, end } => {
            cmds.push(DrawCmd::Segment { from: *start, to: *end, stroke });
        }
        Shape::Arrow { start, end } => push_arrow(cmds, *start, *end, &stroke),
        Shape::Rectangle { start, end } => {
            cmds.push(DrawCmd::RectOutline {
                origin: *start,
                width: end.x - start.x,
                height: end.y - start.y,
                stroke,
            });
        }
        Shape::Circle { start, end } => {
            cmds.push(DrawCmd::CircleOutline {
                center: *start,
                radius: (end.x - start.x).hypot(end.y - start.y),
                stroke,
            });
        }
        Shape::Text { anchor, text } => {
            cmds.push(DrawCmd::FillText {
                anchor: *anchor,
                text: text.clone(),
                font: format!("{}px {TEXT_FONT_FAMILY}", element.line_width * TEXT_FONT_SCALE),
                color: stroke.color,
            });
        }
    }
}

/// Shaft plus two wing segments swept back from the tip.
fn push_arrow(cmds: &mut Vec<DrawCmd>, start: Point, end: Point, stroke: &Stroke) {
    let angle = (end.y - start.y).atan2(end.x - start.x);
    let left = Point::new(
        end.x - ARROW_HEAD_LENGTH * (angle - ARROW_HEAD_ANGLE).cos(),
        end.y - ARROW_HEAD_LENGTH * (angle - ARROW_HEAD_ANGLE).sin(),
    );
    let right = Point::new(
        end.x - ARROW_HEAD_LENGTH * (angle + ARROW_HEAD_ANGLE).cos(),
        end.y - ARROW_HEAD_LENGTH * (angle + ARROW_HEAD_ANGLE).sin(),
    );
    cmds.push(DrawCmd::Segment { from: start, to: end, stroke: stroke.clone() });
    cmds.push(DrawCmd::Segment { from: end, to: left, stroke: stroke.clone() });
    cmds.push(DrawCmd::Segment { from: end, to: right, stroke: stroke.clone() });
}

fn element_stroke(element: &DrawElement) -> Stroke {
    Stroke {
        color: with_alpha(&element.color, element.opacity),
        width: element.line_width,
        dash: dash_segments(element.stroke_style),
    }
}

fn dash_segments(style: StrokeStyle) -> &'static [f64] {
    match style {
        StrokeStyle::Solid => &[],
        StrokeStyle::Dashed => DASH_PATTERN,
        StrokeStyle::Dotted => DOT_PATTERN,
    }
}

// =============================================================
// Cursor ring
// =============================================================

/// Brush-sized preview circle following the raw pointer. Radius tracks
/// the zoom so the ring matches what a stroke would cover on screen.
fn cursor_ring(center: Point, tool: Tool, settings: &ToolSettings, scale: f64) -> DrawCmd {
    let (stroke_color, fill_color) = if tool == Tool::Eraser {
        (ERASER_RING_COLOR.to_string(), ERASER_RING_FILL)
    } else {
        (settings.color.clone(), PEN_RING_FILL)
    };
    DrawCmd::CursorRing {
        center,
        radius: settings.brush_size * scale,
        stroke_color,
        fill_color,
        width: CURSOR_RING_WIDTH,
    }
}

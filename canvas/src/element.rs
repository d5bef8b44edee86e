//! Element model: drawn shapes, their geometry, and the flat record form.
//!
//! This module defines what lives on the canvas (`DrawElement`, `Shape`),
//! the id allocator for locally created elements, and the nullable-column
//! record form (`ElementRecord`) used on the wire and in storage.
//!
//! Geometry is an enum so each kind carries exactly the fields it uses: a
//! pen stroke never has a start/end pair and a line never has a polyline.
//! `DrawElement` serializes through `ElementRecord`, and the conversion
//! back validates that a record's populated columns match its kind.

#[cfg(test)]
#[path = "element_test.rs"]
mod element_test;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::MAX_OPACITY;
use crate::viewport::Point;

/// The kind of a drawn element.
///
/// Interaction modes (select, eraser, pan) are tools, never element kinds;
/// see [`crate::input::Tool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Pen,
    Line,
    Arrow,
    Rectangle,
    Circle,
    Text,
}

impl ElementKind {
    /// Lowercase name as written on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pen => "pen",
            Self::Line => "line",
            Self::Arrow => "arrow",
            Self::Rectangle => "rectangle",
            Self::Circle => "circle",
            Self::Text => "text",
        }
    }
}

/// Dash pattern applied to an element's outline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

impl StrokeStyle {
    /// Lowercase name as written on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Solid => "solid",
            Self::Dashed => "dashed",
            Self::Dotted => "dotted",
        }
    }
}

/// Geometry of a drawn element, variant by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Freehand polyline sampled as the pointer moved. Never empty.
    Pen { points: Vec<Point> },
    /// Straight segment.
    Line { start: Point, end: Point },
    /// Straight segment with an arrowhead at `end`.
    Arrow { start: Point, end: Point },
    /// Axis-aligned rectangle spanned corner to corner; `end` may sit in
    /// any quadrant relative to `start`.
    Rectangle { start: Point, end: Point },
    /// Circle centered at `start` with radius to `end`.
    Circle { start: Point, end: Point },
    /// Literal text anchored at its baseline.
    Text { anchor: Point, text: String },
}

impl Shape {
    #[must_use]
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Pen { .. } => ElementKind::Pen,
            Self::Line { .. } => ElementKind::Line,
            Self::Arrow { .. } => ElementKind::Arrow,
            Self::Rectangle { .. } => ElementKind::Rectangle,
            Self::Circle { .. } => ElementKind::Circle,
            Self::Text { .. } => ElementKind::Text,
        }
    }

    /// Rebuild a shape from record columns, rejecting any combination that
    /// does not match the kind exactly.
    fn from_record_fields(
        kind: ElementKind,
        points: Option<Vec<Point>>,
        start_point: Option<Point>,
        end_point: Option<Point>,
        text: Option<String>,
    ) -> Result<Self, RecordError> {
        let name = kind.as_str();
        match kind {
            ElementKind::Pen => {
                reject_present(name, "start_point", start_point.is_some())?;
                reject_present(name, "end_point", end_point.is_some())?;
                reject_present(name, "text", text.is_some())?;
                let points = points.ok_or(RecordError::MissingField { kind: name, field: "points" })?;
                if points.is_empty() {
                    return Err(RecordError::EmptyStroke);
                }
                Ok(Self::Pen { points })
            }
            ElementKind::Line | ElementKind::Arrow | ElementKind::Rectangle | ElementKind::Circle => {
                reject_present(name, "points", points.is_some())?;
                reject_present(name, "text", text.is_some())?;
                let start = start_point.ok_or(RecordError::MissingField { kind: name, field: "start_point" })?;
                let end = end_point.ok_or(RecordError::MissingField { kind: name, field: "end_point" })?;
                Ok(match kind {
                    ElementKind::Line => Self::Line { start, end },
                    ElementKind::Arrow => Self::Arrow { start, end },
                    ElementKind::Rectangle => Self::Rectangle { start, end },
                    _ => Self::Circle { start, end },
                })
            }
            ElementKind::Text => {
                reject_present(name, "points", points.is_some())?;
                reject_present(name, "end_point", end_point.is_some())?;
                let anchor = start_point.ok_or(RecordError::MissingField { kind: name, field: "start_point" })?;
                let text = text.ok_or(RecordError::MissingField { kind: name, field: "text" })?;
                Ok(Self::Text { anchor, text })
            }
        }
    }
}

fn reject_present(kind: &'static str, field: &'static str, present: bool) -> Result<(), RecordError> {
    if present {
        return Err(RecordError::UnexpectedField { kind, field });
    }
    Ok(())
}

/// One committed element. Immutable once in the store; edits are modeled
/// as delete plus redraw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ElementRecord", try_from = "ElementRecord")]
pub struct DrawElement {
    /// Unique across collaborating clients; see [`IdAllocator`].
    pub id: String,
    pub shape: Shape,
    /// Stroke color as a `#RRGGBB` hex string.
    pub color: String,
    /// Stroke width, already scaled by contact pressure. At least 1.0.
    pub line_width: f64,
    pub stroke_style: StrokeStyle,
    /// 0–100; baked into the color at render time.
    pub opacity: u8,
    /// Identity of the drawing user. Erasing is scoped to this.
    pub author_id: String,
}

impl DrawElement {
    #[must_use]
    pub fn kind(&self) -> ElementKind {
        self.shape.kind()
    }
}

/// Violation found while converting a flat record into a typed element.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("{kind} record missing required field `{field}`")]
    MissingField { kind: &'static str, field: &'static str },
    #[error("{kind} record carries unexpected field `{field}`")]
    UnexpectedField { kind: &'static str, field: &'static str },
    #[error("pen record has an empty polyline")]
    EmptyStroke,
}

/// Flat form of an element: nullable geometry columns beside the scalar
/// fields, mirroring the storage schema. This is the wire shape for
/// element payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    pub id: String,
    pub kind: ElementKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<Point>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_point: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_point: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub color: String,
    pub line_width: f64,
    pub author_id: String,
    /// Records written before stroke styles existed have no column value.
    #[serde(default)]
    pub stroke_style: StrokeStyle,
    #[serde(default = "full_opacity")]
    pub opacity: u8,
}

fn full_opacity() -> u8 {
    MAX_OPACITY
}

impl From<DrawElement> for ElementRecord {
    fn from(element: DrawElement) -> Self {
        let DrawElement { id, shape, color, line_width, stroke_style, opacity, author_id } = element;
        let (kind, points, start_point, end_point, text) = match shape {
            Shape::Pen { points } => (ElementKind::Pen, Some(points), None, None, None),
            Shape::Line { start, end } => (ElementKind::Line, None, Some(start), Some(end), None),
            Shape::Arrow { start, end } => (ElementKind::Arrow, None, Some(start), Some(end), None),
            Shape::Rectangle { start, end } => (ElementKind::Rectangle, None, Some(start), Some(end), None),
            Shape::Circle { start, end } => (ElementKind::Circle, None, Some(start), Some(end), None),
            Shape::Text { anchor, text } => (ElementKind::Text, None, Some(anchor), None, Some(text)),
        };
        Self {
            id,
            kind,
            points,
            start_point,
            end_point,
            text,
            color,
            line_width,
            author_id,
            stroke_style,
            opacity,
        }
    }
}

impl TryFrom<ElementRecord> for DrawElement {
    type Error = RecordError;

    fn try_from(record: ElementRecord) -> Result<Self, Self::Error> {
        let ElementRecord {
            id,
            kind,
            points,
            start_point,
            end_point,
            text,
            color,
            line_width,
            author_id,
            stroke_style,
            opacity,
        } = record;
        let shape = Shape::from_record_fields(kind, points, start_point, end_point, text)?;
        Ok(Self {
            id,
            shape,
            color,
            line_width,
            stroke_style,
            opacity: opacity.min(MAX_OPACITY),
            author_id,
        })
    }
}

/// Allocates element ids unique across collaborating clients.
///
/// Ids embed a random per-session tag so concurrent clients' counters
/// never collide: `element-{tag}-{n}`.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    session_tag: String,
    counter: u64,
}

impl IdAllocator {
    #[must_use]
    pub fn new(session_tag: impl Into<String>) -> Self {
        Self { session_tag: session_tag.into(), counter: 0 }
    }

    /// Mint the next id for this session.
    pub fn next_id(&mut self) -> String {
        self.counter += 1;
        format!("element-{}-{}", self.session_tag, self.counter)
    }
}

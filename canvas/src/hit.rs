//! Eraser hit-testing against element geometry.
//!
//! One set of distance tests serves mouse and touch input alike. All
//! coordinates here are logical; callers convert from screen space and
//! pass the tolerance in logical units.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::element::{DrawElement, Shape};
use crate::viewport::Point;

/// Find the first element under the eraser, scanning in insertion order.
///
/// Only elements drawn by `author_id` are candidates: erasing another
/// user's work is refused at this layer, so an eraser pass over a mixed
/// region removes own strokes and leaves the rest standing.
#[must_use]
pub fn find_erase_target<'a>(
    elements: &'a [DrawElement],
    point: Point,
    tolerance: f64,
    author_id: &str,
) -> Option<&'a DrawElement> {
    elements
        .iter()
        .find(|el| el.author_id == author_id && hits_element(el, point, tolerance))
}

/// Whether `point` falls within `tolerance` of the element's geometry.
///
/// Text elements never match; the eraser does not target them.
#[must_use]
pub fn hits_element(element: &DrawElement, point: Point, tolerance: f64) -> bool {
    match &element.shape {
        // Per-vertex box test. Long segments between distant samples have
        // untested interiors, which matches how strokes are sampled.
        Shape::Pen { points } => points
            .iter()
            .any(|p| (p.x - point.x).abs() < tolerance && (p.y - point.y).abs() < tolerance),
        Shape::Line { start, end } | Shape::Arrow { start, end } => {
            distance_to_segment(point, *start, *end) < tolerance
        }
        Shape::Circle { start, end } => {
            let radius = distance(*start, *end);
            (distance(point, *start) - radius).abs() < tolerance
        }
        Shape::Rectangle { start, end } => near_rectangle_border(point, *start, *end, tolerance),
        Shape::Text { .. } => false,
    }
}

fn distance(a: Point, b: Point) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Distance from `point` to the segment `start`–`end`. A zero-length
/// segment degrades to plain point distance.
fn distance_to_segment(point: Point, start: Point, end: Point) -> f64 {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let length_squared = dx * dx + dy * dy;
    if length_squared == 0.0 {
        return distance(point, start);
    }
    let t = (((point.x - start.x) * dx + (point.y - start.y) * dy) / length_squared).clamp(0.0, 1.0);
    let projected = Point::new(start.x + t * dx, start.y + t * dy);
    distance(point, projected)
}

/// Near any of the four edges of the rectangle's border, within that
/// edge's span extended by the tolerance. The interior does not count.
fn near_rectangle_border(point: Point, start: Point, end: Point, tolerance: f64) -> bool {
    let min_x = start.x.min(end.x);
    let max_x = start.x.max(end.x);
    let min_y = start.y.min(end.y);
    let max_y = start.y.max(end.y);

    let within_x = point.x >= min_x - tolerance && point.x <= max_x + tolerance;
    let within_y = point.y >= min_y - tolerance && point.y <= max_y + tolerance;

    let near_left = (point.x - min_x).abs() < tolerance && within_y;
    let near_right = (point.x - max_x).abs() < tolerance && within_y;
    let near_top = (point.y - min_y).abs() < tolerance && within_x;
    let near_bottom = (point.y - max_y).abs() < tolerance && within_x;

    near_left || near_right || near_top || near_bottom
}

use super::*;
use crate::element::StrokeStyle;

const TOLERANCE: f64 = 10.0;

// =============================================================
// Helpers
// =============================================================

fn element(id: &str, author: &str, shape: Shape) -> DrawElement {
    DrawElement {
        id: id.to_string(),
        shape,
        color: "#8B5CF6".to_string(),
        line_width: 3.0,
        stroke_style: StrokeStyle::Solid,
        opacity: 100,
        author_id: author.to_string(),
    }
}

fn line(id: &str, author: &str, start: (f64, f64), end: (f64, f64)) -> DrawElement {
    element(id, author, Shape::Line {
        start: Point::new(start.0, start.1),
        end: Point::new(end.0, end.1),
    })
}

fn hits(shape: Shape, x: f64, y: f64) -> bool {
    hits_element(&element("e", "alice", shape), Point::new(x, y), TOLERANCE)
}

// =============================================================
// Lines and arrows
// =============================================================

#[test]
fn point_near_line_hits() {
    let shape = Shape::Line { start: Point::new(0.0, 0.0), end: Point::new(100.0, 0.0) };
    assert!(hits(shape, 50.0, 5.0));
}

#[test]
fn point_far_from_line_misses() {
    let shape = Shape::Line { start: Point::new(0.0, 0.0), end: Point::new(100.0, 0.0) };
    assert!(!hits(shape, 50.0, 50.0));
}

#[test]
fn projection_clamps_to_segment_ends() {
    let shape = Shape::Line { start: Point::new(0.0, 0.0), end: Point::new(100.0, 0.0) };
    // Beyond the end the distance is measured to the endpoint itself.
    assert!(hits(shape.clone(), 105.0, 0.0));
    assert!(!hits(shape, 115.0, 0.0));
}

#[test]
fn zero_length_line_degrades_to_point_distance() {
    let shape = Shape::Line { start: Point::new(20.0, 20.0), end: Point::new(20.0, 20.0) };
    assert!(hits(shape.clone(), 25.0, 25.0));
    assert!(!hits(shape, 40.0, 20.0));
}

#[test]
fn arrow_uses_segment_distance() {
    let shape = Shape::Arrow { start: Point::new(0.0, 0.0), end: Point::new(0.0, 80.0) };
    assert!(hits(shape.clone(), 6.0, 40.0));
    assert!(!hits(shape, 20.0, 40.0));
}

// =============================================================
// Pen strokes
// =============================================================

#[test]
fn pen_hit_is_per_vertex_box() {
    let shape = Shape::Pen {
        points: vec![Point::new(0.0, 0.0), Point::new(30.0, 0.0)],
    };
    // (9, 9) is within the box of the first vertex even though its
    // straight-line distance exceeds 10.
    assert!(hits(shape.clone(), 9.0, 9.0));
    // Midway between distant samples there is no vertex to hit.
    assert!(!hits(shape, 15.0, 0.0));
}

#[test]
fn pen_single_point_is_erasable() {
    let shape = Shape::Pen { points: vec![Point::new(5.0, 5.0)] };
    assert!(hits(shape, 8.0, 2.0));
}

// =============================================================
// Circles
// =============================================================

#[test]
fn circle_hit_is_on_the_ring() {
    let shape = Shape::Circle { start: Point::new(50.0, 50.0), end: Point::new(80.0, 50.0) };
    // Radius 30: five units inside the ring still hits.
    assert!(hits(shape.clone(), 15.0, 50.0));
    // The center is far from the ring.
    assert!(!hits(shape.clone(), 50.0, 50.0));
    // Well outside misses.
    assert!(!hits(shape, 95.0, 50.0));
}

// =============================================================
// Rectangles
// =============================================================

#[test]
fn rectangle_border_hits_interior_misses() {
    let shape = Shape::Rectangle { start: Point::new(10.0, 10.0), end: Point::new(110.0, 60.0) };
    assert!(hits(shape.clone(), 10.0, 35.0));
    assert!(hits(shape.clone(), 5.0, 35.0));
    assert!(hits(shape.clone(), 60.0, 65.0));
    assert!(!hits(shape.clone(), 60.0, 35.0));
    assert!(!hits(shape, 60.0, 75.0));
}

#[test]
fn rectangle_corner_within_extended_bounds_hits() {
    let shape = Shape::Rectangle { start: Point::new(10.0, 10.0), end: Point::new(110.0, 60.0) };
    assert!(hits(shape, 115.0, 62.0));
}

#[test]
fn inverted_rectangle_normalizes_corners() {
    // Dragged up and to the left: start is the bottom-right corner.
    let shape = Shape::Rectangle { start: Point::new(110.0, 60.0), end: Point::new(10.0, 10.0) };
    assert!(hits(shape.clone(), 10.0, 35.0));
    assert!(!hits(shape, 60.0, 35.0));
}

// =============================================================
// Text
// =============================================================

#[test]
fn text_is_never_an_erase_target() {
    let shape = Shape::Text { anchor: Point::new(40.0, 40.0), text: "hello".to_string() };
    assert!(!hits(shape, 40.0, 40.0));
}

// =============================================================
// find_erase_target
// =============================================================

#[test]
fn target_must_match_author() {
    let elements = vec![line("theirs", "bob", (0.0, 0.0), (100.0, 0.0))];
    let hit = find_erase_target(&elements, Point::new(50.0, 0.0), TOLERANCE, "alice");
    assert!(hit.is_none());
}

#[test]
fn own_element_is_found() {
    let elements = vec![
        line("theirs", "bob", (0.0, 0.0), (100.0, 0.0)),
        line("mine", "alice", (0.0, 0.0), (100.0, 0.0)),
    ];
    let hit = find_erase_target(&elements, Point::new(50.0, 0.0), TOLERANCE, "alice");
    assert_eq!(hit.map(|el| el.id.as_str()), Some("mine"));
}

#[test]
fn first_match_in_insertion_order_wins() {
    let elements = vec![
        line("older", "alice", (0.0, 0.0), (100.0, 0.0)),
        line("newer", "alice", (0.0, 0.0), (100.0, 0.0)),
    ];
    let hit = find_erase_target(&elements, Point::new(50.0, 0.0), TOLERANCE, "alice");
    assert_eq!(hit.map(|el| el.id.as_str()), Some("older"));
}

#[test]
fn no_target_when_nothing_is_near() {
    let elements = vec![line("a", "alice", (0.0, 0.0), (100.0, 0.0))];
    let hit = find_erase_target(&elements, Point::new(500.0, 500.0), TOLERANCE, "alice");
    assert!(hit.is_none());
}

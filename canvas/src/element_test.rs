#![allow(clippy::float_cmp)]

use serde_json::json;

use super::*;

// =============================================================
// Helpers
// =============================================================

fn pen_element(id: &str) -> DrawElement {
    DrawElement {
        id: id.to_string(),
        shape: Shape::Pen {
            points: vec![Point::new(0.0, 0.0), Point::new(10.0, 5.0)],
        },
        color: "#8B5CF6".to_string(),
        line_width: 3.0,
        stroke_style: StrokeStyle::Solid,
        opacity: 100,
        author_id: "alice@example.com".to_string(),
    }
}

fn line_element(id: &str) -> DrawElement {
    DrawElement {
        id: id.to_string(),
        shape: Shape::Line {
            start: Point::new(0.0, 0.0),
            end: Point::new(100.0, 0.0),
        },
        color: "#EF4444".to_string(),
        line_width: 2.0,
        stroke_style: StrokeStyle::Dashed,
        opacity: 50,
        author_id: "bob@example.com".to_string(),
    }
}

fn text_element(id: &str) -> DrawElement {
    DrawElement {
        id: id.to_string(),
        shape: Shape::Text {
            anchor: Point::new(40.0, 40.0),
            text: "hello".to_string(),
        },
        color: "#000000".to_string(),
        line_width: 3.0,
        stroke_style: StrokeStyle::Solid,
        opacity: 100,
        author_id: "alice@example.com".to_string(),
    }
}

// =============================================================
// Kinds and shapes
// =============================================================

#[test]
fn kind_as_str_is_lowercase() {
    assert_eq!(ElementKind::Pen.as_str(), "pen");
    assert_eq!(ElementKind::Rectangle.as_str(), "rectangle");
    assert_eq!(ElementKind::Text.as_str(), "text");
}

#[test]
fn shape_reports_its_kind() {
    assert_eq!(pen_element("a").kind(), ElementKind::Pen);
    assert_eq!(line_element("b").kind(), ElementKind::Line);
    assert_eq!(text_element("c").kind(), ElementKind::Text);
    let circle = Shape::Circle { start: Point::new(0.0, 0.0), end: Point::new(3.0, 4.0) };
    assert_eq!(circle.kind(), ElementKind::Circle);
}

#[test]
fn stroke_style_defaults_to_solid() {
    assert_eq!(StrokeStyle::default(), StrokeStyle::Solid);
}

#[test]
fn stroke_style_as_str_matches_wire_names() {
    assert_eq!(StrokeStyle::Solid.as_str(), "solid");
    assert_eq!(StrokeStyle::Dashed.as_str(), "dashed");
    assert_eq!(StrokeStyle::Dotted.as_str(), "dotted");
}

// =============================================================
// Record conversion: element -> record
// =============================================================

#[test]
fn pen_record_populates_points_only() {
    let record = ElementRecord::from(pen_element("element-x-1"));
    assert_eq!(record.kind, ElementKind::Pen);
    assert_eq!(record.points.as_ref().map(Vec::len), Some(2));
    assert!(record.start_point.is_none());
    assert!(record.end_point.is_none());
    assert!(record.text.is_none());
}

#[test]
fn line_record_populates_endpoints_only() {
    let record = ElementRecord::from(line_element("element-x-2"));
    assert_eq!(record.kind, ElementKind::Line);
    assert!(record.points.is_none());
    assert_eq!(record.start_point, Some(Point::new(0.0, 0.0)));
    assert_eq!(record.end_point, Some(Point::new(100.0, 0.0)));
    assert!(record.text.is_none());
}

#[test]
fn text_record_uses_start_point_as_anchor() {
    let record = ElementRecord::from(text_element("element-x-3"));
    assert_eq!(record.kind, ElementKind::Text);
    assert_eq!(record.start_point, Some(Point::new(40.0, 40.0)));
    assert!(record.end_point.is_none());
    assert_eq!(record.text.as_deref(), Some("hello"));
}

// =============================================================
// Record conversion: record -> element
// =============================================================

#[test]
fn record_round_trip_preserves_element() {
    for element in [pen_element("e1"), line_element("e2"), text_element("e3")] {
        let record = ElementRecord::from(element.clone());
        let back = DrawElement::try_from(record).unwrap();
        assert_eq!(back, element);
    }
}

#[test]
fn pen_record_with_endpoint_is_rejected() {
    let mut record = ElementRecord::from(pen_element("e"));
    record.end_point = Some(Point::new(1.0, 1.0));
    let err = DrawElement::try_from(record).unwrap_err();
    assert_eq!(err, RecordError::UnexpectedField { kind: "pen", field: "end_point" });
}

#[test]
fn pen_record_without_points_is_rejected() {
    let mut record = ElementRecord::from(pen_element("e"));
    record.points = None;
    let err = DrawElement::try_from(record).unwrap_err();
    assert_eq!(err, RecordError::MissingField { kind: "pen", field: "points" });
}

#[test]
fn pen_record_with_empty_polyline_is_rejected() {
    let mut record = ElementRecord::from(pen_element("e"));
    record.points = Some(Vec::new());
    let err = DrawElement::try_from(record).unwrap_err();
    assert_eq!(err, RecordError::EmptyStroke);
}

#[test]
fn line_record_without_end_is_rejected() {
    let mut record = ElementRecord::from(line_element("e"));
    record.end_point = None;
    let err = DrawElement::try_from(record).unwrap_err();
    assert_eq!(err, RecordError::MissingField { kind: "line", field: "end_point" });
}

#[test]
fn rectangle_record_with_polyline_is_rejected() {
    let mut record = ElementRecord::from(line_element("e"));
    record.kind = ElementKind::Rectangle;
    record.points = Some(vec![Point::new(0.0, 0.0)]);
    let err = DrawElement::try_from(record).unwrap_err();
    assert_eq!(err, RecordError::UnexpectedField { kind: "rectangle", field: "points" });
}

#[test]
fn text_record_without_text_is_rejected() {
    let mut record = ElementRecord::from(text_element("e"));
    record.text = None;
    let err = DrawElement::try_from(record).unwrap_err();
    assert_eq!(err, RecordError::MissingField { kind: "text", field: "text" });
}

#[test]
fn out_of_range_opacity_clamps_on_ingest() {
    let mut record = ElementRecord::from(line_element("e"));
    record.opacity = 250;
    let element = DrawElement::try_from(record).unwrap();
    assert_eq!(element.opacity, 100);
}

// =============================================================
// JSON wire shape
// =============================================================

#[test]
fn element_serializes_as_flat_record() {
    let value = serde_json::to_value(pen_element("element-x-9")).unwrap();
    assert_eq!(value["id"], "element-x-9");
    assert_eq!(value["kind"], "pen");
    assert_eq!(value["points"][1]["x"], 10.0);
    assert_eq!(value["stroke_style"], "solid");
    // Absent geometry columns are omitted, not null.
    assert!(value.get("start_point").is_none());
    assert!(value.get("end_point").is_none());
    assert!(value.get("text").is_none());
}

#[test]
fn json_round_trip_validates_through_record() {
    let original = line_element("element-x-10");
    let json = serde_json::to_string(&original).unwrap();
    let restored: DrawElement = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, original);
}

#[test]
fn malformed_json_geometry_fails_deserialization() {
    // A pen payload carrying an end_point must not deserialize.
    let value = json!({
        "id": "e",
        "kind": "pen",
        "points": [{"x": 0.0, "y": 0.0}],
        "end_point": {"x": 1.0, "y": 1.0},
        "color": "#000000",
        "line_width": 1.0,
        "author_id": "alice",
    });
    assert!(serde_json::from_value::<DrawElement>(value).is_err());
}

#[test]
fn missing_style_columns_fall_back_to_defaults() {
    let value = json!({
        "id": "e",
        "kind": "line",
        "start_point": {"x": 0.0, "y": 0.0},
        "end_point": {"x": 5.0, "y": 5.0},
        "color": "#10B981",
        "line_width": 2.0,
        "author_id": "bob",
    });
    let element: DrawElement = serde_json::from_value(value).unwrap();
    assert_eq!(element.stroke_style, StrokeStyle::Solid);
    assert_eq!(element.opacity, 100);
}

// =============================================================
// Id allocation
// =============================================================

#[test]
fn ids_embed_session_tag_and_counter() {
    let mut ids = IdAllocator::new("k3x9ab");
    assert_eq!(ids.next_id(), "element-k3x9ab-1");
    assert_eq!(ids.next_id(), "element-k3x9ab-2");
}

#[test]
fn distinct_sessions_never_collide() {
    let mut a = IdAllocator::new("aaaaaa");
    let mut b = IdAllocator::new("bbbbbb");
    for _ in 0..10 {
        assert_ne!(a.next_id(), b.next_id());
    }
}

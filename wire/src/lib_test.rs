use super::*;

#[test]
fn request_sets_fields() {
    let frame = Frame::request("canvas:join", Data::new());
    assert_eq!(frame.syscall, "canvas:join");
    assert_eq!(frame.status, Status::Request);
    assert!(frame.parent_id.is_none());
    assert!(frame.from.is_none());
    assert!(frame.ts > 0);
}

#[test]
fn reply_inherits_context() {
    let req = Frame::request("element:insert", Data::new()).with_from("alice");
    let item = req.item(Data::new());

    assert_eq!(item.parent_id, Some(req.id));
    assert_eq!(item.syscall, "element:insert");
    assert_eq!(item.status, Status::Item);
    // `from` identifies the sender of each frame, so replies start blank.
    assert!(item.from.is_none());
}

#[test]
fn done_with_carries_payload() {
    let req = Frame::request("element:insert", Data::new());
    let done = req.done_with(Data::from([("duplicate".to_string(), serde_json::json!(true))]));

    assert_eq!(done.status, Status::Done);
    assert_eq!(done.parent_id, Some(req.id));
    assert_eq!(done.data.get("duplicate"), Some(&serde_json::json!(true)));
}

#[test]
fn terminal_statuses() {
    assert!(Status::Done.is_terminal());
    assert!(Status::Error.is_terminal());
    assert!(Status::Cancel.is_terminal());
    assert!(!Status::Request.is_terminal());
    assert!(!Status::Item.is_terminal());
}

#[test]
fn prefix_extraction() {
    let frame = Frame::request("element:delete", Data::new());
    assert_eq!(frame.prefix(), "element");

    let frame = Frame::request("noseparator", Data::new());
    assert_eq!(frame.prefix(), "noseparator");
}

#[test]
fn json_round_trip() {
    let original = Frame::request("canvas:join", Data::new())
        .with_from("alice")
        .with_data("online", 2);

    let json = serde_json::to_string(&original).expect("serialize");
    let restored: Frame = serde_json::from_str(&json).expect("deserialize");

    assert_eq!(restored.id, original.id);
    assert_eq!(restored.syscall, "canvas:join");
    assert_eq!(restored.from.as_deref(), Some("alice"));
    assert_eq!(restored.data.get("online").and_then(serde_json::Value::as_i64), Some(2));
}

#[test]
fn status_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&Status::Request).expect("serialize"), "\"request\"");
    assert_eq!(serde_json::to_string(&Status::Done).expect("serialize"), "\"done\"");
    assert!(serde_json::from_str::<Status>("\"Error\"").is_err());
}

#[test]
fn error_carries_message() {
    let req = Frame::request("element:delete", Data::new());
    let err = req.error("id required");

    assert_eq!(err.status, Status::Error);
    assert_eq!(err.data.get(FRAME_MESSAGE).and_then(|v| v.as_str()), Some("id required"));
}

#[test]
fn error_from_typed() {
    #[derive(Debug, thiserror::Error)]
    #[error("element belongs to another author")]
    struct NotOwner;

    impl ErrorCode for NotOwner {
        fn error_code(&self) -> &'static str {
            "E_NOT_OWNER"
        }
    }

    let req = Frame::request("element:delete", Data::new());
    let err = req.error_from(&NotOwner);

    assert_eq!(err.status, Status::Error);
    assert_eq!(err.data.get(FRAME_CODE).and_then(|v| v.as_str()), Some("E_NOT_OWNER"));
    assert_eq!(
        err.data.get(FRAME_MESSAGE).and_then(|v| v.as_str()),
        Some("element belongs to another author")
    );
    assert_eq!(
        err.data.get(FRAME_RETRYABLE).and_then(serde_json::Value::as_bool),
        Some(false)
    );
}

#[test]
fn retryable_flag_propagates() {
    #[derive(Debug, thiserror::Error)]
    #[error("database unavailable")]
    struct DbDown;

    impl ErrorCode for DbDown {
        fn error_code(&self) -> &'static str {
            "E_DATABASE"
        }

        fn retryable(&self) -> bool {
            true
        }
    }

    let req = Frame::request("element:insert", Data::new());
    let err = req.error_from(&DbDown);

    assert_eq!(
        err.data.get(FRAME_RETRYABLE).and_then(serde_json::Value::as_bool),
        Some(true)
    );
}

use super::*;

// --- Tag generation ---

#[test]
fn random_tag_has_requested_length_and_charset() {
    let tag = random_tag(12);
    assert_eq!(tag.len(), 12);
    assert!(tag.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
}

#[test]
fn anonymous_identity_shape() {
    let id = anonymous_identity();
    assert!(id.starts_with("anonymous-"));
    assert_eq!(id.len(), "anonymous-".len() + 6);
}

#[test]
fn session_tags_are_base36() {
    let tag = session_tag();
    assert_eq!(tag.len(), 6);
    assert!(tag.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
}

// --- looks_authenticated ---

#[test]
fn emails_look_authenticated() {
    assert!(looks_authenticated("alice@example.com"));
    assert!(!looks_authenticated("anonymous-k3x9ab"));
    assert!(!looks_authenticated(""));
}

// --- resolve ---

#[test]
fn authenticated_user_wins_over_stored() {
    let id = resolve(Some("alice@example.com"), Some("anonymous-k3x9ab"));
    assert_eq!(id, "alice@example.com");
}

#[test]
fn stored_anonymous_identity_is_reused() {
    let id = resolve(None, Some("anonymous-k3x9ab"));
    assert_eq!(id, "anonymous-k3x9ab");
}

#[test]
fn stale_authenticated_identity_is_not_impersonated() {
    let id = resolve(None, Some("alice@example.com"));
    assert_ne!(id, "alice@example.com");
    assert!(id.starts_with("anonymous-"));
}

#[test]
fn nothing_stored_generates_anonymous() {
    let id = resolve(None, None);
    assert!(id.starts_with("anonymous-"));
}

//! Author identity rules.
//!
//! Every element records who drew it, and the eraser only removes the
//! acting author's work, so identity must stay stable across visits.
//! Hosts supply the authenticated user (when there is one) and whatever
//! identity they stored last time; this module decides which one the
//! session acts as.

#[cfg(test)]
#[path = "identity_test.rs"]
mod identity_test;

use rand::Rng;

const TAG_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const TAG_LEN: usize = 6;

/// Prefix of generated anonymous identities.
pub const ANONYMOUS_PREFIX: &str = "anonymous-";

/// Random base-36 tag of the given length.
#[must_use]
pub fn random_tag(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| {
            let idx = rng.random_range(0..TAG_ALPHABET.len());
            TAG_ALPHABET[idx] as char
        })
        .collect()
}

/// Mint a fresh anonymous identity, e.g. `anonymous-k3x9ab`.
#[must_use]
pub fn anonymous_identity() -> String {
    format!("{ANONYMOUS_PREFIX}{}", random_tag(TAG_LEN))
}

/// Random per-session tag embedded in element ids so concurrent clients'
/// counters never collide.
#[must_use]
pub fn session_tag() -> String {
    random_tag(TAG_LEN)
}

/// Whether a stored identity came from an authenticated session. Real
/// accounts are email addresses; generated identities never contain `@`.
#[must_use]
pub fn looks_authenticated(identity: &str) -> bool {
    identity.contains('@')
}

/// Decide which identity this session acts as.
///
/// An authenticated user always wins and replaces whatever was stored. A
/// stored anonymous identity is reused so the same visitor can erase
/// their earlier work. A stored authenticated identity with no current
/// login is stale (the user logged out) and is replaced with a fresh
/// anonymous one rather than impersonated.
///
/// Hosts persist the returned value for the next visit.
#[must_use]
pub fn resolve(authenticated: Option<&str>, stored: Option<&str>) -> String {
    if let Some(user) = authenticated {
        return user.to_string();
    }
    match stored {
        Some(stored) if !looks_authenticated(stored) => stored.to_string(),
        _ => anonymous_identity(),
    }
}

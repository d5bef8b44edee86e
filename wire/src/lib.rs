//! Frame — the universal message type for the FreeDraw wire protocol.
//!
//! ARCHITECTURE
//! ============
//! Every communication between a FreeDraw client and the server is a Frame
//! sent as JSON text over WebSocket. Clients send request frames, the server
//! dispatches by syscall prefix, and responses flow back as item/done/error
//! frames correlated through `parent_id`. Server-initiated notifications
//! (`element:insert` broadcasts, `presence:sync`, `session:connected`) are
//! request frames with no reply expected.
//!
//! DESIGN
//! ======
//! - Payloads are one flat `Map<String, Value>` deep; nothing nests.
//! - A reply names its request in `parent_id`; nothing else links them.
//! - The WS handler routes on `syscall` prefix ("canvas:", "element:",
//!   "presence:") and never inspects `data`.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// FIELD CONSTANTS
// =============================================================================

/// Data key carrying the human-readable message on error frames.
pub const FRAME_MESSAGE: &str = "message";

/// Data key carrying the grepable code on error frames.
pub const FRAME_CODE: &str = "code";

/// Data key telling clients whether retrying the request can succeed.
pub const FRAME_RETRYABLE: &str = "retryable";

// =============================================================================
// TYPES
// =============================================================================

/// Frame payload: one flat map of string keys to JSON values.
pub type Data = HashMap<String, serde_json::Value>;

/// Where a frame sits in a request/response exchange.
///
/// An exchange opens with `request`, streams zero or more `item`
/// frames, and closes with exactly one of `done` or `error`.
/// `cancel` is accepted for symmetry with streaming exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Request,
    Item,
    Done,
    Error,
    Cancel,
}

impl Status {
    /// A terminal status is the last frame a request will ever see.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Done | Status::Error | Status::Cancel)
    }
}

/// One message on the socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub id: Uuid,
    /// Id of the request this frame answers, or of the original request on
    /// a notification echoing it to peers.
    pub parent_id: Option<Uuid>,
    /// Creation time in milliseconds since the Unix epoch.
    pub ts: i64,
    /// Resolved identity of the user behind the frame. The server stamps
    /// this on inbound requests and on broadcasts; replies leave it unset.
    pub from: Option<String>,
    /// Namespaced operation name such as `element:insert`.
    pub syscall: String,
    pub status: Status,
    pub data: Data,
}

// =============================================================================
// ERROR CODES
// =============================================================================

/// Source for the `code`/`message`/`retryable` triple on error frames.
/// Service error enums implement this so handlers can answer any failure
/// with [`Frame::error_from`].
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// CONSTRUCTORS
// =============================================================================

fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

impl Frame {
    /// Create a request frame. Every syscall, and every server-initiated
    /// notification, starts here.
    pub fn request(syscall: impl Into<String>, data: Data) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: None,
            ts: now_ms(),
            from: None,
            syscall: syscall.into(),
            status: Status::Request,
            data,
        }
    }

    /// One result in a multi-part response. Non-terminal.
    #[must_use]
    pub fn item(&self, data: Data) -> Self {
        self.reply(Status::Item, data)
    }

    /// Acknowledge without a payload. Terminal.
    #[must_use]
    pub fn done(&self) -> Self {
        self.reply(Status::Done, Data::new())
    }

    /// Acknowledge with a payload. Terminal.
    #[must_use]
    pub fn done_with(&self, data: Data) -> Self {
        self.reply(Status::Done, data)
    }

    /// Fail with a bare message. Terminal.
    #[must_use]
    pub fn error(&self, message: impl Into<String>) -> Self {
        let mut data = Data::new();
        data.insert(FRAME_MESSAGE.into(), serde_json::Value::String(message.into()));
        self.reply(Status::Error, data)
    }

    /// Fail with the code, message, and retryable flag of a typed error.
    /// Terminal.
    #[must_use]
    pub fn error_from(&self, err: &(impl ErrorCode + ?Sized)) -> Self {
        let mut data = Data::new();
        data.insert(FRAME_CODE.into(), serde_json::Value::String(err.error_code().to_string()));
        data.insert(FRAME_MESSAGE.into(), serde_json::Value::String(err.to_string()));
        data.insert(FRAME_RETRYABLE.into(), serde_json::Value::Bool(err.retryable()));
        self.reply(Status::Error, data)
    }

    /// A reply points at the request through `parent_id` and repeats its
    /// `syscall`.
    fn reply(&self, status: Status, data: Data) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: Some(self.id),
            ts: now_ms(),
            from: None,
            syscall: self.syscall.clone(),
            status,
            data,
        }
    }
}

// =============================================================================
// BUILDERS
// =============================================================================

impl Frame {
    #[must_use]
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

// =============================================================================
// ROUTING
// =============================================================================

impl Frame {
    /// The namespace a syscall belongs to: everything before the first
    /// ':', or the whole name when there is none.
    #[must_use]
    pub fn prefix(&self) -> &str {
        let Some((prefix, _)) = self.syscall.split_once(':') else {
            return &self.syscall;
        };
        prefix
    }
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;

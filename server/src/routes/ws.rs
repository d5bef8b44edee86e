//! WebSocket handler: bidirectional frame relay for the shared canvas.
//!
//! DESIGN
//! ======
//! On upgrade, generates a client id and enters a `select!` loop:
//! - Incoming client frames are parsed and dispatched by syscall prefix
//! - Broadcast frames from peers are forwarded to the client
//!
//! Handler functions are pure business logic. They validate, mutate state,
//! and return an `Outcome`; the dispatch layer owns all outbound concerns,
//! replying to the sender and fanning notifications out to peers.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade: send `session:connected` with `client_id` and `user_id`
//! 2. Client sends request frames; dispatch applies the handler's Outcome
//! 3. Close or socket error: leave the canvas and notify peers

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use canvas::element::ElementRecord;
use canvas::identity;
use wire::{Data, Frame, Status};

use crate::services;
use crate::services::element::{ElementError, InsertOutcome};
use crate::state::AppState;

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by handler functions. The dispatch layer uses this to
/// decide who receives what; handlers never send frames directly.
enum Outcome {
    /// Send done+data to the sender only.
    Reply(Data),
    /// Send done+data to the sender and fan a notification out to peers.
    ReplyAndBroadcast { reply: Data, broadcast: Frame },
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    // Identity is caller-supplied. A connection without one draws under a
    // fresh anonymous tag.
    let user_id = params
        .get("user")
        .filter(|user| !user.is_empty())
        .cloned()
        .unwrap_or_else(identity::anonymous_identity);

    ws.on_upgrade(move |socket| run_ws(socket, state, user_id))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, user_id: String) {
    let client_id = Uuid::new_v4();

    // Per-connection channel for receiving broadcast frames from peers.
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(256);

    let welcome = Frame::request("session:connected", Data::new())
        .with_data("client_id", client_id.to_string())
        .with_data("user_id", user_id.clone());
    if send_frame(&mut socket, &welcome).await.is_err() {
        return;
    }

    info!(%client_id, %user_id, "ws: client connected");

    // Whether this connection has joined the canvas.
    let mut joined = false;

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        dispatch_frame(&state, &mut socket, &mut joined, client_id, &user_id, &client_tx, &text).await;
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(frame) = client_rx.recv() => {
                if send_frame(&mut socket, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    // A dropped socket counts as a leave; peers learn the new count.
    if joined {
        let online = services::canvas::leave(&state, client_id).await;
        services::canvas::broadcast(&state, &presence_frame(online), Some(client_id)).await;
    }
    info!(%client_id, "ws: client disconnected");
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Parse an incoming JSON frame, dispatch to a handler, apply the outcome.
async fn dispatch_frame(
    state: &AppState,
    socket: &mut WebSocket,
    joined: &mut bool,
    client_id: Uuid,
    user_id: &str,
    client_tx: &mpsc::Sender<Frame>,
    text: &str,
) {
    let sender_frames = process_inbound_text(state, joined, client_id, user_id, client_tx, text).await;
    for frame in sender_frames {
        let _ = send_frame(socket, &frame).await;
    }
}

/// Parse and process one inbound text frame and return frames for the
/// sender. Keeping transport concerns out of here lets tests exercise the
/// full dispatch path without a socket.
async fn process_inbound_text(
    state: &AppState,
    joined: &mut bool,
    client_id: Uuid,
    user_id: &str,
    client_tx: &mpsc::Sender<Frame>,
    text: &str,
) -> Vec<Frame> {
    let mut req: Frame = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            warn!(%client_id, error = %e, "ws: invalid inbound frame");
            let err = Frame::request("gateway:error", Data::new())
                .with_data("message", format!("invalid json: {e}"));
            return vec![err];
        }
    };

    // Only requests carry work. Cancels and stray replies are accepted
    // and dropped.
    if req.status != Status::Request {
        return Vec::new();
    }

    // Stamp the connection's resolved identity as `from`.
    req.from = Some(user_id.to_string());

    info!(%client_id, id = %req.id, syscall = %req.syscall, "ws: recv frame");

    let result = match req.prefix() {
        "canvas" => handle_canvas(state, joined, client_id, user_id, client_tx, &req).await,
        "element" => handle_element(state, *joined, user_id, &req).await,
        prefix => Err(req.error(format!("unknown prefix: {prefix}"))),
    };

    match result {
        Ok(Outcome::Reply(data)) => vec![req.done_with(data)],
        Ok(Outcome::ReplyAndBroadcast { reply, broadcast }) => {
            services::canvas::broadcast(state, &broadcast, Some(client_id)).await;
            vec![req.done_with(reply)]
        }
        Err(err_frame) => vec![err_frame],
    }
}

// =============================================================================
// CANVAS SYSCALLS
// =============================================================================

async fn handle_canvas(
    state: &AppState,
    joined: &mut bool,
    client_id: Uuid,
    user_id: &str,
    client_tx: &mpsc::Sender<Frame>,
    req: &Frame,
) -> Result<Outcome, Frame> {
    match req.syscall.as_str() {
        "canvas:join" => {
            match services::canvas::join(state, client_id, user_id, client_tx.clone()).await {
                Ok(snapshot) => {
                    *joined = true;
                    Ok(Outcome::ReplyAndBroadcast {
                        reply: to_data(&snapshot),
                        broadcast: presence_frame(snapshot.online),
                    })
                }
                Err(e) => Err(req.error_from(&e)),
            }
        }
        "canvas:leave" => {
            if !*joined {
                return Ok(Outcome::Reply(Data::new()));
            }
            *joined = false;
            let online = services::canvas::leave(state, client_id).await;
            Ok(Outcome::ReplyAndBroadcast {
                reply: Data::new(),
                broadcast: presence_frame(online),
            })
        }
        other => Err(req.error(format!("unknown canvas op: {other}"))),
    }
}

// =============================================================================
// ELEMENT SYSCALLS
// =============================================================================

async fn handle_element(
    state: &AppState,
    joined: bool,
    user_id: &str,
    req: &Frame,
) -> Result<Outcome, Frame> {
    if !joined {
        return Err(req.error_from(&ElementError::CanvasNotLoaded));
    }

    match req.syscall.as_str() {
        "element:insert" => {
            let record = match parse_record(&req.data) {
                Ok(record) => record,
                Err(e) => return Err(req.error_from(&ElementError::Payload(e))),
            };
            match services::element::insert(state, user_id, record).await {
                Ok(InsertOutcome::Inserted(record)) => {
                    let broadcast =
                        Frame::request("element:insert", to_data(&record)).with_from(user_id);
                    Ok(Outcome::ReplyAndBroadcast { reply: to_data(&record), broadcast })
                }
                Ok(InsertOutcome::Duplicate) => {
                    let mut reply = Data::new();
                    reply.insert("duplicate".into(), serde_json::json!(true));
                    Ok(Outcome::Reply(reply))
                }
                Err(e) => Err(req.error_from(&e)),
            }
        }
        "element:delete" => {
            let Some(id) = req.data.get("id").and_then(|v| v.as_str()) else {
                return Err(req.error("element:delete requires an id"));
            };
            match services::element::delete(state, user_id, id).await {
                Ok(()) => {
                    let mut data = Data::new();
                    data.insert("id".into(), serde_json::json!(id));
                    let broadcast =
                        Frame::request("element:delete", data.clone()).with_from(user_id);
                    Ok(Outcome::ReplyAndBroadcast { reply: data, broadcast })
                }
                Err(e) => Err(req.error_from(&e)),
            }
        }
        other => Err(req.error(format!("unknown element op: {other}"))),
    }
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), ()> {
    let json = match serde_json::to_string(frame) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize frame");
            return Err(());
        }
    };
    if frame.status == Status::Error {
        let code = frame.data.get(wire::FRAME_CODE).and_then(|v| v.as_str()).unwrap_or("-");
        let message = frame.data.get(wire::FRAME_MESSAGE).and_then(|v| v.as_str()).unwrap_or("-");
        warn!(id = %frame.id, syscall = %frame.syscall, code, message, "ws: send frame status=Error");
    } else {
        info!(id = %frame.id, syscall = %frame.syscall, status = ?frame.status, "ws: send frame");
    }
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

fn presence_frame(online: usize) -> Frame {
    Frame::request("presence:sync", Data::new()).with_data("online", online)
}

/// Deserialize frame data as a flat element record.
fn parse_record(data: &Data) -> Result<ElementRecord, serde_json::Error> {
    serde_json::from_value(serde_json::to_value(data)?)
}

/// Flatten a serializable value into frame data. Values that do not
/// serialize to an object produce an empty map.
fn to_data<T: serde::Serialize>(value: &T) -> Data {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::Object(map)) => map.into_iter().collect(),
        _ => Data::new(),
    }
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;

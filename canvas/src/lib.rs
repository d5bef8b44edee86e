//! Drawing engine for the shared freehand canvas.
//!
//! This crate owns the full lifecycle of a canvas session: translating raw
//! pointer, touch, and keyboard events into committed elements, maintaining
//! viewport state for pan/zoom, hit-testing strokes for the eraser, merging
//! remote edits, and producing a backend-agnostic display list. Hosts wire
//! their input events into [`engine::CanvasEngine`], rasterize its
//! [`engine::CanvasEngine::render`] output, and drain the write outbox to
//! whatever transport they speak.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level [`engine::CanvasEngine`] and host-facing actions |
//! | [`store`] | Committed element set plus snapshot undo/redo history |
//! | [`element`] | Drawn element types and element id allocation |
//! | [`viewport`] | Pan/zoom transform and coordinate conversions |
//! | [`input`] | Input event types, tools, and the gesture state machine |
//! | [`hit`] | Distance-based hit-testing for the eraser |
//! | [`render`] | Display-list construction from engine state |
//! | [`sync`] | Remote event merging and the pending-write outbox |
//! | [`identity`] | Author names and session tags |
//! | [`consts`] | Shared numeric and color constants |

pub mod consts;
pub mod element;
pub mod engine;
pub mod hit;
pub mod identity;
pub mod input;
pub mod render;
pub mod store;
pub mod sync;
pub mod viewport;

use crate::consts::{ERASE_TOLERANCE, MAX_BRUSH_SIZE, MAX_OPACITY, MIN_BRUSH_SIZE, ZOOM_STEP};
use crate::element::{DrawElement, IdAllocator, Shape, StrokeStyle};
use crate::hit;
use crate::identity;
use crate::input::{InputState, Key, Modifiers, Tool, ToolSettings, TouchPoint};
use crate::render::{self, DrawCmd, Scene};
use crate::store::ElementStore;
use crate::sync::{self, MergeOutcome, Outbox, PendingWrite, RemoteEvent, SyncStatus};
use crate::viewport::{Point, Viewport};

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// A new element was committed locally; a matching insert sits in the
    /// outbox waiting to be sent.
    ElementCommitted(DrawElement),
    /// An element was erased locally; a matching delete sits in the outbox.
    ElementErased { id: String },
    /// The text tool needs literal text. The host collects it and calls
    /// [`CanvasEngine::submit_text`] or [`CanvasEngine::cancel_text`].
    TextPromptRequested { anchor: Point },
    /// The outbox gave up on a write (too many failed attempts or capacity
    /// pressure). The host should log the loss; local state already
    /// reflects the edit.
    WriteDropped(PendingWrite),
    /// The visible scene changed; the host should redraw.
    RenderNeeded,
}

/// The drawing engine: pointer, touch, and keyboard events go in; actions
/// and display lists come out.
///
/// The engine owns every piece of canvas state (elements, history,
/// viewport, tool, in-progress gesture, unsent writes) and is the only
/// place that mutates it. Hosts feed it input events and network events,
/// rasterize [`CanvasEngine::render`] output, and drain the outbox.
pub struct CanvasEngine {
    store: ElementStore,
    viewport: Viewport,
    settings: ToolSettings,
    tool: Tool,
    input: InputState,
    show_grid: bool,
    /// Raw screen-space pointer position for the cursor preview ring.
    cursor: Option<Point>,
    width: f64,
    height: f64,
    ids: IdAllocator,
    author_id: String,
    outbox: Outbox,
    status: SyncStatus,
}

impl CanvasEngine {
    /// Create an engine drawing as `author_id`, with a random session tag
    /// for element ids.
    #[must_use]
    pub fn new(author_id: impl Into<String>) -> Self {
        Self::with_session_tag(author_id, identity::session_tag())
    }

    /// Create an engine with an explicit session tag, so element ids are
    /// predictable.
    #[must_use]
    pub fn with_session_tag(author_id: impl Into<String>, session_tag: impl Into<String>) -> Self {
        Self {
            store: ElementStore::new(),
            viewport: Viewport::default(),
            settings: ToolSettings::default(),
            tool: Tool::default(),
            input: InputState::Idle,
            show_grid: true,
            cursor: None,
            width: 0.0,
            height: 0.0,
            ids: IdAllocator::new(session_tag),
            author_id: author_id.into(),
            outbox: Outbox::new(),
            status: SyncStatus::default(),
        }
    }

    // --- Settings ---

    /// Update the drawing surface dimensions in screen pixels.
    pub fn set_view_size(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    /// Set the active tool.
    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    /// Set the stroke color for subsequent elements.
    pub fn set_color(&mut self, color: impl Into<String>) {
        self.settings.color = color.into();
    }

    /// Set the brush size, clamped to the selectable range.
    pub fn set_brush_size(&mut self, size: f64) {
        self.settings.brush_size = size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE);
    }

    /// Set the stroke style for subsequent elements.
    pub fn set_stroke_style(&mut self, style: StrokeStyle) {
        self.settings.stroke_style = style;
    }

    /// Set the opacity for subsequent elements, capped at 100.
    pub fn set_opacity(&mut self, opacity: u8) {
        self.settings.opacity = opacity.min(MAX_OPACITY);
    }

    /// Show or hide the background grid.
    pub fn toggle_grid(&mut self) {
        self.show_grid = !self.show_grid;
    }

    /// Zoom in one step, as from a toolbar button.
    pub fn zoom_in(&mut self) {
        self.viewport.zoom_step(ZOOM_STEP);
    }

    /// Zoom out one step.
    pub fn zoom_out(&mut self) {
        self.viewport.zoom_step(-ZOOM_STEP);
    }

    /// Restore the identity viewport (scale 1, no pan).
    pub fn reset_view(&mut self) {
        self.viewport.reset();
    }

    // --- History ---

    /// Step back one history snapshot. Returns false at the oldest state.
    ///
    /// Undo is local-only: it rewinds this client's view without issuing
    /// deletes for the elements it hides.
    pub fn undo(&mut self) -> bool {
        self.store.undo()
    }

    /// Step forward one history snapshot. Returns false at the newest state.
    pub fn redo(&mut self) -> bool {
        self.store.redo()
    }

    // --- Pointer events ---

    /// Pointer pressed on the canvas.
    pub fn on_pointer_down(&mut self, screen: Point) -> Vec<Action> {
        self.begin_gesture(screen, 1.0)
    }

    /// Pointer moved over the canvas.
    pub fn on_pointer_move(&mut self, screen: Point, modifiers: Modifiers) -> Vec<Action> {
        self.cursor = Some(screen);

        if let InputState::Panning { last_screen } = &mut self.input {
            let (dx, dy) = (screen.x - last_screen.x, screen.y - last_screen.y);
            *last_screen = screen;
            self.viewport.pan_by(dx, dy);
        } else if matches!(self.input, InputState::Drawing { .. }) {
            let logical = self.viewport.screen_to_logical(screen);
            self.extend_draft(logical, modifiers);
        }

        vec![Action::RenderNeeded]
    }

    /// Pointer released. Commits the draft if one is in progress.
    pub fn on_pointer_up(&mut self) -> Vec<Action> {
        match &self.input {
            InputState::Drawing { .. } => self.finish_stroke(),
            InputState::Panning { .. } | InputState::Pinching { .. } => {
                self.input = InputState::Idle;
                Vec::new()
            }
            InputState::Idle | InputState::TextPrompt { .. } => Vec::new(),
        }
    }

    /// Pointer left the canvas: finish any gesture and hide the cursor ring.
    pub fn on_pointer_leave(&mut self) -> Vec<Action> {
        self.cursor = None;
        let mut actions = self.on_pointer_up();
        if !actions.contains(&Action::RenderNeeded) {
            actions.push(Action::RenderNeeded);
        }
        actions
    }

    // --- Touch events ---

    /// Touch contacts went down. One finger behaves like a pointer press
    /// (with stylus force feeding the stroke width); a second finger
    /// abandons any draft and starts a pinch.
    pub fn on_touch_start(&mut self, touches: &[TouchPoint]) -> Vec<Action> {
        match touches {
            [] => Vec::new(),
            [touch] => self.begin_gesture(touch.screen(), touch.pressure()),
            [a, b, ..] => {
                let had_draft = matches!(self.input, InputState::Drawing { .. });
                self.input = InputState::Pinching {
                    last_distance: touch_distance(a, b),
                    last_midpoint: touch_midpoint(a, b),
                };
                if had_draft { vec![Action::RenderNeeded] } else { Vec::new() }
            }
        }
    }

    /// Touch contacts moved. A pinch zooms by the ratio of consecutive
    /// finger distances and pans by the midpoint delta in the same event.
    pub fn on_touch_move(&mut self, touches: &[TouchPoint]) -> Vec<Action> {
        let [first, rest @ ..] = touches else {
            return Vec::new();
        };

        if let InputState::Pinching { last_distance, last_midpoint } = &mut self.input {
            let [second, ..] = rest else {
                return Vec::new();
            };
            let distance = touch_distance(first, second);
            let midpoint = touch_midpoint(first, second);
            let factor = if *last_distance > 0.0 { distance / *last_distance } else { 1.0 };
            let (dx, dy) = (midpoint.x - last_midpoint.x, midpoint.y - last_midpoint.y);
            *last_distance = distance;
            *last_midpoint = midpoint;
            self.viewport.zoom_by(factor);
            self.viewport.pan_by(dx, dy);
            return vec![Action::RenderNeeded];
        }

        if let InputState::Panning { last_screen } = &mut self.input {
            let screen = first.screen();
            let (dx, dy) = (screen.x - last_screen.x, screen.y - last_screen.y);
            *last_screen = screen;
            self.viewport.pan_by(dx, dy);
            return vec![Action::RenderNeeded];
        }

        if matches!(self.input, InputState::Drawing { .. }) {
            let logical = self.viewport.screen_to_logical(first.screen());
            self.extend_draft(logical, Modifiers::default());
            return vec![Action::RenderNeeded];
        }

        Vec::new()
    }

    /// Touch contacts lifted; `remaining` is what is still down. Hosts
    /// route touch-cancel here as well.
    pub fn on_touch_end(&mut self, remaining: &[TouchPoint]) -> Vec<Action> {
        match &self.input {
            InputState::Pinching { .. } if remaining.len() < 2 => {
                self.input = InputState::Idle;
                Vec::new()
            }
            InputState::Panning { .. } if remaining.is_empty() => {
                self.input = InputState::Idle;
                Vec::new()
            }
            InputState::Drawing { .. } if remaining.is_empty() => self.finish_stroke(),
            _ => Vec::new(),
        }
    }

    // --- Keyboard ---

    /// Key pressed anywhere on the page.
    pub fn on_key_down(&mut self, key: &Key, modifiers: Modifiers) -> Vec<Action> {
        match key.as_str() {
            "1" => self.select_tool_action(Tool::Select),
            "2" => self.select_tool_action(Tool::Pen),
            "3" => self.select_tool_action(Tool::Eraser),
            "4" => self.select_tool_action(Tool::Line),
            "5" => self.select_tool_action(Tool::Rectangle),
            "6" => self.select_tool_action(Tool::Circle),
            "7" => self.select_tool_action(Tool::Arrow),
            "8" => self.select_tool_action(Tool::Text),
            "[" => {
                self.set_brush_size(self.settings.brush_size - 1.0);
                vec![Action::RenderNeeded]
            }
            "]" => {
                self.set_brush_size(self.settings.brush_size + 1.0);
                vec![Action::RenderNeeded]
            }
            "g" | "G" => {
                self.toggle_grid();
                vec![Action::RenderNeeded]
            }
            // Held Space auto-repeats; don't re-arm while a drag is live.
            "Space" if !matches!(self.input, InputState::Panning { .. }) => {
                self.select_tool_action(Tool::Pan)
            }
            "z" | "Z" if modifiers.command() && !modifiers.shift => {
                if self.undo() { vec![Action::RenderNeeded] } else { Vec::new() }
            }
            "z" | "Z" if modifiers.command() => {
                if self.redo() { vec![Action::RenderNeeded] } else { Vec::new() }
            }
            "y" | "Y" if modifiers.command() => {
                if self.redo() { vec![Action::RenderNeeded] } else { Vec::new() }
            }
            _ => Vec::new(),
        }
    }

    /// Key released. Releasing Space always returns to the pen tool.
    pub fn on_key_up(&mut self, key: &Key) -> Vec<Action> {
        if key.as_str() == "Space" {
            return self.select_tool_action(Tool::Pen);
        }
        Vec::new()
    }

    fn select_tool_action(&mut self, tool: Tool) -> Vec<Action> {
        self.tool = tool;
        vec![Action::RenderNeeded]
    }

    // --- Text tool ---

    /// Supply the literal text requested by [`Action::TextPromptRequested`].
    /// Empty text cancels without committing.
    pub fn submit_text(&mut self, text: &str) -> Vec<Action> {
        let InputState::TextPrompt { anchor } = &self.input else {
            return Vec::new();
        };
        let anchor = *anchor;
        self.input = InputState::Idle;
        if text.is_empty() {
            return Vec::new();
        }
        let element = DrawElement {
            id: self.ids.next_id(),
            shape: Shape::Text { anchor, text: text.to_string() },
            color: self.settings.color.clone(),
            line_width: self.settings.brush_size,
            stroke_style: self.settings.stroke_style,
            opacity: self.settings.opacity,
            author_id: self.author_id.clone(),
        };
        self.commit_local(element)
    }

    /// Dismiss an open text prompt without drawing anything.
    pub fn cancel_text(&mut self) {
        if matches!(self.input, InputState::TextPrompt { .. }) {
            self.input = InputState::Idle;
        }
    }

    // --- Sync ---

    /// Seed the store from the shared set fetched at connect time.
    pub fn connect(&mut self, elements: Vec<DrawElement>) {
        self.store.load_initial(elements);
        self.status.connected = true;
    }

    /// The realtime channel went away; local state stays authoritative.
    pub fn disconnect(&mut self) {
        self.status.connected = false;
    }

    /// Apply one remote event. On [`MergeOutcome::RefetchRequired`] the
    /// host fetches the shared set and passes it to [`CanvasEngine::reload`].
    pub fn apply_remote(&mut self, event: RemoteEvent) -> MergeOutcome {
        sync::merge(&mut self.store, &mut self.status, event)
    }

    /// Replace the live element list after a refetch. History is untouched.
    pub fn reload(&mut self, elements: Vec<DrawElement>) {
        self.store.replace_live(elements);
    }

    /// The write the host should send next, if any.
    #[must_use]
    pub fn next_pending(&self) -> Option<&PendingWrite> {
        self.outbox.next_pending()
    }

    /// The pending write was persisted.
    pub fn acknowledge_write(&mut self) -> Option<PendingWrite> {
        self.outbox.acknowledge()
    }

    /// The pending write failed to send; it is retried until the attempt
    /// cap, then handed back as dropped.
    pub fn record_write_failure(&mut self) -> Option<PendingWrite> {
        self.outbox.record_failure()
    }

    // --- Render ---

    /// Build the display list for the current state.
    #[must_use]
    pub fn render(&self) -> Vec<DrawCmd> {
        render::draw(&Scene {
            elements: self.store.elements(),
            draft: self.draft(),
            viewport: &self.viewport,
            width: self.width,
            height: self.height,
            show_grid: self.show_grid,
            cursor: self.cursor,
            tool: self.tool,
            settings: &self.settings,
        })
    }

    // --- Queries ---

    /// Committed elements in insertion order.
    #[must_use]
    pub fn elements(&self) -> &[DrawElement] {
        self.store.elements()
    }

    /// The in-progress element, if a draw gesture is live.
    #[must_use]
    pub fn draft(&self) -> Option<&DrawElement> {
        match &self.input {
            InputState::Drawing { draft } => Some(draft),
            _ => None,
        }
    }

    /// The current viewport.
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// The active tool.
    #[must_use]
    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Style settings applied to the next element.
    #[must_use]
    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    /// Whether the background grid is shown.
    #[must_use]
    pub fn show_grid(&self) -> bool {
        self.show_grid
    }

    /// Connection and presence state.
    #[must_use]
    pub fn status(&self) -> SyncStatus {
        self.status
    }

    /// The identity stamped on elements this engine creates.
    #[must_use]
    pub fn author_id(&self) -> &str {
        &self.author_id
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.store.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.store.can_redo()
    }

    /// Writes waiting in the outbox.
    #[must_use]
    pub fn pending_writes(&self) -> usize {
        self.outbox.len()
    }

    // --- Gesture internals ---

    fn begin_gesture(&mut self, screen: Point, pressure: f64) -> Vec<Action> {
        if self.tool == Tool::Pan {
            self.input = InputState::Panning { last_screen: screen };
            return Vec::new();
        }

        let logical = self.viewport.screen_to_logical(screen);

        if self.tool == Tool::Eraser {
            return self.erase_at(logical);
        }
        if self.tool == Tool::Text {
            self.input = InputState::TextPrompt { anchor: logical };
            return vec![Action::TextPromptRequested { anchor: logical }];
        }

        // Select has no pointer behavior yet; the draw tools open a draft.
        let Some(shape) = draft_shape(self.tool, logical) else {
            return Vec::new();
        };
        let draft = DrawElement {
            id: self.ids.next_id(),
            shape,
            color: self.settings.color.clone(),
            line_width: (self.settings.brush_size * pressure).max(1.0),
            stroke_style: self.settings.stroke_style,
            opacity: self.settings.opacity,
            author_id: self.author_id.clone(),
        };
        self.input = InputState::Drawing { draft };
        vec![Action::RenderNeeded]
    }

    fn extend_draft(&mut self, logical: Point, modifiers: Modifiers) {
        let InputState::Drawing { draft } = &mut self.input else {
            return;
        };
        match &mut draft.shape {
            Shape::Pen { points } => points.push(logical),
            Shape::Line { start, end } => {
                *end = if modifiers.shift { snap_to_axis(*start, logical) } else { logical };
            }
            // The arrow keeps the raw point even under Shift.
            Shape::Arrow { end, .. } => *end = logical,
            Shape::Rectangle { start, end } | Shape::Circle { start, end } => {
                *end = if modifiers.shift { snap_to_square(*start, logical) } else { logical };
            }
            Shape::Text { .. } => {}
        }
    }

    fn finish_stroke(&mut self) -> Vec<Action> {
        let InputState::Drawing { draft } = std::mem::take(&mut self.input) else {
            return Vec::new();
        };
        self.commit_local(draft)
    }

    fn commit_local(&mut self, element: DrawElement) -> Vec<Action> {
        self.store.commit(element.clone());
        let mut actions = Vec::new();
        if let Some(dropped) = self.outbox.enqueue(PendingWrite::Insert(element.clone())) {
            actions.push(Action::WriteDropped(dropped));
        }
        actions.push(Action::ElementCommitted(element));
        actions.push(Action::RenderNeeded);
        actions
    }

    fn erase_at(&mut self, point: Point) -> Vec<Action> {
        let Some(target) =
            hit::find_erase_target(self.store.elements(), point, ERASE_TOLERANCE, &self.author_id)
        else {
            return Vec::new();
        };
        let id = target.id.clone();
        self.store.remove(&id);
        let mut actions = Vec::new();
        if let Some(dropped) = self.outbox.enqueue(PendingWrite::Delete { id: id.clone() }) {
            actions.push(Action::WriteDropped(dropped));
        }
        actions.push(Action::ElementErased { id });
        actions.push(Action::RenderNeeded);
        actions
    }
}

/// The starting shape for a draw tool, anchored where the gesture began.
fn draft_shape(tool: Tool, origin: Point) -> Option<Shape> {
    match tool {
        Tool::Pen => Some(Shape::Pen { points: vec![origin] }),
        Tool::Line => Some(Shape::Line { start: origin, end: origin }),
        Tool::Arrow => Some(Shape::Arrow { start: origin, end: origin }),
        Tool::Rectangle => Some(Shape::Rectangle { start: origin, end: origin }),
        Tool::Circle => Some(Shape::Circle { start: origin, end: origin }),
        Tool::Select | Tool::Eraser | Tool::Text | Tool::Pan => None,
    }
}

/// Snap a line's end point to the axis closer to the drag direction.
fn snap_to_axis(start: Point, point: Point) -> Point {
    let dx = point.x - start.x;
    let dy = point.y - start.y;
    if dx.abs() > dy.abs() { Point::new(point.x, start.y) } else { Point::new(start.x, point.y) }
}

/// Constrain a rectangle/circle end point so |width| = |height|, keeping
/// the drag direction in each axis.
fn snap_to_square(start: Point, point: Point) -> Point {
    let dx = point.x - start.x;
    let dy = point.y - start.y;
    let size = dx.abs().max(dy.abs());
    Point::new(start.x + size.copysign(dx), start.y + size.copysign(dy))
}

fn touch_distance(a: &TouchPoint, b: &TouchPoint) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

fn touch_midpoint(a: &TouchPoint, b: &TouchPoint) -> Point {
    Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}

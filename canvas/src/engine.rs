//! Canvas controller: owns graph, camera, UI, gesture, and telemetry state,
//! and turns input into mutations plus outbound [`Action`]s.
//!
//! Input arrives only through the controller's methods (or serialized as
//! [`InputEvent`]s through [`EngineCore::dispatch`]); nothing is registered
//! on a global. Events are applied strictly in the order received, so a
//! recorded event list replays to the same state.

#[cfg(feature = "web")]
use wasm_bindgen::{JsCast, JsValue};
#[cfg(feature = "web")]
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use serde::Serialize;

use crate::block_view::BlockEvent;
use crate::camera::{Axis, Camera, Point};
use crate::config::CanvasConfig;
use crate::consts::{DRAG_THRESHOLD_PX, ZOOM_STEP};
use crate::error::GraphError;
use crate::graph::{Block, BlockId, BlockPatch, BlockType, Connection, ConnectionId, GraphStore};
use crate::hit::{HitPart, hit_test};
use crate::input::{Button, InputEvent, InputState, Key, Layer, Modifiers, UiState, WheelDelta};
use crate::render::{Scene, build_scene};
use crate::status::StatusEvent;
use crate::telemetry::{Clock, TelemetrySimulator};

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Action {
    BlockCreated(Block),
    BlockUpdated { id: BlockId, patch: BlockPatch },
    BlockDeleted { id: BlockId },
    BlockDuplicated { source: BlockId, block: Block },
    ConnectionCreated(Connection),
    ConnectionDeleted { id: ConnectionId },
    ConfigureRequested { id: BlockId },
    ViewRequested { id: BlockId },
    SetCursor(String),
    RenderNeeded,
}

/// Core engine state: all logic that doesn't depend on the canvas element.
///
/// Separated from `Engine` so it can be tested without WASM/browser dependencies.
pub struct EngineCore {
    pub graph: GraphStore,
    pub camera: Camera,
    pub ui: UiState,
    pub input: InputState,
    pub telemetry: TelemetrySimulator,
    pub dpr: f64,
    clock: Box<dyn Clock>,
    cursor: String,
}

impl Default for EngineCore {
    fn default() -> Self {
        Self::new(CanvasConfig::default())
    }
}

impl Drop for EngineCore {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl EngineCore {
    /// Controller on the platform clock.
    #[must_use]
    pub fn new(config: CanvasConfig) -> Self {
        Self::with_clock(config, platform_clock())
    }

    /// Controller on an injected clock.
    #[must_use]
    pub fn with_clock(config: CanvasConfig, clock: Box<dyn Clock>) -> Self {
        let telemetry = match config.telemetry_seed {
            Some(seed) => TelemetrySimulator::seeded(seed),
            None => TelemetrySimulator::from_os_rng(),
        };
        let ui = UiState { show_grid: config.show_grid, show_minimap: config.show_minimap, ..UiState::default() };
        Self {
            graph: GraphStore::new(),
            camera: Camera::new(config.view_mode),
            ui,
            input: InputState::default(),
            telemetry,
            dpr: 1.0,
            clock,
            cursor: "default".to_string(),
        }
    }

    // --- Data inputs ---

    /// Replace the graph with a host snapshot.
    ///
    /// UI state that points at blocks missing from the snapshot is dropped.
    pub fn load_snapshot(&mut self, blocks: Vec<Block>, connections: Vec<Connection>) {
        self.graph.load_snapshot(blocks, connections);
        let graph = &self.graph;
        self.ui.selection.retain(|id| graph.contains(id));
        self.ui.expanded.retain(|id| graph.contains(id));
        if self.ui.hovered.is_some_and(|id| !graph.contains(&id)) {
            self.ui.hovered = None;
        }
        if self.ui.pending_connection.is_some_and(|id| !graph.contains(&id)) {
            self.ui.pending_connection = None;
        }
        if gesture_block(&self.input).is_some_and(|id| !graph.contains(&id)) {
            self.input = InputState::Idle;
        }
        self.sync_telemetry();
    }

    /// Apply a host broadcast: block created or replaced.
    pub fn apply_block_create(&mut self, block: Block) {
        self.graph.insert_block(block);
        self.sync_telemetry();
    }

    /// Apply a host broadcast: block updated with a JSON merge-patch.
    ///
    /// # Errors
    ///
    /// Whatever [`GraphStore::update_block`] rejects; the graph is unchanged.
    pub fn apply_block_update(&mut self, id: &BlockId, patch: &serde_json::Value) -> Result<(), GraphError> {
        self.graph.update_block(id, patch)?;
        self.sync_telemetry();
        Ok(())
    }

    /// Apply a host broadcast: block deleted.
    pub fn apply_block_delete(&mut self, id: &BlockId) {
        self.forget_block(id);
    }

    /// Apply a host broadcast: connection created.
    pub fn apply_connection_create(&mut self, connection: Connection) {
        self.graph.insert_connection(connection);
    }

    /// Apply a host broadcast: connection deleted.
    pub fn apply_connection_delete(&mut self, id: &ConnectionId) {
        self.graph.remove_connection(id);
    }

    // --- Viewport ---

    /// Update the panel size in CSS pixels and the device pixel ratio.
    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) {
        self.camera.set_viewport(width_css, height_css);
        self.dpr = if dpr.is_finite() && dpr > 0.0 { dpr } else { 1.0 };
    }

    // --- Input events ---

    /// Pointer pressed.
    ///
    /// Middle button, or primary with ctrl/meta, starts a pan. Otherwise the
    /// primary button acts on whatever block part is under the pointer.
    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        if button == Button::Middle || (button == Button::Primary && modifiers.pans()) {
            self.input = InputState::Panning { last_screen: screen_pt };
            return self.cursor_actions("grabbing");
        }
        if button != Button::Primary {
            return Vec::new();
        }
        let Some(world) = self.camera.screen_to_world(screen_pt) else {
            return Vec::new();
        };
        let Some(hit) = hit_test(world, &self.graph, &self.ui, &self.camera) else {
            return Vec::new();
        };

        match hit.part {
            HitPart::SourceHandle => {
                self.input = InputState::Connecting { origin: hit.block_id, cursor_world: world };
                self.ui.pending_connection = Some(hit.block_id);
                tracing::debug!(block_id = %hit.block_id, "connection gesture started");
                let mut actions = self.cursor_actions("crosshair");
                actions.push(Action::RenderNeeded);
                actions
            }
            HitPart::Action(event) => self.block_event(&hit.block_id, event),
            HitPart::DetailsToggle => self.block_event(&hit.block_id, BlockEvent::ToggleDetails),
            HitPart::TargetHandle | HitPart::Body => {
                self.input = InputState::PressingBlock { id: hit.block_id, start_screen: screen_pt };
                Vec::new()
            }
        }
    }

    /// Pointer moved.
    pub fn on_pointer_move(&mut self, screen_pt: Point, _modifiers: Modifiers) -> Vec<Action> {
        match self.input.clone() {
            InputState::Panning { last_screen } => {
                self.camera.pan_by(Point::new(screen_pt.x - last_screen.x, screen_pt.y - last_screen.y));
                self.input = InputState::Panning { last_screen: screen_pt };
                vec![Action::RenderNeeded]
            }
            InputState::PressingBlock { id, start_screen } => {
                if screen_pt.distance(start_screen) < DRAG_THRESHOLD_PX {
                    return Vec::new();
                }
                let (Some(start_world), Some(origin)) =
                    (self.camera.screen_to_world(start_screen), self.graph.get(&id).map(|b| b.position))
                else {
                    self.input = InputState::Idle;
                    return Vec::new();
                };
                self.input = InputState::DraggingBlock { id, last_world: start_world, origin };
                let mut actions = self.cursor_actions("move");
                actions.extend(self.drag_to(screen_pt));
                actions
            }
            InputState::DraggingBlock { .. } => self.drag_to(screen_pt),
            InputState::Connecting { origin, .. } => {
                let Some(world) = self.camera.screen_to_world(screen_pt) else {
                    return Vec::new();
                };
                self.input = InputState::Connecting { origin, cursor_world: world };
                self.update_hover(world);
                vec![Action::RenderNeeded]
            }
            InputState::Idle => {
                let Some(world) = self.camera.screen_to_world(screen_pt) else {
                    return self.clear_hover();
                };
                let hit = hit_test(world, &self.graph, &self.ui, &self.camera);
                let cursor = match hit.map(|h| h.part) {
                    None => "default",
                    Some(HitPart::SourceHandle | HitPart::TargetHandle) => "crosshair",
                    Some(HitPart::Action(_) | HitPart::DetailsToggle) => "pointer",
                    Some(HitPart::Body) => "grab",
                };
                let mut actions = self.cursor_actions(cursor);
                if self.update_hover(world) {
                    actions.push(Action::RenderNeeded);
                }
                actions
            }
        }
    }

    /// Pointer released.
    pub fn on_pointer_up(&mut self, screen_pt: Point, _button: Button, _modifiers: Modifiers) -> Vec<Action> {
        match std::mem::take(&mut self.input) {
            InputState::Idle => Vec::new(),
            InputState::Panning { .. } => self.cursor_actions("default"),
            InputState::PressingBlock { id, .. } => self.block_event(&id, BlockEvent::Select),
            InputState::DraggingBlock { id, origin, .. } => {
                let mut actions = self.finish_drag(&id, origin);
                actions.extend(self.cursor_actions("grab"));
                actions
            }
            InputState::Connecting { origin, .. } => {
                self.ui.pending_connection = None;
                let target = self
                    .camera
                    .screen_to_world(screen_pt)
                    .and_then(|world| hit_test(world, &self.graph, &self.ui, &self.camera))
                    .map(|hit| hit.block_id)
                    .filter(|target| *target != origin);
                let mut actions = match target {
                    Some(target) => self.connect(&origin, &target),
                    None => {
                        tracing::debug!(block_id = %origin, "connection gesture cancelled");
                        Vec::new()
                    }
                };
                actions.extend(self.cursor_actions("default"));
                actions.push(Action::RenderNeeded);
                actions
            }
        }
    }

    /// Pointer left the panel: end any gesture. A drag in progress commits
    /// its position; a connection gesture is cancelled.
    pub fn on_pointer_leave(&mut self) -> Vec<Action> {
        let mut actions = match std::mem::take(&mut self.input) {
            InputState::DraggingBlock { id, origin, .. } => self.finish_drag(&id, origin),
            InputState::Connecting { origin, .. } => {
                tracing::debug!(block_id = %origin, "connection gesture cancelled");
                self.ui.pending_connection = None;
                vec![Action::RenderNeeded]
            }
            InputState::Idle | InputState::Panning { .. } | InputState::PressingBlock { .. } => Vec::new(),
        };
        actions.extend(self.clear_hover());
        actions.extend(self.cursor_actions("default"));
        actions
    }

    /// Wheel: one zoom step per event, anchored at the pointer. Scrolling
    /// down zooms out.
    pub fn on_wheel(&mut self, screen_pt: Point, delta: WheelDelta, _modifiers: Modifiers) -> Vec<Action> {
        if !delta.dy.is_finite() || delta.dy == 0.0 {
            return Vec::new();
        }
        let step = if delta.dy > 0.0 { -ZOOM_STEP } else { ZOOM_STEP };
        self.camera.zoom_by(step, Some(screen_pt));
        vec![Action::RenderNeeded]
    }

    /// Key pressed. Escape cancels; Delete/Backspace removes the selection.
    pub fn on_key_down(&mut self, key: Key, _modifiers: Modifiers) -> Vec<Action> {
        if key.is_escape() {
            self.cancel();
            return vec![Action::RenderNeeded];
        }
        if key.is_delete() {
            return self.delete_selected();
        }
        Vec::new()
    }

    /// Clear the selection and any pending connection.
    pub fn cancel(&mut self) {
        self.ui.selection.clear();
        self.ui.pending_connection = None;
        if matches!(self.input, InputState::Connecting { .. }) {
            self.input = InputState::Idle;
        }
    }

    // --- Block operations ---

    /// Create a block from the palette.
    pub fn create_block(&mut self, block_type: BlockType, position: Point) -> Vec<Action> {
        let id = self.graph.add_block(block_type, position);
        tracing::info!(block_id = %id, block_type = %block_type, "block created");
        match self.graph.get(&id) {
            Some(block) => vec![Action::BlockCreated(block.clone()), Action::RenderNeeded],
            None => Vec::new(),
        }
    }

    /// Handle an event raised by a block card.
    pub fn block_event(&mut self, id: &BlockId, event: BlockEvent) -> Vec<Action> {
        if !self.graph.contains(id) {
            tracing::debug!(block_id = %id, ?event, "event for unknown block ignored");
            return Vec::new();
        }
        match event {
            BlockEvent::Select => {
                let selected = self.ui.selection.toggle(*id);
                tracing::debug!(block_id = %id, selected, "selection toggled");
                vec![Action::RenderNeeded]
            }
            BlockEvent::Start => self.transition(id, StatusEvent::Start),
            BlockEvent::Stop => self.transition(id, StatusEvent::Stop),
            BlockEvent::Configure => vec![Action::ConfigureRequested { id: *id }],
            BlockEvent::View => vec![Action::ViewRequested { id: *id }],
            BlockEvent::Duplicate => self.duplicate_block(id),
            BlockEvent::Delete => self.delete_block(id),
            BlockEvent::ToggleDetails => {
                if !self.ui.expanded.remove(id) {
                    self.ui.expanded.insert(*id);
                }
                vec![Action::RenderNeeded]
            }
        }
    }

    /// Externally raised failure for block `id`.
    pub fn fault_block(&mut self, id: &BlockId) -> Vec<Action> {
        self.transition(id, StatusEvent::Fault)
    }

    /// Delete every selected block, then clear the selection.
    pub fn delete_selected(&mut self) -> Vec<Action> {
        let ids = self.ui.selection.ids().to_vec();
        let mut actions: Vec<Action> = ids.iter().flat_map(|id| self.delete_block(id)).collect();
        self.ui.selection.clear();
        actions.retain(|a| *a != Action::RenderNeeded);
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Duplicate every selected block, then clear the selection.
    pub fn duplicate_selected(&mut self) -> Vec<Action> {
        let ids = self.ui.selection.ids().to_vec();
        let mut actions: Vec<Action> = ids.iter().flat_map(|id| self.duplicate_block(id)).collect();
        self.ui.selection.clear();
        actions.retain(|a| *a != Action::RenderNeeded);
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Remove a connection on behalf of the user.
    pub fn delete_connection(&mut self, id: &ConnectionId) -> Vec<Action> {
        match self.graph.remove_connection(id) {
            Some(_) => vec![Action::ConnectionDeleted { id: *id }, Action::RenderNeeded],
            None => Vec::new(),
        }
    }

    // --- View controls ---

    pub fn zoom_in(&mut self) {
        self.camera.zoom_by(ZOOM_STEP, None);
    }

    pub fn zoom_out(&mut self) {
        self.camera.zoom_by(-ZOOM_STEP, None);
    }

    pub fn reset_view(&mut self) {
        self.camera.reset();
    }

    pub fn fit_to_content(&mut self) {
        self.camera.fit_to_content(self.graph.blocks());
    }

    pub fn toggle_view_mode(&mut self) {
        let mode = self.camera.toggle_mode();
        tracing::debug!(?mode, "view mode toggled");
    }

    pub fn adjust_depth(&mut self, delta: f64) {
        self.camera.adjust_depth(delta);
    }

    pub fn adjust_perspective(&mut self, delta: f64) {
        self.camera.adjust_perspective(delta);
    }

    pub fn adjust_rotation(&mut self, axis: Axis, delta: f64) {
        self.camera.adjust_rotation(axis, delta);
    }

    pub fn toggle_grid(&mut self) {
        self.ui.show_grid = !self.ui.show_grid;
    }

    pub fn toggle_minimap(&mut self) {
        self.ui.show_minimap = !self.ui.show_minimap;
    }

    pub fn set_layer(&mut self, layer: Layer) {
        self.ui.active_layer = layer;
    }

    // --- Frame ---

    /// Run the telemetry ticks due at the current clock time.
    ///
    /// Every patch the simulator applied is reported to the host.
    pub fn tick(&mut self) -> Vec<Action> {
        let now = self.clock.now_ms();
        let updates = self.telemetry.advance(&mut self.graph, now);
        let animated = self.graph.resolved_connections().any(|(c, _, _)| c.animated);
        let mut actions: Vec<Action> =
            updates.into_iter().map(|(id, patch)| Action::BlockUpdated { id, patch }).collect();
        if animated || !actions.is_empty() {
            actions.push(Action::RenderNeeded);
        }
        actions
    }

    /// Build the scene for the current state.
    #[must_use]
    pub fn render(&self) -> Scene {
        build_scene(&self.graph, &self.camera, &self.ui, &self.input, self.clock.now_ms())
    }

    /// Apply one serialized input event.
    pub fn dispatch(&mut self, event: InputEvent) -> Vec<Action> {
        match event {
            InputEvent::PointerDown { screen, button, modifiers } => self.on_pointer_down(screen, button, modifiers),
            InputEvent::PointerMove { screen, modifiers } => self.on_pointer_move(screen, modifiers),
            InputEvent::PointerUp { screen, button, modifiers } => self.on_pointer_up(screen, button, modifiers),
            InputEvent::PointerLeave => self.on_pointer_leave(),
            InputEvent::Wheel { screen, delta, modifiers } => self.on_wheel(screen, delta, modifiers),
            InputEvent::KeyDown { key, modifiers } => self.on_key_down(key, modifiers),
            InputEvent::Resize { width, height } => {
                self.set_viewport(width, height, self.dpr);
                vec![Action::RenderNeeded]
            }
            InputEvent::CreateBlock { block_type, position } => self.create_block(block_type, position),
            InputEvent::DeleteSelected => self.delete_selected(),
            InputEvent::DuplicateSelected => self.duplicate_selected(),
            InputEvent::Tick => self.tick(),
            view => {
                self.apply_view_event(view);
                vec![Action::RenderNeeded]
            }
        }
    }

    /// Cancel every telemetry timer and drop gesture state. Also runs on drop.
    pub fn teardown(&mut self) {
        self.telemetry.cancel_all();
        self.input = InputState::Idle;
        self.ui.pending_connection = None;
        self.ui.hovered = None;
    }

    // --- Queries ---

    /// Selected block ids in selection order.
    #[must_use]
    pub fn selection(&self) -> &[BlockId] {
        self.ui.selection.ids()
    }

    /// The current camera state.
    #[must_use]
    pub fn camera(&self) -> Camera {
        self.camera
    }

    /// Look up a block by ID.
    #[must_use]
    pub fn block(&self, id: &BlockId) -> Option<&Block> {
        self.graph.get(id)
    }

    /// Current time on the controller's clock.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    // --- Internals ---

    fn apply_view_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::ZoomIn => self.zoom_in(),
            InputEvent::ZoomOut => self.zoom_out(),
            InputEvent::ResetView => self.reset_view(),
            InputEvent::FitToContent => self.fit_to_content(),
            InputEvent::ToggleViewMode => self.toggle_view_mode(),
            InputEvent::AdjustDepth { delta } => self.adjust_depth(delta),
            InputEvent::AdjustPerspective { delta } => self.adjust_perspective(delta),
            InputEvent::AdjustRotation { axis, delta } => self.adjust_rotation(axis, delta),
            InputEvent::ToggleGrid => self.toggle_grid(),
            InputEvent::ToggleMinimap => self.toggle_minimap(),
            InputEvent::SetLayer { layer } => self.set_layer(layer),
            other => tracing::debug!(?other, "not a view event"),
        }
    }

    fn transition(&mut self, id: &BlockId, event: StatusEvent) -> Vec<Action> {
        let Some(current) = self.graph.get(id).map(|b| b.status) else {
            return Vec::new();
        };
        let Some(next) = current.transition(event) else {
            tracing::debug!(block_id = %id, from = %current, ?event, "status transition ignored");
            return Vec::new();
        };
        let patch = BlockPatch::status(next);
        if let Err(e) = self.graph.apply_patch(id, &patch) {
            tracing::warn!(block_id = %id, error = %e, "status update rejected");
            return Vec::new();
        }
        tracing::info!(block_id = %id, from = %current, to = %next, "block status changed");
        self.sync_telemetry();
        vec![Action::BlockUpdated { id: *id, patch }, Action::RenderNeeded]
    }

    fn duplicate_block(&mut self, id: &BlockId) -> Vec<Action> {
        let copy = match self.graph.duplicate_block(id) {
            Ok(copy) => copy,
            Err(e) => {
                tracing::debug!(block_id = %id, error = %e, "duplicate skipped");
                return Vec::new();
            }
        };
        match self.graph.get(&copy) {
            Some(block) => vec![Action::BlockDuplicated { source: *id, block: block.clone() }, Action::RenderNeeded],
            None => Vec::new(),
        }
    }

    fn delete_block(&mut self, id: &BlockId) -> Vec<Action> {
        if !self.forget_block(id) {
            return Vec::new();
        }
        tracing::info!(block_id = %id, "block deleted");
        vec![Action::BlockDeleted { id: *id }, Action::RenderNeeded]
    }

    /// Remove a block and every reference the controller holds to it.
    /// Connections are left in place and become dangling.
    fn forget_block(&mut self, id: &BlockId) -> bool {
        let removed = self.graph.remove_block(id).is_some();
        self.telemetry.cancel(id);
        self.ui.forget(id);
        if gesture_block(&self.input) == Some(*id) {
            self.input = InputState::Idle;
        }
        removed
    }

    fn connect(&mut self, source: &BlockId, target: &BlockId) -> Vec<Action> {
        match self.graph.add_connection(source, target) {
            Ok(conn_id) => {
                tracing::info!(connection_id = %conn_id, %source, %target, "connection created");
                self.graph.connection(&conn_id).cloned().map(Action::ConnectionCreated).into_iter().collect()
            }
            Err(e) => {
                tracing::debug!(%source, %target, error = %e, "connection rejected");
                Vec::new()
            }
        }
    }

    fn drag_to(&mut self, screen_pt: Point) -> Vec<Action> {
        let InputState::DraggingBlock { id, last_world, origin } = self.input else {
            return Vec::new();
        };
        let (Some(world), Some(position)) = (self.camera.screen_to_world(screen_pt), self.graph.get(&id).map(|b| b.position))
        else {
            return Vec::new();
        };
        let moved = position.offset(world.x - last_world.x, world.y - last_world.y);
        if let Err(e) = self.graph.apply_patch(&id, &BlockPatch::position(moved)) {
            tracing::debug!(block_id = %id, error = %e, "drag step rejected");
            return Vec::new();
        }
        self.input = InputState::DraggingBlock { id, last_world: world, origin };
        vec![Action::RenderNeeded]
    }

    /// Report the final position of a drag once, if the block moved.
    fn finish_drag(&mut self, id: &BlockId, origin: Point) -> Vec<Action> {
        match self.graph.get(id).map(|b| b.position) {
            Some(position) if position != origin => {
                tracing::debug!(block_id = %id, x = position.x, y = position.y, "block moved");
                vec![Action::BlockUpdated { id: *id, patch: BlockPatch::position(position) }, Action::RenderNeeded]
            }
            _ => Vec::new(),
        }
    }

    /// Returns whether the hovered block changed.
    fn update_hover(&mut self, world: Point) -> bool {
        let hovered = hit_test(world, &self.graph, &self.ui, &self.camera).map(|h| h.block_id);
        let changed = hovered != self.ui.hovered;
        self.ui.hovered = hovered;
        changed
    }

    fn clear_hover(&mut self) -> Vec<Action> {
        if self.ui.hovered.take().is_some() { vec![Action::RenderNeeded] } else { Vec::new() }
    }

    fn cursor_actions(&mut self, cursor: &str) -> Vec<Action> {
        if self.cursor == cursor {
            return Vec::new();
        }
        cursor.clone_into(&mut self.cursor);
        vec![Action::SetCursor(cursor.to_string())]
    }

    fn sync_telemetry(&mut self) {
        let now = self.clock.now_ms();
        self.telemetry.sync(&self.graph, now);
    }
}

/// The block a gesture in progress is holding on to, if any.
fn gesture_block(input: &InputState) -> Option<BlockId> {
    match input {
        InputState::PressingBlock { id, .. } | InputState::DraggingBlock { id, .. } => Some(*id),
        InputState::Connecting { origin, .. } => Some(*origin),
        InputState::Idle | InputState::Panning { .. } => None,
    }
}

#[cfg(not(feature = "web"))]
fn platform_clock() -> Box<dyn Clock> {
    Box::new(crate::telemetry::SystemClock::new())
}

#[cfg(feature = "web")]
fn platform_clock() -> Box<dyn Clock> {
    Box::new(crate::telemetry::WebClock)
}

// =============================================================
// Browser wrapper
// =============================================================

/// The full canvas engine. Wraps `EngineCore` and owns the browser canvas element.
#[cfg(feature = "web")]
pub struct Engine {
    canvas: HtmlCanvasElement,
    pub core: EngineCore,
}

#[cfg(feature = "web")]
impl Engine {
    /// Create a new engine bound to the given canvas element.
    #[must_use]
    pub fn new(canvas: HtmlCanvasElement, config: CanvasConfig) -> Self {
        Self { canvas, core: EngineCore::new(config) }
    }

    /// Resize the backing store to match the CSS size at `dpr`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) {
        self.core.set_viewport(width_css, height_css, dpr);
        let viewport = self.core.camera.viewport();
        self.canvas.set_width((viewport.width * self.core.dpr).round() as u32);
        self.canvas.set_height((viewport.height * self.core.dpr).round() as u32);
    }

    pub fn dispatch(&mut self, event: InputEvent) -> Vec<Action> {
        self.core.dispatch(event)
    }

    pub fn tick(&mut self) -> Vec<Action> {
        self.core.tick()
    }

    pub fn load_snapshot(&mut self, blocks: Vec<Block>, connections: Vec<Connection>) {
        self.core.load_snapshot(blocks, connections);
    }

    pub fn apply_block_create(&mut self, block: Block) {
        self.core.apply_block_create(block);
    }

    /// # Errors
    ///
    /// See [`EngineCore::apply_block_update`].
    pub fn apply_block_update(&mut self, id: &BlockId, patch: &serde_json::Value) -> Result<(), GraphError> {
        self.core.apply_block_update(id, patch)
    }

    pub fn apply_block_delete(&mut self, id: &BlockId) {
        self.core.apply_block_delete(id);
    }

    pub fn apply_connection_create(&mut self, connection: Connection) {
        self.core.apply_connection_create(connection);
    }

    pub fn apply_connection_delete(&mut self, id: &ConnectionId) {
        self.core.apply_connection_delete(id);
    }

    /// Paint the current scene.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the 2-D context is unavailable or a draw call fails.
    pub fn render(&self) -> Result<(), JsValue> {
        let ctx = self
            .canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(JsValue::from)?;
        crate::paint::draw(&ctx, &self.core.render(), self.core.dpr)
    }
}

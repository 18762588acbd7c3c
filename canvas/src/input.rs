//! Input model: modifier keys, mouse buttons, UI state, and the gesture state machine.
//!
//! `Modifiers` and `Button` capture the user's intent at the time of a pointer
//! event. `InputState` is the active gesture being tracked between
//! pointer-down and pointer-up, carrying the context needed to compute
//! incremental deltas and emit final graph mutations on release. `UiState`
//! is the controller-owned presentation state (selection, hover, pending
//! connection, toggles) that renderers read but never write.
//!
//! [`InputEvent`] is the serializable form of every input the controller
//! accepts, so a session can be recorded and replayed in order.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::camera::{Axis, Point};
use crate::graph::{BlockId, BlockType};

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    /// Shift key is held.
    pub shift: bool,
    /// Ctrl key is held.
    pub ctrl: bool,
    /// Alt / Option key is held.
    pub alt: bool,
    /// Meta / Command key is held.
    pub meta: bool,
}

impl Modifiers {
    /// Whether the modifier that turns a primary drag into a pan is held.
    #[must_use]
    pub fn pans(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    Primary,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// Right mouse button (or two-finger tap).
    Secondary,
}

impl Button {
    /// Map a DOM `MouseEvent.button` index.
    #[must_use]
    pub fn from_dom(index: i16) -> Option<Self> {
        match index {
            0 => Some(Self::Primary),
            1 => Some(Self::Middle),
            2 => Some(Self::Secondary),
            _ => None,
        }
    }
}

/// A keyboard key.
///
/// The inner string holds the key name as reported by the browser (e.g. `"Delete"`, `"Escape"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key(pub String);

impl Key {
    #[must_use]
    pub fn is_escape(&self) -> bool {
        self.0 == "Escape"
    }

    #[must_use]
    pub fn is_delete(&self) -> bool {
        self.0 == "Delete" || self.0 == "Backspace"
    }
}

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelDelta {
    /// Horizontal scroll amount in pixels.
    pub dx: f64,
    /// Vertical scroll amount in pixels (positive = down).
    pub dy: f64,
}

/// Stacking layer selected in the toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    #[default]
    Default,
    Background,
    Foreground,
    Overlay,
}

/// Ordered set of selected block ids.
///
/// Insertion order is kept so batch actions visit blocks deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: Vec<BlockId>,
}

impl SelectionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `id` if absent, remove it if present. Returns whether it is now selected.
    pub fn toggle(&mut self, id: BlockId) -> bool {
        if let Some(pos) = self.ids.iter().position(|s| *s == id) {
            self.ids.remove(pos);
            false
        } else {
            self.ids.push(id);
            true
        }
    }

    pub fn insert(&mut self, id: BlockId) {
        if !self.contains(&id) {
            self.ids.push(id);
        }
    }

    pub fn remove(&mut self, id: &BlockId) {
        self.ids.retain(|s| s != id);
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn retain(&mut self, keep: impl FnMut(&BlockId) -> bool) {
        self.ids.retain(keep);
    }

    #[must_use]
    pub fn contains(&self, id: &BlockId) -> bool {
        self.ids.contains(id)
    }

    /// Selected ids in the order they were selected.
    #[must_use]
    pub fn ids(&self) -> &[BlockId] {
        &self.ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Persistent UI state visible to the renderer.
#[derive(Debug, Clone)]
pub struct UiState {
    /// Blocks currently in the selection.
    pub selection: SelectionSet,
    /// The block under the pointer, if any.
    pub hovered: Option<BlockId>,
    /// Origin block of a connection gesture in progress.
    pub pending_connection: Option<BlockId>,
    /// Blocks whose details panel is open.
    pub expanded: HashSet<BlockId>,
    pub show_grid: bool,
    pub show_minimap: bool,
    pub active_layer: Layer,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            selection: SelectionSet::new(),
            hovered: None,
            pending_connection: None,
            expanded: HashSet::new(),
            show_grid: true,
            show_minimap: true,
            active_layer: Layer::Default,
        }
    }
}

impl UiState {
    /// Drop every reference to a block that no longer exists.
    pub fn forget(&mut self, id: &BlockId) {
        self.selection.remove(id);
        self.expanded.remove(id);
        if self.hovered.as_ref() == Some(id) {
            self.hovered = None;
        }
        if self.pending_connection.as_ref() == Some(id) {
            self.pending_connection = None;
        }
    }
}

/// Internal state for the input state machine.
///
/// Each active variant carries gesture context needed to compute deltas and
/// emit final actions on pointer-up.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// The user is panning the canvas.
    Panning {
        /// Screen-space position of the previous pointer event, used to compute pan delta.
        last_screen: Point,
    },
    /// Primary button is down on a block body but has not moved far enough to drag.
    PressingBlock {
        id: BlockId,
        /// Screen-space position of the pointer-down.
        start_screen: Point,
    },
    /// The user is moving a block across the canvas.
    DraggingBlock {
        /// Id of the block being dragged.
        id: BlockId,
        /// World-space position of the pointer at the previous event.
        last_world: Point,
        /// Block position at the start of the drag.
        origin: Point,
    },
    /// The user is dragging a new connection out of a source handle.
    Connecting {
        /// Block the connection starts from.
        origin: BlockId,
        /// World-space pointer position, for the rubber-band edge.
        cursor_world: Point,
    },
}

/// Every input the controller accepts, in serializable form.
///
/// Replaying a recorded `Vec<InputEvent>` through
/// [`EngineCore::dispatch`](crate::engine::EngineCore::dispatch) reproduces
/// the session exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum InputEvent {
    PointerDown {
        screen: Point,
        button: Button,
        #[serde(default)]
        modifiers: Modifiers,
    },
    PointerMove {
        screen: Point,
        #[serde(default)]
        modifiers: Modifiers,
    },
    PointerUp {
        screen: Point,
        button: Button,
        #[serde(default)]
        modifiers: Modifiers,
    },
    PointerLeave,
    Wheel {
        screen: Point,
        delta: WheelDelta,
        #[serde(default)]
        modifiers: Modifiers,
    },
    KeyDown {
        key: Key,
        #[serde(default)]
        modifiers: Modifiers,
    },
    Resize {
        width: f64,
        height: f64,
    },
    CreateBlock {
        block_type: BlockType,
        position: Point,
    },
    DeleteSelected,
    DuplicateSelected,
    ZoomIn,
    ZoomOut,
    ResetView,
    FitToContent,
    ToggleViewMode,
    AdjustDepth {
        delta: f64,
    },
    AdjustPerspective {
        delta: f64,
    },
    AdjustRotation {
        axis: Axis,
        delta: f64,
    },
    ToggleGrid,
    ToggleMinimap,
    SetLayer {
        layer: Layer,
    },
    /// Run the telemetry ticks due at the controller clock's current time.
    Tick,
}

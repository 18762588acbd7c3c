//! Scene assembly: turns graph, camera, and UI state into one frame's worth
//! of drawable visuals.
//!
//! Everything here is pure and headless. The browser painter in `paint.rs`
//! replays a [`Scene`] onto a 2-D canvas context; tests and the host binary
//! inspect it directly.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use serde::Serialize;

use crate::block_view::{BlockViewState, BlockVisual, block_view, stacking_order};
use crate::camera::{Camera, Point, Rect, RenderTransform, ViewMode, Viewport};
use crate::connection_view::{ConnectionVisual, connection_view, pending_view};
use crate::consts::GRID_SPACING;
use crate::graph::{Block, GraphStore};
use crate::input::{InputState, Layer, UiState};
use crate::minimap::{MinimapVisual, minimap_view};

/// Stroke for grid lines.
pub const GRID_STROKE: &str = "rgba(255, 255, 255, 0.1)";

/// Background grid covering the panel surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridVisual {
    /// Line spacing in world units.
    pub spacing: f64,
    /// Line spacing in CSS pixels at the current zoom.
    pub screen_spacing: f64,
    /// World-space rectangle covered by the untransformed panel.
    pub extent: Rect,
    pub stroke: &'static str,
}

/// Bottom-left counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusBar {
    pub blocks: usize,
    pub connections: usize,
    pub zoom_percent: i64,
    /// Panel depth, shown only in 3-D mode.
    pub depth: Option<f64>,
    pub mode: ViewMode,
}

impl StatusBar {
    /// One-line text as shown in the status bar.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = format!("{} blocks • {} connections • {}%", self.blocks, self.connections, self.zoom_percent);
        if let Some(depth) = self.depth {
            out.push_str(&format!(" • depth {depth:.0}"));
        }
        out
    }
}

/// Floating bar shown while the selection is non-empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionBar {
    pub count: usize,
}

impl SelectionBar {
    #[must_use]
    pub fn text(&self) -> String {
        format!("{} selected", self.count)
    }
}

/// Everything one frame paints, in paint order.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub viewport: Viewport,
    pub transform: RenderTransform,
    pub layer: Layer,
    pub grid: Option<GridVisual>,
    /// Resolved connections only; edges with a missing endpoint are skipped.
    pub connections: Vec<ConnectionVisual>,
    /// Block visuals in stacking order, bottom first.
    pub blocks: Vec<BlockVisual>,
    /// Rubber-band edge of a connection gesture in progress.
    pub pending: Option<ConnectionVisual>,
    pub minimap: Option<MinimapVisual>,
    pub status_bar: StatusBar,
    pub selection_bar: Option<SelectionBar>,
}

/// Assemble the scene for the current state.
///
/// `now_ms` drives the dash animation of animated connections.
#[must_use]
pub fn build_scene(graph: &GraphStore, camera: &Camera, ui: &UiState, input: &InputState, now_ms: u64) -> Scene {
    let transform = camera.render_transform();
    let viewport = camera.viewport();

    let connections = graph
        .resolved_connections()
        .map(|(conn, source, target)| connection_view(conn, source, target, now_ms))
        .collect();

    let ordered = stacking_order(graph, &ui.selection);
    let blocks = ordered
        .iter()
        .map(|block| {
            let state = BlockViewState {
                selected: ui.selection.contains(&block.id),
                hovered: ui.hovered == Some(block.id),
                expanded: ui.expanded.contains(&block.id),
            };
            block_view(block, state)
        })
        .collect();

    let pending = match input {
        InputState::Connecting { origin, cursor_world } => graph.get(origin).map(|b| pending_view(b, *cursor_world)),
        _ => None,
    };

    let minimap = ui.show_minimap.then(|| {
        let all: Vec<&Block> = graph.blocks().collect();
        minimap_view(&all, viewport)
    });

    let status_bar = StatusBar {
        blocks: graph.len(),
        connections: graph.connection_count(),
        zoom_percent: camera.zoom_percent(),
        depth: (camera.mode() == ViewMode::ThreeD).then(|| camera.depth()),
        mode: camera.mode(),
    };

    let selection_bar = (!ui.selection.is_empty()).then(|| SelectionBar { count: ui.selection.len() });

    Scene {
        viewport,
        transform,
        layer: ui.active_layer,
        grid: ui.show_grid.then(|| grid_view(&transform, viewport)),
        connections,
        blocks,
        pending,
        minimap,
        status_bar,
        selection_bar,
    }
}

/// The grid spans the panel surface before projection, so its world extent
/// is the viewport rectangle pulled back through zoom and pan.
fn grid_view(transform: &RenderTransform, viewport: Viewport) -> GridVisual {
    let top_left = transform.plane_to_world(Point::new(0.0, 0.0));
    let bottom_right = transform.plane_to_world(Point::new(viewport.width, viewport.height));
    GridVisual {
        spacing: GRID_SPACING,
        screen_spacing: GRID_SPACING * transform.zoom,
        extent: Rect::new(top_left.x, top_left.y, bottom_right.x - top_left.x, bottom_right.y - top_left.y),
        stroke: GRID_STROKE,
    }
}

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::block_view::{BlockEvent, BlockLayout, action_events, block_layout, stacking_order};
use crate::camera::{Camera, Point};
use crate::consts::{HANDLE_RADIUS_PX, HOVER_SCALE};
use crate::graph::{BlockId, GraphStore};
use crate::input::UiState;
use crate::status::BlockStatus;

/// Which part of a block was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPart {
    /// Outgoing connection handle on the right edge.
    SourceHandle,
    /// Incoming connection handle on the left edge.
    TargetHandle,
    /// One of the header action buttons. Only hittable while hovered.
    Action(BlockEvent),
    DetailsToggle,
    Body,
}

/// Result of a hit test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub block_id: BlockId,
    pub part: HitPart,
}

/// Test which block (if any) is under `world_pt`.
///
/// Blocks are visited topmost first: selected blocks, then the rest, each in
/// reverse graph order. The hovered block is tested at its drawn
/// [`HOVER_SCALE`]. Within a block, handles win over buttons, buttons
/// over the details toggle, and the toggle over the body. Handle slop is
/// [`HANDLE_RADIUS_PX`] screen pixels at the current zoom.
#[must_use]
pub fn hit_test(world_pt: Point, graph: &GraphStore, ui: &UiState, camera: &Camera) -> Option<Hit> {
    let slop = camera.screen_dist_to_world(HANDLE_RADIUS_PX);
    stacking_order(graph, &ui.selection).into_iter().rev().find_map(|block| {
        let layout = block_layout(block.position, ui.expanded.contains(&block.id));
        let hovered = ui.hovered == Some(block.id);
        // A hovered card is drawn scaled about its center; test in its unscaled frame.
        let world_pt = if hovered { unscale(world_pt, layout.body.center()) } else { world_pt };
        let part = if world_pt.distance(layout.source_handle) <= slop {
            HitPart::SourceHandle
        } else if world_pt.distance(layout.target_handle) <= slop {
            HitPart::TargetHandle
        } else if !layout.body.contains(world_pt) {
            return None;
        } else if let Some(event) = hovered_action(world_pt, block.status, &layout, hovered) {
            HitPart::Action(event)
        } else if layout.details_toggle.contains(world_pt) {
            HitPart::DetailsToggle
        } else {
            HitPart::Body
        };
        Some(Hit { block_id: block.id, part })
    })
}

fn hovered_action(world_pt: Point, status: BlockStatus, layout: &BlockLayout, hovered: bool) -> Option<BlockEvent> {
    if !hovered {
        return None;
    }
    action_events(status).into_iter().zip(layout.actions).find(|(_, rect)| rect.contains(world_pt)).map(|(e, _)| e)
}

fn unscale(pt: Point, center: Point) -> Point {
    Point::new(center.x + (pt.x - center.x) / HOVER_SCALE, center.y + (pt.y - center.y) / HOVER_SCALE)
}

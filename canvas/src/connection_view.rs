//! Connection renderer: straight edges between block handles.
//!
//! Anchors are fixed offsets from each block's top-left corner: the source
//! leaves from its right-center, the target is entered at its left-center.
//! Animated connections get a dash pattern whose offset is derived from the
//! clock, so repeated renders at increasing `now_ms` march the dashes along
//! the line. The effect is purely presentational.

#[cfg(test)]
#[path = "connection_view_test.rs"]
mod connection_view_test;

use serde::Serialize;

use crate::camera::Point;
use crate::consts::{BLOCK_HEIGHT, BLOCK_WIDTH, CONNECTION_DASH, CONNECTION_DASH_MS_PER_UNIT};
use crate::graph::{Block, Connection, ConnectionId};

/// Edge stroke: purple at 60% opacity.
pub const CONNECTION_STROKE: &str = "rgba(168, 85, 247, 0.6)";

/// Stroke of the rubber-band edge drawn during a connection gesture.
pub const PENDING_STROKE: &str = "rgba(96, 165, 250, 0.8)";

/// Edge width in world units.
pub const CONNECTION_WIDTH: f64 = 2.0;

/// Where an outgoing edge leaves a block.
#[must_use]
pub fn source_anchor(block: &Block) -> Point {
    Point::new(block.position.x + BLOCK_WIDTH, block.position.y + BLOCK_HEIGHT * 0.5)
}

/// Where an incoming edge enters a block.
#[must_use]
pub fn target_anchor(block: &Block) -> Point {
    Point::new(block.position.x, block.position.y + BLOCK_HEIGHT * 0.5)
}

/// A line segment in world space, ready to stroke.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionVisual {
    /// `None` for the pending edge of a gesture in progress.
    pub id: Option<ConnectionId>,
    pub from: Point,
    pub to: Point,
    pub stroke: &'static str,
    pub width: f64,
    /// Dash and gap lengths; `None` draws a solid line.
    pub dash: Option<[f64; 2]>,
    pub dash_offset: f64,
}

/// Visual for a resolved connection. The caller has already looked up both
/// endpoint blocks; dangling connections never reach this function.
#[must_use]
pub fn connection_view(connection: &Connection, source: &Block, target: &Block, now_ms: u64) -> ConnectionVisual {
    let (dash, dash_offset) = if connection.animated {
        (Some([CONNECTION_DASH, CONNECTION_DASH]), march_offset(now_ms))
    } else {
        (None, 0.0)
    };
    ConnectionVisual {
        id: Some(connection.id),
        from: source_anchor(source),
        to: target_anchor(target),
        stroke: CONNECTION_STROKE,
        width: CONNECTION_WIDTH,
        dash,
        dash_offset,
    }
}

/// Rubber-band edge from `origin`'s source handle to the pointer.
#[must_use]
pub fn pending_view(origin: &Block, cursor_world: Point) -> ConnectionVisual {
    ConnectionVisual {
        id: None,
        from: source_anchor(origin),
        to: cursor_world,
        stroke: PENDING_STROKE,
        width: CONNECTION_WIDTH,
        dash: Some([CONNECTION_DASH, CONNECTION_DASH]),
        dash_offset: 0.0,
    }
}

/// Dash offset at `now_ms`, in `(-period, 0]` where `period` is one dash plus one gap.
#[allow(clippy::cast_precision_loss)]
fn march_offset(now_ms: u64) -> f64 {
    let period = CONNECTION_DASH * 2.0;
    let travelled = now_ms as f64 / CONNECTION_DASH_MS_PER_UNIT;
    -(travelled % period)
}

//! Mini-map: a fixed-size, non-interactive overview of block positions.
//!
//! The scale is re-derived from the content bounding box on every call and
//! does not depend on the main view's zoom. Connections are not drawn.

#[cfg(test)]
#[path = "minimap_test.rs"]
mod minimap_test;

use serde::Serialize;

use crate::block_view::{Hue, block_hue};
use crate::camera::{Point, Rect, Viewport, content_bounds};
use crate::consts::{BLOCK_HEIGHT, BLOCK_WIDTH, MINIMAP_DOT_RADIUS, MINIMAP_HEIGHT, MINIMAP_PADDING, MINIMAP_WIDTH};
use crate::graph::{Block, BlockId};

/// Distance of the inset from the top-right corner of the viewport.
const MINIMAP_MARGIN: f64 = 16.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MinimapDot {
    pub id: BlockId,
    /// Screen-space center of the dot.
    pub center: Point,
    pub radius: f64,
    pub hue: Hue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MinimapVisual {
    /// Screen-space rectangle of the inset.
    pub frame: Rect,
    /// World-to-inset scale used for this frame.
    pub scale: f64,
    pub dots: Vec<MinimapDot>,
}

/// Lay out the mini-map for `blocks` inside a viewport of the given size.
#[must_use]
pub fn minimap_view(blocks: &[&Block], viewport: Viewport) -> MinimapVisual {
    let frame = Rect::new(
        (viewport.width - MINIMAP_MARGIN - MINIMAP_WIDTH).max(0.0),
        MINIMAP_MARGIN,
        MINIMAP_WIDTH,
        MINIMAP_HEIGHT,
    );
    let inner = Rect::new(
        frame.x + MINIMAP_PADDING,
        frame.y + MINIMAP_PADDING,
        frame.width - 2.0 * MINIMAP_PADDING,
        frame.height - 2.0 * MINIMAP_PADDING,
    );

    let Some(bounds) = content_bounds(blocks.iter().copied()) else {
        return MinimapVisual { frame, scale: 1.0, dots: Vec::new() };
    };

    let scale = (inner.width / bounds.width).min(inner.height / bounds.height);
    // Center the scaled content inside the inner area.
    let offset_x = inner.x + (inner.width - bounds.width * scale) * 0.5;
    let offset_y = inner.y + (inner.height - bounds.height * scale) * 0.5;

    let dots = blocks
        .iter()
        .map(|block| {
            let world = Point::new(block.position.x + BLOCK_WIDTH * 0.5, block.position.y + BLOCK_HEIGHT * 0.5);
            let center = Point::new(offset_x + (world.x - bounds.x) * scale, offset_y + (world.y - bounds.y) * scale);
            MinimapDot { id: block.id, center, radius: MINIMAP_DOT_RADIUS, hue: block_hue(block.block_type) }
        })
        .collect();

    MinimapVisual { frame, scale, dots }
}

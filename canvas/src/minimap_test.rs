#![allow(clippy::float_cmp)]

use super::*;
use crate::graph::BlockType;

const EPSILON: f64 = 1e-9;

fn block_at(x: f64, y: f64) -> Block {
    Block::new(BlockType::Analytics, Point::new(x, y))
}

fn viewport() -> Viewport {
    Viewport::new(1000.0, 800.0)
}

#[test]
fn frame_sits_in_top_right_corner() {
    let map = minimap_view(&[], viewport());
    assert_eq!(map.frame, Rect::new(792.0, 16.0, MINIMAP_WIDTH, MINIMAP_HEIGHT));
    assert!(map.dots.is_empty());
}

#[test]
fn single_block_is_centered() {
    let b = block_at(-500.0, 9000.0);
    let map = minimap_view(&[&b], viewport());
    assert_eq!(map.dots.len(), 1);
    let dot = &map.dots[0];
    assert_eq!(dot.id, b.id);
    assert!((dot.center.x - 888.0).abs() < EPSILON);
    assert!((dot.center.y - 80.0).abs() < EPSILON);
    assert_eq!(dot.hue, Hue::Green);
}

#[test]
fn dots_stay_inside_the_frame() {
    let blocks = [block_at(0.0, 0.0), block_at(5000.0, -300.0), block_at(-2500.0, 4000.0)];
    let refs: Vec<&Block> = blocks.iter().collect();
    let map = minimap_view(&refs, viewport());
    for dot in &map.dots {
        assert!(map.frame.contains(dot.center), "{dot:?}");
    }
}

#[test]
fn scale_follows_content_not_zoom() {
    let near = [block_at(0.0, 0.0), block_at(600.0, 0.0)];
    let far = [block_at(0.0, 0.0), block_at(1800.0, 0.0)];
    let near_map = minimap_view(&near.iter().collect::<Vec<_>>(), viewport());
    let far_map = minimap_view(&far.iter().collect::<Vec<_>>(), viewport());
    // Widths 900 and 2100 both bind on the horizontal axis.
    assert!((near_map.scale * 900.0 - far_map.scale * 2100.0).abs() < EPSILON);
    assert!(far_map.scale < near_map.scale);
}

#[test]
fn tiny_viewport_pins_frame_to_left_edge() {
    let map = minimap_view(&[], Viewport::new(100.0, 100.0));
    assert_eq!(map.frame.x, 0.0);
}

use super::*;
use crate::consts::HOVER_SCALE;
use crate::graph::BlockType;

fn setup() -> (GraphStore, UiState, Camera, BlockId, BlockId) {
    let mut graph = GraphStore::new();
    let a = graph.add_block(BlockType::Dashboard, Point::new(0.0, 0.0));
    let b = graph.add_block(BlockType::Crm, Point::new(100.0, 50.0));
    (graph, UiState::default(), Camera::default(), a, b)
}

fn part_at(pt: Point, graph: &GraphStore, ui: &UiState, camera: &Camera) -> Option<(BlockId, HitPart)> {
    hit_test(pt, graph, ui, camera).map(|h| (h.block_id, h.part))
}

// =============================================================
// Ordering
// =============================================================

#[test]
fn empty_canvas_misses() {
    let (graph, ui, cam, _, _) = setup();
    assert_eq!(part_at(Point::new(-50.0, -50.0), &graph, &ui, &cam), None);
}

#[test]
fn later_block_wins_overlap() {
    let (graph, ui, cam, _, b) = setup();
    assert_eq!(part_at(Point::new(150.0, 150.0), &graph, &ui, &cam), Some((b, HitPart::Body)));
}

#[test]
fn selected_block_wins_overlap() {
    let (graph, mut ui, cam, a, _) = setup();
    ui.selection.insert(a);
    assert_eq!(part_at(Point::new(150.0, 150.0), &graph, &ui, &cam), Some((a, HitPart::Body)));
}

#[test]
fn uncovered_part_of_lower_block_still_hits() {
    let (graph, ui, cam, a, _) = setup();
    assert_eq!(part_at(Point::new(20.0, 20.0), &graph, &ui, &cam), Some((a, HitPart::Body)));
}

// =============================================================
// Parts
// =============================================================

#[test]
fn handles_are_hit_with_screen_slop() {
    let (mut graph, ui, mut cam, _, _) = setup();
    let lone = graph.add_block(BlockType::Aura, Point::new(1000.0, 1000.0));
    assert_eq!(part_at(Point::new(1306.0, 1100.0), &graph, &ui, &cam), Some((lone, HitPart::SourceHandle)));
    assert_eq!(part_at(Point::new(995.0, 1100.0), &graph, &ui, &cam), Some((lone, HitPart::TargetHandle)));

    // At 2x zoom the same 6-unit miss is 12 screen pixels: outside the slop.
    cam.zoom_by(1.0, None);
    assert_eq!(part_at(Point::new(1306.0, 1100.0), &graph, &ui, &cam), None);
}

#[test]
fn actions_only_hit_while_hovered() {
    let (mut graph, mut ui, cam, _, _) = setup();
    let id = graph.add_block(BlockType::Aura, Point::new(1000.0, 1000.0));
    let layout = block_layout(Point::new(1000.0, 1000.0), false);
    let first = layout.actions[0].center();
    let last = layout.actions[4].center();

    assert_eq!(part_at(first, &graph, &ui, &cam), Some((id, HitPart::Body)));

    ui.hovered = Some(id);
    assert_eq!(part_at(first, &graph, &ui, &cam), Some((id, HitPart::Action(BlockEvent::Start))));
    assert_eq!(part_at(last, &graph, &ui, &cam), Some((id, HitPart::Action(BlockEvent::Delete))));
}

#[test]
fn run_button_follows_status() {
    let (mut graph, mut ui, cam, _, _) = setup();
    let id = graph.add_block(BlockType::Aura, Point::new(1000.0, 1000.0));
    graph.apply_patch(&id, &crate::graph::BlockPatch::status(BlockStatus::Active)).unwrap();
    ui.hovered = Some(id);
    let first = block_layout(Point::new(1000.0, 1000.0), false).actions[0].center();
    assert_eq!(part_at(first, &graph, &ui, &cam), Some((id, HitPart::Action(BlockEvent::Stop))));
}

#[test]
fn details_toggle_and_expanded_panel() {
    let (mut graph, mut ui, cam, _, _) = setup();
    let id = graph.add_block(BlockType::Aura, Point::new(1000.0, 1000.0));
    let toggle = block_layout(Point::new(1000.0, 1000.0), false).details_toggle.center();
    assert_eq!(part_at(toggle, &graph, &ui, &cam), Some((id, HitPart::DetailsToggle)));

    let in_panel = Point::new(1150.0, 1250.0);
    assert_eq!(part_at(in_panel, &graph, &ui, &cam), None);
    ui.expanded.insert(id);
    assert_eq!(part_at(in_panel, &graph, &ui, &cam), Some((id, HitPart::Body)));
}

// =============================================================
// Hover scale
// =============================================================

/// Where `world` on a hovered card is drawn: scaled about the card center.
fn drawn(world: Point, center: Point) -> Point {
    Point::new(center.x + (world.x - center.x) * HOVER_SCALE, center.y + (world.y - center.y) * HOVER_SCALE)
}

#[test]
fn hovered_card_is_hit_where_it_is_drawn() {
    let mut graph = GraphStore::new();
    let id = graph.add_block(BlockType::Dashboard, Point::new(0.0, 0.0));
    let mut ui = UiState::default();
    let cam = Camera::default();
    ui.expanded.insert(id);
    ui.hovered = Some(id);
    let layout = block_layout(Point::new(0.0, 0.0), true);
    let center = layout.body.center();

    let handle = drawn(layout.source_handle, center);
    assert!(handle.distance(Point::new(307.5, 97.0)) < 1e-9);
    assert_eq!(part_at(handle, &graph, &ui, &cam), Some((id, HitPart::SourceHandle)));

    let delete = action_events(BlockStatus::Idle).iter().position(|e| *e == BlockEvent::Delete).unwrap();
    let button = layout.actions[delete];
    for corner in [Point::new(button.x + 1.0, button.y + 1.0), Point::new(button.right() - 1.0, button.y + 1.0)] {
        assert_eq!(part_at(drawn(corner, center), &graph, &ui, &cam), Some((id, HitPart::Action(BlockEvent::Delete))));
    }

    let toggle = drawn(layout.details_toggle.center(), center);
    assert_eq!(part_at(toggle, &graph, &ui, &cam), Some((id, HitPart::DetailsToggle)));
}

#[test]
fn hover_scale_grows_the_hit_area() {
    let mut graph = GraphStore::new();
    let id = graph.add_block(BlockType::Dashboard, Point::new(0.0, 0.0));
    let mut ui = UiState::default();
    let cam = Camera::default();
    let just_outside = Point::new(-5.0, 160.0);

    assert_eq!(part_at(just_outside, &graph, &ui, &cam), None);
    ui.hovered = Some(id);
    assert_eq!(part_at(just_outside, &graph, &ui, &cam), Some((id, HitPart::Body)));
}

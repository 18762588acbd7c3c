#![allow(clippy::float_cmp)]

use serde_json::json;

use super::*;
use crate::block_view::block_layout;
use crate::camera::ViewMode;
use crate::error::ErrorCode;
use crate::status::BlockStatus;
use crate::telemetry::ManualClock;

// =============================================================
// Helpers
// =============================================================

fn engine() -> (EngineCore, ManualClock) {
    let clock = ManualClock::new(0);
    let config = CanvasConfig { telemetry_seed: Some(7), ..CanvasConfig::default() };
    let mut core = EngineCore::with_clock(config, Box::new(clock.clone()));
    core.set_viewport(800.0, 600.0, 1.0);
    (core, clock)
}

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn no_modifiers() -> Modifiers {
    Modifiers::default()
}

fn ctrl_modifier() -> Modifiers {
    Modifiers { ctrl: true, ..Default::default() }
}

fn add(core: &mut EngineCore, block_type: BlockType, x: f64, y: f64) -> BlockId {
    core.graph.add_block(block_type, pt(x, y))
}

fn down(core: &mut EngineCore, p: Point) -> Vec<Action> {
    core.on_pointer_down(p, Button::Primary, no_modifiers())
}

fn move_to(core: &mut EngineCore, p: Point) -> Vec<Action> {
    core.on_pointer_move(p, no_modifiers())
}

fn up(core: &mut EngineCore, p: Point) -> Vec<Action> {
    core.on_pointer_up(p, Button::Primary, no_modifiers())
}

fn click(core: &mut EngineCore, p: Point) -> Vec<Action> {
    let mut actions = down(core, p);
    actions.extend(up(core, p));
    actions
}

fn key(core: &mut EngineCore, name: &str) -> Vec<Action> {
    core.on_key_down(Key(name.to_string()), no_modifiers())
}

fn updated_ids(actions: &[Action]) -> Vec<BlockId> {
    actions
        .iter()
        .filter_map(|a| match a {
            Action::BlockUpdated { id, .. } => Some(*id),
            _ => None,
        })
        .collect()
}

fn status_of(core: &EngineCore, id: &BlockId) -> BlockStatus {
    core.block(id).map(|b| b.status).unwrap()
}

/// Hover `id` (at the origin) so its action buttons become hittable, then
/// click the first one.
fn click_run_button(core: &mut EngineCore) -> Vec<Action> {
    let run = block_layout(pt(0.0, 0.0), false).actions[0].center();
    move_to(core, run);
    click(core, run)
}

// =============================================================
// Construction and config
// =============================================================

#[test]
fn config_flags_seed_ui_and_camera() {
    let config = CanvasConfig { view_mode: ViewMode::ThreeD, show_grid: false, show_minimap: false, telemetry_seed: Some(1) };
    let core = EngineCore::with_clock(config, Box::new(ManualClock::new(0)));
    assert_eq!(core.camera.mode(), ViewMode::ThreeD);
    assert!(!core.ui.show_grid);
    assert!(!core.ui.show_minimap);
    assert_eq!(core.input, InputState::Idle);
}

#[test]
fn set_viewport_sanitizes_dpr() {
    let (mut core, _) = engine();
    core.set_viewport(1024.0, 768.0, f64::NAN);
    assert_eq!(core.dpr, 1.0);
    assert_eq!(core.camera.viewport().width, 1024.0);
    core.set_viewport(1024.0, 768.0, 2.0);
    assert_eq!(core.dpr, 2.0);
}

// =============================================================
// Selection
// =============================================================

#[test]
fn click_on_body_toggles_selection() {
    let (mut core, _) = engine();
    let a = add(&mut core, BlockType::Dashboard, 0.0, 0.0);

    let actions = click(&mut core, pt(150.0, 150.0));
    assert_eq!(core.selection(), &[a]);
    assert!(actions.contains(&Action::RenderNeeded));

    click(&mut core, pt(150.0, 150.0));
    assert!(core.selection().is_empty());
}

#[test]
fn clicks_accumulate_without_modifiers() {
    let (mut core, _) = engine();
    let a = add(&mut core, BlockType::Dashboard, 0.0, 0.0);
    let b = add(&mut core, BlockType::Crm, 400.0, 0.0);
    click(&mut core, pt(150.0, 150.0));
    click(&mut core, pt(550.0, 150.0));
    assert_eq!(core.selection(), &[a, b]);
}

#[test]
fn click_on_empty_canvas_does_nothing() {
    let (mut core, _) = engine();
    let a = add(&mut core, BlockType::Dashboard, 0.0, 0.0);
    core.ui.selection.insert(a);
    let actions = click(&mut core, pt(700.0, 500.0));
    assert!(actions.is_empty());
    assert_eq!(core.selection(), &[a]);
}

#[test]
fn secondary_button_is_ignored() {
    let (mut core, _) = engine();
    add(&mut core, BlockType::Dashboard, 0.0, 0.0);
    assert!(core.on_pointer_down(pt(150.0, 150.0), Button::Secondary, no_modifiers()).is_empty());
    assert_eq!(core.input, InputState::Idle);
}

#[test]
fn escape_clears_selection_and_pending_connection() {
    let (mut core, _) = engine();
    let a = add(&mut core, BlockType::Dashboard, 0.0, 0.0);
    let b = add(&mut core, BlockType::Crm, 400.0, 0.0);
    core.ui.selection.insert(a);
    core.ui.selection.insert(b);
    down(&mut core, pt(300.0, 100.0));
    assert_eq!(core.ui.pending_connection, Some(a));

    key(&mut core, "Escape");

    assert!(core.selection().is_empty());
    assert_eq!(core.ui.pending_connection, None);
    assert_eq!(core.input, InputState::Idle);
}

#[test]
fn escape_with_nothing_selected_is_harmless() {
    let (mut core, _) = engine();
    assert_eq!(key(&mut core, "Escape"), vec![Action::RenderNeeded]);
}

#[test]
fn other_keys_are_ignored() {
    let (mut core, _) = engine();
    let a = add(&mut core, BlockType::Dashboard, 0.0, 0.0);
    core.ui.selection.insert(a);
    assert!(key(&mut core, "a").is_empty());
    assert_eq!(core.graph.len(), 1);
}

// =============================================================
// Pan and zoom
// =============================================================

#[test]
fn middle_button_pans_by_raw_screen_delta() {
    let (mut core, _) = engine();
    core.camera.zoom_by(1.0, None);
    let actions = core.on_pointer_down(pt(100.0, 100.0), Button::Middle, no_modifiers());
    assert_eq!(actions, vec![Action::SetCursor("grabbing".into())]);

    move_to(&mut core, pt(130.0, 90.0));
    move_to(&mut core, pt(140.0, 95.0));
    assert_eq!(core.camera.pan(), pt(40.0, -5.0));

    up(&mut core, pt(140.0, 95.0));
    assert_eq!(core.input, InputState::Idle);
}

#[test]
fn ctrl_or_meta_primary_pans_even_over_a_block() {
    let (mut core, _) = engine();
    add(&mut core, BlockType::Dashboard, 0.0, 0.0);
    core.on_pointer_down(pt(150.0, 150.0), Button::Primary, ctrl_modifier());
    assert!(matches!(core.input, InputState::Panning { .. }));
    move_to(&mut core, pt(160.0, 150.0));
    assert_eq!(core.camera.pan(), pt(10.0, 0.0));
    up(&mut core, pt(160.0, 150.0));
    assert!(core.selection().is_empty());

    let meta = Modifiers { meta: true, ..Default::default() };
    core.on_pointer_down(pt(0.0, 0.0), Button::Primary, meta);
    assert!(matches!(core.input, InputState::Panning { .. }));
}

#[test]
fn pointer_leave_ends_pan() {
    let (mut core, _) = engine();
    core.on_pointer_down(pt(0.0, 0.0), Button::Middle, no_modifiers());
    core.on_pointer_leave();
    assert_eq!(core.input, InputState::Idle);
    move_to(&mut core, pt(50.0, 50.0));
    assert_eq!(core.camera.pan(), pt(0.0, 0.0));
}

#[test]
fn wheel_zoom_is_anchored_at_the_pointer() {
    let (mut core, _) = engine();
    let anchor = pt(100.0, 100.0);
    let before = core.camera.screen_to_world(anchor).unwrap();

    let actions = core.on_wheel(anchor, WheelDelta { dx: 0.0, dy: -120.0 }, no_modifiers());

    assert_eq!(actions, vec![Action::RenderNeeded]);
    assert!((core.camera.zoom() - 1.1).abs() < 1e-9);
    let after = core.camera.screen_to_world(anchor).unwrap();
    assert!(before.distance(after) < 1e-9);
    assert!((core.camera.pan().x + 10.0).abs() < 1e-9);
}

#[test]
fn wheel_down_zooms_out_and_clamps() {
    let (mut core, _) = engine();
    for _ in 0..20 {
        core.on_wheel(pt(0.0, 0.0), WheelDelta { dx: 0.0, dy: 3.0 }, no_modifiers());
    }
    assert!((core.camera.zoom() - 0.1).abs() < 1e-9);
}

#[test]
fn wheel_ignores_zero_and_non_finite_deltas() {
    let (mut core, _) = engine();
    assert!(core.on_wheel(pt(0.0, 0.0), WheelDelta { dx: 5.0, dy: 0.0 }, no_modifiers()).is_empty());
    assert!(core.on_wheel(pt(0.0, 0.0), WheelDelta { dx: 0.0, dy: f64::NAN }, no_modifiers()).is_empty());
    assert_eq!(core.camera.zoom(), 1.0);
}

// =============================================================
// Dragging
// =============================================================

#[test]
fn small_moves_do_not_start_a_drag() {
    let (mut core, _) = engine();
    let a = add(&mut core, BlockType::Dashboard, 0.0, 0.0);
    down(&mut core, pt(150.0, 150.0));
    assert!(move_to(&mut core, pt(151.0, 151.0)).is_empty());
    up(&mut core, pt(151.0, 151.0));
    assert_eq!(core.block(&a).unwrap().position, pt(0.0, 0.0));
    assert_eq!(core.selection(), &[a]);
}

#[test]
fn drag_moves_block_and_reports_final_position_once() {
    let (mut core, _) = engine();
    let a = add(&mut core, BlockType::Dashboard, 0.0, 0.0);

    down(&mut core, pt(150.0, 150.0));
    let first = move_to(&mut core, pt(160.0, 170.0));
    assert!(first.contains(&Action::SetCursor("move".into())));
    assert_eq!(core.block(&a).unwrap().position, pt(10.0, 20.0));

    let second = move_to(&mut core, pt(200.0, 200.0));
    assert!(updated_ids(&second).is_empty());
    assert_eq!(core.block(&a).unwrap().position, pt(50.0, 50.0));

    let released = up(&mut core, pt(200.0, 200.0));
    let updates: Vec<_> = released
        .iter()
        .filter_map(|a| match a {
            Action::BlockUpdated { patch, .. } => patch.position,
            _ => None,
        })
        .collect();
    assert_eq!(updates, vec![pt(50.0, 50.0)]);
    // A drag is not a click.
    assert!(core.selection().is_empty());
}

#[test]
fn drag_converts_screen_delta_through_zoom() {
    let (mut core, _) = engine();
    let a = add(&mut core, BlockType::Dashboard, 0.0, 0.0);
    core.camera.zoom_by(1.0, None);
    down(&mut core, pt(300.0, 300.0));
    move_to(&mut core, pt(320.0, 340.0));
    assert_eq!(core.block(&a).unwrap().position, pt(10.0, 20.0));
}

#[test]
fn pointer_leave_commits_a_drag() {
    let (mut core, _) = engine();
    let a = add(&mut core, BlockType::Dashboard, 0.0, 0.0);
    down(&mut core, pt(150.0, 150.0));
    move_to(&mut core, pt(170.0, 150.0));
    let actions = core.on_pointer_leave();
    assert_eq!(updated_ids(&actions), vec![a]);
    assert_eq!(core.input, InputState::Idle);
}

// =============================================================
// Connections
// =============================================================

fn two_blocks(core: &mut EngineCore) -> (BlockId, BlockId) {
    let a = add(core, BlockType::Dashboard, 0.0, 0.0);
    let b = add(core, BlockType::Crm, 400.0, 0.0);
    (a, b)
}

#[test]
fn connection_gesture_completes_on_another_block() {
    let (mut core, _) = engine();
    let (a, b) = two_blocks(&mut core);

    let started = down(&mut core, pt(300.0, 100.0));
    assert!(started.contains(&Action::SetCursor("crosshair".into())));
    assert_eq!(core.ui.pending_connection, Some(a));

    move_to(&mut core, pt(500.0, 120.0));
    let scene = core.render();
    assert_eq!(scene.pending.as_ref().map(|p| p.to), Some(pt(500.0, 120.0)));
    assert_eq!(core.ui.hovered, Some(b));

    let actions = up(&mut core, pt(550.0, 120.0));
    let created: Vec<_> = actions
        .iter()
        .filter_map(|a| match a {
            Action::ConnectionCreated(c) => Some((c.source, c.target)),
            _ => None,
        })
        .collect();
    assert_eq!(created, vec![(a, b)]);
    assert_eq!(core.graph.connection_count(), 1);
    assert_eq!(core.ui.pending_connection, None);
    assert!(core.render().pending.is_none());
}

#[test]
fn connection_gesture_completes_on_target_handle() {
    let (mut core, _) = engine();
    let (a, b) = two_blocks(&mut core);
    down(&mut core, pt(300.0, 100.0));
    up(&mut core, pt(402.0, 100.0));
    let conn = &core.graph.connections()[0];
    assert_eq!((conn.source, conn.target), (a, b));
}

#[test]
fn releasing_on_origin_block_cancels() {
    let (mut core, _) = engine();
    two_blocks(&mut core);
    down(&mut core, pt(300.0, 100.0));
    let actions = up(&mut core, pt(150.0, 100.0));
    assert!(!actions.iter().any(|a| matches!(a, Action::ConnectionCreated(_))));
    assert_eq!(core.graph.connection_count(), 0);
    assert_eq!(core.ui.pending_connection, None);
}

#[test]
fn releasing_on_empty_canvas_cancels() {
    let (mut core, _) = engine();
    two_blocks(&mut core);
    down(&mut core, pt(300.0, 100.0));
    up(&mut core, pt(350.0, 500.0));
    assert_eq!(core.graph.connection_count(), 0);
    assert_eq!(core.input, InputState::Idle);
}

#[test]
fn pointer_leave_cancels_connection() {
    let (mut core, _) = engine();
    two_blocks(&mut core);
    down(&mut core, pt(300.0, 100.0));
    core.on_pointer_leave();
    assert_eq!(core.ui.pending_connection, None);
    assert_eq!(core.graph.connection_count(), 0);
}

#[test]
fn delete_connection_reports_once() {
    let (mut core, _) = engine();
    let (a, b) = two_blocks(&mut core);
    let id = core.graph.add_connection(&a, &b).unwrap();
    assert_eq!(core.delete_connection(&id), vec![Action::ConnectionDeleted { id }, Action::RenderNeeded]);
    assert!(core.delete_connection(&id).is_empty());
}

// =============================================================
// Batch actions
// =============================================================

#[test]
fn delete_key_removes_selection_and_leaves_dangling_connections() {
    let (mut core, _) = engine();
    let (a, b) = two_blocks(&mut core);
    let c = add(&mut core, BlockType::Aura, 0.0, 400.0);
    let conn = core.graph.add_connection(&a, &b).unwrap();
    core.ui.selection.insert(a);

    let actions = key(&mut core, "Delete");

    assert_eq!(actions, vec![Action::BlockDeleted { id: a }, Action::RenderNeeded]);
    assert!(core.selection().is_empty());
    assert_eq!(core.graph.len(), 2);
    assert!(core.block(&c).is_some());
    let dangling: Vec<_> = core.graph.dangling_connections().map(|c| c.id).collect();
    assert_eq!(dangling, vec![conn]);
    assert!(core.render().connections.is_empty());
}

#[test]
fn backspace_deletes_too() {
    let (mut core, _) = engine();
    let (a, b) = two_blocks(&mut core);
    core.ui.selection.insert(a);
    core.ui.selection.insert(b);
    let actions = key(&mut core, "Backspace");
    assert_eq!(actions.iter().filter(|a| matches!(a, Action::BlockDeleted { .. })).count(), 2);
    assert!(core.graph.is_empty());
}

#[test]
fn duplicate_selected_copies_then_clears() {
    let (mut core, _) = engine();
    let (a, _) = two_blocks(&mut core);
    core.ui.selection.insert(a);

    let actions = core.duplicate_selected();

    let copies: Vec<_> = actions
        .iter()
        .filter_map(|act| match act {
            Action::BlockDuplicated { source, block } => Some((*source, block.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(copies.len(), 1);
    let (source, copy) = &copies[0];
    assert_eq!(*source, a);
    assert_ne!(copy.id, a);
    assert_eq!(copy.position, pt(20.0, 20.0));
    assert_eq!(core.graph.len(), 3);
    assert!(core.selection().is_empty());
    assert_eq!(actions.last(), Some(&Action::RenderNeeded));
}

#[test]
fn batch_on_empty_selection_only_rerenders() {
    let (mut core, _) = engine();
    two_blocks(&mut core);
    assert_eq!(core.delete_selected(), vec![Action::RenderNeeded]);
    assert_eq!(core.duplicate_selected(), vec![Action::RenderNeeded]);
    assert_eq!(core.graph.len(), 2);
}

// =============================================================
// Block events
// =============================================================

#[test]
fn action_buttons_need_hover() {
    let (mut core, _) = engine();
    let a = add(&mut core, BlockType::Workflows, 0.0, 0.0);
    let run = block_layout(pt(0.0, 0.0), false).actions[0].center();

    // Without hover the press lands on the body.
    click(&mut core, run);
    assert_eq!(status_of(&core, &a), BlockStatus::Idle);
    assert_eq!(core.selection(), &[a]);
}

#[test]
fn start_and_stop_through_the_run_button() {
    let (mut core, _) = engine();
    let a = add(&mut core, BlockType::Workflows, 0.0, 0.0);

    let started = click_run_button(&mut core);
    assert_eq!(updated_ids(&started), vec![a]);
    assert_eq!(status_of(&core, &a), BlockStatus::Active);
    assert!(core.telemetry.is_running(&a));
    // The button press is not a selection click.
    assert!(core.selection().is_empty());

    click_run_button(&mut core);
    assert_eq!(status_of(&core, &a), BlockStatus::Paused);
    assert!(!core.telemetry.is_running(&a));
}

#[test]
fn hover_tracks_the_topmost_block_and_cursor() {
    let (mut core, _) = engine();
    let a = add(&mut core, BlockType::Workflows, 0.0, 0.0);

    let entered = move_to(&mut core, pt(150.0, 150.0));
    assert_eq!(core.ui.hovered, Some(a));
    assert!(entered.contains(&Action::SetCursor("grab".into())));
    assert!(entered.contains(&Action::RenderNeeded));

    // Same block, same cursor: nothing new to report.
    assert!(move_to(&mut core, pt(160.0, 150.0)).is_empty());

    let left = move_to(&mut core, pt(700.0, 500.0));
    assert_eq!(core.ui.hovered, None);
    assert!(left.contains(&Action::SetCursor("default".into())));
}

#[test]
fn configure_and_view_are_forwarded() {
    let (mut core, _) = engine();
    let a = add(&mut core, BlockType::Crm, 0.0, 0.0);
    assert_eq!(core.block_event(&a, BlockEvent::Configure), vec![Action::ConfigureRequested { id: a }]);
    assert_eq!(core.block_event(&a, BlockEvent::View), vec![Action::ViewRequested { id: a }]);
}

#[test]
fn events_for_unknown_blocks_are_ignored() {
    let (mut core, _) = engine();
    let ghost = uuid::Uuid::new_v4();
    assert!(core.block_event(&ghost, BlockEvent::Start).is_empty());
    assert!(core.block_event(&ghost, BlockEvent::Delete).is_empty());
    assert!(core.fault_block(&ghost).is_empty());
}

#[test]
fn details_toggle_click_expands_and_collapses() {
    let (mut core, _) = engine();
    let a = add(&mut core, BlockType::Crm, 0.0, 0.0);
    let toggle = block_layout(pt(0.0, 0.0), false).details_toggle.center();
    click(&mut core, toggle);
    assert!(core.ui.expanded.contains(&a));
    assert!(core.render().blocks[0].details.is_some());
    click(&mut core, toggle);
    assert!(!core.ui.expanded.contains(&a));
    assert!(core.selection().is_empty());
}

#[test]
fn delete_and_duplicate_buttons() {
    let (mut core, _) = engine();
    let a = add(&mut core, BlockType::Crm, 0.0, 0.0);
    let dup = core.block_event(&a, BlockEvent::Duplicate);
    assert!(matches!(dup[0], Action::BlockDuplicated { source, .. } if source == a));
    let del = core.block_event(&a, BlockEvent::Delete);
    assert_eq!(del[0], Action::BlockDeleted { id: a });
    assert_eq!(core.graph.len(), 1);
}

#[test]
fn fault_locks_out_start_until_host_resets() {
    let (mut core, _) = engine();
    let a = add(&mut core, BlockType::Workflows, 0.0, 0.0);
    core.block_event(&a, BlockEvent::Start);
    core.fault_block(&a);
    assert_eq!(status_of(&core, &a), BlockStatus::Error);
    assert!(!core.telemetry.is_running(&a));

    assert!(core.block_event(&a, BlockEvent::Start).is_empty());
    assert!(core.block_event(&a, BlockEvent::Stop).is_empty());

    core.apply_block_update(&a, &json!({ "status": "idle" })).unwrap();
    core.block_event(&a, BlockEvent::Start);
    assert_eq!(status_of(&core, &a), BlockStatus::Active);
}

#[test]
fn create_block_reports_the_new_block() {
    let (mut core, _) = engine();
    let actions = core.create_block(BlockType::AiAgent, pt(40.0, 60.0));
    let Action::BlockCreated(block) = &actions[0] else {
        panic!("expected BlockCreated, got {actions:?}");
    };
    assert_eq!(block.block_type, BlockType::AiAgent);
    assert_eq!(block.position, pt(40.0, 60.0));
    assert_eq!(block.status, BlockStatus::Idle);
    assert!(core.block(&block.id).is_some());
}

// =============================================================
// Telemetry
// =============================================================

#[test]
fn tick_reports_telemetry_for_active_blocks() {
    let (mut core, clock) = engine();
    let a = add(&mut core, BlockType::Workflows, 0.0, 0.0);
    add(&mut core, BlockType::Crm, 400.0, 0.0);
    core.block_event(&a, BlockEvent::Start);

    assert!(core.tick().is_empty());
    clock.advance(1_000);
    let actions = core.tick();
    assert_eq!(updated_ids(&actions), vec![a]);
    assert!(actions.contains(&Action::RenderNeeded));
    let progress = core.block(&a).unwrap().data.progress.unwrap();
    assert!((0.0..2.0).contains(&progress));
}

#[test]
fn stopped_block_gets_no_more_updates() {
    let (mut core, clock) = engine();
    let a = add(&mut core, BlockType::Workflows, 0.0, 0.0);
    core.block_event(&a, BlockEvent::Start);
    clock.advance(1_000);
    core.tick();

    core.block_event(&a, BlockEvent::Stop);
    let frozen = core.block(&a).unwrap().data.clone();
    clock.advance(10_000);
    assert!(updated_ids(&core.tick()).is_empty());
    assert_eq!(core.block(&a).unwrap().data, frozen);
}

#[test]
fn deleted_block_timers_are_cancelled() {
    let (mut core, clock) = engine();
    let a = add(&mut core, BlockType::Workflows, 0.0, 0.0);
    core.block_event(&a, BlockEvent::Start);
    core.block_event(&a, BlockEvent::Delete);
    assert_eq!(core.telemetry.active_timers(), 0);
    clock.advance(5_000);
    assert!(core.tick().is_empty());
}

#[test]
fn teardown_cancels_every_timer_and_gesture() {
    let (mut core, _) = engine();
    let (a, b) = two_blocks(&mut core);
    core.block_event(&a, BlockEvent::Start);
    core.block_event(&b, BlockEvent::Start);
    down(&mut core, pt(300.0, 100.0));
    assert_eq!(core.telemetry.active_timers(), 2);

    core.teardown();

    assert_eq!(core.telemetry.active_timers(), 0);
    assert_eq!(core.input, InputState::Idle);
    assert_eq!(core.ui.pending_connection, None);
}

#[test]
fn seeded_engines_produce_identical_telemetry() {
    let run = || {
        let (mut core, clock) = engine();
        let a = add(&mut core, BlockType::Workflows, 0.0, 0.0);
        core.block_event(&a, BlockEvent::Start);
        clock.advance(5_000);
        core.tick();
        core.block(&a).unwrap().data.clone()
    };
    assert_eq!(run(), run());
}

#[test]
fn animated_connections_keep_the_frame_loop_alive() {
    let (mut core, _) = engine();
    let (a, b) = two_blocks(&mut core);
    core.apply_connection_create(Connection { id: uuid::Uuid::new_v4(), source: a, target: b, animated: true });
    assert_eq!(core.tick(), vec![Action::RenderNeeded]);
}

// =============================================================
// Host data
// =============================================================

#[test]
fn snapshot_drops_stale_ui_state() {
    let (mut core, _) = engine();
    let (a, b) = two_blocks(&mut core);
    core.ui.selection.insert(a);
    core.ui.selection.insert(b);
    core.ui.expanded.insert(a);
    let kept = core.block(&b).unwrap().clone();

    core.load_snapshot(vec![kept], Vec::new());

    assert_eq!(core.selection(), &[b]);
    assert!(core.ui.expanded.is_empty());
    assert_eq!(core.graph.len(), 1);
}

#[test]
fn snapshot_starts_telemetry_for_active_blocks() {
    let (mut core, _) = engine();
    let mut block = Block::new(BlockType::Analytics, pt(0.0, 0.0));
    block.status = BlockStatus::Active;
    let id = block.id;
    core.load_snapshot(vec![block], Vec::new());
    assert!(core.telemetry.is_running(&id));
}

#[test]
fn host_delete_forgets_selection_and_hover() {
    let (mut core, _) = engine();
    let (a, _) = two_blocks(&mut core);
    core.ui.selection.insert(a);
    core.ui.hovered = Some(a);
    core.apply_block_delete(&a);
    assert!(core.selection().is_empty());
    assert_eq!(core.ui.hovered, None);
}

#[test]
fn host_update_is_all_or_nothing() {
    let (mut core, _) = engine();
    let a = add(&mut core, BlockType::Crm, 0.0, 0.0);
    let err = core.apply_block_update(&a, &json!({ "status": "active", "bogus": 1 })).unwrap_err();
    assert_eq!(err.error_code(), "E_VALIDATION");
    assert_eq!(status_of(&core, &a), BlockStatus::Idle);

    let ghost = uuid::Uuid::new_v4();
    let err = core.apply_block_update(&ghost, &json!({ "status": "idle" })).unwrap_err();
    assert_eq!(err, GraphError::InvalidReference(ghost));
}

#[test]
fn host_connection_broadcasts() {
    let (mut core, _) = engine();
    let (a, b) = two_blocks(&mut core);
    let conn = Connection { id: uuid::Uuid::new_v4(), source: a, target: b, animated: false };
    core.apply_connection_create(conn.clone());
    assert_eq!(core.render().connections.len(), 1);
    core.apply_connection_delete(&conn.id);
    assert_eq!(core.graph.connection_count(), 0);
}

// =============================================================
// Dispatch and view controls
// =============================================================

#[test]
fn replayed_events_match_direct_calls() {
    let events: Vec<InputEvent> = serde_json::from_value(json!([
        { "kind": "createBlock", "blockType": "dashboard", "position": { "x": 0.0, "y": 0.0 } },
        { "kind": "wheel", "screen": { "x": 100.0, "y": 100.0 }, "delta": { "dx": 0.0, "dy": -1.0 } },
        { "kind": "pointerDown", "screen": { "x": 10.0, "y": 10.0 }, "button": "middle" },
        { "kind": "pointerMove", "screen": { "x": 30.0, "y": 40.0 } },
        { "kind": "pointerUp", "screen": { "x": 30.0, "y": 40.0 }, "button": "middle" },
        { "kind": "zoomIn" },
    ]))
    .unwrap();

    let (mut replayed, _) = engine();
    for event in events {
        replayed.dispatch(event);
    }

    let (mut direct, _) = engine();
    direct.create_block(BlockType::Dashboard, pt(0.0, 0.0));
    direct.on_wheel(pt(100.0, 100.0), WheelDelta { dx: 0.0, dy: -1.0 }, no_modifiers());
    direct.on_pointer_down(pt(10.0, 10.0), Button::Middle, no_modifiers());
    direct.on_pointer_move(pt(30.0, 40.0), no_modifiers());
    direct.on_pointer_up(pt(30.0, 40.0), Button::Middle, no_modifiers());
    direct.zoom_in();

    assert_eq!(replayed.camera(), direct.camera());
    assert_eq!(replayed.graph.len(), 1);
}

#[test]
fn zoom_then_pan_is_not_pan_then_zoom() {
    let (mut a, _) = engine();
    a.dispatch(InputEvent::Wheel { screen: pt(0.0, 0.0), delta: WheelDelta { dx: 0.0, dy: -1.0 }, modifiers: no_modifiers() });
    a.dispatch(InputEvent::ZoomIn);

    let (mut b, _) = engine();
    b.dispatch(InputEvent::ZoomIn);
    b.dispatch(InputEvent::Wheel { screen: pt(0.0, 0.0), delta: WheelDelta { dx: 0.0, dy: -1.0 }, modifiers: no_modifiers() });

    // Both orders end at the same zoom; anchored at the origin, pan stays put.
    assert!((a.camera.zoom() - b.camera.zoom()).abs() < 1e-9);
    assert_eq!(a.camera.pan(), b.camera.pan());
}

#[test]
fn view_controls_through_dispatch() {
    let (mut core, _) = engine();
    add(&mut core, BlockType::Crm, 0.0, 0.0);

    core.dispatch(InputEvent::ZoomIn);
    assert_eq!(core.camera.zoom_percent(), 110);
    core.dispatch(InputEvent::ZoomOut);
    core.dispatch(InputEvent::ZoomOut);
    assert_eq!(core.camera.zoom_percent(), 90);

    core.dispatch(InputEvent::ToggleViewMode);
    assert_eq!(core.camera.mode(), ViewMode::ThreeD);
    core.dispatch(InputEvent::AdjustDepth { delta: 900.0 });
    assert_eq!(core.camera.depth(), 500.0);
    core.dispatch(InputEvent::AdjustPerspective { delta: -5_000.0 });
    assert_eq!(core.camera.perspective(), 100.0);
    core.dispatch(InputEvent::AdjustRotation { axis: Axis::Z, delta: -45.0 });
    assert_eq!(core.camera.rotation().z, 315.0);

    core.dispatch(InputEvent::ResetView);
    assert_eq!(core.camera.zoom(), 1.0);
    assert_eq!(core.camera.depth(), 0.0);

    core.dispatch(InputEvent::ToggleGrid);
    core.dispatch(InputEvent::ToggleMinimap);
    core.dispatch(InputEvent::SetLayer { layer: Layer::Overlay });
    let scene = core.render();
    assert!(scene.grid.is_none());
    assert!(scene.minimap.is_none());
    assert_eq!(scene.layer, Layer::Overlay);
}

#[test]
fn fit_to_content_through_dispatch() {
    let (mut core, _) = engine();
    add(&mut core, BlockType::Crm, 0.0, 0.0);
    add(&mut core, BlockType::Crm, 600.0, 0.0);
    core.dispatch(InputEvent::FitToContent);
    // 900 wide into 800 at 80%.
    assert!((core.camera.zoom() - 800.0 / 900.0 * 0.8).abs() < 1e-9);
}

#[test]
fn resize_event_updates_viewport() {
    let (mut core, _) = engine();
    core.dispatch(InputEvent::Resize { width: 1280.0, height: 720.0 });
    assert_eq!(core.render().viewport.width, 1280.0);
}

#[test]
fn clicks_hit_blocks_in_3d() {
    let (mut core, _) = engine();
    let a = add(&mut core, BlockType::Crm, 200.0, 150.0);
    core.toggle_view_mode();
    core.adjust_depth(120.0);
    core.adjust_rotation(Axis::X, 20.0);

    let screen = core.camera.world_to_screen(pt(350.0, 250.0)).unwrap();
    click(&mut core, screen);
    assert_eq!(core.selection(), &[a]);
}

#[test]
fn scene_reports_counts() {
    let (mut core, _) = engine();
    let (a, b) = two_blocks(&mut core);
    core.graph.add_connection(&a, &b).unwrap();
    core.ui.selection.insert(b);
    let scene = core.render();
    assert_eq!(scene.status_bar.blocks, 2);
    assert_eq!(scene.status_bar.connections, 1);
    assert_eq!(scene.selection_bar.map(|s| s.count), Some(1));
}

// =============================================================
// Outbound wire format
// =============================================================

#[test]
fn actions_serialize_with_kind_tags() {
    let id = uuid::Uuid::new_v4();
    assert_eq!(
        serde_json::to_value(Action::SetCursor("grab".into())).unwrap(),
        json!({ "kind": "setCursor", "data": "grab" })
    );
    assert_eq!(
        serde_json::to_value(Action::BlockDeleted { id }).unwrap(),
        json!({ "kind": "blockDeleted", "data": { "id": id } })
    );
    assert_eq!(serde_json::to_value(Action::RenderNeeded).unwrap(), json!({ "kind": "renderNeeded" }));
}

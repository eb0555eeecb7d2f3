#![allow(clippy::float_cmp)]

use super::*;
use crate::consts::HISTORY_DEPTH;
use crate::doc::DataType;

const FRAME_MS: f64 = 1000.0 / 60.0;

fn engine() -> EngineCore {
    EngineCore::new(CanvasConfig::default())
}

fn no_mods() -> Modifiers {
    Modifiers::default()
}

fn key(name: &str) -> Key {
    Key(name.to_owned())
}

fn command() -> Modifiers {
    Modifiers { ctrl: true, ..Default::default() }
}

/// Drive the frame loop until the camera settles.
fn settle(engine: &mut EngineCore, start_ms: f64) -> f64 {
    let mut now = start_ms;
    for _ in 0..1000 {
        let actions = engine.on_frame(now);
        now += FRAME_MS;
        if actions.is_empty() {
            return now;
        }
    }
    panic!("camera did not settle");
}

fn output_of(engine: &EngineCore, id: NodeId) -> ConnectionPoint {
    connection_points(engine.doc.node(&id).unwrap())
        .into_iter()
        .find(|p| p.role.is_output())
        .unwrap()
}

fn input_of(engine: &EngineCore, id: NodeId) -> ConnectionPoint {
    connection_points(engine.doc.node(&id).unwrap())
        .into_iter()
        .find(|p| !p.role.is_output())
        .unwrap()
}

// --- Node creation ---

#[test]
fn add_node_snaps_to_grid() {
    let mut engine = engine();
    let (id, actions) = engine.add_node(NodeKind::Action, Point::new(47.0, 33.0), 0.0);
    assert!(matches!(actions[0], Action::NodeCreated(_)));

    let node = engine.doc.node(&id).unwrap();
    assert_eq!(node.x, 40.0);
    assert_eq!(node.y, 40.0);
}

#[test]
fn add_node_unsnapped_when_disabled() {
    let mut engine = engine();
    engine.config.snap_to_grid = false;
    let (id, _) = engine.add_node(NodeKind::Action, Point::new(47.0, 33.0), 0.0);
    let node = engine.doc.node(&id).unwrap();
    assert_eq!(node.x, 47.0);
    assert_eq!(node.y, 33.0);
}

#[test]
fn digit_key_quick_creates_kind() {
    let mut engine = engine();
    let actions = engine.on_key_down(&key("4"), no_mods(), 0.0);
    assert!(matches!(actions[0], Action::NodeCreated(_)));
    let node = engine.doc.nodes().next().unwrap();
    assert_eq!(node.kind, NodeKind::Decision);
}

#[test]
fn node_create_tool_places_on_click() {
    let mut engine = engine();
    engine.set_tool(Tool::NodeCreate);
    let actions = engine.on_pointer_down(Point::new(200.0, 100.0), Button::Primary, no_mods(), 0.0);
    assert!(matches!(actions[0], Action::NodeCreated(_)));
    assert_eq!(engine.doc.node_count(), 1);
}

// --- Drag-drop payloads ---

#[test]
fn drop_payload_creates_snapped_node() {
    let mut engine = engine();
    let payload = r#"{"type": "node-create", "nodeType": "email"}"#;
    let actions = engine.on_drop(payload, Point::new(40.0, 40.0), 0.0);
    assert!(matches!(actions[0], Action::NodeCreated(_)));

    let node = engine.doc.nodes().next().unwrap();
    assert_eq!(node.kind, NodeKind::Email);
    // Grid size 20, snap on, identity viewport: lands exactly on (40, 40).
    assert_eq!(node.x, 40.0);
    assert_eq!(node.y, 40.0);
}

#[test]
fn drop_respects_viewport_transform() {
    let mut engine = engine();
    engine.set_viewport(ViewportPatch { x: Some(100.0), zoom: Some(2.0), ..Default::default() });
    let payload = r#"{"type": "node-create", "nodeType": "action"}"#;
    engine.on_drop(payload, Point::new(140.0, 80.0), 0.0);

    let node = engine.doc.nodes().next().unwrap();
    // screen (140, 80) -> world ((140-100)/2, 80/2) = (20, 40).
    assert_eq!(node.x, 20.0);
    assert_eq!(node.y, 40.0);
}

#[test]
fn malformed_drop_is_rejected_whole() {
    let mut engine = engine();
    for payload in [
        "not json",
        r#"{"type": "something-else", "nodeType": "action"}"#,
        r#"{"type": "node-create"}"#,
        r#"{"type": "node-create", "nodeType": "robot"}"#,
    ] {
        let actions = engine.on_drop(payload, Point::new(0.0, 0.0), 0.0);
        assert!(actions.is_empty(), "payload should be rejected: {payload}");
    }
    assert_eq!(engine.doc.node_count(), 0);
    assert!(!engine.can_undo());
}

// --- Connections ---

#[test]
fn straight_connection_has_two_port_waypoints() {
    let mut engine = engine();
    let (a, _) = engine.add_node(NodeKind::Start, Point::new(0.0, 0.0), 0.0);
    let (b, _) = engine.add_node(NodeKind::End, Point::new(400.0, 0.0), 1.0);

    let source = output_of(&engine, a);
    let target = input_of(&engine, b);
    let (cid, _) = engine.connect(source, target, 2.0).unwrap();

    let conn = engine.doc.connection(&cid).unwrap();
    assert!(conn.waypoints.is_empty());
    let path = crate::route::compute_path(
        conn.source.pos,
        conn.target.pos,
        &conn.waypoints,
        conn.style.curve,
        &[],
    );
    assert_eq!(path.len(), 2);
    assert_eq!(path[0], source.pos);
    assert_eq!(path[1], target.pos);
}

#[test]
fn incompatible_connection_is_refused() {
    let mut engine = engine();
    // AI Model outputs Text; Database accepts Object.
    let (a, _) = engine.add_node(NodeKind::AiModel, Point::new(0.0, 0.0), 0.0);
    let (b, _) = engine.add_node(NodeKind::Database, Point::new(400.0, 0.0), 1.0);

    let source = output_of(&engine, a);
    let target = input_of(&engine, b);
    let err = engine.connect(source, target, 2.0).unwrap_err();
    assert!(matches!(err, CanvasError::Incompatible(_)));
    assert_eq!(engine.doc.connection_count(), 0);
}

#[test]
fn connect_gesture_end_to_end() {
    let mut engine = engine();
    let (a, _) = engine.add_node(NodeKind::Start, Point::new(0.0, 0.0), 0.0);
    let (b, _) = engine.add_node(NodeKind::End, Point::new(400.0, 0.0), 1.0);
    engine.set_tool(Tool::ConnectionCreate);

    let source_pos = output_of(&engine, a).pos;
    let target_pos = input_of(&engine, b).pos;

    engine.on_pointer_down(source_pos, Button::Primary, no_mods(), 10.0);
    let draft = engine.connection_draft().unwrap();
    assert_eq!(draft.source.node_id, a);
    assert_eq!(draft.valid_targets.len(), 1);

    engine.on_pointer_move(Point::new(250.0, 40.0), no_mods(), 20.0);
    let actions = engine.on_pointer_up(target_pos, Button::Primary, no_mods(), 30.0);

    assert!(actions.iter().any(|a| matches!(a, Action::ConnectionCreated(_))));
    assert_eq!(engine.doc.connection_count(), 1);
    assert!(engine.connection_draft().is_none());
}

#[test]
fn connect_gesture_released_on_empty_canvas_is_cancelled() {
    let mut engine = engine();
    let (a, _) = engine.add_node(NodeKind::Start, Point::new(0.0, 0.0), 0.0);
    engine.add_node(NodeKind::End, Point::new(400.0, 0.0), 1.0);
    engine.set_tool(Tool::ConnectionCreate);

    let source_pos = output_of(&engine, a).pos;
    engine.on_pointer_down(source_pos, Button::Primary, no_mods(), 10.0);
    engine.on_pointer_up(Point::new(700.0, 500.0), Button::Primary, no_mods(), 20.0);
    assert_eq!(engine.doc.connection_count(), 0);
}

#[test]
fn connect_gesture_must_start_on_an_output() {
    let mut engine = engine();
    let (b, _) = engine.add_node(NodeKind::End, Point::new(400.0, 0.0), 0.0);
    engine.set_tool(Tool::ConnectionCreate);

    // End only has an input port; the gesture never starts.
    let input_pos = input_of(&engine, b).pos;
    engine.on_pointer_down(input_pos, Button::Primary, no_mods(), 10.0);
    assert!(engine.connection_draft().is_none());
}

// --- Deletion ---

#[test]
fn deleting_node_prunes_its_connections() {
    let mut engine = engine();
    let (a, _) = engine.add_node(NodeKind::Start, Point::new(0.0, 0.0), 0.0);
    let (b, _) = engine.add_node(NodeKind::Action, Point::new(400.0, 0.0), 1.0);
    let (c, _) = engine.add_node(NodeKind::End, Point::new(800.0, 0.0), 2.0);
    engine.connect(output_of(&engine, a), input_of(&engine, b), 3.0).unwrap();
    engine.connect(output_of(&engine, b), input_of(&engine, c), 4.0).unwrap();

    engine.selection.select_node(b);
    let actions = engine.on_key_down(&key("Delete"), no_mods(), 5.0);

    assert_eq!(engine.doc.node_count(), 2);
    assert_eq!(engine.doc.connection_count(), 0);
    assert!(actions.iter().any(|a| matches!(a, Action::NodeDeleted { .. })));
    assert_eq!(
        actions
            .iter()
            .filter(|a| matches!(a, Action::ConnectionDeleted { .. }))
            .count(),
        2
    );
    assert!(engine.selection.is_empty());
}

#[test]
fn delete_with_empty_selection_is_noop() {
    let mut engine = engine();
    engine.add_node(NodeKind::Action, Point::new(0.0, 0.0), 0.0);
    let depth = engine.undo_depth();
    let actions = engine.on_key_down(&key("Delete"), no_mods(), 1.0);
    assert!(actions.is_empty());
    assert_eq!(engine.undo_depth(), depth);
}

#[test]
fn backspace_also_deletes() {
    let mut engine = engine();
    let (id, _) = engine.add_node(NodeKind::Action, Point::new(0.0, 0.0), 0.0);
    engine.selection.select_node(id);
    engine.on_key_down(&key("Backspace"), no_mods(), 1.0);
    assert_eq!(engine.doc.node_count(), 0);
}

// --- Duplication / select all ---

#[test]
fn duplicate_offsets_clones_with_fresh_ids() {
    let mut engine = engine();
    let (id, _) = engine.add_node(NodeKind::Email, Point::new(100.0, 100.0), 0.0);
    engine.selection.select_node(id);
    engine.on_key_down(&key("d"), command(), 1.0);

    assert_eq!(engine.doc.node_count(), 2);
    let clone = engine.doc.nodes().find(|n| n.id != id).unwrap();
    assert_eq!(clone.x, 120.0);
    assert_eq!(clone.y, 120.0);
    assert_eq!(clone.kind, NodeKind::Email);
    // The clone is not selected.
    assert!(!engine.selection.contains_node(&clone.id));
}

#[test]
fn select_all_selects_every_node() {
    let mut engine = engine();
    engine.add_node(NodeKind::Start, Point::new(0.0, 0.0), 0.0);
    engine.add_node(NodeKind::End, Point::new(400.0, 0.0), 1.0);
    engine.on_key_down(&key("a"), command(), 2.0);
    assert_eq!(engine.selection.nodes().len(), 2);
}

// --- Undo / redo ---

#[test]
fn undo_reverses_node_creation() {
    let mut engine = engine();
    engine.add_node(NodeKind::Action, Point::new(0.0, 0.0), 0.0);
    assert!(engine.can_undo());

    engine.on_key_down(&key("z"), command(), 1.0);
    assert_eq!(engine.doc.node_count(), 0);
    assert!(engine.can_redo());

    engine.on_key_down(&key("y"), command(), 2.0);
    assert_eq!(engine.doc.node_count(), 1);
}

#[test]
fn undo_depth_caps_and_bottom_state_is_reachable() {
    let mut engine = engine();
    // One more mutation than the history bound.
    for i in 0..=HISTORY_DEPTH {
        #[allow(clippy::cast_precision_loss)]
        let t = i as f64;
        engine.add_node(NodeKind::Action, Point::new(t * 200.0, 0.0), t);
    }
    assert_eq!(engine.doc.node_count(), HISTORY_DEPTH + 1);
    assert_eq!(engine.undo_depth(), HISTORY_DEPTH);

    let mut undos = 0;
    while engine.can_undo() {
        engine.undo(1000.0);
        undos += 1;
    }
    assert_eq!(undos, HISTORY_DEPTH);
    // The oldest snapshot fell off, so the deepest reachable state still
    // holds the first node.
    assert_eq!(engine.doc.node_count(), 1);
}

#[test]
fn new_mutation_clears_redo() {
    let mut engine = engine();
    engine.add_node(NodeKind::Action, Point::new(0.0, 0.0), 0.0);
    engine.undo(1.0);
    assert!(engine.can_redo());

    engine.add_node(NodeKind::Email, Point::new(200.0, 0.0), 2.0);
    assert!(!engine.can_redo());
}

#[test]
fn undo_restores_viewport() {
    let mut engine = engine();
    engine.add_node(NodeKind::Action, Point::new(0.0, 0.0), 0.0);
    engine.set_viewport(ViewportPatch { x: Some(500.0), ..Default::default() });
    engine.add_node(NodeKind::Email, Point::new(200.0, 0.0), 1.0);

    engine.undo(2.0);
    // The snapshot taken before the second add carried the panned viewport.
    assert_eq!(engine.viewport().x, 500.0);

    engine.undo(3.0);
    assert_eq!(engine.viewport().x, 0.0);
}

// --- Selection gestures ---

#[test]
fn click_selects_node() {
    let mut engine = engine();
    let (id, _) = engine.add_node(NodeKind::Action, Point::new(0.0, 0.0), 0.0);
    let actions = engine.on_pointer_down(Point::new(80.0, 40.0), Button::Primary, no_mods(), 1.0);

    assert!(actions.iter().any(|a| matches!(a, Action::NodeClicked { id: n } if *n == id)));
    assert!(engine.selection.contains_node(&id));
}

#[test]
fn shift_click_extends_selection() {
    let mut engine = engine();
    let (a, _) = engine.add_node(NodeKind::Action, Point::new(0.0, 0.0), 0.0);
    let (b, _) = engine.add_node(NodeKind::Email, Point::new(400.0, 0.0), 1.0);

    engine.on_pointer_down(Point::new(80.0, 40.0), Button::Primary, no_mods(), 2.0);
    engine.on_pointer_up(Point::new(80.0, 40.0), Button::Primary, no_mods(), 3.0);

    let shift = Modifiers { shift: true, ..Default::default() };
    engine.on_pointer_down(Point::new(480.0, 40.0), Button::Primary, shift, 4.0);
    engine.on_pointer_up(Point::new(480.0, 40.0), Button::Primary, shift, 5.0);

    assert!(engine.selection.contains_node(&a));
    assert!(engine.selection.contains_node(&b));
}

#[test]
fn click_on_empty_canvas_clears_selection() {
    let mut engine = engine();
    let (id, _) = engine.add_node(NodeKind::Action, Point::new(0.0, 0.0), 0.0);
    engine.selection.select_node(id);

    engine.on_pointer_down(Point::new(900.0, 600.0), Button::Primary, no_mods(), 1.0);
    assert!(engine.selection.is_empty());
}

#[test]
fn double_click_reported() {
    let mut engine = engine();
    engine.add_node(NodeKind::Action, Point::new(0.0, 0.0), 0.0);
    let at = Point::new(80.0, 40.0);

    engine.on_pointer_down(at, Button::Primary, no_mods(), 100.0);
    engine.on_pointer_up(at, Button::Primary, no_mods(), 120.0);
    let actions = engine.on_pointer_down(at, Button::Primary, no_mods(), 250.0);
    assert!(actions.iter().any(|a| matches!(a, Action::NodeDoubleClicked { .. })));
}

#[test]
fn rectangle_select_gathers_intersecting_nodes() {
    let mut engine = engine();
    let (a, _) = engine.add_node(NodeKind::Action, Point::new(0.0, 0.0), 0.0);
    let (b, _) = engine.add_node(NodeKind::Email, Point::new(300.0, 0.0), 1.0);
    engine.add_node(NodeKind::End, Point::new(0.0, 600.0), 2.0);
    engine.set_tool(Tool::RectangleSelect);

    // Drag bottom-right to top-left across the first two nodes.
    engine.on_pointer_down(Point::new(500.0, 100.0), Button::Primary, no_mods(), 3.0);
    engine.on_pointer_move(Point::new(-10.0, -10.0), no_mods(), 4.0);
    engine.on_pointer_up(Point::new(-10.0, -10.0), Button::Primary, no_mods(), 5.0);

    assert!(engine.selection.contains_node(&a));
    assert!(engine.selection.contains_node(&b));
    assert_eq!(engine.selection.nodes().len(), 2);
}

#[test]
fn lasso_select_uses_polygon_containment() {
    let mut engine = engine();
    let (caught, _) = engine.add_node(NodeKind::Action, Point::new(0.0, 0.0), 0.0);
    engine.add_node(NodeKind::Email, Point::new(600.0, 0.0), 1.0);
    engine.set_tool(Tool::LassoSelect);

    engine.on_pointer_down(Point::new(-50.0, -50.0), Button::Primary, no_mods(), 2.0);
    engine.on_pointer_move(Point::new(250.0, -50.0), no_mods(), 3.0);
    engine.on_pointer_move(Point::new(250.0, 250.0), no_mods(), 4.0);
    engine.on_pointer_move(Point::new(-50.0, 250.0), no_mods(), 5.0);
    engine.on_pointer_up(Point::new(-50.0, 250.0), Button::Primary, no_mods(), 6.0);

    assert!(engine.selection.contains_node(&caught));
    assert_eq!(engine.selection.nodes().len(), 1);
}

// --- Node dragging ---

#[test]
fn drag_moves_node_and_records_one_history_entry() {
    let mut engine = engine();
    let (id, _) = engine.add_node(NodeKind::Action, Point::new(0.0, 0.0), 0.0);
    let depth_before = engine.undo_depth();

    engine.on_pointer_down(Point::new(80.0, 40.0), Button::Primary, no_mods(), 1.0);
    engine.on_pointer_move(Point::new(130.0, 40.0), no_mods(), 2.0);
    engine.on_pointer_move(Point::new(180.0, 40.0), no_mods(), 3.0);
    let actions = engine.on_pointer_up(Point::new(180.0, 40.0), Button::Primary, no_mods(), 4.0);

    let node = engine.doc.node(&id).unwrap();
    assert_eq!(node.x, 100.0);
    assert_eq!(engine.undo_depth(), depth_before + 1);
    assert!(actions.iter().any(|a| matches!(a, Action::NodeUpdated { .. })));
}

#[test]
fn drag_commit_snaps_to_grid() {
    let mut engine = engine();
    let (id, _) = engine.add_node(NodeKind::Action, Point::new(0.0, 0.0), 0.0);

    engine.on_pointer_down(Point::new(80.0, 40.0), Button::Primary, no_mods(), 1.0);
    engine.on_pointer_move(Point::new(127.0, 40.0), no_mods(), 2.0);
    engine.on_pointer_up(Point::new(127.0, 40.0), Button::Primary, no_mods(), 3.0);

    // Live delta was 47; the commit snapped to the nearest grid multiple.
    assert_eq!(engine.doc.node(&id).unwrap().x, 40.0);
}

#[test]
fn click_without_movement_records_nothing() {
    let mut engine = engine();
    engine.add_node(NodeKind::Action, Point::new(0.0, 0.0), 0.0);
    let depth_before = engine.undo_depth();

    engine.on_pointer_down(Point::new(80.0, 40.0), Button::Primary, no_mods(), 1.0);
    engine.on_pointer_up(Point::new(80.0, 40.0), Button::Primary, no_mods(), 2.0);
    assert_eq!(engine.undo_depth(), depth_before);
}

#[test]
fn drag_updates_connection_endpoints() {
    let mut engine = engine();
    let (a, _) = engine.add_node(NodeKind::Start, Point::new(0.0, 0.0), 0.0);
    let (b, _) = engine.add_node(NodeKind::End, Point::new(400.0, 0.0), 1.0);
    let (cid, _) = engine
        .connect(output_of(&engine, a), input_of(&engine, b), 2.0)
        .unwrap();

    engine.on_pointer_down(Point::new(80.0, 40.0), Button::Primary, no_mods(), 3.0);
    engine.on_pointer_move(Point::new(180.0, 40.0), no_mods(), 4.0);
    engine.on_pointer_up(Point::new(180.0, 40.0), Button::Primary, no_mods(), 5.0);

    let conn = engine.doc.connection(&cid).unwrap();
    assert_eq!(conn.source.pos.x, 260.0);
}

// --- Pan / zoom ---

#[test]
fn pan_tool_translates_viewport() {
    let mut engine = engine();
    engine.set_tool(Tool::Pan);
    engine.on_pointer_down(Point::new(100.0, 100.0), Button::Primary, no_mods(), 0.0);
    engine.on_pointer_move(Point::new(150.0, 80.0), no_mods(), 16.0);
    engine.on_pointer_up(Point::new(150.0, 80.0), Button::Primary, no_mods(), 32.0);

    assert_eq!(engine.viewport().x, 50.0);
    assert_eq!(engine.viewport().y, -20.0);
}

#[test]
fn fast_empty_canvas_drag_gains_momentum() {
    let mut engine = engine();
    // Select tool on empty canvas: pan with momentum capture.
    engine.on_pointer_down(Point::new(0.0, 0.0), Button::Primary, no_mods(), 0.0);
    engine.on_pointer_move(Point::new(60.0, 0.0), no_mods(), 16.0);
    engine.on_pointer_move(Point::new(120.0, 0.0), no_mods(), 32.0);
    engine.on_pointer_up(Point::new(120.0, 0.0), Button::Primary, no_mods(), 48.0);

    let x_at_release = engine.viewport().x;
    settle(&mut engine, 48.0);
    // The canvas coasted past the release position.
    assert!(engine.viewport().x > x_at_release);
}

#[test]
fn slow_drag_has_no_momentum() {
    let mut engine = engine();
    engine.on_pointer_down(Point::new(0.0, 0.0), Button::Primary, no_mods(), 0.0);
    engine.on_pointer_move(Point::new(2.0, 0.0), no_mods(), 100.0);
    engine.on_pointer_up(Point::new(2.0, 0.0), Button::Primary, no_mods(), 200.0);

    let x_at_release = engine.viewport().x;
    assert!(engine.on_frame(216.0).is_empty());
    assert_eq!(engine.viewport().x, x_at_release);
}

#[test]
fn wheel_zoom_in_clamps_at_max() {
    let mut engine = engine();
    let center = Point::new(640.0, 360.0);
    for _ in 0..100 {
        engine.on_wheel(center, WheelDelta { dx: 0.0, dy: -120.0 }, no_mods());
    }
    settle(&mut engine, 0.0);
    assert_eq!(engine.viewport().zoom, crate::consts::MAX_ZOOM);
}

#[test]
fn wheel_zoom_keeps_cursor_anchored() {
    let mut engine = engine();
    let cursor = Point::new(320.0, 180.0);
    let world_before = engine.viewport().screen_to_world(cursor);

    engine.on_wheel(cursor, WheelDelta { dx: 0.0, dy: -120.0 }, no_mods());
    settle(&mut engine, 0.0);

    let world_after = engine.viewport().screen_to_world(cursor);
    assert!((world_before.x - world_after.x).abs() < 1e-6);
    assert!((world_before.y - world_after.y).abs() < 1e-6);
}

#[test]
fn zero_key_resets_viewport() {
    let mut engine = engine();
    engine.set_viewport(ViewportPatch {
        x: Some(500.0),
        y: Some(-200.0),
        zoom: Some(3.0),
    });
    engine.on_key_down(&key("0"), no_mods(), 0.0);
    settle(&mut engine, 0.0);
    assert_eq!(engine.viewport(), Viewport::default());
}

#[test]
fn zoom_drag_zooms_around_origin_point() {
    let mut engine = engine();
    engine.set_tool(Tool::Zoom);
    engine.on_pointer_down(Point::new(640.0, 360.0), Button::Primary, no_mods(), 0.0);
    // Drag up zooms in.
    engine.on_pointer_move(Point::new(640.0, 340.0), no_mods(), 16.0);
    engine.on_pointer_up(Point::new(640.0, 340.0), Button::Primary, no_mods(), 32.0);
    settle(&mut engine, 32.0);
    assert!(engine.viewport().zoom > 1.0);
}

// --- Tools and keys ---

#[test]
fn shortcut_switches_tool() {
    let mut engine = engine();
    let actions = engine.on_key_down(&key("h"), no_mods(), 0.0);
    assert!(actions.iter().any(|a| matches!(a, Action::ToolChanged(Tool::Pan))));
    assert_eq!(engine.tool(), Tool::Pan);
}

#[test]
fn escape_cancels_draft_and_returns_to_select() {
    let mut engine = engine();
    let (a, _) = engine.add_node(NodeKind::Start, Point::new(0.0, 0.0), 0.0);
    engine.set_tool(Tool::ConnectionCreate);
    let source_pos = output_of(&engine, a).pos;
    engine.on_pointer_down(source_pos, Button::Primary, no_mods(), 1.0);
    assert!(engine.connection_draft().is_some());

    engine.on_key_down(&key("Escape"), no_mods(), 2.0);
    assert!(engine.connection_draft().is_none());
    assert_eq!(engine.tool(), Tool::Select);
}

#[test]
fn grid_and_snap_toggles() {
    let mut engine = engine();
    assert!(engine.config.grid.enabled);
    engine.on_key_down(&key("g"), command(), 0.0);
    assert!(!engine.config.grid.enabled);

    assert!(engine.config.snap_to_grid);
    engine.on_key_down(&key("s"), command(), 1.0);
    assert!(!engine.config.snap_to_grid);
}

#[test]
fn secondary_button_is_ignored() {
    let mut engine = engine();
    engine.add_node(NodeKind::Action, Point::new(0.0, 0.0), 0.0);
    let actions =
        engine.on_pointer_down(Point::new(80.0, 40.0), Button::Secondary, no_mods(), 1.0);
    assert!(actions.is_empty());
    assert!(engine.selection.is_empty());
}

// --- Hover ---

#[test]
fn hover_reports_changes_once() {
    let mut engine = engine();
    engine.add_node(NodeKind::Action, Point::new(0.0, 0.0), 0.0);

    let actions = engine.on_pointer_move(Point::new(80.0, 40.0), no_mods(), 1.0);
    assert!(actions.iter().any(|a| matches!(a, Action::HoverChanged { target: Some(_) })));

    // Still over the same node: no repeat notification.
    let actions = engine.on_pointer_move(Point::new(90.0, 40.0), no_mods(), 2.0);
    assert!(actions.is_empty());

    let actions = engine.on_pointer_move(Point::new(900.0, 600.0), no_mods(), 3.0);
    assert!(actions.iter().any(|a| matches!(a, Action::HoverChanged { target: None })));
}

// --- Frame loop / rendering ---

#[test]
fn render_produces_display_list() {
    let mut engine = engine();
    engine.add_node(NodeKind::Action, Point::new(100.0, 100.0), 0.0);
    engine.on_frame(16.0);
    let list = engine.render(20.0);
    assert!(!list.grid.is_empty());
    assert!(!list.nodes.is_empty());
}

#[test]
fn idle_frame_requests_no_render() {
    let mut engine = engine();
    assert!(engine.on_frame(0.0).is_empty());
    assert!(engine.on_frame(16.0).is_empty());
}

#[test]
fn performance_report_counts_nodes() {
    let mut engine = engine();
    engine.add_node(NodeKind::Action, Point::new(0.0, 0.0), 0.0);
    let report = engine.performance_report(100.0);
    assert!(report["currentMetrics"].is_object());
    assert!(report["recommendations"].is_array());
}

// --- Structured connect API ---

#[test]
fn connect_refuses_unknown_nodes() {
    let mut engine = engine();
    let (a, _) = engine.add_node(NodeKind::Start, Point::new(0.0, 0.0), 0.0);
    let source = output_of(&engine, a);
    let ghost = ConnectionPoint {
        node_id: uuid::Uuid::new_v4(),
        role: crate::doc::PortRole::Input,
        pos: Point::new(500.0, 0.0),
        data_type: DataType::Any,
    };
    assert!(matches!(
        engine.connect(source, ghost, 1.0),
        Err(CanvasError::UnknownNode(_))
    ));
}

#[test]
fn patch_node_refuses_unknown_id() {
    let mut engine = engine();
    let err = engine
        .patch_node(uuid::Uuid::new_v4(), NodePatch::default(), true, 0.0)
        .unwrap_err();
    assert!(matches!(err, CanvasError::UnknownNode(_)));
}

#[test]
fn delete_connection_by_id() {
    let mut engine = engine();
    let (a, _) = engine.add_node(NodeKind::Start, Point::new(0.0, 0.0), 0.0);
    let (b, _) = engine.add_node(NodeKind::End, Point::new(400.0, 0.0), 1.0);
    let (cid, _) = engine
        .connect(output_of(&engine, a), input_of(&engine, b), 2.0)
        .unwrap();

    let actions = engine.delete_connection(cid, 3.0);
    assert!(matches!(actions[0], Action::ConnectionDeleted { .. }));
    assert_eq!(engine.doc.connection_count(), 0);

    // Undo brings it back.
    engine.undo(4.0);
    assert_eq!(engine.doc.connection_count(), 1);
}

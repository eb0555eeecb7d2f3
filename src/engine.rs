//! Top-level engine: per-tool input dispatch, model commands, history
//! integration, and the frame loop.
//!
//! [`EngineCore`] holds every piece of state and is fully host-free: the
//! host feeds it pointer/keyboard/wheel/drag-drop events plus a frame tick,
//! and receives [`Action`] records and a display list back. All mutation is
//! synchronous — an event completes fully before the next frame reads state.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use serde_json::Value;

use crate::camera::{CameraController, MomentumTracker, Viewport, ViewportPatch};
use crate::consts::{DUPLICATE_OFFSET, WHEEL_ZOOM_IN, WHEEL_ZOOM_OUT};
use crate::doc::{
    CanvasConfig, Connection, ConnectionId, ConnectionPoint, DocStore, Node, NodeId, NodeKind,
    NodePatch, PortRole, SelectionState, connection_points,
};
use crate::geom::{Point, Rect};
use crate::hit::{self, HitTarget};
use crate::history::{History, Snapshot};
use crate::input::{
    Button, ConnectionDraft, DoubleClickDetector, Gesture, Key, Modifiers, Tool, WheelDelta,
};
use crate::perf::PerfMonitor;
use crate::route;
use crate::scene::{DrawList, FrameInput, SceneRenderer};

/// Errors surfaced by engine commands.
#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    /// A drag-drop payload was not valid JSON or missed required fields.
    #[error("malformed drag payload: {0}")]
    MalformedPayload(String),
    /// The payload named a node kind the engine does not know.
    #[error("unknown node kind: {0}")]
    UnknownNodeKind(String),
    /// A command referenced a node that does not exist.
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),
    /// A command referenced a port the node does not expose.
    #[error("node {node_id} has no {role:?} port")]
    UnknownPort { node_id: NodeId, role: PortRole },
    /// The two points cannot be connected.
    #[error("incompatible connection: {0:?}")]
    Incompatible(route::Incompatibility),
}

/// Records returned from event handlers for the host to process.
#[derive(Debug, Clone)]
pub enum Action {
    NodeCreated(Node),
    NodeUpdated { id: NodeId, patch: NodePatch },
    NodeDeleted { id: NodeId },
    ConnectionCreated(Connection),
    ConnectionDeleted { id: ConnectionId },
    NodeClicked { id: NodeId },
    NodeDoubleClicked { id: NodeId },
    ConnectionClicked { id: ConnectionId },
    HoverChanged { target: Option<HitTarget> },
    SelectionChanged,
    ToolChanged(Tool),
    SetCursor(String),
    RenderNeeded,
}

/// Core engine state. Everything runs on one logical thread; the host frame
/// callback drives [`EngineCore::on_frame`] at ~60 Hz.
pub struct EngineCore {
    pub doc: DocStore,
    pub camera: CameraController,
    pub config: CanvasConfig,
    pub selection: SelectionState,
    tool: Tool,
    gesture: Gesture,
    clicks: DoubleClickDetector,
    history: History,
    pub perf: PerfMonitor,
    scene: SceneRenderer,
    hover: Option<HitTarget>,
    last_frame_ms: Option<f64>,
}

impl Default for EngineCore {
    fn default() -> Self {
        Self::new(CanvasConfig::default())
    }
}

impl EngineCore {
    #[must_use]
    pub fn new(config: CanvasConfig) -> Self {
        Self {
            doc: DocStore::new(),
            camera: CameraController::new(),
            config,
            selection: SelectionState::default(),
            tool: Tool::default(),
            gesture: Gesture::default(),
            clicks: DoubleClickDetector::default(),
            history: History::new(),
            perf: PerfMonitor::default(),
            scene: SceneRenderer::new(),
            hover: None,
            last_frame_ms: None,
        }
    }

    // --- Queries ---

    #[must_use]
    pub fn tool(&self) -> Tool {
        self.tool
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.camera.viewport()
    }

    /// The in-progress connect gesture, if any.
    #[must_use]
    pub fn connection_draft(&self) -> Option<&ConnectionDraft> {
        match &self.gesture {
            Gesture::CreatingConnection(draft) => Some(draft),
            _ => None,
        }
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Depth of the undo stack (for tests and host UI).
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.history.undo_depth()
    }

    // --- Model commands ---

    /// Create a node of `kind` at a world position, honoring grid snap.
    /// Structural: pushes a history snapshot.
    pub fn add_node(&mut self, kind: NodeKind, world: Point, now_ms: f64) -> (NodeId, Vec<Action>) {
        self.record_history(now_ms);
        let pos = self.snapped(world);
        let node = Node::new(kind, pos.x, pos.y);
        let id = node.id;
        self.doc.insert_node(node.clone());
        (id, vec![Action::NodeCreated(node), Action::RenderNeeded])
    }

    /// Apply a sparse update to a node. Structural when `structural` is set
    /// (committed edits); live drag positions pass `false`.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::UnknownNode`] when the node does not exist.
    pub fn patch_node(
        &mut self,
        id: NodeId,
        patch: NodePatch,
        structural: bool,
        now_ms: f64,
    ) -> Result<Vec<Action>, CanvasError> {
        if self.doc.node(&id).is_none() {
            return Err(CanvasError::UnknownNode(id));
        }
        if structural {
            self.record_history(now_ms);
        }
        self.doc.apply_patch(&id, &patch);
        self.doc.refresh_endpoints(&id);
        Ok(vec![Action::NodeUpdated { id, patch }, Action::RenderNeeded])
    }

    /// Connect two derived points. Structural: pushes a history snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::Incompatible`] when the points fail the
    /// compatibility rule, or [`CanvasError::UnknownNode`] when either node
    /// is gone.
    pub fn connect(
        &mut self,
        source: ConnectionPoint,
        target: ConnectionPoint,
        now_ms: f64,
    ) -> Result<(ConnectionId, Vec<Action>), CanvasError> {
        if self.doc.node(&source.node_id).is_none() {
            return Err(CanvasError::UnknownNode(source.node_id));
        }
        if self.doc.node(&target.node_id).is_none() {
            return Err(CanvasError::UnknownNode(target.node_id));
        }
        route::check_compatible(&source, &target).map_err(CanvasError::Incompatible)?;

        self.record_history(now_ms);
        let connection = Connection::new(source, target);
        let id = connection.id;
        self.doc.insert_connection(connection.clone());
        Ok((id, vec![Action::ConnectionCreated(connection), Action::RenderNeeded]))
    }

    /// Delete a connection by id. Structural.
    pub fn delete_connection(&mut self, id: ConnectionId, now_ms: f64) -> Vec<Action> {
        if self.doc.connection(&id).is_none() {
            return Vec::new();
        }
        self.record_history(now_ms);
        self.doc.remove_connection(&id);
        self.selection.forget_connection(&id);
        vec![Action::ConnectionDeleted { id }, Action::RenderNeeded]
    }

    /// Delete everything selected, pruning connections of deleted nodes.
    /// Structural when anything was deleted.
    pub fn delete_selected(&mut self, now_ms: f64) -> Vec<Action> {
        if self.selection.is_empty() {
            return Vec::new();
        }
        self.record_history(now_ms);

        let mut actions = Vec::new();
        let node_ids: Vec<NodeId> = self.selection.nodes().iter().copied().collect();
        for id in node_ids {
            let (removed, pruned) = self.doc.remove_node(&id);
            if removed.is_some() {
                actions.push(Action::NodeDeleted { id });
            }
            for cid in pruned {
                actions.push(Action::ConnectionDeleted { id: cid });
            }
        }
        let conn_ids: Vec<ConnectionId> = self.selection.connections().iter().copied().collect();
        for id in conn_ids {
            if self.doc.remove_connection(&id).is_some() {
                actions.push(Action::ConnectionDeleted { id });
            }
        }

        self.selection.clear();
        actions.push(Action::SelectionChanged);
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Clone the selected nodes with fresh ids at a fixed offset. The clones
    /// are not selected. Structural when anything was duplicated.
    pub fn duplicate_selected(&mut self, now_ms: f64) -> Vec<Action> {
        let ids: Vec<NodeId> = self.selection.nodes().iter().copied().collect();
        if ids.is_empty() {
            return Vec::new();
        }
        self.record_history(now_ms);

        let mut actions = Vec::new();
        for id in ids {
            let Some(original) = self.doc.node(&id) else {
                continue;
            };
            let mut clone = original.clone();
            clone.id = uuid::Uuid::new_v4();
            clone.x += DUPLICATE_OFFSET;
            clone.y += DUPLICATE_OFFSET;
            self.doc.insert_node(clone.clone());
            actions.push(Action::NodeCreated(clone));
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Select every node.
    pub fn select_all(&mut self) -> Vec<Action> {
        self.selection.clear();
        let ids: Vec<NodeId> = self.doc.nodes().map(|n| n.id).collect();
        for id in ids {
            self.selection.add_node(id);
        }
        vec![Action::SelectionChanged, Action::RenderNeeded]
    }

    /// Switch the active tool. Cancels any in-progress gesture.
    pub fn set_tool(&mut self, tool: Tool) -> Vec<Action> {
        if self.tool == tool {
            return Vec::new();
        }
        self.tool = tool;
        self.gesture = Gesture::Idle;
        log::debug!("tool switched to {tool:?}");
        vec![Action::ToolChanged(tool), Action::RenderNeeded]
    }

    /// Apply a sparse viewport update.
    pub fn set_viewport(&mut self, patch: ViewportPatch) {
        self.camera.apply(patch);
    }

    // --- History ---

    /// Step back one snapshot. No-op when the past stack is empty.
    pub fn undo(&mut self, now_ms: f64) -> Vec<Action> {
        let current = self.current_snapshot(now_ms);
        let Some(snapshot) = self.history.undo(current) else {
            return Vec::new();
        };
        self.restore(snapshot);
        vec![Action::SelectionChanged, Action::RenderNeeded]
    }

    /// Step forward one snapshot. Mirror of [`EngineCore::undo`].
    pub fn redo(&mut self, now_ms: f64) -> Vec<Action> {
        let current = self.current_snapshot(now_ms);
        let Some(snapshot) = self.history.redo(current) else {
            return Vec::new();
        };
        self.restore(snapshot);
        vec![Action::SelectionChanged, Action::RenderNeeded]
    }

    fn current_snapshot(&self, now_ms: f64) -> Snapshot {
        Snapshot::capture(&self.doc, self.camera.viewport(), &self.config, now_ms)
    }

    fn record_history(&mut self, now_ms: f64) {
        let snapshot = self.current_snapshot(now_ms);
        self.history.record(snapshot);
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.doc.load(snapshot.nodes, snapshot.connections);
        self.camera.set(snapshot.viewport);
        self.config = snapshot.config;
        // Selected ids may no longer exist in the restored state.
        self.selection.clear();
    }

    // --- Pointer events ---

    pub fn on_pointer_down(
        &mut self,
        screen: Point,
        button: Button,
        modifiers: Modifiers,
        now_ms: f64,
    ) -> Vec<Action> {
        if button != Button::Primary {
            return Vec::new();
        }
        // A new gesture always cancels in-flight viewport animation.
        self.camera.cancel_animation();
        let world = self.camera.viewport().screen_to_world(screen);

        match self.tool {
            Tool::Pan => {
                self.gesture = Gesture::Panning { last_screen: screen };
                vec![Action::SetCursor("grabbing".to_owned())]
            }
            Tool::Zoom => {
                self.gesture = Gesture::ZoomDragging { origin_screen: screen, last_screen: screen };
                Vec::new()
            }
            Tool::Select => self.pointer_down_select(screen, world, modifiers, now_ms),
            Tool::ConnectionCreate => self.pointer_down_connect(world),
            Tool::NodeCreate => {
                let (_, actions) = self.add_node(NodeKind::Action, world, now_ms);
                actions
            }
            Tool::LassoSelect => {
                self.gesture = Gesture::LassoSelecting { points: vec![world] };
                Vec::new()
            }
            Tool::RectangleSelect => {
                self.gesture = Gesture::RectangleSelecting { anchor_world: world, cursor_world: world };
                Vec::new()
            }
        }
    }

    fn pointer_down_select(
        &mut self,
        screen: Point,
        world: Point,
        modifiers: Modifiers,
        now_ms: f64,
    ) -> Vec<Action> {
        let zoom = self.camera.viewport().zoom;
        let target = hit::hit_test(world, &self.doc, &self.selection, zoom, false);

        match target {
            Some(HitTarget::Node(id) | HitTarget::NodeHandle { id, .. }) => {
                let mut actions = vec![Action::NodeClicked { id }];
                if self.clicks.tap(id, now_ms) {
                    actions.push(Action::NodeDoubleClicked { id });
                }
                if modifiers.shift {
                    self.selection.add_node(id);
                } else if !self.selection.contains_node(&id) {
                    self.selection.select_node(id);
                }
                actions.push(Action::SelectionChanged);

                let pre = Box::new(self.current_snapshot(now_ms));
                let start_positions = self
                    .selection
                    .nodes()
                    .iter()
                    .filter_map(|nid| self.doc.node(nid).map(|n| (*nid, Point::new(n.x, n.y))))
                    .collect();
                self.gesture = Gesture::DraggingNodes { last_world: world, start_positions, pre };
                actions.push(Action::RenderNeeded);
                actions
            }
            Some(HitTarget::Connection(id)) => {
                self.selection.select_connection(id);
                self.gesture = Gesture::Idle;
                vec![
                    Action::ConnectionClicked { id },
                    Action::SelectionChanged,
                    Action::RenderNeeded,
                ]
            }
            Some(HitTarget::Port(_)) | None => {
                // Empty canvas: clear selection, pan with momentum capture.
                let had_selection = !self.selection.is_empty();
                self.selection.clear();
                let mut tracker = MomentumTracker::default();
                tracker.record(screen, now_ms);
                self.gesture = Gesture::PanningWithMomentum { last_screen: screen, tracker };
                if had_selection {
                    vec![Action::SelectionChanged, Action::RenderNeeded]
                } else {
                    Vec::new()
                }
            }
        }
    }

    fn pointer_down_connect(&mut self, world: Point) -> Vec<Action> {
        let zoom = self.camera.viewport().zoom;
        let target = hit::hit_test(world, &self.doc, &self.selection, zoom, true);
        let Some(HitTarget::Port(source)) = target else {
            return Vec::new();
        };
        if !source.role.is_output() {
            return Vec::new();
        }

        // Classify every other node's points once, at gesture start.
        let candidates: Vec<ConnectionPoint> = self
            .doc
            .nodes()
            .filter(|n| n.id != source.node_id)
            .flat_map(connection_points)
            .collect();
        let (valid_targets, invalid_targets) = route::classify_targets(&source, &candidates);

        self.gesture = Gesture::CreatingConnection(ConnectionDraft {
            source,
            cursor: world,
            preview: route::preview_path(source.pos, world),
            valid_targets,
            invalid_targets,
        });
        vec![Action::RenderNeeded]
    }

    pub fn on_pointer_move(&mut self, screen: Point, _modifiers: Modifiers, now_ms: f64) -> Vec<Action> {
        let world = self.camera.viewport().screen_to_world(screen);

        match &mut self.gesture {
            Gesture::Idle => self.track_hover(world),
            Gesture::Panning { last_screen } => {
                let (dx, dy) = (screen.x - last_screen.x, screen.y - last_screen.y);
                *last_screen = screen;
                self.camera.pan(dx, dy);
                vec![Action::RenderNeeded]
            }
            Gesture::PanningWithMomentum { last_screen, tracker } => {
                let (dx, dy) = (screen.x - last_screen.x, screen.y - last_screen.y);
                *last_screen = screen;
                tracker.record(screen, now_ms);
                self.camera.pan(dx, dy);
                vec![Action::RenderNeeded]
            }
            Gesture::ZoomDragging { origin_screen, last_screen } => {
                let dy = screen.y - last_screen.y;
                let origin = *origin_screen;
                *last_screen = screen;
                // Drag up zooms in, drag down zooms out, 1% per pixel.
                let factor = (1.0 - dy * 0.01).max(0.01);
                self.camera.zoom_at(origin, factor);
                vec![Action::RenderNeeded]
            }
            Gesture::DraggingNodes { last_world, .. } => {
                let (dx, dy) = (world.x - last_world.x, world.y - last_world.y);
                *last_world = world;
                let moved: Vec<NodeId> = self.selection.nodes().iter().copied().collect();
                for id in &moved {
                    if let Some(node) = self.doc.node_mut(id) {
                        node.x += dx;
                        node.y += dy;
                    }
                }
                for id in &moved {
                    self.doc.refresh_endpoints(id);
                }
                vec![Action::RenderNeeded]
            }
            Gesture::CreatingConnection(draft) => {
                draft.cursor = world;
                draft.preview = route::preview_path(draft.source.pos, world);
                vec![Action::RenderNeeded]
            }
            Gesture::RectangleSelecting { cursor_world, .. } => {
                *cursor_world = world;
                vec![Action::RenderNeeded]
            }
            Gesture::LassoSelecting { points } => {
                points.push(world);
                vec![Action::RenderNeeded]
            }
        }
    }

    fn track_hover(&mut self, world: Point) -> Vec<Action> {
        let zoom = self.camera.viewport().zoom;
        let ports = self.tool == Tool::ConnectionCreate;
        let target = hit::hit_test(world, &self.doc, &self.selection, zoom, ports);
        if target == self.hover {
            return Vec::new();
        }
        self.hover = target;
        let cursor = match self.hover {
            Some(HitTarget::Node(_) | HitTarget::NodeHandle { .. }) => "move",
            Some(HitTarget::Port(_)) => "crosshair",
            Some(HitTarget::Connection(_)) => "pointer",
            None => "default",
        };
        vec![
            Action::HoverChanged { target: self.hover },
            Action::SetCursor(cursor.to_owned()),
        ]
    }

    pub fn on_pointer_up(
        &mut self,
        screen: Point,
        button: Button,
        _modifiers: Modifiers,
        now_ms: f64,
    ) -> Vec<Action> {
        if button != Button::Primary {
            return Vec::new();
        }
        let world = self.camera.viewport().screen_to_world(screen);

        match std::mem::take(&mut self.gesture) {
            Gesture::Idle | Gesture::Panning { .. } | Gesture::ZoomDragging { .. } => Vec::new(),
            Gesture::PanningWithMomentum { tracker, .. } => {
                if let Some(velocity) = tracker.release() {
                    self.camera.start_momentum(velocity);
                }
                Vec::new()
            }
            Gesture::DraggingNodes { start_positions, pre, .. } => {
                self.commit_node_drag(&start_positions, *pre, now_ms)
            }
            Gesture::CreatingConnection(draft) => self.commit_connection(&draft, world, now_ms),
            Gesture::RectangleSelecting { anchor_world, cursor_world } => {
                let rect = normalized_rect(anchor_world, cursor_world);
                self.apply_region_selection(hit::nodes_in_rect(&self.doc, &rect))
            }
            Gesture::LassoSelecting { points } => {
                self.apply_region_selection(hit::nodes_in_lasso(&self.doc, &points))
            }
        }
    }

    /// Commit a node drag: snap final positions, refresh connection
    /// endpoints, and push the pre-drag snapshot — one history entry per
    /// drag, not per pointer move.
    fn commit_node_drag(
        &mut self,
        start_positions: &std::collections::HashMap<NodeId, Point>,
        pre: Snapshot,
        _now_ms: f64,
    ) -> Vec<Action> {
        let mut moved = false;
        let mut actions = Vec::new();

        for (id, start) in start_positions {
            let Some(node) = self.doc.node(id) else {
                continue;
            };
            if (node.x - start.x).abs() < f64::EPSILON && (node.y - start.y).abs() < f64::EPSILON {
                continue;
            }
            moved = true;
            let snapped = self.snapped(Point::new(node.x, node.y));
            let patch = NodePatch { x: Some(snapped.x), y: Some(snapped.y), ..Default::default() };
            self.doc.apply_patch(id, &patch);
            self.doc.refresh_endpoints(id);
            actions.push(Action::NodeUpdated { id: *id, patch });
        }

        if !moved {
            return Vec::new();
        }
        self.history.record(pre);
        actions.push(Action::RenderNeeded);
        actions
    }

    fn commit_connection(&mut self, draft: &ConnectionDraft, world: Point, now_ms: f64) -> Vec<Action> {
        let zoom = self.camera.viewport().zoom;
        let target = hit::hit_test(world, &self.doc, &self.selection, zoom, true);
        let Some(HitTarget::Port(point)) = target else {
            return vec![Action::RenderNeeded];
        };
        if !draft.is_valid_target(&point.port_ref()) {
            // Incompatible target: the gesture simply ends; the preview
            // already highlighted it as invalid.
            return vec![Action::RenderNeeded];
        }
        match self.connect(draft.source, point, now_ms) {
            Ok((_, actions)) => actions,
            Err(err) => {
                log::warn!("connection rejected at commit: {err}");
                vec![Action::RenderNeeded]
            }
        }
    }

    fn apply_region_selection(&mut self, ids: Vec<NodeId>) -> Vec<Action> {
        self.selection.clear();
        for id in ids {
            self.selection.add_node(id);
        }
        vec![Action::SelectionChanged, Action::RenderNeeded]
    }

    // --- Wheel / keyboard ---

    pub fn on_wheel(&mut self, screen: Point, delta: WheelDelta, _modifiers: Modifiers) -> Vec<Action> {
        let factor = if delta.dy < 0.0 { WHEEL_ZOOM_IN } else { WHEEL_ZOOM_OUT };
        self.camera.zoom_at(screen, factor);
        vec![Action::RenderNeeded]
    }

    pub fn on_key_down(&mut self, key: &Key, modifiers: Modifiers, now_ms: f64) -> Vec<Action> {
        let name = key.0.as_str();

        if name == "Escape" {
            return self.cancel_gesture();
        }

        if modifiers.command() {
            return match name {
                "z" | "Z" => self.undo(now_ms),
                "y" | "Y" => self.redo(now_ms),
                "a" | "A" => self.select_all(),
                "d" | "D" => self.duplicate_selected(now_ms),
                "g" | "G" => {
                    self.config.grid.enabled = !self.config.grid.enabled;
                    vec![Action::RenderNeeded]
                }
                "s" | "S" => {
                    self.config.snap_to_grid = !self.config.snap_to_grid;
                    Vec::new()
                }
                _ => Vec::new(),
            };
        }

        match name {
            "Delete" | "Backspace" => self.delete_selected(now_ms),
            "0" => {
                self.camera.animate_to(Viewport::default());
                vec![Action::RenderNeeded]
            }
            "+" | "=" => self.zoom_center(WHEEL_ZOOM_IN),
            "-" => self.zoom_center(WHEEL_ZOOM_OUT),
            d @ ("1" | "2" | "3" | "4" | "5" | "6" | "7" | "8") => {
                // Digit quick-create: a node of the indexed kind at the
                // viewport center, honoring grid snap.
                let idx = usize::from(d.as_bytes()[0] - b'1');
                let center = self.view_center_world();
                let (_, actions) = self.add_node(NodeKind::ALL[idx], center, now_ms);
                actions
            }
            _ => Tool::from_shortcut(name).map_or_else(Vec::new, |tool| self.set_tool(tool)),
        }
    }

    /// Escape: cancel whatever is in flight and return to the select tool.
    fn cancel_gesture(&mut self) -> Vec<Action> {
        self.gesture = Gesture::Idle;
        self.camera.cancel_animation();
        let mut actions = vec![Action::RenderNeeded];
        if self.tool != Tool::Select {
            actions.extend(self.set_tool(Tool::Select));
        }
        actions
    }

    fn zoom_center(&mut self, factor: f64) -> Vec<Action> {
        let center = Point::new(self.config.width * 0.5, self.config.height * 0.5);
        self.camera.zoom_at(center, factor);
        vec![Action::RenderNeeded]
    }

    fn view_center_world(&self) -> Point {
        let center = Point::new(self.config.width * 0.5, self.config.height * 0.5);
        self.camera.viewport().screen_to_world(center)
    }

    // --- Drag and drop ---

    /// Handle an external palette drop. The payload must be JSON of the form
    /// `{"type": "node-create", "nodeType": "action"}`. Malformed payloads
    /// are logged and aborted — no partial node creation.
    pub fn on_drop(&mut self, payload: &str, screen: Point, now_ms: f64) -> Vec<Action> {
        match self.parse_drop(payload) {
            Ok(kind) => {
                let world = self.camera.viewport().screen_to_world(screen);
                let (_, actions) = self.add_node(kind, world, now_ms);
                actions
            }
            Err(err) => {
                log::warn!("drag-drop payload rejected: {err}");
                Vec::new()
            }
        }
    }

    fn parse_drop(&self, payload: &str) -> Result<NodeKind, CanvasError> {
        let value: Value = serde_json::from_str(payload)
            .map_err(|e| CanvasError::MalformedPayload(e.to_string()))?;
        let kind_tag = value.get("type").and_then(Value::as_str);
        if kind_tag != Some("node-create") {
            return Err(CanvasError::MalformedPayload(format!(
                "unexpected payload type {kind_tag:?}"
            )));
        }
        let node_type = value
            .get("nodeType")
            .and_then(Value::as_str)
            .ok_or_else(|| CanvasError::MalformedPayload("missing nodeType".to_owned()))?;
        NodeKind::parse(node_type)
            .ok_or_else(|| CanvasError::UnknownNodeKind(node_type.to_owned()))
    }

    // --- Frame loop ---

    /// Advance one frame: camera animation/momentum and perf sampling.
    /// Returns `RenderNeeded` when the viewport moved.
    pub fn on_frame(&mut self, now_ms: f64) -> Vec<Action> {
        self.perf.begin_frame(now_ms);
        let dt = self
            .last_frame_ms
            .map_or(1000.0 / 60.0, |last| (now_ms - last).max(0.0));
        self.last_frame_ms = Some(now_ms);

        if self.camera.tick(dt) {
            vec![Action::RenderNeeded]
        } else {
            Vec::new()
        }
    }

    /// Produce the display list for the current state and close the frame's
    /// perf sample.
    pub fn render(&mut self, now_ms: f64) -> DrawList {
        let perf_line = self.config.show_perf_overlay.then(|| {
            format!("{} fps / {:.1} ms", self.perf.fps(), self.perf.last_frame_ms())
        });
        let draft = match &self.gesture {
            Gesture::CreatingConnection(d) => Some(d),
            _ => None,
        };
        let frame = FrameInput {
            doc: &self.doc,
            viewport: self.camera.viewport(),
            selection: &self.selection,
            config: &self.config,
            connect_tool: self.tool == Tool::ConnectionCreate,
            draft,
            quality: self.perf.quality(),
            perf_line,
        };
        let list = self.scene.render(&frame);
        self.perf.end_frame(now_ms);
        list
    }

    /// JSON performance report for the host.
    #[must_use]
    pub fn performance_report(&self, now_ms: f64) -> Value {
        self.perf
            .export_report(now_ms, self.doc.node_count(), true)
    }

    // --- Helpers ---

    /// Snap a world point to the grid when snapping is enabled.
    #[must_use]
    pub fn snapped(&self, world: Point) -> Point {
        if !self.config.snap_to_grid || self.config.grid.size <= 0.0 {
            return world;
        }
        let g = self.config.grid.size;
        Point::new((world.x / g).round() * g, (world.y / g).round() * g)
    }
}

/// Rectangle spanning two corner points regardless of drag direction.
fn normalized_rect(a: Point, b: Point) -> Rect {
    Rect::new(a.x.min(b.x), a.y.min(b.y), (a.x - b.x).abs(), (a.y - b.y).abs())
}

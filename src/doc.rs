//! Logical model: nodes, connections, derived connection points, selection,
//! and the in-memory store that owns them.
//!
//! Data flows into this layer from the interaction dispatcher (mutations) and
//! out to the scene renderer (`sorted_nodes`, `connections`) and the history
//! manager (whole-store snapshots). Connection points are derived per node
//! per frame from node geometry and kind — they are never persisted.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geom::{Point, Rect};

/// Unique identifier for a node.
pub type NodeId = Uuid;

/// Unique identifier for a connection.
pub type ConnectionId = Uuid;

/// The kind of a workflow node. Closed set: adding a kind forces every
/// `match` over shape, ports, and styling to be revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Start,
    End,
    Action,
    Decision,
    ApiCall,
    Email,
    Database,
    AiModel,
}

impl NodeKind {
    /// All kinds, in quick-create order (keyboard digits 1–8).
    pub const ALL: [Self; 8] = [
        Self::Start,
        Self::End,
        Self::Action,
        Self::Decision,
        Self::ApiCall,
        Self::Email,
        Self::Database,
        Self::AiModel,
    ];

    /// Parse the wire name used by drag-drop payloads (e.g. `"api-call"`).
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "start" => Some(Self::Start),
            "end" => Some(Self::End),
            "action" => Some(Self::Action),
            "decision" => Some(Self::Decision),
            "api-call" => Some(Self::ApiCall),
            "email" => Some(Self::Email),
            "database" => Some(Self::Database),
            "ai-model" => Some(Self::AiModel),
            _ => None,
        }
    }

    /// The shape used to draw nodes of this kind.
    #[must_use]
    pub fn shape(self) -> ShapeDescriptor {
        match self {
            Self::Decision => ShapeDescriptor::Diamond,
            _ => ShapeDescriptor::RoundedRect {
                radius: crate::consts::NODE_CORNER_RADIUS,
            },
        }
    }

    /// Data type accepted on this kind's input port.
    #[must_use]
    pub fn input_type(self) -> DataType {
        match self {
            Self::Email | Self::AiModel => DataType::Text,
            Self::Database => DataType::Object,
            _ => DataType::Any,
        }
    }

    /// Data type produced on this kind's output port(s).
    #[must_use]
    pub fn output_type(self) -> DataType {
        match self {
            Self::Decision | Self::Email => DataType::Boolean,
            Self::ApiCall | Self::Database => DataType::Object,
            Self::AiModel => DataType::Text,
            _ => DataType::Any,
        }
    }

    /// Default display label for freshly created nodes.
    #[must_use]
    pub fn default_label(self) -> &'static str {
        match self {
            Self::Start => "Start",
            Self::End => "End",
            Self::Action => "Action",
            Self::Decision => "Decision",
            Self::ApiCall => "API Call",
            Self::Email => "Email",
            Self::Database => "Database",
            Self::AiModel => "AI Model",
        }
    }

    /// Default fill color for this kind.
    #[must_use]
    pub fn default_fill(self) -> &'static str {
        match self {
            Self::Start => "#4CAF50",
            Self::End => "#F44336",
            Self::Action => "#2196F3",
            Self::Decision => "#FF9800",
            Self::ApiCall => "#9C27B0",
            Self::Email => "#00BCD4",
            Self::Database => "#795548",
            Self::AiModel => "#607D8B",
        }
    }
}

/// How a node kind is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShapeDescriptor {
    /// Rectangle with rounded corners of the given radius.
    RoundedRect { radius: f64 },
    /// Four-point polygon inscribed in the bounding box.
    Diamond,
}

/// The data type carried by a connection point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Wildcard; matches every other type.
    Any,
    Boolean,
    Number,
    Text,
    Object,
}

/// Visual attributes of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStyle {
    /// Fill color as a CSS color string.
    pub fill: String,
    /// Border color as a CSS color string.
    pub border: String,
    /// Border width in world units.
    pub border_width: f64,
    /// Label text color.
    pub text_color: String,
}

impl NodeStyle {
    /// Kind-appropriate default style.
    #[must_use]
    pub fn for_kind(kind: NodeKind) -> Self {
        Self {
            fill: kind.default_fill().to_owned(),
            border: "#1F1A17".to_owned(),
            border_width: 2.0,
            text_color: "#FFFFFF".to_owned(),
        }
    }
}

/// A positioned, typed, styled workflow step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier.
    pub id: NodeId,
    /// Left edge of the bounding box in world coordinates.
    pub x: f64,
    /// Top edge of the bounding box in world coordinates.
    pub y: f64,
    /// Width of the bounding box in world units.
    pub width: f64,
    /// Height of the bounding box in world units.
    pub height: f64,
    /// Workflow step kind; determines shape, ports, and default styling.
    pub kind: NodeKind,
    /// Visual attributes.
    pub style: NodeStyle,
    /// Display label drawn centered inside the shape.
    pub label: String,
    /// Stacking order; lower values are drawn beneath higher values.
    pub z: i64,
}

impl Node {
    /// Create a node of `kind` with default size, style, and label, with its
    /// top-left corner at (`x`, `y`).
    #[must_use]
    pub fn new(kind: NodeKind, x: f64, y: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            x,
            y,
            width: 160.0,
            height: 80.0,
            kind,
            style: NodeStyle::for_kind(kind),
            label: kind.default_label().to_owned(),
            z: 0,
        }
    }

    /// World-space bounding box.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Sparse update for a node. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<NodeStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z: Option<i64>,
}

/// The role a connection point plays on its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PortRole {
    Input,
    Output,
    /// Decision "true" branch output.
    TrueBranch,
    /// Decision "false" branch output.
    FalseBranch,
}

impl PortRole {
    /// Whether this role emits data (outputs and decision branches).
    #[must_use]
    pub fn is_output(self) -> bool {
        matches!(self, Self::Output | Self::TrueBranch | Self::FalseBranch)
    }
}

/// Stable reference to a connection point: `{nodeId, role}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    pub node_id: NodeId,
    pub role: PortRole,
}

/// A derived attachment location on a node. Computed per frame from node
/// geometry and kind; never stored in the document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConnectionPoint {
    pub node_id: NodeId,
    pub role: PortRole,
    /// World-space position.
    pub pos: Point,
    pub data_type: DataType,
}

impl ConnectionPoint {
    /// Stable `{nodeId, role}` reference to this point.
    #[must_use]
    pub fn port_ref(&self) -> PortRef {
        PortRef { node_id: self.node_id, role: self.role }
    }
}

/// Derive the connection points a node currently exposes.
///
/// Every kind except `Start` exposes an input at the left-center; every kind
/// except `End` exposes output(s) at the right. Decision nodes expose
/// true/false branch outputs instead of a plain output.
#[must_use]
pub fn connection_points(node: &Node) -> Vec<ConnectionPoint> {
    let mut points = Vec::with_capacity(3);
    let bounds = node.bounds();

    if node.kind != NodeKind::Start {
        points.push(ConnectionPoint {
            node_id: node.id,
            role: PortRole::Input,
            pos: Point::new(bounds.x, bounds.y + bounds.height * 0.5),
            data_type: node.kind.input_type(),
        });
    }

    match node.kind {
        NodeKind::End => {}
        NodeKind::Decision => {
            points.push(ConnectionPoint {
                node_id: node.id,
                role: PortRole::TrueBranch,
                pos: Point::new(bounds.right(), bounds.y + bounds.height * 0.5),
                data_type: node.kind.output_type(),
            });
            points.push(ConnectionPoint {
                node_id: node.id,
                role: PortRole::FalseBranch,
                pos: Point::new(bounds.x + bounds.width * 0.5, bounds.bottom()),
                data_type: node.kind.output_type(),
            });
        }
        _ => {
            points.push(ConnectionPoint {
                node_id: node.id,
                role: PortRole::Output,
                pos: Point::new(bounds.right(), bounds.y + bounds.height * 0.5),
                data_type: node.kind.output_type(),
            });
        }
    }

    points
}

/// Geometry of a connection path between its endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveKind {
    /// Direct segments between waypoints.
    Straight,
    /// Catmull-Rom-style spline through the waypoints.
    Curved,
    /// Axis-aligned elbows between waypoints.
    Orthogonal,
}

/// Data-flow semantics of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowDirection {
    Unidirectional,
    /// Renders a double-chevron glyph at the path midpoint.
    Bidirectional,
    /// Renders a circled "?" glyph at the path midpoint.
    Conditional,
}

/// Where a connection label is pinned along the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelPlacement {
    Start,
    /// The interior path point with locally minimal curvature.
    Middle,
    End,
}

/// Optional text label attached to a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionLabel {
    pub text: String,
    pub placement: LabelPlacement,
}

/// Visual attributes of a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionStyle {
    /// Stroke color as a CSS color string.
    pub color: String,
    /// Stroke width in world units.
    pub width: f64,
    /// Opacity in [0, 1].
    pub opacity: f64,
    /// Dashed rendering instead of a solid stroke.
    pub dashed: bool,
    /// Arrowhead length in world units.
    pub arrow_size: f64,
    /// Path geometry between the endpoints.
    pub curve: CurveKind,
    /// Optional label pinned along the path.
    pub label: Option<ConnectionLabel>,
}

impl Default for ConnectionStyle {
    fn default() -> Self {
        Self {
            color: "#1F1A17".to_owned(),
            width: 2.0,
            opacity: 1.0,
            dashed: false,
            arrow_size: crate::consts::DEFAULT_ARROW_SIZE,
            curve: CurveKind::Straight,
            label: None,
        }
    }
}

/// A directed edge between two connection points.
///
/// `source`/`target` are snapshots of the derived points at creation (or
/// last geometry refresh). A connection whose node has been deleted is
/// invalid; [`DocStore::remove_node`] prunes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub source: ConnectionPoint,
    pub target: ConnectionPoint,
    /// Ordered intermediate positions between source and target.
    pub waypoints: Vec<Point>,
    pub style: ConnectionStyle,
    pub flow: FlowDirection,
}

impl Connection {
    /// Create a connection between two derived points with default style.
    #[must_use]
    pub fn new(source: ConnectionPoint, target: ConnectionPoint) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            target,
            waypoints: Vec::new(),
            style: ConnectionStyle::default(),
            flow: FlowDirection::Unidirectional,
        }
    }

    /// Whether this connection references `node_id` at either end.
    #[must_use]
    pub fn touches(&self, node_id: &NodeId) -> bool {
        self.source.node_id == *node_id || self.target.node_id == *node_id
    }
}

/// Grid settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub enabled: bool,
    /// Line spacing in world units.
    pub size: f64,
    /// Line color as a CSS color string.
    pub color: String,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { enabled: true, size: 20.0, color: "#3A3F44".to_owned() }
    }
}

/// Canvas-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasConfig {
    /// Canvas width in CSS pixels.
    pub width: f64,
    /// Canvas height in CSS pixels.
    pub height: f64,
    /// Background color as a CSS color string.
    pub background: String,
    pub grid: GridConfig,
    /// Snap created/dropped nodes to grid multiples.
    pub snap_to_grid: bool,
    /// Draw the performance overlay.
    pub show_perf_overlay: bool,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
            background: "#23272B".to_owned(),
            grid: GridConfig::default(),
            snap_to_grid: true,
            show_perf_overlay: false,
        }
    }
}

/// Which family of entities is being edited. Node and connection editing are
/// mutually exclusive at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
    #[default]
    Nodes,
    Connections,
}

/// Current selection: node ids or connection ids, never both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    nodes: HashSet<NodeId>,
    connections: HashSet<ConnectionId>,
}

impl SelectionState {
    /// Select a single node, clearing any connection selection.
    pub fn select_node(&mut self, id: NodeId) {
        self.connections.clear();
        self.nodes.clear();
        self.nodes.insert(id);
    }

    /// Add a node to the selection, clearing any connection selection.
    pub fn add_node(&mut self, id: NodeId) {
        self.connections.clear();
        self.nodes.insert(id);
    }

    /// Select a single connection, clearing any node selection.
    pub fn select_connection(&mut self, id: ConnectionId) {
        self.nodes.clear();
        self.connections.clear();
        self.connections.insert(id);
    }

    /// Clear everything.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.connections.clear();
    }

    /// Forget a node id (e.g. after deletion).
    pub fn forget_node(&mut self, id: &NodeId) {
        self.nodes.remove(id);
    }

    /// Forget a connection id (e.g. after deletion).
    pub fn forget_connection(&mut self, id: &ConnectionId) {
        self.connections.remove(id);
    }

    #[must_use]
    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.contains(id)
    }

    #[must_use]
    pub fn contains_connection(&self, id: &ConnectionId) -> bool {
        self.connections.contains(id)
    }

    #[must_use]
    pub fn nodes(&self) -> &HashSet<NodeId> {
        &self.nodes
    }

    #[must_use]
    pub fn connections(&self) -> &HashSet<ConnectionId> {
        &self.connections
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.connections.is_empty()
    }

    /// The active edit mode, derived from which set is populated.
    #[must_use]
    pub fn mode(&self) -> EditMode {
        if self.connections.is_empty() {
            EditMode::Nodes
        } else {
            EditMode::Connections
        }
    }
}

/// In-memory store of nodes and connections.
#[derive(Debug, Clone, Default)]
pub struct DocStore {
    nodes: HashMap<NodeId, Node>,
    connections: HashMap<ConnectionId, Connection>,
}

impl DocStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a node.
    pub fn insert_node(&mut self, node: Node) {
        self.nodes.insert(node.id, node);
    }

    /// Remove a node and prune every connection that references it.
    ///
    /// Returns the removed node and the ids of pruned connections.
    pub fn remove_node(&mut self, id: &NodeId) -> (Option<Node>, Vec<ConnectionId>) {
        let node = self.nodes.remove(id);
        if node.is_none() {
            return (None, Vec::new());
        }
        let pruned: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|c| c.touches(id))
            .map(|c| c.id)
            .collect();
        for cid in &pruned {
            self.connections.remove(cid);
        }
        (node, pruned)
    }

    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Apply a sparse update to a node. Returns false if the node is absent.
    pub fn apply_patch(&mut self, id: &NodeId, patch: &NodePatch) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        if let Some(x) = patch.x {
            node.x = x;
        }
        if let Some(y) = patch.y {
            node.y = y;
        }
        if let Some(w) = patch.width {
            node.width = w;
        }
        if let Some(h) = patch.height {
            node.height = h;
        }
        if let Some(ref label) = patch.label {
            node.label.clone_from(label);
        }
        if let Some(ref style) = patch.style {
            node.style = style.clone();
        }
        if let Some(z) = patch.z {
            node.z = z;
        }
        true
    }

    /// Insert or replace a connection.
    pub fn insert_connection(&mut self, connection: Connection) {
        self.connections.insert(connection.id, connection);
    }

    /// Remove a connection by id.
    pub fn remove_connection(&mut self, id: &ConnectionId) -> Option<Connection> {
        self.connections.remove(id)
    }

    #[must_use]
    pub fn connection(&self, id: &ConnectionId) -> Option<&Connection> {
        self.connections.get(id)
    }

    pub fn connection_mut(&mut self, id: &ConnectionId) -> Option<&mut Connection> {
        self.connections.get_mut(id)
    }

    /// All connections, unordered.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// All nodes, unordered.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All nodes sorted by `(z, id)` for stable draw order.
    #[must_use]
    pub fn sorted_nodes(&self) -> Vec<&Node> {
        let mut nodes: Vec<&Node> = self.nodes.values().collect();
        nodes.sort_by(|a, b| a.z.cmp(&b.z).then_with(|| a.id.cmp(&b.id)));
        nodes
    }

    /// Refresh the endpoint snapshots of connections touching `node_id`
    /// after its geometry changed.
    pub fn refresh_endpoints(&mut self, node_id: &NodeId) {
        let Some(node) = self.nodes.get(node_id) else {
            return;
        };
        let points = connection_points(node);
        for conn in self.connections.values_mut() {
            for endpoint in [&mut conn.source, &mut conn.target] {
                if endpoint.node_id != *node_id {
                    continue;
                }
                if let Some(fresh) = points.iter().find(|p| p.role == endpoint.role) {
                    *endpoint = *fresh;
                }
            }
        }
    }

    /// Replace the full contents (snapshot restore).
    pub fn load(&mut self, nodes: Vec<Node>, connections: Vec<Connection>) {
        self.nodes.clear();
        self.connections.clear();
        for node in nodes {
            self.nodes.insert(node.id, node);
        }
        for conn in connections {
            self.connections.insert(conn.id, conn);
        }
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.connections.is_empty()
    }
}

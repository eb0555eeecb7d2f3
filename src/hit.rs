//! Hit testing: resolves a world-space point to the topmost interactive
//! target so the dispatcher stays decoupled from drawable handles.
//!
//! Priority order mirrors the visual stacking: selection handles of selected
//! nodes first, then visible connection points, then node bodies top-down in
//! z-order, then connection paths within a screen-space slop.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::consts::HIT_SLOP_PX;
use crate::doc::{
    Connection, ConnectionId, ConnectionPoint, DocStore, Node, NodeId, SelectionState,
    ShapeDescriptor, connection_points,
};
use crate::geom::{Point, Rect};
use crate::route;

/// Corner of a node's selection box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    Nw,
    Ne,
    Se,
    Sw,
}

impl Corner {
    /// The four corners in drawing order.
    pub const ALL: [Self; 4] = [Self::Nw, Self::Ne, Self::Se, Self::Sw];

    /// World-space position of this corner of `bounds`.
    #[must_use]
    pub fn position(self, bounds: &Rect) -> Point {
        match self {
            Self::Nw => Point::new(bounds.x, bounds.y),
            Self::Ne => Point::new(bounds.right(), bounds.y),
            Self::Se => Point::new(bounds.right(), bounds.bottom()),
            Self::Sw => Point::new(bounds.x, bounds.bottom()),
        }
    }
}

/// What a hit test resolved to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitTarget {
    /// A corner selection handle of a selected node.
    NodeHandle { id: NodeId, corner: Corner },
    /// A connection point glyph.
    Port(ConnectionPoint),
    /// A node body.
    Node(NodeId),
    /// A connection path.
    Connection(ConnectionId),
}

/// Resolve the topmost target under `world_pt`.
///
/// `ports_visible` should be true when connection points are being rendered
/// (a node is selected or the connect tool is active); invisible ports are
/// not hittable. `zoom` converts the screen-space slop to world units.
#[must_use]
pub fn hit_test(
    world_pt: Point,
    doc: &DocStore,
    selection: &SelectionState,
    zoom: f64,
    ports_visible: bool,
) -> Option<HitTarget> {
    let slop = HIT_SLOP_PX / zoom.max(f64::EPSILON);

    // Selection handles of selected nodes win over everything.
    for id in selection.nodes() {
        let Some(node) = doc.node(id) else {
            continue;
        };
        let bounds = node.bounds();
        for corner in Corner::ALL {
            if corner.position(&bounds).distance(world_pt) <= slop {
                return Some(HitTarget::NodeHandle { id: *id, corner });
            }
        }
    }

    if ports_visible {
        for node in doc.sorted_nodes().into_iter().rev() {
            for point in connection_points(node) {
                if point.pos.distance(world_pt) <= slop {
                    return Some(HitTarget::Port(point));
                }
            }
        }
    }

    // Node bodies, topmost first.
    for node in doc.sorted_nodes().into_iter().rev() {
        if node_contains(node, world_pt) {
            return Some(HitTarget::Node(node.id));
        }
    }

    // Connection paths within slop, nearest wins.
    let mut best: Option<(ConnectionId, f64)> = None;
    for conn in doc.connections() {
        let dist = distance_to_connection(conn, doc, world_pt);
        if dist <= slop && best.is_none_or(|(_, d)| dist < d) {
            best = Some((conn.id, dist));
        }
    }
    best.map(|(id, _)| HitTarget::Connection(id))
}

/// Whether `world_pt` falls inside the node's drawn shape (diamond-aware).
#[must_use]
pub fn node_contains(node: &Node, world_pt: Point) -> bool {
    let bounds = node.bounds();
    if !bounds.contains(world_pt) {
        return false;
    }
    match node.kind.shape() {
        ShapeDescriptor::RoundedRect { .. } => true,
        ShapeDescriptor::Diamond => {
            // |dx|/hw + |dy|/hh <= 1 inside the inscribed rhombus.
            let center = bounds.center();
            let hw = (bounds.width * 0.5).max(f64::EPSILON);
            let hh = (bounds.height * 0.5).max(f64::EPSILON);
            ((world_pt.x - center.x).abs() / hw + (world_pt.y - center.y).abs() / hh) <= 1.0
        }
    }
}

/// Distance from `world_pt` to the routed path of `conn`.
fn distance_to_connection(conn: &Connection, doc: &DocStore, world_pt: Point) -> f64 {
    let obstacles = obstacle_bounds(doc, conn.source.node_id, conn.target.node_id);
    let points = route::compute_path(
        conn.source.pos,
        conn.target.pos,
        &conn.waypoints,
        conn.style.curve,
        &obstacles,
    );
    route::distance_to_path(world_pt, &points)
}

/// Bounding boxes of every node except the two given endpoints, for routing.
#[must_use]
pub fn obstacle_bounds(doc: &DocStore, source: NodeId, target: NodeId) -> Vec<Rect> {
    doc.nodes()
        .filter(|n| n.id != source && n.id != target)
        .map(Node::bounds)
        .collect()
}

/// Nodes fully or partially inside a world-space rectangle (marquee select).
#[must_use]
pub fn nodes_in_rect(doc: &DocStore, rect: &Rect) -> Vec<NodeId> {
    doc.nodes()
        .filter(|n| rect.intersects(&n.bounds()))
        .map(|n| n.id)
        .collect()
}

/// Nodes whose center lies inside a lasso polygon.
#[must_use]
pub fn nodes_in_lasso(doc: &DocStore, lasso: &[Point]) -> Vec<NodeId> {
    if lasso.len() < 3 {
        return Vec::new();
    }
    doc.nodes()
        .filter(|n| point_in_polygon(n.bounds().center(), lasso))
        .map(|n| n.id)
        .collect()
}

/// Even-odd ray cast point-in-polygon test.
fn point_in_polygon(pt: Point, polygon: &[Point]) -> bool {
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let a = polygon[i];
        let b = polygon[j];
        if ((a.y > pt.y) != (b.y > pt.y))
            && pt.x < (b.x - a.x) * (pt.y - a.y) / (b.y - a.y) + a.x
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

//! Connection router: port compatibility, path construction, arrowheads,
//! dash segmentation, label anchoring, and data-flow glyphs.
//!
//! The router is pure: it consumes connection-point snapshots plus obstacle
//! rectangles and produces a [`RoutedConnection`] the scene renderer turns
//! into draw commands.

#[cfg(test)]
#[path = "route_test.rs"]
mod route_test;

use crate::consts::{ARROW_HALF_ANGLE, CURVE_SAMPLES, DASH_GAP, DASH_LENGTH};
use crate::doc::{
    Connection, ConnectionPoint, CurveKind, DataType, FlowDirection, LabelPlacement,
};
use crate::geom::{
    self, Point, Rect, arrowhead, catmull_rom, dash_segments, flattest_interior_index,
    orthogonal_elbow, point_at_distance, polyline_length,
};

/// Why two connection points cannot be connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Incompatibility {
    /// Both points belong to the same node.
    SameNode,
    /// The source point is not an output.
    SourceNotOutput,
    /// The target point is not an input.
    TargetNotInput,
    /// The declared data types do not match.
    TypeMismatch,
}

/// Check whether `source` may feed `target`.
///
/// Compatible when either side declares the wildcard type, when the types
/// match exactly, or when the source is boolean-typed (booleans may feed any
/// input). Same-node and same-role-class pairs are always rejected. The rule
/// is deliberately asymmetric: `check(a, b)` and `check(b, a)` can differ.
///
/// # Errors
///
/// Returns the first [`Incompatibility`] found.
pub fn check_compatible(
    source: &ConnectionPoint,
    target: &ConnectionPoint,
) -> Result<(), Incompatibility> {
    if source.node_id == target.node_id {
        return Err(Incompatibility::SameNode);
    }
    if !source.role.is_output() {
        return Err(Incompatibility::SourceNotOutput);
    }
    if target.role.is_output() {
        return Err(Incompatibility::TargetNotInput);
    }
    let ok = source.data_type == DataType::Any
        || target.data_type == DataType::Any
        || source.data_type == target.data_type
        || source.data_type == DataType::Boolean;
    if ok { Ok(()) } else { Err(Incompatibility::TypeMismatch) }
}

/// Convenience boolean form of [`check_compatible`].
#[must_use]
pub fn is_compatible(source: &ConnectionPoint, target: &ConnectionPoint) -> bool {
    check_compatible(source, target).is_ok()
}

/// A midpoint glyph conveying data-flow semantics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlowGlyph {
    /// Double chevron pointing along the path (bidirectional).
    DoubleChevron { at: Point, angle: f64 },
    /// Circled question mark (conditional).
    QuestionMark { at: Point },
}

/// A fully routed connection, ready for drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedConnection {
    /// Polyline points from source to target.
    pub points: Vec<Point>,
    /// Filled arrowhead triangle at the target end, if the final segment has
    /// nonzero length.
    pub arrow: Option<[Point; 3]>,
    /// Dash runs replacing the solid stroke, for dashed styles.
    pub dashes: Option<Vec<(Point, Point)>>,
    /// Anchor position for the label, if the connection has one.
    pub label_anchor: Option<Point>,
    /// Midpoint data-flow glyph, if any.
    pub glyph: Option<FlowGlyph>,
}

/// Compute the routed polyline for a path of anchor points.
///
/// Straight paths connect the anchors directly. Curved paths run a
/// Catmull-Rom-style spline through them at [`CURVE_SAMPLES`] segments per
/// span. Orthogonal paths insert an axis-aligned elbow per anchor pair,
/// flipping elbow orientation when the default orientation would cut
/// through an obstacle.
#[must_use]
pub fn compute_path(
    source: Point,
    target: Point,
    waypoints: &[Point],
    curve: CurveKind,
    obstacles: &[Rect],
) -> Vec<Point> {
    let mut anchors = Vec::with_capacity(waypoints.len() + 2);
    anchors.push(source);
    anchors.extend_from_slice(waypoints);
    anchors.push(target);

    match curve {
        CurveKind::Straight => anchors,
        CurveKind::Curved => catmull_rom(&anchors, CURVE_SAMPLES),
        CurveKind::Orthogonal => {
            let mut out = Vec::with_capacity(anchors.len() * 2);
            out.push(anchors[0]);
            for pair in anchors.windows(2) {
                for elbow in route_elbow(pair[0], pair[1], obstacles) {
                    out.push(elbow);
                }
                out.push(pair[1]);
            }
            out
        }
    }
}

/// Elbow points between `a` and `b`, preferring the dominant-axis-first
/// orientation and flipping when that corner path crosses an obstacle.
fn route_elbow(a: Point, b: Point, obstacles: &[Rect]) -> Vec<Point> {
    let preferred = orthogonal_elbow(a, b);
    let Some(&corner) = preferred.first() else {
        return preferred;
    };
    if !elbow_blocked(a, corner, b, obstacles) {
        return preferred;
    }
    // Flip orientation: the alternative corner swaps which axis goes first.
    let alternative = Point::new(a.x + b.x - corner.x, a.y + b.y - corner.y);
    if elbow_blocked(a, alternative, b, obstacles) {
        return preferred;
    }
    vec![alternative]
}

fn elbow_blocked(a: Point, corner: Point, b: Point, obstacles: &[Rect]) -> bool {
    obstacles
        .iter()
        .any(|r| r.intersects_segment(a, corner) || r.intersects_segment(corner, b))
}

/// Route a connection into drawable geometry.
///
/// `obstacles` should contain the bounding boxes of nodes other than the two
/// endpoint nodes.
#[must_use]
pub fn route(connection: &Connection, obstacles: &[Rect]) -> RoutedConnection {
    let points = compute_path(
        connection.source.pos,
        connection.target.pos,
        &connection.waypoints,
        connection.style.curve,
        obstacles,
    );

    let arrow = final_segment(&points).and_then(|(from, tip)| {
        arrowhead(from, tip, connection.style.arrow_size, ARROW_HALF_ANGLE)
    });

    let dashes = connection
        .style
        .dashed
        .then(|| dash_segments(&points, DASH_LENGTH, DASH_GAP));

    let label_anchor = connection.style.label.as_ref().map(|label| {
        match label.placement {
            LabelPlacement::Start => points[0],
            LabelPlacement::End => points[points.len() - 1],
            LabelPlacement::Middle => points[flattest_interior_index(&points)],
        }
    });

    let glyph = flow_glyph(connection, &points);

    RoutedConnection { points, arrow, dashes, label_anchor, glyph }
}

fn final_segment(points: &[Point]) -> Option<(Point, Point)> {
    let tip = *points.last()?;
    // Walk backwards past coincident samples so the arrow direction is real.
    points
        .iter()
        .rev()
        .skip(1)
        .find(|p| p.distance(tip) > f64::EPSILON)
        .map(|&from| (from, tip))
}

fn flow_glyph(connection: &Connection, points: &[Point]) -> Option<FlowGlyph> {
    let half = polyline_length(points) * 0.5;
    let at = point_at_distance(points, half)?;
    match connection.flow {
        FlowDirection::Unidirectional => None,
        FlowDirection::Bidirectional => {
            let before = point_at_distance(points, (half - 1.0).max(0.0))?;
            let angle = before
                .direction_to(at)
                .map_or(0.0, |d| d.y.atan2(d.x));
            Some(FlowGlyph::DoubleChevron { at, angle })
        }
        FlowDirection::Conditional => Some(FlowGlyph::QuestionMark { at }),
    }
}

/// Split every other node's connection points into valid and invalid targets
/// for a connect gesture starting at `source`.
///
/// Computed once at gesture start; the live preview highlights membership.
#[must_use]
pub fn classify_targets(
    source: &ConnectionPoint,
    candidates: &[ConnectionPoint],
) -> (Vec<ConnectionPoint>, Vec<ConnectionPoint>) {
    candidates
        .iter()
        .copied()
        .filter(|c| !(c.node_id == source.node_id && c.role == source.role))
        .partition(|c| is_compatible(source, c))
}

/// The preview polyline for an in-progress connect gesture: source point to
/// live cursor, straight.
#[must_use]
pub fn preview_path(source: Point, cursor: Point) -> Vec<Point> {
    vec![source, cursor]
}

/// Re-exported distance helper used by hit-testing against routed paths.
#[must_use]
pub fn distance_to_path(pt: Point, points: &[Point]) -> f64 {
    geom::point_polyline_distance(pt, points)
}

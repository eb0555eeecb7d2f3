//! Scene renderer: turns the logical model plus viewport into an ordered,
//! backend-neutral display list.
//!
//! The renderer owns three drawing layers (grid, connections, nodes) plus an
//! overlay for selection UI and gesture previews. Per-entity drawable
//! handles come from the [`crate::pool`] and are released — never dropped —
//! when their entity disappears. Nodes outside the padded viewport are
//! culled; grid density follows zoom brackets; a [`QualityLevel`] hint from
//! the performance monitor sheds optional detail under load.

#[cfg(test)]
#[path = "scene_test.rs"]
mod scene_test;

use std::collections::HashMap;

use crate::camera::Viewport;
use crate::consts::{
    CULL_PADDING, GRID_FINE_ZOOM, GRID_MEDIUM_ZOOM, GRID_SPARSE_ZOOM,
    ORIGIN_CROSSHAIR_MIN_ZOOM, PORT_RADIUS, SELECTION_HANDLE_SIZE,
};
use crate::doc::{
    CanvasConfig, Connection, ConnectionId, DocStore, Node, NodeId, PortRole, SelectionState,
    ShapeDescriptor, connection_points,
};
use crate::geom::{Point, Rect};
use crate::hit::{Corner, obstacle_bounds};
use crate::input::ConnectionDraft;
use crate::perf::QualityLevel;
use crate::pool::{Handle, HandlePool};
use crate::route::{self, FlowGlyph};

/// Selection accent color.
const SELECTION_COLOR: &str = "#1E90FF";
/// Valid connect-target highlight.
const VALID_TARGET_COLOR: &str = "#4CAF50";
/// Invalid connect-target highlight.
const INVALID_TARGET_COLOR: &str = "#F44336";

/// A single backend-neutral drawing command.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCmd {
    Rect {
        rect: Rect,
        corner_radius: f64,
        fill: Option<String>,
        stroke: Option<String>,
        stroke_width: f64,
        opacity: f64,
    },
    Polygon {
        points: Vec<Point>,
        fill: Option<String>,
        stroke: Option<String>,
        stroke_width: f64,
        opacity: f64,
    },
    Circle {
        center: Point,
        radius: f64,
        fill: Option<String>,
        stroke: Option<String>,
        stroke_width: f64,
    },
    Line {
        a: Point,
        b: Point,
        color: String,
        width: f64,
        opacity: f64,
    },
    /// Open polyline stroke.
    Path {
        points: Vec<Point>,
        color: String,
        width: f64,
        opacity: f64,
    },
    /// Centered text run.
    Text {
        pos: Point,
        text: String,
        size: f64,
        color: String,
    },
}

/// The ordered layers of one rendered frame, bottom first.
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    pub grid: Vec<DrawCmd>,
    pub connections: Vec<DrawCmd>,
    pub nodes: Vec<DrawCmd>,
    pub overlay: Vec<DrawCmd>,
}

impl DrawList {
    /// Total command count across all layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.grid.len() + self.connections.len() + self.nodes.len() + self.overlay.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// World-space rectangle currently visible through the viewport.
#[must_use]
pub fn visible_bounds(viewport: &Viewport, canvas_w: f64, canvas_h: f64) -> Rect {
    let top_left = viewport.screen_to_world(Point::new(0.0, 0.0));
    Rect::new(
        top_left.x,
        top_left.y,
        canvas_w / viewport.zoom,
        canvas_h / viewport.zoom,
    )
}

/// Everything the renderer reads for one frame.
pub struct FrameInput<'a> {
    pub doc: &'a DocStore,
    pub viewport: Viewport,
    pub selection: &'a SelectionState,
    pub config: &'a CanvasConfig,
    /// True when the connect tool is active (ports become visible).
    pub connect_tool: bool,
    /// In-progress connect gesture, if any.
    pub draft: Option<&'a ConnectionDraft>,
    pub quality: QualityLevel,
    /// Optional status line for the performance overlay.
    pub perf_line: Option<String>,
}

/// Owns drawable handles and produces a [`DrawList`] per frame.
#[derive(Debug, Default)]
pub struct SceneRenderer {
    node_handles: HashMap<NodeId, Handle>,
    connection_handles: HashMap<ConnectionId, Handle>,
    pool: HandlePool,
}

impl SceneRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Render one frame.
    pub fn render(&mut self, frame: &FrameInput<'_>) -> DrawList {
        self.sync_handles(frame.doc);

        let bounds = visible_bounds(&frame.viewport, frame.config.width, frame.config.height);
        let cull_bounds = bounds.expanded(CULL_PADDING);

        let mut list = DrawList::default();
        if frame.config.grid.enabled {
            build_grid(&mut list.grid, frame.config, &frame.viewport, &bounds);
        }

        self.render_connections(frame, &cull_bounds, &mut list);
        self.render_nodes(frame, &cull_bounds, &mut list);
        render_draft(frame, &mut list);

        if frame.config.show_perf_overlay {
            if let Some(line) = &frame.perf_line {
                list.overlay.push(DrawCmd::Text {
                    pos: bounds.center(),
                    text: line.clone(),
                    size: 12.0,
                    color: "#9E9E9E".to_owned(),
                });
            }
        }

        list
    }

    /// Ids of nodes whose handles survived the last sync (for tests).
    #[must_use]
    pub fn tracked_nodes(&self) -> Vec<NodeId> {
        self.node_handles.keys().copied().collect()
    }

    /// Number of recycled handles waiting in the pool.
    #[must_use]
    pub fn pooled_handles(&self) -> usize {
        self.pool.len()
    }

    /// Acquire handles for new entities and release handles whose entity is
    /// gone. Releasing goes through the pool so nothing leaks.
    fn sync_handles(&mut self, doc: &DocStore) {
        let gone_nodes: Vec<NodeId> = self
            .node_handles
            .keys()
            .filter(|id| doc.node(id).is_none())
            .copied()
            .collect();
        for id in gone_nodes {
            if let Some(handle) = self.node_handles.remove(&id) {
                self.pool.release(handle);
            }
        }
        let gone_conns: Vec<ConnectionId> = self
            .connection_handles
            .keys()
            .filter(|id| doc.connection(id).is_none())
            .copied()
            .collect();
        for id in gone_conns {
            if let Some(handle) = self.connection_handles.remove(&id) {
                self.pool.release(handle);
            }
        }

        for node in doc.nodes() {
            self.node_handles
                .entry(node.id)
                .or_insert_with(|| self.pool.acquire());
        }
        for conn in doc.connections() {
            self.connection_handles
                .entry(conn.id)
                .or_insert_with(|| self.pool.acquire());
        }
    }

    fn render_connections(&mut self, frame: &FrameInput<'_>, cull: &Rect, list: &mut DrawList) {
        for conn in frame.doc.connections() {
            let Some(handle) = self.connection_handles.get_mut(&conn.id) else {
                continue;
            };
            handle.clear();

            if !connection_visible(conn, cull) {
                continue;
            }

            let obstacles = obstacle_bounds(frame.doc, conn.source.node_id, conn.target.node_id);
            let routed = route::route(conn, &obstacles);
            let selected = frame.selection.contains_connection(&conn.id);
            build_connection(handle, conn, &routed, selected, frame.quality);
            list.connections.extend(handle.commands.iter().cloned());
        }
    }

    fn render_nodes(&mut self, frame: &FrameInput<'_>, cull: &Rect, list: &mut DrawList) {
        let ports_visible = frame.connect_tool;
        for node in frame.doc.sorted_nodes() {
            let Some(handle) = self.node_handles.get_mut(&node.id) else {
                continue;
            };
            handle.clear();

            if !node.bounds().intersects(cull) {
                continue;
            }

            let selected = frame.selection.contains_node(&node.id);
            build_node(handle, node, selected, frame.quality);
            if selected || ports_visible {
                build_ports(handle, node, frame.draft);
            }
            list.nodes.extend(handle.commands.iter().cloned());

            if selected {
                build_selection_ui(&mut list.overlay, node);
            }
        }
    }
}

/// Whether any part of a connection could be visible: endpoint or waypoint
/// inside the culling rectangle.
fn connection_visible(conn: &Connection, cull: &Rect) -> bool {
    let mut pts = Vec::with_capacity(conn.waypoints.len() + 2);
    pts.push(conn.source.pos);
    pts.extend_from_slice(&conn.waypoints);
    pts.push(conn.target.pos);
    // A segment can cross the viewport with both ends outside; test the
    // segment, not just the points.
    pts.windows(2).any(|w| cull.intersects_segment(w[0], w[1])) || pts.iter().any(|p| cull.contains(*p))
}

// =============================================================
// Grid
// =============================================================

/// Grid with level-of-detail: line stride and opacity vary by zoom bracket;
/// above [`GRID_FINE_ZOOM`] a quarter-spacing sub-grid appears; an origin
/// crosshair is drawn when the origin is visible and zoom permits.
fn build_grid(out: &mut Vec<DrawCmd>, config: &CanvasConfig, viewport: &Viewport, bounds: &Rect) {
    let zoom = viewport.zoom;
    let (stride, opacity, width) = if zoom < GRID_SPARSE_ZOOM {
        (4.0, 0.15, 1.0)
    } else if zoom < GRID_MEDIUM_ZOOM {
        (2.0, 0.25, 1.0)
    } else if zoom > GRID_FINE_ZOOM {
        (1.0, 0.6, 0.5)
    } else {
        (1.0, 0.4, 1.0)
    };

    let spacing = config.grid.size * stride;
    emit_grid_lines(out, bounds, spacing, &config.grid.color, width, opacity);

    if zoom > GRID_FINE_ZOOM {
        emit_grid_lines(out, bounds, config.grid.size * 0.25, &config.grid.color, 0.5, 0.12);
    }

    let origin_visible = bounds.contains(Point::new(0.0, 0.0));
    if origin_visible && zoom > ORIGIN_CROSSHAIR_MIN_ZOOM {
        let arm = config.grid.size * 1.5;
        for (a, b) in [
            (Point::new(-arm, 0.0), Point::new(arm, 0.0)),
            (Point::new(0.0, -arm), Point::new(0.0, arm)),
        ] {
            out.push(DrawCmd::Line {
                a,
                b,
                color: config.grid.color.clone(),
                width: 2.0,
                opacity: 0.8,
            });
        }
    }
}

fn emit_grid_lines(
    out: &mut Vec<DrawCmd>,
    bounds: &Rect,
    spacing: f64,
    color: &str,
    width: f64,
    opacity: f64,
) {
    if spacing <= 0.0 {
        return;
    }
    let start_x = (bounds.x / spacing).floor() * spacing;
    let mut x = start_x;
    while x <= bounds.right() {
        out.push(DrawCmd::Line {
            a: Point::new(x, bounds.y),
            b: Point::new(x, bounds.bottom()),
            color: color.to_owned(),
            width,
            opacity,
        });
        x += spacing;
    }
    let start_y = (bounds.y / spacing).floor() * spacing;
    let mut y = start_y;
    while y <= bounds.bottom() {
        out.push(DrawCmd::Line {
            a: Point::new(bounds.x, y),
            b: Point::new(bounds.right(), y),
            color: color.to_owned(),
            width,
            opacity,
        });
        y += spacing;
    }
}

// =============================================================
// Nodes
// =============================================================

fn build_node(handle: &mut Handle, node: &Node, selected: bool, quality: QualityLevel) {
    let bounds = node.bounds();
    let (stroke, stroke_width) = if selected {
        (SELECTION_COLOR.to_owned(), node.style.border_width + 1.0)
    } else {
        (node.style.border.clone(), node.style.border_width)
    };

    match node.kind.shape() {
        ShapeDescriptor::RoundedRect { radius } => {
            handle.commands.push(DrawCmd::Rect {
                rect: bounds,
                corner_radius: radius,
                fill: Some(node.style.fill.clone()),
                stroke: Some(stroke),
                stroke_width,
                opacity: 1.0,
            });
        }
        ShapeDescriptor::Diamond => {
            let center = bounds.center();
            handle.commands.push(DrawCmd::Polygon {
                points: vec![
                    Point::new(center.x, bounds.y),
                    Point::new(bounds.right(), center.y),
                    Point::new(center.x, bounds.bottom()),
                    Point::new(bounds.x, center.y),
                ],
                fill: Some(node.style.fill.clone()),
                stroke: Some(stroke),
                stroke_width,
                opacity: 1.0,
            });
        }
    }

    if quality != QualityLevel::Low && !node.label.is_empty() {
        build_label(handle, node, bounds);
    }
}

fn build_label(handle: &mut Handle, node: &Node, bounds: Rect) {
    let font_size = (node.height / 6.0).clamp(12.0, 24.0);
    let max_w = (node.width - 12.0).max(1.0);
    let line_height = font_size * 1.25;
    let max_lines = ((node.height / line_height).floor() as usize).max(1);

    let mut lines = wrap_label(&node.label, max_w, font_size);
    if lines.len() > max_lines {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            *last = fit_with_ellipsis(last, max_w, font_size);
        }
    }

    let center = bounds.center();
    #[allow(clippy::cast_precision_loss)]
    let total = line_height * (lines.len().saturating_sub(1) as f64);
    for (idx, line) in lines.into_iter().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let y = center.y - total * 0.5 + idx as f64 * line_height;
        handle.commands.push(DrawCmd::Text {
            pos: Point::new(center.x, y),
            text: line,
            size: font_size,
            color: node.style.text_color.clone(),
        });
    }
}

fn build_ports(handle: &mut Handle, node: &Node, draft: Option<&ConnectionDraft>) {
    for point in connection_points(node) {
        let highlight = draft.map(|d| {
            if d.is_valid_target(&point.port_ref()) {
                VALID_TARGET_COLOR
            } else {
                INVALID_TARGET_COLOR
            }
        });
        let is_decision_branch =
            matches!(point.role, PortRole::TrueBranch | PortRole::FalseBranch);

        // Inputs render hollow, outputs filled; decision branches get a
        // diamond glyph and a True/False caption.
        let (fill, stroke) = match (point.role, highlight) {
            (_, Some(color)) => (Some(color.to_owned()), Some("#FFFFFF".to_owned())),
            (PortRole::Input, None) => {
                (Some("#FFFFFF".to_owned()), Some(node.style.border.clone()))
            }
            (_, None) => (Some(node.style.border.clone()), None),
        };

        if is_decision_branch {
            let r = PORT_RADIUS;
            handle.commands.push(DrawCmd::Polygon {
                points: vec![
                    Point::new(point.pos.x, point.pos.y - r),
                    Point::new(point.pos.x + r, point.pos.y),
                    Point::new(point.pos.x, point.pos.y + r),
                    Point::new(point.pos.x - r, point.pos.y),
                ],
                fill,
                stroke,
                stroke_width: 1.0,
                opacity: 1.0,
            });
            let caption = if point.role == PortRole::TrueBranch { "True" } else { "False" };
            handle.commands.push(DrawCmd::Text {
                pos: Point::new(point.pos.x, point.pos.y - r - 8.0),
                text: caption.to_owned(),
                size: 10.0,
                color: node.style.border.clone(),
            });
        } else {
            handle.commands.push(DrawCmd::Circle {
                center: point.pos,
                radius: PORT_RADIUS,
                fill,
                stroke,
                stroke_width: 1.0,
            });
        }
    }
}

fn build_selection_ui(overlay: &mut Vec<DrawCmd>, node: &Node) {
    let bounds = node.bounds();
    let half = SELECTION_HANDLE_SIZE * 0.5;
    for corner in Corner::ALL {
        let pos = corner.position(&bounds);
        overlay.push(DrawCmd::Rect {
            rect: Rect::new(pos.x - half, pos.y - half, SELECTION_HANDLE_SIZE, SELECTION_HANDLE_SIZE),
            corner_radius: 0.0,
            fill: Some("#FFFFFF".to_owned()),
            stroke: Some(SELECTION_COLOR.to_owned()),
            stroke_width: 1.0,
            opacity: 1.0,
        });
    }
}

// =============================================================
// Connections
// =============================================================

fn build_connection(
    handle: &mut Handle,
    conn: &Connection,
    routed: &route::RoutedConnection,
    selected: bool,
    quality: QualityLevel,
) {
    let color = if selected { SELECTION_COLOR.to_owned() } else { conn.style.color.clone() };
    let width = if selected { conn.style.width + 1.0 } else { conn.style.width };

    if let Some(dashes) = &routed.dashes {
        for (a, b) in dashes {
            handle.commands.push(DrawCmd::Line {
                a: *a,
                b: *b,
                color: color.clone(),
                width,
                opacity: conn.style.opacity,
            });
        }
    } else {
        handle.commands.push(DrawCmd::Path {
            points: routed.points.clone(),
            color: color.clone(),
            width,
            opacity: conn.style.opacity,
        });
    }

    // Arrowhead is filled for solid connections, outlined for dashed.
    if let Some(arrow) = routed.arrow {
        handle.commands.push(DrawCmd::Polygon {
            points: arrow.to_vec(),
            fill: (!conn.style.dashed).then(|| color.clone()),
            stroke: Some(color.clone()),
            stroke_width: 1.0,
            opacity: conn.style.opacity,
        });
    }

    if quality == QualityLevel::Low {
        return;
    }

    if let (Some(anchor), Some(label)) = (routed.label_anchor, conn.style.label.as_ref()) {
        handle.commands.push(DrawCmd::Text {
            pos: Point::new(anchor.x, anchor.y - 10.0),
            text: label.text.clone(),
            size: 11.0,
            color: color.clone(),
        });
    }

    match routed.glyph {
        Some(FlowGlyph::DoubleChevron { at, angle }) => {
            build_double_chevron(handle, at, angle, &color);
        }
        Some(FlowGlyph::QuestionMark { at }) => {
            handle.commands.push(DrawCmd::Circle {
                center: at,
                radius: 7.0,
                fill: Some("#FFFFFF".to_owned()),
                stroke: Some(color.clone()),
                stroke_width: 1.0,
            });
            handle.commands.push(DrawCmd::Text {
                pos: at,
                text: "?".to_owned(),
                size: 10.0,
                color,
            });
        }
        None => {}
    }
}

fn build_double_chevron(handle: &mut Handle, at: Point, angle: f64, color: &str) {
    let size = 5.0;
    for offset in [-3.0, 3.0] {
        let cx = at.x + offset * angle.cos();
        let cy = at.y + offset * angle.sin();
        let spread = std::f64::consts::FRAC_PI_4;
        for sign in [-1.0, 1.0] {
            handle.commands.push(DrawCmd::Line {
                a: Point::new(cx, cy),
                b: Point::new(
                    cx - size * (angle + sign * spread).cos(),
                    cy - size * (angle + sign * spread).sin(),
                ),
                color: color.to_owned(),
                width: 1.5,
                opacity: 1.0,
            });
        }
    }
}

// =============================================================
// Gesture previews
// =============================================================

fn render_draft(frame: &FrameInput<'_>, list: &mut DrawList) {
    let Some(draft) = frame.draft else {
        return;
    };
    list.overlay.push(DrawCmd::Path {
        points: draft.preview.clone(),
        color: SELECTION_COLOR.to_owned(),
        width: 1.5,
        opacity: 0.8,
    });
    for target in &draft.valid_targets {
        list.overlay.push(DrawCmd::Circle {
            center: target.pos,
            radius: PORT_RADIUS + 3.0,
            fill: None,
            stroke: Some(VALID_TARGET_COLOR.to_owned()),
            stroke_width: 2.0,
        });
    }
    for target in &draft.invalid_targets {
        list.overlay.push(DrawCmd::Circle {
            center: target.pos,
            radius: PORT_RADIUS + 3.0,
            fill: None,
            stroke: Some(INVALID_TARGET_COLOR.to_owned()),
            stroke_width: 2.0,
        });
    }
}

// =============================================================
// Text measurement
// =============================================================

/// Approximate width of a text run: average glyph width of 0.6 em.
#[must_use]
pub fn measure_text(text: &str, font_size: f64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let chars = text.chars().count() as f64;
    chars * font_size * 0.6
}

/// Word-wrap `text` to fit `max_w`, breaking overlong words by character.
#[must_use]
pub fn wrap_label(text: &str, max_w: f64, font_size: f64) -> Vec<String> {
    let mut out = Vec::new();
    for raw_line in text.lines() {
        let words: Vec<&str> = raw_line.split_whitespace().collect();
        if words.is_empty() {
            out.push(String::new());
            continue;
        }

        let mut current = String::new();
        for word in words {
            let candidate = if current.is_empty() {
                word.to_owned()
            } else {
                format!("{current} {word}")
            };
            if measure_text(&candidate, font_size) <= max_w {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            if measure_text(word, font_size) <= max_w {
                current = word.to_owned();
            } else {
                let mut chunks = break_word(word, max_w, font_size);
                if let Some(last) = chunks.pop() {
                    out.extend(chunks);
                    current = last;
                }
            }
        }
        if !current.is_empty() {
            out.push(current);
        }
    }
    if out.is_empty() {
        out.push(String::new());
    }
    out
}

fn break_word(word: &str, max_w: f64, font_size: f64) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for ch in word.chars() {
        let mut candidate = current.clone();
        candidate.push(ch);
        if !current.is_empty() && measure_text(&candidate, font_size) > max_w {
            lines.push(current);
            current = ch.to_string();
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Truncate `text` with a trailing ellipsis so it fits `max_w`.
#[must_use]
pub fn fit_with_ellipsis(text: &str, max_w: f64, font_size: f64) -> String {
    let trimmed = text.trim();
    if measure_text(trimmed, font_size) <= max_w {
        return trimmed.to_owned();
    }
    let ellipsis = "...";
    let mut chars: Vec<char> = trimmed.chars().collect();
    while !chars.is_empty() {
        chars.pop();
        let candidate = format!("{}{}", chars.iter().collect::<String>().trim_end(), ellipsis);
        if measure_text(&candidate, font_size) <= max_w {
            return candidate;
        }
    }
    ellipsis.to_owned()
}

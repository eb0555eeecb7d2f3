//! Input model: tools, modifier keys, buttons, wheel deltas, and the gesture
//! state machine the dispatcher drives between pointer-down and pointer-up.
//!
//! Gesture variants carry all the context needed to compute incremental
//! deltas while the pointer moves and to emit the committed mutation on
//! release. Nothing here touches the document directly.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use std::collections::HashMap;

use crate::camera::MomentumTracker;
use crate::consts::DOUBLE_CLICK_MS;
use crate::doc::{ConnectionPoint, NodeId, PortRef};
use crate::geom::Point;
use crate::history::Snapshot;

/// Which tool is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    /// Pointer / selection tool (default).
    #[default]
    Select,
    /// Drag pans the canvas directly.
    Pan,
    /// Drag up/down zooms around the gesture origin.
    Zoom,
    /// Click places a node.
    NodeCreate,
    /// Drag from an output port to an input port creates a connection.
    ConnectionCreate,
    /// Freehand lasso selection.
    LassoSelect,
    /// Rectangular marquee selection.
    RectangleSelect,
}

impl Tool {
    /// Map a single-letter, no-modifier key to a tool switch.
    #[must_use]
    pub fn from_shortcut(key: &str) -> Option<Self> {
        match key {
            "v" | "V" => Some(Self::Select),
            "h" | "H" => Some(Self::Pan),
            "z" | "Z" => Some(Self::Zoom),
            "n" | "N" => Some(Self::NodeCreate),
            "c" | "C" => Some(Self::ConnectionCreate),
            "l" | "L" => Some(Self::LassoSelect),
            "r" | "R" => Some(Self::RectangleSelect),
            _ => None,
        }
    }
}

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Cmd on macOS.
    #[must_use]
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Primary,
    Middle,
    Secondary,
}

/// A keyboard key, holding the name as reported by the host
/// (e.g. `"Delete"`, `"Escape"`, `"a"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

/// Wheel / trackpad scroll delta in pixels (positive `dy` = down).
#[derive(Debug, Clone, Copy)]
pub struct WheelDelta {
    pub dx: f64,
    pub dy: f64,
}

/// Transient state for an in-progress connect gesture. Exists only between
/// pointer-down on a source port and pointer-up; never persisted.
#[derive(Debug, Clone)]
pub struct ConnectionDraft {
    /// The output point the gesture started from.
    pub source: ConnectionPoint,
    /// Live cursor position in world coordinates.
    pub cursor: Point,
    /// Preview polyline from source to cursor.
    pub preview: Vec<Point>,
    /// Targets compatible with the source, computed once at gesture start.
    pub valid_targets: Vec<ConnectionPoint>,
    /// Targets checked and rejected, for invalid-highlight rendering.
    pub invalid_targets: Vec<ConnectionPoint>,
}

impl ConnectionDraft {
    /// Whether `port` is in the valid-target set.
    #[must_use]
    pub fn is_valid_target(&self, port: &PortRef) -> bool {
        self.valid_targets
            .iter()
            .any(|p| p.node_id == port.node_id && p.role == port.role)
    }
}

/// The active gesture being tracked between pointer-down and pointer-up.
#[derive(Debug, Clone, Default)]
pub enum Gesture {
    /// No gesture in progress.
    #[default]
    Idle,
    /// Dragging the canvas under the pan tool (direct translate).
    Panning {
        /// Screen position of the previous pointer event.
        last_screen: Point,
    },
    /// Dragging empty canvas under the select tool; accumulates momentum.
    PanningWithMomentum {
        last_screen: Point,
        tracker: MomentumTracker,
    },
    /// Vertical drag under the zoom tool.
    ZoomDragging {
        /// Screen point the gesture started at; zoom centers here.
        origin_screen: Point,
        last_screen: Point,
    },
    /// Moving the selected nodes.
    DraggingNodes {
        /// World position of the pointer at the previous event.
        last_world: Point,
        /// Positions at drag start, to detect a no-op drag.
        start_positions: HashMap<NodeId, Point>,
        /// Model state captured before the drag, pushed to history on commit.
        pre: Box<Snapshot>,
    },
    /// Dragging a new connection from a source port.
    CreatingConnection(ConnectionDraft),
    /// Dragging a rectangular selection marquee.
    RectangleSelecting {
        anchor_world: Point,
        cursor_world: Point,
    },
    /// Collecting freehand lasso points.
    LassoSelecting { points: Vec<Point> },
}

impl Gesture {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Detects double-clicks: two taps on the same target within
/// [`DOUBLE_CLICK_MS`].
#[derive(Debug, Clone, Default)]
pub struct DoubleClickDetector {
    last: Option<(NodeId, f64)>,
}

impl DoubleClickDetector {
    /// Record a tap on `target` at `now_ms`. Returns true when this tap
    /// completes a double-click.
    pub fn tap(&mut self, target: NodeId, now_ms: f64) -> bool {
        let is_double = self
            .last
            .is_some_and(|(prev, at)| prev == target && now_ms - at <= DOUBLE_CLICK_MS);
        self.last = if is_double { None } else { Some((target, now_ms)) };
        is_double
    }
}

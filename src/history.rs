//! History manager: bounded undo/redo over whole-model snapshots.
//!
//! Every structural mutation pushes the pre-mutation state onto the past
//! stack and clears the future stack. Undo and redo are mirror moves between
//! the two stacks with the live state passing through. The past stack is
//! capped at [`HISTORY_DEPTH`]; the oldest snapshot is dropped silently on
//! overflow. Non-structural changes (selection, live drag positions) never
//! reach this module — only committed results do.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::camera::Viewport;
use crate::consts::HISTORY_DEPTH;
use crate::doc::{CanvasConfig, Connection, DocStore, Node};

/// An immutable deep copy of the model, viewport, and config.
///
/// Nodes and connections are stored sorted by id so two snapshots of the
/// same logical state compare equal regardless of map iteration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
    pub viewport: Viewport,
    pub config: CanvasConfig,
    /// Milliseconds timestamp supplied by the host clock at capture.
    pub taken_at: f64,
}

impl Snapshot {
    /// Deep-copy the current state.
    #[must_use]
    pub fn capture(
        doc: &DocStore,
        viewport: Viewport,
        config: &CanvasConfig,
        now_ms: f64,
    ) -> Self {
        let mut nodes: Vec<Node> = doc.nodes().cloned().collect();
        nodes.sort_by_key(|n| n.id);
        let mut connections: Vec<Connection> = doc.connections().cloned().collect();
        connections.sort_by_key(|c| c.id);
        Self {
            nodes,
            connections,
            viewport,
            config: config.clone(),
            taken_at: now_ms,
        }
    }

    /// Whether two snapshots describe the same model state, ignoring the
    /// capture timestamp.
    #[must_use]
    pub fn same_state(&self, other: &Self) -> bool {
        self.nodes == other.nodes
            && self.connections == other.connections
            && self.viewport == other.viewport
            && self.config == other.config
    }
}

/// Two bounded stacks of snapshots: past (undo) and future (redo).
#[derive(Debug, Clone, Default)]
pub struct History {
    past: VecDeque<Snapshot>,
    future: Vec<Snapshot>,
}

impl History {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the pre-mutation state. The future stack is cleared — a new
    /// mutation invalidates anything that was undone.
    pub fn record(&mut self, pre_mutation: Snapshot) {
        self.past.push_back(pre_mutation);
        if self.past.len() > HISTORY_DEPTH {
            self.past.pop_front();
        }
        self.future.clear();
    }

    /// Step back: the current state moves to the future stack and the most
    /// recent past snapshot is returned for restoration.
    #[must_use]
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let restored = self.past.pop_back()?;
        self.future.push(current);
        Some(restored)
    }

    /// Step forward: mirror of [`History::undo`].
    #[must_use]
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let restored = self.future.pop()?;
        self.past.push_back(current);
        Some(restored)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Depth of the past stack.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.past.len()
    }

    /// Depth of the future stack.
    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.future.len()
    }
}

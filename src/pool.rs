//! Bounded reuse cache for drawable handles.
//!
//! The scene renderer owns one handle per live node/connection. When an
//! entity disappears its handle is cleared and returned here instead of
//! being dropped, amortizing allocation across churn-heavy edits. The pool
//! is bounded: overflow handles are destroyed.

#[cfg(test)]
#[path = "pool_test.rs"]
mod pool_test;

use uuid::Uuid;

use crate::consts::MAX_POOL_SIZE;
use crate::scene::DrawCmd;

/// Identity of a drawable handle, stable across reuse.
pub type HandleId = Uuid;

/// A retained drawable: the display commands for one scene entity.
#[derive(Debug, Clone)]
pub struct Handle {
    id: HandleId,
    /// Display commands for the owning entity, rebuilt each frame it is dirty.
    pub commands: Vec<DrawCmd>,
}

impl Handle {
    fn new() -> Self {
        Self { id: Uuid::new_v4(), commands: Vec::new() }
    }

    #[must_use]
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Drop all retained commands but keep the allocation.
    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

/// Pool of recycled [`Handle`]s, bounded at [`MAX_POOL_SIZE`].
#[derive(Debug, Default)]
pub struct HandlePool {
    free: Vec<Handle>,
}

impl HandlePool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a recycled handle, or allocate a fresh one when the pool is empty.
    pub fn acquire(&mut self) -> Handle {
        self.free.pop().unwrap_or_else(Handle::new)
    }

    /// Return a handle for reuse. The handle is cleared; if the pool is
    /// already at capacity the handle is destroyed instead.
    pub fn release(&mut self, mut handle: Handle) {
        if self.free.len() >= MAX_POOL_SIZE {
            return;
        }
        handle.clear();
        self.free.push(handle);
    }

    /// Number of recycled handles currently available.
    #[must_use]
    pub fn len(&self) -> usize {
        self.free.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }
}

//! Viewport transform controller: pan/zoom state, coordinate conversions,
//! momentum, and smooth animated transitions.
//!
//! The viewport maps world coordinates to screen coordinates as
//! `screen = world * zoom + pan`. Zoom is clamped to
//! [[`MIN_ZOOM`], [`MAX_ZOOM`]] and pan to ±[`PAN_BOUND`] structurally — every
//! mutation path goes through [`Viewport::clamped`], so drift cannot
//! accumulate.

#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use serde::{Deserialize, Serialize};

use crate::consts::{
    ANIMATION_EPSILON, MAX_ZOOM, MIN_ZOOM, MOMENTUM_DAMPING, MOMENTUM_MIN_SPEED,
    MOMENTUM_STOP_SPEED, PAN_BOUND, VIEWPORT_SMOOTHING,
};
use crate::geom::Point;

/// Pan offset (screen px) and zoom factor mapping world to screen space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, zoom: 1.0 }
    }
}

/// Sparse viewport update. Only present fields are applied.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ViewportPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,
}

impl Viewport {
    /// Convert a screen-space point (CSS pixels) to world coordinates.
    #[must_use]
    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point::new((screen.x - self.x) / self.zoom, (screen.y - self.y) / self.zoom)
    }

    /// Convert a world-space point to screen coordinates (CSS pixels).
    #[must_use]
    pub fn world_to_screen(&self, world: Point) -> Point {
        Point::new(world.x * self.zoom + self.x, world.y * self.zoom + self.y)
    }

    /// Convert a screen-space distance (pixels) to world-space distance.
    #[must_use]
    pub fn screen_dist_to_world(&self, screen_dist: f64) -> f64 {
        screen_dist / self.zoom
    }

    /// This viewport with zoom and pan clamped to their legal ranges.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            x: self.x.clamp(-PAN_BOUND, PAN_BOUND),
            y: self.y.clamp(-PAN_BOUND, PAN_BOUND),
            zoom: self.zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        }
    }
}

/// Residual pan velocity in screen px/s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity {
    pub vx: f64,
    pub vy: f64,
}

impl Velocity {
    #[must_use]
    pub fn speed(self) -> f64 {
        self.vx.hypot(self.vy)
    }
}

/// Tracks pointer velocity during a drag so release can hand the camera a
/// momentum vector.
#[derive(Debug, Clone, Copy, Default)]
pub struct MomentumTracker {
    last: Option<(Point, f64)>,
    velocity: Velocity,
}

impl Default for Velocity {
    fn default() -> Self {
        Self { vx: 0.0, vy: 0.0 }
    }
}

impl MomentumTracker {
    /// Record a pointer position at `now_ms`, updating the velocity estimate
    /// from the elapsed time since the previous sample.
    pub fn record(&mut self, screen: Point, now_ms: f64) {
        if let Some((prev, prev_ms)) = self.last {
            let dt = now_ms - prev_ms;
            if dt > 0.0 {
                self.velocity = Velocity {
                    vx: (screen.x - prev.x) * 1000.0 / dt,
                    vy: (screen.y - prev.y) * 1000.0 / dt,
                };
            }
        }
        self.last = Some((screen, now_ms));
    }

    /// Consume the tracker. Returns the release velocity when it exceeds the
    /// momentum threshold, else `None`.
    #[must_use]
    pub fn release(self) -> Option<Velocity> {
        (self.velocity.speed() > MOMENTUM_MIN_SPEED).then_some(self.velocity)
    }
}

/// Owns the live viewport plus any in-flight smoothing animation or momentum.
#[derive(Debug, Clone, Default)]
pub struct CameraController {
    current: Viewport,
    target: Option<Viewport>,
    momentum: Option<Velocity>,
}

impl CameraController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The live viewport.
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.current
    }

    /// The animation target, or the live viewport when nothing is in flight.
    #[must_use]
    pub fn target(&self) -> Viewport {
        self.target.unwrap_or(self.current)
    }

    /// Whether an animation or momentum pan is in flight.
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.target.is_some() || self.momentum.is_some()
    }

    /// Replace the viewport outright (clamped).
    pub fn set(&mut self, viewport: Viewport) {
        self.current = viewport.clamped();
        self.target = None;
    }

    /// Apply a sparse update to the live viewport (clamped).
    pub fn apply(&mut self, patch: ViewportPatch) {
        let mut vp = self.target();
        if let Some(x) = patch.x {
            vp.x = x;
        }
        if let Some(y) = patch.y {
            vp.y = y;
        }
        if let Some(zoom) = patch.zoom {
            vp.zoom = zoom;
        }
        self.set(vp);
    }

    /// Translate the viewport by a screen-space delta.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.current = Viewport {
            x: self.current.x + dx,
            y: self.current.y + dy,
            zoom: self.current.zoom,
        }
        .clamped();
        self.target = None;
    }

    /// Multiply zoom by `factor`, keeping the world point under `screen_pt`
    /// fixed, and animate toward the result.
    ///
    /// Repeated calls compose against the pending target so fast wheel bursts
    /// accumulate instead of resetting.
    pub fn zoom_at(&mut self, screen_pt: Point, factor: f64) {
        let base = self.target();
        let world = base.screen_to_world(screen_pt);
        let zoom = (base.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        // Solve pan so `world` maps back to `screen_pt` at the new zoom.
        let target = Viewport {
            x: screen_pt.x - world.x * zoom,
            y: screen_pt.y - world.y * zoom,
            zoom,
        }
        .clamped();
        self.momentum = None;
        self.animate_to(target);
    }

    /// Begin a smoothed transition toward `target`.
    pub fn animate_to(&mut self, target: Viewport) {
        self.target = Some(target.clamped());
    }

    /// Hand the camera a release velocity for momentum panning.
    pub fn start_momentum(&mut self, velocity: Velocity) {
        self.target = None;
        self.momentum = Some(velocity);
    }

    /// Cancel any in-flight animation and momentum. Called when a new
    /// pointer gesture starts.
    pub fn cancel_animation(&mut self) {
        self.target = None;
        self.momentum = None;
    }

    /// Advance animation and momentum by one frame of `dt_ms` milliseconds.
    ///
    /// Returns true when the viewport changed (the host should redraw).
    pub fn tick(&mut self, dt_ms: f64) -> bool {
        let mut changed = false;

        if let Some(target) = self.target {
            let vp = self.current;
            let next = Viewport {
                x: vp.x + (target.x - vp.x) * VIEWPORT_SMOOTHING,
                y: vp.y + (target.y - vp.y) * VIEWPORT_SMOOTHING,
                zoom: vp.zoom + (target.zoom - vp.zoom) * VIEWPORT_SMOOTHING,
            };
            let done = (target.x - next.x).abs() < ANIMATION_EPSILON
                && (target.y - next.y).abs() < ANIMATION_EPSILON
                && (target.zoom - next.zoom).abs() < ANIMATION_EPSILON;
            self.current = if done { target } else { next }.clamped();
            if done {
                self.target = None;
            }
            changed = true;
        }

        if let Some(v) = self.momentum {
            let dt_s = dt_ms / 1000.0;
            self.current = Viewport {
                x: self.current.x + v.vx * dt_s,
                y: self.current.y + v.vy * dt_s,
                zoom: self.current.zoom,
            }
            .clamped();
            let damped = Velocity { vx: v.vx * MOMENTUM_DAMPING, vy: v.vy * MOMENTUM_DAMPING };
            self.momentum = (damped.speed() > MOMENTUM_STOP_SPEED).then_some(damped);
            changed = true;
        }

        changed
    }
}

//! Shared numeric constants for the canvas engine.
//!
//! Several of these (momentum damping, LOD zoom brackets, alert thresholds)
//! are empirically chosen tuning values rather than derived quantities. They
//! live here as named constants so a host build can adjust them in one place.

// ── Viewport ────────────────────────────────────────────────────

/// Minimum zoom factor.
pub const MIN_ZOOM: f64 = 0.01;

/// Maximum zoom factor.
pub const MAX_ZOOM: f64 = 10.0;

/// Pan position is clamped to ±this many world units on each axis, so the
/// "infinite" canvas stays finite numerically.
pub const PAN_BOUND: f64 = 100_000.0;

/// Zoom multiplier applied per wheel notch scrolling in.
pub const WHEEL_ZOOM_IN: f64 = 1.1;

/// Zoom multiplier applied per wheel notch scrolling out.
pub const WHEEL_ZOOM_OUT: f64 = 0.9;

/// Fraction of the remaining distance to the animation target covered each
/// frame. Higher values converge faster.
pub const VIEWPORT_SMOOTHING: f64 = 0.25;

/// When an animated viewport is within this distance of its target (world
/// units for pan, absolute for zoom) it snaps and the animation ends.
pub const ANIMATION_EPSILON: f64 = 0.01;

/// Per-frame multiplier applied to residual pan velocity after release.
pub const MOMENTUM_DAMPING: f64 = 0.8;

/// Release speed (screen px/s) below which no momentum pan starts.
pub const MOMENTUM_MIN_SPEED: f64 = 50.0;

/// Momentum pan stops once decayed below this speed (screen px/s).
pub const MOMENTUM_STOP_SPEED: f64 = 10.0;

// ── Rendering ───────────────────────────────────────────────────

/// Cull padding around the visible viewport rectangle, in world units.
pub const CULL_PADDING: f64 = 150.0;

/// Maximum number of recycled drawable handles kept in the pool.
pub const MAX_POOL_SIZE: usize = 100;

/// Below this zoom only every 4th grid line is drawn, at low opacity.
pub const GRID_SPARSE_ZOOM: f64 = 0.3;

/// Between [`GRID_SPARSE_ZOOM`] and this zoom, every 2nd grid line is drawn.
pub const GRID_MEDIUM_ZOOM: f64 = 0.6;

/// Above this zoom grid lines thin out, gain opacity, and a finer sub-grid
/// appears at quarter spacing.
pub const GRID_FINE_ZOOM: f64 = 3.0;

/// The origin crosshair is drawn only above this zoom.
pub const ORIGIN_CROSSHAIR_MIN_ZOOM: f64 = 0.5;

/// Corner radius for rounded-rectangle node shapes, in world units.
pub const NODE_CORNER_RADIUS: f64 = 8.0;

/// Side length of square selection handles, in world units at zoom 1.
pub const SELECTION_HANDLE_SIZE: f64 = 8.0;

/// Radius of a connection point glyph, in world units.
pub const PORT_RADIUS: f64 = 5.0;

// ── Routing ─────────────────────────────────────────────────────

/// Number of interpolated segments per curve span.
pub const CURVE_SAMPLES: usize = 20;

/// Arrowhead half-angle in radians (30°).
pub const ARROW_HALF_ANGLE: f64 = std::f64::consts::PI / 6.0;

/// Default arrowhead length in world units.
pub const DEFAULT_ARROW_SIZE: f64 = 10.0;

/// Dash segment length in world units for dashed connections.
pub const DASH_LENGTH: f64 = 8.0;

/// Gap length in world units between dashes.
pub const DASH_GAP: f64 = 4.0;

// ── Interaction ─────────────────────────────────────────────────

/// Screen-space hit slop in pixels for handles, ports, and thin paths.
pub const HIT_SLOP_PX: f64 = 8.0;

/// Maximum interval between two taps on the same target to count as a
/// double-click, in milliseconds.
pub const DOUBLE_CLICK_MS: f64 = 300.0;

/// Offset applied to duplicated nodes, in world units on both axes.
pub const DUPLICATE_OFFSET: f64 = 20.0;

// ── History ─────────────────────────────────────────────────────

/// Maximum undo depth; the oldest snapshot is dropped beyond this.
pub const HISTORY_DEPTH: usize = 50;

// ── Performance monitor ─────────────────────────────────────────

/// FPS at or below this raises a warning alert.
pub const FPS_WARN: u32 = 30;

/// FPS at or below this raises an error alert.
pub const FPS_ERROR: u32 = 15;

/// Heap usage at or above this raises a warning alert (100 MB).
pub const MEMORY_WARN_BYTES: u64 = 100 * 1024 * 1024;

/// Heap usage at or above this raises an error alert (200 MB).
pub const MEMORY_ERROR_BYTES: u64 = 200 * 1024 * 1024;

/// Per-frame render time at or above this raises a warning alert (60 Hz budget).
pub const FRAME_WARN_MS: f64 = 16.67;

/// Per-frame render time at or above this raises an error alert (30 Hz budget).
pub const FRAME_ERROR_MS: f64 = 33.33;

/// Recent heap average must exceed the older average by this ratio before
/// the leak heuristic warns.
pub const LEAK_GROWTH_RATIO: f64 = 1.2;

/// Number of samples averaged on each side of the leak comparison.
pub const LEAK_WINDOW: usize = 3;

/// Minimum gap between the two leak-comparison windows.
pub const LEAK_LOOKBACK: usize = 5;

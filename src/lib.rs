//! Interactive diagram canvas engine for a visual workflow designer.
//!
//! The crate is host-agnostic: a thin embedding layer feeds pointer,
//! keyboard, wheel, and drag-drop events into [`engine::EngineCore`] and
//! drives it with a frame tick; the engine answers with [`engine::Action`]
//! records and a backend-neutral [`scene::DrawList`] the host rasterizes.
//! All state — document, viewport, selection, tool, history — lives inside
//! the engine and mutates synchronously.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level dispatcher and testable [`engine::EngineCore`] |
//! | [`doc`] | Node/connection model, derived ports, selection, store |
//! | [`camera`] | Viewport transform, momentum, zoom animation |
//! | [`input`] | Tools, modifiers, and the gesture state machine |
//! | [`hit`] | Hit-testing against nodes, ports, and connection paths |
//! | [`route`] | Port compatibility and connection path routing |
//! | [`scene`] | Display-list renderer with culling and grid LOD |
//! | [`pool`] | Bounded reuse pool for drawable handles |
//! | [`history`] | Bounded snapshot undo/redo |
//! | [`perf`] | Frame timing, memory sampling, threshold alerts |
//! | [`geom`] | Points, rectangles, splines, polyline helpers |
//! | [`consts`] | Shared numeric constants (zoom limits, thresholds, etc.) |

pub mod camera;
pub mod consts;
pub mod doc;
pub mod engine;
pub mod geom;
pub mod hit;
pub mod history;
pub mod input;
pub mod perf;
pub mod pool;
pub mod route;
pub mod scene;

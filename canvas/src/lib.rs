//! Node-graph canvas core for the Universe panel.
//!
//! The crate owns the full lifecycle of the canvas: translating raw input
//! events into graph mutations, maintaining view state for pan, zoom, and the
//! optional 3-D perspective, hit-testing blocks, simulating telemetry for
//! running blocks, and assembling each frame as a headless [`render::Scene`].
//! The host is responsible only for wiring input to the engine and persisting
//! the resulting [`engine::Action`]s. With the `web` feature the crate also
//! paints scenes into a browser `<canvas>`.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Canvas controller: testable [`engine::EngineCore`] (and `Engine` under `web`) |
//! | [`graph`] | Blocks, connections, sparse patches, and the graph store |
//! | [`status`] | Block status state machine |
//! | [`telemetry`] | Injectable clock and the telemetry simulator |
//! | [`camera`] | View state, coordinate conversions, and the 3-D projection |
//! | [`input`] | Input event types, selection, and the gesture state machine |
//! | [`hit`] | Hit-testing against block parts |
//! | [`block_view`] | Block card visuals and the shared card layout |
//! | [`connection_view`] | Connection visuals and anchors |
//! | [`minimap`] | Mini-map inset |
//! | [`render`] | Scene assembly |
//! | [`config`] | Host-supplied canvas flags |
//! | [`error`] | Graph mutation errors |
//! | [`consts`] | Shared numeric constants (zoom limits, card size, tick intervals) |
//! | `paint` | Scene painting onto a 2-D canvas context (`web` only) |

pub mod block_view;
pub mod camera;
pub mod config;
pub mod connection_view;
pub mod consts;
pub mod engine;
pub mod error;
pub mod graph;
pub mod hit;
pub mod input;
pub mod minimap;
#[cfg(feature = "web")]
pub mod paint;
pub mod render;
pub mod status;
pub mod telemetry;

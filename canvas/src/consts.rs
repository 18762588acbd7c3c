//! Shared numeric constants for the canvas crate.

// ── View limits ─────────────────────────────────────────────────

/// Smallest allowed zoom factor.
pub const ZOOM_MIN: f64 = 0.1;

/// Largest allowed zoom factor.
pub const ZOOM_MAX: f64 = 5.0;

/// Zoom delta applied per wheel notch and per zoom button press.
pub const ZOOM_STEP: f64 = 0.1;

/// Allowed range for the 3-D `translateZ` depth, in CSS pixels.
pub const DEPTH_MIN: f64 = -500.0;
pub const DEPTH_MAX: f64 = 500.0;

/// Allowed range for the 3-D perspective distance, in CSS pixels.
pub const PERSPECTIVE_MIN: f64 = 100.0;
pub const PERSPECTIVE_MAX: f64 = 2000.0;

/// Perspective distance of a fresh camera.
pub const PERSPECTIVE_DEFAULT: f64 = 1000.0;

/// Fraction of the viewport that fit-to-content fills.
pub const FIT_MARGIN: f64 = 0.8;

// ── Block geometry (world units) ────────────────────────────────

/// Nominal block width used for layout, bounds, and connection anchors.
pub const BLOCK_WIDTH: f64 = 300.0;

/// Nominal block height used for layout, bounds, and connection anchors.
pub const BLOCK_HEIGHT: f64 = 200.0;

/// Extra height of the details panel when a block is expanded.
pub const DETAILS_HEIGHT: f64 = 120.0;

/// Offset applied to both axes when a block is duplicated.
pub const DUPLICATE_OFFSET: f64 = 20.0;

/// Side length of an action button in the block header.
pub const ACTION_BUTTON_SIZE: f64 = 24.0;

/// Gap between action buttons.
pub const ACTION_BUTTON_GAP: f64 = 4.0;

/// Scale applied to a hovered block.
pub const HOVER_SCALE: f64 = 1.05;

// ── Hit-testing ─────────────────────────────────────────────────

/// Screen-space hit slop in pixels for connection handles.
pub const HANDLE_RADIUS_PX: f64 = 8.0;

/// Screen-space distance a pressed block must travel before it drags.
pub const DRAG_THRESHOLD_PX: f64 = 3.0;

// ── Grid and mini-map ───────────────────────────────────────────

/// Grid cell size in world units.
pub const GRID_SPACING: f64 = 20.0;

/// Mini-map inset size in screen pixels.
pub const MINIMAP_WIDTH: f64 = 192.0;
pub const MINIMAP_HEIGHT: f64 = 128.0;

/// Inner padding of the mini-map inset.
pub const MINIMAP_PADDING: f64 = 8.0;

/// Radius of a block dot on the mini-map.
pub const MINIMAP_DOT_RADIUS: f64 = 4.0;

// ── Telemetry ───────────────────────────────────────────────────

/// Interval between progress ticks for an active block.
pub const PROGRESS_TICK_MS: u64 = 1_000;

/// Interval between metrics refreshes for an active block.
pub const METRICS_TICK_MS: u64 = 5_000;

/// Upper bound (exclusive) of a single progress increment.
pub const PROGRESS_STEP_MAX: f64 = 2.0;

/// Most missed ticks of one timer replayed by a single advance. Beyond this
/// the timer is rescheduled from the current time.
pub const MAX_CATCH_UP_TICKS: u32 = 10;

// ── Connections ─────────────────────────────────────────────────

/// Dash and gap length of an animated connection, in world units.
pub const CONNECTION_DASH: f64 = 5.0;

/// Milliseconds for the dash pattern to advance one world unit.
pub const CONNECTION_DASH_MS_PER_UNIT: f64 = 50.0;

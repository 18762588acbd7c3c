//! Canvas configuration flags supplied by the host.
//!
//! The surface is deliberately loose: the host may hand over booleans,
//! numbers, or strings, and every value is coerced rather than rejected.
//! Unknown keys are ignored.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use serde_json::Value;

use crate::camera::ViewMode;

/// Initial presentation flags for a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasConfig {
    pub view_mode: ViewMode,
    pub show_grid: bool,
    pub show_minimap: bool,
    /// Seed for the telemetry RNG. `None` seeds from the OS.
    pub telemetry_seed: Option<u64>,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self { view_mode: ViewMode::TwoD, show_grid: true, show_minimap: true, telemetry_seed: None }
    }
}

impl CanvasConfig {
    /// Build a config from a loosely typed JSON object.
    ///
    /// Recognised keys: `viewMode` (`"2d"` or `"3d"`), `showGrid`,
    /// `showMinimap`, `telemetrySeed`. Missing or unreadable values keep
    /// their defaults.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        let defaults = Self::default();
        let Some(obj) = value.as_object() else {
            return defaults;
        };
        Self {
            view_mode: obj.get("viewMode").and_then(coerce_view_mode).unwrap_or(defaults.view_mode),
            show_grid: obj.get("showGrid").and_then(coerce_bool).unwrap_or(defaults.show_grid),
            show_minimap: obj.get("showMinimap").and_then(coerce_bool).unwrap_or(defaults.show_minimap),
            telemetry_seed: obj.get("telemetrySeed").and_then(Value::as_u64),
        }
    }
}

/// Coerce a JSON value to a boolean.
///
/// Booleans pass through, numbers are true when non-zero, strings accept
/// `true/1/yes/on` and `false/0/no/off/""` case-insensitively. Anything
/// else (null, arrays, objects, other strings) yields `None`.
#[must_use]
pub fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => parse_bool(s),
        _ => None,
    }
}

/// Parse a boolean flag the way [`coerce_bool`] reads strings.
#[must_use]
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Parse a view mode name; accepts `2d`/`3d` in any case.
#[must_use]
pub fn parse_view_mode(raw: &str) -> Option<ViewMode> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "2d" => Some(ViewMode::TwoD),
        "3d" => Some(ViewMode::ThreeD),
        _ => None,
    }
}

fn coerce_view_mode(value: &Value) -> Option<ViewMode> {
    value.as_str().and_then(parse_view_mode)
}

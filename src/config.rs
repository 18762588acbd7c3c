//! Host configuration: command-line flags with environment fallbacks.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use universe_canvas::config::{CanvasConfig, parse_bool, parse_view_mode};

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

#[derive(Parser, Debug, Clone)]
#[command(name = "universe", about = "Headless Universe canvas host")]
pub struct HostConfig {
    /// Graph JSON to load. The built-in demo graph is used when absent.
    #[arg(long, env = "UNIVERSE_GRAPH")]
    pub graph: Option<PathBuf>,

    /// JSON array of recorded input events replayed after loading.
    #[arg(long, env = "UNIVERSE_SCRIPT")]
    pub script: Option<PathBuf>,

    /// Number of timer ticks to run before reporting.
    #[arg(long, env = "UNIVERSE_TICKS", default_value_t = 10)]
    pub ticks: u32,

    /// Simulated milliseconds per tick.
    #[arg(long, env = "UNIVERSE_TICK_MS", default_value_t = 1_000)]
    pub tick_ms: u64,

    /// Sleep for `tick_ms` of wall time between ticks.
    #[arg(long, env = "UNIVERSE_REALTIME")]
    pub realtime: bool,

    /// Seed for the telemetry generator; OS entropy when absent.
    #[arg(long, env = "UNIVERSE_SEED")]
    pub seed: Option<u64>,

    #[arg(long, env = "UNIVERSE_VIEW_MODE", default_value = "2d")]
    pub view_mode: String,

    #[arg(long, env = "UNIVERSE_SHOW_GRID", default_value = "true")]
    pub show_grid: String,

    #[arg(long, env = "UNIVERSE_SHOW_MINIMAP", default_value = "true")]
    pub show_minimap: String,

    /// Viewport width in CSS pixels.
    #[arg(long, env = "UNIVERSE_WIDTH", default_value_t = 1280.0)]
    pub width: f64,

    /// Viewport height in CSS pixels.
    #[arg(long, env = "UNIVERSE_HEIGHT", default_value_t = 800.0)]
    pub height: f64,
}

impl HostConfig {
    /// Canvas flags, coerced the same way the panel coerces its JSON config.
    ///
    /// Unrecognized values fall back to the canvas defaults with a warning.
    #[must_use]
    pub fn canvas_config(&self) -> CanvasConfig {
        let defaults = CanvasConfig::default();
        CanvasConfig {
            view_mode: parse_view_mode(&self.view_mode).unwrap_or_else(|| {
                tracing::warn!(value = %self.view_mode, "unrecognized view mode, using default");
                defaults.view_mode
            }),
            show_grid: flag("show_grid", &self.show_grid, defaults.show_grid),
            show_minimap: flag("show_minimap", &self.show_minimap, defaults.show_minimap),
            telemetry_seed: self.seed,
        }
    }

    /// Wall-clock pause between ticks in realtime mode. Never zero.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}

fn flag(name: &str, raw: &str, default: bool) -> bool {
    parse_bool(raw).unwrap_or_else(|| {
        tracing::warn!(flag = name, value = raw, "unrecognized boolean, using default");
        default
    })
}

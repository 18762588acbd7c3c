//! Telemetry simulator: synthetic progress and runtime metrics for active blocks.
//!
//! Time and randomness are injected. The simulator never reads a wall clock;
//! the caller passes `now` (milliseconds from any fixed origin) taken from a
//! [`Clock`], and random draws come from a boxed [`RngCore`]. Tests step a
//! [`ManualClock`] and seed the RNG to get exact, repeatable sequences.
//!
//! Each active block owns two timers:
//!
//! - progress, every [`PROGRESS_TICK_MS`]: `progress += U[0, 2)`, back to 0
//!   once it passes 100 (a sawtooth for a service that never finishes);
//! - metrics, every [`METRICS_TICK_MS`]: executions, uptime, CPU, memory.
//!
//! Timers exist only while the block is `active`. [`TelemetrySimulator::sync`]
//! tears them down as soon as a block leaves that state or disappears.

#[cfg(test)]
#[path = "telemetry_test.rs"]
mod telemetry_test;

use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use crate::consts::{MAX_CATCH_UP_TICKS, METRICS_TICK_MS, PROGRESS_STEP_MAX, PROGRESS_TICK_MS};
use crate::graph::{BlockDataPatch, BlockId, BlockPatch, GraphStore, MetricValue};

/// Source of the current time in milliseconds.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start_ms: u64) -> Self {
        Self { now: Rc::new(Cell::new(start_ms)) }
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get().saturating_add(ms));
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

/// Monotonic clock measuring from its own creation.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Browser clock backed by `Date.now()`.
#[cfg(feature = "web")]
#[derive(Debug, Clone, Copy, Default)]
pub struct WebClock;

#[cfg(feature = "web")]
impl Clock for WebClock {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn now_ms(&self) -> u64 {
        js_sys::Date::now().max(0.0) as u64
    }
}

/// Tick intervals and step size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryConfig {
    pub progress_interval_ms: u64,
    pub metrics_interval_ms: u64,
    pub progress_step_max: f64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            progress_interval_ms: PROGRESS_TICK_MS,
            metrics_interval_ms: METRICS_TICK_MS,
            progress_step_max: PROGRESS_STEP_MAX,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct BlockTimers {
    next_progress_at: u64,
    next_metrics_at: u64,
}

/// Per-block timers plus the injected RNG.
pub struct TelemetrySimulator {
    rng: Box<dyn RngCore>,
    config: TelemetryConfig,
    timers: BTreeMap<BlockId, BlockTimers>,
}

impl TelemetrySimulator {
    /// Build a simulator around any RNG. Zero intervals are raised to 1 ms.
    #[must_use]
    pub fn new(rng: Box<dyn RngCore>, config: TelemetryConfig) -> Self {
        let config = TelemetryConfig {
            progress_interval_ms: config.progress_interval_ms.max(1),
            metrics_interval_ms: config.metrics_interval_ms.max(1),
            progress_step_max: if config.progress_step_max > 0.0 { config.progress_step_max } else { PROGRESS_STEP_MAX },
        };
        Self { rng, config, timers: BTreeMap::new() }
    }

    /// Default intervals with a seeded [`StdRng`].
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(Box::new(StdRng::seed_from_u64(seed)), TelemetryConfig::default())
    }

    /// Default intervals with an OS-seeded [`StdRng`]. Falls back to a fixed
    /// seed if the OS source is unavailable.
    #[must_use]
    pub fn from_os_rng() -> Self {
        let rng = match StdRng::try_from_os_rng() {
            Ok(rng) => rng,
            Err(e) => {
                tracing::warn!(error = %e, "os rng unavailable; telemetry uses a fixed seed");
                StdRng::seed_from_u64(0)
            }
        };
        Self::new(Box::new(rng), TelemetryConfig::default())
    }

    /// Start timers for newly active blocks and cancel those of blocks that
    /// left `active` or no longer exist.
    pub fn sync(&mut self, graph: &GraphStore, now: u64) {
        self.timers.retain(|id, _| {
            let keep = graph.get(id).is_some_and(|b| b.status.is_running());
            if !keep {
                tracing::debug!(block_id = %id, "telemetry timers cancelled");
            }
            keep
        });
        for block in graph.blocks().filter(|b| b.status.is_running()) {
            self.timers.entry(block.id).or_insert_with(|| {
                tracing::debug!(block_id = %block.id, "telemetry timers started");
                BlockTimers {
                    next_progress_at: now.saturating_add(self.config.progress_interval_ms),
                    next_metrics_at: now.saturating_add(self.config.metrics_interval_ms),
                }
            });
        }
    }

    /// Fire every tick due at or before `now` and write the results to `graph`.
    ///
    /// At most [`MAX_CATCH_UP_TICKS`] missed ticks per timer are replayed;
    /// after a longer gap the timer restarts from `now`.
    ///
    /// Returns the patch applied to each block that changed, in block-id order.
    pub fn advance(&mut self, graph: &mut GraphStore, now: u64) -> Vec<(BlockId, BlockPatch)> {
        self.sync(graph, now);

        let Self { rng, config, timers } = self;
        let mut updates = Vec::new();
        for (id, timers) in timers.iter_mut() {
            let Some(block) = graph.get(id) else {
                continue;
            };
            let mut data = BlockDataPatch::default();

            if timers.next_progress_at <= now {
                let mut progress = block.data.progress.unwrap_or(0.0);
                let mut fired = 0;
                while timers.next_progress_at <= now && fired < MAX_CATCH_UP_TICKS {
                    progress += rng.random_range(0.0..config.progress_step_max);
                    if progress > 100.0 {
                        progress = 0.0;
                    }
                    timers.next_progress_at = timers.next_progress_at.saturating_add(config.progress_interval_ms);
                    fired += 1;
                }
                if timers.next_progress_at <= now {
                    tracing::debug!(block_id = %id, "progress timer fell behind, rescheduled");
                    timers.next_progress_at = now.saturating_add(config.progress_interval_ms);
                }
                data.progress = Some(progress);
            }

            if timers.next_metrics_at <= now {
                let mut executions = block
                    .data
                    .metrics
                    .get("executions")
                    .and_then(MetricValue::as_f64)
                    .unwrap_or(0.0);
                let mut metrics = BTreeMap::new();
                let mut fired = 0;
                while timers.next_metrics_at <= now && fired < MAX_CATCH_UP_TICKS {
                    executions += f64::from(rng.random_range(0..3_u32));
                    let uptime = format!("{}h {}m", rng.random_range(0..24_u32), rng.random_range(0..60_u32));
                    metrics.insert("executions".to_string(), MetricValue::Number(executions));
                    metrics.insert("uptime".to_string(), MetricValue::Text(uptime));
                    metrics.insert("cpuUsage".to_string(), MetricValue::Number(f64::from(rng.random_range(0..100_u32))));
                    metrics
                        .insert("memoryUsage".to_string(), MetricValue::Number(f64::from(rng.random_range(0..1000_u32))));
                    timers.next_metrics_at = timers.next_metrics_at.saturating_add(config.metrics_interval_ms);
                    fired += 1;
                }
                if timers.next_metrics_at <= now {
                    tracing::debug!(block_id = %id, "metrics timer fell behind, rescheduled");
                    timers.next_metrics_at = now.saturating_add(config.metrics_interval_ms);
                }
                data.metrics = Some(metrics);
            }

            if data != BlockDataPatch::default() {
                updates.push((*id, BlockPatch::data(data)));
            }
        }

        for (id, patch) in &updates {
            if let Err(e) = graph.apply_patch(id, patch) {
                tracing::warn!(block_id = %id, error = %e, "telemetry update rejected");
            }
        }
        updates
    }

    /// Cancel the timers of one block.
    pub fn cancel(&mut self, id: &BlockId) {
        if self.timers.remove(id).is_some() {
            tracing::debug!(block_id = %id, "telemetry timers cancelled");
        }
    }

    /// Cancel every timer.
    pub fn cancel_all(&mut self) {
        if !self.timers.is_empty() {
            tracing::debug!(count = self.timers.len(), "all telemetry timers cancelled");
        }
        self.timers.clear();
    }

    /// Whether block `id` currently has running timers.
    #[must_use]
    pub fn is_running(&self, id: &BlockId) -> bool {
        self.timers.contains_key(id)
    }

    /// Number of blocks with running timers.
    #[must_use]
    pub fn active_timers(&self) -> usize {
        self.timers.len()
    }

    #[must_use]
    pub fn config(&self) -> TelemetryConfig {
        self.config
    }
}

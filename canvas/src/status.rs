//! Block lifecycle state machine.
//!
//! ```text
//! idle ──start──▶ active ──stop──▶ paused ──start──▶ active
//!                   │
//!              (processing) ──stop──▶ paused
//! any ──fault──▶ error
//! ```
//!
//! `error` accepts no further start/stop; leaving it requires an explicit
//! status patch from the host (`{"status": "idle"}`).

#[cfg(test)]
#[path = "status_test.rs"]
mod status_test;

use serde::{Deserialize, Serialize};

/// Runtime status of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockStatus {
    #[default]
    Idle,
    Active,
    Processing,
    Paused,
    Error,
}

/// An input to the status machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusEvent {
    Start,
    Stop,
    /// Externally raised failure. The core never raises this on its own.
    Fault,
}

impl BlockStatus {
    /// The status reached by applying `event`, or `None` if the transition is not allowed.
    #[must_use]
    pub fn transition(self, event: StatusEvent) -> Option<BlockStatus> {
        match (self, event) {
            (_, StatusEvent::Fault) => Some(Self::Error),
            (Self::Idle | Self::Paused, StatusEvent::Start) => Some(Self::Active),
            (Self::Active | Self::Processing, StatusEvent::Stop) => Some(Self::Paused),
            _ => None,
        }
    }

    /// Whether telemetry runs for a block in this status.
    #[must_use]
    pub fn is_running(self) -> bool {
        self == Self::Active
    }

    /// Lowercase name, as shown on the status badge.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Active => "active",
            Self::Processing => "processing",
            Self::Paused => "paused",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for BlockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

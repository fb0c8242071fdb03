//! Watcher configuration and state types.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::WatcherError;

/// Configuration for a watcher instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// First block to scan (the initial cursor).
    pub from_block: u64,
    /// Blocks subtracted from the chain head before scanning.
    pub confirmation_latency: u64,
    /// Maximum `getLogs` range width. `None` or `0` = one query per cycle.
    pub chunk_size: Option<u64>,
    /// Dump raw logs that fail to decode.
    pub debug: bool,
    /// Interval between scheduler ticks (milliseconds).
    pub poll_interval_ms: u64,
    /// Advance the cursor even when the cycle's log fetch failed.
    ///
    /// `true` keeps the watcher from ever stalling but can skip the logs of a
    /// range whose fetch failed. `false` leaves the cursor in place so the
    /// next cycle rescans the same range.
    pub advance_on_fetch_failure: bool,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            from_block: 0,
            confirmation_latency: 1,
            chunk_size: None,
            debug: false,
            poll_interval_ms: 1_000,
            advance_on_fetch_failure: true,
        }
    }
}

impl WatcherConfig {
    /// Chunk size as the range planner expects it (0 = unbounded).
    pub fn effective_chunk_size(&self) -> u64 {
        self.chunk_size.unwrap_or(0)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<(), WatcherError> {
        if self.poll_interval_ms == 0 {
            return Err(WatcherError::Config("poll_interval_ms must be > 0".into()));
        }
        Ok(())
    }
}

/// Runtime state of the poll cycle controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatcherState {
    /// No cycle in flight.
    Idle,
    /// A cycle holds the scheduler guard.
    Running,
}

impl std::fmt::Display for WatcherState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_fills_defaults() {
        let cfg: WatcherConfig =
            serde_json::from_str(r#"{ "from_block": 500, "chunk_size": 100 }"#).unwrap();
        assert_eq!(cfg.from_block, 500);
        assert_eq!(cfg.effective_chunk_size(), 100);
        assert_eq!(cfg.confirmation_latency, 1);
        assert!(cfg.advance_on_fetch_failure);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let cfg = WatcherConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
        assert!(WatcherConfig::default().validate().is_ok());
    }
}

//! Fluent builder API for watcher configuration.
//!
//! # Example
//!
//! ```rust
//! use chainwatch_core::WatcherBuilder;
//!
//! let config = WatcherBuilder::new()
//!     .from_block(19_000_000)
//!     .confirmation_latency(12)
//!     .chunk_size(500)
//!     .build_config();
//! assert_eq!(config.effective_chunk_size(), 500);
//! ```

use crate::config::WatcherConfig;

/// Fluent builder for [`WatcherConfig`].
#[derive(Default)]
pub struct WatcherBuilder {
    config: WatcherConfig,
}

impl WatcherBuilder {
    pub fn new() -> Self {
        Self {
            config: WatcherConfig::default(),
        }
    }

    /// Set the start block (initial cursor).
    pub fn from_block(mut self, block: u64) -> Self {
        self.config.from_block = block;
        self
    }

    /// Set confirmation latency (blocks behind head before scanning).
    pub fn confirmation_latency(mut self, blocks: u64) -> Self {
        self.config.confirmation_latency = blocks;
        self
    }

    /// Set the maximum number of blocks per `getLogs` query. 0 disables chunking.
    pub fn chunk_size(mut self, size: u64) -> Self {
        self.config.chunk_size = Some(size);
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Keep the cursor in place when a cycle's log fetch fails.
    pub fn strict_cursor(mut self) -> Self {
        self.config.advance_on_fetch_failure = false;
        self
    }

    pub fn build_config(self) -> WatcherConfig {
        self.config
    }
}

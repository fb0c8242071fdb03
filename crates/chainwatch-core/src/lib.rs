//! chainwatch-core — polling, chunking, decoding and ordered dispatch of
//! contract events.
//!
//! # Architecture
//!
//! ```text
//! ticker → SchedulerGuard → Watcher::run_cycle_once
//!                              ├── ContractRegistry  (contract type → addresses, signatures, ABI)
//!                              ├── LogFetcher        (range plan → sequential getLogs)
//!                              ├── route_log         (ABI decode per watching registration)
//!                              └── Dispatcher        (FIFO queue → handlers by route key)
//! ```
//!
//! The chain query and ABI decode primitives are supplied through the
//! [`ChainClient`] and [`LogDecoder`] traits.

pub mod builder;
pub mod config;
pub mod decoder;
pub mod dispatcher;
pub mod error;
pub mod fetcher;
pub mod guard;
pub mod handler;
pub mod range;
pub mod registry;
pub mod types;
pub mod watcher;

pub use builder::WatcherBuilder;
pub use config::{WatcherConfig, WatcherState};
pub use decoder::LogDecoder;
pub use dispatcher::{DispatchStats, Dispatcher};
pub use error::WatcherError;
pub use fetcher::{ChainClient, FetchOutcome, LogFetcher};
pub use guard::SchedulerGuard;
pub use handler::{EventHandler, HandlerRegistry};
pub use range::BlockRange;
pub use registry::{ContractRegistration, ContractRegistry};
pub use types::{DecodedEvent, DecodedLog, LogFilter, Pattern, RawLog};
pub use watcher::{CycleOutcome, SkipReason, Watcher};

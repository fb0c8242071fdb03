//! The poll cycle controller.
//!
//! Each scheduler tick runs one cycle:
//!   1. skip if the registry is empty
//!   2. `safe_head = head - confirmation_latency`
//!   3. skip if `cursor > safe_head`
//!   4. fetch logs over `[cursor, safe_head]` for every registered address/signature
//!   5. decode each log against the registrations watching its address and
//!      enqueue the results, in fetch order
//!   6. `cursor = safe_head + 1`
//!
//! Once the watcher is destroyed, cycles are skipped without touching the
//! cursor.
//!
//! The scheduler guard keeps cycles from overlapping; a tick that arrives while
//! a cycle is running is dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn, Instrument};

use crate::config::{WatcherConfig, WatcherState};
use crate::decoder::{route_log, LogDecoder};
use crate::dispatcher::{DispatchStats, Dispatcher};
use crate::error::WatcherError;
use crate::fetcher::{ChainClient, LogFetcher};
use crate::guard::SchedulerGuard;
use crate::handler::HandlerRegistry;
use crate::range::BlockRange;
use crate::registry::{all_addresses, all_event_signatures, ContractRegistration, ContractRegistry};
use crate::types::LogFilter;

/// Why a cycle did not scan anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another cycle held the scheduler guard.
    Busy,
    /// Nothing registered yet.
    EmptyRegistry,
    /// The head height query failed.
    HeadUnavailable,
    /// Not enough confirmed blocks past the cursor.
    AwaitingConfirmations { cursor: u64, head: u64 },
    /// The watcher was destroyed; nothing can be dispatched.
    Closed,
}

/// What one call to [`Watcher::run_cycle_once`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Skipped(SkipReason),
    Scanned {
        range: BlockRange,
        /// Raw logs returned by the fetch.
        logs: usize,
        /// Decoded events enqueued for dispatch.
        enqueued: usize,
        fetch_failed: bool,
        /// Cursor after the cycle.
        cursor: u64,
    },
}

impl CycleOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

/// A contract event watcher: one registry, one cursor, one dispatch queue.
pub struct Watcher<C, D: LogDecoder> {
    config: WatcherConfig,
    instance_id: String,
    fetcher: LogFetcher<C>,
    decoder: D,
    registry: ContractRegistry<D::Abi>,
    dispatcher: Dispatcher,
    guard: SchedulerGuard,
    cursor: AtomicU64,
    ticker: Mutex<Option<JoinHandle<()>>>,
    span: tracing::Span,
}

impl<C, D> Watcher<C, D>
where
    C: ChainClient + 'static,
    D: LogDecoder + 'static,
{
    /// Build a watcher and spawn its dispatch consumer. Must be called inside
    /// a Tokio runtime. Scheduling starts with [`init`](Self::init).
    pub fn new(
        config: WatcherConfig,
        client: C,
        decoder: D,
        handlers: HandlerRegistry,
    ) -> Result<Self, WatcherError> {
        config.validate()?;

        let instance_id = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
        let span = tracing::info_span!("chainwatch", instance = %instance_id);
        let dispatcher = span.in_scope(|| Dispatcher::spawn(Arc::new(handlers)));

        Ok(Self {
            cursor: AtomicU64::new(config.from_block),
            fetcher: LogFetcher::new(client),
            decoder,
            registry: ContractRegistry::new(),
            dispatcher,
            guard: SchedulerGuard::new(),
            ticker: Mutex::new(None),
            instance_id,
            span,
            config,
        })
    }

    /// Start the periodic trigger. Each tick attempts one cycle in its own task.
    ///
    /// The instance id used for log correlation is assigned earlier, by
    /// [`new`](Self::new), so the dispatcher's logs carry it too.
    pub fn init(self: &Arc<Self>) {
        let mut ticker = self.ticker.lock().unwrap_or_else(PoisonError::into_inner);
        if ticker.is_some() {
            warn!(instance = %self.instance_id, "watcher already started");
            return;
        }

        let watcher = Arc::clone(self);
        let period = self.config.poll_interval();
        let handle = tokio::spawn(
            async move {
                let mut interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    interval.tick().await;
                    let watcher = Arc::clone(&watcher);
                    tokio::spawn(async move {
                        watcher.run_cycle_once().await;
                    });
                }
            }
            .instrument(self.span.clone()),
        );
        *ticker = Some(handle);

        info!(
            instance = %self.instance_id,
            interval_ms = self.config.poll_interval_ms,
            from_block = self.last_processed_block(),
            "watcher started"
        );
    }

    /// Stop the periodic trigger and close the dispatch queue.
    pub fn destroy(&self) {
        if let Some(handle) = self
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
        self.dispatcher.close();
        info!(instance = %self.instance_id, "watcher stopped");
    }

    /// Insert or merge a registration; effective from the next cycle.
    pub fn update_registry(&self, registration: ContractRegistration<D::Abi>) {
        let addresses = registration
            .addresses
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        let contract_type = registration.contract_type.clone();
        self.registry.update(registration);
        info!(
            instance = %self.instance_id,
            %contract_type,
            %addresses,
            "registry updated"
        );
    }

    pub fn registry(&self) -> Vec<ContractRegistration<D::Abi>> {
        self.registry.snapshot()
    }

    /// The scan cursor: every block below it has been scanned.
    pub fn last_processed_block(&self) -> u64 {
        self.cursor.load(Ordering::Acquire)
    }

    pub fn state(&self) -> WatcherState {
        if self.guard.is_running() {
            WatcherState::Running
        } else {
            WatcherState::Idle
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    pub fn dispatch_stats(&self) -> &DispatchStats {
        self.dispatcher.stats()
    }

    /// Wait until every event enqueued so far has been handled.
    pub async fn flush(&self) {
        self.dispatcher.flush().await;
    }

    /// Run one cycle unless another is in flight.
    pub async fn run_cycle_once(&self) -> CycleOutcome {
        let Some(_permit) = self.guard.try_enter() else {
            debug!(instance = %self.instance_id, "cycle in flight, tick dropped");
            return CycleOutcome::Skipped(SkipReason::Busy);
        };
        if self.dispatcher.is_closed() {
            debug!(instance = %self.instance_id, "watcher destroyed, cycle skipped");
            return CycleOutcome::Skipped(SkipReason::Closed);
        }
        self.cycle().instrument(self.span.clone()).await
    }

    async fn cycle(&self) -> CycleOutcome {
        let registrations = self.registry.snapshot();
        if registrations.is_empty() {
            return CycleOutcome::Skipped(SkipReason::EmptyRegistry);
        }

        let head = match self.fetcher.head_block_number().await {
            Ok(head) => head,
            Err(e) => {
                error!(error = %e, "head block query failed");
                return CycleOutcome::Skipped(SkipReason::HeadUnavailable);
            }
        };

        let cursor = self.last_processed_block();
        let safe_head = match head.checked_sub(self.config.confirmation_latency) {
            Some(safe_head) if cursor <= safe_head => safe_head,
            _ => return CycleOutcome::Skipped(SkipReason::AwaitingConfirmations { cursor, head }),
        };

        info!(from = cursor, to = safe_head, "scanning block range");

        let filter = LogFilter {
            addresses: all_addresses(&registrations),
            event_signatures: all_event_signatures(&registrations),
            from_block: cursor,
            to_block: safe_head,
        };
        let outcome = self
            .fetcher
            .fetch(&filter, self.config.effective_chunk_size())
            .await;
        let fetch_failed = outcome.is_failed();
        let logs = outcome.into_logs();

        let mut enqueued = 0;
        for log in &logs {
            if log.removed {
                continue;
            }
            for event in route_log(&self.decoder, &registrations, log, self.config.debug) {
                debug!(
                    contract_type = %event.contract_type,
                    event = %event.event_name,
                    block = event.block_number,
                    log_index = event.log_index,
                    "decoded log"
                );
                match self.dispatcher.enqueue(event, log.clone()) {
                    Ok(()) => enqueued += 1,
                    Err(e) => warn!(error = %e, "event not enqueued"),
                }
            }
        }

        if fetch_failed && !self.config.advance_on_fetch_failure {
            warn!(cursor, "log fetch failed, cursor held");
        } else {
            self.cursor.fetch_max(safe_head.saturating_add(1), Ordering::AcqRel);
        }

        let cursor = self.last_processed_block();
        info!(logs = logs.len(), enqueued, cursor, "cycle complete");

        CycleOutcome::Scanned {
            range: BlockRange::new(filter.from_block, filter.to_block),
            logs: logs.len(),
            enqueued,
            fetch_failed,
            cursor,
        }
    }
}

//! Ordered event dispatch.
//!
//! A single consumer task drains an unbounded FIFO queue. For each event it
//! resolves the handlers bound to the event's route key, runs them
//! concurrently and waits for all of them to settle before taking the next
//! item. Handler failures (errors or panics) are logged and counted; they
//! never hold back or drop later events.
//!
//! Closing the dispatcher rejects new items and discards whatever is still
//! queued. Handlers of the event currently being dispatched run to completion.

use futures::future::join_all;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, Instrument};

use crate::error::WatcherError;
use crate::handler::HandlerRegistry;
use crate::types::{DecodedEvent, RawLog};

enum QueueItem {
    Event(Box<(DecodedEvent, RawLog)>),
    /// Completes once every item queued before it has been dispatched.
    Flush(oneshot::Sender<()>),
}

/// Counters maintained by the consumer task.
#[derive(Debug, Default)]
pub struct DispatchStats {
    dispatched: AtomicU64,
    unrouted: AtomicU64,
    handler_failures: AtomicU64,
}

impl DispatchStats {
    /// Events taken off the queue.
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Events with no bound handler.
    pub fn unrouted(&self) -> u64 {
        self.unrouted.load(Ordering::Relaxed)
    }

    /// Handler invocations that returned an error or panicked.
    pub fn handler_failures(&self) -> u64 {
        self.handler_failures.load(Ordering::Relaxed)
    }
}

/// Handle to the dispatch queue and its consumer task.
pub struct Dispatcher {
    tx: Mutex<Option<mpsc::UnboundedSender<QueueItem>>>,
    shutdown_tx: watch::Sender<bool>,
    consumer: Mutex<Option<JoinHandle<()>>>,
    stats: Arc<DispatchStats>,
}

impl Dispatcher {
    /// Spawn the consumer task. Must be called inside a Tokio runtime.
    pub fn spawn(handlers: Arc<HandlerRegistry>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let stats = Arc::new(DispatchStats::default());

        let consumer = tokio::spawn(
            consume(rx, shutdown_rx, handlers, Arc::clone(&stats)).in_current_span(),
        );

        Self {
            tx: Mutex::new(Some(tx)),
            shutdown_tx,
            consumer: Mutex::new(Some(consumer)),
            stats,
        }
    }

    /// Append an event to the queue.
    pub fn enqueue(&self, event: DecodedEvent, log: RawLog) -> Result<(), WatcherError> {
        self.send(QueueItem::Event(Box::new((event, log))))
    }

    /// Wait until every event enqueued so far has been dispatched.
    ///
    /// Returns immediately if the dispatcher is closed.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.send(QueueItem::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }

    /// Stop accepting items; queued items are discarded.
    pub fn close(&self) {
        let _ = self.shutdown_tx.send(true);
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    /// Close and wait for the consumer task to exit.
    pub async fn shutdown(&self) {
        self.close();
        let consumer = self
            .consumer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = consumer {
            let _ = handle.await;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).is_none()
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    fn send(&self, item: QueueItem) -> Result<(), WatcherError> {
        let guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = guard.as_ref().ok_or(WatcherError::Closed)?;
        tx.send(item).map_err(|_| WatcherError::Closed)
    }
}

async fn consume(
    mut rx: mpsc::UnboundedReceiver<QueueItem>,
    mut shutdown_rx: watch::Receiver<bool>,
    handlers: Arc<HandlerRegistry>,
    stats: Arc<DispatchStats>,
) {
    loop {
        tokio::select! {
            biased;

            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }

            item = rx.recv() => match item {
                Some(QueueItem::Event(item)) => {
                    let (event, log) = *item;
                    dispatch(&handlers, &stats, event, log).await;
                }
                Some(QueueItem::Flush(done)) => {
                    let _ = done.send(());
                }
                None => break,
            },
        }
    }
    info!("dispatcher complete");
}

async fn dispatch(handlers: &HandlerRegistry, stats: &DispatchStats, event: DecodedEvent, log: RawLog) {
    stats.dispatched.fetch_add(1, Ordering::Relaxed);

    let pattern = event.pattern();
    let bound = handlers.resolve(&pattern);
    if bound.is_empty() {
        stats.unrouted.fetch_add(1, Ordering::Relaxed);
        info!(route = %pattern, "handler not found");
        return;
    }

    let event = Arc::new(event);
    let log = Arc::new(log);
    let tasks = bound.iter().map(|handler| {
        let handler = Arc::clone(handler);
        let event = Arc::clone(&event);
        let log = Arc::clone(&log);
        tokio::spawn(async move { handler.handle(&event, &log).await }.in_current_span())
    });
    let results = join_all(tasks).await;

    for (handler, result) in bound.iter().zip(results) {
        let reason = match result {
            Ok(Ok(())) => continue,
            Ok(Err(e)) => e.to_string(),
            Err(join_err) => format!("handler task aborted: {join_err}"),
        };
        stats.handler_failures.fetch_add(1, Ordering::Relaxed);
        let err = WatcherError::Handler {
            handler: handler.name().to_string(),
            reason,
        };
        error!(
            route = %pattern,
            block = event.block_number,
            log_index = event.log_index,
            error = %err,
            "handler failed"
        );
    }
}

//! Log fetcher — runs the range plan against the chain query capability.
//!
//! Chunks are queried one after another and their logs concatenated in chunk
//! order. Adjacent chunks share their boundary block; logs of that block
//! already returned by the earlier chunk are dropped from the later one. A failure in any chunk fails the whole fetch; [`LogFetcher::fetch`]
//! logs it and reports [`FetchOutcome::Failed`] instead of propagating it.
//! There is no retry at this level.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::WatcherError;
use crate::range;
use crate::types::{LogFilter, RawLog};

/// The chain query capability the engine consumes.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Current chain head height.
    async fn block_number(&self) -> Result<u64, WatcherError>;

    /// Logs matching `filter` within `[filter.from_block, filter.to_block]`.
    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, WatcherError>;
}

#[async_trait]
impl<T: ChainClient + ?Sized> ChainClient for Arc<T> {
    async fn block_number(&self) -> Result<u64, WatcherError> {
        (**self).block_number().await
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, WatcherError> {
        (**self).get_logs(filter).await
    }
}

/// Result of one fetch over a full cycle range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Every chunk was queried successfully.
    Complete(Vec<RawLog>),
    /// Some chunk failed; no logs are reported for the cycle.
    Failed,
}

impl FetchOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// The fetched logs; empty on failure.
    pub fn into_logs(self) -> Vec<RawLog> {
        match self {
            Self::Complete(logs) => logs,
            Self::Failed => vec![],
        }
    }
}

/// Wraps a [`ChainClient`] and adds chunked fetching.
pub struct LogFetcher<C> {
    client: C,
}

impl<C: ChainClient> LogFetcher<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Fetch the current chain head block number.
    pub async fn head_block_number(&self) -> Result<u64, WatcherError> {
        self.client.block_number().await
    }

    /// Fetch all logs in `[filter.from_block, filter.to_block]`, one query per
    /// planned chunk. The first failing chunk aborts the fetch.
    pub async fn try_fetch(
        &self,
        filter: &LogFilter,
        chunk_size: u64,
    ) -> Result<Vec<RawLog>, WatcherError> {
        let chunks = range::plan(filter.from_block, filter.to_block, chunk_size);
        let mut all_logs = Vec::new();
        // (block, log index) of logs in the previous chunk's last block
        let mut boundary: HashSet<(u64, u64)> = HashSet::new();
        for chunk in chunks {
            let logs = self
                .client
                .get_logs(&filter.with_range(chunk.from, chunk.to))
                .await?;
            let fetched = logs.len();
            let logs: Vec<RawLog> = logs
                .into_iter()
                .filter(|l| {
                    l.block_number != chunk.from
                        || !boundary.contains(&(l.block_number, l.log_index))
                })
                .collect();
            tracing::debug!(
                from = chunk.from,
                to = chunk.to,
                logs = logs.len(),
                repeated = fetched - logs.len(),
                "chunk fetched"
            );
            boundary = logs
                .iter()
                .filter(|l| l.block_number == chunk.to)
                .map(|l| (l.block_number, l.log_index))
                .collect();
            all_logs.extend(logs);
        }
        Ok(all_logs)
    }

    /// Like [`try_fetch`](Self::try_fetch) but never fails: errors are logged
    /// and reported as [`FetchOutcome::Failed`].
    pub async fn fetch(&self, filter: &LogFilter, chunk_size: u64) -> FetchOutcome {
        match self.try_fetch(filter, chunk_size).await {
            Ok(logs) => FetchOutcome::Complete(logs),
            Err(e) => {
                tracing::error!(
                    from = filter.from_block,
                    to = filter.to_block,
                    error = %e,
                    "log fetch failed"
                );
                FetchOutcome::Failed
            }
        }
    }
}

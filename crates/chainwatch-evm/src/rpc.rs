//! HTTP JSON-RPC chain client backed by `reqwest`.
//!
//! One HTTP request per call and no retry: a failed query surfaces as
//! [`WatcherError::Rpc`] and the poll cycle decides what to do with it.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use chainwatch_core::{ChainClient, LogFilter, RawLog, WatcherError};

use crate::request::{logs_from_json, logs_params, parse_hex_u64, JsonRpcRequest, JsonRpcResponse};
use crate::signature::event_topics;

/// Configuration for [`HttpChainClient`].
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub request_timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Chain query capability over an HTTP JSON-RPC endpoint.
pub struct HttpChainClient {
    url: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl HttpChainClient {
    /// Create a client for the given JSON-RPC endpoint URL.
    pub fn new(url: impl Into<String>, config: HttpClientConfig) -> Result<Self, WatcherError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| WatcherError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: url.into(),
            http,
            next_id: AtomicU64::new(1),
        })
    }

    /// Create with default configuration.
    pub fn default_for(url: impl Into<String>) -> Result<Self, WatcherError> {
        Self::new(url, HttpClientConfig::default())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, WatcherError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let req = JsonRpcRequest::new(id, method, params);

        let resp = self
            .http
            .post(&self.url)
            .json(&req)
            .send()
            .await
            .map_err(|e| WatcherError::Rpc(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(WatcherError::Rpc(format!("HTTP {status}: {body}")));
        }

        resp.json::<JsonRpcResponse>()
            .await
            .map_err(|e| WatcherError::Rpc(e.to_string()))?
            .into_result()
    }
}

#[async_trait]
impl ChainClient for HttpChainClient {
    async fn block_number(&self) -> Result<u64, WatcherError> {
        let result = self.call("eth_blockNumber", vec![]).await?;
        let hex = result
            .as_str()
            .ok_or_else(|| WatcherError::Rpc(format!("unexpected eth_blockNumber result: {result}")))?;
        parse_hex_u64(hex)
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, WatcherError> {
        let topics = event_topics(&filter.event_signatures)?;
        let params = logs_params(filter, &topics);
        debug!(
            url = %self.url,
            from = filter.from_block,
            to = filter.to_block,
            addresses = filter.addresses.len(),
            "eth_getLogs"
        );
        let result = self.call("eth_getLogs", vec![params]).await?;
        logs_from_json(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_endpoint_is_an_rpc_error() {
        let client = HttpChainClient::new(
            "http://127.0.0.1:9",
            HttpClientConfig {
                request_timeout: Duration::from_millis(500),
            },
        )
        .unwrap();

        assert!(client.block_number().await.unwrap_err().is_rpc());
    }

    #[tokio::test]
    async fn bad_signature_fails_before_any_request() {
        let client = HttpChainClient::default_for("http://127.0.0.1:9").unwrap();
        let filter = LogFilter {
            addresses: vec!["0xaaa".into()],
            event_signatures: vec!["Transfer(address,".into()],
            from_block: 0,
            to_block: 10,
        };
        let err = client.get_logs(&filter).await.unwrap_err();
        assert!(matches!(err, WatcherError::InvalidSignature { .. }));
    }
}

//! JSON-RPC 2.0 wire types and the node's log representation.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use chainwatch_core::{LogFilter, RawLog, WatcherError};

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    pub params: Vec<Value>,
    pub id: u64,
}

impl<'a> JsonRpcRequest<'a> {
    pub fn new(id: u64, method: &'a str, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
            id,
        }
    }
}

/// The error object of a failed call.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

/// A JSON-RPC 2.0 response; only the outcome is read.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// The result value, or the node's error as [`WatcherError::Rpc`].
    pub fn into_result(self) -> Result<Value, WatcherError> {
        match self.error {
            Some(err) => Err(WatcherError::Rpc(format!(
                "JSON-RPC error {}: {}",
                err.code, err.message
            ))),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// A log as returned by `eth_getLogs`: quantities are hex strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    pub block_number: String,
    #[serde(default)]
    pub block_hash: Option<String>,
    #[serde(default)]
    pub transaction_hash: Option<String>,
    pub transaction_index: String,
    pub log_index: String,
    #[serde(default)]
    pub removed: Option<bool>,
}

impl TryFrom<NodeLog> for RawLog {
    type Error = WatcherError;

    fn try_from(log: NodeLog) -> Result<Self, Self::Error> {
        Ok(RawLog {
            block_number: parse_hex_u64(&log.block_number)?,
            transaction_index: parse_hex_u64(&log.transaction_index)?,
            log_index: parse_hex_u64(&log.log_index)?,
            address: log.address,
            data: log.data,
            topics: log.topics,
            transaction_hash: log.transaction_hash,
            block_hash: log.block_hash,
            removed: log.removed.unwrap_or(false),
        })
    }
}

/// Convert an `eth_getLogs` result array.
pub fn logs_from_json(result: Value) -> Result<Vec<RawLog>, WatcherError> {
    let logs: Vec<NodeLog> = serde_json::from_value(result)
        .map_err(|e| WatcherError::Rpc(format!("malformed eth_getLogs result: {e}")))?;
    logs.into_iter().map(RawLog::try_from).collect()
}

/// `eth_getLogs` filter object. `topics` are the topic0 alternatives; an empty
/// set leaves topics unfiltered.
pub fn logs_params(filter: &LogFilter, topics: &[String]) -> Value {
    let mut params = json!({
        "address": filter.addresses,
        "fromBlock": format!("{:#x}", filter.from_block),
        "toBlock": format!("{:#x}", filter.to_block),
    });
    if !topics.is_empty() {
        params["topics"] = json!([topics]);
    }
    params
}

/// Parse a hex-encoded quantity (with or without `0x`) to u64.
pub fn parse_hex_u64(s: &str) -> Result<u64, WatcherError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(digits, 16)
        .map_err(|e| WatcherError::Rpc(format!("invalid hex quantity '{s}': {e}")))
}

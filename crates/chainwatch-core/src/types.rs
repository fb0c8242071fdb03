//! Shared types for the watch pipeline.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// ─── RawLog ───────────────────────────────────────────────────────────────────

/// An on-chain log record as returned by the chain query capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLog {
    /// Emitting contract address (`0x…`, any case).
    pub address: String,
    /// ABI-encoded non-indexed parameters (`0x…`).
    pub data: String,
    /// `topics[0]` is the event selector; the rest are indexed parameters.
    pub topics: Vec<String>,
    pub block_number: u64,
    pub transaction_index: u64,
    pub log_index: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<String>,
    /// Set by the node when the log was dropped by a reorg.
    #[serde(default)]
    pub removed: bool,
}

impl RawLog {
    /// The event selector, if present.
    pub fn topic0(&self) -> Option<&str> {
        self.topics.first().map(|s| s.as_str())
    }

    /// Returns `true` if the log was emitted by `address` (case-insensitive).
    pub fn is_from(&self, address: &str) -> bool {
        self.address.eq_ignore_ascii_case(address)
    }
}

// ─── LogFilter ────────────────────────────────────────────────────────────────

/// One `getLogs` query: an address set, a signature set and an inclusive range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFilter {
    pub addresses: Vec<String>,
    /// Event signatures as registered (e.g. `"Transfer(address,address,uint256)"`).
    pub event_signatures: Vec<String>,
    pub from_block: u64,
    pub to_block: u64,
}

impl LogFilter {
    /// Same address/signature set, different block range.
    pub fn with_range(&self, from_block: u64, to_block: u64) -> Self {
        Self {
            addresses: self.addresses.clone(),
            event_signatures: self.event_signatures.clone(),
            from_block,
            to_block,
        }
    }
}

// ─── Decoded events ───────────────────────────────────────────────────────────

/// Output of the ABI decode primitive: the event name and its named arguments
/// in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedLog {
    pub event_name: String,
    pub args: IndexMap<String, Value>,
}

/// A decoded event bound to the registration it was decoded against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedEvent {
    pub contract_type: String,
    pub event_name: String,
    pub args: IndexMap<String, Value>,
    pub address: String,
    pub block_number: u64,
    pub transaction_index: u64,
    pub log_index: u64,
    pub topics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
}

impl DecodedEvent {
    pub fn new(contract_type: impl Into<String>, decoded: DecodedLog, log: &RawLog) -> Self {
        Self {
            contract_type: contract_type.into(),
            event_name: decoded.event_name,
            args: decoded.args,
            address: log.address.clone(),
            block_number: log.block_number,
            transaction_index: log.transaction_index,
            log_index: log.log_index,
            topics: log.topics.clone(),
            transaction_hash: log.transaction_hash.clone(),
        }
    }

    /// Get an argument by name.
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.get(name)
    }

    /// The routing pattern of this event.
    pub fn pattern(&self) -> Pattern {
        Pattern::new(self.contract_type.clone(), self.event_name.clone())
    }
}

// ─── Pattern ──────────────────────────────────────────────────────────────────

/// `(contractType, eventName)` — what handlers are bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pattern {
    pub contract_type: String,
    pub event_name: String,
}

impl Pattern {
    pub fn new(contract_type: impl Into<String>, event_name: impl Into<String>) -> Self {
        Self {
            contract_type: contract_type.into(),
            event_name: event_name.into(),
        }
    }

    /// Canonical route key: keys sorted, `key=value` pairs joined with `,`.
    ///
    /// `contractType=ERC20_TOKEN,eventName=Transfer`
    pub fn route(&self) -> String {
        let fields: BTreeMap<&str, &str> = [
            ("contractType", self.contract_type.as_str()),
            ("eventName", self.event_name.as_str()),
        ]
        .into_iter()
        .collect();

        fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.route())
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn log() -> RawLog {
        RawLog {
            address: "0xAbCdEf".into(),
            data: "0x".into(),
            topics: vec!["0xddf2".into(), "0x01".into()],
            block_number: 10,
            transaction_index: 2,
            log_index: 7,
            transaction_hash: Some("0xtx".into()),
            block_hash: None,
            removed: false,
        }
    }

    #[test]
    fn raw_log_address_match_is_case_insensitive() {
        let log = log();
        assert!(log.is_from("0xabcdef"));
        assert!(!log.is_from("0x111111"));
        assert_eq!(log.topic0(), Some("0xddf2"));
    }

    #[test]
    fn route_is_sorted_and_stable() {
        let p = Pattern::new("ERC20_TOKEN", "Transfer");
        assert_eq!(p.route(), "contractType=ERC20_TOKEN,eventName=Transfer");
        assert_eq!(p.to_string(), p.route());
    }

    #[test]
    fn decoded_event_carries_provenance() {
        let mut args = IndexMap::new();
        args.insert("from".to_string(), Value::String("0x1".into()));
        args.insert("value".to_string(), Value::String("5".into()));
        let decoded = DecodedLog {
            event_name: "Transfer".into(),
            args,
        };
        let event = DecodedEvent::new("ERC20_TOKEN", decoded, &log());

        assert_eq!(event.block_number, 10);
        assert_eq!(event.log_index, 7);
        assert_eq!(event.transaction_hash.as_deref(), Some("0xtx"));
        assert_eq!(event.arg("value"), Some(&Value::String("5".into())));
        let names: Vec<_> = event.args.keys().cloned().collect();
        assert_eq!(names, vec!["from", "value"]);
        assert_eq!(event.pattern(), Pattern::new("ERC20_TOKEN", "Transfer"));
    }

    #[test]
    fn raw_log_json_uses_camel_case() {
        let json = serde_json::to_value(log()).unwrap();
        assert_eq!(json["blockNumber"], 10);
        assert_eq!(json["logIndex"], 7);
        assert!(json.get("blockHash").is_none());
    }
}

//! `AbiLogDecoder`: the [`LogDecoder`] implementation for EVM contracts.
//!
//! The ABI is an alloy [`JsonAbi`]. A log is matched to the non-anonymous
//! event whose selector equals `topics[0]`; indexed parameters are read from
//! `topics[1..]` and the rest are ABI-decoded from the data payload.

use alloy_core::dyn_abi::{DynSolType, DynSolValue, Specifier};
use alloy_json_abi::{Event, EventParam, JsonAbi};
use alloy_primitives::B256;
use indexmap::IndexMap;
use serde_json::Value;
use std::path::Path;

use chainwatch_core::{DecodedLog, LogDecoder, RawLog, WatcherError};

use crate::normalizer;

/// Decodes raw EVM logs against a JSON ABI.
#[derive(Debug, Default, Clone, Copy)]
pub struct AbiLogDecoder;

impl AbiLogDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl LogDecoder for AbiLogDecoder {
    type Abi = JsonAbi;

    fn decode(&self, abi: &JsonAbi, log: &RawLog) -> Result<DecodedLog, WatcherError> {
        let topic0 = log.topic0().ok_or_else(|| WatcherError::Decode {
            reason: "log has no topics".into(),
        })?;
        let selector = parse_word(topic0)?;

        let event = abi
            .events()
            .find(|e| !e.anonymous && e.selector() == selector)
            .ok_or_else(|| WatcherError::NoMatchingEvent {
                topic0: topic0.to_string(),
            })?;

        decode_event(event, log)
    }
}

/// Decode `log` as an instance of `event`. Arguments keep declaration order.
pub fn decode_event(event: &Event, log: &RawLog) -> Result<DecodedLog, WatcherError> {
    let indexed_count = event.inputs.iter().filter(|p| p.indexed).count();
    let topics = log.topics.get(1..).unwrap_or_default();
    if topics.len() != indexed_count {
        return Err(WatcherError::Decode {
            reason: format!(
                "{} expects {indexed_count} indexed topics, log has {}",
                event.name,
                topics.len()
            ),
        });
    }

    let mut indexed = Vec::with_capacity(indexed_count);
    for (param, topic) in event.inputs.iter().filter(|p| p.indexed).zip(topics) {
        indexed.push(decode_topic(topic, &resolve(param)?)?);
    }

    let body_types = event
        .inputs
        .iter()
        .filter(|p| !p.indexed)
        .map(resolve)
        .collect::<Result<Vec<_>, _>>()?;
    let body = decode_data(&log.data, body_types)?;

    let mut indexed = indexed.into_iter();
    let mut body = body.into_iter();
    let mut args = IndexMap::with_capacity(event.inputs.len());
    for (i, param) in event.inputs.iter().enumerate() {
        let value = if param.indexed { indexed.next() } else { body.next() };
        let name = if param.name.is_empty() {
            i.to_string()
        } else {
            param.name.clone()
        };
        args.insert(name, value.unwrap_or(Value::Null));
    }

    Ok(DecodedLog {
        event_name: event.name.clone(),
        args,
    })
}

fn resolve(param: &EventParam) -> Result<DynSolType, WatcherError> {
    param.resolve().map_err(|e| WatcherError::Decode {
        reason: format!("unsupported parameter type '{}': {e}", param.ty),
    })
}

/// Decode a single indexed topic.
///
/// Value types are stored as their 32-byte ABI encoding and decode normally.
/// Reference types (string, bytes, arrays, tuples) are stored as the keccak256
/// of their encoding; the original value is unrecoverable and the hash is
/// returned as hex.
fn decode_topic(topic: &str, ty: &DynSolType) -> Result<Value, WatcherError> {
    let word = parse_word(topic)?;
    match ty {
        DynSolType::String
        | DynSolType::Bytes
        | DynSolType::Array(_)
        | DynSolType::FixedArray(..)
        | DynSolType::Tuple(_) => Ok(normalizer::hex_value(word.as_slice())),
        _ => ty
            .abi_decode(word.as_slice())
            .map(normalizer::normalize)
            .map_err(|e| WatcherError::Decode {
                reason: format!("topic decode: {e}"),
            }),
    }
}

/// Decode the non-indexed parameters from the data payload.
fn decode_data(data: &str, types: Vec<DynSolType>) -> Result<Vec<Value>, WatcherError> {
    if types.is_empty() {
        return Ok(vec![]);
    }
    let bytes = decode_hex(data)?;
    let decoded = DynSolType::Tuple(types)
        .abi_decode_sequence(&bytes)
        .map_err(|e| WatcherError::Decode {
            reason: e.to_string(),
        })?;

    let values = match decoded {
        DynSolValue::Tuple(vals) => vals,
        other => vec![other],
    };
    Ok(values.into_iter().map(normalizer::normalize).collect())
}

fn parse_word(topic: &str) -> Result<B256, WatcherError> {
    topic.parse::<B256>().map_err(|e| WatcherError::Decode {
        reason: format!("invalid topic '{topic}': {e}"),
    })
}

fn decode_hex(data: &str) -> Result<Vec<u8>, WatcherError> {
    let stripped = data.strip_prefix("0x").unwrap_or(data);
    hex::decode(stripped).map_err(|e| WatcherError::Decode {
        reason: format!("invalid data hex: {e}"),
    })
}

/// Parse a JSON ABI document (the array form emitted by solc).
pub fn parse_abi(json: &str) -> Result<JsonAbi, WatcherError> {
    serde_json::from_str(json).map_err(|e| WatcherError::Config(format!("invalid ABI: {e}")))
}

/// Read and parse a JSON ABI file.
pub fn load_abi(path: impl AsRef<Path>) -> Result<JsonAbi, WatcherError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .map_err(|e| WatcherError::Config(format!("cannot read ABI {}: {e}", path.display())))?;
    parse_abi(&json)
}

/// Names of every event declared in `abi`, deduplicated across overloads.
pub fn event_names(abi: &JsonAbi) -> Vec<String> {
    abi.events.keys().cloned().collect()
}

/// Canonical signatures of every non-anonymous event in `abi`.
pub fn event_signatures(abi: &JsonAbi) -> Vec<String> {
    abi.events()
        .filter(|e| !e.anonymous)
        .map(|e| e.signature())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ERC20_ABI: &str = r#"[
        {"type":"event","name":"Transfer","anonymous":false,"inputs":[
            {"name":"from","type":"address","indexed":true},
            {"name":"to","type":"address","indexed":true},
            {"name":"value","type":"uint256","indexed":false}]},
        {"type":"event","name":"Approval","anonymous":false,"inputs":[
            {"name":"owner","type":"address","indexed":true},
            {"name":"spender","type":"address","indexed":true},
            {"name":"value","type":"uint256","indexed":false}]},
        {"type":"function","name":"totalSupply","stateMutability":"view",
            "inputs":[],"outputs":[{"name":"","type":"uint256"}]}
    ]"#;

    fn transfer_log() -> RawLog {
        RawLog {
            address: "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".into(),
            data: "0x00000000000000000000000000000000000000000000000000000000000f4240".into(),
            topics: vec![
                "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef".into(),
                "0x000000000000000000000000d8da6bf26964af9d7eed9e03e53415d37aa96045".into(),
                "0x000000000000000000000000ab5801a7d398351b8be11c439e05c5b3259aec9b".into(),
            ],
            block_number: 19_000_000,
            transaction_index: 3,
            log_index: 7,
            transaction_hash: None,
            block_hash: None,
            removed: false,
        }
    }

    #[test]
    fn decodes_erc20_transfer() {
        let abi = parse_abi(ERC20_ABI).unwrap();
        let decoded = AbiLogDecoder.decode(&abi, &transfer_log()).unwrap();

        assert_eq!(decoded.event_name, "Transfer");
        let names: Vec<_> = decoded.args.keys().map(String::as_str).collect();
        assert_eq!(names, ["from", "to", "value"]);
        assert_eq!(
            decoded.args["from"],
            json!("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045")
        );
        assert_eq!(
            decoded.args["to"],
            json!("0xAb5801a7D398351b8bE11C439e05C5B3259aeC9B")
        );
        assert_eq!(decoded.args["value"], json!(1_000_000));
    }

    #[test]
    fn unknown_selector_is_a_mismatch() {
        let abi = parse_abi(ERC20_ABI).unwrap();
        let mut log = transfer_log();
        log.topics[0] = format!("0x{}", "11".repeat(32));

        let err = AbiLogDecoder.decode(&abi, &log).unwrap_err();
        assert!(matches!(err, WatcherError::NoMatchingEvent { .. }));
        assert!(err.is_decode_mismatch());
    }

    #[test]
    fn truncated_payload_fails() {
        let abi = parse_abi(ERC20_ABI).unwrap();
        let mut log = transfer_log();
        log.data = "0x00".into();
        assert!(matches!(
            AbiLogDecoder.decode(&abi, &log),
            Err(WatcherError::Decode { .. })
        ));
    }

    #[test]
    fn topic_count_must_match_indexed_params() {
        let abi = parse_abi(ERC20_ABI).unwrap();
        let mut log = transfer_log();
        log.topics.pop();
        assert!(matches!(
            AbiLogDecoder.decode(&abi, &log),
            Err(WatcherError::Decode { .. })
        ));
    }

    #[test]
    fn indexed_string_stays_hashed() {
        let abi = parse_abi(
            r#"[{"type":"event","name":"Named","anonymous":false,"inputs":[
                {"name":"label","type":"string","indexed":true},
                {"name":"","type":"bool","indexed":false}]}]"#,
        )
        .unwrap();
        let selector = format!("{:#x}", abi.events().next().unwrap().selector());
        let hash = format!("0x{}", "ab".repeat(32));
        let log = RawLog {
            data: format!("0x{}1", "0".repeat(63)),
            topics: vec![selector, hash.clone()],
            ..transfer_log()
        };

        let decoded = AbiLogDecoder.decode(&abi, &log).unwrap();
        assert_eq!(decoded.args["label"], json!(hash));
        // unnamed params are keyed by position
        assert_eq!(decoded.args["1"], json!(true));
    }

    #[test]
    fn lists_abi_events() {
        let abi = parse_abi(ERC20_ABI).unwrap();
        let mut names = event_names(&abi);
        names.sort();
        assert_eq!(names, ["Approval", "Transfer"]);
        assert!(event_signatures(&abi).contains(&"Transfer(address,address,uint256)".to_string()));
    }
}

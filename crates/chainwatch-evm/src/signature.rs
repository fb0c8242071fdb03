//! Event signature → topic0 hashing.
//!
//! Accepts the canonical form (`Transfer(address,address,uint256)`) as well as
//! human-readable Solidity declarations with parameter names, `indexed`
//! markers and an optional `event` keyword. A value that is already a 32-byte
//! topic hash is passed through unchanged.

use alloy_json_abi::Event;

use chainwatch_core::WatcherError;

/// Parse a Solidity event declaration.
pub fn parse_event(signature: &str) -> Result<Event, WatcherError> {
    let signature = signature.trim().trim_end_matches(';');
    Event::parse(signature)
        .or_else(|first| {
            if signature.starts_with("event ") {
                Err(first)
            } else {
                Event::parse(&format!("event {signature}")).map_err(|_| first)
            }
        })
        .map_err(|e| WatcherError::InvalidSignature {
            signature: signature.to_string(),
            reason: e.to_string(),
        })
}

/// The topic0 selector for an event signature, `0x`-prefixed lowercase hex.
pub fn event_topic(signature: &str) -> Result<String, WatcherError> {
    if is_topic_hash(signature) {
        return Ok(signature.to_ascii_lowercase());
    }
    Ok(format!("{:#x}", parse_event(signature)?.selector()))
}

/// Hash every signature; the first malformed one fails the whole set.
pub fn event_topics<S: AsRef<str>>(signatures: &[S]) -> Result<Vec<String>, WatcherError> {
    signatures.iter().map(|s| event_topic(s.as_ref())).collect()
}

fn is_topic_hash(s: &str) -> bool {
    s.strip_prefix("0x")
        .is_some_and(|h| h.len() == 64 && h.bytes().all(|b| b.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSFER_TOPIC: &str =
        "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

    #[test]
    fn canonical_signature() {
        assert_eq!(
            event_topic("Transfer(address,address,uint256)").unwrap(),
            TRANSFER_TOPIC
        );
    }

    #[test]
    fn human_readable_signature() {
        let forms = [
            "event Transfer(address indexed from, address indexed to, uint256 value)",
            "Transfer(address indexed from, address indexed to, uint256 value)",
            "event Transfer(address indexed from, address indexed to, uint256 value);",
        ];
        for form in forms {
            assert_eq!(event_topic(form).unwrap(), TRANSFER_TOPIC, "{form}");
        }
    }

    #[test]
    fn topic_hash_passes_through() {
        let upper = TRANSFER_TOPIC.to_ascii_uppercase().replacen("0X", "0x", 1);
        assert_eq!(event_topic(&upper).unwrap(), TRANSFER_TOPIC);
    }

    #[test]
    fn malformed_signature_is_rejected() {
        let err = event_topic("Transfer(address,").unwrap_err();
        assert!(matches!(err, WatcherError::InvalidSignature { .. }));
    }

    #[test]
    fn parsed_event_keeps_indexed_flags() {
        let event = parse_event("Approval(address indexed owner, address indexed spender, uint256 value)")
            .unwrap();
        assert_eq!(event.name, "Approval");
        assert_eq!(event.inputs.iter().filter(|p| p.indexed).count(), 2);
        assert_eq!(event.signature(), "Approval(address,address,uint256)");
    }
}

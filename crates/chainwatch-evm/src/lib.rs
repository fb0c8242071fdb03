//! chainwatch-evm — EVM collaborators for the chainwatch engine.
//!
//! - [`AbiLogDecoder`] decodes raw logs against an alloy [`JsonAbi`](alloy_json_abi::JsonAbi)
//! - [`HttpChainClient`] answers head-height and `eth_getLogs` queries over HTTP JSON-RPC
//! - [`signature`] hashes human-readable event signatures to topic0

pub mod abi;
pub mod normalizer;
pub mod request;
pub mod rpc;
pub mod signature;

pub use abi::{load_abi, parse_abi, AbiLogDecoder};
pub use rpc::{HttpChainClient, HttpClientConfig};
pub use signature::{event_topic, parse_event};

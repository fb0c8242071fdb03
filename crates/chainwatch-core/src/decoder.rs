//! Decode routing — applies registrations' ABIs to raw logs.
//!
//! A log is attempted against every registration whose address set contains
//! the log's address. A failed attempt drops the log for that registration
//! and never reaches the poll cycle as an error.

use std::sync::Arc;

use crate::error::WatcherError;
use crate::registry::ContractRegistration;
use crate::types::{DecodedEvent, DecodedLog, RawLog};

/// The ABI decode primitive the engine consumes.
pub trait LogDecoder: Send + Sync {
    /// Contract interface description used for decoding.
    type Abi: Send + Sync + 'static;

    /// Interpret `log.topics`/`log.data` against `abi`.
    fn decode(&self, abi: &Self::Abi, log: &RawLog) -> Result<DecodedLog, WatcherError>;
}

impl<T: LogDecoder + ?Sized> LogDecoder for Arc<T> {
    type Abi = T::Abi;

    fn decode(&self, abi: &Self::Abi, log: &RawLog) -> Result<DecodedLog, WatcherError> {
        (**self).decode(abi, log)
    }
}

/// Decode `log` against a single registration.
///
/// Returns `None` if the log's address is not watched by `registration` or
/// the ABI does not match. With `debug` on, mismatches dump the raw log.
pub fn decode_for<D: LogDecoder>(
    decoder: &D,
    registration: &ContractRegistration<D::Abi>,
    log: &RawLog,
    debug: bool,
) -> Option<DecodedEvent> {
    if !registration.watches(&log.address) {
        return None;
    }

    match decoder.decode(&registration.abi, log) {
        Ok(decoded) => Some(DecodedEvent::new(
            registration.contract_type.clone(),
            decoded,
            log,
        )),
        Err(e) => {
            if debug {
                tracing::debug!(
                    contract_type = %registration.contract_type,
                    error = %e,
                    raw = %serde_json::to_string(log).unwrap_or_default(),
                    "can't parse log"
                );
            }
            None
        }
    }
}

/// Decode `log` against every registration that watches its address, in
/// registry order.
pub fn route_log<D: LogDecoder>(
    decoder: &D,
    registrations: &[ContractRegistration<D::Abi>],
    log: &RawLog,
    debug: bool,
) -> Vec<DecodedEvent> {
    registrations
        .iter()
        .filter_map(|registration| decode_for(decoder, registration, log, debug))
        .collect()
}

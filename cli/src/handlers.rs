//! Built-in handler that logs every decoded event.

use async_trait::async_trait;
use std::sync::Arc;

use alloy_json_abi::JsonAbi;
use chainwatch_core::{DecodedEvent, EventHandler, HandlerRegistry, Pattern, RawLog, WatcherError};
use chainwatch_evm::abi;

pub struct LoggingHandler;

#[async_trait]
impl EventHandler for LoggingHandler {
    async fn handle(&self, event: &DecodedEvent, log: &RawLog) -> Result<(), WatcherError> {
        let args = serde_json::to_string(&event.args).map_err(|e| WatcherError::Other(e.to_string()))?;
        tracing::info!(
            contract_type = %event.contract_type,
            event = %event.event_name,
            address = %event.address,
            block = event.block_number,
            log_index = event.log_index,
            tx = log.transaction_hash.as_deref().unwrap_or("-"),
            %args,
            "event"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Bind `handler` to every event declared in `abi` under `contract_type`.
pub fn bind_abi_events(
    handlers: &mut HandlerRegistry,
    contract_type: &str,
    abi: &JsonAbi,
    handler: &Arc<dyn EventHandler>,
) -> usize {
    let names = abi::event_names(abi);
    for name in &names {
        handlers.on(&Pattern::new(contract_type, name.as_str()), Arc::clone(handler));
    }
    names.len()
}

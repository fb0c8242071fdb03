//! Event handler trait + registry.
//!
//! Handlers are bound explicitly at startup to one or more
//! `(contractType, eventName)` patterns. The registry is immutable once built
//! and is only read by the dispatcher.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::WatcherError;
use crate::types::{DecodedEvent, Pattern, RawLog};

/// Trait for user-provided event handlers.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Called for each decoded event routed to this handler.
    async fn handle(&self, event: &DecodedEvent, log: &RawLog) -> Result<(), WatcherError>;

    /// Name used when reporting failures.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Route key → handlers, in binding order.
pub struct HandlerRegistry {
    routes: HashMap<String, Vec<Arc<dyn EventHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::default()
    }

    /// Bind a handler to a pattern.
    pub fn on(&mut self, pattern: &Pattern, handler: Arc<dyn EventHandler>) {
        self.routes.entry(pattern.route()).or_default().push(handler);
    }

    /// All handlers bound to `pattern`.
    pub fn resolve(&self, pattern: &Pattern) -> &[Arc<dyn EventHandler>] {
        self.routes
            .get(&pattern.route())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of distinct route keys.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Fluent builder for [`HandlerRegistry`].
#[derive(Default)]
pub struct HandlerRegistryBuilder {
    registry: HandlerRegistry,
}

impl HandlerRegistryBuilder {
    /// Bind `handler` to a single `(contract_type, event_name)` pattern.
    pub fn on<H>(self, contract_type: &str, event_name: &str, handler: H) -> Self
    where
        H: EventHandler + 'static,
    {
        self.on_shared(&[Pattern::new(contract_type, event_name)], Arc::new(handler))
    }

    /// Bind one shared handler to several patterns.
    pub fn on_shared(mut self, patterns: &[Pattern], handler: Arc<dyn EventHandler>) -> Self {
        for pattern in patterns {
            self.registry.on(pattern, Arc::clone(&handler));
        }
        self
    }

    pub fn build(self) -> HandlerRegistry {
        self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Counter(Arc<AtomicU32>);

    #[async_trait]
    impl EventHandler for Counter {
        async fn handle(&self, _e: &DecodedEvent, _l: &RawLog) -> Result<(), WatcherError> {
            self.0.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        fn name(&self) -> &str {
            "counter"
        }
    }

    #[test]
    fn resolves_by_pattern() {
        let count = Arc::new(AtomicU32::new(0));
        let registry = HandlerRegistry::builder()
            .on("ERC20_TOKEN", "Transfer", Counter(count.clone()))
            .on("ERC20_TOKEN", "Transfer", Counter(count.clone()))
            .on("ERC20_TOKEN", "Approval", Counter(count))
            .build();

        assert_eq!(registry.resolve(&Pattern::new("ERC20_TOKEN", "Transfer")).len(), 2);
        assert_eq!(registry.resolve(&Pattern::new("ERC20_TOKEN", "Approval")).len(), 1);
        assert!(registry.resolve(&Pattern::new("EXCHANGE", "Swap")).is_empty());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn shared_handler_binds_many_patterns() {
        let handler: Arc<dyn EventHandler> = Arc::new(Counter(Arc::new(AtomicU32::new(0))));
        let registry = HandlerRegistry::builder()
            .on_shared(
                &[
                    Pattern::new("ERC20_TOKEN", "OwnershipTransferred"),
                    Pattern::new("ERC721_TOKEN", "OwnershipTransferred"),
                ],
                handler,
            )
            .build();

        let a = &registry.resolve(&Pattern::new("ERC20_TOKEN", "OwnershipTransferred"))[0];
        let b = &registry.resolve(&Pattern::new("ERC721_TOKEN", "OwnershipTransferred"))[0];
        assert!(Arc::ptr_eq(a, b));
        assert_eq!(a.name(), "counter");
    }
}

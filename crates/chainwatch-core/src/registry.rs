//! Contract registry — which contracts, events and ABIs are being watched.
//!
//! Registrations are keyed by contract type. Registering a known type again
//! merges its address and signature sets; the ABI stays the one supplied first.

use indexmap::IndexSet;
use std::sync::{Arc, PoisonError, RwLock};

/// A caller-declared binding of a contract type to addresses, event
/// signatures and the ABI used to decode their logs.
pub struct ContractRegistration<A> {
    pub contract_type: String,
    /// Lowercase-normalized, insertion-ordered.
    pub addresses: IndexSet<String>,
    pub event_signatures: IndexSet<String>,
    pub abi: Arc<A>,
}

impl<A> ContractRegistration<A> {
    pub fn new(contract_type: impl Into<String>, abi: A) -> Self {
        Self {
            contract_type: contract_type.into(),
            addresses: IndexSet::new(),
            event_signatures: IndexSet::new(),
            abi: Arc::new(abi),
        }
    }

    /// Add a contract address (stored lowercase).
    pub fn address(mut self, address: impl AsRef<str>) -> Self {
        self.addresses.insert(address.as_ref().to_ascii_lowercase());
        self
    }

    pub fn addresses<I, S>(self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        addresses.into_iter().fold(self, |reg, a| reg.address(a))
    }

    pub fn event_signature(mut self, signature: impl Into<String>) -> Self {
        self.event_signatures.insert(signature.into());
        self
    }

    pub fn event_signatures<I, S>(self, signatures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        signatures.into_iter().fold(self, |reg, s| reg.event_signature(s))
    }

    /// Returns `true` if `address` belongs to this registration (case-insensitive).
    pub fn watches(&self, address: &str) -> bool {
        self.addresses.contains(&address.to_ascii_lowercase())
    }

    fn merge(&mut self, other: ContractRegistration<A>) {
        self.addresses.extend(other.addresses);
        self.event_signatures.extend(other.event_signatures);
    }
}

impl<A> Clone for ContractRegistration<A> {
    fn clone(&self) -> Self {
        Self {
            contract_type: self.contract_type.clone(),
            addresses: self.addresses.clone(),
            event_signatures: self.event_signatures.clone(),
            abi: Arc::clone(&self.abi),
        }
    }
}

impl<A> std::fmt::Debug for ContractRegistration<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractRegistration")
            .field("contract_type", &self.contract_type)
            .field("addresses", &self.addresses)
            .field("event_signatures", &self.event_signatures)
            .finish_non_exhaustive()
    }
}

/// In-memory registry of [`ContractRegistration`]s, in insertion order of
/// distinct contract types.
pub struct ContractRegistry<A> {
    entries: RwLock<Vec<ContractRegistration<A>>>,
}

impl<A> ContractRegistry<A> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Insert a new contract type or merge into the existing one.
    pub fn update(&self, registration: ContractRegistration<A>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries
            .iter_mut()
            .find(|e| e.contract_type == registration.contract_type)
        {
            Some(entry) => entry.merge(registration),
            None => entries.push(registration),
        }
    }

    /// Snapshot of all registrations.
    pub fn snapshot(&self) -> Vec<ContractRegistration<A>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get(&self, contract_type: &str) -> Option<ContractRegistration<A>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|e| e.contract_type == contract_type)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<A> Default for ContractRegistry<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// Union of all addresses across `registrations`, first occurrence wins.
pub fn all_addresses<A>(registrations: &[ContractRegistration<A>]) -> Vec<String> {
    registrations
        .iter()
        .flat_map(|r| r.addresses.iter().cloned())
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

/// Union of all event signatures across `registrations`.
pub fn all_event_signatures<A>(registrations: &[ContractRegistration<A>]) -> Vec<String> {
    registrations
        .iter()
        .flat_map(|r| r.event_signatures.iter().cloned())
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::wallet::provider::ProviderHandle;
use crate::wallet::types::{Address, ChainId};

/// A provider already validated against one chain and contract.
#[derive(Debug, Clone)]
pub struct ContractHandle {
    pub provider: ProviderHandle,
    pub contract: Address,
    pub chain_id: ChainId,
}

impl ContractHandle {
    pub fn matches(&self, provider: &ProviderHandle, chain_id: &ChainId) -> bool {
        self.provider.same_provider(provider) && &self.chain_id == chain_id
    }
}

/// Process-wide slot for the contract handle. Cleared whenever the chain
/// changes, the wallet disconnects, or a call fails for a transport reason.
#[derive(Debug, Default)]
pub struct TransportCache {
    slot: Mutex<Option<Arc<ContractHandle>>>,
    invalidations: AtomicU64,
}

impl TransportCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Arc<ContractHandle>> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }

    pub fn store(&self, handle: ContractHandle) -> Arc<ContractHandle> {
        let handle = Arc::new(handle);
        match self.slot.lock() {
            Ok(mut slot) => *slot = Some(handle.clone()),
            Err(poisoned) => *poisoned.into_inner() = Some(handle.clone()),
        }
        handle
    }

    pub fn invalidate(&self) {
        let previous = match self.slot.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        self.invalidations.fetch_add(1, Ordering::Relaxed);
        if previous.is_some() {
            debug!("Transport handle invalidated");
        }
    }

    pub fn is_empty(&self) -> bool {
        self.get().is_none()
    }

    /// Number of times [`invalidate`](Self::invalidate) has been called.
    pub fn invalidation_count(&self) -> u64 {
        self.invalidations.load(Ordering::Relaxed)
    }
}

use serde_json::json;
use std::sync::Arc;

use chainmate::config::{ReceiptPolicy, RestorePolicy};
use chainmate::retry::RetryPolicy;
use chainmate::session::WalletSession;
use chainmate::storage::{MemorySessionStore, SessionStore};
use chainmate::transactions::{TransactionSubmitter, TransportCache};
use chainmate::wallet::guard::NetworkGuard;
use chainmate::wallet::locator::{ProviderLocator, StaticInjection};
use chainmate::wallet::provider::WalletProvider;
use chainmate::wallet::types::{Address, ChainId, WalletKind};

use super::mock_provider::MockProvider;

pub const LOCAL_CHAIN: &str = "0x7a69";
pub const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";
pub const TX_HASH: &str = "0x9f2c4e6a8b0d1f3e5a7c9b1d3f5e7a9c1b3d5f7e9a1c3b5d7f9e1a3c5b7d9f1e";

/// Deterministic address ending in `last`.
pub fn address(last: u8) -> Address {
    Address::parse(&format!("0x{:040x}", last)).unwrap()
}

pub fn white() -> Address {
    address(0xa1)
}

pub fn black() -> Address {
    address(0xb2)
}

pub fn contract() -> Address {
    Address::parse("0x5fbdb2315678afecb367f032d93f642f64180aa3").unwrap()
}

/// Guard expecting the local chain and a deployed contract.
pub fn on_chain_guard() -> NetworkGuard {
    NetworkGuard::new(
        Some(ChainId::new(LOCAL_CHAIN)),
        Some("Localhost".to_string()),
        Some(contract()),
    )
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay_ms: 1,
    }
}

pub fn fast_receipts() -> ReceiptPolicy {
    ReceiptPolicy {
        poll_interval_ms: 1,
        max_polls: 3,
    }
}

/// Teach `provider` to behave like a node with the game contract deployed
/// that mines every transaction immediately.
pub fn deploy_contract(provider: &MockProvider) {
    provider.respond("eth_getCode", json!("0x6080604052"));
    provider.respond("eth_sendTransaction", json!(TX_HASH));
    provider.respond(
        "eth_getTransactionReceipt",
        json!({
            "status": "0x1",
            "blockNumber": "0x2a",
            "logs": [{
                "address": contract().as_str(),
                "topics": ["0xevent", "0x0000000000000000000000000000000000000000000000000000000000000007"]
            }]
        }),
    );
}

/// A session wired the way the binary wires it, over in-memory stores.
pub struct Harness {
    pub provider: Arc<MockProvider>,
    pub injection: Arc<StaticInjection>,
    pub locator: Arc<ProviderLocator>,
    pub store: Arc<MemorySessionStore>,
    pub cache: Arc<TransportCache>,
    pub guard: NetworkGuard,
    pub session: WalletSession,
}

impl Harness {
    pub fn start(provider: MockProvider, guard: NetworkGuard) -> Self {
        Self::start_with_store(provider, guard, MemorySessionStore::new(), RestorePolicy::Discard)
    }

    pub fn start_with_store(
        provider: MockProvider,
        guard: NetworkGuard,
        store: MemorySessionStore,
        policy: RestorePolicy,
    ) -> Self {
        let provider = Arc::new(provider);
        let injected: Arc<dyn WalletProvider> = provider.clone();
        let injection = Arc::new(StaticInjection::single(injected));
        let locator = Arc::new(ProviderLocator::new(injection.clone(), WalletKind::MetaMask));
        let store = Arc::new(store);
        let session_store: Arc<dyn SessionStore> = store.clone();
        let cache = Arc::new(TransportCache::new());
        let session = WalletSession::start(
            locator.clone(),
            guard.clone(),
            session_store,
            cache.clone(),
            policy,
        );

        Self {
            provider,
            injection,
            locator,
            store,
            cache,
            guard,
            session,
        }
    }

    pub fn submitter(&self) -> TransactionSubmitter {
        TransactionSubmitter::new(
            self.session.clone(),
            self.guard.clone(),
            self.cache.clone(),
            fast_retry(),
            fast_receipts(),
        )
    }
}

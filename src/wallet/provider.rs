use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::wallet::errors::ProviderError;
use crate::wallet::types::{Address, ChainId, WalletKind};

/// Capacity of the event channel every provider exposes.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A single JSON-RPC style request sent to a wallet provider.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcRequest {
    pub method: String,
    pub params: Value,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Account access. May wait on a human approving the wallet prompt.
    pub fn request_accounts() -> Self {
        Self::new("eth_requestAccounts", json!([]))
    }

    /// Already-authorized accounts, without prompting.
    pub fn accounts() -> Self {
        Self::new("eth_accounts", json!([]))
    }

    pub fn chain_id() -> Self {
        Self::new("eth_chainId", json!([]))
    }

    pub fn get_code(address: &Address) -> Self {
        Self::new("eth_getCode", json!([address.as_str(), "latest"]))
    }

    pub fn send_transaction(from: &Address, to: &Address, data: &str) -> Self {
        Self::new(
            "eth_sendTransaction",
            json!([{
                "from": from.as_str(),
                "to": to.as_str(),
                "data": data,
            }]),
        )
    }

    pub fn transaction_receipt(tx_hash: &str) -> Self {
        Self::new("eth_getTransactionReceipt", json!([tx_hash]))
    }
}

/// Events pushed by a provider without a preceding request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(ChainId),
    Disconnect,
}

/// What a provider says about itself. Nothing here is verified.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderInfo {
    pub name: String,
    /// Every wallet kind the provider claims to be.
    pub kinds: Vec<WalletKind>,
    /// Set when the provider also exposes its vendor's own namespace object
    /// (for MetaMask, the `_metamask` API), which imitators rarely copy.
    pub vendor_namespace: bool,
}

impl ProviderInfo {
    pub fn new(name: impl Into<String>, kinds: Vec<WalletKind>) -> Self {
        Self {
            name: name.into(),
            kinds,
            vendor_namespace: false,
        }
    }

    pub fn with_vendor_namespace(mut self) -> Self {
        self.vendor_namespace = true;
        self
    }

    pub fn claims(&self, kind: WalletKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// Claims `kind` and no other known wallet kind.
    pub fn claims_exclusively(&self, kind: WalletKind) -> bool {
        self.claims(kind) && self.kinds.iter().all(|claimed| *claimed == kind)
    }
}

/// An injected wallet: a request/response call interface plus an event
/// emitter.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    fn info(&self) -> ProviderInfo;

    async fn request(&self, request: RpcRequest) -> Result<Value, ProviderError>;

    /// Subscribe to pushed events. Each call returns an independent receiver.
    fn events(&self) -> broadcast::Receiver<ProviderEvent>;
}

/// The provider selected by the locator, tagged with the wallet kind it was
/// selected for.
#[derive(Clone)]
pub struct ProviderHandle {
    provider: Arc<dyn WalletProvider>,
    kind: WalletKind,
}

impl ProviderHandle {
    pub fn new(provider: Arc<dyn WalletProvider>, kind: WalletKind) -> Self {
        Self { provider, kind }
    }

    pub fn kind(&self) -> WalletKind {
        self.kind
    }

    pub fn provider(&self) -> &Arc<dyn WalletProvider> {
        &self.provider
    }

    pub fn info(&self) -> ProviderInfo {
        self.provider.info()
    }

    pub async fn request(&self, request: RpcRequest) -> Result<Value, ProviderError> {
        self.provider.request(request).await
    }

    pub fn events(&self) -> broadcast::Receiver<ProviderEvent> {
        self.provider.events()
    }

    /// True when both handles point at the same provider object.
    pub fn same_provider(&self, other: &ProviderHandle) -> bool {
        same_object(&self.provider, &other.provider)
    }
}

impl fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("kind", &self.kind)
            .field("name", &self.provider.info().name)
            .finish()
    }
}

/// Identity comparison for trait objects, ignoring vtable pointers.
pub(crate) fn same_object(a: &Arc<dyn WalletProvider>, b: &Arc<dyn WalletProvider>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Decode a `result` that should be a list of addresses.
pub fn parse_accounts(value: &Value) -> Result<Vec<Address>, ProviderError> {
    let entries = value
        .as_array()
        .ok_or_else(|| ProviderError::transport(format!("expected account list, got {}", value)))?;

    entries
        .iter()
        .map(|entry| {
            entry
                .as_str()
                .and_then(|raw| Address::parse(raw).ok())
                .ok_or_else(|| ProviderError::transport(format!("malformed account {}", entry)))
        })
        .collect()
}

/// Decode a chain id result, which providers return as a hex string or,
/// occasionally, a bare number.
pub fn parse_chain_id(value: &Value) -> Result<ChainId, ProviderError> {
    match value {
        Value::String(raw) => Ok(ChainId::new(raw)),
        Value::Number(number) => number
            .as_u64()
            .map(ChainId::from_u64)
            .ok_or_else(|| ProviderError::transport(format!("malformed chain id {}", number))),
        other => Err(ProviderError::transport(format!(
            "malformed chain id {}",
            other
        ))),
    }
}

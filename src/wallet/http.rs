//! JSON-RPC provider for development chains.
//!
//! A node such as anvil or `hardhat node` answers the same request methods an
//! injected wallet does, with unlocked accounts instead of a signing prompt.
//! HTTP has no push channel, so account and chain changes are discovered by
//! [`HttpRpcProvider::watch_changes`] polling.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::wallet::errors::ProviderError;
use crate::wallet::provider::{
    parse_accounts, parse_chain_id, ProviderEvent, ProviderInfo, RpcRequest, WalletProvider,
    EVENT_CHANNEL_CAPACITY,
};
use crate::wallet::types::{Address, ChainId, WalletKind};

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

pub struct HttpRpcProvider {
    url: String,
    client: reqwest::Client,
    kind: WalletKind,
    next_id: AtomicU64,
    events: broadcast::Sender<ProviderEvent>,
}

impl HttpRpcProvider {
    /// `kind` is the wallet kind this endpoint stands in for.
    pub fn new(url: impl Into<String>, kind: WalletKind) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
            kind,
            next_id: AtomicU64::new(1),
            events,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call(&self, request: &RpcRequest) -> Result<Value, ProviderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let method = request.method.as_str();
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": request.params,
        });
        trace!("-> {} #{} {}", method, id, body["params"]);

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::transport(format!("connection error: {}", e)))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(ProviderError::transport(format!(
                "network error: endpoint returned {}",
                status
            )));
        }

        let decoded: RpcResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::transport(format!("network error: bad response body: {}", e)))?;

        if let Some(error) = decoded.error {
            debug!("<- {} #{} error {}: {}", method, id, error.code, error.message);
            return Err(ProviderError::new(error.code, error.message));
        }

        Ok(decoded.result.unwrap_or(Value::Null))
    }

    /// Poll the node for chain and account changes, emitting the matching
    /// events. The task runs until aborted.
    pub fn watch_changes(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let provider = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            let mut last_chain: Option<ChainId> = None;
            let mut last_accounts: Option<Vec<Address>> = None;
            let mut reachable = true;

            loop {
                ticker.tick().await;

                let polled = async {
                    let chain = parse_chain_id(&provider.call(&RpcRequest::chain_id()).await?)?;
                    let accounts = parse_accounts(&provider.call(&RpcRequest::accounts()).await?)?;
                    Ok::<_, ProviderError>((chain, accounts))
                }
                .await;

                let (chain, accounts) = match polled {
                    Ok(values) => {
                        reachable = true;
                        values
                    }
                    Err(err) => {
                        if reachable {
                            warn!("Lost contact with {}: {}", provider.url, err);
                            reachable = false;
                            let _ = provider.events.send(ProviderEvent::Disconnect);
                        }
                        continue;
                    }
                };

                if last_chain.as_ref().is_some_and(|last| *last != chain) {
                    debug!("Chain changed to {}", chain);
                    let _ = provider.events.send(ProviderEvent::ChainChanged(chain.clone()));
                }
                if last_accounts.as_ref().is_some_and(|last| *last != accounts) {
                    debug!("Accounts changed ({} authorized)", accounts.len());
                    let _ = provider
                        .events
                        .send(ProviderEvent::AccountsChanged(accounts.clone()));
                }

                last_chain = Some(chain);
                last_accounts = Some(accounts);
            }
        })
    }
}

#[async_trait]
impl WalletProvider for HttpRpcProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo::new(format!("JSON-RPC {}", self.url), vec![self.kind])
    }

    async fn request(&self, request: RpcRequest) -> Result<Value, ProviderError> {
        match self.call(&request).await {
            Err(err) if request.method == "eth_requestAccounts" && err.is_method_not_found() => {
                debug!("Node has no eth_requestAccounts, using eth_accounts");
                self.call(&RpcRequest::accounts()).await
            }
            other => other,
        }
    }

    fn events(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

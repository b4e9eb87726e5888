use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::abi;
use super::cache::{ContractHandle, TransportCache};
use super::types::{
    generate_local_game_id, generate_local_id, GameId, MoveRequest, PendingTransaction,
    ReceiptStatus, TransactionReceipt,
};
use crate::config::ReceiptPolicy;
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::session::WalletSession;
use crate::wallet::errors::WalletError;
use crate::wallet::guard::NetworkGuard;
use crate::wallet::provider::{ProviderHandle, RpcRequest};
use crate::wallet::types::{Address, WalletState};

/// Sends the game contract's two state-mutating calls through the session's
/// provider.
///
/// Both calls need a connected session and pass the mandatory network checks
/// before anything is signed. Transport failures are retried, and each
/// retriable failure drops the cached contract handle so the next attempt
/// re-validates from scratch. With no contract configured the submitter runs
/// offline: game ids are generated locally and moves are acknowledged with an
/// [`ReceiptStatus::Offline`] receipt.
pub struct TransactionSubmitter {
    session: WalletSession,
    guard: NetworkGuard,
    cache: Arc<TransportCache>,
    retry: RetryExecutor,
    receipts: ReceiptPolicy,
}

impl TransactionSubmitter {
    pub fn new(
        session: WalletSession,
        guard: NetworkGuard,
        cache: Arc<TransportCache>,
        retry: RetryPolicy,
        receipts: ReceiptPolicy,
    ) -> Self {
        Self {
            session,
            guard,
            cache,
            retry: RetryExecutor::new(retry),
            receipts,
        }
    }

    pub fn session(&self) -> &WalletSession {
        &self.session
    }

    pub fn is_offline(&self) -> bool {
        self.guard.contract().is_none()
    }

    /// Create a game on-chain and return its id: the first indexed topic of
    /// the contract's first log, or the transaction hash when there is none.
    pub async fn create_game(&self, opponent: Option<&Address>) -> Result<GameId, WalletError> {
        let wallet = self.connected()?;

        let Some(contract) = self.guard.contract() else {
            let id = generate_local_game_id();
            info!("No contract configured, created local game {}", id);
            return Ok(id);
        };

        let data = abi::encode_create_game(opponent);
        let (tx_hash, handle) = self.transact(contract, &data).await?;
        let (receipt, topic) = self.await_receipt(&handle.provider, contract, &tx_hash).await?;

        let id = topic.unwrap_or_else(|| receipt.tx_hash.clone());
        info!(
            "Game {} created by {} ({:?})",
            id,
            wallet.address.short(),
            receipt.status
        );
        Ok(id)
    }

    /// Submit an already-validated move. A request without a resulting
    /// position is rejected before any provider call.
    pub async fn send_move(&self, request: &MoveRequest) -> Result<TransactionReceipt, WalletError> {
        let position = request.position().ok_or(WalletError::MissingPosition)?;
        self.connected()?;

        let Some(contract) = self.guard.contract() else {
            let receipt = TransactionReceipt {
                tx_hash: generate_local_id("local"),
                block_number: None,
                status: ReceiptStatus::Offline,
            };
            debug!(
                "Offline move {}{} in {} acknowledged as {}",
                request.from, request.to, request.game_id, receipt.tx_hash
            );
            return Ok(receipt);
        };

        let data = abi::encode_submit_move(
            &request.game_id,
            &request.from,
            &request.to,
            request.promotion.as_deref(),
            position,
        );
        let (tx_hash, handle) = self.transact(contract, &data).await?;
        let (receipt, _) = self.await_receipt(&handle.provider, contract, &tx_hash).await?;

        info!(
            "Move {}{} in {} submitted in {} ({:?})",
            request.from, request.to, request.game_id, receipt.tx_hash, receipt.status
        );
        Ok(receipt)
    }

    fn connected(&self) -> Result<WalletState, WalletError> {
        self.session.wallet().ok_or(WalletError::NotConnected)
    }

    /// Reuse the cached handle when it still matches the active provider and
    /// chain; otherwise run the mandatory checks and cache a new one.
    async fn contract_handle(&self, contract: &Address) -> Result<Arc<ContractHandle>, WalletError> {
        let wallet = self.connected()?;
        let provider = self
            .session
            .active_provider()
            .ok_or(WalletError::NotConnected)?;

        self.guard.check_chain(&wallet.chain_id)?;

        if let Some(handle) = self.cache.get() {
            if handle.matches(&provider, &wallet.chain_id) && &handle.contract == contract {
                return Ok(handle);
            }
        }

        self.guard.check_contract_deployed(&provider, contract).await?;
        debug!("Caching transport handle for {} on {}", contract, wallet.chain_id);
        Ok(self.cache.store(ContractHandle {
            provider,
            contract: contract.clone(),
            chain_id: wallet.chain_id,
        }))
    }

    /// Sign and send one call, returning the transaction hash and the handle
    /// it went through.
    async fn transact(
        &self,
        contract: &Address,
        data: &str,
    ) -> Result<(String, Arc<ContractHandle>), WalletError> {
        self.retry
            .run_with_hook(
                move |context| async move {
                    let handle = self.contract_handle(contract).await?;
                    let wallet = self.connected()?;
                    let pending =
                        PendingTransaction::new(wallet.address, handle.contract.clone(), data.to_string());
                    debug!(
                        "Submitting transaction {} from {} to {} at {} ({} bytes, attempt {}/{})",
                        pending.id,
                        pending.from.short(),
                        pending.to.short(),
                        pending.timestamp,
                        (pending.payload.len() - 2) / 2,
                        context.attempt,
                        context.max_attempts
                    );

                    let result = handle
                        .provider
                        .request(RpcRequest::send_transaction(
                            &pending.from,
                            &pending.to,
                            &pending.payload,
                        ))
                        .await?;
                    let tx_hash = result.as_str().map(str::to_string).ok_or_else(|| {
                        WalletError::InvalidResponse(format!("expected transaction hash, got {}", result))
                    })?;
                    Ok::<_, WalletError>((tx_hash, handle))
                },
                move |_, _| self.cache.invalidate(),
            )
            .await
    }

    /// Poll for the receipt. Returns a [`ReceiptStatus::Pending`] receipt if
    /// the transaction is not mined within the polling budget; the caller
    /// must not resubmit in that case.
    async fn await_receipt(
        &self,
        provider: &ProviderHandle,
        contract: &Address,
        tx_hash: &str,
    ) -> Result<(TransactionReceipt, Option<String>), WalletError> {
        let polls = self.receipts.max_polls.max(1);

        for poll in 0..polls {
            if poll > 0 {
                tokio::time::sleep(self.receipts.poll_interval()).await;
            }

            let raw = self
                .retry
                .run_with_hook(
                    move |_| async move {
                        provider
                            .request(RpcRequest::transaction_receipt(tx_hash))
                            .await
                            .map_err(WalletError::from)
                    },
                    move |_, _| self.cache.invalidate(),
                )
                .await?;

            if raw.is_null() {
                debug!("Receipt for {} not available yet ({}/{})", tx_hash, poll + 1, polls);
                continue;
            }
            return parse_receipt(tx_hash, contract, &raw);
        }

        warn!("Transaction {} not mined after {} polls", tx_hash, polls);
        Ok((
            TransactionReceipt {
                tx_hash: tx_hash.to_string(),
                block_number: None,
                status: ReceiptStatus::Pending,
            },
            None,
        ))
    }
}

fn parse_hex_u64(value: &Value) -> Option<u64> {
    value
        .as_str()
        .and_then(|raw| raw.strip_prefix("0x"))
        .and_then(|digits| u64::from_str_radix(digits, 16).ok())
}

fn parse_receipt(
    tx_hash: &str,
    contract: &Address,
    raw: &Value,
) -> Result<(TransactionReceipt, Option<String>), WalletError> {
    if parse_hex_u64(&raw["status"]) == Some(0) {
        return Err(WalletError::TransactionReverted(tx_hash.to_string()));
    }

    let topic = raw["logs"].as_array().and_then(|logs| {
        logs.iter()
            .find(|log| {
                log["address"]
                    .as_str()
                    .is_some_and(|address| address.eq_ignore_ascii_case(contract.as_str()))
            })
            .and_then(|log| log["topics"][1].as_str())
            .map(str::to_string)
    });

    Ok((
        TransactionReceipt {
            tx_hash: tx_hash.to_string(),
            block_number: parse_hex_u64(&raw["blockNumber"]),
            status: ReceiptStatus::Confirmed,
        },
        topic,
    ))
}

use serde_json::Value;
use tracing::{debug, warn};

use crate::wallet::errors::WalletError;
use crate::wallet::provider::{ProviderHandle, RpcRequest};
use crate::wallet::types::{Address, ChainId};

/// Checks the wallet is on the expected chain and the game contract exists.
///
/// Every expectation is optional. An unconfigured expectation always passes.
#[derive(Debug, Clone, Default)]
pub struct NetworkGuard {
    expected_chain: Option<ChainId>,
    network_name: Option<String>,
    contract: Option<Address>,
}

impl NetworkGuard {
    pub fn new(
        expected_chain: Option<ChainId>,
        network_name: Option<String>,
        contract: Option<Address>,
    ) -> Self {
        Self {
            expected_chain,
            network_name,
            contract,
        }
    }

    /// Guard with no expectations at all.
    pub fn unconfigured() -> Self {
        Self::default()
    }

    pub fn expected_chain(&self) -> Option<&ChainId> {
        self.expected_chain.as_ref()
    }

    pub fn contract(&self) -> Option<&Address> {
        self.contract.as_ref()
    }

    pub fn check_chain(&self, actual: &ChainId) -> Result<(), WalletError> {
        let Some(expected) = &self.expected_chain else {
            return Ok(());
        };

        if expected == actual {
            return Ok(());
        }

        let expected = match &self.network_name {
            Some(name) => format!("{} ({})", name, expected),
            None => expected.to_string(),
        };
        Err(WalletError::NetworkMismatch {
            expected,
            actual: actual.clone(),
        })
    }

    /// Read-only code lookup. A failed lookup is reported the same way as an
    /// empty account.
    pub async fn check_contract_deployed(
        &self,
        provider: &ProviderHandle,
        address: &Address,
    ) -> Result<(), WalletError> {
        match provider.request(RpcRequest::get_code(address)).await {
            Ok(code) if has_code(&code) => {
                debug!("Contract present at {}", address);
                Ok(())
            }
            Ok(_) => Err(WalletError::ContractNotFound(address.to_string())),
            Err(err) => {
                warn!("Code lookup for {} failed: {}", address, err);
                Err(WalletError::ContractNotFound(address.to_string()))
            }
        }
    }

    /// Contract check against the configured address; passes when none is set.
    pub async fn check_configured_contract(
        &self,
        provider: &ProviderHandle,
    ) -> Result<(), WalletError> {
        match &self.contract {
            Some(address) => self.check_contract_deployed(provider, address).await,
            None => Ok(()),
        }
    }

    /// Both checks, failing on the first. Run before every state-mutating
    /// transaction and after a chain switch.
    pub async fn check_mandatory(
        &self,
        provider: &ProviderHandle,
        chain_id: &ChainId,
    ) -> Result<(), WalletError> {
        self.check_chain(chain_id)?;
        self.check_configured_contract(provider).await
    }

    /// Both checks, collecting failures instead of returning them. Used during
    /// connect, where they never block.
    pub async fn check_advisory(
        &self,
        provider: &ProviderHandle,
        chain_id: &ChainId,
    ) -> Vec<WalletError> {
        let mut warnings = Vec::new();
        if let Err(err) = self.check_chain(chain_id) {
            warn!("Connected on an unexpected network: {}", err);
            warnings.push(err);
        }
        if let Err(err) = self.check_configured_contract(provider).await {
            warn!("Contract check failed during connect: {}", err);
            warnings.push(err);
        }
        warnings
    }
}

fn has_code(value: &Value) -> bool {
    match value.as_str() {
        Some(code) => {
            let digits = code.trim().trim_start_matches("0x").trim_start_matches("0X");
            !digits.is_empty() && digits.chars().any(|c| c != '0')
        }
        None => false,
    }
}

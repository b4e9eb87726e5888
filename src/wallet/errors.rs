use thiserror::Error;

use crate::retry::{FailureClass, Retryable};
use crate::wallet::types::{ChainId, WalletKind};

/// EIP-1193 code for a request the user declined in the wallet UI.
pub const USER_REJECTED_CODE: i64 = 4001;
/// The requested method or account has not been authorized by the user.
pub const UNAUTHORIZED_CODE: i64 = 4100;
/// The provider is disconnected from all chains.
pub const DISCONNECTED_CODE: i64 = 4900;
/// The provider is not connected to the requested chain.
pub const CHAIN_DISCONNECTED_CODE: i64 = 4901;
/// A request of the same kind is already waiting for the user.
pub const REQUEST_PENDING_CODE: i64 = -32002;
/// JSON-RPC "method not found".
pub const METHOD_NOT_FOUND_CODE: i64 = -32601;

/// Hint attached to transport failures that survive every retry.
pub const TRANSPORT_HINT: &str =
    "check that the RPC endpoint is reachable; if you are using a local test chain (anvil, hardhat node), make sure it is running";

/// Raw error returned by a wallet provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", provider_message(.code, .message))]
pub struct ProviderError {
    pub code: Option<i64>,
    pub message: String,
}

fn provider_message(code: &Option<i64>, message: &str) -> String {
    match code {
        Some(code) => format!("provider error {}: {}", code, message),
        None => message.to_string(),
    }
}

impl ProviderError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    /// Error without a provider code, typically raised by the transport itself.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn user_rejected() -> Self {
        Self::new(USER_REJECTED_CODE, "User rejected the request.")
    }

    pub fn is_method_not_found(&self) -> bool {
        self.code == Some(METHOD_NOT_FOUND_CODE)
            || self.message.to_lowercase().contains("method not found")
            || self.message.to_lowercase().contains("does not exist")
    }

    pub fn classify(&self) -> FailureClass {
        FailureClass::classify(self.code, &self.message)
    }
}

/// Errors surfaced by the wallet session, network guard and transaction
/// submitter. Every variant renders as a message that can be shown directly.
#[derive(Debug, Clone, Error)]
pub enum WalletError {
    #[error("Request rejected in wallet: {0}")]
    UserRejected(String),

    #[error("A wallet request is already pending, open your wallet to continue: {0}")]
    RequestPending(String),

    #[error("{}", unavailable_message(.required, .detected))]
    ProviderUnavailable {
        required: WalletKind,
        detected: Vec<WalletKind>,
    },

    #[error("Found {candidates} providers that all qualify as {required}; disable the extras and retry")]
    AmbiguousProvider {
        required: WalletKind,
        candidates: usize,
    },

    #[error("Wrong network: expected {expected}, wallet is on {actual}")]
    NetworkMismatch { expected: String, actual: ChainId },

    #[error("No contract deployed at {0} on the current network")]
    ContractNotFound(String),

    #[error("Network request failed: {message} ({hint})")]
    TransportFailure { message: String, hint: String },

    #[error("Transaction {0} was reverted")]
    TransactionReverted(String),

    #[error("Wallet not connected")]
    NotConnected,

    #[error("Wallet returned no authorized accounts")]
    NoAccounts,

    #[error("Move submitted without a resulting position")]
    MissingPosition,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Unknown wallet kind '{0}' (expected one of metamask, coinbase, brave, rabby, phantom, trust, okx)")]
    UnknownWalletKind(String),

    #[error("Connection attempt was cancelled")]
    ConnectCancelled,

    #[error("Unexpected provider response: {0}")]
    InvalidResponse(String),

    #[error("Wallet provider error: {0}")]
    Provider(ProviderError),

    #[error("Wallet session has shut down")]
    SessionClosed,
}

fn unavailable_message(required: &WalletKind, detected: &[WalletKind]) -> String {
    if detected.is_empty() {
        format!("{} not found. Install the {} extension and reload.", required, required)
    } else {
        let others = detected
            .iter()
            .map(|kind| kind.display_name())
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "{} not found. Detected other wallets: {}. Enable {} or disable the others.",
            required, others, required
        )
    }
}

impl WalletError {
    pub fn transport(message: impl Into<String>) -> Self {
        WalletError::TransportFailure {
            message: message.into(),
            hint: TRANSPORT_HINT.to_string(),
        }
    }

    /// Guard failures are the errors that are only warnings during connect.
    pub fn is_guard_failure(&self) -> bool {
        matches!(
            self,
            WalletError::NetworkMismatch { .. } | WalletError::ContractNotFound(_)
        )
    }
}

impl From<ProviderError> for WalletError {
    fn from(err: ProviderError) -> Self {
        match err.classify() {
            FailureClass::UserRejected => WalletError::UserRejected(err.message),
            FailureClass::AlreadyPending => WalletError::RequestPending(err.message),
            FailureClass::Transport => WalletError::transport(err.message),
            FailureClass::Fatal => WalletError::Provider(err),
        }
    }
}

impl Retryable for WalletError {
    fn failure_class(&self) -> FailureClass {
        match self {
            WalletError::UserRejected(_) => FailureClass::UserRejected,
            WalletError::RequestPending(_) => FailureClass::AlreadyPending,
            WalletError::TransportFailure { .. } => FailureClass::Transport,
            WalletError::Provider(err) => err.classify(),
            _ => FailureClass::Fatal,
        }
    }
}

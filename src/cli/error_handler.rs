use crate::game::GameError;
use crate::retry::Retryable;
use crate::storage::errors::StorageError;
use crate::wallet::errors::WalletError;
use std::fmt;

/// Unified error type for CLI operations with user-friendly messages
#[derive(Debug)]
pub enum CliError {
    /// Wallet, network guard or transaction error
    Wallet(WalletError),
    /// Lobby or move error
    Game(GameError),
    /// Database/storage error
    Storage(StorageError),
    /// Input validation error
    InvalidInput {
        field: String,
        value: String,
        reason: String,
        suggestion: String,
    },
    /// Configuration error
    Configuration {
        setting: String,
        issue: String,
        suggestion: String,
    },
    /// User-friendly error with custom message
    UserError {
        message: String,
        suggestion: Option<String>,
    },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Wallet(e) => write!(f, "{}", format_wallet_error(e)),
            CliError::Game(e) => write!(f, "{}", format_game_error(e)),
            CliError::Storage(e) => write!(f, "{}", format_storage_error(e)),
            CliError::InvalidInput {
                field,
                value,
                reason,
                suggestion,
            } => {
                write!(
                    f,
                    "❌ Invalid {}: '{}'\n   Reason: {}\n   💡 Suggestion: {}",
                    field, value, reason, suggestion
                )
            }
            CliError::Configuration {
                setting,
                issue,
                suggestion,
            } => {
                write!(
                    f,
                    "⚙️  Configuration Error: {}\n   Issue: {}\n   💡 Suggestion: {}",
                    setting, issue, suggestion
                )
            }
            CliError::UserError {
                message,
                suggestion,
            } => {
                if let Some(suggestion) = suggestion {
                    write!(f, "❌ {}\n   💡 Suggestion: {}", message, suggestion)
                } else {
                    write!(f, "❌ {}", message)
                }
            }
        }
    }
}

impl std::error::Error for CliError {}

impl From<WalletError> for CliError {
    fn from(err: WalletError) -> Self {
        CliError::Wallet(err)
    }
}

impl From<GameError> for CliError {
    fn from(err: GameError) -> Self {
        match err {
            GameError::Wallet(e) => CliError::Wallet(e),
            GameError::Storage(e) => CliError::Storage(e),
            other => CliError::Game(other),
        }
    }
}

impl From<StorageError> for CliError {
    fn from(err: StorageError) -> Self {
        CliError::Storage(err)
    }
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(storage) = err.downcast_ref::<StorageError>() {
            return CliError::UserError {
                message: format!("{:#}", err),
                suggestion: Some(storage_suggestion(storage).to_string()),
            };
        }

        let root_cause = err.root_cause().to_string();
        if root_cause.contains("CHAINMATE_") || root_cause.contains("config") {
            return CliError::Configuration {
                setting: "configuration".to_string(),
                issue: format!("{:#}", err),
                suggestion: "Fix the value in config.toml or the CHAINMATE_* environment variable and try again.".to_string(),
            };
        }

        CliError::UserError {
            message: format!("{:#}", err),
            suggestion: Some("Check the error details above and try again.".to_string()),
        }
    }
}

/// Format wallet errors with user-friendly messages
fn format_wallet_error(error: &WalletError) -> String {
    match error {
        WalletError::UserRejected(_) => {
            format!("🦊 {}\n   💡 Suggestion: Approve the request in your wallet to continue.", error)
        }
        WalletError::RequestPending(_) => {
            format!("🦊 {}\n   💡 Suggestion: Open the wallet and approve or reject the waiting request first.", error)
        }
        WalletError::ProviderUnavailable { .. } | WalletError::AmbiguousProvider { .. } => {
            format!("🦊 {}\n   💡 Suggestion: Check 'wallet_kind' in config.toml matches the wallet you use.", error)
        }
        WalletError::NetworkMismatch { .. } => {
            format!("🌐 {}\n   💡 Suggestion: Switch networks in your wallet, or update CHAINMATE_CHAIN_ID.", error)
        }
        WalletError::ContractNotFound(_) => {
            format!("📜 {}\n   💡 Suggestion: Deploy the game contract or correct CHAINMATE_CONTRACT_ADDRESS.", error)
        }
        WalletError::TransportFailure { message, hint } => {
            format!("🌐 Network request failed after retries: {}\n   💡 Suggestion: {}", message, hint)
        }
        WalletError::TransactionReverted(_) => {
            format!("📜 {}\n   💡 Suggestion: The contract refused the call. Check the game state with 'chainmate show <id>'.", error)
        }
        WalletError::UnknownWalletKind(_) => {
            format!("⚙️  {}\n   💡 Suggestion: Fix 'wallet_kind' in config.toml or CHAINMATE_WALLET_KIND.", error)
        }
        WalletError::ConnectCancelled => {
            format!("🦊 {}\n   💡 Suggestion: Run 'chainmate connect' again when you are ready to approve.", error)
        }
        WalletError::NotConnected | WalletError::NoAccounts => {
            format!("🦊 {}\n   💡 Suggestion: Unlock your wallet and run 'chainmate connect'.", error)
        }
        _ => format!("🦊 {}\n   💡 Suggestion: Try again; if it persists, restart your wallet.", error),
    }
}

/// Format lobby and move errors with user-friendly messages
fn format_game_error(error: &GameError) -> String {
    match error {
        GameError::GameNotFound(_) => {
            format!("🎮 {}\n   💡 Suggestion: Use 'chainmate games' to see your games, or check the game ID.", error)
        }
        GameError::GameFull(_) | GameError::OwnGame(_) => {
            format!("🎮 {}\n   💡 Suggestion: Create a new game with 'chainmate create-game'.", error)
        }
        GameError::NotYourTurn(_) | GameError::GameFinished(_) | GameError::NotAPlayer(_) => {
            format!("🎮 {}\n   💡 Suggestion: Check the game with 'chainmate show <id>'.", error)
        }
        GameError::IllegalMove(_) => {
            format!("♟️  {}\n   💡 Suggestion: Moves use from/to squares such as e2 e4.", error)
        }
        GameError::Wallet(e) => format_wallet_error(e),
        GameError::Storage(e) => format_storage_error(e),
    }
}

/// Format storage errors with user-friendly messages
fn format_storage_error(error: &StorageError) -> String {
    format!("🗃️  {}\n   💡 Suggestion: {}", error, storage_suggestion(error))
}

fn storage_suggestion(error: &StorageError) -> &'static str {
    match error {
        StorageError::GameNotFound(_) => "Use 'chainmate games' to see available games.",
        StorageError::DatabasePathError(_) | StorageError::IoError(_) => {
            "Check that CHAINMATE_DATA_DIR points to a writable directory."
        }
        StorageError::MigrationFailed { .. } => {
            "The database may be from a newer version. Move it aside and try again."
        }
        _ => "Check file permissions and disk space. Try restarting the application.",
    }
}

/// Create an input validation error with helpful suggestions
pub fn create_input_validation_error(field: &str, value: &str, reason: &str) -> CliError {
    let suggestion = match field {
        "opponent" => "Use a 0x-prefixed address with 40 hex digits.",
        "game_id" => "Use 'chainmate games' to see valid game IDs.",
        _ => "Check the input format and try again.",
    };

    CliError::InvalidInput {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
        suggestion: suggestion.to_string(),
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Display an error with proper formatting and exit codes
pub fn display_error_and_exit(error: CliError, exit_code: i32) -> ! {
    eprintln!("\n{}", error);
    std::process::exit(exit_code);
}

/// Check if an error is worth retrying by hand
pub fn is_recoverable_error(error: &CliError) -> bool {
    match error {
        CliError::Wallet(e) => e.failure_class().is_retriable() || matches!(e, WalletError::UserRejected(_)),
        CliError::Game(GameError::IllegalMove(_)) => true,
        CliError::InvalidInput { .. } => true,
        _ => false,
    }
}

/// Process exit code for an error
pub fn exit_code(error: &CliError) -> i32 {
    match error {
        CliError::InvalidInput { .. } | CliError::Configuration { .. } => 2,
        _ => 1,
    }
}

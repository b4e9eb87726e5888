pub mod cli;
pub mod config;
pub mod game;
pub mod retry;
pub mod session;
pub mod storage;
pub mod transactions;
pub mod wallet;

// Re-export key types for easy testing
pub use config::Config;
pub use game::{GameError, GameLobby, MoveCoordinator, RulesEngine};
pub use retry::{RetryExecutor, RetryPolicy};
pub use session::{SessionSnapshot, SessionStatus, WalletSession};
pub use transactions::TransactionSubmitter;
pub use wallet::{Address, ChainId, ProviderLocator, WalletError, WalletKind, WalletState};

use thiserror::Error;

use crate::game::rules::IllegalMove;
use crate::storage::models::PlayerColor;
use crate::storage::StorageError;
use crate::wallet::errors::WalletError;

#[derive(Debug, Error)]
pub enum GameError {
    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),

    #[error("Illegal move: {0}")]
    IllegalMove(#[from] IllegalMove),

    #[error("Game not found: {0}")]
    GameNotFound(String),

    #[error("Game {0} is finished")]
    GameFinished(String),

    #[error("Not your turn: {0} to move")]
    NotYourTurn(PlayerColor),

    #[error("You are not a player in game {0}")]
    NotAPlayer(String),

    #[error("Game {0} already has two players")]
    GameFull(String),

    #[error("You cannot join your own game {0}")]
    OwnGame(String),
}

impl GameError {
    /// Map a storage lookup failure, keeping "not found" distinct.
    pub(crate) fn from_lookup(err: StorageError) -> Self {
        match err {
            StorageError::GameNotFound(id) => GameError::GameNotFound(id),
            other => GameError::Storage(other),
        }
    }
}

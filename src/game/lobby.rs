use std::sync::Arc;
use tracing::{info, warn};

use super::errors::GameError;
use crate::storage::models::{current_timestamp, GameRecord, GameStatus};
use crate::storage::GameStore;
use crate::transactions::TransactionSubmitter;
use crate::wallet::errors::WalletError;
use crate::wallet::types::{Address, WalletState};

/// Game creation, seating and lookup for the connected wallet.
pub struct GameLobby {
    submitter: Arc<TransactionSubmitter>,
    store: Arc<dyn GameStore>,
}

impl GameLobby {
    pub fn new(submitter: Arc<TransactionSubmitter>, store: Arc<dyn GameStore>) -> Self {
        Self { submitter, store }
    }

    fn wallet(&self) -> Result<WalletState, GameError> {
        Ok(self
            .submitter
            .session()
            .wallet()
            .ok_or(WalletError::NotConnected)?)
    }

    /// Create a game with the connected wallet as white.
    ///
    /// The id comes from the contract when one is configured and is generated
    /// locally otherwise. A failed local insert does not undo the on-chain
    /// game; the record is returned anyway.
    pub async fn create_game(&self, opponent: Option<&Address>) -> Result<GameRecord, GameError> {
        let wallet = self.wallet()?;
        let game_id = self.submitter.create_game(opponent).await?;
        let game = GameRecord::new(
            game_id,
            wallet.address,
            opponent.cloned(),
            current_timestamp(),
        );

        match self.store.insert_game(&game) {
            Ok(()) => info!("Created game {}", game.id),
            Err(e) => warn!("Game {} created but not saved locally: {}", game.id, e),
        }
        Ok(game)
    }

    /// Take the black seat of a waiting game.
    ///
    /// Joining a game you already sit in as black returns it unchanged.
    pub async fn join_game(&self, game_id: &str) -> Result<GameRecord, GameError> {
        let wallet = self.wallet()?;
        let game = self.load_game(game_id)?;

        if game.player1 == wallet.address {
            return Err(GameError::OwnGame(game.id));
        }
        if game.player2.as_ref() == Some(&wallet.address) {
            return Ok(game);
        }
        if game.is_finished() {
            return Err(GameError::GameFinished(game.id));
        }
        if game.player2.is_some() {
            return Err(GameError::GameFull(game.id));
        }

        let now = current_timestamp();
        match self.store.claim_second_seat(&game.id, &wallet.address, now) {
            Ok(true) => {
                info!("Joined game {} as black", game.id);
                self.load_game(&game.id)
            }
            Ok(false) => {
                let current = self.load_game(&game.id)?;
                if current.player2.as_ref() == Some(&wallet.address) {
                    Ok(current)
                } else {
                    Err(GameError::GameFull(current.id))
                }
            }
            Err(e) => {
                warn!("Joined game {} but the seat was not saved: {}", game.id, e);
                let mut joined = game;
                joined.player2 = Some(wallet.address);
                joined.status = GameStatus::Active;
                joined.updated_at = now;
                Ok(joined)
            }
        }
    }

    pub fn load_game(&self, game_id: &str) -> Result<GameRecord, GameError> {
        self.store.get_game(game_id).map_err(GameError::from_lookup)
    }

    /// Games involving `player`, most recently updated first.
    pub fn games_for(&self, player: &Address) -> Result<Vec<GameRecord>, GameError> {
        Ok(self.store.games_for_player(player)?)
    }

    pub fn my_games(&self) -> Result<Vec<GameRecord>, GameError> {
        let wallet = self.wallet()?;
        self.games_for(&wallet.address)
    }
}

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::errors::GameError;
use super::rules::{Promotion, RulesEngine, Square};
use crate::storage::models::{current_timestamp, GameRecord, GameStatus};
use crate::storage::GameStore;
use crate::transactions::{MoveRequest, TransactionSubmitter};
use crate::wallet::errors::WalletError;

/// Validates a move locally, sends it on-chain, then advances the stored
/// game.
///
/// The rules engine runs before anything touches the network, so an illegal
/// move never costs a transaction. Only the fields a move owns are written
/// back, so a seat claimed while the transaction was pending survives. Once
/// the chain has accepted a move a storage failure is logged and the updated
/// game is still returned.
pub struct MoveCoordinator {
    submitter: Arc<TransactionSubmitter>,
    rules: Arc<dyn RulesEngine>,
    store: Arc<dyn GameStore>,
}

impl MoveCoordinator {
    pub fn new(
        submitter: Arc<TransactionSubmitter>,
        rules: Arc<dyn RulesEngine>,
        store: Arc<dyn GameStore>,
    ) -> Self {
        Self {
            submitter,
            rules,
            store,
        }
    }

    pub async fn submit_move(
        &self,
        game_id: &str,
        from: &str,
        to: &str,
        promotion: Option<&str>,
    ) -> Result<GameRecord, GameError> {
        let game = self.store.get_game(game_id).map_err(GameError::from_lookup)?;
        if game.is_finished() {
            return Err(GameError::GameFinished(game.id));
        }

        let wallet = self
            .submitter
            .session()
            .wallet()
            .ok_or(WalletError::NotConnected)?;
        let mover = game
            .color_of(&wallet.address)
            .ok_or_else(|| GameError::NotAPlayer(game.id.clone()))?;
        if mover != game.current_player {
            return Err(GameError::NotYourTurn(game.current_player));
        }

        let from: Square = from.parse()?;
        let to: Square = to.parse()?;
        let promotion = promotion.map(str::parse::<Promotion>).transpose()?;

        let applied = self
            .rules
            .apply_move(&game.position, &from, &to, promotion)?;
        debug!(
            "Move {}{} in game {} is legal: {}",
            from, to, game.id, applied.notation
        );

        let request = MoveRequest::new(
            game.id.clone(),
            from.as_str(),
            to.as_str(),
            promotion.map(|piece| piece.as_char().to_string()),
            applied.new_position.clone(),
        );
        let receipt = self.submitter.send_move(&request).await?;
        info!(
            "Move {} in game {} sent as {} ({:?})",
            applied.notation, game.id, receipt.tx_hash, receipt.status
        );

        let prior_moves = game.move_history.len();
        let mut updated = game;
        updated.move_history.push(applied.notation.clone());
        updated.position = applied.new_position;
        updated.current_player = mover.opposite();
        updated.updated_at = current_timestamp();
        if self.rules.is_checkmate(&updated.position) {
            updated.status = GameStatus::Finished;
            updated.winner = Some(wallet.address);
        } else if self.rules.is_draw(&updated.position) {
            updated.status = GameStatus::Finished;
        }

        match self.store.record_move(&updated, prior_moves) {
            Ok(stored) => Ok(stored),
            Err(e) => {
                warn!(
                    "Move in game {} accepted on-chain but not saved locally: {}",
                    updated.id, e
                );
                Ok(updated)
            }
        }
    }
}

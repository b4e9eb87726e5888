//! Process-local stores for embedders without SQLite.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::storage::errors::{Result, StorageError};
use crate::storage::games::GameStore;
use crate::storage::models::{GameRecord, GameStatus};
use crate::storage::session::SessionStore;
use crate::wallet::types::{Address, WalletState};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex.lock().map_err(|_| StorageError::LockPoisoned)
}

#[derive(Debug, Default)]
pub struct MemoryGameStore {
    games: Mutex<HashMap<String, GameRecord>>,
}

impl MemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.games.lock().map(|games| games.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl GameStore for MemoryGameStore {
    fn insert_game(&self, game: &GameRecord) -> Result<()> {
        let mut games = lock(&self.games)?;
        if games.contains_key(&game.id) {
            return Err(StorageError::DuplicateGame(game.id.clone()));
        }
        games.insert(game.id.clone(), game.clone());
        Ok(())
    }

    fn get_game(&self, id: &str) -> Result<GameRecord> {
        lock(&self.games)?
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::game_not_found(id))
    }

    fn update_game(&self, game: &GameRecord) -> Result<()> {
        let mut games = lock(&self.games)?;
        let stored = games
            .get_mut(&game.id)
            .ok_or_else(|| StorageError::game_not_found(&game.id))?;
        let created_at = stored.created_at;
        *stored = game.clone();
        stored.created_at = created_at;
        Ok(())
    }

    fn record_move(&self, game: &GameRecord, prior_moves: usize) -> Result<GameRecord> {
        let mut games = lock(&self.games)?;
        let stored = games
            .get_mut(&game.id)
            .ok_or_else(|| StorageError::game_not_found(&game.id))?;
        if stored.move_history.len() != prior_moves {
            return Err(StorageError::MoveConflict {
                id: game.id.clone(),
                expected: prior_moves,
            });
        }

        stored.position = game.position.clone();
        stored.move_history = game.move_history.clone();
        stored.current_player = game.current_player;
        stored.updated_at = game.updated_at;
        if game.is_finished() {
            stored.status = GameStatus::Finished;
            stored.winner = game.winner.clone();
        }
        Ok(stored.clone())
    }

    fn claim_second_seat(&self, id: &str, player2: &Address, updated_at: i64) -> Result<bool> {
        let mut games = lock(&self.games)?;
        let game = games.get_mut(id).ok_or_else(|| StorageError::game_not_found(id))?;
        if game.player2.is_some() {
            return Ok(false);
        }
        game.player2 = Some(player2.clone());
        game.status = GameStatus::Active;
        game.updated_at = updated_at;
        Ok(true)
    }

    fn games_for_player(&self, player: &Address) -> Result<Vec<GameRecord>> {
        let mut games: Vec<GameRecord> = lock(&self.games)?
            .values()
            .filter(|game| game.involves(player))
            .cloned()
            .collect();
        games.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(games)
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<WalletState>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a snapshot, as if left by an earlier run.
    pub fn with_state(state: WalletState) -> Self {
        Self {
            slot: Mutex::new(Some(state)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<WalletState>> {
        Ok(lock(&self.slot)?.clone())
    }

    fn save(&self, state: &WalletState) -> Result<()> {
        *lock(&self.slot)? = Some(state.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *lock(&self.slot)? = None;
        Ok(())
    }
}

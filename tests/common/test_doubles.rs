use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use chainmate::game::rules::{AppliedMove, IllegalMove, Promotion, RulesEngine, Square};
use chainmate::storage::errors::{Result as StorageResult, StorageError};
use chainmate::storage::{GameRecord, GameStore, MemoryGameStore};
use chainmate::wallet::types::Address;

/// Rules engine that knows only the moves it was taught.
#[derive(Default)]
pub struct ScriptedRules {
    moves: HashMap<(String, String, String), AppliedMove>,
    checkmates: HashSet<String>,
    draws: HashSet<String>,
    calls: AtomicUsize,
}

impl ScriptedRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_move(mut self, position: &str, from: &str, to: &str, new_position: &str, notation: &str) -> Self {
        self.moves.insert(
            (position.to_string(), from.to_string(), to.to_string()),
            AppliedMove {
                new_position: new_position.to_string(),
                notation: notation.to_string(),
            },
        );
        self
    }

    pub fn with_checkmate(mut self, position: &str) -> Self {
        self.checkmates.insert(position.to_string());
        self
    }

    pub fn with_draw(mut self, position: &str) -> Self {
        self.draws.insert(position.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RulesEngine for ScriptedRules {
    fn apply_move(
        &self,
        position: &str,
        from: &Square,
        to: &Square,
        _promotion: Option<Promotion>,
    ) -> Result<AppliedMove, IllegalMove> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.moves
            .get(&(position.to_string(), from.to_string(), to.to_string()))
            .cloned()
            .ok_or_else(|| IllegalMove::new(format!("{}{} is not legal here", from, to)))
    }

    fn is_checkmate(&self, position: &str) -> bool {
        self.checkmates.contains(position)
    }

    fn is_draw(&self, position: &str) -> bool {
        self.draws.contains(position)
    }
}

/// Game store whose writes can be switched to fail. Reads always go to the
/// wrapped in-memory store.
#[derive(Default)]
pub struct FailingGameStore {
    inner: MemoryGameStore,
    fail_writes: AtomicBool,
    writes: Mutex<Vec<String>>,
}

impl FailingGameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a game directly, bypassing the failure switch.
    pub fn seed(&self, game: &GameRecord) {
        self.inner.insert_game(game).unwrap();
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Names of attempted write operations, in order.
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    fn write(&self, operation: &str) -> StorageResult<()> {
        self.writes.lock().unwrap().push(operation.to_string());
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StorageError::Unavailable(format!("{} refused", operation)))
        } else {
            Ok(())
        }
    }
}

impl GameStore for FailingGameStore {
    fn insert_game(&self, game: &GameRecord) -> StorageResult<()> {
        self.write("insert")?;
        self.inner.insert_game(game)
    }

    fn get_game(&self, id: &str) -> StorageResult<GameRecord> {
        self.inner.get_game(id)
    }

    fn update_game(&self, game: &GameRecord) -> StorageResult<()> {
        self.write("update")?;
        self.inner.update_game(game)
    }

    fn record_move(&self, game: &GameRecord, prior_moves: usize) -> StorageResult<GameRecord> {
        self.write("move")?;
        self.inner.record_move(game, prior_moves)
    }

    fn claim_second_seat(&self, id: &str, player2: &Address, updated_at: i64) -> StorageResult<bool> {
        self.write("claim")?;
        self.inner.claim_second_seat(id, player2, updated_at)
    }

    fn games_for_player(&self, player: &Address) -> StorageResult<Vec<GameRecord>> {
        self.inner.games_for_player(player)
    }
}

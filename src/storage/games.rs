use crate::storage::database::Database;
use crate::storage::errors::{Result, StorageError};
use crate::storage::models::{GameRecord, GameStatus, PlayerColor};
use crate::wallet::types::Address;
use rusqlite::{named_params, Row};

/// Record-oriented game persistence.
pub trait GameStore: Send + Sync {
    /// Insert a new record. Fails with `DuplicateGame` if the id exists.
    fn insert_game(&self, game: &GameRecord) -> Result<()>;

    fn get_game(&self, id: &str) -> Result<GameRecord>;

    /// Overwrite the mutable fields of an existing record.
    fn update_game(&self, game: &GameRecord) -> Result<()>;

    /// Apply one move to the stored record: position, history, turn and
    /// `updated_at`, plus `status`/`winner` when `game` is finished. Seats are
    /// never touched. Fails with `MoveConflict` unless the stored history
    /// still holds exactly `prior_moves` entries. Returns the stored record.
    fn record_move(&self, game: &GameRecord, prior_moves: usize) -> Result<GameRecord>;

    /// Set `player2` and mark the game active, only if the second seat is
    /// still empty. Returns whether this call won the seat.
    fn claim_second_seat(&self, id: &str, player2: &Address, updated_at: i64) -> Result<bool>;

    /// Games where `player` holds either seat, most recently updated first.
    fn games_for_player(&self, player: &Address) -> Result<Vec<GameRecord>>;
}

const GAME_COLUMNS: &str = "id, player1, player2, current_player, position, move_history, \
                            status, winner, created_at, updated_at";

impl GameStore for Database {
    fn insert_game(&self, game: &GameRecord) -> Result<()> {
        let history = serde_json::to_string(&game.move_history)?;

        self.with_connection(|conn| {
            let inserted = conn.execute(
                r#"
                INSERT OR IGNORE INTO games (
                    id, player1, player2, current_player, position, move_history,
                    status, winner, created_at, updated_at
                ) VALUES (
                    :id, :player1, :player2, :current_player, :position, :move_history,
                    :status, :winner, :created_at, :updated_at
                )
                "#,
                named_params! {
                    ":id": game.id,
                    ":player1": game.player1.as_str(),
                    ":player2": game.player2.as_ref().map(|p| p.as_str()),
                    ":current_player": game.current_player.as_str(),
                    ":position": game.position,
                    ":move_history": history,
                    ":status": game.status.as_str(),
                    ":winner": game.winner.as_ref().map(|w| w.as_str()),
                    ":created_at": game.created_at,
                    ":updated_at": game.updated_at,
                },
            )?;

            if inserted == 0 {
                return Err(StorageError::DuplicateGame(game.id.clone()));
            }
            Ok(())
        })
    }

    fn get_game(&self, id: &str) -> Result<GameRecord> {
        self.with_connection(|conn| {
            let row = conn.query_row(
                &format!("SELECT {} FROM games WHERE id = ?1", GAME_COLUMNS),
                [id],
                RawGame::from_row,
            );
            match row {
                Ok(raw) => raw.into_record(),
                Err(rusqlite::Error::QueryReturnedNoRows) => Err(StorageError::game_not_found(id)),
                Err(e) => Err(StorageError::ConnectionFailed(e)),
            }
        })
    }

    fn update_game(&self, game: &GameRecord) -> Result<()> {
        let history = serde_json::to_string(&game.move_history)?;

        self.with_connection(|conn| {
            let rows_affected = conn.execute(
                r#"
                UPDATE games
                SET player2 = :player2, current_player = :current_player, position = :position,
                    move_history = :move_history, status = :status, winner = :winner,
                    updated_at = :updated_at
                WHERE id = :id
                "#,
                named_params! {
                    ":id": game.id,
                    ":player2": game.player2.as_ref().map(|p| p.as_str()),
                    ":current_player": game.current_player.as_str(),
                    ":position": game.position,
                    ":move_history": history,
                    ":status": game.status.as_str(),
                    ":winner": game.winner.as_ref().map(|w| w.as_str()),
                    ":updated_at": game.updated_at,
                },
            )?;

            if rows_affected == 0 {
                return Err(StorageError::game_not_found(&game.id));
            }
            Ok(())
        })
    }

    fn record_move(&self, game: &GameRecord, prior_moves: usize) -> Result<GameRecord> {
        let history = serde_json::to_string(&game.move_history)?;

        self.with_transaction(|conn| {
            let rows_affected = conn.execute(
                r#"
                UPDATE games
                SET position = :position, move_history = :move_history,
                    current_player = :current_player,
                    status = CASE WHEN :finished THEN :status ELSE status END,
                    winner = CASE WHEN :finished THEN :winner ELSE winner END,
                    updated_at = :updated_at
                WHERE id = :id AND json_array_length(move_history) = :prior_moves
                "#,
                named_params! {
                    ":id": game.id,
                    ":position": game.position,
                    ":move_history": history,
                    ":current_player": game.current_player.as_str(),
                    ":finished": game.is_finished(),
                    ":status": game.status.as_str(),
                    ":winner": game.winner.as_ref().map(|w| w.as_str()),
                    ":updated_at": game.updated_at,
                    ":prior_moves": prior_moves as i64,
                },
            )?;

            if rows_affected == 0 {
                let exists: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM games WHERE id = ?1",
                    [&game.id],
                    |row| row.get(0),
                )?;
                if exists == 0 {
                    return Err(StorageError::game_not_found(&game.id));
                }
                return Err(StorageError::MoveConflict {
                    id: game.id.clone(),
                    expected: prior_moves,
                });
            }

            conn.query_row(
                &format!("SELECT {} FROM games WHERE id = ?1", GAME_COLUMNS),
                [&game.id],
                RawGame::from_row,
            )?
            .into_record()
        })
    }

    fn claim_second_seat(&self, id: &str, player2: &Address, updated_at: i64) -> Result<bool> {
        self.with_transaction(|conn| {
            let rows_affected = conn.execute(
                r#"
                UPDATE games
                SET player2 = ?1, status = ?2, updated_at = ?3
                WHERE id = ?4 AND player2 IS NULL
                "#,
                (player2.as_str(), GameStatus::Active.as_str(), updated_at, id),
            )?;

            if rows_affected == 1 {
                return Ok(true);
            }

            let exists: i64 =
                conn.query_row("SELECT COUNT(*) FROM games WHERE id = ?1", [id], |row| row.get(0))?;
            if exists == 0 {
                return Err(StorageError::game_not_found(id));
            }
            Ok(false)
        })
    }

    fn games_for_player(&self, player: &Address) -> Result<Vec<GameRecord>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM games WHERE player1 = ?1 OR player2 = ?1 ORDER BY updated_at DESC",
                GAME_COLUMNS
            ))?;

            let raw_games = stmt
                .query_map([player.as_str()], RawGame::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            let games = raw_games
                .into_iter()
                .map(RawGame::into_record)
                .collect::<Result<Vec<_>>>()?;
            Ok(games)
        })
    }
}

/// Column values as stored, before validation.
struct RawGame {
    id: String,
    player1: String,
    player2: Option<String>,
    current_player: String,
    position: String,
    move_history: String,
    status: String,
    winner: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl RawGame {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            player1: row.get("player1")?,
            player2: row.get("player2")?,
            current_player: row.get("current_player")?,
            position: row.get("position")?,
            move_history: row.get("move_history")?,
            status: row.get("status")?,
            winner: row.get("winner")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn into_record(self) -> Result<GameRecord> {
        let address = |raw: &str| {
            Address::parse(raw)
                .map_err(|_| StorageError::InvalidData(format!("bad address '{}' in game {}", raw, self.id)))
        };

        Ok(GameRecord {
            player1: address(&self.player1)?,
            player2: self.player2.as_deref().map(address).transpose()?,
            current_player: self.current_player.parse::<PlayerColor>()?,
            position: self.position.clone(),
            move_history: serde_json::from_str(&self.move_history)?,
            status: self.status.parse::<GameStatus>()?,
            winner: self.winner.as_deref().map(address).transpose()?,
            created_at: self.created_at,
            updated_at: self.updated_at,
            id: self.id.clone(),
        })
    }
}

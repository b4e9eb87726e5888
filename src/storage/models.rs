use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::storage::errors::StorageError;
use crate::wallet::types::Address;

/// Standard chess starting position in FEN.
pub const START_POSITION: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerColor {
    White,
    Black,
}

impl PlayerColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerColor::White => "white",
            PlayerColor::Black => "black",
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            PlayerColor::White => PlayerColor::Black,
            PlayerColor::Black => PlayerColor::White,
        }
    }
}

impl FromStr for PlayerColor {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "white" => Ok(PlayerColor::White),
            "black" => Ok(PlayerColor::Black),
            other => Err(StorageError::InvalidData(format!("unknown color '{}'", other))),
        }
    }
}

impl fmt::Display for PlayerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    /// Created without an opponent; the second seat is open.
    Waiting,
    Active,
    Finished,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Waiting => "waiting",
            GameStatus::Active => "active",
            GameStatus::Finished => "finished",
        }
    }
}

impl FromStr for GameStatus {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "waiting" => Ok(GameStatus::Waiting),
            "active" => Ok(GameStatus::Active),
            "finished" => Ok(GameStatus::Finished),
            other => Err(StorageError::InvalidData(format!("unknown status '{}'", other))),
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A game as stored. `player1` plays white.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: String,
    pub player1: Address,
    pub player2: Option<Address>,
    pub current_player: PlayerColor,
    pub position: String,
    pub move_history: Vec<String>,
    pub status: GameStatus,
    pub winner: Option<Address>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl GameRecord {
    /// Fresh game at the starting position. Active when an opponent is
    /// already known, waiting otherwise.
    pub fn new(id: impl Into<String>, player1: Address, player2: Option<Address>, now: i64) -> Self {
        let status = if player2.is_some() {
            GameStatus::Active
        } else {
            GameStatus::Waiting
        };
        Self {
            id: id.into(),
            player1,
            player2,
            current_player: PlayerColor::White,
            position: START_POSITION.to_string(),
            move_history: Vec::new(),
            status,
            winner: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status == GameStatus::Finished
    }

    pub fn player(&self, color: PlayerColor) -> Option<&Address> {
        match color {
            PlayerColor::White => Some(&self.player1),
            PlayerColor::Black => self.player2.as_ref(),
        }
    }

    pub fn color_of(&self, address: &Address) -> Option<PlayerColor> {
        if &self.player1 == address {
            Some(PlayerColor::White)
        } else if self.player2.as_ref() == Some(address) {
            Some(PlayerColor::Black)
        } else {
            None
        }
    }

    pub fn involves(&self, address: &Address) -> bool {
        self.color_of(address).is_some()
    }

    /// Even history length exactly when white is to move.
    pub fn turn_is_consistent(&self) -> bool {
        (self.move_history.len() % 2 == 0) == (self.current_player == PlayerColor::White)
    }
}

/// Milliseconds since the Unix epoch.
pub fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}

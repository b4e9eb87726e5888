//! Boundary to the chess rules engine.
//!
//! Legality checking lives outside this crate. The coordinator only needs a
//! pure function from (position, move) to the next position and its
//! notation, plus the two end-of-game predicates.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Rejection from the rules engine, shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct IllegalMove(pub String);

impl IllegalMove {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

fn square_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-h][1-8]$").expect("static regex"))
}

/// Board square in algebraic form, e.g. `e4`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Square(String);

impl Square {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Square {
    type Err = IllegalMove;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        if square_pattern().is_match(&lowered) {
            Ok(Square(lowered))
        } else {
            Err(IllegalMove::new(format!("'{}' is not a square", s)))
        }
    }
}

impl TryFrom<String> for Square {
    type Error = IllegalMove;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Square> for String {
    fn from(square: Square) -> Self {
        square.0
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Promotion {
    Queen,
    Rook,
    Bishop,
    Knight,
}

impl Promotion {
    pub fn as_char(&self) -> char {
        match self {
            Promotion::Queen => 'q',
            Promotion::Rook => 'r',
            Promotion::Bishop => 'b',
            Promotion::Knight => 'n',
        }
    }
}

impl FromStr for Promotion {
    type Err = IllegalMove;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "q" | "queen" => Ok(Promotion::Queen),
            "r" | "rook" => Ok(Promotion::Rook),
            "b" | "bishop" => Ok(Promotion::Bishop),
            "n" | "knight" => Ok(Promotion::Knight),
            other => Err(IllegalMove::new(format!("cannot promote to '{}'", other))),
        }
    }
}

/// Result of applying a legal move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMove {
    pub new_position: String,
    /// Standard algebraic notation, e.g. `e4` or `Nxf7#`.
    pub notation: String,
}

pub trait RulesEngine: Send + Sync {
    fn apply_move(
        &self,
        position: &str,
        from: &Square,
        to: &Square,
        promotion: Option<Promotion>,
    ) -> Result<AppliedMove, IllegalMove>;

    fn is_checkmate(&self, position: &str) -> bool;

    fn is_draw(&self, position: &str) -> bool;
}

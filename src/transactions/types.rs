use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::models::current_timestamp;
use crate::wallet::types::Address;

/// Identifier of a game, on-chain or local.
pub type GameId = String;

/// A move ready to be sent. `new_position` must already be computed by the
/// rules engine; the submitter never derives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub game_id: GameId,
    pub from: String,
    pub to: String,
    pub promotion: Option<String>,
    pub new_position: Option<String>,
}

impl MoveRequest {
    pub fn new(
        game_id: impl Into<GameId>,
        from: impl Into<String>,
        to: impl Into<String>,
        promotion: Option<String>,
        new_position: impl Into<String>,
    ) -> Self {
        Self {
            game_id: game_id.into(),
            from: from.into(),
            to: to.into(),
            promotion,
            new_position: Some(new_position.into()),
        }
    }

    /// The computed position, if one was supplied and is non-empty.
    pub fn position(&self) -> Option<&str> {
        self.new_position
            .as_deref()
            .map(str::trim)
            .filter(|position| !position.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    /// Mined successfully.
    Confirmed,
    /// Submitted, but not mined within the receipt polling budget.
    Pending,
    /// No contract configured; nothing was sent.
    Offline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub tx_hash: String,
    pub block_number: Option<u64>,
    pub status: ReceiptStatus,
}

/// A transaction between submission and receipt. Logged, never stored.
#[derive(Debug, Clone)]
pub struct PendingTransaction {
    pub id: Uuid,
    pub from: Address,
    pub to: Address,
    pub payload: String,
    pub timestamp: i64,
}

impl PendingTransaction {
    pub fn new(from: Address, to: Address, payload: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            from,
            to,
            payload,
            timestamp: current_timestamp(),
        }
    }
}

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

/// `<prefix>_` + base36 millisecond timestamp + 8 random base36 characters.
pub fn generate_local_id(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..8)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    let millis = current_timestamp().max(0) as u64;
    format!("{}_{}{}", prefix, to_base36(millis), suffix)
}

/// Identifier for a game created without a contract.
pub fn generate_local_game_id() -> GameId {
    generate_local_id("game")
}

//! Calldata for the two game contract entry points.

use sha3::{Digest, Keccak256};

use crate::wallet::types::Address;

pub const CREATE_GAME_SIGNATURE: &str = "createGame(address)";
pub const SUBMIT_MOVE_SIGNATURE: &str = "submitMove(string,string,string,string,string)";

const WORD: usize = 32;

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// First four bytes of the Keccak-256 hash of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn address_word(address: &Address) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[12..].copy_from_slice(&address.to_bytes());
    word
}

fn uint_word(value: usize) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&(value as u64).to_be_bytes());
    word
}

/// Head/tail encoding of a call whose arguments are all `string`.
fn encode_strings(signature: &str, values: &[&str]) -> Vec<u8> {
    let mut head = Vec::with_capacity(values.len() * WORD);
    let mut tail = Vec::new();

    for value in values {
        head.extend_from_slice(&uint_word(values.len() * WORD + tail.len()));

        let bytes = value.as_bytes();
        tail.extend_from_slice(&uint_word(bytes.len()));
        tail.extend_from_slice(bytes);
        let padding = (WORD - bytes.len() % WORD) % WORD;
        tail.extend(std::iter::repeat(0u8).take(padding));
    }

    let mut data = selector(signature).to_vec();
    data.extend(head);
    data.extend(tail);
    data
}

fn to_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

/// `createGame(address opponent)`; the zero address stands for "no opponent".
pub fn encode_create_game(opponent: Option<&Address>) -> String {
    let opponent = opponent.cloned().unwrap_or_else(Address::zero);
    let mut data = selector(CREATE_GAME_SIGNATURE).to_vec();
    data.extend_from_slice(&address_word(&opponent));
    to_hex(&data)
}

/// `submitMove(gameId, from, to, promotion, newPosition)`; an absent
/// promotion is sent as the empty string.
pub fn encode_submit_move(
    game_id: &str,
    from: &str,
    to: &str,
    promotion: Option<&str>,
    new_position: &str,
) -> String {
    to_hex(&encode_strings(
        SUBMIT_MOVE_SIGNATURE,
        &[game_id, from, to, promotion.unwrap_or(""), new_position],
    ))
}

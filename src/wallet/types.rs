use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::wallet::errors::WalletError;

fn address_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^0[xX][0-9a-fA-F]{40}$").expect("static regex"))
}

/// A 20-byte account or contract address.
///
/// Addresses are compared case-insensitively, so the checksummed and
/// lower-case spellings of the same account are equal. The stored form is
/// always lower-case with a `0x` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub const ZERO: &'static str = "0x0000000000000000000000000000000000000000";

    pub fn parse(value: &str) -> Result<Self, WalletError> {
        let trimmed = value.trim();
        if !address_pattern().is_match(trimmed) {
            return Err(WalletError::InvalidAddress(value.to_string()));
        }
        Ok(Self(format!("0x{}", trimmed[2..].to_ascii_lowercase())))
    }

    pub fn zero() -> Self {
        Self(Self::ZERO.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw 20 bytes of the address.
    pub fn to_bytes(&self) -> [u8; 20] {
        let mut out = [0u8; 20];
        // Validated at construction, decoding cannot fail.
        if let Ok(bytes) = hex::decode(&self.0[2..]) {
            out.copy_from_slice(&bytes);
        }
        out
    }

    /// Shortened form used in log lines and the CLI (`0x1234…abcd`).
    pub fn short(&self) -> String {
        format!("{}…{}", &self.0[..6], &self.0[self.0.len() - 4..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = WalletError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Address::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

/// Identifier of the network a provider is targeting.
///
/// Encoding: numeric identifiers are normalized to minimal lower-case hex with
/// a `0x` prefix, whether they arrive as hex (`0x7A69`, `0x007a69`) or as
/// decimal text (`31337`). Anything else is kept verbatim as trimmed
/// lower-case text, so non-EVM style identifiers still compare by equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ChainId(String);

impl ChainId {
    pub fn new(raw: &str) -> Self {
        Self(normalize_chain_id(raw))
    }

    pub fn from_u64(value: u64) -> Self {
        Self(format!("{:#x}", value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value when the identifier is hex-encoded.
    pub fn as_u64(&self) -> Option<u64> {
        self.0
            .strip_prefix("0x")
            .and_then(|digits| u64::from_str_radix(digits, 16).ok())
    }
}

fn normalize_chain_id(raw: &str) -> String {
    let lowered = raw.trim().to_ascii_lowercase();

    if let Some(digits) = lowered.strip_prefix("0x") {
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit()) {
            let stripped = digits.trim_start_matches('0');
            return if stripped.is_empty() {
                "0x0".to_string()
            } else {
                format!("0x{}", stripped)
            };
        }
        return lowered;
    }

    if !lowered.is_empty() && lowered.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(value) = lowered.parse::<u64>() {
            return format!("{:#x}", value);
        }
    }

    lowered
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ChainId {
    fn from(value: String) -> Self {
        ChainId::new(&value)
    }
}

impl From<&str> for ChainId {
    fn from(value: &str) -> Self {
        ChainId::new(value)
    }
}

impl From<ChainId> for String {
    fn from(chain: ChainId) -> Self {
        chain.0
    }
}

/// Wallet implementations a provider may claim to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletKind {
    MetaMask,
    Coinbase,
    Brave,
    Rabby,
    Phantom,
    Trust,
    Okx,
}

impl WalletKind {
    pub const ALL: [WalletKind; 7] = [
        WalletKind::MetaMask,
        WalletKind::Coinbase,
        WalletKind::Brave,
        WalletKind::Rabby,
        WalletKind::Phantom,
        WalletKind::Trust,
        WalletKind::Okx,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WalletKind::MetaMask => "metamask",
            WalletKind::Coinbase => "coinbase",
            WalletKind::Brave => "brave",
            WalletKind::Rabby => "rabby",
            WalletKind::Phantom => "phantom",
            WalletKind::Trust => "trust",
            WalletKind::Okx => "okx",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            WalletKind::MetaMask => "MetaMask",
            WalletKind::Coinbase => "Coinbase Wallet",
            WalletKind::Brave => "Brave Wallet",
            WalletKind::Rabby => "Rabby",
            WalletKind::Phantom => "Phantom",
            WalletKind::Trust => "Trust Wallet",
            WalletKind::Okx => "OKX Wallet",
        }
    }
}

impl fmt::Display for WalletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for WalletKind {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        WalletKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == lowered)
            .ok_or_else(|| WalletError::UnknownWalletKind(s.trim().to_string()))
    }
}

/// Connection state owned by the wallet session.
///
/// Snapshots are immutable: every transition builds a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletState {
    pub address: Address,
    pub chain_id: ChainId,
    pub connected: bool,
}

impl WalletState {
    pub fn connected(address: Address, chain_id: ChainId) -> Self {
        Self {
            address,
            chain_id,
            connected: true,
        }
    }

    pub fn with_address(&self, address: Address) -> Self {
        Self {
            address,
            chain_id: self.chain_id.clone(),
            connected: self.connected,
        }
    }

    pub fn with_chain(&self, chain_id: ChainId) -> Self {
        Self {
            address: self.address.clone(),
            chain_id,
            connected: self.connected,
        }
    }
}

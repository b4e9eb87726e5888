//! Integration tests for the chainmate client
//!
//! These tests drive the session actor, the transaction submitter and the
//! game flows end to end against a scripted wallet provider.

pub mod game_lobby;
pub mod wallet_session;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "chainmate")]
#[command(about = "Play chess against a smart contract through your wallet")]
pub struct Cli {
    /// Read configuration from this file instead of the platform default
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show configuration and any stored session hint
    Status,

    /// Connect the configured wallet and report network checks
    ///
    /// Network or contract problems are reported as warnings; they only
    /// block game transactions.
    ///
    /// Example: chainmate connect
    Connect,

    /// Forget the stored wallet session
    Disconnect,

    /// Connect and print every session change until Ctrl-C
    ///
    /// Switching accounts or networks in the wallet shows up here as it
    /// happens.
    Watch,

    /// Create a new game, playing white
    ///
    /// Without an opponent the game waits for someone to join.
    ///
    /// Examples:
    ///   chainmate create-game
    ///   chainmate create-game --opponent 0x5fbdb2315678afecb367f032d93f642f64180aa3
    CreateGame {
        /// Address of the player to invite as black
        #[arg(short, long)]
        opponent: Option<String>,
    },

    /// Join a waiting game as black
    ///
    /// Example: chainmate join game_loyw3v28k2j9x0aa
    Join {
        /// Id of the game to join
        game_id: String,
    },

    /// Show one game in detail
    Show {
        /// Id of the game to show
        game_id: String,
    },

    /// List games involving the connected wallet
    Games,
}

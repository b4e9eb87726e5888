pub mod database;
pub mod errors;
pub mod games;
pub mod memory;
pub mod models;
pub mod schema;
pub mod session;

// Re-export key types for easy access
pub use database::Database;
pub use errors::StorageError;
pub use games::GameStore;
pub use memory::{MemoryGameStore, MemorySessionStore};
pub use models::{GameRecord, GameStatus, PlayerColor, START_POSITION};
pub use session::{SessionStore, WALLET_STATE_KEY};

pub use database::get_database_path;

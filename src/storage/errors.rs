use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(#[from] rusqlite::Error),

    #[error("Migration {version} failed: {message}")]
    MigrationFailed { version: i32, message: String },

    #[error("Game not found: {0}")]
    GameNotFound(String),

    #[error("Game already exists: {0}")]
    DuplicateGame(String),

    #[error("Game {id} changed concurrently: expected {expected} recorded move(s)")]
    MoveConflict { id: String, expected: usize },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Database path error: {0}")]
    DatabasePathError(String),

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub fn game_not_found(id: impl Into<String>) -> Self {
        StorageError::GameNotFound(id.into())
    }

    pub fn migration_failed(version: i32, message: impl Into<String>) -> Self {
        StorageError::MigrationFailed {
            version,
            message: message.into(),
        }
    }

    pub fn database_path_error(message: impl Into<String>) -> Self {
        StorageError::DatabasePathError(message.into())
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;

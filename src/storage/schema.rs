use crate::storage::errors::{Result, StorageError};
use crate::storage::models::current_timestamp;
use rusqlite::Connection;
use tracing::{debug, info};

pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// A single schema migration
pub struct Migration {
    pub version: i32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, oldest first
pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "Games and client state",
    sql: r#"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL,
                description TEXT NOT NULL
            );

            CREATE TABLE games (
                id TEXT PRIMARY KEY,
                player1 TEXT NOT NULL,
                player2 TEXT,
                current_player TEXT NOT NULL CHECK(current_player IN ('white', 'black')),
                position TEXT NOT NULL,
                move_history TEXT NOT NULL,
                status TEXT NOT NULL CHECK(status IN ('waiting', 'active', 'finished')),
                winner TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            -- One row per key; the wallet snapshot lives under 'chainmate.wallet'
            CREATE TABLE client_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE INDEX idx_games_player1 ON games(player1);
            CREATE INDEX idx_games_player2 ON games(player2);
            CREATE INDEX idx_games_updated ON games(updated_at DESC);
        "#,
}];

/// Enable WAL and bring the schema up to [`CURRENT_SCHEMA_VERSION`].
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", true)
        .map_err(|e| {
            StorageError::migration_failed(0, format!("Failed to enable foreign keys: {}", e))
        })?;

    conn.pragma_update(None, "journal_mode", "WAL")
        .map_err(|e| StorageError::migration_failed(0, format!("Failed to enable WAL mode: {}", e)))?;

    let current = current_version(conn)?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > current).collect();

    if pending.is_empty() {
        debug!("Schema is at version {}", current);
        return Ok(());
    }

    let tx = conn.unchecked_transaction().map_err(|e| {
        StorageError::migration_failed(-1, format!("Failed to start transaction: {}", e))
    })?;

    for migration in pending {
        execute_migration(&tx, migration)?;
        info!(
            "Applied migration {}: {}",
            migration.version, migration.description
        );
    }

    tx.commit().map_err(|e| {
        StorageError::migration_failed(-1, format!("Failed to commit migrations: {}", e))
    })?;

    Ok(())
}

fn execute_migration(conn: &Connection, migration: &Migration) -> Result<()> {
    conn.execute_batch(migration.sql).map_err(|e| {
        StorageError::migration_failed(
            migration.version,
            format!("Failed to execute migration {}: {}", migration.version, e),
        )
    })?;

    conn.execute(
        "INSERT INTO schema_migrations (version, applied_at, description) VALUES (?1, ?2, ?3)",
        (migration.version, current_timestamp(), migration.description),
    )
    .map_err(|e| {
        StorageError::migration_failed(
            migration.version,
            format!("Failed to record migration {}: {}", migration.version, e),
        )
    })?;

    Ok(())
}

/// Highest applied migration, 0 for a fresh database.
pub fn current_version(conn: &Connection) -> Result<i32> {
    let tracked = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'schema_migrations'",
            [],
            |row| row.get::<_, i64>(0),
        )
        .map_err(|e| StorageError::migration_failed(-1, format!("Failed to inspect schema: {}", e)))?;

    if tracked == 0 {
        return Ok(0);
    }

    conn.query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
        row.get::<_, Option<i32>>(0)
    })
    .map(|version| version.unwrap_or(0))
    .map_err(|e| StorageError::migration_failed(-1, format!("Failed to get current version: {}", e)))
}

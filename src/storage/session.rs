use crate::storage::database::Database;
use crate::storage::errors::Result;
use crate::storage::models::current_timestamp;
use crate::wallet::types::WalletState;
use rusqlite::OptionalExtension;

/// Fixed key of the persisted wallet snapshot.
pub const WALLET_STATE_KEY: &str = "chainmate.wallet";

/// Durable client-side slot holding the last connected wallet snapshot.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<WalletState>>;
    fn save(&self, state: &WalletState) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

impl SessionStore for Database {
    fn load(&self) -> Result<Option<WalletState>> {
        let stored: Option<String> = self.with_connection(|conn| {
            Ok(conn
                .query_row(
                    "SELECT value FROM client_state WHERE key = ?1",
                    [WALLET_STATE_KEY],
                    |row| row.get(0),
                )
                .optional()?)
        })?;

        stored
            .map(|json| serde_json::from_str(&json).map_err(Into::into))
            .transpose()
    }

    fn save(&self, state: &WalletState) -> Result<()> {
        let json = serde_json::to_string(state)?;
        self.with_connection(|conn| {
            conn.execute(
                r#"
                INSERT INTO client_state (key, value, updated_at) VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                "#,
                (WALLET_STATE_KEY, json, current_timestamp()),
            )?;
            Ok(())
        })
    }

    fn clear(&self) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM client_state WHERE key = ?1", [WALLET_STATE_KEY])?;
            Ok(())
        })
    }
}

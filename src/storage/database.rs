use crate::storage::errors::{Result, StorageError};
use crate::storage::schema;
use directories::ProjectDirs;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "CHAINMATE_DATA_DIR";

/// SQLite-backed game and client-state storage.
///
/// The connection sits behind a mutex; every operation takes the lock for its
/// whole duration, so compound statements never interleave.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (creating if needed) the database at `path` and run migrations.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StorageError::database_path_error(format!(
                        "Failed to create database directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;
        Self::configure(&conn)?;
        Self::from_connection(conn)
    }

    /// Open the database at the platform default location.
    pub fn open_default() -> Result<Self> {
        Self::open(&get_database_path()?)
    }

    /// Private in-memory database, mostly for tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        schema::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn configure(conn: &Connection) -> Result<()> {
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "temp_store", "memory")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Run `f` with exclusive access to the connection.
    pub fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run `f` inside a transaction, rolling back if it fails.
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        match f(&tx) {
            Ok(result) => {
                tx.commit()?;
                Ok(result)
            }
            Err(e) => {
                let _ = tx.rollback();
                Err(e)
            }
        }
    }

    pub fn schema_version(&self) -> Result<i32> {
        self.with_connection(schema::current_version)
    }
}

/// Database location: `$CHAINMATE_DATA_DIR/chainmate.sqlite` when set,
/// otherwise the platform data directory.
pub fn get_database_path() -> Result<PathBuf> {
    if let Ok(custom_data_dir) = std::env::var(DATA_DIR_ENV) {
        if !custom_data_dir.trim().is_empty() {
            return Ok(PathBuf::from(custom_data_dir).join("chainmate.sqlite"));
        }
    }

    let project_dirs = ProjectDirs::from("dev", "chainmate", "chainmate").ok_or_else(|| {
        StorageError::database_path_error("Failed to determine application data directory")
    })?;

    Ok(project_dirs.data_dir().join("chainmate.sqlite"))
}

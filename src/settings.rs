//! SQLite-backed key-value store for API credentials and preferences

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::Result;

pub const SETTING_OPENAI_API_KEY: &str = "openai_api_key";
pub const SETTING_CALENDAR_API_KEY: &str = "calendar_api_key";
pub const SETTING_ISSUE_API_KEY: &str = "issue_api_key";

/// Settings backend using SQLite
///
/// Values are free-form strings; presence checks happen at the point of
/// use, never here.
pub struct Settings {
    conn: Mutex<Connection>,
}

impl Settings {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let settings = Self {
            conn: Mutex::new(conn),
        };
        settings.init_schema()?;
        Ok(settings)
    }

    /// Create an in-memory database (useful for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let settings = Self {
            conn: Mutex::new(conn),
        };
        settings.init_schema()?;
        Ok(settings)
    }

    /// Default database location under the platform data directory
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("voxnote")
            .join("settings.db")
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        debug!("settings schema initialized");
        Ok(())
    }

    /// Save or update a setting value
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Get a setting value
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(Into::into)
    }

    /// Get an API key, treating an empty stored value as absent
    pub fn get_key(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get(key)?.filter(|v| !v.is_empty()))
    }
}

// Persistence for credentials, prompt history and custom system instructions
// All stores share one SQLite database

mod credentials;
mod history;
mod instructions;

pub use credentials::{ApiKeySet, CredentialStore, KeyStatus, SqliteCredentialStore};
pub use history::{HistoryStore, PromptRecord, SqliteHistoryStore, TransformationRecord};
pub use instructions::{SqliteInstructionStore, SystemInstruction};

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::StoreError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS api_keys (
    provider    TEXT PRIMARY KEY,
    api_key     TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS prompts (
    id          TEXT PRIMARY KEY,
    title       TEXT,
    content     TEXT NOT NULL,
    framework   TEXT NOT NULL,
    model       TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS transformations (
    id                  TEXT PRIMARY KEY,
    prompt_id           TEXT NOT NULL REFERENCES prompts(id) ON DELETE CASCADE,
    transformed_content TEXT NOT NULL,
    provider            TEXT NOT NULL,
    model_used          TEXT NOT NULL,
    processing_time     INTEGER,
    created_at          TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_transformations_prompt ON transformations(prompt_id);

CREATE TABLE IF NOT EXISTS system_instructions (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    content     TEXT NOT NULL,
    created_at  TEXT NOT NULL
);
";

/// Shared handle to the SQLite database
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database file and apply the schema
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        tracing::info!("Opened database at {}", path.display());
        Self::init(conn)
    }

    /// Private in-memory database, used by tests
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

/// Current time in the stored format (RFC 3339, microseconds, UTC)
pub(crate) fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

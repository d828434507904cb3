#![deny(warnings)]

//! Persistence layer: snapshot files and the save-slot database.
//!
//! The core hands a committed [`WorldState`] across this boundary after
//! every processed burst; the on-disk format lives here, not in the core.
//! Snapshots must round-trip the whole data model losslessly — pending
//! tagged-union timers included.

use chrono::Utc;
use sim_core::WorldState;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

/// Errors crossing the persistence boundary.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encode error: {0}")]
    Encode(#[from] bincode::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Returns the default SQLite URL used for local saves.
pub fn default_sqlite_url() -> &'static str {
    "sqlite://./saves/hearthvale.db"
}

/// Binary world snapshots at a fixed path; the default persister backing
/// for headless runs.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, world: &WorldState) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = bincode::serialize(world)?;
        std::fs::write(&self.path, bytes)?;
        Ok(())
    }

    pub fn load(&self) -> Result<WorldState, PersistError> {
        let bytes = std::fs::read(&self.path)?;
        Ok(bincode::deserialize(&bytes)?)
    }
}

/// Human-readable JSON export of a snapshot.
pub fn to_json(world: &WorldState) -> Result<String, PersistError> {
    Ok(serde_json::to_string_pretty(world)?)
}

/// Open the save database (creating it if missing) and ensure the schema.
pub async fn init_db(url: &str) -> Result<SqlitePool, PersistError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS saves (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            note TEXT,
            created_at TEXT NOT NULL
        )",
    )
    .execute(&pool)
    .await?;
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS snapshots (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            save_id INTEGER NOT NULL REFERENCES saves(id),
            num_ticks INTEGER NOT NULL,
            world BLOB NOT NULL,
            created_at TEXT NOT NULL
        )",
    )
    .execute(&pool)
    .await?;
    info!(url, "save database ready");
    Ok(pool)
}

/// Create a save slot; returns its id.
pub async fn create_save(
    pool: &SqlitePool,
    name: &str,
    note: Option<&str>,
) -> Result<i64, PersistError> {
    let result = sqlx::query("INSERT INTO saves (name, note, created_at) VALUES (?1, ?2, ?3)")
        .bind(name)
        .bind(note)
        .bind(Utc::now().to_rfc3339())
        .execute(pool)
        .await?;
    Ok(result.last_insert_rowid())
}

/// Store a snapshot blob under a save slot; returns the snapshot id.
pub async fn store_snapshot(
    pool: &SqlitePool,
    save_id: i64,
    world: &WorldState,
) -> Result<i64, PersistError> {
    let bytes = bincode::serialize(world)?;
    let result = sqlx::query(
        "INSERT INTO snapshots (save_id, num_ticks, world, created_at) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(save_id)
    .bind(world.clock.num_ticks as i64)
    .bind(bytes)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Load the most recent snapshot stored under a save slot.
pub async fn load_latest_snapshot(
    pool: &SqlitePool,
    save_id: i64,
) -> Result<Option<WorldState>, PersistError> {
    let row: Option<(Vec<u8>,)> =
        sqlx::query_as("SELECT world FROM snapshots WHERE save_id = ?1 ORDER BY id DESC LIMIT 1")
            .bind(save_id)
            .fetch_optional(pool)
            .await?;
    match row {
        Some((bytes,)) => Ok(Some(bincode::deserialize(&bytes)?)),
        None => Ok(None),
    }
}

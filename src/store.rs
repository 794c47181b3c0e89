// 🗄️ Watchlist Store - durable collection of watchlist entries
//
// SqliteWatchlistStore: production store (SQLite + WAL, one writer, readers per scan)
// MemoryWatchlistStore: append-only in-memory store for tests and offline use

use crate::entities::{NewWatchlistEntry, RiskCategory, WatchlistEntry};
use crate::error::{EntitySenseError, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OpenFlags, Row};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;
use tracing::debug;

/// Insert + full enumeration. No update or delete.
///
/// `find_all` must return a consistent snapshot: an entry created during the
/// scan may or may not be included, but the scan never sees a torn entry.
pub trait WatchlistStore: Send + Sync {
    /// Persist a new entry; the store assigns its id
    fn create(&self, entry: NewWatchlistEntry) -> Result<WatchlistEntry>;

    /// Every stored entry, ordered by id
    fn find_all(&self) -> Result<Vec<WatchlistEntry>>;

    fn count(&self) -> Result<usize> {
        Ok(self.find_all()?.len())
    }
}

// ============================================================================
// AUDIT EVENTS
// ============================================================================

/// Event for audit trail ("Every change is an event")
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }

    fn enrolled(entry: &WatchlistEntry) -> Self {
        Event::new(
            "entry_enrolled",
            "watchlist_entry",
            &entry.id.to_string(),
            serde_json::json!({
                "name": entry.name,
                "risk_category": entry.risk_category,
                "known_accounts": entry.known_accounts.len(),
                "embedding_dimension": entry.embedding_dimension(),
            }),
            "enrollment_service",
        )
    }
}

// ============================================================================
// SQLITE STORE
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode so enrollments don't block concurrent scans
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS watchlist_entities (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            address TEXT,
            country TEXT,
            known_accounts TEXT NOT NULL,
            risk_category TEXT NOT NULL,
            embedding TEXT NOT NULL,
            embedding_dimension INTEGER NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    Ok(())
}

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<WatchlistEntry> {
    let known_accounts_json: String = row.get(4)?;
    let risk_category: String = row.get(5)?;
    let embedding_json: String = row.get(6)?;
    let embedding_dimension: i64 = row.get(7)?;
    let created_at: String = row.get(8)?;

    let embedding: Vec<f32> =
        serde_json::from_str(&embedding_json).map_err(|e| conversion_error(6, e))?;
    if embedding.len() as i64 != embedding_dimension {
        return Err(conversion_error(
            6,
            format!(
                "stored embedding has {} values, row records {}",
                embedding.len(),
                embedding_dimension
            ),
        ));
    }

    Ok(WatchlistEntry {
        id: row.get(0)?,
        name: row.get(1)?,
        address: row.get(2)?,
        country: row.get(3)?,
        known_accounts: serde_json::from_str(&known_accounts_json)
            .map_err(|e| conversion_error(4, e))?,
        risk_category: risk_category
            .parse::<RiskCategory>()
            .map_err(|e| conversion_error(5, e))?,
        embedding,
        created_at: parse_timestamp(8, &created_at)?,
    })
}

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where reader connections are opened from
enum Source {
    File(PathBuf),
    /// Shared-cache in-memory database, alive while the writer is open
    Memory(String),
}

/// One writer connection; every read opens its own connection so scans
/// run in parallel with each other and with enrollment (WAL).
pub struct SqliteWatchlistStore {
    source: Source,
    writer: Mutex<Connection>,
}

impl SqliteWatchlistStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_writer(Source::File(path.to_path_buf()), conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let uri = format!("file:entity-sense-{}?mode=memory&cache=shared", uuid::Uuid::new_v4());
        let conn = Connection::open_with_flags(
            &uri,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Self::with_writer(Source::Memory(uri), conn)
    }

    fn with_writer(source: Source, conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        setup_database(&conn)?;
        Ok(SqliteWatchlistStore {
            source,
            writer: Mutex::new(conn),
        })
    }

    fn writer(&self) -> Result<MutexGuard<'_, Connection>> {
        self.writer
            .lock()
            .map_err(|_| EntitySenseError::StoreUnavailable("writer lock poisoned".to_string()))
    }

    /// Fresh read-only connection, independent of the writer lock
    fn reader(&self) -> Result<Connection> {
        let conn = match &self.source {
            Source::File(path) => Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?,
            Source::Memory(uri) => Connection::open_with_flags(
                uri,
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?,
        };
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    /// Get events for a specific watchlist entry
    pub fn events_for_entry(&self, id: i64) -> Result<Vec<Event>> {
        let conn = self.reader()?;
        let mut stmt = conn.prepare(
            "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
             FROM events
             WHERE entity_type = 'watchlist_entry' AND entity_id = ?1
             ORDER BY timestamp DESC",
        )?;

        let events = stmt
            .query_map(params![id.to_string()], |row| {
                let timestamp_str: String = row.get(1)?;
                let data_json: String = row.get(5)?;

                Ok(Event {
                    event_id: row.get(0)?,
                    timestamp: parse_timestamp(1, &timestamp_str)?,
                    event_type: row.get(2)?,
                    entity_type: row.get(3)?,
                    entity_id: row.get(4)?,
                    data: serde_json::from_str(&data_json).map_err(|e| conversion_error(5, e))?,
                    actor: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(events)
    }
}

impl WatchlistStore for SqliteWatchlistStore {
    fn create(&self, entry: NewWatchlistEntry) -> Result<WatchlistEntry> {
        let known_accounts_json = serde_json::to_string(&entry.known_accounts)?;
        let embedding_json = serde_json::to_string(&entry.embedding)?;

        let mut conn = self.writer()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO watchlist_entities (
                name, address, country, known_accounts, risk_category, embedding,
                embedding_dimension, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.name,
                entry.address,
                entry.country,
                known_accounts_json,
                entry.risk_category.as_str(),
                embedding_json,
                entry.embedding.len() as i64,
                entry.created_at.to_rfc3339(),
            ],
        )?;

        let stored = entry.with_id(tx.last_insert_rowid());
        insert_event(&tx, &Event::enrolled(&stored))?;
        tx.commit()?;

        debug!(id = stored.id, "Watchlist entry persisted");
        Ok(stored)
    }

    fn find_all(&self) -> Result<Vec<WatchlistEntry>> {
        // One SELECT on its own connection is one WAL snapshot
        let conn = self.reader()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, address, country, known_accounts, risk_category, embedding,
                    embedding_dimension, created_at
             FROM watchlist_entities
             ORDER BY id",
        )?;

        let entries = stmt
            .query_map([], entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(entries)
    }

    fn count(&self) -> Result<usize> {
        let conn = self.reader()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM watchlist_entities", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

/// Append-only, never deletes. Ids start at 1.
#[derive(Clone, Default)]
pub struct MemoryWatchlistStore {
    entries: Arc<RwLock<Vec<WatchlistEntry>>>,
}

impl MemoryWatchlistStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> EntitySenseError {
        EntitySenseError::StoreUnavailable("watchlist lock poisoned".to_string())
    }
}

impl WatchlistStore for MemoryWatchlistStore {
    fn create(&self, entry: NewWatchlistEntry) -> Result<WatchlistEntry> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        let stored = entry.with_id(entries.len() as i64 + 1);
        entries.push(stored.clone());
        Ok(stored)
    }

    fn find_all(&self) -> Result<Vec<WatchlistEntry>> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        Ok(entries.clone())
    }
}

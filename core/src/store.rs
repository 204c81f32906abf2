//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! The session calls store methods; it never executes SQL directly.
//! Save payloads are opaque blobs here. Encoding lives in snapshot.rs.

use crate::{error::SimResult, event::EventLogEntry, types::Tick};
use rusqlite::{params, Connection, OptionalExtension};

/// One row of the save-slot table, without its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSummary {
    pub key:      String,
    pub tick:     Tick,
    pub saved_at: String,
}

pub struct SimStore {
    conn: Connection,
}

impl SimStore {
    /// Open (or create) the garden database at `path`. URIs such as
    /// `file:name?mode=memory&cache=shared` are accepted.
    pub fn open(path: &str) -> SimResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files; :memory: ignores it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SimResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order. Safe to call on an existing file.
    pub fn migrate(&self) -> SimResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(&self, run_id: &str, seed: u64, version: &str) -> SimResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO run (run_id, seed, version, started_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![run_id, seed as i64, version, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (run_id, tick, source, event_type, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.run_id,
                entry.tick as i64,
                entry.source,
                entry.event_type,
                entry.payload,
            ],
        )?;
        Ok(())
    }

    pub fn events_for_tick(&self, run_id: &str, tick: Tick) -> SimResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, tick, source, event_type, payload
             FROM event_log WHERE run_id = ?1 AND tick = ?2
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![run_id, tick as i64], |row| {
                Ok(EventLogEntry {
                    id:         Some(row.get(0)?),
                    run_id:     row.get(1)?,
                    tick:       row.get::<_, i64>(2)? as u64,
                    source:     row.get(3)?,
                    event_type: row.get(4)?,
                    payload:    row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // ── Save slots ─────────────────────────────────────────────

    /// Write `payload` under `key`, replacing whatever the slot held.
    pub fn save_slot(&self, key: &str, tick: Tick, payload: &[u8]) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO save_slot (slot_key, tick, payload, saved_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(slot_key) DO UPDATE SET
                tick = excluded.tick,
                payload = excluded.payload,
                saved_at = excluded.saved_at",
            params![key, tick as i64, payload, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn load_slot(&self, key: &str) -> SimResult<Option<Vec<u8>>> {
        let payload = self
            .conn
            .query_row(
                "SELECT payload FROM save_slot WHERE slot_key = ?1",
                params![key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(payload)
    }

    pub fn has_slot(&self, key: &str) -> SimResult<bool> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM save_slot WHERE slot_key = ?1",
            params![key],
            |row| row.get(0),
        )?;
        Ok(n > 0)
    }

    pub fn list_slots(&self) -> SimResult<Vec<SlotSummary>> {
        let mut stmt = self
            .conn
            .prepare("SELECT slot_key, tick, saved_at FROM save_slot ORDER BY slot_key ASC")?;
        let slots = stmt
            .query_map([], |row| {
                Ok(SlotSummary {
                    key:      row.get(0)?,
                    tick:     row.get::<_, i64>(1)? as u64,
                    saved_at: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(slots)
    }
}

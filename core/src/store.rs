//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! Every write is idempotent: key-value writes replace, events are keyed by
//! (session, revision, seq), snapshots by (session, month). Repeating a
//! write after a restart changes nothing.

use crate::{
    error::SimResult,
    event::EventLogEntry,
    snapshot::SessionSnapshot,
    types::Month,
};
use rusqlite::{params, Connection, OptionalExtension};

pub struct SessionStore {
    conn: Connection,
}

/// Wall-clock stamp for `created_at` / `updated_at` columns.
pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl SessionStore {
    /// Open (or create) the session database at `path`.
    pub fn open(path: &str) -> SimResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode: better concurrent read performance.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SimResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SimResult<()> {
        self.conn.execute_batch(include_str!("../../migrations/001_session.sql"))?;
        Ok(())
    }

    // ── Session ────────────────────────────────────────────────

    pub fn insert_session(&self, session_id: &str, version: &str) -> SimResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO session (session_id, created_at, version) VALUES (?1, ?2, ?3)",
            params![session_id, timestamp(), version],
        )?;
        Ok(())
    }

    pub fn session_exists(&self, session_id: &str) -> SimResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM session WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Remove everything stored for a session.
    pub fn clear_session(&self, session_id: &str) -> SimResult<()> {
        for table in ["kv", "event_log", "snapshot", "session"] {
            self.conn.execute(
                &format!("DELETE FROM {table} WHERE session_id = ?1"),
                params![session_id],
            )?;
        }
        Ok(())
    }

    // ── Key-value ──────────────────────────────────────────────

    pub fn put_value(&self, session_id: &str, key: &str, json: &str) -> SimResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (session_id, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![session_id, key, json, timestamp()],
        )?;
        Ok(())
    }

    pub fn get_value(&self, session_id: &str, key: &str) -> SimResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv WHERE session_id = ?1 AND key = ?2",
                params![session_id, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> SimResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO event_log
                 (session_id, revision, seq, month, event_type, payload, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.session_id,
                entry.revision as i64,
                entry.seq as i64,
                entry.month as i64,
                entry.event_type,
                entry.payload,
                timestamp(),
            ],
        )?;
        Ok(())
    }

    pub fn events_for_session(&self, session_id: &str) -> SimResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, revision, seq, month, event_type, payload
             FROM event_log WHERE session_id = ?1
             ORDER BY revision ASC, seq ASC",
        )?;
        let entries = stmt
            .query_map(params![session_id], |row| {
                Ok(EventLogEntry {
                    id:         Some(row.get(0)?),
                    session_id: row.get(1)?,
                    revision:   row.get::<_, i64>(2)? as u64,
                    seq:        row.get::<_, i64>(3)? as u32,
                    month:      row.get::<_, i64>(4)? as Month,
                    event_type: row.get(5)?,
                    payload:    row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // ── Snapshot ───────────────────────────────────────────────

    pub fn save_snapshot(&self, snapshot: &SessionSnapshot) -> SimResult<()> {
        let state_json = serde_json::to_string(&snapshot.state)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO snapshot (session_id, month, revision, state_json, saved_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                snapshot.session_id,
                snapshot.month as i64,
                snapshot.revision as i64,
                state_json,
                snapshot.saved_at,
            ],
        )?;
        Ok(())
    }

    pub fn latest_snapshot(&self, session_id: &str) -> SimResult<Option<SessionSnapshot>> {
        let row = self
            .conn
            .query_row(
                "SELECT month, revision, state_json, saved_at FROM snapshot
                 WHERE session_id = ?1
                 ORDER BY month DESC LIMIT 1",
                params![session_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((month, revision, state_json, saved_at)) => Ok(Some(SessionSnapshot {
                session_id: session_id.to_string(),
                month: month as Month,
                revision: revision as u64,
                saved_at,
                state: serde_json::from_str(&state_json)?,
            })),
            None => Ok(None),
        }
    }
}

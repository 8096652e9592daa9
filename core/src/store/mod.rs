//! SQLite run ledger.
//!
//! RULE: Only the store talks to the database.
//! The engine calls store methods; handlers never see SQL.

mod event_log;
mod year_summary;

pub use year_summary::YearSummaryRow;

use rusqlite::{params, Connection, OptionalExtension};

use crate::{error::SimResult, types::Year};

pub struct SimStore {
    conn: Connection,
}

impl SimStore {
    /// Open (or create) the run database at `path`.
    pub fn open(path: &str) -> SimResult<Self> {
        let conn = Connection::open(path)?;
        // WAL only matters for real files.
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

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SimResult<()> {
        self.conn.execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Batching ───────────────────────────────────────────────

    /// Start a write batch; a year's events are committed together.
    pub fn begin_batch(&self) -> SimResult<()> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    pub fn commit_batch(&self) -> SimResult<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    /// Abandon the open batch. Safe to call when none is open.
    pub fn rollback_batch(&self) {
        if !self.conn.is_autocommit() {
            let _ = self.conn.execute_batch("ROLLBACK");
        }
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(&self, run_id: &str, seed: u64, version: &str, start_year: Year) -> SimResult<()> {
        let started_at = chrono::Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO run (run_id, seed, version, start_year, started_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![run_id, seed as i64, version, start_year, started_at],
        )?;
        Ok(())
    }

    /// Seed recorded for `run_id`, if the run exists.
    pub fn run_seed(&self, run_id: &str) -> SimResult<Option<u64>> {
        let seed = self.conn
            .query_row("SELECT seed FROM run WHERE run_id = ?1", params![run_id], |row| {
                row.get::<_, i64>(0)
            })
            .optional()?;
        Ok(seed.map(|s| s as u64))
    }
}

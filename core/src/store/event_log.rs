//! Event ledger queries.

use super::SimStore;
use crate::{error::SimResult, event::EventLogEntry, types::Year};
use rusqlite::params;

impl SimStore {
    pub fn append_event(&self, entry: &EventLogEntry) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (run_id, year, sequence, event_type, subject, outcome, payload)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.run_id,
                entry.year,
                entry.sequence as i64,
                entry.event_type,
                entry.subject,
                entry.outcome,
                entry.payload,
            ],
        )?;
        Ok(())
    }

    pub fn events_for_year(&self, run_id: &str, year: Year) -> SimResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, year, sequence, event_type, subject, outcome, payload
             FROM event_log WHERE run_id = ?1 AND year = ?2
             ORDER BY sequence ASC",
        )?;
        let entries = stmt
            .query_map(params![run_id, year], |row| {
                Ok(EventLogEntry {
                    id:         Some(row.get(0)?),
                    run_id:     row.get(1)?,
                    year:       row.get(2)?,
                    sequence:   row.get::<_, i64>(3)? as u64,
                    event_type: row.get(4)?,
                    subject:    row.get(5)?,
                    outcome:    row.get(6)?,
                    payload:    row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn event_count(&self, run_id: &str) -> SimResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM event_log WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

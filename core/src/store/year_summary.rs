//! Year-end summary rows.

use super::SimStore;
use crate::{error::SimResult, issues::IssueSummary, types::Year};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearSummaryRow {
    pub year:       Year,
    pub households: u64,
    pub population: u64,
    pub vacancies:  u64,
    pub events:     u64,
    pub issues:     IssueSummary,
}

impl SimStore {
    pub fn save_year_summary(&self, run_id: &str, row: &YearSummaryRow) -> SimResult<()> {
        let issues_json = serde_json::to_string(&row.issues)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO year_summary
                (run_id, year, households, population, vacancies, events, issues_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                run_id,
                row.year,
                row.households as i64,
                row.population as i64,
                row.vacancies as i64,
                row.events as i64,
                issues_json,
            ],
        )?;
        Ok(())
    }

    pub fn year_summary(&self, run_id: &str, year: Year) -> SimResult<Option<YearSummaryRow>> {
        let raw = self.conn
            .query_row(
                "SELECT year, households, population, vacancies, events, issues_json
                 FROM year_summary WHERE run_id = ?1 AND year = ?2",
                params![run_id, year],
                |r| {
                    Ok((
                        r.get::<_, Year>(0)?,
                        r.get::<_, i64>(1)?,
                        r.get::<_, i64>(2)?,
                        r.get::<_, i64>(3)?,
                        r.get::<_, i64>(4)?,
                        r.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;

        let Some((year, households, population, vacancies, events, issues_json)) = raw else {
            return Ok(None);
        };
        Ok(Some(YearSummaryRow {
            year,
            households: households as u64,
            population: population as u64,
            vacancies:  vacancies as u64,
            events:     events as u64,
            issues:     serde_json::from_str(&issues_json)?,
        }))
    }
}

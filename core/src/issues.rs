//! Unmet-demand accounting.
//!
//! Purely observational: recording an issue never changes simulation state.
//! Counters are reset at the start of every simulated year.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{repository::VacancyInsert, types::Year};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Issue {
    FailedSearchForRelocation,
    FailedSearchForMigration,
    FailedSearchForEviction,
    ExceededVacancyStorageCapacity,
    /// A utility formula rejected its input; the attempt was abandoned.
    DomainInputError,
    /// An event referenced a subject that no longer exists.
    StaleEvent,
}

impl Issue {
    pub fn name(self) -> &'static str {
        match self {
            Self::FailedSearchForRelocation      => "failedSearchForRelocation",
            Self::FailedSearchForMigration       => "failedSearchForMigration",
            Self::FailedSearchForEviction        => "failedSearchForEviction",
            Self::ExceededVacancyStorageCapacity => "exceededVacancyStorageCapacity",
            Self::DomainInputError               => "domainInputError",
            Self::StaleEvent                     => "staleEvent",
        }
    }
}

#[derive(Debug, Default)]
pub struct IssueTracker {
    year:   Option<Year>,
    counts: BTreeMap<Issue, u64>,
}

impl IssueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all counters and start accumulating for `year`.
    pub fn reset(&mut self, year: Year) {
        self.year = Some(year);
        self.counts.clear();
    }

    pub fn record(&mut self, issue: Issue) {
        *self.counts.entry(issue).or_insert(0) += 1;
    }

    /// Count a vacancy-index insert that overflowed the storage capacity.
    pub fn record_vacancy(&mut self, status: VacancyInsert) {
        if status == VacancyInsert::OverCapacity {
            self.record(Issue::ExceededVacancyStorageCapacity);
        }
    }

    pub fn count(&self, issue: Issue) -> u64 {
        self.counts.get(&issue).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn summary(&self) -> IssueSummary {
        IssueSummary {
            year:   self.year,
            counts: self.counts.iter().map(|(k, v)| (k.name().to_string(), *v)).collect(),
            total:  self.total(),
        }
    }
}

/// Read-only snapshot of a year's counters for reporting.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssueSummary {
    pub year:   Option<Year>,
    pub counts: BTreeMap<String, u64>,
    pub total:  u64,
}

impl IssueSummary {
    pub fn get(&self, issue: Issue) -> u64 {
        self.counts.get(issue.name()).copied().unwrap_or(0)
    }

    pub fn log(&self) {
        let year = self.year.map_or_else(|| "-".to_string(), |y| y.to_string());
        if self.total == 0 {
            log::info!("year={year} issues: none");
            return;
        }
        for (name, count) in &self.counts {
            log::info!("year={year} issues: {name}={count}");
        }
    }
}

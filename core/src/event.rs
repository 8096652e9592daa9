//! Life-cycle events and their outcomes.
//!
//! RULE: An event is immutable once created and is consumed exactly once
//! by the scheduler. Each event type is owned by exactly one handler.

use serde::{Deserialize, Serialize};

use crate::types::{RunId, Year};

/// Every event type the scheduler can emit.
/// Variants are appended only, never removed or reordered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    // ── Demography ─────────────────────────────────
    Birth,
    Death,

    // ── Household moves ────────────────────────────
    Relocation,
    Inmigration,
    Outmigration,

    // ── Dwelling development ───────────────────────
    Demolition,
    Renovation,
}

impl EventType {
    pub const ALL: [EventType; 7] = [
        EventType::Birth,
        EventType::Death,
        EventType::Relocation,
        EventType::Inmigration,
        EventType::Outmigration,
        EventType::Demolition,
        EventType::Renovation,
    ];

    pub fn category(self) -> EventCategory {
        match self {
            Self::Birth | Self::Death => EventCategory::Demography,
            Self::Relocation | Self::Inmigration | Self::Outmigration => EventCategory::HouseholdMoves,
            Self::Demolition | Self::Renovation => EventCategory::DwellingDevelopment,
        }
    }

    /// Stable name used in logs and the event ledger.
    pub fn name(self) -> &'static str {
        match self {
            Self::Birth        => "birth",
            Self::Death        => "death",
            Self::Relocation   => "relocation",
            Self::Inmigration  => "inmigration",
            Self::Outmigration => "outmigration",
            Self::Demolition   => "demolition",
            Self::Renovation   => "renovation",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Demography,
    HouseholdMoves,
    DwellingDevelopment,
}

/// One scheduled action: {type, subject entity id, simulated year}.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub kind:    EventType,
    /// Household id for household events, dwelling id for development events.
    pub subject: u32,
    pub year:    Year,
}

impl Event {
    pub fn new(kind: EventType, subject: u32, year: Year) -> Self {
        Self { kind, subject, year }
    }
}

/// What a handler did with an event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EventOutcome {
    /// The household stayed where it is.
    Stayed,
    Moved { from: Option<u32>, to: u32 },
    Admitted { dwelling: u32, persons: u32 },
    Departed { persons: u32 },
    Demolished { evicted: Option<u32> },
    Renovated { quality: u8 },
    /// The dwelling was left as it is.
    Unchanged,
    /// A search came back empty; counted by the IssueTracker.
    NoOutcome,
    /// The subject no longer exists; logged and skipped.
    Skipped,
}

impl EventOutcome {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Stayed          => "stayed",
            Self::Moved { .. }    => "moved",
            Self::Admitted { .. } => "admitted",
            Self::Departed { .. } => "departed",
            Self::Demolished { .. } => "demolished",
            Self::Renovated { .. }  => "renovated",
            Self::Unchanged       => "unchanged",
            Self::NoOutcome       => "no_outcome",
            Self::Skipped         => "skipped",
        }
    }
}

/// The event ledger entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id:         Option<i64>,
    pub run_id:     RunId,
    pub year:       Year,
    pub sequence:   u64,
    pub event_type: String,
    pub subject:    u32,
    pub outcome:    String,
    pub payload:    String, // JSON-serialized EventOutcome
}

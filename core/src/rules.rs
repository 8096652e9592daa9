//! Eligibility predicates.
//!
//! RULE: Pure functions of (subject, flags). No side effects, no randomness,
//! no caching. Re-evaluated fresh every year.

use crate::{
    config::EventFlags,
    event::EventType,
    model::{Dwelling, Household},
    types::Year,
};

/// An event type is enabled when its own flag and its category flag are both set.
pub fn event_enabled(flags: &EventFlags, kind: EventType) -> bool {
    flags.category(kind.category()) && flags.own(kind)
}

/// May `household` be the subject of a household event of type `kind` this year?
pub fn household_eligible(kind: EventType, household: &Household, flags: &EventFlags) -> bool {
    if !event_enabled(flags, kind) || household.members.is_empty() {
        return false;
    }
    match kind {
        // Only housed households relocate; homeless ones are mid-migration.
        EventType::Relocation => household.dwelling.is_some(),
        EventType::Birth | EventType::Death | EventType::Outmigration => true,
        EventType::Inmigration | EventType::Demolition | EventType::Renovation => false,
    }
}

/// May `dwelling` be the subject of a development event of type `kind` in `year`?
pub fn dwelling_eligible(kind: EventType, dwelling: &Dwelling, year: Year, flags: &EventFlags) -> bool {
    if !event_enabled(flags, kind) {
        return false;
    }
    match kind {
        // Dwellings completed this year are neither torn down nor renovated.
        EventType::Demolition | EventType::Renovation => dwelling.year_built < year,
        _ => false,
    }
}

/// Event types whose subjects are households and that the scheduler
/// derives from the household registry.
pub const HOUSEHOLD_EVENTS: [EventType; 3] = [EventType::Birth, EventType::Death, EventType::Relocation];

/// Event types whose subjects are dwellings.
pub const DWELLING_EVENTS: [EventType; 2] = [EventType::Demolition, EventType::Renovation];

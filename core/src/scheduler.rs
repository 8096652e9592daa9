//! Year event scheduler.
//!
//! RULE: The year's events are built once, then shuffled with a single
//! seeded stream: every event draws a random key and the list is stable-
//! sorted by key. Same seed and same repository give the same order.
//!
//! Consumption is a plain sequential cursor. Nothing else reads the list.

use crate::{
    config::EventFlags,
    event::Event,
    repository::EntityRepository,
    rng::SubsystemRng,
    rules::{dwelling_eligible, event_enabled, household_eligible, DWELLING_EVENTS, HOUSEHOLD_EVENTS},
    types::Year,
};

#[derive(Debug, Default)]
pub struct EventScheduler {
    year:   Option<Year>,
    events: Vec<Event>,
    cursor: usize,
}

impl EventScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and shuffle the events for `year`. `planned` holds events
    /// injected by handlers (migration) ahead of time. Any events left
    /// over from a previous build are discarded. Returns the event count.
    pub fn build_year_events(
        &mut self,
        year: Year,
        repo: &EntityRepository,
        flags: &EventFlags,
        planned: Vec<Event>,
        rng: &mut SubsystemRng,
    ) -> usize {
        let mut candidates = Vec::new();
        for hh in repo.households() {
            for kind in HOUSEHOLD_EVENTS {
                if household_eligible(kind, hh, flags) {
                    candidates.push(Event::new(kind, hh.id, year));
                }
            }
        }
        for d in repo.dwellings() {
            for kind in DWELLING_EVENTS {
                if dwelling_eligible(kind, d, year, flags) {
                    candidates.push(Event::new(kind, d.id, year));
                }
            }
        }
        candidates.extend(planned.into_iter().filter(|e| event_enabled(flags, e.kind)));

        let mut keyed: Vec<(u64, Event)> = candidates.into_iter()
            .map(|e| (rng.next_u64(), e))
            .collect();
        keyed.sort_by_key(|(key, _)| *key);

        self.year = Some(year);
        self.events = keyed.into_iter().map(|(_, e)| e).collect();
        self.cursor = 0;
        log::debug!("year={year} scheduler: {} events scheduled", self.events.len());
        self.events.len()
    }

    pub fn year(&self) -> Option<Year> {
        self.year
    }

    /// The full ordered schedule, including events already consumed.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn remaining(&self) -> usize {
        self.events.len() - self.cursor
    }
}

impl Iterator for EventScheduler {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        let event = self.events.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(event)
    }
}

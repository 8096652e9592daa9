//! Event handler trait and the per-event context.
//!
//! RULE: Every event type is owned by exactly one registered handler.
//! The engine dispatches events one at a time, in scheduler order;
//! handlers never suspend and never see a half-applied move.

use crate::{
    config::EventFlags,
    error::SimResult,
    event::{Event, EventOutcome, EventType},
    issues::IssueTracker,
    relocation::HouseholdRelocationModel,
    repository::EntityRepository,
    rng::SubsystemRng,
    types::Year,
};
use std::any::Any;

/// Everything a handler may touch while applying one event.
pub struct EventContext<'a> {
    pub year:    Year,
    pub repo:    &'a mut EntityRepository,
    /// Shared two-stage housing search, prepared for this year.
    pub housing: &'a HouseholdRelocationModel,
    pub issues:  &'a mut IssueTracker,
    pub rng:     &'a mut SubsystemRng,
}

/// The contract every event handler must fulfill.
pub trait EventHandler: Send {
    /// Unique stable name for this handler.
    fn name(&self) -> &'static str;

    /// The event types this handler owns.
    fn handled_events(&self) -> &'static [EventType];

    /// Called once per year before the schedule is built. Handlers that
    /// inject exogenous events (migration) return them here.
    fn plan_year(
        &mut self,
        _year: Year,
        _repo: &mut EntityRepository,
        _flags: &EventFlags,
        _rng: &mut SubsystemRng,
    ) -> SimResult<Vec<Event>> {
        Ok(Vec::new())
    }

    /// Apply one event. Search failures and stale subjects are outcomes,
    /// not errors; only broken invariants come back as `Err`.
    fn handle(&mut self, event: &Event, ctx: &mut EventContext<'_>) -> SimResult<EventOutcome>;

    /// For downcasting in tests and tooling only.
    /// Production sim code never uses this.
    fn as_any(&self) -> &dyn Any;
}

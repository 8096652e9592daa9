//! Dwelling development: demolition and renovation of existing stock.
//!
//! RULE: A demolished dwelling's resident is evicted first. The evicted
//! household searches like any mover; if it finds nothing it leaves the
//! region. The dwelling is removed only once it is vacant.
//!
//! Construction of new dwellings is not modelled here.

use std::sync::Arc;

use crate::{
    employment::Employment,
    error::{SimError, SimResult},
    event::{Event, EventOutcome, EventType},
    handler::{EventContext, EventHandler},
    issues::Issue,
    migration::outmigrate,
    selection::select_weighted,
    types::DwellingId,
};

/// Quality steps a renovation may apply.
const QUALITY_STEPS: [i8; 3] = [-1, 0, 1];

pub struct DwellingDevelopmentModel {
    employment:  Arc<dyn Employment>,
    max_quality: u8,
    demolished:  u64,
    renovated:   u64,
}

impl DwellingDevelopmentModel {
    pub fn new(employment: Arc<dyn Employment>, max_quality: u8) -> Self {
        Self { employment, max_quality, demolished: 0, renovated: 0 }
    }

    /// Dwellings demolished since the model was built.
    pub fn demolished(&self) -> u64 {
        self.demolished
    }

    pub fn renovated(&self) -> u64 {
        self.renovated
    }

    fn demolish(&mut self, event: &Event, ctx: &mut EventContext<'_>) -> SimResult<EventOutcome> {
        let Some(dwelling) = ctx.repo.dwelling(event.subject) else {
            return Ok(stale(event, ctx));
        };
        let evicted = dwelling.resident;
        let p = match ctx.housing.utility().development.demolition_probability(dwelling.quality) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("year={} development: dwelling {} skipped: {e}", event.year, event.subject);
                ctx.issues.record(Issue::DomainInputError);
                return Ok(EventOutcome::NoOutcome);
            }
        };
        if !ctx.rng.chance(p) {
            return Ok(EventOutcome::Unchanged);
        }

        if let Some(household) = evicted {
            self.evict(event.subject, household, ctx)?;
        }
        ctx.repo.remove_dwelling(event.subject)?;
        self.demolished += 1;
        log::debug!("year={} development: dwelling {} demolished", event.year, event.subject);
        Ok(EventOutcome::Demolished { evicted })
    }

    /// Rehouse the resident of a dwelling about to be torn down, or
    /// send it out of the region when no dwelling is found.
    fn evict(&self, dwelling: DwellingId, household: u32, ctx: &mut EventContext<'_>) -> SimResult<()> {
        let moved = ctx.housing.relocate(ctx.repo, ctx.issues, household, Issue::FailedSearchForEviction, ctx.rng)?;
        if moved.is_none() {
            let persons = outmigrate(ctx.repo, ctx.issues, self.employment.as_ref(), household)?;
            log::debug!(
                "year={} development: household {household} ({persons} persons) evicted from {dwelling} and left",
                ctx.year,
            );
        }
        match ctx.repo.dwelling(dwelling).and_then(|d| d.resident) {
            Some(still) => Err(SimError::inconsistent(format!(
                "dwelling {dwelling} still houses {still} after eviction"
            ))),
            None => Ok(()),
        }
    }

    fn renovate(&mut self, event: &Event, ctx: &mut EventContext<'_>) -> SimResult<EventOutcome> {
        let Some(dwelling) = ctx.repo.dwelling(event.subject) else {
            return Ok(stale(event, ctx));
        };
        let quality = dwelling.quality;
        let probabilities = match ctx.housing.utility().development.renovation_probabilities(quality) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("year={} development: dwelling {} skipped: {e}", event.year, event.subject);
                ctx.issues.record(Issue::DomainInputError);
                return Ok(EventOutcome::NoOutcome);
            }
        };

        let weighted: Vec<(i8, f64)> = QUALITY_STEPS.iter().copied().zip(probabilities).collect();
        let step = select_weighted(&weighted, ctx.rng).unwrap_or(0);
        let new_quality = (i16::from(quality) + i16::from(step)).clamp(1, i16::from(self.max_quality)) as u8;
        if new_quality == quality {
            return Ok(EventOutcome::Unchanged);
        }
        ctx.repo.set_dwelling_quality(event.subject, new_quality)?;
        self.renovated += 1;
        Ok(EventOutcome::Renovated { quality: new_quality })
    }
}

fn stale(event: &Event, ctx: &mut EventContext<'_>) -> EventOutcome {
    log::warn!("year={} development: dwelling {} no longer exists; skipped", event.year, event.subject);
    ctx.issues.record(Issue::StaleEvent);
    EventOutcome::Skipped
}

impl EventHandler for DwellingDevelopmentModel {
    fn name(&self) -> &'static str { "development" }

    fn handled_events(&self) -> &'static [EventType] {
        &[EventType::Demolition, EventType::Renovation]
    }

    fn handle(&mut self, event: &Event, ctx: &mut EventContext<'_>) -> SimResult<EventOutcome> {
        match event.kind {
            EventType::Demolition => self.demolish(event, ctx),
            EventType::Renovation => self.renovate(event, ctx),
            other => Err(SimError::UnhandledEvent { event_type: other.name().to_string() }),
        }
    }

    fn as_any(&self) -> &dyn std::any::Any { self }
}

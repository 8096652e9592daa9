//! Migration controller: exogenous in- and outmigration.
//!
//! RULE: The population-control mode fixes how many persons enter and leave
//! in a year. Planning only picks households; every state change happens
//! later, when the scheduler hands the Inmigration/Outmigration events back.
//!
//! Inmigrants are copies of randomly chosen resident households. They are
//! held here as pending templates until their event is applied; an
//! inmigrant that finds no dwelling is never admitted.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{
    config::{EventFlags, MigrationCounts, PopulationControlMethod, SimConfig},
    employment::Employment,
    error::{SimError, SimResult},
    event::{Event, EventOutcome, EventType},
    handler::{EventContext, EventHandler},
    issues::{Issue, IssueTracker},
    model::{Household, Person, Race, UtilityCache},
    repository::EntityRepository,
    rng::SubsystemRng,
    rules::event_enabled,
    types::{HouseholdId, Year},
};

/// Persons required to enter and leave in one year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationRequirement {
    pub inmigrants:  u64,
    pub outmigrants: u64,
}

/// What `plan_year` decided for one year.
#[derive(Debug, Clone, Default)]
pub struct MigrationPlan {
    pub year:        Year,
    pub population:  u64,
    pub required:    MigrationRequirement,
    /// Newly allocated household ids, one per Inmigration event.
    pub inflow:      Vec<HouseholdId>,
    /// Drawn with replacement; may repeat a household.
    pub outflow:     Vec<HouseholdId>,
}

#[derive(Debug, Clone)]
struct PendingHousehold {
    race:    Race,
    /// (annual income, in labor force) per member.
    members: Vec<(f64, bool)>,
}

pub struct MigrationController {
    method:             PopulationControlMethod,
    start_year:         Year,
    migration_table:    BTreeMap<Year, MigrationCounts>,
    population_targets: BTreeMap<Year, u64>,
    growth_rate:        f64,
    base_population:    Option<u64>,
    employment:         Arc<dyn Employment>,
    pending:            BTreeMap<HouseholdId, PendingHousehold>,
    last_plan:          Option<MigrationPlan>,
}

impl MigrationController {
    pub fn new(config: &SimConfig, employment: Arc<dyn Employment>) -> Self {
        Self {
            method:             config.population_control_method,
            start_year:         config.start_year,
            migration_table:    config.migration_table.clone(),
            population_targets: config.population_targets.clone(),
            growth_rate:        config.growth_rate,
            base_population:    config.base_population,
            employment,
            pending:            BTreeMap::new(),
            last_plan:          None,
        }
    }

    pub fn last_plan(&self) -> Option<&MigrationPlan> {
        self.last_plan.as_ref()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Persons to admit and remove in `year`, given the current population.
    pub fn requirement(&mut self, year: Year, population: u64) -> MigrationRequirement {
        let target = match self.method {
            PopulationControlMethod::FixedMigrationTable => {
                let counts = self.migration_table.get(&year).copied().unwrap_or_default();
                return MigrationRequirement {
                    inmigrants:  counts.inmigrants,
                    outmigrants: counts.outmigrants,
                };
            }
            PopulationControlMethod::PopulationTarget => match self.population_targets.get(&year) {
                Some(target) => *target,
                None => return MigrationRequirement::default(),
            },
            PopulationControlMethod::GrowthRate => {
                let base = *self.base_population.get_or_insert(population);
                let years = year.saturating_sub(self.start_year) as i32;
                (base as f64 * (1.0 + self.growth_rate).powi(years)).round().max(0.0) as u64
            }
        };
        if target >= population {
            MigrationRequirement { inmigrants: target - population, outmigrants: 0 }
        } else {
            MigrationRequirement { inmigrants: 0, outmigrants: population - target }
        }
    }

    /// Uniform draws with replacement until the drawn households hold
    /// at least `required` persons.
    fn draw_outmigrants(repo: &EntityRepository, required: u64, rng: &mut SubsystemRng) -> Vec<HouseholdId> {
        let pool = repo.household_ids();
        let mut drawn = Vec::new();
        if pool.is_empty() {
            return drawn;
        }
        let mut persons = 0u64;
        while persons < required {
            let id = pool[rng.index_below(pool.len())];
            persons += repo.household_size(id).max(1) as u64;
            drawn.push(id);
        }
        drawn
    }

    /// Copy randomly chosen resident households until the copies hold at
    /// least `required` persons.
    fn draw_inmigrants(
        &mut self,
        repo: &mut EntityRepository,
        required: u64,
        rng: &mut SubsystemRng,
    ) -> Vec<HouseholdId> {
        let templates: Vec<PendingHousehold> = repo.households()
            .filter(|hh| !hh.members.is_empty())
            .map(|hh| PendingHousehold {
                race:    hh.race,
                members: repo.members(hh.id)
                    .map(|p| (p.income, p.in_labor_force || p.job.is_some()))
                    .collect(),
            })
            .collect();
        let mut inflow = Vec::new();
        if templates.is_empty() {
            return inflow;
        }
        let mut persons = 0u64;
        while persons < required {
            let template = templates[rng.index_below(templates.len())].clone();
            persons += template.members.len() as u64;
            let id = repo.allocate_household_id();
            self.pending.insert(id, template);
            inflow.push(id);
        }
        inflow
    }

    /// Admit one pending inmigrant: register it, look for jobs, then a dwelling.
    fn admit(&mut self, event: &Event, ctx: &mut EventContext<'_>) -> SimResult<EventOutcome> {
        let Some(template) = self.pending.remove(&event.subject) else {
            log::warn!("year={} migration: no pending inmigrant {}; skipped", event.year, event.subject);
            ctx.issues.record(Issue::StaleEvent);
            return Ok(EventOutcome::Skipped);
        };

        let id = event.subject;
        let mut members = Vec::with_capacity(template.members.len());
        for (income, in_labor_force) in &template.members {
            members.push(Person {
                id:             ctx.repo.allocate_person_id(),
                household:      id,
                income:         *income,
                job:            None,
                in_labor_force: *in_labor_force,
            });
        }
        let seekers: Vec<_> = members.iter().filter(|p| p.in_labor_force).map(|p| p.id).collect();
        let household = Household { id, members: Vec::new(), dwelling: None, race: template.race };
        ctx.repo.add_household(household, members)?;

        for person in seekers {
            if self.employment.look_for_job(ctx.repo, person, ctx.rng)?.is_none() {
                log::debug!("year={} migration: inmigrant person {person} found no job", event.year);
            }
        }

        match ctx.housing.relocate(ctx.repo, ctx.issues, id, Issue::FailedSearchForMigration, ctx.rng)? {
            Some(dwelling) => {
                let persons = ctx.repo.household_size(id) as u32;
                Ok(EventOutcome::Admitted { dwelling, persons })
            }
            None => {
                outmigrate(ctx.repo, ctx.issues, self.employment.as_ref(), id)?;
                Ok(EventOutcome::NoOutcome)
            }
        }
    }
}

/// Remove `household` from the region: every member quits their job, the
/// dwelling is vacated, and the household leaves the registries.
/// Returns the number of persons who left.
pub fn outmigrate(
    repo: &mut EntityRepository,
    issues: &mut IssueTracker,
    employment: &dyn Employment,
    household: HouseholdId,
) -> SimResult<u32> {
    let hh = repo.household(household)
        .ok_or_else(|| SimError::inconsistent(format!("household {household} not found")))?;
    let members = hh.members.clone();
    let dwelling = hh.dwelling;

    for person in &members {
        employment.quit_job(repo, *person);
    }
    if let Some(d) = dwelling {
        let status = repo.vacate(d)?;
        issues.record_vacancy(status);
        if let Some(d) = repo.dwelling_mut(d) {
            d.utility = UtilityCache::Stale;
        }
    }
    let (_, persons) = repo.remove_household(household)?;
    Ok(persons.len() as u32)
}

impl EventHandler for MigrationController {
    fn name(&self) -> &'static str { "migration" }

    fn handled_events(&self) -> &'static [EventType] {
        &[EventType::Inmigration, EventType::Outmigration]
    }

    fn plan_year(
        &mut self,
        year: Year,
        repo: &mut EntityRepository,
        flags: &EventFlags,
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<Event>> {
        if !self.pending.is_empty() {
            log::warn!("year={year} migration: dropping {} unadmitted inmigrants", self.pending.len());
            self.pending.clear();
        }

        let population = repo.population();
        let required = self.requirement(year, population);

        let outflow = if event_enabled(flags, EventType::Outmigration) {
            Self::draw_outmigrants(repo, required.outmigrants, rng)
        } else {
            Vec::new()
        };
        let inflow = if event_enabled(flags, EventType::Inmigration) {
            self.draw_inmigrants(repo, required.inmigrants, rng)
        } else {
            Vec::new()
        };

        log::info!(
            "year={year} migration: population={population} required in={} out={} households in={} out={}",
            required.inmigrants, required.outmigrants, inflow.len(), outflow.len(),
        );

        let events = inflow.iter()
            .map(|id| Event::new(EventType::Inmigration, *id, year))
            .chain(outflow.iter().map(|id| Event::new(EventType::Outmigration, *id, year)))
            .collect();
        self.last_plan = Some(MigrationPlan { year, population, required, inflow, outflow });
        Ok(events)
    }

    fn handle(&mut self, event: &Event, ctx: &mut EventContext<'_>) -> SimResult<EventOutcome> {
        match event.kind {
            EventType::Inmigration => self.admit(event, ctx),
            EventType::Outmigration => {
                if ctx.repo.household(event.subject).is_none() {
                    log::warn!(
                        "year={} migration: household {} already gone; skipped",
                        event.year, event.subject,
                    );
                    ctx.issues.record(Issue::StaleEvent);
                    return Ok(EventOutcome::Skipped);
                }
                let persons = outmigrate(ctx.repo, ctx.issues, self.employment.as_ref(), event.subject)?;
                Ok(EventOutcome::Departed { persons })
            }
            other => Err(SimError::UnhandledEvent { event_type: other.name().to_string() }),
        }
    }

    fn as_any(&self) -> &dyn std::any::Any { self }
}

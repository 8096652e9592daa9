//! The relocation engine: one simulated year at a time.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Reset the IssueTracker for the year
//!   2. Prepare the housing market (caches, regional statistics)
//!   3. Let every handler plan exogenous events (migration)
//!   4. Build and shuffle the year's schedule
//!   5. Apply events one at a time, in schedule order
//!   6. Verify repository consistency and record the year summary
//!
//! RULES:
//!   - Every event type is owned by exactly one registered handler.
//!   - An enabled event type without a handler aborts the build.
//!   - All randomness flows through the RngBank.
//!   - Every applied event is recorded in the event ledger.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{
    config::SimConfig,
    development::DwellingDevelopmentModel,
    employment::{Employment, VacantJobMarket},
    error::{SimError, SimResult},
    event::{EventLogEntry, EventType},
    fixtures::FixtureBuilder,
    handler::{EventContext, EventHandler},
    issues::{IssueSummary, IssueTracker},
    migration::MigrationController,
    relocation::{HouseholdRelocationModel, RelocationHandler},
    repository::EntityRepository,
    rng::{RngBank, StreamSlot, SubsystemRng},
    rules::event_enabled,
    scheduler::EventScheduler,
    store::{SimStore, YearSummaryRow},
    travel::TravelTimes,
    types::{RunId, Year},
    utility::UtilityEvaluator,
};

/// What happened in one simulated year.
#[derive(Debug, Clone, PartialEq)]
pub struct YearReport {
    pub year:       Year,
    pub events:     u64,
    /// Applied events per outcome name.
    pub outcomes:   BTreeMap<String, u64>,
    pub issues:     IssueSummary,
    pub households: u64,
    pub population: u64,
    pub vacancies:  u64,
}

impl YearReport {
    pub fn outcome(&self, name: &str) -> u64 {
        self.outcomes.get(name).copied().unwrap_or(0)
    }
}

pub struct RelocationEngine {
    pub run_id: RunId,
    config:     SimConfig,
    rng_bank:   RngBank,
    repo:       EntityRepository,
    housing:    HouseholdRelocationModel,
    handlers:   Vec<Box<dyn EventHandler>>,
    dispatch:   BTreeMap<EventType, usize>,
    scheduler:  EventScheduler,
    issues:     IssueTracker,
    store:      SimStore,
    next_year:  Year,
}

impl RelocationEngine {
    /// Engine with no handlers registered. Validates the configuration
    /// and records the run in the store.
    pub fn new(
        run_id: RunId,
        config: SimConfig,
        repo: EntityRepository,
        utility: UtilityEvaluator,
        travel: Arc<dyn TravelTimes>,
        store: SimStore,
    ) -> SimResult<Self> {
        config.validate()?;
        store.insert_run(&run_id, config.seed, env!("CARGO_PKG_VERSION"), config.start_year)?;
        let repo = repo.with_vacancy_capacity(config.vacancy_storage_capacity);
        Ok(Self {
            rng_bank:  RngBank::new(config.seed),
            housing:   HouseholdRelocationModel::new(config.clone(), utility, travel),
            next_year: config.start_year,
            handlers:  Vec::new(),
            dispatch:  BTreeMap::new(),
            scheduler: EventScheduler::new(),
            issues:    IssueTracker::new(),
            run_id,
            config,
            repo,
            store,
        })
    }

    /// Build a fully wired engine: relocation, migration and development
    /// handlers registered, dispatch validated.
    pub fn build(
        run_id: RunId,
        config: SimConfig,
        repo: EntityRepository,
        travel: Arc<dyn TravelTimes>,
        store: SimStore,
    ) -> SimResult<Self> {
        let utility = UtilityEvaluator::from_coefficients(&config.utility);
        let mut engine = Self::new(run_id, config, repo, utility, travel, store)?;
        engine.register_defaults(Arc::new(VacantJobMarket))?;
        engine.validate_dispatch()?;
        Ok(engine)
    }

    /// Build a test engine over the default synthetic region and an
    /// in-memory store.
    pub fn build_test(run_id: &str, seed: u64) -> SimResult<Self> {
        let mut config = SimConfig::default_test();
        config.seed = seed;
        let fixtures = FixtureBuilder::new(seed).start_year(config.start_year);
        let repo = fixtures.build()?;
        let store = SimStore::in_memory()?;
        store.migrate()?;
        Self::build(run_id.to_string(), config, repo, Arc::new(fixtures.travel_times()), store)
    }

    /// Register the relocation, migration and development handlers.
    pub fn register_defaults(&mut self, employment: Arc<dyn Employment>) -> SimResult<()> {
        self.register(Box::new(RelocationHandler))?;
        self.register(Box::new(MigrationController::new(&self.config, employment.clone())))?;
        self.register(Box::new(DwellingDevelopmentModel::new(employment, self.config.utility.max_quality)))?;
        Ok(())
    }

    /// Register a handler. Claiming an event type that is already owned
    /// is a configuration error.
    pub fn register(&mut self, handler: Box<dyn EventHandler>) -> SimResult<()> {
        let index = self.handlers.len();
        for kind in handler.handled_events() {
            if let Some(owner) = self.dispatch.get(kind) {
                return Err(SimError::config(format!(
                    "event type '{}' claimed by both '{}' and '{}'",
                    kind.name(), self.handlers[*owner].name(), handler.name(),
                )));
            }
        }
        for kind in handler.handled_events() {
            self.dispatch.insert(*kind, index);
        }
        log::debug!("engine: registered handler '{}'", handler.name());
        self.handlers.push(handler);
        Ok(())
    }

    /// Every enabled event type must have an owner before the first year runs.
    pub fn validate_dispatch(&self) -> SimResult<()> {
        for kind in EventType::ALL {
            if event_enabled(&self.config.events, kind) && !self.dispatch.contains_key(&kind) {
                return Err(SimError::config(format!(
                    "event type '{}' is enabled but no handler is registered", kind.name()
                )));
            }
        }
        Ok(())
    }

    /// Advance one simulated year.
    pub fn run_year(&mut self) -> SimResult<YearReport> {
        let year = self.next_year;
        self.issues.reset(year);
        self.housing.prepare_year(year, &mut self.repo, &mut self.issues)?;

        let mut planning = self.rng_bank.for_year(StreamSlot::Planning, year);
        let mut planned = Vec::new();
        for handler in &mut self.handlers {
            planned.extend(handler.plan_year(year, &mut self.repo, &self.config.events, &mut planning)?);
        }

        let mut order = self.rng_bank.for_year(StreamSlot::Scheduler, year);
        let scheduled = self.scheduler.build_year_events(year, &self.repo, &self.config.events, planned, &mut order);
        log::info!("year={year} engine: {scheduled} events scheduled");

        let mut rng = self.rng_bank.for_year(StreamSlot::Events, year);
        self.store.begin_batch()?;
        let applied = self.apply_events(year, &mut rng)
            .and_then(|outcomes| self.repo.verify_consistency().map(|()| outcomes));
        let outcomes = match applied {
            Ok(outcomes) => outcomes,
            Err(e) => {
                self.store.rollback_batch();
                return Err(e);
            }
        };

        let report = YearReport {
            year,
            events:     outcomes.values().sum(),
            outcomes,
            issues:     self.issues.summary(),
            households: self.repo.household_count() as u64,
            population: self.repo.population(),
            vacancies:  self.repo.total_vacancies() as u64,
        };
        self.store.save_year_summary(&self.run_id, &YearSummaryRow {
            year,
            households: report.households,
            population: report.population,
            vacancies:  report.vacancies,
            events:     report.events,
            issues:     report.issues.clone(),
        })?;
        self.store.commit_batch()?;

        log::info!(
            "year={year} engine: households={} population={} vacancies={}",
            report.households, report.population, report.vacancies,
        );
        report.issues.log();
        self.next_year += 1;
        Ok(report)
    }

    fn apply_events(&mut self, year: Year, rng: &mut SubsystemRng) -> SimResult<BTreeMap<String, u64>> {
        let mut outcomes: BTreeMap<String, u64> = BTreeMap::new();
        let mut sequence = 0u64;

        while let Some(event) = self.scheduler.next() {
            let index = *self.dispatch.get(&event.kind).ok_or_else(|| SimError::UnhandledEvent {
                event_type: event.kind.name().to_string(),
            })?;
            let mut ctx = EventContext {
                year,
                repo:    &mut self.repo,
                housing: &self.housing,
                issues:  &mut self.issues,
                rng:     &mut *rng,
            };
            let outcome = self.handlers[index].handle(&event, &mut ctx)?;

            let entry = EventLogEntry {
                id:         None,
                run_id:     self.run_id.clone(),
                year,
                sequence,
                event_type: event.kind.name().to_string(),
                subject:    event.subject,
                outcome:    outcome.name().to_string(),
                payload:    serde_json::to_string(&outcome)?,
            };
            self.store.append_event(&entry)?;
            *outcomes.entry(outcome.name().to_string()).or_insert(0) += 1;
            sequence += 1;
        }
        Ok(outcomes)
    }

    /// Run `n` years in a loop.
    pub fn run_years(&mut self, n: u32) -> SimResult<Vec<YearReport>> {
        (0..n).map(|_| self.run_year()).collect()
    }

    // ── Accessors ──────────────────────────────────────────────

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn repo(&self) -> &EntityRepository {
        &self.repo
    }

    /// Direct repository access for scenario setup between years.
    pub fn repo_mut(&mut self) -> &mut EntityRepository {
        &mut self.repo
    }

    pub fn housing(&self) -> &HouseholdRelocationModel {
        &self.housing
    }

    pub fn issues(&self) -> &IssueTracker {
        &self.issues
    }

    pub fn next_year(&self) -> Year {
        self.next_year
    }

    /// Query a year's ledger. Used by the determinism test and the runner.
    pub fn store_events_for_year(&self, year: Year) -> SimResult<Vec<EventLogEntry>> {
        self.store.events_for_year(&self.run_id, year)
    }

    pub fn store_year_summary(&self, year: Year) -> SimResult<Option<YearSummaryRow>> {
        self.store.year_summary(&self.run_id, year)
    }

    /// Look up a registered handler by concrete type.
    /// Used by tests and the runner for end-of-run summaries.
    pub fn handler<T: 'static>(&self) -> Option<&T> {
        self.handlers.iter().find_map(|h| h.as_any().downcast_ref::<T>())
    }
}

//! Household relocation model.
//!
//! This model:
//!   1. Precomputes the year's housing-market view (regional medians,
//!      price/accessibility normalisation, race shares, commute times,
//!      dwelling utility caches, per-type average satisfaction)
//!   2. Decides move-or-stay for a household
//!   3. Runs the two-stage search: region first, then a dwelling in it
//!   4. Applies the move as one transaction on the repository
//!
//! Execution: once per Relocation event, plus on behalf of the migration
//! and development handlers whenever they need a dwelling for a household.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use rayon::prelude::*;

use crate::{
    config::{RegionNormalizer, SimConfig},
    error::{DomainInputError, SimError, SimResult, UtilityResult},
    event::{Event, EventOutcome, EventType},
    handler::{EventContext, EventHandler},
    issues::{Issue, IssueTracker},
    model::{Dwelling, HouseholdType, Race, UtilityCache},
    repository::EntityRepository,
    rng::SubsystemRng,
    selection::{draw_binary, select_from_map, select_weighted},
    travel::{TravelMode, TravelTimes, PEAK_HOUR},
    types::{DwellingId, HouseholdId, RegionId, Year, ZoneId},
    utility::{DwellingUtilityInputs, RegionUtilityInputs, UtilityEvaluator},
};

/// Satisfaction assumed for household types with no housed members.
const FALLBACK_SATISFACTION: f64 = 0.5;

// ── Public types ─────────────────────────────────────────────────────────────

/// Everything the choice models need to know about one household.
#[derive(Debug, Clone)]
pub struct HouseholdProfile {
    pub id:              HouseholdId,
    pub size:            usize,
    pub income:          f64,
    pub income_category: usize,
    pub household_type:  HouseholdType,
    pub race:            Race,
    pub dwelling:        Option<DwellingId>,
    /// Workplace zone of every employed member.
    pub workplaces:      Vec<ZoneId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDecision {
    Stay,
    Move,
    /// The current dwelling's income restriction no longer admits the household.
    MustMove,
}

impl MoveDecision {
    pub fn searches(self) -> bool {
        self != Self::Stay
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Found(DwellingId),
    NoRegion,
    NoDwelling,
}

#[derive(Debug, Clone, Default)]
struct RegionStats {
    median_income:            f64,
    normalized_price:         f64,
    normalized_accessibility: f64,
    race_share:               [f64; 4],
    dwellings:                usize,
    population:               u64,
}

/// The year's read-mostly market view, rebuilt by `prepare_year`.
#[derive(Debug, Clone, Default)]
struct MarketView {
    year:                 Option<Year>,
    global_median_income: f64,
    regions:              BTreeMap<RegionId, RegionStats>,
    zone_race_share:      BTreeMap<ZoneId, [f64; 4]>,
    /// Fastest auto minutes from any zone of a region to a workplace zone.
    commute_minutes:      BTreeMap<RegionId, BTreeMap<ZoneId, f64>>,
    /// Indexed by `HouseholdType::index`.
    average_satisfaction: Vec<f64>,
}

struct CacheJob {
    id:       DwellingId,
    inputs:   DwellingUtilityInputs,
    resident: Option<HouseholdType>,
}

// ── Model ────────────────────────────────────────────────────────────────────

pub struct HouseholdRelocationModel {
    config:  SimConfig,
    utility: UtilityEvaluator,
    travel:  Arc<dyn TravelTimes>,
    view:    MarketView,
}

impl HouseholdRelocationModel {
    pub fn new(config: SimConfig, utility: UtilityEvaluator, travel: Arc<dyn TravelTimes>) -> Self {
        Self { config, utility, travel, view: MarketView::default() }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn utility(&self) -> &UtilityEvaluator {
        &self.utility
    }

    pub fn prepared_year(&self) -> Option<Year> {
        self.view.year
    }

    pub fn profile(&self, repo: &EntityRepository, id: HouseholdId) -> Option<HouseholdProfile> {
        let hh = repo.household(id)?;
        let income = repo.household_income(id);
        let income_category = self.config.income_category(income);
        let workplaces = repo.members(id)
            .filter_map(|p| p.job)
            .filter_map(|j| repo.job(j))
            .map(|j| j.zone)
            .collect();
        Some(HouseholdProfile {
            id,
            size: hh.members.len(),
            income,
            income_category,
            household_type: HouseholdType::classify(hh.members.len(), income_category),
            race: hh.race,
            dwelling: hh.dwelling,
            workplaces,
        })
    }

    pub fn average_satisfaction(&self, household_type: HouseholdType) -> f64 {
        let index = household_type.index(self.config.income_categories());
        self.view.average_satisfaction.get(index).copied().unwrap_or(FALLBACK_SATISFACTION)
    }

    fn median_income(&self, region: Option<RegionId>) -> f64 {
        region
            .and_then(|r| self.view.regions.get(&r))
            .map_or(self.view.global_median_income, |s| s.median_income)
    }

    fn zone_share(&self, zone: ZoneId, race: Race) -> f64 {
        self.view.zone_race_share.get(&zone).map_or(0.0, |s| s[race.index()])
    }

    // ── Eligibility and subsidy ────────────────────────────────────────────

    /// Does a household with `income` pass the dwelling's income restriction?
    pub fn qualifies(&self, income: f64, dwelling: &Dwelling, region: Option<RegionId>) -> bool {
        !dwelling.is_restricted() || income <= dwelling.restriction * self.median_income(region)
    }

    /// Price a subsidized low-income household would pay, when it differs from the list price.
    fn subsidized_price(&self, income: f64, price: f64, region: Option<RegionId>) -> Option<f64> {
        if !self.config.provide_low_income_subsidy {
            return None;
        }
        if income > self.config.low_income_share_of_median * self.median_income(region) {
            return None;
        }
        let affordable = self.config.max_rent_share_of_income * income / 12.0;
        (price > affordable).then_some(affordable.max(0.0))
    }

    // ── Dwelling utility ───────────────────────────────────────────────────

    fn dwelling_inputs(
        repo: &EntityRepository,
        dwelling: &Dwelling,
        household_type: HouseholdType,
        price: f64,
    ) -> DwellingUtilityInputs {
        let zone = repo.zone(dwelling.zone);
        DwellingUtilityInputs {
            household_type,
            price,
            quality:               dwelling.quality,
            bedrooms:              dwelling.bedrooms,
            auto_accessibility:    zone.map_or(0.0, |z| z.auto_accessibility),
            transit_accessibility: zone.map_or(0.0, |z| z.transit_accessibility),
            school_quality:        zone.map_or(0.0, |z| z.school_quality),
            crime_rate:            zone.map_or(0.0, |z| z.crime_rate),
        }
    }

    /// Utility of `dwelling` for the household, using the year cache when it is still valid.
    pub fn dwelling_utility(
        &self,
        repo: &EntityRepository,
        profile: &HouseholdProfile,
        dwelling: &Dwelling,
    ) -> UtilityResult<f64> {
        let region = repo.region_of_zone(dwelling.zone);
        if let Some(price) = self.subsidized_price(profile.income, dwelling.price, region) {
            let inputs = Self::dwelling_inputs(repo, dwelling, profile.household_type, price);
            return self.utility.dwelling.dwelling_utility(&inputs);
        }

        let type_index = profile.household_type.index(self.config.income_categories());
        match &dwelling.utility {
            UtilityCache::Vacant(by_type) if dwelling.is_vacant() => {
                if let Some(u) = by_type.get(type_index) {
                    return Ok(*u);
                }
            }
            UtilityCache::Occupied(u) if dwelling.resident == Some(profile.id) => return Ok(*u),
            _ => {}
        }
        let inputs = Self::dwelling_inputs(repo, dwelling, profile.household_type, dwelling.price);
        self.utility.dwelling.dwelling_utility(&inputs)
    }

    // ── Move-or-stay ───────────────────────────────────────────────────────

    pub fn decide(
        &self,
        repo: &EntityRepository,
        profile: &HouseholdProfile,
        rng: &mut SubsystemRng,
    ) -> UtilityResult<MoveDecision> {
        let Some(dwelling) = profile.dwelling.and_then(|d| repo.dwelling(d)) else {
            return Ok(MoveDecision::MustMove);
        };
        let region = repo.region_of_zone(dwelling.zone);
        if !self.qualifies(profile.income, dwelling, region) {
            return Ok(MoveDecision::MustMove);
        }

        let current = self.dwelling_utility(repo, profile, dwelling)?;
        let satisfaction = self.average_satisfaction(profile.household_type);
        let p_move = self.utility.moves.move_probability(satisfaction, current)?;

        Ok(if draw_binary(p_move, rng) { MoveDecision::Move } else { MoveDecision::Stay })
    }

    // ── Stage 1: region ────────────────────────────────────────────────────

    fn commute_factor(&self, repo: &EntityRepository, region: RegionId, profile: &HouseholdProfile) -> f64 {
        profile.workplaces.iter()
            .map(|zone| {
                let minutes = self.view.commute_minutes
                    .get(&region)
                    .and_then(|m| m.get(zone))
                    .copied()
                    .unwrap_or_else(|| region_travel_time(repo, self.travel.as_ref(), region, *zone));
                self.travel.commuting_time_probability(minutes)
            })
            .product()
    }

    /// Scaled, non-negative utility of every region for this household.
    pub fn region_utilities(
        &self,
        repo: &EntityRepository,
        profile: &HouseholdProfile,
    ) -> UtilityResult<BTreeMap<RegionId, f64>> {
        let total_vacant = repo.total_vacancies() as f64;
        let mut utilities = BTreeMap::new();

        for region in repo.region_ids() {
            let stats = self.view.regions.get(&region).cloned().unwrap_or_default();
            let base = self.utility.region.region_utility(&RegionUtilityInputs {
                income_category:          profile.income_category,
                race:                     profile.race,
                normalized_price:         stats.normalized_price,
                normalized_accessibility: stats.normalized_accessibility,
                race_share:               stats.race_share[profile.race.index()],
            })?;
            let raw = base * self.commute_factor(repo, region, profile);

            let vacant = repo.vacancy_count(region) as f64;
            let scaled = match self.config.region_normalizer {
                RegionNormalizer::VacantDwellings => raw * vacant,
                RegionNormalizer::VacancyShare => {
                    if total_vacant > 0.0 { raw * vacant / total_vacant } else { 0.0 }
                }
                RegionNormalizer::DampenedVacancyRate => {
                    let rate = if stats.dwellings > 0 { vacant / stats.dwellings as f64 } else { 0.0 };
                    raw * (1.0 - (-self.config.vacancy_dampening * rate).exp())
                }
                RegionNormalizer::Population => raw * stats.population as f64,
                RegionNormalizer::None => raw,
            };
            let scaled = if scaled.is_finite() { scaled.max(0.0) } else { 0.0 };
            utilities.insert(region, scaled);
        }
        Ok(utilities)
    }

    /// Stage 1. `None` is the "no region found" sentinel.
    pub fn select_region(
        &self,
        repo: &EntityRepository,
        profile: &HouseholdProfile,
        rng: &mut SubsystemRng,
    ) -> UtilityResult<Option<RegionId>> {
        let utilities = self.region_utilities(repo, profile)?;
        if utilities.values().sum::<f64>() <= 0.0 {
            return Ok(None);
        }
        Ok(select_from_map(&utilities, rng))
    }

    // ── Stage 2: dwelling ──────────────────────────────────────────────────

    /// Vacant dwellings of `region` whose income restriction admits the household.
    pub fn eligible_vacancies(
        &self,
        repo: &EntityRepository,
        profile: &HouseholdProfile,
        region: RegionId,
    ) -> Vec<DwellingId> {
        repo.vacant_dwellings(region)
            .filter(|id| {
                repo.dwelling(*id)
                    .is_some_and(|d| self.qualifies(profile.income, d, Some(region)))
            })
            .collect()
    }

    /// Keep every dwelling of a small pool; otherwise keep each one
    /// independently with probability cap/len. An overflow past the cap is
    /// cut by a uniform draw, never by id order.
    fn subsample(&self, pool: Vec<DwellingId>, rng: &mut SubsystemRng) -> Vec<DwellingId> {
        let cap = self.config.max_dwelling_candidates_per_search;
        if pool.len() <= cap {
            return pool;
        }
        let p = cap as f64 / pool.len() as f64;
        let mut kept: Vec<DwellingId> = pool.into_iter().filter(|_| rng.chance(p)).collect();
        if kept.len() > cap {
            rng.shuffle(&mut kept);
            kept.truncate(cap);
            kept.sort_unstable();
        }
        kept
    }

    fn candidate_weight(
        &self,
        repo: &EntityRepository,
        profile: &HouseholdProfile,
        dwelling: &Dwelling,
    ) -> UtilityResult<f64> {
        let utility = self.dwelling_utility(repo, profile, dwelling)?;
        let share = self.zone_share(dwelling.zone, profile.race);
        let alpha = self.config.race_relevance_in_zone;
        let adjusted = utility.max(0.0).powf(1.0 - alpha) * share.max(0.0).powf(alpha);
        self.utility.moves.selection_weight(adjusted)
    }

    /// Stage 2. `None` is the "no dwelling found" sentinel.
    pub fn select_dwelling(
        &self,
        repo: &EntityRepository,
        profile: &HouseholdProfile,
        region: RegionId,
        rng: &mut SubsystemRng,
    ) -> UtilityResult<Option<DwellingId>> {
        let pool = self.eligible_vacancies(repo, profile, region);
        let candidates = self.subsample(pool, rng);

        let mut weighted = Vec::with_capacity(candidates.len());
        for id in candidates {
            if let Some(dwelling) = repo.dwelling(id) {
                weighted.push((id, self.candidate_weight(repo, profile, dwelling)?));
            }
        }
        Ok(select_weighted(&weighted, rng))
    }

    /// Both stages back to back.
    pub fn search(
        &self,
        repo: &EntityRepository,
        profile: &HouseholdProfile,
        rng: &mut SubsystemRng,
    ) -> UtilityResult<SearchOutcome> {
        let Some(region) = self.select_region(repo, profile, rng)? else {
            return Ok(SearchOutcome::NoRegion);
        };
        Ok(match self.select_dwelling(repo, profile, region, rng)? {
            Some(dwelling) => SearchOutcome::Found(dwelling),
            None => SearchOutcome::NoDwelling,
        })
    }

    // ── Move ───────────────────────────────────────────────────────────────

    /// Move `household` from `old` (None for a new or migrating household)
    /// into the vacant `new` dwelling. Every precondition is checked before
    /// the repository is touched, so the move applies completely or not at all.
    pub fn move_household(
        repo: &mut EntityRepository,
        issues: &mut IssueTracker,
        household: HouseholdId,
        old: Option<DwellingId>,
        new: DwellingId,
    ) -> SimResult<()> {
        let hh = repo.household(household)
            .ok_or_else(|| SimError::inconsistent(format!("household {household} not found")))?;
        if hh.dwelling != old {
            return Err(SimError::inconsistent(format!(
                "household {household} lives in {:?}, not {old:?}", hh.dwelling
            )));
        }
        let target = repo.dwelling(new)
            .ok_or_else(|| SimError::inconsistent(format!("dwelling {new} not found")))?;
        if let Some(resident) = target.resident {
            return Err(SimError::inconsistent(format!(
                "dwelling {new} is occupied by household {resident}"
            )));
        }

        if let Some(old) = old {
            let status = repo.vacate(old)?;
            issues.record_vacancy(status);
            if let Some(d) = repo.dwelling_mut(old) {
                d.utility = UtilityCache::Stale;
            }
        }
        repo.occupy(new, household)?;
        if let Some(d) = repo.dwelling_mut(new) {
            d.utility = UtilityCache::Stale;
        }
        Ok(())
    }

    /// Search a dwelling for `household` and move it there. On failure the
    /// household stays put and `on_failure` is counted.
    pub fn relocate(
        &self,
        repo: &mut EntityRepository,
        issues: &mut IssueTracker,
        household: HouseholdId,
        on_failure: Issue,
        rng: &mut SubsystemRng,
    ) -> SimResult<Option<DwellingId>> {
        let Some(profile) = self.profile(repo, household) else {
            return Ok(None);
        };
        match self.search(repo, &profile, rng) {
            Ok(SearchOutcome::Found(dwelling)) => {
                Self::move_household(repo, issues, household, profile.dwelling, dwelling)?;
                Ok(Some(dwelling))
            }
            Ok(outcome) => {
                log::debug!("relocation: household {household} search failed ({outcome:?})");
                issues.record(on_failure);
                Ok(None)
            }
            Err(e) => {
                record_domain_error(issues, household, &e, on_failure);
                Ok(None)
            }
        }
    }

    /// Apply a Relocation event.
    pub fn handle(
        &self,
        event: &Event,
        repo: &mut EntityRepository,
        issues: &mut IssueTracker,
        rng: &mut SubsystemRng,
    ) -> SimResult<EventOutcome> {
        let Some(profile) = self.profile(repo, event.subject) else {
            log::warn!("year={} relocation: household {} no longer exists; skipped", event.year, event.subject);
            issues.record(Issue::StaleEvent);
            return Ok(EventOutcome::Skipped);
        };
        let Some(from) = profile.dwelling else {
            log::warn!("year={} relocation: household {} is not housed; skipped", event.year, event.subject);
            issues.record(Issue::StaleEvent);
            return Ok(EventOutcome::Skipped);
        };

        let decision = match self.decide(repo, &profile, rng) {
            Ok(d) => d,
            Err(e) => {
                record_domain_error(issues, profile.id, &e, Issue::FailedSearchForRelocation);
                return Ok(EventOutcome::NoOutcome);
            }
        };
        if !decision.searches() {
            return Ok(EventOutcome::Stayed);
        }

        match self.relocate(repo, issues, profile.id, Issue::FailedSearchForRelocation, rng)? {
            Some(to) => {
                log::debug!(
                    "year={} relocation: household {} moved {from} -> {to} ({decision:?})",
                    event.year, profile.id,
                );
                Ok(EventOutcome::Moved { from: Some(from), to })
            }
            None => Ok(EventOutcome::NoOutcome),
        }
    }

    // ── Yearly precomputation ──────────────────────────────────────────────

    /// Rebuild the market view and every dwelling utility cache for `year`.
    /// Runs before the first event of the year; nothing here draws randomness.
    pub fn prepare_year(
        &mut self,
        year: Year,
        repo: &mut EntityRepository,
        issues: &mut IssueTracker,
    ) -> SimResult<()> {
        let mut view = MarketView { year: Some(year), ..MarketView::default() };

        // Incomes, race counts and population by region and zone.
        let mut incomes_by_region: BTreeMap<RegionId, Vec<f64>> = BTreeMap::new();
        let mut all_incomes = Vec::with_capacity(repo.household_count());
        let mut race_by_region: BTreeMap<RegionId, [f64; 4]> = BTreeMap::new();
        let mut race_by_zone: BTreeMap<ZoneId, [f64; 4]> = BTreeMap::new();
        let mut population: BTreeMap<RegionId, u64> = BTreeMap::new();
        for hh in repo.households() {
            let income = repo.household_income(hh.id);
            all_incomes.push(income);
            let Some(zone) = hh.dwelling.and_then(|d| repo.dwelling(d)).map(|d| d.zone) else {
                continue;
            };
            let Some(region) = repo.region_of_zone(zone) else { continue };
            incomes_by_region.entry(region).or_default().push(income);
            race_by_region.entry(region).or_default()[hh.race.index()] += 1.0;
            race_by_zone.entry(zone).or_default()[hh.race.index()] += 1.0;
            *population.entry(region).or_default() += hh.members.len() as u64;
        }
        view.global_median_income = median(&mut all_incomes);

        // Average price and accessibility by region.
        let mut price_sum: BTreeMap<RegionId, (f64, usize)> = BTreeMap::new();
        for d in repo.dwellings() {
            if let Some(region) = repo.region_of_zone(d.zone) {
                let entry = price_sum.entry(region).or_default();
                entry.0 += d.price;
                entry.1 += 1;
            }
        }
        let mut access_sum: BTreeMap<RegionId, (f64, usize)> = BTreeMap::new();
        for z in repo.zones() {
            let entry = access_sum.entry(z.region).or_default();
            entry.0 += z.auto_accessibility;
            entry.1 += 1;
        }
        let mean = |m: &BTreeMap<RegionId, (f64, usize)>, r: RegionId| {
            m.get(&r).filter(|(_, n)| *n > 0).map_or(0.0, |(s, n)| s / *n as f64)
        };
        let max_price = repo.region_ids().into_iter().map(|r| mean(&price_sum, r)).fold(0.0, f64::max);
        let max_access = repo.region_ids().into_iter().map(|r| mean(&access_sum, r)).fold(0.0, f64::max);

        for region in repo.region_ids() {
            let incomes = incomes_by_region.entry(region).or_default();
            let median_income = if incomes.is_empty() { view.global_median_income } else { median(incomes) };
            view.regions.insert(region, RegionStats {
                median_income,
                normalized_price:         ratio(mean(&price_sum, region), max_price),
                normalized_accessibility: ratio(mean(&access_sum, region), max_access),
                race_share:               shares(race_by_region.get(&region)),
                dwellings:                price_sum.get(&region).map_or(0, |(_, n)| *n),
                population:               population.get(&region).copied().unwrap_or(0),
            });
        }
        view.zone_race_share = race_by_zone.iter().map(|(z, c)| (*z, shares(Some(c)))).collect();

        // Region-to-workplace commute minutes for every zone that holds a job.
        let job_zones: BTreeSet<ZoneId> = repo.jobs().map(|j| j.zone).collect();
        for region in repo.region_ids() {
            let row = job_zones.iter()
                .map(|zone| (*zone, region_travel_time(repo, self.travel.as_ref(), region, *zone)))
                .collect();
            view.commute_minutes.insert(region, row);
        }

        self.view = view;
        self.refresh_dwelling_caches(repo, issues);

        log::info!(
            "year={year} relocation: market prepared ({} regions, {} vacancies, median income {:.0})",
            self.view.regions.len(),
            repo.total_vacancies(),
            self.view.global_median_income,
        );
        Ok(())
    }

    /// Evaluate every dwelling's utility cache in parallel, then write the
    /// results back and derive per-type average satisfaction.
    fn refresh_dwelling_caches(&mut self, repo: &mut EntityRepository, issues: &mut IssueTracker) {
        let categories = self.config.income_categories();
        let type_count = HouseholdType::count(categories);

        let jobs: Vec<CacheJob> = repo.dwellings()
            .map(|d| {
                let resident = d.resident.and_then(|hh| self.profile(repo, hh));
                let price = resident.as_ref()
                    .and_then(|p| self.subsidized_price(p.income, d.price, repo.region_of_zone(d.zone)))
                    .unwrap_or(d.price);
                let placeholder = HouseholdType::from_index(0, categories);
                CacheJob {
                    id:       d.id,
                    inputs:   Self::dwelling_inputs(repo, d, placeholder, price),
                    resident: resident.map(|p| p.household_type),
                }
            })
            .collect();

        let strategy = &self.utility.dwelling;
        let results: Vec<UtilityResult<UtilityCache>> = jobs
            .par_iter()
            .map(|job| match job.resident {
                Some(household_type) => strategy
                    .dwelling_utility(&DwellingUtilityInputs { household_type, ..job.inputs })
                    .map(UtilityCache::Occupied),
                None => (0..type_count)
                    .map(|i| {
                        let household_type = HouseholdType::from_index(i, categories);
                        strategy.dwelling_utility(&DwellingUtilityInputs { household_type, ..job.inputs })
                    })
                    .collect::<UtilityResult<Vec<f64>>>()
                    .map(UtilityCache::Vacant),
            })
            .collect();

        let mut satisfaction = vec![(0.0, 0usize); type_count];
        for (job, result) in jobs.iter().zip(results) {
            let cache = match result {
                Ok(cache) => cache,
                Err(e) => {
                    log::warn!("relocation: dwelling {} utility cache skipped: {e}", job.id);
                    issues.record(Issue::DomainInputError);
                    UtilityCache::Stale
                }
            };
            if let (UtilityCache::Occupied(u), Some(t)) = (&cache, job.resident) {
                let slot = &mut satisfaction[t.index(categories)];
                slot.0 += u;
                slot.1 += 1;
            }
            if let Some(d) = repo.dwelling_mut(job.id) {
                d.utility = cache;
            }
        }

        let (total, count) = satisfaction.iter()
            .fold((0.0, 0usize), |(s, n), (ts, tn)| (s + ts, n + tn));
        let overall = if count > 0 { total / count as f64 } else { FALLBACK_SATISFACTION };
        self.view.average_satisfaction = satisfaction.iter()
            .map(|(s, n)| if *n > 0 { s / *n as f64 } else { overall })
            .collect();
    }
}

/// A utility formula rejected its input: count the failure and the cause.
fn record_domain_error(issues: &mut IssueTracker, household: HouseholdId, e: &DomainInputError, on_failure: Issue) {
    log::warn!("relocation: household {household} search abandoned: {e}");
    issues.record(Issue::DomainInputError);
    issues.record(on_failure);
}

/// Fastest auto time from any zone of `region` to `zone`.
fn region_travel_time(repo: &EntityRepository, travel: &dyn TravelTimes, region: RegionId, zone: ZoneId) -> f64 {
    repo.zones_in_region(region)
        .map(|z| travel.travel_time(z.id, zone, PEAK_HOUR, TravelMode::Auto))
        .fold(f64::INFINITY, f64::min)
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 { (values[mid - 1] + values[mid]) / 2.0 } else { values[mid] }
}

fn ratio(value: f64, max: f64) -> f64 {
    if max > 0.0 { value / max } else { 0.0 }
}

fn shares(counts: Option<&[f64; 4]>) -> [f64; 4] {
    let Some(counts) = counts else { return [0.0; 4] };
    let total: f64 = counts.iter().sum();
    if total <= 0.0 {
        return [0.0; 4];
    }
    counts.map(|c| c / total)
}

// ── Handler ──────────────────────────────────────────────────────────────────

/// Routes Relocation events to the shared relocation model.
#[derive(Debug, Default)]
pub struct RelocationHandler;

impl EventHandler for RelocationHandler {
    fn name(&self) -> &'static str { "relocation" }

    fn handled_events(&self) -> &'static [EventType] {
        &[EventType::Relocation]
    }

    fn handle(&mut self, event: &Event, ctx: &mut EventContext<'_>) -> SimResult<EventOutcome> {
        ctx.housing.handle(event, ctx.repo, ctx.issues, ctx.rng)
    }

    fn as_any(&self) -> &dyn std::any::Any { self }
}

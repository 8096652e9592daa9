//! Household relocation: move-or-stay, the two-stage search and the
//! bounded dwelling candidate set.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use relocation_core::{
    config::{RegionNormalizer, SimConfig},
    error::UtilityResult,
    event::{Event, EventOutcome, EventType},
    fixtures::FixtureBuilder,
    issues::{Issue, IssueTracker},
    model::{Dwelling, Household, Job, Person, Race, Region, UtilityCache, Zone},
    relocation::{HouseholdRelocationModel, MoveDecision, SearchOutcome},
    repository::EntityRepository,
    rng::SubsystemRng,
    travel::ZoneTravelTimes,
    types::{DwellingId, HouseholdId, RegionId, ZoneId},
    utility::{
        CoefficientUtility, MovesStrategy, RegionUtilityInputs, RegionUtilityStrategy, UtilityEvaluator,
    },
};

const YEAR: u32 = 2010;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn zone_of(region: RegionId) -> u32 {
    region * 10
}

fn add_zone(repo: &mut EntityRepository, id: ZoneId, region: RegionId) {
    repo.add_zone(Zone {
        id,
        region,
        auto_accessibility:    60.0,
        transit_accessibility: 40.0,
        school_quality:        0.6,
        crime_rate:            0.1,
    }).unwrap();
}

fn world(regions: &[RegionId]) -> EntityRepository {
    let mut repo = EntityRepository::new();
    for r in regions {
        repo.add_region(Region { id: *r, name: format!("R{r}") });
        add_zone(&mut repo, zone_of(*r), *r);
    }
    repo
}

fn dwelling(repo: &mut EntityRepository, id: DwellingId, region: RegionId, quality: u8, price: f64, restriction: f64) {
    dwelling_in_zone(repo, id, zone_of(region), quality, price, restriction);
}

fn dwelling_in_zone(repo: &mut EntityRepository, id: DwellingId, zone: ZoneId, quality: u8, price: f64, restriction: f64) {
    repo.add_dwelling(Dwelling {
        id,
        zone,
        quality,
        bedrooms:   2,
        price,
        restriction,
        resident:   None,
        year_built: 1990,
        utility:    UtilityCache::Stale,
    }).unwrap();
}

fn household(repo: &mut EntityRepository, income: f64, home: Option<DwellingId>) -> HouseholdId {
    household_of(repo, income, Race::White, home)
}

fn household_of(repo: &mut EntityRepository, income: f64, race: Race, home: Option<DwellingId>) -> HouseholdId {
    let id = repo.allocate_household_id();
    let person = Person {
        id:             repo.allocate_person_id(),
        household:      id,
        income,
        job:            None,
        in_labor_force: true,
    };
    repo.add_household(Household { id, members: Vec::new(), dwelling: None, race }, vec![person])
        .unwrap();
    if let Some(d) = home {
        repo.occupy(d, id).unwrap();
    }
    id
}

fn travel() -> Arc<ZoneTravelTimes> {
    Arc::new(ZoneTravelTimes::new(20.0, 0.02))
}

fn model_with(config: SimConfig, utility: UtilityEvaluator) -> HouseholdRelocationModel {
    HouseholdRelocationModel::new(config, utility, travel())
}

fn model(config: SimConfig) -> HouseholdRelocationModel {
    let utility = UtilityEvaluator::from_coefficients(&config.utility);
    model_with(config, utility)
}

/// Counts how many candidates the dwelling search scores.
struct CountingMoves {
    inner: CoefficientUtility,
    calls: AtomicUsize,
}

impl MovesStrategy for CountingMoves {
    fn move_probability(&self, average_satisfaction: f64, current_utility: f64) -> UtilityResult<f64> {
        self.inner.move_probability(average_satisfaction, current_utility)
    }

    fn selection_weight(&self, adjusted_utility: f64) -> UtilityResult<f64> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.inner.selection_weight(adjusted_utility)
    }
}

struct AlwaysMove;

impl MovesStrategy for AlwaysMove {
    fn move_probability(&self, _: f64, _: f64) -> UtilityResult<f64> {
        Ok(1.0)
    }

    fn selection_weight(&self, adjusted_utility: f64) -> UtilityResult<f64> {
        Ok(1.0 + adjusted_utility)
    }
}

struct ZeroRegions;

/// Every region gets the same baseline, so only commute and normalizer differ.
struct FlatRegions(f64);

impl RegionUtilityStrategy for FlatRegions {
    fn region_utility(&self, _: &RegionUtilityInputs) -> UtilityResult<f64> {
        Ok(self.0)
    }
}

/// Every candidate weighs the same.
struct FlatMoves;

impl MovesStrategy for FlatMoves {
    fn move_probability(&self, _: f64, _: f64) -> UtilityResult<f64> {
        Ok(1.0)
    }

    fn selection_weight(&self, _: f64) -> UtilityResult<f64> {
        Ok(1.0)
    }
}

impl RegionUtilityStrategy for ZeroRegions {
    fn region_utility(&self, _: &RegionUtilityInputs) -> UtilityResult<f64> {
        Ok(0.0)
    }
}

fn counting_model(config: SimConfig) -> (HouseholdRelocationModel, Arc<CountingMoves>) {
    let counter = Arc::new(CountingMoves {
        inner: CoefficientUtility::new(config.utility.clone()),
        calls: AtomicUsize::new(0),
    });
    let utility = UtilityEvaluator::from_coefficients(&config.utility).with_moves(counter.clone());
    (model_with(config, utility), counter)
}

// ── Stage 2: candidate cap ───────────────────────────────────────────────────

#[test]
fn large_pool_scores_at_most_the_cap() {
    let mut repo = world(&[1]);
    for id in 1..=500 {
        dwelling(&mut repo, id, 1, 2, 900.0, 0.0);
    }
    let hh = household(&mut repo, 45_000.0, None);

    let (mut model, counter) = counting_model(SimConfig::default_test());
    model.prepare_year(YEAR, &mut repo, &mut IssueTracker::new()).unwrap();
    let profile = model.profile(&repo, hh).unwrap();

    let mut rng = SubsystemRng::new(5, 5);
    let mut total = 0;
    const SEARCHES: usize = 40;
    for _ in 0..SEARCHES {
        counter.calls.store(0, Ordering::Relaxed);
        model.select_dwelling(&repo, &profile, 1, &mut rng).unwrap();
        let scored = counter.calls.load(Ordering::Relaxed);
        assert!(scored <= 20, "scored {scored} candidates, cap is 20");
        total += scored;
    }
    let mean = total as f64 / SEARCHES as f64;
    assert!(mean >= 15.0, "subsample should stay close to the cap, mean was {mean:.1}");
}

#[test]
fn small_pool_scores_every_candidate() {
    let mut repo = world(&[1]);
    for id in 1..=12 {
        dwelling(&mut repo, id, 1, 3, 1_100.0, 0.0);
    }
    let hh = household(&mut repo, 45_000.0, None);

    let (mut model, counter) = counting_model(SimConfig::default_test());
    model.prepare_year(YEAR, &mut repo, &mut IssueTracker::new()).unwrap();
    let profile = model.profile(&repo, hh).unwrap();

    let mut rng = SubsystemRng::new(6, 6);
    for _ in 0..10 {
        counter.calls.store(0, Ordering::Relaxed);
        let chosen = model.select_dwelling(&repo, &profile, 1, &mut rng).unwrap();
        assert!(chosen.is_some());
        assert_eq!(counter.calls.load(Ordering::Relaxed), 12);
    }
}

#[test]
fn capped_subsample_is_neutral_to_dwelling_order() {
    let mut repo = world(&[1]);
    for id in 1..=500 {
        dwelling(&mut repo, id, 1, 2, 900.0, 0.0);
    }
    let hh = household(&mut repo, 45_000.0, None);

    let config = SimConfig::default_test();
    let utility = UtilityEvaluator::from_coefficients(&config.utility).with_moves(Arc::new(FlatMoves));
    let mut model = model_with(config, utility);
    model.prepare_year(YEAR, &mut repo, &mut IssueTracker::new()).unwrap();
    let profile = model.profile(&repo, hh).unwrap();

    let mut rng = SubsystemRng::new(31, 4);
    let (mut first, mut last) = (0, 0);
    for _ in 0..10_000 {
        match model.select_dwelling(&repo, &profile, 1, &mut rng).unwrap() {
            Some(id) if id <= 100 => first += 1,
            Some(id) if id > 400 => last += 1,
            Some(_) => {}
            None => panic!("search over 500 vacancies found nothing"),
        }
    }
    // Each block of 100 should take about 2000 of the 10000 picks.
    let gap = (first as i64 - last as i64).abs();
    assert!(gap < 300, "first-100 chosen {first}, last-100 chosen {last}");
}

#[test]
fn restricted_dwellings_exclude_high_incomes() {
    let mut repo = world(&[1]);
    for id in 1..=5 {
        dwelling(&mut repo, id, 1, 2, 700.0, 0.5);
    }
    let hh = household(&mut repo, 150_000.0, None);

    let mut model = model(SimConfig::default_test());
    model.prepare_year(YEAR, &mut repo, &mut IssueTracker::new()).unwrap();
    let profile = model.profile(&repo, hh).unwrap();

    assert!(model.eligible_vacancies(&repo, &profile, 1).is_empty());
    let mut rng = SubsystemRng::new(1, 1);
    assert_eq!(model.select_dwelling(&repo, &profile, 1, &mut rng).unwrap(), None);
}

// ── Two-stage preference ─────────────────────────────────────────────────────

#[test]
fn better_dwelling_is_chosen_more_often() {
    let mut repo = world(&[1]);
    dwelling(&mut repo, 1, 1, 3, 500.0, 0.0); // A
    dwelling(&mut repo, 2, 1, 4, 800.0, 0.0); // B
    dwelling(&mut repo, 3, 1, 4, 600.0, 0.0);
    household(&mut repo, 60_000.0, Some(3));
    let hh = household(&mut repo, 150_000.0, None);

    let mut config = SimConfig::default_test();
    config.race_relevance_in_zone = 0.0;
    let mut model = model(config);
    model.prepare_year(YEAR, &mut repo, &mut IssueTracker::new()).unwrap();
    let profile = model.profile(&repo, hh).unwrap();
    assert_eq!(profile.income_category, 4);

    let mut rng = SubsystemRng::new(77, 2);
    let mut counts: BTreeMap<DwellingId, usize> = BTreeMap::new();
    for _ in 0..2_000 {
        match model.search(&repo, &profile, &mut rng).unwrap() {
            SearchOutcome::Found(d) => *counts.entry(d).or_default() += 1,
            other => panic!("search failed: {other:?}"),
        }
    }

    assert!(counts.keys().all(|d| *d == 1 || *d == 2), "unexpected choice: {counts:?}");
    let a = counts.get(&1).copied().unwrap_or(0);
    let b = counts.get(&2).copied().unwrap_or(0);
    assert!(b > a, "B (quality 4) should win more often than A: A={a} B={b}");
}

#[test]
fn same_race_zone_wins_when_race_dominates() {
    let mut repo = world(&[1]);
    add_zone(&mut repo, 11, 1);
    dwelling_in_zone(&mut repo, 1, 10, 3, 900.0, 0.0);
    dwelling_in_zone(&mut repo, 2, 11, 3, 900.0, 0.0);
    // Zone 10 is all White; zone 11 is half White.
    for (id, zone, race) in [(3, 10, Race::White), (4, 10, Race::White), (5, 11, Race::White), (6, 11, Race::Black)] {
        dwelling_in_zone(&mut repo, id, zone, 3, 900.0, 0.0);
        household_of(&mut repo, 50_000.0, race, Some(id));
    }
    let hh = household_of(&mut repo, 50_000.0, Race::White, None);

    let mut config = SimConfig::default_test();
    config.race_relevance_in_zone = 1.0;
    let mut model = model(config);
    model.prepare_year(YEAR, &mut repo, &mut IssueTracker::new()).unwrap();
    let profile = model.profile(&repo, hh).unwrap();

    let mut rng = SubsystemRng::new(13, 3);
    let mut counts: BTreeMap<DwellingId, usize> = BTreeMap::new();
    for _ in 0..4_000 {
        let chosen = model.select_dwelling(&repo, &profile, 1, &mut rng).unwrap().unwrap();
        *counts.entry(chosen).or_default() += 1;
    }
    let all_white = counts.get(&1).copied().unwrap_or(0);
    let mixed = counts.get(&2).copied().unwrap_or(0);
    assert_eq!(all_white + mixed, 4_000);
    assert!(all_white > mixed, "all-White zone {all_white}, mixed zone {mixed}");
}

// ── Stage 1: commute and normalizers ─────────────────────────────────────────

fn flat_region_model(config: SimConfig, travel: ZoneTravelTimes) -> HouseholdRelocationModel {
    let utility = UtilityEvaluator::from_coefficients(&config.utility).with_region(Arc::new(FlatRegions(2.0)));
    HouseholdRelocationModel::new(config, utility, Arc::new(travel))
}

fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-9, "expected {expected}, got {actual}");
}

#[test]
fn commute_time_favours_the_region_near_work() {
    let mut repo = world(&[1, 2]);
    dwelling(&mut repo, 1, 1, 2, 900.0, 0.0);
    dwelling(&mut repo, 2, 2, 2, 900.0, 0.0);
    repo.add_job(Job { id: 1, zone: zone_of(1), worker: None }).unwrap();
    let worker = household(&mut repo, 50_000.0, None);
    let person = repo.household(worker).unwrap().members[0];
    repo.assign_job(person, 1).unwrap();
    let idle = household(&mut repo, 50_000.0, None);

    let mut travel = ZoneTravelTimes::new(20.0, 0.02);
    travel.set(zone_of(2), zone_of(1), 60.0);
    let mut config = SimConfig::default_test();
    config.region_normalizer = RegionNormalizer::None;
    let mut model = flat_region_model(config, travel);
    model.prepare_year(YEAR, &mut repo, &mut IssueTracker::new()).unwrap();

    // Region 1 holds the job zone (5 intrazonal minutes); region 2 is 60 minutes away.
    let working = model.region_utilities(&repo, &model.profile(&repo, worker).unwrap()).unwrap();
    assert_close(working[&1], 2.0 * (-0.02_f64 * 5.0).exp());
    assert_close(working[&2], 2.0 * (-0.02_f64 * 60.0).exp());
    assert!(working[&1] > working[&2]);

    // No workers: the commute factor is 1 everywhere.
    let at_home = model.region_utilities(&repo, &model.profile(&repo, idle).unwrap()).unwrap();
    assert_close(at_home[&1], 2.0);
    assert_close(at_home[&2], 2.0);
}

#[test]
fn each_normalizer_scales_by_its_own_measure() {
    // Region 1: 4 dwellings, 3 vacant, 1 person. Region 2: 3 dwellings, 1 vacant, 2 persons.
    let build = |normalizer: RegionNormalizer| {
        let mut repo = world(&[1, 2]);
        for id in 1..=4 {
            dwelling(&mut repo, id, 1, 2, 900.0, 0.0);
        }
        for id in 5..=7 {
            dwelling(&mut repo, id, 2, 2, 900.0, 0.0);
        }
        household(&mut repo, 50_000.0, Some(1));
        household(&mut repo, 50_000.0, Some(5));
        household(&mut repo, 50_000.0, Some(6));
        let hh = household(&mut repo, 50_000.0, None);

        let mut config = SimConfig::default_test();
        config.region_normalizer = normalizer;
        config.vacancy_dampening = 2.0;
        let mut model = flat_region_model(config, ZoneTravelTimes::new(20.0, 0.02));
        model.prepare_year(YEAR, &mut repo, &mut IssueTracker::new()).unwrap();
        let profile = model.profile(&repo, hh).unwrap();
        model.region_utilities(&repo, &profile).unwrap()
    };

    let vacant = build(RegionNormalizer::VacantDwellings);
    assert_close(vacant[&1], 6.0);
    assert_close(vacant[&2], 2.0);

    let share = build(RegionNormalizer::VacancyShare);
    assert_close(share[&1], 2.0 * 3.0 / 4.0);
    assert_close(share[&2], 2.0 * 1.0 / 4.0);

    let dampened = build(RegionNormalizer::DampenedVacancyRate);
    assert_close(dampened[&1], 2.0 * (1.0 - (-2.0_f64 * 3.0 / 4.0).exp()));
    assert_close(dampened[&2], 2.0 * (1.0 - (-2.0_f64 * 1.0 / 3.0).exp()));

    let population = build(RegionNormalizer::Population);
    assert_close(population[&1], 2.0);
    assert_close(population[&2], 4.0);

    let none = build(RegionNormalizer::None);
    assert_close(none[&1], 2.0);
    assert_close(none[&2], 2.0);
}

#[test]
fn no_vacancies_means_no_region() {
    let mut repo = world(&[1, 2]);
    dwelling(&mut repo, 1, 1, 2, 900.0, 0.0);
    dwelling(&mut repo, 2, 2, 2, 900.0, 0.0);
    household(&mut repo, 40_000.0, Some(1));
    household(&mut repo, 40_000.0, Some(2));
    let hh = household(&mut repo, 40_000.0, None);

    let mut model = model(SimConfig::default_test());
    model.prepare_year(YEAR, &mut repo, &mut IssueTracker::new()).unwrap();
    let profile = model.profile(&repo, hh).unwrap();

    let utilities = model.region_utilities(&repo, &profile).unwrap();
    assert_eq!(utilities.values().copied().collect::<Vec<_>>(), vec![0.0, 0.0]);

    for seed in 0..20 {
        let mut rng = SubsystemRng::new(seed, 0);
        assert_eq!(model.select_region(&repo, &profile, &mut rng).unwrap(), None);
        assert_eq!(model.search(&repo, &profile, &mut rng).unwrap(), SearchOutcome::NoRegion);
    }
}

#[test]
fn zero_region_utility_fails_even_with_vacancies() {
    let mut repo = world(&[1, 2]);
    dwelling(&mut repo, 1, 1, 2, 900.0, 0.0);
    dwelling(&mut repo, 2, 2, 2, 900.0, 0.0);
    let hh = household(&mut repo, 40_000.0, None);

    let mut config = SimConfig::default_test();
    config.region_normalizer = RegionNormalizer::None;
    let utility = UtilityEvaluator::from_coefficients(&config.utility).with_region(Arc::new(ZeroRegions));
    let mut model = model_with(config, utility);
    model.prepare_year(YEAR, &mut repo, &mut IssueTracker::new()).unwrap();
    let profile = model.profile(&repo, hh).unwrap();

    let mut rng = SubsystemRng::new(3, 0);
    assert_eq!(model.select_region(&repo, &profile, &mut rng).unwrap(), None);
}

// ── Move-or-stay ─────────────────────────────────────────────────────────────

#[test]
fn decisions_are_reproducible() {
    let mut repo = FixtureBuilder::new(21).build().unwrap();
    let mut model = model(SimConfig::default_test());
    assert_eq!(model.prepared_year(), None);
    model.prepare_year(YEAR, &mut repo, &mut IssueTracker::new()).unwrap();
    assert_eq!(model.prepared_year(), Some(YEAR));

    let decide_all = |seed: u64| -> Vec<MoveDecision> {
        let mut rng = SubsystemRng::new(seed, 9);
        repo.household_ids()
            .into_iter()
            .filter_map(|id| model.profile(&repo, id))
            .map(|p| model.decide(&repo, &p, &mut rng).unwrap())
            .collect()
    };

    let first = decide_all(1234);
    assert_eq!(first, decide_all(1234));
    assert!(first.iter().any(|d| *d == MoveDecision::Stay));
}

#[test]
fn income_restriction_forces_a_move() {
    let mut repo = world(&[1]);
    dwelling(&mut repo, 1, 1, 2, 600.0, 0.8);
    dwelling(&mut repo, 2, 1, 2, 900.0, 0.0);
    dwelling(&mut repo, 3, 1, 2, 900.0, 0.0);
    dwelling(&mut repo, 4, 1, 2, 600.0, 0.8);
    let rich = household(&mut repo, 200_000.0, Some(1));
    household(&mut repo, 30_000.0, Some(2));
    household(&mut repo, 30_000.0, Some(3));
    let poor = household(&mut repo, 20_000.0, Some(4));
    let homeless = household(&mut repo, 30_000.0, None);

    let mut model = model(SimConfig::default_test());
    model.prepare_year(YEAR, &mut repo, &mut IssueTracker::new()).unwrap();

    for seed in 0..10 {
        let mut rng = SubsystemRng::new(seed, 1);
        let rich_profile = model.profile(&repo, rich).unwrap();
        assert_eq!(model.decide(&repo, &rich_profile, &mut rng).unwrap(), MoveDecision::MustMove);

        let poor_profile = model.profile(&repo, poor).unwrap();
        assert_ne!(model.decide(&repo, &poor_profile, &mut rng).unwrap(), MoveDecision::MustMove);

        let homeless_profile = model.profile(&repo, homeless).unwrap();
        assert_eq!(model.decide(&repo, &homeless_profile, &mut rng).unwrap(), MoveDecision::MustMove);
    }
}

#[test]
fn relocation_event_moves_the_household() {
    let mut repo = world(&[1]);
    dwelling(&mut repo, 1, 1, 1, 1_400.0, 0.0);
    for id in 2..=6 {
        dwelling(&mut repo, id, 1, 4, 900.0, 0.0);
    }
    let hh = household(&mut repo, 50_000.0, Some(1));

    let config = SimConfig::default_test();
    let utility = UtilityEvaluator::from_coefficients(&config.utility).with_moves(Arc::new(AlwaysMove));
    let mut model = model_with(config, utility);
    let mut issues = IssueTracker::new();
    model.prepare_year(YEAR, &mut repo, &mut issues).unwrap();

    let mut rng = SubsystemRng::new(8, 2);
    let outcome = model.handle(&Event::new(EventType::Relocation, hh, YEAR), &mut repo, &mut issues, &mut rng)
        .unwrap();

    let EventOutcome::Moved { from, to } = outcome else {
        panic!("expected a move, got {outcome:?}");
    };
    assert_eq!(from, Some(1));
    assert!((2..=6).contains(&to));
    assert_eq!(repo.household(hh).unwrap().dwelling, Some(to));
    assert!(repo.dwelling(1).unwrap().is_vacant());
    repo.verify_consistency().unwrap();
}

#[test]
fn failed_relocation_search_is_counted() {
    let mut repo = world(&[1]);
    dwelling(&mut repo, 1, 1, 2, 900.0, 0.0);
    let hh = household(&mut repo, 50_000.0, Some(1));

    let config = SimConfig::default_test();
    let utility = UtilityEvaluator::from_coefficients(&config.utility).with_moves(Arc::new(AlwaysMove));
    let mut model = model_with(config, utility);
    let mut issues = IssueTracker::new();
    model.prepare_year(YEAR, &mut repo, &mut issues).unwrap();

    let mut rng = SubsystemRng::new(1, 2);
    let outcome = model.handle(&Event::new(EventType::Relocation, hh, YEAR), &mut repo, &mut issues, &mut rng)
        .unwrap();
    assert_eq!(outcome, EventOutcome::NoOutcome);
    assert_eq!(issues.count(Issue::FailedSearchForRelocation), 1);
    assert_eq!(repo.household(hh).unwrap().dwelling, Some(1));
}

#[test]
fn domain_errors_abandon_the_attempt() {
    let mut repo = world(&[1]);
    dwelling(&mut repo, 1, 1, 2, 900.0, 0.0);
    dwelling(&mut repo, 2, 1, 3, 900.0, 0.0);
    let hh = household(&mut repo, 150_000.0, Some(1));

    // Only two income categories have dwelling weights; this household is category 4.
    let mut config = SimConfig::default_test();
    config.utility.dwelling.truncate(2);
    let mut model = model(config);
    let mut issues = IssueTracker::new();
    model.prepare_year(YEAR, &mut repo, &mut issues).unwrap();
    assert!(issues.count(Issue::DomainInputError) > 0);

    issues.reset(YEAR);
    let mut rng = SubsystemRng::new(2, 2);
    let outcome = model.handle(&Event::new(EventType::Relocation, hh, YEAR), &mut repo, &mut issues, &mut rng)
        .unwrap();

    assert_eq!(outcome, EventOutcome::NoOutcome);
    assert_eq!(issues.count(Issue::DomainInputError), 1);
    assert_eq!(issues.count(Issue::FailedSearchForRelocation), 1);
    assert_eq!(repo.household(hh).unwrap().dwelling, Some(1));
}

#[test]
fn stale_relocation_event_is_skipped() {
    let mut repo = world(&[1]);
    dwelling(&mut repo, 1, 1, 2, 900.0, 0.0);
    let mut model = model(SimConfig::default_test());
    let mut issues = IssueTracker::new();
    model.prepare_year(YEAR, &mut repo, &mut issues).unwrap();

    let mut rng = SubsystemRng::new(0, 0);
    let outcome = model.handle(&Event::new(EventType::Relocation, 999, YEAR), &mut repo, &mut issues, &mut rng)
        .unwrap();
    assert_eq!(outcome, EventOutcome::Skipped);
    assert_eq!(issues.count(Issue::StaleEvent), 1);
}

// ── Subsidy ──────────────────────────────────────────────────────────────────

#[test]
fn subsidy_raises_utility_for_low_incomes() {
    let build = |subsidy: bool| {
        let mut repo = world(&[1]);
        dwelling(&mut repo, 1, 1, 2, 1_500.0, 0.0);
        for id in 2..=4 {
            dwelling(&mut repo, id, 1, 2, 900.0, 0.0);
            household(&mut repo, 50_000.0, Some(id));
        }
        let hh = household(&mut repo, 12_000.0, None);
        let mut config = SimConfig::default_test();
        config.provide_low_income_subsidy = subsidy;
        let mut model = model(config);
        model.prepare_year(YEAR, &mut repo, &mut IssueTracker::new()).unwrap();
        let profile = model.profile(&repo, hh).unwrap();
        model.dwelling_utility(&repo, &profile, repo.dwelling(1).unwrap()).unwrap()
    };

    let without = build(false);
    let with = build(true);
    assert!(with > without, "subsidized utility {with} should exceed {without}");
}

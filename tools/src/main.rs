//! relocation-runner: headless driver for the household relocation engine.
//!
//! Usage:
//!   relocation-runner --seed 12345 --years 10 --households 2000 --db run.db
//!   relocation-runner --config scenario.json --years 5

use std::env;
use std::sync::Arc;

use anyhow::Result;
use relocation_core::{
    config::SimConfig,
    engine::{RelocationEngine, YearReport},
    fixtures::FixtureBuilder,
    migration::MigrationController,
    store::SimStore,
};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let years = parse_arg(&args, "--years", 10u32);
    let households = parse_arg(&args, "--households", 1_000u32);
    let db = flag_value(&args, "--db").unwrap_or(":memory:");

    let mut config = match flag_value(&args, "--config") {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default_test(),
    };
    config.seed = parse_arg(&args, "--seed", config.seed);
    config.validate()?;

    println!("Household relocation runner");
    println!("  seed:        {}", config.seed);
    println!("  start year:  {}", config.start_year);
    println!("  years:       {years}");
    println!("  households:  {households}");
    println!("  control:     {:?}", config.population_control_method);
    println!("  db:          {db}");
    println!();

    let store = SimStore::open(db)?;
    store.migrate()?;

    let fixtures = FixtureBuilder::new(config.seed)
        .start_year(config.start_year)
        .target_households(households);
    let repo = fixtures.build()?;
    let run_id = format!("run-{}-{}", config.seed, uuid::Uuid::new_v4());

    let mut engine = RelocationEngine::build(
        run_id.clone(),
        config,
        repo,
        Arc::new(fixtures.travel_times()),
        store,
    )?;
    log::info!("runner: run {run_id} built");

    print_header();
    let mut reports = Vec::with_capacity(years as usize);
    for _ in 0..years {
        let report = engine.run_year()?;
        print_row(&report);
        reports.push(report);
    }

    print_summary(&engine, &run_id, &reports);
    Ok(())
}

fn print_header() {
    println!(
        "{:>6} {:>8} {:>10} {:>9} {:>7} {:>7} {:>8} {:>8} {:>7}",
        "year", "events", "population", "vacancies", "moved", "stayed", "admitted", "departed", "issues",
    );
}

fn print_row(r: &YearReport) {
    println!(
        "{:>6} {:>8} {:>10} {:>9} {:>7} {:>7} {:>8} {:>8} {:>7}",
        r.year,
        r.events,
        r.population,
        r.vacancies,
        r.outcome("moved"),
        r.outcome("stayed"),
        r.outcome("admitted"),
        r.outcome("departed"),
        r.issues.total,
    );
}

fn print_summary(engine: &RelocationEngine, run_id: &str, reports: &[YearReport]) {
    println!();
    println!("=== RUN SUMMARY ===");
    println!("  run_id:      {run_id}");
    println!("  years run:   {}", reports.len());
    println!("  households:  {}", engine.repo().household_count());
    println!("  population:  {}", engine.repo().population());
    println!("  vacancies:   {}", engine.repo().total_vacancies());

    if let Some(plan) = engine.handler::<MigrationController>().and_then(|m| m.last_plan()) {
        println!(
            "  last plan:   year {} in={} out={}",
            plan.year, plan.required.inmigrants, plan.required.outmigrants,
        );
    }

    println!();
    println!("=== ISSUES ===");
    for r in reports {
        if r.issues.total == 0 {
            println!("  {}: none", r.year);
            continue;
        }
        let parts: Vec<String> = r.issues.counts.iter().map(|(k, v)| format!("{k}={v}")).collect();
        println!("  {}: {}", r.year, parts.join(", "));
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

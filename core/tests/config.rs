//! Configuration parsing and validation.

use relocation_core::{
    config::{PopulationControlMethod, RegionNormalizer, SimConfig},
    SimError,
};

fn is_config_error<T: std::fmt::Debug>(result: Result<T, SimError>) -> bool {
    matches!(result, Err(SimError::Configuration { .. }))
}

#[test]
fn minimal_json_takes_defaults() {
    let config = SimConfig::from_json_str(
        r#"{ "seed": 7, "startYear": 2015, "populationControlMethod": "growthRate", "growthRate": 0.02 }"#,
    ).unwrap();

    assert_eq!(config.seed, 7);
    assert_eq!(config.population_control_method, PopulationControlMethod::GrowthRate);
    assert_eq!(config.max_dwelling_candidates_per_search, 20);
    assert_eq!(config.region_normalizer, RegionNormalizer::VacantDwellings);
    assert!(config.events.household_moves.enabled);
    assert!(!config.events.demography.enabled);
    assert!(!config.provide_low_income_subsidy);
    assert_eq!(config.income_categories(), 5);
}

#[test]
fn target_mode_parses_yearly_targets() {
    let config = SimConfig::from_json_str(r#"{
        "seed": 1,
        "startYear": 2010,
        "populationControlMethod": "populationTarget",
        "populationTargets": { "2010": 1200, "2011": 1250 },
        "regionNormalizer": "dampenedVacancyRate"
    }"#).unwrap();

    assert_eq!(config.population_targets.get(&2011), Some(&1250));
    assert_eq!(config.region_normalizer, RegionNormalizer::DampenedVacancyRate);
}

#[test]
fn unknown_control_method_is_a_configuration_error() {
    let result = SimConfig::from_json_str(
        r#"{ "seed": 1, "startYear": 2010, "populationControlMethod": "zeroGrowth" }"#,
    );
    assert!(is_config_error(result));
}

#[test]
fn invalid_settings_are_rejected() {
    let mut config = SimConfig::default_test();
    config.race_relevance_in_zone = 1.5;
    assert!(is_config_error(config.validate()));

    let mut config = SimConfig::default_test();
    config.max_dwelling_candidates_per_search = 0;
    assert!(is_config_error(config.validate()));

    let mut config = SimConfig::default_test();
    config.income_brackets = vec![40_000.0, 20_000.0];
    assert!(is_config_error(config.validate()));

    let mut config = SimConfig::default_test();
    config.population_control_method = PopulationControlMethod::FixedMigrationTable;
    assert!(is_config_error(config.validate()));

    let mut config = SimConfig::default_test();
    config.population_control_method = PopulationControlMethod::PopulationTarget;
    assert!(is_config_error(config.validate()));

    let mut config = SimConfig::default_test();
    config.growth_rate = -1.0;
    assert!(is_config_error(config.validate()));

    SimConfig::default_test().validate().unwrap();
}

#[test]
fn incomes_fall_into_brackets() {
    let config = SimConfig::default_test();
    assert_eq!(config.income_category(0.0), 0);
    assert_eq!(config.income_category(19_999.0), 0);
    assert_eq!(config.income_category(20_000.0), 1);
    assert_eq!(config.income_category(75_000.0), 3);
    assert_eq!(config.income_category(250_000.0), 4);
}

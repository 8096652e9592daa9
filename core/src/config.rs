use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    error::{SimError, SimResult},
    event::{EventCategory, EventType},
    types::Year,
};

// ── Population control ─────────────────────────────────────────────

/// How exogenous migration is sized each year. Exactly one is active.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PopulationControlMethod {
    /// Explicit in/out person counts per year.
    FixedMigrationTable,
    /// In/out count is the gap between a yearly target and the current population.
    PopulationTarget,
    /// Target = base * (1 + rate)^(year - start).
    GrowthRate,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MigrationCounts {
    pub inmigrants:  u64,
    pub outmigrants: u64,
}

// ── Region choice ──────────────────────────────────────────────────

/// Scaling applied to raw region utilities before the region draw.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RegionNormalizer {
    VacantDwellings,
    VacancyShare,
    DampenedVacancyRate,
    Population,
    None,
}

// ── Event flags ────────────────────────────────────────────────────

/// Demography handlers live outside this core; every flag defaults off.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemographyFlags {
    pub enabled: bool,
    pub births:  bool,
    pub deaths:  bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseholdMoveFlags {
    pub enabled:      bool,
    pub relocation:   bool,
    pub inmigration:  bool,
    pub outmigration: bool,
}

impl Default for HouseholdMoveFlags {
    fn default() -> Self {
        Self { enabled: true, relocation: true, inmigration: true, outmigration: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevelopmentFlags {
    pub enabled:    bool,
    pub demolition: bool,
    pub renovation: bool,
}

impl Default for DevelopmentFlags {
    fn default() -> Self {
        Self { enabled: true, demolition: true, renovation: true }
    }
}

/// Hierarchical enable flags. A category flag gates its finer flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFlags {
    #[serde(default)]
    pub demography:           DemographyFlags,
    #[serde(default)]
    pub household_moves:      HouseholdMoveFlags,
    #[serde(default)]
    pub dwelling_development: DevelopmentFlags,
}

impl EventFlags {
    pub fn category(&self, category: EventCategory) -> bool {
        match category {
            EventCategory::Demography          => self.demography.enabled,
            EventCategory::HouseholdMoves      => self.household_moves.enabled,
            EventCategory::DwellingDevelopment => self.dwelling_development.enabled,
        }
    }

    /// The event's own flag, ignoring its category.
    pub fn own(&self, kind: EventType) -> bool {
        match kind {
            EventType::Birth        => self.demography.births,
            EventType::Death        => self.demography.deaths,
            EventType::Relocation   => self.household_moves.relocation,
            EventType::Inmigration  => self.household_moves.inmigration,
            EventType::Outmigration => self.household_moves.outmigration,
            EventType::Demolition   => self.dwelling_development.demolition,
            EventType::Renovation   => self.dwelling_development.renovation,
        }
    }
}

// ── Utility coefficients ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionCoefficients {
    pub constant:      f64,
    /// Applied to the normalized regional price (0..=1).
    pub price:         f64,
    /// Applied to the normalized regional accessibility (0..=1).
    pub accessibility: f64,
    /// Applied to the household race's share of the regional population.
    pub share:         f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DwellingWeights {
    pub price:   f64,
    pub quality: f64,
    pub size:    f64,
    pub auto:    f64,
    pub transit: f64,
    pub school:  f64,
    pub crime:   f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilityCoefficients {
    pub move_intercept:       f64,
    /// How strongly (satisfaction - current utility) pushes toward moving.
    pub move_slope:           f64,
    /// One row per income category.
    pub region:               Vec<RegionCoefficients>,
    /// One row per income category.
    pub dwelling:             Vec<DwellingWeights>,
    /// Monthly price at which price utility reaches zero.
    pub price_ceiling:        f64,
    pub max_quality:          u8,
    /// Normalizer for auto/transit accessibility terms.
    pub max_accessibility:    f64,
    pub dwelling_choice_beta: f64,
    /// Per-quality yearly demolition probability, index = quality - 1.
    pub demolition_by_quality: Vec<f64>,
    /// Per-quality [deteriorate, unchanged, improve] probabilities, index = quality - 1.
    pub renovation_by_quality: Vec<[f64; 3]>,
}

impl Default for UtilityCoefficients {
    fn default() -> Self {
        let region_row = |price: f64| RegionCoefficients {
            constant:      0.0,
            price,
            accessibility: 1.0,
            share:         0.5,
        };
        let dwelling_row = |price: f64, quality: f64| DwellingWeights {
            price,
            quality,
            size:    0.15,
            auto:    0.10,
            transit: 0.05,
            school:  0.10,
            crime:   0.10,
        };
        Self {
            move_intercept: -2.0,
            move_slope:     6.0,
            region: vec![
                region_row(-2.0),
                region_row(-1.5),
                region_row(-1.0),
                region_row(-0.6),
                region_row(-0.3),
            ],
            dwelling: vec![
                dwelling_row(0.40, 0.10),
                dwelling_row(0.35, 0.15),
                dwelling_row(0.30, 0.20),
                dwelling_row(0.20, 0.30),
                dwelling_row(0.10, 0.40),
            ],
            price_ceiling:        3_000.0,
            max_quality:          4,
            max_accessibility:    100.0,
            dwelling_choice_beta: 5.0,
            demolition_by_quality: vec![0.02, 0.005, 0.001, 0.0005],
            renovation_by_quality: vec![
                [0.00, 0.90, 0.10],
                [0.05, 0.88, 0.07],
                [0.07, 0.88, 0.05],
                [0.10, 0.90, 0.00],
            ],
        }
    }
}

// ── Run config ─────────────────────────────────────────────────────

fn default_race_relevance() -> f64 { 0.2 }
fn default_low_income_share() -> f64 { 0.8 }
fn default_max_rent_share() -> f64 { 0.3 }
fn default_max_candidates() -> usize { 20 }
fn default_normalizer() -> RegionNormalizer { RegionNormalizer::VacantDwellings }
fn default_vacancy_dampening() -> f64 { 20.0 }
fn default_income_brackets() -> Vec<f64> { vec![20_000.0, 40_000.0, 60_000.0, 100_000.0] }

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimConfig {
    pub seed:       u64,
    pub start_year: Year,

    pub population_control_method: PopulationControlMethod,
    #[serde(default)]
    pub migration_table:    BTreeMap<Year, MigrationCounts>,
    #[serde(default)]
    pub population_targets: BTreeMap<Year, u64>,
    #[serde(default)]
    pub growth_rate:        f64,
    /// Population the growth rate compounds from. Defaults to the
    /// population observed when the first year is planned.
    #[serde(default)]
    pub base_population:    Option<u64>,

    #[serde(default)]
    pub events: EventFlags,

    /// Blending exponent α between dwelling utility and zonal race share.
    #[serde(default = "default_race_relevance")]
    pub race_relevance_in_zone: f64,
    #[serde(default)]
    pub provide_low_income_subsidy: bool,
    #[serde(default = "default_low_income_share")]
    pub low_income_share_of_median: f64,
    #[serde(default = "default_max_rent_share")]
    pub max_rent_share_of_income: f64,
    #[serde(default = "default_max_candidates")]
    pub max_dwelling_candidates_per_search: usize,
    #[serde(default = "default_normalizer")]
    pub region_normalizer: RegionNormalizer,
    #[serde(default = "default_vacancy_dampening")]
    pub vacancy_dampening: f64,

    /// Upper bounds of every income category but the last.
    #[serde(default = "default_income_brackets")]
    pub income_brackets: Vec<f64>,
    #[serde(default)]
    pub vacancy_storage_capacity: Option<usize>,

    #[serde(default)]
    pub utility: UtilityCoefficients,
}

impl SimConfig {
    /// Load from a JSON file. Any problem here is fatal at startup.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config = Self::from_json_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {path}: {e}"))?;
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> SimResult<Self> {
        let config: SimConfig = serde_json::from_str(content)
            .map_err(|e| SimError::config(format!("unreadable configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> SimResult<()> {
        if !(0.0..=1.0).contains(&self.race_relevance_in_zone) {
            return Err(SimError::config(format!(
                "raceRelevanceInZone must lie in [0, 1], got {}", self.race_relevance_in_zone
            )));
        }
        if self.max_dwelling_candidates_per_search == 0 {
            return Err(SimError::config("maxDwellingCandidatesPerSearch must be positive"));
        }
        if self.income_brackets.is_empty() {
            return Err(SimError::config("incomeBrackets must not be empty"));
        }
        if self.income_brackets.windows(2).any(|w| w[0] >= w[1]) {
            return Err(SimError::config("incomeBrackets must be strictly increasing"));
        }
        match self.population_control_method {
            PopulationControlMethod::FixedMigrationTable if self.migration_table.is_empty() => {
                return Err(SimError::config("fixedMigrationTable requires migrationTable"));
            }
            PopulationControlMethod::PopulationTarget if self.population_targets.is_empty() => {
                return Err(SimError::config("populationTarget requires populationTargets"));
            }
            PopulationControlMethod::GrowthRate if !self.growth_rate.is_finite() || self.growth_rate <= -1.0 => {
                return Err(SimError::config(format!("growthRate {} is not usable", self.growth_rate)));
            }
            _ => {}
        }
        if self.utility.max_quality == 0 {
            return Err(SimError::config("utility.maxQuality must be positive"));
        }
        Ok(())
    }

    pub fn income_categories(&self) -> usize {
        self.income_brackets.len() + 1
    }

    /// Discretize an annual income into its bracket index.
    pub fn income_category(&self, income: f64) -> usize {
        self.income_brackets
            .iter()
            .position(|upper| income < *upper)
            .unwrap_or(self.income_brackets.len())
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        Self {
            seed:       42,
            start_year: 2010,
            population_control_method: PopulationControlMethod::GrowthRate,
            migration_table:    BTreeMap::new(),
            population_targets: BTreeMap::new(),
            growth_rate:        0.0,
            base_population:    None,
            events: EventFlags::default(),
            race_relevance_in_zone:     default_race_relevance(),
            provide_low_income_subsidy: false,
            low_income_share_of_median: default_low_income_share(),
            max_rent_share_of_income:   default_max_rent_share(),
            max_dwelling_candidates_per_search: default_max_candidates(),
            region_normalizer:  default_normalizer(),
            vacancy_dampening:  default_vacancy_dampening(),
            income_brackets:    default_income_brackets(),
            vacancy_storage_capacity: None,
            utility: UtilityCoefficients::default(),
        }
    }
}

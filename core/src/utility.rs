//! Utility capability: the behavioral formulas behind every choice.
//!
//! RULE: Every strategy is a pure function of its inputs. No hidden state,
//! no randomness. Out-of-range categorical inputs come back as
//! `DomainInputError`, never as a panic.
//!
//! The engine only sees the traits. `CoefficientUtility` is the data-driven
//! implementation configured from `UtilityCoefficients`; deployments may
//! swap any single strategy through the `UtilityEvaluator` builders.

use std::sync::Arc;

use crate::{
    config::UtilityCoefficients,
    error::{DomainInputError, UtilityResult},
    model::{HouseholdType, Race},
};

// ── Inputs ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct RegionUtilityInputs {
    pub income_category:          usize,
    pub race:                     Race,
    /// Regional price relative to the most expensive region, 0..=1.
    pub normalized_price:         f64,
    /// Regional accessibility relative to the best region, 0..=1.
    pub normalized_accessibility: f64,
    /// Share of the household's race in the regional population.
    pub race_share:               f64,
}

#[derive(Debug, Clone, Copy)]
pub struct DwellingUtilityInputs {
    pub household_type:        HouseholdType,
    /// Monthly price as experienced by the household (after any subsidy).
    pub price:                 f64,
    pub quality:               u8,
    pub bedrooms:              u8,
    pub auto_accessibility:    f64,
    pub transit_accessibility: f64,
    pub school_quality:        f64,
    pub crime_rate:            f64,
}

// ── Strategies ───────────────────────────────────────────────────────────────

pub trait MovesStrategy: Send + Sync {
    /// Probability of deciding to move, from the household type's average
    /// satisfaction and the utility of the current dwelling.
    fn move_probability(&self, average_satisfaction: f64, current_utility: f64) -> UtilityResult<f64>;

    /// Monotone increasing transform of an adjusted dwelling utility into a
    /// non-negative selection weight.
    fn selection_weight(&self, adjusted_utility: f64) -> UtilityResult<f64>;
}

pub trait RegionUtilityStrategy: Send + Sync {
    /// Non-negative baseline utility of a region before commute and normalizer.
    fn region_utility(&self, inputs: &RegionUtilityInputs) -> UtilityResult<f64>;
}

pub trait DwellingUtilityStrategy: Send + Sync {
    /// Utility of a dwelling for a household type, in 0..=1.
    fn dwelling_utility(&self, inputs: &DwellingUtilityInputs) -> UtilityResult<f64>;
}

pub trait DevelopmentStrategy: Send + Sync {
    fn demolition_probability(&self, quality: u8) -> UtilityResult<f64>;

    /// [deteriorate, unchanged, improve] for a dwelling of this quality.
    fn renovation_probabilities(&self, quality: u8) -> UtilityResult<[f64; 3]>;
}

/// The bundle of strategies injected into the relocation engine.
#[derive(Clone)]
pub struct UtilityEvaluator {
    pub moves:       Arc<dyn MovesStrategy>,
    pub region:      Arc<dyn RegionUtilityStrategy>,
    pub dwelling:    Arc<dyn DwellingUtilityStrategy>,
    pub development: Arc<dyn DevelopmentStrategy>,
}

impl UtilityEvaluator {
    pub fn from_coefficients(coefficients: &UtilityCoefficients) -> Self {
        let formulas = Arc::new(CoefficientUtility::new(coefficients.clone()));
        Self {
            moves:       formulas.clone(),
            region:      formulas.clone(),
            dwelling:    formulas.clone(),
            development: formulas,
        }
    }

    pub fn with_moves(mut self, moves: Arc<dyn MovesStrategy>) -> Self {
        self.moves = moves;
        self
    }

    pub fn with_region(mut self, region: Arc<dyn RegionUtilityStrategy>) -> Self {
        self.region = region;
        self
    }

    pub fn with_dwelling(mut self, dwelling: Arc<dyn DwellingUtilityStrategy>) -> Self {
        self.dwelling = dwelling;
        self
    }

    pub fn with_development(mut self, development: Arc<dyn DevelopmentStrategy>) -> Self {
        self.development = development;
        self
    }
}

// ── Coefficient-table implementation ─────────────────────────────────────────

pub struct CoefficientUtility {
    c: UtilityCoefficients,
}

impl CoefficientUtility {
    pub fn new(coefficients: UtilityCoefficients) -> Self {
        Self { c: coefficients }
    }

    fn quality_index(&self, quality: u8) -> UtilityResult<usize> {
        if quality == 0 || quality > self.c.max_quality {
            return Err(DomainInputError {
                input:  "quality",
                value:  i64::from(quality),
                reason: format!("expected 1..={}", self.c.max_quality),
            });
        }
        Ok(quality as usize - 1)
    }
}

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl MovesStrategy for CoefficientUtility {
    fn move_probability(&self, average_satisfaction: f64, current_utility: f64) -> UtilityResult<f64> {
        let gap = average_satisfaction - current_utility;
        Ok(logistic(self.c.move_intercept + self.c.move_slope * gap))
    }

    fn selection_weight(&self, adjusted_utility: f64) -> UtilityResult<f64> {
        Ok((self.c.dwelling_choice_beta * adjusted_utility).exp())
    }
}

impl RegionUtilityStrategy for CoefficientUtility {
    fn region_utility(&self, inputs: &RegionUtilityInputs) -> UtilityResult<f64> {
        let row = self.c.region.get(inputs.income_category).ok_or_else(|| {
            DomainInputError::out_of_range("income_category", inputs.income_category, self.c.region.len())
        })?;
        let linear = row.constant
            + row.price * inputs.normalized_price
            + row.accessibility * inputs.normalized_accessibility
            + row.share * inputs.race_share;
        Ok(linear.exp())
    }
}

impl DwellingUtilityStrategy for CoefficientUtility {
    fn dwelling_utility(&self, inputs: &DwellingUtilityInputs) -> UtilityResult<f64> {
        let category = inputs.household_type.income_category as usize;
        let w = self.c.dwelling.get(category).ok_or_else(|| {
            DomainInputError::out_of_range("income_category", category, self.c.dwelling.len())
        })?;
        let quality = self.quality_index(inputs.quality)? as f64 + 1.0;

        let ceiling = self.c.price_ceiling.max(1.0);
        let access = self.c.max_accessibility.max(1e-9);
        let needed_bedrooms = f64::from(inputs.household_type.size_bucket.saturating_sub(1).max(1));

        let terms = [
            (w.price,   (1.0 - inputs.price / ceiling).clamp(0.0, 1.0)),
            (w.quality, quality / f64::from(self.c.max_quality)),
            (w.size,    (f64::from(inputs.bedrooms) / needed_bedrooms).min(1.0)),
            (w.auto,    (inputs.auto_accessibility / access).clamp(0.0, 1.0)),
            (w.transit, (inputs.transit_accessibility / access).clamp(0.0, 1.0)),
            (w.school,  inputs.school_quality.clamp(0.0, 1.0)),
            (w.crime,   1.0 - inputs.crime_rate.clamp(0.0, 1.0)),
        ];
        let weight_sum: f64 = terms.iter().map(|(w, _)| w.abs()).sum();
        if weight_sum <= 0.0 {
            return Ok(0.0);
        }
        let score: f64 = terms.iter().map(|(w, u)| w.abs() * u).sum();
        Ok((score / weight_sum).clamp(0.0, 1.0))
    }
}

impl DevelopmentStrategy for CoefficientUtility {
    fn demolition_probability(&self, quality: u8) -> UtilityResult<f64> {
        let index = self.quality_index(quality)?;
        self.c.demolition_by_quality.get(index).copied().ok_or_else(|| {
            DomainInputError::out_of_range("quality", quality as usize, self.c.demolition_by_quality.len() + 1)
        })
    }

    fn renovation_probabilities(&self, quality: u8) -> UtilityResult<[f64; 3]> {
        let index = self.quality_index(quality)?;
        self.c.renovation_by_quality.get(index).copied().ok_or_else(|| {
            DomainInputError::out_of_range("quality", quality as usize, self.c.renovation_by_quality.len() + 1)
        })
    }
}

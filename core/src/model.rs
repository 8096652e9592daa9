//! Entity records held by the repository.

use serde::{Deserialize, Serialize};

use crate::types::{DwellingId, HouseholdId, JobId, PersonId, RegionId, Year, ZoneId};

/// Largest household size bucket; households of this size or more share a type.
pub const MAX_SIZE_BUCKET: usize = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Race {
    White,
    Black,
    Hispanic,
    Other,
}

impl Race {
    pub const ALL: [Race; 4] = [Race::White, Race::Black, Race::Hispanic, Race::Other];

    pub fn index(self) -> usize {
        match self {
            Self::White    => 0,
            Self::Black    => 1,
            Self::Hispanic => 2,
            Self::Other    => 3,
        }
    }
}

/// Household classification keyed by size bucket and income category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HouseholdType {
    /// 1..=MAX_SIZE_BUCKET
    pub size_bucket:     u8,
    pub income_category: u8,
}

impl HouseholdType {
    pub fn classify(size: usize, income_category: usize) -> Self {
        Self {
            size_bucket:     size.clamp(1, MAX_SIZE_BUCKET) as u8,
            income_category: income_category.min(u8::MAX as usize) as u8,
        }
    }

    /// Dense index into per-type vectors.
    pub fn index(self, income_categories: usize) -> usize {
        (self.size_bucket as usize - 1) * income_categories + self.income_category as usize
    }

    pub fn count(income_categories: usize) -> usize {
        MAX_SIZE_BUCKET * income_categories
    }

    /// Inverse of `index`, used to enumerate every type.
    pub fn from_index(index: usize, income_categories: usize) -> Self {
        Self {
            size_bucket:     (index / income_categories + 1) as u8,
            income_category: (index % income_categories) as u8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Household {
    pub id:       HouseholdId,
    /// Ordered member references.
    pub members:  Vec<PersonId>,
    pub dwelling: Option<DwellingId>,
    pub race:     Race,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub id:             PersonId,
    pub household:      HouseholdId,
    /// Annual income.
    pub income:         f64,
    pub job:            Option<JobId>,
    /// Whether the person seeks work when (re)entering the region.
    pub in_labor_force: bool,
}

/// Utility cached on a dwelling for the current year.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum UtilityCache {
    /// Per household-type utilities; valid while the dwelling stays vacant.
    Vacant(Vec<f64>),
    /// Utility to the current resident; valid while it stays occupied.
    Occupied(f64),
    #[default]
    Stale,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dwelling {
    pub id:          DwellingId,
    pub zone:        ZoneId,
    pub quality:     u8,
    pub bedrooms:    u8,
    /// Monthly price.
    pub price:       f64,
    /// Share of regional median income a resident may earn at most. 0 = unrestricted.
    pub restriction: f64,
    pub resident:    Option<HouseholdId>,
    pub year_built:  Year,
    #[serde(skip)]
    pub utility:     UtilityCache,
}

impl Dwelling {
    pub fn is_restricted(&self) -> bool {
        self.restriction > 0.0
    }

    pub fn is_vacant(&self) -> bool {
        self.resident.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id:     JobId,
    pub zone:   ZoneId,
    pub worker: Option<PersonId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub id:                    ZoneId,
    pub region:                RegionId,
    pub auto_accessibility:    f64,
    pub transit_accessibility: f64,
    /// 0..=1, higher is better.
    pub school_quality:        f64,
    /// 0..=1, higher is worse.
    pub crime_rate:            f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub id:   RegionId,
    pub name: String,
}

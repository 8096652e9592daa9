//! Shared primitive types used across the entire relocation core.

/// A simulated calendar year. One scheduling cycle = one year.
pub type Year = u32;

pub type HouseholdId = u32;
pub type PersonId    = u32;
pub type DwellingId  = u32;
pub type JobId       = u32;
pub type ZoneId      = u32;
pub type RegionId    = u32;

/// The canonical run identifier.
pub type RunId = String;

//! Travel-time collaborator used by the region choice.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::ZoneId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TravelMode {
    Auto,
    Transit,
}

/// Morning peak, used for commute evaluation.
pub const PEAK_HOUR: f64 = 8.0;

pub trait TravelTimes: Send + Sync {
    /// Door-to-door minutes between two zones.
    fn travel_time(&self, origin: ZoneId, destination: ZoneId, time_of_day: f64, mode: TravelMode) -> f64;

    /// Decay of commute acceptance with duration, in [0, 1].
    fn commuting_time_probability(&self, minutes: f64) -> f64;
}

/// Zone-pair skim with a flat fallback for pairs that were never measured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneTravelTimes {
    minutes:         BTreeMap<(ZoneId, ZoneId), f64>,
    default_minutes: f64,
    intrazonal:      f64,
    transit_factor:  f64,
    decay_beta:      f64,
}

impl ZoneTravelTimes {
    pub fn new(default_minutes: f64, decay_beta: f64) -> Self {
        Self {
            minutes: BTreeMap::new(),
            default_minutes,
            intrazonal: 5.0,
            transit_factor: 1.5,
            decay_beta,
        }
    }

    /// Record a symmetric auto travel time.
    pub fn set(&mut self, a: ZoneId, b: ZoneId, minutes: f64) {
        let key = if a <= b { (a, b) } else { (b, a) };
        self.minutes.insert(key, minutes);
    }

    pub fn with_intrazonal(mut self, minutes: f64) -> Self {
        self.intrazonal = minutes;
        self
    }

    fn auto_minutes(&self, a: ZoneId, b: ZoneId) -> f64 {
        if a == b {
            return self.intrazonal;
        }
        let key = if a <= b { (a, b) } else { (b, a) };
        self.minutes.get(&key).copied().unwrap_or(self.default_minutes)
    }
}

impl TravelTimes for ZoneTravelTimes {
    fn travel_time(&self, origin: ZoneId, destination: ZoneId, _time_of_day: f64, mode: TravelMode) -> f64 {
        let auto = self.auto_minutes(origin, destination);
        match mode {
            TravelMode::Auto    => auto,
            TravelMode::Transit => auto * self.transit_factor,
        }
    }

    fn commuting_time_probability(&self, minutes: f64) -> f64 {
        (-self.decay_beta * minutes.max(0.0)).exp().clamp(0.0, 1.0)
    }
}

//! Deterministic synthetic region for tests and the runner.
//!
//! Every attribute is drawn from one seeded stream, so the same seed and
//! the same builder settings always produce the same repository.

use crate::{
    error::SimResult,
    model::{Dwelling, Household, Job, Person, Race, Region, UtilityCache, Zone},
    repository::EntityRepository,
    rng::SubsystemRng,
    travel::ZoneTravelTimes,
    types::{DwellingId, JobId, RegionId, Year, ZoneId},
};

/// Stream index reserved for fixture generation.
const FIXTURE_STREAM: u64 = 0xF1;

/// Income drawn per worker, annual.
const INCOME_FLOOR: f64 = 12_000.0;
const INCOME_SPREAD: f64 = 108_000.0;

#[derive(Debug, Clone)]
pub struct FixtureBuilder {
    seed:               u64,
    start_year:         Year,
    regions:            u32,
    zones_per_region:   u32,
    dwellings_per_zone: u32,
    jobs_per_zone:      u32,
    occupancy:          f64,
    restricted_share:   f64,
}

impl FixtureBuilder {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            start_year:         2010,
            regions:            3,
            zones_per_region:   2,
            dwellings_per_zone: 40,
            jobs_per_zone:      20,
            occupancy:          0.8,
            restricted_share:   0.1,
        }
    }

    pub fn start_year(mut self, year: Year) -> Self {
        self.start_year = year;
        self
    }

    pub fn regions(mut self, n: u32) -> Self {
        self.regions = n;
        self
    }

    pub fn zones_per_region(mut self, n: u32) -> Self {
        self.zones_per_region = n;
        self
    }

    pub fn dwellings_per_zone(mut self, n: u32) -> Self {
        self.dwellings_per_zone = n;
        self
    }

    pub fn jobs_per_zone(mut self, n: u32) -> Self {
        self.jobs_per_zone = n;
        self
    }

    /// Size the stock so that roughly `n` households are housed at the
    /// configured occupancy.
    pub fn target_households(mut self, n: u32) -> Self {
        let zones = (self.regions * self.zones_per_region).max(1);
        let per_zone = f64::from(n) / (self.occupancy.max(0.05) * f64::from(zones));
        self.dwellings_per_zone = per_zone.ceil().max(1.0) as u32;
        self.jobs_per_zone = (self.dwellings_per_zone / 2).max(1);
        self
    }

    /// Share of dwellings that start with a resident.
    pub fn occupancy(mut self, share: f64) -> Self {
        self.occupancy = share.clamp(0.0, 1.0);
        self
    }

    /// Share of dwellings carrying an income restriction.
    pub fn restricted_share(mut self, share: f64) -> Self {
        self.restricted_share = share.clamp(0.0, 1.0);
        self
    }

    fn zone_id(region: RegionId, index: u32) -> ZoneId {
        region * 100 + index
    }

    /// Auto skim: 5 minutes inside a zone, 15 inside a region,
    /// plus 20 per region boundary crossed.
    pub fn travel_times(&self) -> ZoneTravelTimes {
        let mut times = ZoneTravelTimes::new(60.0, 0.02).with_intrazonal(5.0);
        let zones: Vec<(RegionId, ZoneId)> = (1..=self.regions)
            .flat_map(|r| (1..=self.zones_per_region).map(move |z| (r, Self::zone_id(r, z))))
            .collect();
        for (ra, za) in &zones {
            for (rb, zb) in &zones {
                if za < zb {
                    let minutes = 15.0 + 20.0 * f64::from(ra.abs_diff(*rb));
                    times.set(*za, *zb, minutes);
                }
            }
        }
        times
    }

    pub fn build(&self) -> SimResult<EntityRepository> {
        let mut rng = SubsystemRng::new(self.seed, FIXTURE_STREAM).with_name("fixtures");
        let mut repo = EntityRepository::new();

        let mut zones = Vec::new();
        for r in 1..=self.regions {
            repo.add_region(Region { id: r, name: format!("Region {r}") });
            for z in 1..=self.zones_per_region {
                let id = Self::zone_id(r, z);
                repo.add_zone(Zone {
                    id,
                    region:                r,
                    auto_accessibility:    30.0 + 70.0 * rng.next_f64(),
                    transit_accessibility: 10.0 + 60.0 * rng.next_f64(),
                    school_quality:        rng.next_f64(),
                    crime_rate:            0.4 * rng.next_f64(),
                })?;
                zones.push(id);
            }
        }

        let mut next_job: JobId = 1;
        for zone in &zones {
            for _ in 0..self.jobs_per_zone {
                repo.add_job(Job { id: next_job, zone: *zone, worker: None })?;
                next_job += 1;
            }
        }

        let mut next_dwelling: DwellingId = 1;
        let mut occupied = Vec::new();
        for zone in &zones {
            for _ in 0..self.dwellings_per_zone {
                let quality = 1 + rng.index_below(4) as u8;
                let bedrooms = 1 + rng.index_below(4) as u8;
                let restriction = if rng.chance(self.restricted_share) { 0.8 } else { 0.0 };
                let age = 1 + rng.index_below(60) as Year;
                let noise = 200.0 * (rng.next_f64() - 0.5);
                repo.add_dwelling(Dwelling {
                    id:          next_dwelling,
                    zone:        *zone,
                    quality,
                    bedrooms,
                    price:       400.0 + 250.0 * f64::from(quality) + 120.0 * f64::from(bedrooms) + noise,
                    restriction,
                    resident:    None,
                    year_built:  self.start_year.saturating_sub(age),
                    utility:     UtilityCache::Stale,
                })?;
                if rng.chance(self.occupancy) {
                    occupied.push(next_dwelling);
                }
                next_dwelling += 1;
            }
        }

        for dwelling in occupied {
            let id = repo.allocate_household_id();
            let size = 1 + rng.index_below(4);
            let race = Race::ALL[rng.index_below(Race::ALL.len())];
            let mut members = Vec::with_capacity(size);
            for m in 0..size {
                let worker = m < 2;
                let income = if worker { INCOME_FLOOR + INCOME_SPREAD * rng.next_f64() } else { 0.0 };
                members.push(Person {
                    id:             repo.allocate_person_id(),
                    household:      id,
                    income,
                    job:            None,
                    in_labor_force: worker,
                });
            }
            let workers: Vec<_> = members.iter().filter(|p| p.in_labor_force).map(|p| p.id).collect();
            repo.add_household(Household { id, members: Vec::new(), dwelling: None, race }, members)?;
            repo.occupy(dwelling, id)?;

            for person in workers {
                let vacant: Vec<JobId> = repo.vacant_jobs().collect();
                if vacant.is_empty() || !rng.chance(0.85) {
                    continue;
                }
                repo.assign_job(person, vacant[rng.index_below(vacant.len())])?;
            }
        }

        log::debug!(
            "fixtures: seed={} households={} dwellings={} vacancies={}",
            self.seed, repo.household_count(), repo.dwelling_count(), repo.total_vacancies(),
        );
        Ok(repo)
    }
}

//! In-memory entity repository.
//!
//! RULE: Only repository.rs mutates resident/dwelling references and the
//! vacancy index. Handlers go through `occupy` / `vacate` so the two views
//! never drift apart.
//!
//! All registries are ordered maps: iteration order is the id order, which
//! keeps every draw over them reproducible.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    error::{SimError, SimResult},
    model::{Dwelling, Household, Job, Person, Region, UtilityCache, Zone},
    types::{DwellingId, HouseholdId, JobId, PersonId, RegionId, ZoneId},
};

#[derive(Debug, Default)]
pub struct EntityRepository {
    households: BTreeMap<HouseholdId, Household>,
    persons:    BTreeMap<PersonId, Person>,
    dwellings:  BTreeMap<DwellingId, Dwelling>,
    jobs:       BTreeMap<JobId, Job>,
    zones:      BTreeMap<ZoneId, Zone>,
    regions:    BTreeMap<RegionId, Region>,
    /// Per-region vacant dwelling ids. An id is present iff its resident is None.
    vacancies:  BTreeMap<RegionId, BTreeSet<DwellingId>>,
    vacancy_capacity: Option<usize>,
    next_household_id: HouseholdId,
    next_person_id:    PersonId,
}

/// Result of returning a dwelling to the vacancy index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VacancyInsert {
    Indexed,
    /// Indexed, but the region now holds more vacancies than the configured capacity.
    OverCapacity,
}

impl EntityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vacancy_capacity(mut self, capacity: Option<usize>) -> Self {
        self.vacancy_capacity = capacity;
        self
    }

    // ── Geography ──────────────────────────────────────────────

    pub fn add_region(&mut self, region: Region) {
        self.vacancies.entry(region.id).or_default();
        self.regions.insert(region.id, region);
    }

    pub fn add_zone(&mut self, zone: Zone) -> SimResult<()> {
        if !self.regions.contains_key(&zone.region) {
            return Err(SimError::inconsistent(format!(
                "zone {} references unknown region {}", zone.id, zone.region
            )));
        }
        self.zones.insert(zone.id, zone);
        Ok(())
    }

    pub fn region(&self, id: RegionId) -> Option<&Region> { self.regions.get(&id) }
    pub fn zone(&self, id: ZoneId) -> Option<&Zone> { self.zones.get(&id) }

    pub fn regions(&self) -> impl Iterator<Item = &Region> { self.regions.values() }
    pub fn zones(&self) -> impl Iterator<Item = &Zone> { self.zones.values() }

    pub fn region_ids(&self) -> Vec<RegionId> {
        self.regions.keys().copied().collect()
    }

    pub fn zones_in_region(&self, region: RegionId) -> impl Iterator<Item = &Zone> {
        self.zones.values().filter(move |z| z.region == region)
    }

    pub fn region_of_zone(&self, zone: ZoneId) -> Option<RegionId> {
        self.zones.get(&zone).map(|z| z.region)
    }

    pub fn region_of_dwelling(&self, dwelling: DwellingId) -> Option<RegionId> {
        self.dwellings.get(&dwelling).and_then(|d| self.region_of_zone(d.zone))
    }

    // ── Dwellings ──────────────────────────────────────────────

    /// Insert a dwelling. A dwelling inserted with a resident must match a
    /// household that is already registered and still homeless.
    pub fn add_dwelling(&mut self, dwelling: Dwelling) -> SimResult<VacancyInsert> {
        let region = self.region_of_zone(dwelling.zone).ok_or_else(|| {
            SimError::inconsistent(format!(
                "dwelling {} references unknown zone {}", dwelling.id, dwelling.zone
            ))
        })?;
        if self.dwellings.contains_key(&dwelling.id) {
            return Err(SimError::inconsistent(format!("dwelling {} already exists", dwelling.id)));
        }
        if let Some(hh) = dwelling.resident {
            match self.households.get(&hh) {
                None => {
                    return Err(SimError::inconsistent(format!(
                        "dwelling {} references unknown household {hh}", dwelling.id
                    )));
                }
                Some(h) if h.dwelling.is_some() => {
                    return Err(SimError::inconsistent(format!(
                        "household {hh} already lives in dwelling {:?}", h.dwelling
                    )));
                }
                Some(_) => {}
            }
        }

        let id = dwelling.id;
        let resident = dwelling.resident;
        let mut stored = dwelling;
        stored.resident = None;
        self.dwellings.insert(id, stored);
        let status = self.index_vacancy(region, id);

        match resident {
            Some(hh) => {
                self.occupy(id, hh)?;
                Ok(VacancyInsert::Indexed)
            }
            None => Ok(status),
        }
    }

    /// Remove a vacant dwelling from the registry and the vacancy index.
    pub fn remove_dwelling(&mut self, id: DwellingId) -> SimResult<Dwelling> {
        let dwelling = self.dwellings.get(&id)
            .ok_or_else(|| SimError::inconsistent(format!("dwelling {id} not found")))?;
        if let Some(hh) = dwelling.resident {
            return Err(SimError::inconsistent(format!(
                "dwelling {id} still houses household {hh}"
            )));
        }
        if let Some(region) = self.region_of_dwelling(id) {
            if let Some(set) = self.vacancies.get_mut(&region) {
                set.remove(&id);
            }
        }
        self.dwellings.remove(&id)
            .ok_or_else(|| SimError::inconsistent(format!("dwelling {id} not found")))
    }

    pub fn dwelling(&self, id: DwellingId) -> Option<&Dwelling> { self.dwellings.get(&id) }

    pub(crate) fn dwelling_mut(&mut self, id: DwellingId) -> Option<&mut Dwelling> {
        self.dwellings.get_mut(&id)
    }

    pub fn dwellings(&self) -> impl Iterator<Item = &Dwelling> { self.dwellings.values() }

    pub fn dwelling_count(&self) -> usize { self.dwellings.len() }

    pub fn set_dwelling_quality(&mut self, id: DwellingId, quality: u8) -> SimResult<()> {
        let dwelling = self.dwellings.get_mut(&id)
            .ok_or_else(|| SimError::inconsistent(format!("dwelling {id} not found")))?;
        dwelling.quality = quality;
        dwelling.utility = UtilityCache::Stale;
        Ok(())
    }

    // ── Vacancy index ──────────────────────────────────────────

    /// Vacant dwellings of a region in id order.
    pub fn vacant_dwellings(&self, region: RegionId) -> impl Iterator<Item = DwellingId> + '_ {
        self.vacancies.get(&region).into_iter().flat_map(|set| set.iter().copied())
    }

    pub fn vacancy_count(&self, region: RegionId) -> usize {
        self.vacancies.get(&region).map_or(0, BTreeSet::len)
    }

    pub fn total_vacancies(&self) -> usize {
        self.vacancies.values().map(BTreeSet::len).sum()
    }

    fn index_vacancy(&mut self, region: RegionId, id: DwellingId) -> VacancyInsert {
        let set = self.vacancies.entry(region).or_default();
        set.insert(id);
        match self.vacancy_capacity {
            Some(cap) if set.len() > cap => VacancyInsert::OverCapacity,
            _ => VacancyInsert::Indexed,
        }
    }

    /// Put `household` into the vacant `dwelling`. Both sides are checked
    /// before anything is written.
    pub fn occupy(&mut self, dwelling: DwellingId, household: HouseholdId) -> SimResult<()> {
        let region = self.region_of_dwelling(dwelling)
            .ok_or_else(|| SimError::inconsistent(format!("dwelling {dwelling} not found")))?;
        let d = &self.dwellings[&dwelling];
        if let Some(current) = d.resident {
            return Err(SimError::inconsistent(format!(
                "dwelling {dwelling} already houses household {current}"
            )));
        }
        let hh = self.households.get(&household)
            .ok_or_else(|| SimError::inconsistent(format!("household {household} not found")))?;
        if let Some(current) = hh.dwelling {
            return Err(SimError::inconsistent(format!(
                "household {household} still lives in dwelling {current}"
            )));
        }

        if let Some(set) = self.vacancies.get_mut(&region) {
            set.remove(&dwelling);
        }
        if let Some(d) = self.dwellings.get_mut(&dwelling) {
            d.resident = Some(household);
        }
        if let Some(hh) = self.households.get_mut(&household) {
            hh.dwelling = Some(dwelling);
        }
        Ok(())
    }

    /// Clear the resident of `dwelling` and return it to the vacancy index.
    pub fn vacate(&mut self, dwelling: DwellingId) -> SimResult<VacancyInsert> {
        let region = self.region_of_dwelling(dwelling)
            .ok_or_else(|| SimError::inconsistent(format!("dwelling {dwelling} not found")))?;
        let resident = self.dwellings.get_mut(&dwelling).and_then(|d| d.resident.take());
        if let Some(hh) = resident.and_then(|id| self.households.get_mut(&id)) {
            hh.dwelling = None;
        }
        Ok(self.index_vacancy(region, dwelling))
    }

    // ── Households and persons ─────────────────────────────────

    pub fn allocate_household_id(&mut self) -> HouseholdId {
        let id = self.next_household_id;
        self.next_household_id += 1;
        id
    }

    pub fn allocate_person_id(&mut self) -> PersonId {
        let id = self.next_person_id;
        self.next_person_id += 1;
        id
    }

    /// Register a household together with its members. The household is
    /// inserted homeless; use `occupy` to house it.
    pub fn add_household(&mut self, mut household: Household, members: Vec<Person>) -> SimResult<()> {
        if self.households.contains_key(&household.id) {
            return Err(SimError::inconsistent(format!("household {} already exists", household.id)));
        }
        if let Some(p) = members.iter().find(|p| p.household != household.id) {
            return Err(SimError::inconsistent(format!(
                "person {} does not belong to household {}", p.id, household.id
            )));
        }
        if let Some(p) = members.iter().find(|p| self.persons.contains_key(&p.id)) {
            return Err(SimError::inconsistent(format!("person {} already exists", p.id)));
        }

        household.members = members.iter().map(|p| p.id).collect();
        household.dwelling = None;
        self.next_household_id = self.next_household_id.max(household.id + 1);
        for person in members {
            if let Some(job) = person.job {
                match self.jobs.get_mut(&job) {
                    Some(j) if j.worker.is_none() => j.worker = Some(person.id),
                    _ => {
                        return Err(SimError::inconsistent(format!(
                            "person {} claims unavailable job {job}", person.id
                        )))
                    }
                }
            }
            self.next_person_id = self.next_person_id.max(person.id + 1);
            self.persons.insert(person.id, person);
        }
        self.households.insert(household.id, household);
        Ok(())
    }

    /// Remove a household and its members. The household must already be
    /// homeless and every member unemployed.
    pub fn remove_household(&mut self, id: HouseholdId) -> SimResult<(Household, Vec<Person>)> {
        let hh = self.households.get(&id)
            .ok_or_else(|| SimError::inconsistent(format!("household {id} not found")))?;
        if let Some(d) = hh.dwelling {
            return Err(SimError::inconsistent(format!("household {id} still lives in dwelling {d}")));
        }
        if let Some(p) = hh.members.iter().filter_map(|p| self.persons.get(p)).find(|p| p.job.is_some()) {
            return Err(SimError::inconsistent(format!("person {} still holds a job", p.id)));
        }

        let household = self.households.remove(&id)
            .ok_or_else(|| SimError::inconsistent(format!("household {id} not found")))?;
        let members = household.members.iter()
            .filter_map(|p| self.persons.remove(p))
            .collect();
        Ok((household, members))
    }

    pub fn household(&self, id: HouseholdId) -> Option<&Household> { self.households.get(&id) }
    pub fn households(&self) -> impl Iterator<Item = &Household> { self.households.values() }
    pub fn household_ids(&self) -> Vec<HouseholdId> { self.households.keys().copied().collect() }
    pub fn household_count(&self) -> usize { self.households.len() }

    pub fn person(&self, id: PersonId) -> Option<&Person> { self.persons.get(&id) }

    pub fn members(&self, household: HouseholdId) -> impl Iterator<Item = &Person> {
        self.households.get(&household)
            .into_iter()
            .flat_map(|hh| hh.members.iter())
            .filter_map(|p| self.persons.get(p))
    }

    pub fn household_size(&self, household: HouseholdId) -> usize {
        self.households.get(&household).map_or(0, |hh| hh.members.len())
    }

    pub fn household_income(&self, household: HouseholdId) -> f64 {
        self.members(household).map(|p| p.income).sum()
    }

    /// Persons living in registered households.
    pub fn population(&self) -> u64 {
        self.households.values().map(|hh| hh.members.len() as u64).sum()
    }

    // ── Jobs ───────────────────────────────────────────────────

    pub fn add_job(&mut self, job: Job) -> SimResult<()> {
        if !self.zones.contains_key(&job.zone) {
            return Err(SimError::inconsistent(format!(
                "job {} references unknown zone {}", job.id, job.zone
            )));
        }
        self.jobs.insert(job.id, job);
        Ok(())
    }

    pub fn job(&self, id: JobId) -> Option<&Job> { self.jobs.get(&id) }
    pub fn jobs(&self) -> impl Iterator<Item = &Job> { self.jobs.values() }

    pub fn vacant_jobs(&self) -> impl Iterator<Item = JobId> + '_ {
        self.jobs.values().filter(|j| j.worker.is_none()).map(|j| j.id)
    }

    pub fn assign_job(&mut self, person: PersonId, job: JobId) -> SimResult<()> {
        let p = self.persons.get(&person)
            .ok_or_else(|| SimError::inconsistent(format!("person {person} not found")))?;
        if p.job.is_some() {
            return Err(SimError::inconsistent(format!("person {person} already employed")));
        }
        match self.jobs.get_mut(&job) {
            Some(j) if j.worker.is_none() => j.worker = Some(person),
            Some(_) => return Err(SimError::inconsistent(format!("job {job} already filled"))),
            None => return Err(SimError::inconsistent(format!("job {job} not found"))),
        }
        if let Some(p) = self.persons.get_mut(&person) {
            p.job = Some(job);
        }
        Ok(())
    }

    /// Vacate the job held by `person`, if any. Returns the released job.
    pub fn release_job(&mut self, person: PersonId) -> Option<JobId> {
        let job = self.persons.get_mut(&person).and_then(|p| p.job.take())?;
        if let Some(j) = self.jobs.get_mut(&job) {
            j.worker = None;
        }
        Some(job)
    }

    // ── Consistency ────────────────────────────────────────────

    /// Check the resident/dwelling back-references and the vacancy index.
    pub fn verify_consistency(&self) -> SimResult<()> {
        for d in self.dwellings.values() {
            let region = self.region_of_zone(d.zone).ok_or_else(|| {
                SimError::inconsistent(format!("dwelling {} has no region", d.id))
            })?;
            let indexed = self.vacancies.get(&region).is_some_and(|s| s.contains(&d.id));
            match d.resident {
                None if !indexed => {
                    return Err(SimError::inconsistent(format!(
                        "vacant dwelling {} missing from vacancy index", d.id
                    )))
                }
                Some(hh) => {
                    if indexed {
                        return Err(SimError::inconsistent(format!(
                            "occupied dwelling {} listed as vacant", d.id
                        )));
                    }
                    let back = self.households.get(&hh).and_then(|h| h.dwelling);
                    if back != Some(d.id) {
                        return Err(SimError::inconsistent(format!(
                            "dwelling {} houses {hh} but household points at {back:?}", d.id
                        )));
                    }
                }
                None => {}
            }
        }
        for (region, set) in &self.vacancies {
            for id in set {
                let ok = self.dwellings.get(id).is_some_and(|d| {
                    d.resident.is_none() && self.region_of_zone(d.zone) == Some(*region)
                });
                if !ok {
                    return Err(SimError::inconsistent(format!(
                        "vacancy index of region {region} lists dwelling {id} wrongly"
                    )));
                }
            }
        }
        for hh in self.households.values() {
            if let Some(d) = hh.dwelling {
                let resident = self.dwellings.get(&d).and_then(|d| d.resident);
                if resident != Some(hh.id) {
                    return Err(SimError::inconsistent(format!(
                        "household {} points at dwelling {d} whose resident is {resident:?}", hh.id
                    )));
                }
            }
        }
        Ok(())
    }
}

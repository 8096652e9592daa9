//! Employment collaborator: job search and job release.

use crate::{
    error::SimResult,
    repository::EntityRepository,
    rng::SubsystemRng,
    types::{JobId, PersonId},
};

pub trait Employment: Send + Sync {
    /// Try to place `person` in a job. Returns the job taken, if any.
    fn look_for_job(
        &self,
        repo: &mut EntityRepository,
        person: PersonId,
        rng: &mut SubsystemRng,
    ) -> SimResult<Option<JobId>>;

    /// Vacate the job held by `person`, if any.
    fn quit_job(&self, repo: &mut EntityRepository, person: PersonId) -> Option<JobId>;
}

/// Uniform draw among currently vacant jobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct VacantJobMarket;

impl Employment for VacantJobMarket {
    fn look_for_job(
        &self,
        repo: &mut EntityRepository,
        person: PersonId,
        rng: &mut SubsystemRng,
    ) -> SimResult<Option<JobId>> {
        let vacant: Vec<JobId> = repo.vacant_jobs().collect();
        if vacant.is_empty() {
            return Ok(None);
        }
        let job = vacant[rng.index_below(vacant.len())];
        repo.assign_job(person, job)?;
        Ok(Some(job))
    }

    fn quit_job(&self, repo: &mut EntityRepository, person: PersonId) -> Option<JobId> {
        repo.release_job(person)
    }
}

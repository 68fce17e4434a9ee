//! State Store: durable persistence of Job Record snapshots, keyed by
//! remote job id, secondarily queryable by logical job name.

pub mod json_store;
pub mod redis_store;

use async_trait::async_trait;
use batch_api::JobStatus;

use crate::error::EngineResult;
use crate::job::Job;

/// Capability every state store backend implements. Engine code depends
/// only on this trait, never on a concrete backend.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Upsert keyed on `job.job_id`. If `job_id` is absent (e.g. right
    /// after [`Job::reset`]) the row is silently not written — a backend
    /// logs this, it does not return an error, matching the "FAIL to save
    /// job without job_id" behavior of the system this was ported from.
    async fn save(&self, job: &Job) -> EngineResult<()>;

    async fn find_by_job_id(&self, job_id: &str) -> EngineResult<Option<Job>>;

    /// All historical rows for this logical name, in arbitrary order.
    async fn find_by_job_name(&self, job_name: &str) -> EngineResult<Vec<Job>>;

    async fn remove_by_job_id(&self, job_id: &str) -> EngineResult<Option<Job>>;

    /// Removes every row for this logical name; returns the removed ids.
    async fn remove_by_job_name(&self, job_name: &str) -> EngineResult<Vec<String>>;

    async fn find_by_job_status(&self, statuses: &[JobStatus]) -> EngineResult<Vec<Job>>;

    /// Every stored row whose status is not `SUCCEEDED`.
    async fn find_jobs_to_run(&self) -> EngineResult<Vec<Job>>;

    /// The single row with maximal `job_description.createdAt` for this
    /// name. See [`latest_of`] for the tie-break policy.
    async fn find_latest_job_name(&self, job_name: &str) -> EngineResult<Option<Job>> {
        let rows = self.find_by_job_name(job_name).await?;
        Ok(latest_of(rows.iter()).cloned())
    }

    /// Store-authoritative filter: an input job is dropped iff the store's
    /// *latest* row for its name is `SUCCEEDED`, even if the caller's own
    /// in-memory copy disagrees.
    async fn jobs_to_run(&self, jobs: &[Job]) -> EngineResult<Vec<Job>> {
        let mut out = Vec::with_capacity(jobs.len());
        for job in jobs {
            match self.find_latest_job_name(&job.job_name).await? {
                Some(latest) if latest.status == Some(JobStatus::Succeeded) => {}
                _ => out.push(job.clone()),
            }
        }
        Ok(out)
    }
}

/// Picks the "latest" row among candidates, per the tie-break policy: a
/// row lacking `createdAt` sorts before one that has it; among rows that
/// both lack it, higher `num_tries` wins; exact ties keep whichever row was
/// seen first.
pub fn latest_of<'a>(rows: impl Iterator<Item = &'a Job>) -> Option<&'a Job> {
    rows.fold(None, |best, candidate| match best {
        None => Some(candidate),
        Some(current) => {
            if is_more_recent(candidate, current) {
                Some(candidate)
            } else {
                Some(current)
            }
        }
    })
}

fn is_more_recent(candidate: &Job, current: &Job) -> bool {
    match (candidate.created(), current.created()) {
        (Some(c), Some(b)) => c > b,
        (Some(_), None) => true,
        (None, Some(_)) => false,
        (None, None) => candidate.num_tries > current.num_tries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn job_with_created(name: &str, created_offset_secs: Option<i64>, num_tries: u32) -> Job {
        let mut job = Job::new(name, "q", "d");
        job.num_tries = num_tries;
        if let Some(offset) = created_offset_secs {
            job.job_description = Some(batch_api::JobDescription {
                job_id: "x".to_string(),
                job_name: name.to_string(),
                status: JobStatus::Running,
                status_reason: None,
                created_at: Some(Utc::now() + Duration::seconds(offset)),
                started_at: None,
                stopped_at: None,
            });
        }
        job
    }

    #[test]
    fn latest_prefers_newer_created_at() {
        let older = job_with_created("t", Some(-100), 0);
        let newer = job_with_created("t", Some(-1), 0);
        let rows = vec![older.clone(), newer.clone()];
        let latest = latest_of(rows.iter()).unwrap();
        assert_eq!(latest.created(), newer.created());
    }

    #[test]
    fn rows_without_created_at_lose_to_timed_rows() {
        let untimed = job_with_created("t", None, 5);
        let timed = job_with_created("t", Some(-1), 0);
        let rows = vec![untimed, timed.clone()];
        let latest = latest_of(rows.iter()).unwrap();
        assert_eq!(latest.created(), timed.created());
    }

    #[test]
    fn among_untimed_rows_higher_num_tries_wins() {
        let a = job_with_created("t", None, 1);
        let b = job_with_created("t", None, 3);
        let rows = vec![a, b.clone()];
        let latest = latest_of(rows.iter()).unwrap();
        assert_eq!(latest.num_tries, b.num_tries);
    }
}

//! Status-query helpers over a collection of Job Records.

use std::sync::Arc;

use batch_api::JobStatus;
use futures::stream::{Stream, StreamExt};

use crate::error::EngineResult;
use crate::job::Job;
use crate::store::StateStore;

const RUNNING_STATUSES: &[JobStatus] = &[
    JobStatus::Submitted,
    JobStatus::Pending,
    JobStatus::Runnable,
    JobStatus::Starting,
    JobStatus::Running,
];

const COMPLETE_STATUSES: &[JobStatus] = &[JobStatus::Succeeded, JobStatus::Failed];

/// Yields jobs whose *effective* status is in `states`. If `store` is
/// given, effective status is the store's latest-by-name value, overriding
/// each job's in-memory `status`; otherwise the in-memory `status` is used
/// as-is.
pub async fn find_jobs_by_status<'a>(
    jobs: &'a [Job],
    states: &[JobStatus],
    store: Option<&Arc<dyn StateStore>>,
) -> EngineResult<Vec<&'a Job>> {
    let mut out = Vec::new();
    for job in jobs {
        let effective = match store {
            Some(store) => store
                .find_latest_job_name(&job.job_name)
                .await?
                .and_then(|row| row.status)
                .or(job.status),
            None => job.status,
        };

        if effective.is_some_and(|s| states.contains(&s)) {
            out.push(job);
        }
    }
    Ok(out)
}

pub async fn find_complete_jobs<'a>(
    jobs: &'a [Job],
    store: Option<&Arc<dyn StateStore>>,
) -> EngineResult<Vec<&'a Job>> {
    find_jobs_by_status(jobs, COMPLETE_STATUSES, store).await
}

pub async fn find_running_jobs<'a>(
    jobs: &'a [Job],
    store: Option<&Arc<dyn StateStore>>,
) -> EngineResult<Vec<&'a Job>> {
    find_jobs_by_status(jobs, RUNNING_STATUSES, store).await
}

/// Lazy, streaming counterpart to [`find_jobs_by_status`]. Same effective-status
/// semantics, but yields matches one at a time instead of collecting them all
/// up front — useful when `jobs` is large and the store lookup per job is the
/// bottleneck.
pub fn find_jobs_by_status_stream<'a>(
    jobs: &'a [Job],
    states: &'a [JobStatus],
    store: Option<&'a Arc<dyn StateStore>>,
) -> impl Stream<Item = EngineResult<&'a Job>> + 'a {
    futures::stream::iter(jobs.iter())
        .then(move |job| async move {
            let effective = match store {
                Some(store) => store
                    .find_latest_job_name(&job.job_name)
                    .await?
                    .and_then(|row| row.status)
                    .or(job.status),
                None => job.status,
            };
            Ok(effective.is_some_and(|s| states.contains(&s)).then_some(job))
        })
        .filter_map(|res: EngineResult<Option<&'a Job>>| async move {
            match res {
                Ok(Some(job)) => Some(Ok(job)),
                Ok(None) => None,
                Err(e) => Some(Err(e)),
            }
        })
}

pub fn find_complete_jobs_stream<'a>(
    jobs: &'a [Job],
    store: Option<&'a Arc<dyn StateStore>>,
) -> impl Stream<Item = EngineResult<&'a Job>> + 'a {
    find_jobs_by_status_stream(jobs, COMPLETE_STATUSES, store)
}

pub fn find_running_jobs_stream<'a>(
    jobs: &'a [Job],
    store: Option<&'a Arc<dyn StateStore>>,
) -> impl Stream<Item = EngineResult<&'a Job>> + 'a {
    find_jobs_by_status_stream(jobs, RUNNING_STATUSES, store)
}

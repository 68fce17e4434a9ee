//! Job Manager: the per-job driver. Submits-or-recovers, waits, and applies
//! the selective spot-reclaim retry policy on failure.

use std::sync::Arc;

use batch_api::{JobDescription, JobStatus};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{error, warn};

use crate::adapter::RemoteApiAdapter;
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::job::Job;
use crate::store::StateStore;
use crate::waiter::JobWaiter;

/// Matches a `statusReason` indicating the job's EC2 instance was
/// reclaimed (e.g. spot interruption) rather than the job itself failing.
static SPOT_RECLAIM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Host EC2.*terminated").expect("static regex is valid"));

/// Drives a single [`Job`] from its current state to a terminal one,
/// persisting after every meaningful transition.
pub struct JobManager<'a> {
    adapter: &'a RemoteApiAdapter,
    store: Arc<dyn StateStore>,
    config: &'a EngineConfig,
}

impl<'a> JobManager<'a> {
    pub fn new(adapter: &'a RemoteApiAdapter, store: Arc<dyn StateStore>, config: &'a EngineConfig) -> Self {
        Self {
            adapter,
            store,
            config,
        }
    }

    /// Runs the submit-or-recover / wait / retry loop until the job reaches
    /// a terminal state or its retry budget is exhausted. A waiter give-up
    /// resets the job and consumes a try rather than exiting outright.
    /// Returns `None` once retries are exhausted without a terminal status.
    pub async fn run(&self, job: &mut Job) -> EngineResult<Option<JobDescription>> {
        while job.can_retry() {
            if job.job_id.is_none() {
                self.adapter.submit(job).await?;
                self.save(job).await;
            }

            let waiter = JobWaiter::new(self.adapter, self.config);
            let desc = waiter.wait(job).await?;
            self.save(job).await;

            let Some(desc) = desc else {
                // Waiter gave up without ever seeing this job_id again.
                // Reset so the next iteration resubmits, consuming a try
                // instead of spinning forever on a permanently-missing job.
                warn!(job_name = %job.job_name, "waiter gave up, resubmitting");
                job.reset();
                self.save(job).await;
                continue;
            };

            match desc.status {
                JobStatus::Succeeded => return Ok(Some(desc)),
                JobStatus::Failed => {
                    if let Some(reason) = &desc.status_reason {
                        if SPOT_RECLAIM.is_match(reason) {
                            warn!(job_name = %job.job_name, reason, "spot reclaim, resubmitting");
                            job.reset();
                            self.save(job).await;
                            continue;
                        }
                    }
                    return Ok(Some(desc));
                }
                _ => return Ok(Some(desc)),
            }
        }

        error!(job_name = %job.job_name, num_tries = job.num_tries, "retries exceeded");
        Ok(None)
    }

    async fn save(&self, job: &Job) {
        if let Err(e) = self.store.save(job).await {
            error!(job_name = %job.job_name, error = %e, "failed to persist job");
        }
    }
}

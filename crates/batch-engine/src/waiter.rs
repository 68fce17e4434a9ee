//! Job Waiter: polls `describe` for a single job until its status is
//! terminal.

use batch_api::JobDescription;
use tracing::{debug, warn};

use crate::adapter::RemoteApiAdapter;
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::job::Job;
use crate::rate_gate::jittered_sleep;

/// Per-job polling loop. Holds no state of its own beyond the counters for
/// a single `wait` call; a new loop iteration starts fresh each time a
/// [`crate::manager::JobManager`] invokes it.
pub struct JobWaiter<'a> {
    adapter: &'a RemoteApiAdapter,
    retries: u32,
    start_pause: f64,
    min_pause: f64,
    max_pause: f64,
}

impl<'a> JobWaiter<'a> {
    pub fn new(adapter: &'a RemoteApiAdapter, config: &EngineConfig) -> Self {
        Self {
            adapter,
            retries: config.retries,
            start_pause: config.start_pause,
            min_pause: config.min_pause,
            max_pause: config.max_pause,
        }
    }

    /// Poll until the job reaches a terminal status, or until
    /// `config.retries` consecutive describe calls fail to find this job's
    /// entry at all — in which case the waiter gives up and returns `None`
    /// with whatever was last recorded on the job.
    ///
    /// Mirrors the source polling loop exactly: a describe-miss increments
    /// a counter with no pacing sleep of its own, and a warm-up-state sleep
    /// never replaces the regular steady-state sleep — both fire on the
    /// same iteration.
    pub async fn wait(&self, job: &mut Job) -> EngineResult<Option<JobDescription>> {
        let job_id = job
            .job_id
            .clone()
            .expect("JobWaiter::wait requires a submitted job");
        let mut monitor_failures = 0u32;

        loop {
            let descriptions = self.adapter.describe(std::slice::from_ref(&job_id)).await?;
            let Some(desc) = descriptions.into_iter().find(|d| d.job_id == job_id) else {
                monitor_failures += 1;
                if monitor_failures > self.retries {
                    warn!(job_id, "waiter giving up: job missing from describe response");
                    return Ok(None);
                }
                continue;
            };

            debug!(job_id, status = %desc.status, "poll result");
            job.job_description = Some(desc.clone());
            job.status = Some(desc.status);

            if desc.status.is_terminal() {
                return Ok(Some(desc));
            }

            if desc.status.is_warmup() {
                jittered_sleep(self.start_pause, 2.0 * self.start_pause).await;
            }

            jittered_sleep(self.min_pause, self.max_pause).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_gate::RateGate;
    use batch_api::{JobStatus, MockTransport};
    use std::sync::Arc;

    fn fast_config() -> EngineConfig {
        EngineConfig {
            retries: 3,
            start_pause: 0.0,
            min_pause: 0.0,
            max_pause: 0.001,
            min_jitter: 0.0,
            max_jitter: 0.001,
            ..EngineConfig::default()
        }
    }

    #[tokio::test]
    async fn waits_for_terminal_status() {
        let transport = Arc::new(MockTransport::new());
        transport
            .script_statuses("t-wait", vec![JobStatus::Submitted, JobStatus::Succeeded])
            .await;
        let config = fast_config();
        let adapter = RemoteApiAdapter::new(transport, RateGate::new(4), &config);

        let mut job = Job::new("t-wait", "q", "d");
        adapter.submit(&mut job).await.unwrap();

        let waiter = JobWaiter::new(&adapter, &config);
        let desc = waiter.wait(&mut job).await.unwrap().unwrap();

        assert_eq!(desc.status, JobStatus::Succeeded);
        assert_eq!(job.status, Some(JobStatus::Succeeded));
    }

    #[tokio::test]
    async fn gives_up_on_missing_describe() {
        let transport = Arc::new(MockTransport::new());
        let config = fast_config();
        let adapter = RemoteApiAdapter::new(transport, RateGate::new(4), &config);

        // job_id never submitted through this transport, so describe always misses.
        let mut job = Job::new("t-missing", "q", "d");
        job.job_id = Some("ghost-job".to_string());

        let waiter = JobWaiter::new(&adapter, &config);
        let result = waiter.wait(&mut job).await.unwrap();
        assert!(result.is_none());
    }
}

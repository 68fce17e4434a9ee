//! Remote API Adapter: rate-gated, throttle-retrying wrapper around the
//! three `batch_api::RemoteBatchTransport` operations.

use std::sync::Arc;

use batch_api::{JobDescription, RemoteBatchTransport, TransportError};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::job::Job;
use crate::rate_gate::{RateGate, jittered_sleep};

/// Thin wrapper around a [`RemoteBatchTransport`] that holds a [`RateGate`]
/// slot for the full duration of each call, including any throttle-retry
/// jitter sleep, and retries `TooManyRequests`-shaped errors up to
/// `config.retries` times before giving up.
pub struct RemoteApiAdapter {
    transport: Arc<dyn RemoteBatchTransport>,
    gate: RateGate,
    retries: u32,
    min_jitter: f64,
    max_jitter: f64,
}

impl RemoteApiAdapter {
    pub fn new(transport: Arc<dyn RemoteBatchTransport>, gate: RateGate, config: &EngineConfig) -> Self {
        Self {
            transport,
            gate,
            retries: config.retries,
            min_jitter: config.min_jitter,
            max_jitter: config.max_jitter,
        }
    }

    pub async fn submit(&self, job: &mut Job) -> EngineResult<()> {
        let _permit = self.gate.acquire().await;
        let input = job.submission_params();

        for attempt in 0..self.retries {
            match self.transport.submit_job(input.clone()).await {
                Ok(output) => {
                    info!(job_name = %job.job_name, job_id = %output.job_id, "job submitted");
                    job.job_tries.push(output.job_id.clone());
                    job.num_tries += 1;
                    job.job_id = Some(output.job_id);
                    job.job_submission = Some(serde_json::to_value(&input)?);
                    return Ok(());
                }
                Err(TransportError::Throttled) => {
                    debug!(job_name = %job.job_name, attempt, "submit throttled, retrying");
                    jittered_sleep(self.min_jitter, self.max_jitter).await;
                    continue;
                }
                Err(e) => return Err(EngineError::Transport(e)),
            }
        }

        warn!(job_name = %job.job_name, "submit retries exceeded");
        Err(EngineError::RetriesExceeded(job.job_name.clone()))
    }

    pub async fn describe(&self, job_ids: &[String]) -> EngineResult<Vec<JobDescription>> {
        let _permit = self.gate.acquire().await;

        for attempt in 0..self.retries {
            match self.transport.describe_jobs(job_ids).await {
                Ok(descriptions) => return Ok(descriptions),
                Err(TransportError::Throttled) => {
                    debug!(attempt, "describe throttled, retrying");
                    jittered_sleep(self.min_jitter, self.max_jitter).await;
                    continue;
                }
                Err(e) => return Err(EngineError::Transport(e)),
            }
        }

        Err(EngineError::RetriesExceeded(job_ids.join(",")))
    }

    pub async fn terminate(&self, job_id: &str, reason: &str) -> EngineResult<()> {
        let _permit = self.gate.acquire().await;

        for attempt in 0..self.retries {
            match self.transport.terminate_job(job_id, reason).await {
                Ok(()) => return Ok(()),
                Err(TransportError::Throttled) => {
                    debug!(job_id, attempt, "terminate throttled, retrying");
                    jittered_sleep(self.min_jitter, self.max_jitter).await;
                    continue;
                }
                Err(e) => return Err(EngineError::Transport(e)),
            }
        }

        Err(EngineError::RetriesExceeded(job_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use batch_api::MockTransport;

    fn config() -> EngineConfig {
        EngineConfig {
            retries: 5,
            min_jitter: 0.0,
            max_jitter: 0.001,
            ..EngineConfig::default()
        }
    }

    #[tokio::test]
    async fn submit_retries_past_throttling() {
        let transport = Arc::new(MockTransport::new());
        transport.throttle_submits("t-adapter", 2).await;
        let adapter = RemoteApiAdapter::new(transport, RateGate::new(4), &config());

        let mut job = Job::new("t-adapter", "q", "d");
        adapter.submit(&mut job).await.unwrap();

        assert!(job.job_id.is_some());
        assert_eq!(job.num_tries, 1);
    }

    #[tokio::test]
    async fn submit_gives_up_after_retry_budget() {
        let transport = Arc::new(MockTransport::new());
        transport.throttle_submits("t-adapter-2", 99).await;
        let adapter = RemoteApiAdapter::new(transport, RateGate::new(4), &config());

        let mut job = Job::new("t-adapter-2", "q", "d");
        let result = adapter.submit(&mut job).await;

        assert!(matches!(result, Err(EngineError::RetriesExceeded(_))));
    }
}

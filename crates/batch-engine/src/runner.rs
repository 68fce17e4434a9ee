//! Batch Runner: fan-out that drives a list of Job Records through one
//! [`JobManager`] each, draining completions as they finish rather than in
//! submission order.

use std::sync::Arc;

use batch_api::JobDescription;
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::info;

use crate::adapter::RemoteApiAdapter;
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::job::Job;
use crate::manager::JobManager;
use crate::store::StateStore;

/// One outcome per input job: the job's final in-memory state and the
/// manager's result.
pub type RunOutcome = (Job, EngineResult<Option<JobDescription>>);

pub struct BatchRunner<'a> {
    adapter: &'a RemoteApiAdapter,
    store: Arc<dyn StateStore>,
    config: &'a EngineConfig,
}

impl<'a> BatchRunner<'a> {
    pub fn new(adapter: &'a RemoteApiAdapter, store: Arc<dyn StateStore>, config: &'a EngineConfig) -> Self {
        Self {
            adapter,
            store,
            config,
        }
    }

    /// Drives every job concurrently, bounded only by the shared
    /// [`crate::rate_gate::RateGate`] inside `adapter`, and returns outcomes
    /// in completion order (not submission order).
    ///
    /// All tasks run as futures polled within this call rather than as
    /// `tokio::spawn`ed tasks — idiomatic for the single-runtime,
    /// cooperative-concurrency model this orchestrator assumes; teardown is
    /// implicit (Rust's `Drop`) once this function returns, rather than an
    /// explicit close call on the transport.
    pub async fn run(&self, jobs: Vec<Job>) -> Vec<RunOutcome> {
        let total = jobs.len();
        info!(total, "batch runner starting");

        let mut in_flight = FuturesUnordered::new();
        for job in jobs {
            let manager = JobManager::new(self.adapter, self.store.clone(), self.config);
            in_flight.push(async move {
                let mut job = job;
                let result = manager.run(&mut job).await;
                (job, result)
            });
        }

        let mut outcomes = Vec::with_capacity(total);
        while let Some(outcome) = in_flight.next().await {
            outcomes.push(outcome);
        }

        info!(total, completed = outcomes.len(), "batch runner finished");
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_gate::RateGate;
    use crate::store::json_store::JsonStore;
    use batch_api::{JobStatus, MockTransport};

    fn fast_config() -> EngineConfig {
        EngineConfig {
            retries: 3,
            start_pause: 0.0,
            min_pause: 0.0,
            max_pause: 0.001,
            min_jitter: 0.0,
            max_jitter: 0.001,
            gate_width: 4,
            ..EngineConfig::default()
        }
    }

    #[tokio::test]
    async fn runs_a_batch_to_completion() {
        let transport = Arc::new(MockTransport::new());
        for i in 0..5 {
            transport
                .script_statuses(&format!("t-batch-{i}"), vec![JobStatus::Succeeded])
                .await;
        }

        let config = fast_config();
        let adapter = RemoteApiAdapter::new(transport, RateGate::new(config.gate_width), &config);
        let store: Arc<dyn StateStore> = Arc::new(JsonStore::temp().await.unwrap());
        let runner = BatchRunner::new(&adapter, store.clone(), &config);

        let jobs: Vec<Job> = (0..5)
            .map(|i| Job::new(format!("t-batch-{i}"), "q", "d"))
            .collect();

        let outcomes = runner.run(jobs).await;
        assert_eq!(outcomes.len(), 5);
        for (_, result) in &outcomes {
            let desc = result.as_ref().unwrap().as_ref().unwrap();
            assert_eq!(desc.status, JobStatus::Succeeded);
        }

        let to_run = store.find_jobs_to_run().await.unwrap();
        assert!(to_run.is_empty(), "all five jobs should have succeeded");
    }
}

//! Remote batch API transport.
//!
//! This crate defines the boundary between the job lifecycle engine and
//! whatever actually speaks to a managed cloud batch service: three async
//! operations (submit, describe, terminate) and the wire shapes they pass
//! around. A production binding to a real SDK is not built here — only the
//! trait, its error taxonomy, and an in-memory reference transport used by
//! tests and the bundled demo.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

/// Parameters accepted by a submit call, mirroring the remote API's own
/// request shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJobInput {
    pub job_name: String,
    pub job_queue: String,
    pub job_definition: String,
    pub container_overrides: serde_json::Map<String, serde_json::Value>,
    pub depends_on: Vec<JobDependency>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDependency {
    pub job_id: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Raw response from a successful submit call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJobOutput {
    pub job_id: String,
    pub job_name: String,
}

/// One of the seven statuses a remote batch job can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Submitted,
    Pending,
    Runnable,
    Starting,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    pub fn is_warmup(self) -> bool {
        matches!(
            self,
            JobStatus::Submitted | JobStatus::Pending | JobStatus::Runnable
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Submitted => "SUBMITTED",
            JobStatus::Pending => "PENDING",
            JobStatus::Runnable => "RUNNABLE",
            JobStatus::Starting => "STARTING",
            JobStatus::Running => "RUNNING",
            JobStatus::Succeeded => "SUCCEEDED",
            JobStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// One entry from a describe-jobs response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDescription {
    pub job_id: String,
    pub job_name: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped_at: Option<DateTime<Utc>>,
}

/// Errors a transport can raise. `Throttled` is recovered locally by the
/// adapter that wraps the transport; everything else propagates.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("too many requests")]
    Throttled,

    #[error("transport client error: {0}")]
    Client(String),
}

/// The three operations an engine needs from a remote batch service.
#[async_trait]
pub trait RemoteBatchTransport: Send + Sync {
    async fn submit_job(&self, input: SubmitJobInput) -> Result<SubmitJobOutput, TransportError>;

    async fn describe_jobs(&self, job_ids: &[String])
    -> Result<Vec<JobDescription>, TransportError>;

    async fn terminate_job(&self, job_id: &str, reason: &str) -> Result<(), TransportError>;
}

/// A single job's scripted lifecycle inside [`MockTransport`]: the sequence
/// of statuses successive `describe_jobs` calls for this job will return,
/// advancing one entry per call until the sequence is exhausted (after which
/// the last entry repeats).
#[derive(Debug, Clone)]
struct MockJob {
    job_name: String,
    statuses: Vec<JobStatus>,
    status_reason: Option<String>,
    cursor: usize,
    created_at: DateTime<Utc>,
}

struct MockState {
    jobs: HashMap<String, MockJob>,
    scripted_statuses: HashMap<String, std::collections::VecDeque<Vec<JobStatus>>>,
    scripted_reason: HashMap<String, String>,
    throttle_submits_remaining: HashMap<String, u32>,
}

/// Deterministic in-memory transport for tests and the demo binary.
///
/// Job names can be pre-scripted with a status sequence (e.g.
/// `[SUBMITTED, RUNNABLE, RUNNING, SUCCEEDED]`); every `describe_jobs` call
/// advances the cursor by one. Each call to [`MockTransport::script_statuses`]
/// queues one sequence to be consumed by the *next* `submit_job` for that
/// job name (so a job that gets resubmitted after a scripted failure can be
/// given a different script for its second attempt); once the queue is
/// drained, unscripted submissions fall back to
/// `[SUBMITTED, RUNNABLE, RUNNING, SUCCEEDED]`. A job name can also be
/// scripted to return `Throttled` on its first N submit attempts, to
/// exercise the rate gate's retry path.
pub struct MockTransport {
    state: Mutex<MockState>,
    next_id: AtomicU64,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                jobs: HashMap::new(),
                scripted_statuses: HashMap::new(),
                scripted_reason: HashMap::new(),
                throttle_submits_remaining: HashMap::new(),
            }),
            next_id: AtomicU64::new(1),
        }
    }

    /// Queue a status sequence to be used by the next `submit_job` call for
    /// this job name. See the struct docs for the stacking semantics.
    pub async fn script_statuses(&self, job_name: &str, statuses: Vec<JobStatus>) {
        let mut state = self.state.lock().await;
        state
            .scripted_statuses
            .entry(job_name.to_string())
            .or_default()
            .push_back(statuses);
    }

    /// Attach a `statusReason` that will be present once the scripted
    /// sequence reaches a `FAILED` entry for this job name.
    pub async fn script_status_reason(&self, job_name: &str, reason: &str) {
        let mut state = self.state.lock().await;
        state
            .scripted_reason
            .insert(job_name.to_string(), reason.to_string());
    }

    /// Make the next `n` `submit_job` calls for this job name fail with
    /// `Throttled` before the `n + 1`th succeeds.
    pub async fn throttle_submits(&self, job_name: &str, n: u32) {
        let mut state = self.state.lock().await;
        state
            .throttle_submits_remaining
            .insert(job_name.to_string(), n);
    }
}

#[async_trait]
impl RemoteBatchTransport for MockTransport {
    async fn submit_job(&self, input: SubmitJobInput) -> Result<SubmitJobOutput, TransportError> {
        let mut state = self.state.lock().await;

        if let Some(remaining) = state.throttle_submits_remaining.get_mut(&input.job_name) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(TransportError::Throttled);
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let job_id = format!("mock-job-{id}");

        let statuses = state
            .scripted_statuses
            .get_mut(&input.job_name)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| {
                vec![
                    JobStatus::Submitted,
                    JobStatus::Runnable,
                    JobStatus::Running,
                    JobStatus::Succeeded,
                ]
            });
        let status_reason = state.scripted_reason.get(&input.job_name).cloned();

        state.jobs.insert(
            job_id.clone(),
            MockJob {
                job_name: input.job_name.clone(),
                statuses,
                status_reason,
                cursor: 0,
                created_at: Utc::now(),
            },
        );

        Ok(SubmitJobOutput {
            job_id,
            job_name: input.job_name,
        })
    }

    async fn describe_jobs(
        &self,
        job_ids: &[String],
    ) -> Result<Vec<JobDescription>, TransportError> {
        let mut state = self.state.lock().await;
        let mut out = Vec::with_capacity(job_ids.len());

        for id in job_ids {
            let Some(job) = state.jobs.get_mut(id) else {
                continue;
            };

            let idx = job.cursor.min(job.statuses.len() - 1);
            let status = job.statuses[idx];
            if job.cursor < job.statuses.len() - 1 {
                job.cursor += 1;
            }

            out.push(JobDescription {
                job_id: id.clone(),
                job_name: job.job_name.clone(),
                status,
                status_reason: if status == JobStatus::Failed {
                    job.status_reason.clone()
                } else {
                    None
                },
                created_at: Some(job.created_at),
                started_at: if status.is_terminal() || status == JobStatus::Running {
                    Some(job.created_at)
                } else {
                    None
                },
                stopped_at: if status.is_terminal() {
                    Some(Utc::now())
                } else {
                    None
                },
            });
        }

        Ok(out)
    }

    async fn terminate_job(&self, job_id: &str, reason: &str) -> Result<(), TransportError> {
        let mut state = self.state.lock().await;
        if let Some(job) = state.jobs.get_mut(job_id) {
            job.statuses = vec![JobStatus::Failed];
            job.cursor = 0;
            job.status_reason = Some(reason.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str) -> SubmitJobInput {
        SubmitJobInput {
            job_name: name.to_string(),
            job_queue: "demo-queue".to_string(),
            job_definition: "demo-def".to_string(),
            container_overrides: serde_json::Map::new(),
            depends_on: Vec::new(),
        }
    }

    #[tokio::test]
    async fn submit_then_describe_progresses_status() {
        let transport = MockTransport::new();
        let out = transport.submit_job(input("t-0000")).await.unwrap();

        let d1 = transport
            .describe_jobs(&[out.job_id.clone()])
            .await
            .unwrap();
        assert_eq!(d1[0].status, JobStatus::Submitted);

        let d2 = transport
            .describe_jobs(&[out.job_id.clone()])
            .await
            .unwrap();
        assert_eq!(d2[0].status, JobStatus::Runnable);
    }

    #[tokio::test]
    async fn throttled_submits_then_succeeds() {
        let transport = MockTransport::new();
        transport.throttle_submits("t-0001", 2).await;

        assert!(matches!(
            transport.submit_job(input("t-0001")).await,
            Err(TransportError::Throttled)
        ));
        assert!(matches!(
            transport.submit_job(input("t-0001")).await,
            Err(TransportError::Throttled)
        ));
        assert!(transport.submit_job(input("t-0001")).await.is_ok());
    }

    #[tokio::test]
    async fn describe_unknown_id_yields_empty() {
        let transport = MockTransport::new();
        let out = transport
            .describe_jobs(&["does-not-exist".to_string()])
            .await
            .unwrap();
        assert!(out.is_empty());
    }
}

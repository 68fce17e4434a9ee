//! The Job Record: the engine's in-memory handle for one logical unit of
//! work and its accumulated remote identifiers, attempts, and last-known
//! status.

use batch_api::{JobDependency, JobDescription, JobStatus, SubmitJobInput};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `job_name` is truncated to this many characters on construction; the
/// remote service rejects longer names outright.
pub const JOB_NAME_MAX_LEN: usize = 128;

/// Default per-job engine-level retry ceiling.
pub const DEFAULT_MAX_TRIES: u32 = 4;

/// One logical job and everything the engine has learned about it so far.
///
/// A `Job` exposes two distinct read-only projections, never a single
/// dict-shaped value used for both purposes: [`Job::submission_params`]
/// (consumed only by `submit`) and the record itself, `&Job` (consumed only
/// by the state store — see [`crate::store::StateStore`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_name: String,
    pub job_queue: String,
    pub job_definition: String,
    pub container_overrides: serde_json::Map<String, serde_json::Value>,
    pub depends_on: Vec<JobDependency>,

    pub job_id: Option<String>,
    pub status: Option<JobStatus>,
    pub job_submission: Option<serde_json::Value>,
    pub job_description: Option<JobDescription>,

    pub job_tries: Vec<String>,
    pub num_tries: u32,
    pub max_tries: u32,
}

impl Job {
    pub fn new(
        job_name: impl Into<String>,
        job_queue: impl Into<String>,
        job_definition: impl Into<String>,
    ) -> Self {
        let job_name = job_name.into();
        let job_name: String = job_name.chars().take(JOB_NAME_MAX_LEN).collect();

        Self {
            job_name,
            job_queue: job_queue.into(),
            job_definition: job_definition.into(),
            container_overrides: serde_json::Map::new(),
            depends_on: Vec::new(),
            job_id: None,
            status: None,
            job_submission: None,
            job_description: None,
            job_tries: Vec::new(),
            num_tries: 0,
            max_tries: DEFAULT_MAX_TRIES,
        }
    }

    /// Folds `command` into `container_overrides["command"]`, matching the
    /// remote API's own request shape.
    pub fn with_command(mut self, command: Vec<String>) -> Self {
        self.container_overrides.insert(
            "command".to_string(),
            serde_json::Value::Array(command.into_iter().map(serde_json::Value::String).collect()),
        );
        self
    }

    pub fn with_container_override(
        mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        self.container_overrides.insert(key.into(), value);
        self
    }

    pub fn depends_on(mut self, job_id: impl Into<String>) -> Self {
        self.depends_on.push(JobDependency {
            job_id: job_id.into(),
            kind: None,
        });
        self
    }

    pub fn with_max_tries(mut self, max_tries: u32) -> Self {
        self.max_tries = max_tries;
        self
    }

    /// The submission-parameter projection consumed only by `submit`.
    pub fn submission_params(&self) -> SubmitJobInput {
        SubmitJobInput {
            job_name: self.job_name.clone(),
            job_queue: self.job_queue.clone(),
            job_definition: self.job_definition.clone(),
            container_overrides: self.container_overrides.clone(),
            depends_on: self.depends_on.clone(),
        }
    }

    /// Clears `job_id`, `job_submission`, `job_description`, and `status`
    /// while preserving `job_name`, `job_tries`, `num_tries`, and
    /// `max_tries` — used to re-drive a job after a spot reclaim without
    /// losing its attempt history.
    pub fn reset(&mut self) {
        self.job_id = None;
        self.job_submission = None;
        self.job_description = None;
        self.status = None;
    }

    pub fn can_retry(&self) -> bool {
        self.num_tries < self.max_tries
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_some_and(JobStatus::is_terminal)
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.job_description.as_ref().and_then(|d| d.created_at)
    }

    pub fn started(&self) -> Option<DateTime<Utc>> {
        self.job_description.as_ref().and_then(|d| d.started_at)
    }

    pub fn stopped(&self) -> Option<DateTime<Utc>> {
        self.job_description.as_ref().and_then(|d| d.stopped_at)
    }

    /// Total time from creation to completion, when both are known.
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        Some(self.stopped()? - self.created()?)
    }

    /// Time actually spent running, when both are known.
    pub fn runtime(&self) -> Option<chrono::Duration> {
        Some(self.stopped()? - self.started()?)
    }

    /// Time spent queued before the job started running, when both are
    /// known.
    pub fn spinup(&self) -> Option<chrono::Duration> {
        Some(self.started()? - self.created()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_name_truncated_at_128() {
        let long_name = "x".repeat(200);
        let job = Job::new(long_name, "q", "d");
        assert_eq!(job.job_name.chars().count(), JOB_NAME_MAX_LEN);
    }

    #[test]
    fn job_name_truncation_does_not_panic_on_multibyte_chars() {
        let long_name = "€".repeat(200);
        let job = Job::new(long_name, "q", "d");
        assert_eq!(job.job_name.chars().count(), JOB_NAME_MAX_LEN);
    }

    #[test]
    fn command_folds_into_container_overrides() {
        let job = Job::new("t", "q", "d").with_command(vec!["echo".into(), "hi".into()]);
        assert_eq!(
            job.container_overrides.get("command"),
            Some(&serde_json::json!(["echo", "hi"]))
        );
    }

    #[test]
    fn reset_preserves_name_and_tries() {
        let mut job = Job::new("t", "q", "d");
        job.job_id = Some("J1".to_string());
        job.job_tries.push("J1".to_string());
        job.num_tries = 1;
        job.status = Some(JobStatus::Failed);

        job.reset();

        assert_eq!(job.job_name, "t");
        assert_eq!(job.job_tries, vec!["J1".to_string()]);
        assert_eq!(job.num_tries, 1);
        assert!(job.job_id.is_none());
        assert!(job.status.is_none());
    }

    #[test]
    fn num_tries_tracks_job_tries_len() {
        let mut job = Job::new("t", "q", "d");
        job.job_tries.push("J1".to_string());
        job.job_tries.push("J2".to_string());
        job.num_tries = job.job_tries.len() as u32;
        assert_eq!(job.num_tries, 2);
    }
}

//! Single-file JSON document-table state store backend.
//!
//! Suitable for a single engine instance on a single host: a single JSON
//! file holds one table, `aws-batch-jobs`, keyed by remote `job_id`. There
//! is no write-behind buffer — every `save` flushes the whole table to disk
//! before returning, so a crash immediately after a successful `save` never
//! loses that write.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use batch_api::JobStatus;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

use crate::error::{EngineError, EngineResult};
use crate::job::Job;
use crate::store::StateStore;

#[derive(Serialize, Deserialize, Default)]
struct Table {
    #[serde(rename = "aws-batch-jobs")]
    jobs: FxHashMap<String, Job>,
}

/// Single-file JSON state store.
pub struct JsonStore {
    path: PathBuf,
    cache: RwLock<FxHashMap<String, Job>>,
    write_lock: Mutex<()>,
}

impl JsonStore {
    pub async fn new(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let jobs = match fs::read_to_string(&path).await {
            Ok(content) if !content.trim().is_empty() => {
                serde_json::from_str::<Table>(&content)?.jobs
            }
            Ok(_) => FxHashMap::default(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FxHashMap::default(),
            Err(e) => return Err(EngineError::IoError(e)),
        };

        Ok(Self {
            path,
            cache: RwLock::new(jobs),
            write_lock: Mutex::new(()),
        })
    }

    pub async fn temp() -> EngineResult<Self> {
        let dir = std::env::temp_dir().join(format!("batch-engine-{}", uuid::Uuid::new_v4()));
        Self::new(dir.join("jobs.json")).await
    }

    async fn flush(&self, jobs: &FxHashMap<String, Job>) -> EngineResult<()> {
        let table = Table { jobs: jobs.clone() };
        let json = serde_json::to_string_pretty(&table)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json).await?;
        fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl StateStore for JsonStore {
    async fn save(&self, job: &Job) -> EngineResult<()> {
        let Some(job_id) = job.job_id.clone() else {
            warn!(job_name = %job.job_name, "FAIL to save job without job_id");
            return Ok(());
        };

        let _guard = self.write_lock.lock().await;
        let mut cache = self.cache.write().await;
        cache.insert(job_id, job.clone());
        self.flush(&cache).await
    }

    async fn find_by_job_id(&self, job_id: &str) -> EngineResult<Option<Job>> {
        Ok(self.cache.read().await.get(job_id).cloned())
    }

    async fn find_by_job_name(&self, job_name: &str) -> EngineResult<Vec<Job>> {
        Ok(self
            .cache
            .read()
            .await
            .values()
            .filter(|j| j.job_name == job_name)
            .cloned()
            .collect())
    }

    async fn remove_by_job_id(&self, job_id: &str) -> EngineResult<Option<Job>> {
        let _guard = self.write_lock.lock().await;
        let mut cache = self.cache.write().await;
        let removed = cache.remove(job_id);
        if removed.is_some() {
            self.flush(&cache).await?;
        }
        Ok(removed)
    }

    async fn remove_by_job_name(&self, job_name: &str) -> EngineResult<Vec<String>> {
        let _guard = self.write_lock.lock().await;
        let mut cache = self.cache.write().await;
        let ids: Vec<String> = cache
            .iter()
            .filter(|(_, j)| j.job_name == job_name)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &ids {
            cache.remove(id);
        }
        if !ids.is_empty() {
            self.flush(&cache).await?;
        }
        Ok(ids)
    }

    async fn find_by_job_status(&self, statuses: &[JobStatus]) -> EngineResult<Vec<Job>> {
        Ok(self
            .cache
            .read()
            .await
            .values()
            .filter(|j| j.status.is_some_and(|s| statuses.contains(&s)))
            .cloned()
            .collect())
    }

    async fn find_jobs_to_run(&self) -> EngineResult<Vec<Job>> {
        Ok(self
            .cache
            .read()
            .await
            .values()
            .filter(|j| j.status != Some(JobStatus::Succeeded))
            .cloned()
            .collect())
    }
}

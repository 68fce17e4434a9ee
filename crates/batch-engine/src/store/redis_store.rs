//! Remote key/value state store backend.
//!
//! Two logical namespaces under one Redis prefix: `jobs` (one key per
//! `job_id`, holding the serialized Job Record) and `logs`, reserved for
//! the out-of-scope log-retrieval concern so both stores share the same
//! key layout the system this was ported from uses. A secondary set index
//! maps `job_name -> {job_id}` so `find_by_job_name` doesn't require a scan.

use async_trait::async_trait;
use batch_api::JobStatus;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::warn;

use crate::error::EngineResult;
use crate::job::Job;
use crate::store::StateStore;

/// Atomically writes the job payload, adds it to its name index, and adds
/// it to the all-jobs index.
const SAVE_SCRIPT: &str = r#"
redis.call('SET', KEYS[1], ARGV[1])
redis.call('SADD', KEYS[2], ARGV[2])
redis.call('SADD', KEYS[3], ARGV[2])
return 1
"#;

pub struct RedisStore {
    conn: ConnectionManager,
    namespace: String,
}

impl RedisStore {
    pub async fn connect(url: &str, namespace: impl Into<String>) -> EngineResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self {
            conn,
            namespace: namespace.into(),
        })
    }

    fn job_key(&self, job_id: &str) -> String {
        format!("{}:jobs:data:{job_id}", self.namespace)
    }

    fn name_index_key(&self, job_name: &str) -> String {
        format!("{}:jobs:by-name:{job_name}", self.namespace)
    }

    fn all_jobs_key(&self) -> String {
        format!("{}:jobs:all", self.namespace)
    }

    async fn get_job(&self, conn: &mut ConnectionManager, job_id: &str) -> EngineResult<Option<Job>> {
        let raw: Option<String> = conn.get(self.job_key(job_id)).await?;
        Ok(match raw {
            Some(s) => Some(serde_json::from_str(&s)?),
            None => None,
        })
    }
}

#[async_trait]
impl StateStore for RedisStore {
    async fn save(&self, job: &Job) -> EngineResult<()> {
        let Some(job_id) = job.job_id.clone() else {
            warn!(job_name = %job.job_name, "FAIL to save job without job_id");
            return Ok(());
        };

        let payload = serde_json::to_string(job)?;
        let mut conn = self.conn.clone();
        redis::Script::new(SAVE_SCRIPT)
            .key(self.job_key(&job_id))
            .key(self.name_index_key(&job.job_name))
            .key(self.all_jobs_key())
            .arg(payload)
            .arg(job_id.as_str())
            .invoke_async::<i64>(&mut conn)
            .await?;

        Ok(())
    }

    async fn find_by_job_id(&self, job_id: &str) -> EngineResult<Option<Job>> {
        let mut conn = self.conn.clone();
        self.get_job(&mut conn, job_id).await
    }

    async fn find_by_job_name(&self, job_name: &str) -> EngineResult<Vec<Job>> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn.smembers(self.name_index_key(job_name)).await?;

        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(job) = self.get_job(&mut conn, &id).await? {
                out.push(job);
            }
        }
        Ok(out)
    }

    async fn remove_by_job_id(&self, job_id: &str) -> EngineResult<Option<Job>> {
        let mut conn = self.conn.clone();
        let Some(job) = self.get_job(&mut conn, job_id).await? else {
            return Ok(None);
        };

        conn.del::<_, ()>(self.job_key(job_id)).await?;
        conn.srem::<_, _, ()>(self.name_index_key(&job.job_name), job_id)
            .await?;
        conn.srem::<_, _, ()>(self.all_jobs_key(), job_id).await?;

        Ok(Some(job))
    }

    async fn remove_by_job_name(&self, job_name: &str) -> EngineResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn.smembers(self.name_index_key(job_name)).await?;

        for id in &ids {
            conn.del::<_, ()>(self.job_key(id)).await?;
            conn.srem::<_, _, ()>(self.all_jobs_key(), id).await?;
        }
        conn.del::<_, ()>(self.name_index_key(job_name)).await?;

        Ok(ids)
    }

    async fn find_by_job_status(&self, statuses: &[JobStatus]) -> EngineResult<Vec<Job>> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn.smembers(self.all_jobs_key()).await?;

        let mut out = Vec::new();
        for id in ids {
            if let Some(job) = self.get_job(&mut conn, &id).await? {
                if job.status.is_some_and(|s| statuses.contains(&s)) {
                    out.push(job);
                }
            }
        }
        Ok(out)
    }

    async fn find_jobs_to_run(&self) -> EngineResult<Vec<Job>> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn.smembers(self.all_jobs_key()).await?;

        let mut out = Vec::new();
        for id in ids {
            if let Some(job) = self.get_job(&mut conn, &id).await? {
                if job.status != Some(JobStatus::Succeeded) {
                    out.push(job);
                }
            }
        }
        Ok(out)
    }
}

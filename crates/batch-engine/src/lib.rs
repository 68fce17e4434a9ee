//! Client-side orchestrator for large batches of remote compute jobs.
//!
//! The core is a concurrent state machine that, for each job, drives
//! SUBMIT -> WAIT -> COMPLETE/RETRY transitions while coordinating a
//! rate-limited client against a remote batch API and a durable job-state
//! store used for crash recovery and deduplication by logical job name.
//!
//! ```ignore
//! use std::sync::Arc;
//! use batch_api::MockTransport;
//! use batch_engine::{BatchRunner, EngineConfig, Job, JsonStore, RateGate, RemoteApiAdapter};
//!
//! # async fn example() -> batch_engine::error::EngineResult<()> {
//! let config = EngineConfig::default();
//! let transport = Arc::new(MockTransport::new());
//! let adapter = RemoteApiAdapter::new(transport, RateGate::new(config.gate_width), &config);
//! let store: Arc<dyn batch_engine::store::StateStore> = Arc::new(JsonStore::temp().await?);
//!
//! let jobs = vec![Job::new("demo-0000", "demo-queue", "demo-def")];
//! let jobs = store.jobs_to_run(&jobs).await?;
//!
//! let runner = BatchRunner::new(&adapter, store, &config);
//! let _outcomes = runner.run(jobs).await;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod config;
pub mod error;
pub mod job;
pub mod manager;
pub mod query;
pub mod rate_gate;
pub mod runner;
pub mod store;
pub mod waiter;

pub use adapter::RemoteApiAdapter;
pub use config::{EngineConfig, StateStoreConfig};
pub use error::{EngineError, EngineResult};
pub use job::Job;
pub use manager::JobManager;
pub use rate_gate::RateGate;
pub use runner::{BatchRunner, RunOutcome};
pub use store::StateStore;
pub use store::json_store::JsonStore;
pub use store::redis_store::RedisStore;
pub use waiter::JobWaiter;

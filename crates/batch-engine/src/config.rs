//! Engine configuration: pacing, retry ceilings, and state store selection.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where the engine's state store lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StateStoreConfig {
    /// Single JSON file holding the job table.
    JsonFile { path: PathBuf },
    /// Remote key/value server.
    Redis {
        url: String,
        #[serde(default = "default_namespace")]
        namespace: String,
    },
}

fn default_namespace() -> String {
    "aws-batch".to_string()
}

impl Default for StateStoreConfig {
    fn default() -> Self {
        StateStoreConfig::JsonFile {
            path: default_state_dir().join("jobs.json"),
        }
    }
}

/// Resolves the on-disk state directory the same way `arvak-sched`'s own
/// `SchedulerConfig::default()` does: an explicit override env var first,
/// then XDG state home, then a dotfile under `$HOME`.
fn default_state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("BATCH_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(dir) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(dir).join("aws-batch");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local/state/aws-batch");
    }
    PathBuf::from(".aws-batch-state")
}

/// Tunable pacing, retry, and concurrency parameters threaded through the
/// Runner, Manager, Waiter, and Adapter at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Adapter retry ceiling per call.
    pub retries: u32,
    /// Base warm-up pacing in seconds; actual sleep is `U(start_pause, 2 * start_pause)`.
    pub start_pause: f64,
    /// Steady-state poll pacing lower bound in seconds.
    pub min_pause: f64,
    /// Steady-state poll pacing upper bound in seconds.
    pub max_pause: f64,
    /// Throttle-retry jitter sleep lower bound in seconds.
    pub min_jitter: f64,
    /// Throttle-retry jitter sleep upper bound in seconds.
    pub max_jitter: f64,
    /// Rate Gate concurrency.
    pub gate_width: usize,
    /// State store backend selection.
    pub state_store: StateStoreConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retries: 5,
            start_pause: 1.0,
            min_pause: 1.0,
            max_pause: 10.0,
            min_jitter: 0.1,
            max_jitter: 1.0,
            gate_width: 10,
            state_store: StateStoreConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_documented_defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.retries, 5);
        assert_eq!(cfg.gate_width, 10);
        assert!(matches!(cfg.state_store, StateStoreConfig::JsonFile { .. }));
    }

    #[test]
    fn state_dir_override_is_respected() {
        // SAFETY: test-only env mutation, single-threaded within this test.
        unsafe {
            std::env::set_var("BATCH_STATE_DIR", "/tmp/batch-engine-test-state");
        }
        let dir = default_state_dir();
        unsafe {
            std::env::remove_var("BATCH_STATE_DIR");
        }
        assert_eq!(dir, PathBuf::from("/tmp/batch-engine-test-state"));
    }
}

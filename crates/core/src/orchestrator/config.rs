//! Dispatch configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::query::PollPolicy;

/// Configuration for the dispatch orchestrator and its query runners.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// How often a runner checks its remote job status (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Status checks per job, across all its submissions, before the job is
    /// declared timed out. Together with the interval this caps wall-clock
    /// polling time per job.
    #[serde(default = "default_max_poll_iterations")]
    pub max_poll_iterations: u32,

    /// Total submissions per job (first attempt included).
    #[serde(default = "default_max_launch_attempts")]
    pub max_launch_attempts: u32,

    /// Pause before re-submitting after a failed attempt (milliseconds).
    #[serde(default = "default_launch_retry_delay")]
    pub launch_retry_delay_ms: u64,

    /// Maximum concurrent workers (0 = one worker per job).
    #[serde(default)]
    pub max_concurrent_jobs: usize,
}

fn default_poll_interval() -> u64 {
    30_000 // 30 seconds
}

fn default_max_poll_iterations() -> u32 {
    480 // 4 hours at the default interval
}

fn default_max_launch_attempts() -> u32 {
    3
}

fn default_launch_retry_delay() -> u64 {
    5_000
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            max_poll_iterations: default_max_poll_iterations(),
            max_launch_attempts: default_max_launch_attempts(),
            launch_retry_delay_ms: default_launch_retry_delay(),
            max_concurrent_jobs: 0,
        }
    }
}

impl DispatchConfig {
    /// Poll/retry policy handed to each query runner.
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_poll_iterations: self.max_poll_iterations,
            max_launch_attempts: self.max_launch_attempts,
            launch_retry_delay: Duration::from_millis(self.launch_retry_delay_ms),
        }
    }

    /// Number of workers allowed to run at once for a batch of `batch_size` jobs.
    pub fn worker_limit(&self, batch_size: usize) -> usize {
        if self.max_concurrent_jobs == 0 {
            batch_size
        } else {
            self.max_concurrent_jobs.min(batch_size)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DispatchConfig::default();
        assert_eq!(config.poll_interval_ms, 30_000);
        assert_eq!(config.max_poll_iterations, 480);
        assert_eq!(config.max_launch_attempts, 3);
        assert_eq!(config.max_concurrent_jobs, 0);
    }

    #[test]
    fn test_deserialize_minimal() {
        let config: DispatchConfig = toml::from_str("").unwrap();
        assert_eq!(config.max_launch_attempts, 3);
        assert_eq!(config.launch_retry_delay_ms, 5_000);
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
            poll_interval_ms = 1000
            max_poll_iterations = 10
            max_launch_attempts = 5
            launch_retry_delay_ms = 0
            max_concurrent_jobs = 2
        "#;
        let config: DispatchConfig = toml::from_str(toml).unwrap();
        let policy = config.poll_policy();
        assert_eq!(policy.poll_interval, Duration::from_secs(1));
        assert_eq!(policy.max_poll_iterations, 10);
        assert_eq!(policy.max_launch_attempts, 5);
        assert_eq!(policy.launch_retry_delay, Duration::ZERO);
    }

    #[test]
    fn test_worker_limit() {
        let unlimited = DispatchConfig::default();
        assert_eq!(unlimited.worker_limit(7), 7);

        let capped = DispatchConfig {
            max_concurrent_jobs: 3,
            ..Default::default()
        };
        assert_eq!(capped.worker_limit(7), 3);
        assert_eq!(capped.worker_limit(2), 2);
    }
}

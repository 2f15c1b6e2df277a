//! Dispatch orchestrator implementation.
//!
//! One spawned task per job, optionally capped by a semaphore. Each task
//! owns its job from submission to outcome; the orchestrator only joins.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tracing::{error, info, info_span, warn, Instrument};

use crate::metrics::QUERY_DURATION;
use crate::query::{QueryResult, QueryRunner};

use super::config::DispatchConfig;
use super::types::{Outcome, QueryJob};
use super::validator::{validate_completeness, Completeness};

/// Runs a batch of query jobs concurrently and collects one outcome per job.
pub struct DispatchOrchestrator {
    config: DispatchConfig,
    runner: Arc<QueryRunner>,
}

impl DispatchOrchestrator {
    /// Create a new orchestrator.
    pub fn new(config: DispatchConfig, runner: Arc<QueryRunner>) -> Self {
        Self { config, runner }
    }

    /// Dispatch every job and wait for all of them.
    ///
    /// Returns exactly one outcome per input job, in completion order.
    /// A failing or crashing worker becomes an `Error` outcome for its own
    /// job and never affects its siblings.
    pub async fn dispatch(&self, jobs: Vec<QueryJob>) -> Vec<Outcome> {
        if jobs.is_empty() {
            info!("No jobs to dispatch");
            return Vec::new();
        }

        let total = jobs.len();
        let workers = self.config.worker_limit(total);
        let permits = Arc::new(Semaphore::new(workers));
        info!(jobs = total, workers, "Beginning the concurrent processing");

        let mut pending = FuturesUnordered::new();
        for job in jobs {
            let runner = Arc::clone(&self.runner);
            let permits = Arc::clone(&permits);
            let worker_job = job.clone();
            let span = info_span!("worker", ticket = %job.job_key());

            let handle = tokio::spawn(
                async move {
                    let _permit = match permits.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => {
                            return Outcome::Error {
                                job: worker_job,
                                reason: "worker pool closed".to_string(),
                            }
                        }
                    };
                    Self::process_job(&runner, worker_job).await
                }
                .instrument(span),
            );

            pending.push(async move {
                match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        error!(ticket = %job.job_key(), error = %e, "Worker crashed");
                        Outcome::Error {
                            job,
                            reason: format!("worker crashed: {}", e),
                        }
                    }
                }
            });
        }

        let mut outcomes = Vec::with_capacity(total);
        while let Some(outcome) = pending.next().await {
            outcomes.push(outcome);
        }

        info!(outcomes = outcomes.len(), "Concluded the concurrent processing");
        outcomes
    }

    /// Run one job through the runner and the completeness check.
    async fn process_job(runner: &QueryRunner, job: QueryJob) -> Outcome {
        let started = Instant::now();
        info!(
            study_id = job.study_id(),
            provider_id = %job.resolved_id(),
            range_start = %job.range_start(),
            range_end = %job.range_end(),
            "Launching query"
        );

        let outcome = match runner.run(&job).await {
            Ok(result) => {
                let completeness = validate_completeness(&result, job.required_boundary());
                match (completeness, result) {
                    (Completeness::Pass, QueryResult::Data(summary)) => {
                        Outcome::Success { job, summary }
                    }
                    (_, result) => Outcome::Incomplete {
                        latest_date: result.latest_date(),
                        job,
                    },
                }
            }
            Err(e) => {
                warn!(error = %e, "Query job failed");
                Outcome::Error {
                    reason: e.reason(),
                    job,
                }
            }
        };

        QUERY_DURATION
            .with_label_values(&[outcome.kind()])
            .observe(started.elapsed().as_secs_f64());
        info!(outcome = outcome.kind(), "End of worker");
        outcome
    }
}

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info};

use crate::engine::jobs::JobStore;
use crate::engine::pool::DriverPool;
use crate::error::{JobStoreError, MatchError, PoolError};
use crate::models::driver::{Driver, DriverId};
use crate::models::job::Job;
use crate::models::matching::{MatchResult, NoMatchReason};
use crate::observability::metrics::Metrics;
use crate::routing::RouteEstimator;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub driver_id: DriverId,
    pub empty_miles_km: f64,
}

pub const DEFAULT_ESTIMATE_CONCURRENCY: usize = 8;

/// Ascending empty miles, ties broken by ascending driver id.
pub fn rank_candidates(mut scored: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
    // Adding +0.0 turns -0.0 into +0.0, so the sign of zero never decides a tie.
    for candidate in &mut scored {
        candidate.empty_miles_km += 0.0;
    }
    scored.sort_by(|a, b| {
        a.empty_miles_km
            .total_cmp(&b.empty_miles_km)
            .then(a.driver_id.cmp(&b.driver_id))
    });
    scored
}

pub fn validate_capacity(required_capacity: f64) -> Result<(), MatchError> {
    if required_capacity.is_finite() && required_capacity > 0.0 {
        Ok(())
    } else {
        Err(MatchError::Validation(format!(
            "required capacity must be > 0, got {required_capacity}"
        )))
    }
}

pub struct MatchingEngine {
    pool: Arc<dyn DriverPool>,
    jobs: Arc<dyn JobStore>,
    estimator: RouteEstimator,
    metrics: Metrics,
    estimate_concurrency: usize,
}

impl MatchingEngine {
    pub fn new(
        pool: Arc<dyn DriverPool>,
        jobs: Arc<dyn JobStore>,
        estimator: RouteEstimator,
        metrics: Metrics,
    ) -> Self {
        Self {
            pool,
            jobs,
            estimator,
            metrics,
            estimate_concurrency: DEFAULT_ESTIMATE_CONCURRENCY,
        }
    }

    /// Caps in-flight routing calls per pass. Zero is treated as one.
    pub fn with_estimate_concurrency(mut self, limit: usize) -> Self {
        self.estimate_concurrency = limit.max(1);
        self
    }

    /// The job must already be in the job store.
    pub async fn match_job(&self, job: &Job) -> Result<MatchResult, MatchError> {
        let start = Instant::now();
        let outcome = self.run_pass(job).await;

        let label = match &outcome {
            Ok(MatchResult::Matched { .. }) => "matched",
            Ok(MatchResult::NoMatch {
                reason: NoMatchReason::JobCancelled,
            }) => "cancelled",
            Ok(MatchResult::NoMatch { .. }) => "no_match",
            Err(_) => "error",
        };
        self.metrics
            .match_latency_seconds
            .with_label_values(&[label])
            .observe(start.elapsed().as_secs_f64());
        self.metrics.matches_total.with_label_values(&[label]).inc();

        outcome
    }

    async fn run_pass(&self, job: &Job) -> Result<MatchResult, MatchError> {
        validate_capacity(job.required_capacity)?;

        let eligible: Vec<Driver> = self
            .pool
            .query_candidates(&job.pickup)
            .into_iter()
            .filter(|driver| driver.is_eligible_for(job.required_capacity))
            .collect();

        if eligible.is_empty() {
            info!(job_id = %job.id, "no eligible drivers");
            return Ok(MatchResult::no_suitable_driver());
        }

        let estimates: Vec<_> = eligible
            .iter()
            .map(|driver| async move {
                let estimate = self.estimator.estimate(&driver.location, &job.pickup).await;
                ScoredCandidate {
                    driver_id: driver.id,
                    empty_miles_km: estimate.distance_km,
                }
            })
            .collect();
        let scored: Vec<ScoredCandidate> = stream::iter(estimates)
            .buffered(self.estimate_concurrency)
            .collect()
            .await;

        // Each candidate is tried at most once, so the loop is bounded by the pool snapshot.
        for candidate in rank_candidates(scored) {
            if self.jobs.is_cancelled(job.id) {
                info!(job_id = %job.id, "job cancelled before reservation");
                return Ok(cancelled());
            }

            match self
                .pool
                .reserve(candidate.driver_id, job.id, job.required_capacity)
            {
                Ok(_) => {}
                Err(err @ PoolError::ReservationConflict { .. }) => {
                    self.metrics.reservation_conflicts_total.inc();
                    debug!(job_id = %job.id, error = %err, "lost reservation race; trying next candidate");
                    continue;
                }
                Err(err) => {
                    debug!(job_id = %job.id, error = %err, "candidate dropped out; trying next candidate");
                    continue;
                }
            }

            return match self.jobs.assign(job.id, candidate.driver_id) {
                Ok(_) => {
                    info!(
                        job_id = %job.id,
                        driver_id = candidate.driver_id,
                        empty_miles_km = candidate.empty_miles_km,
                        "job matched"
                    );
                    Ok(MatchResult::Matched {
                        driver_id: candidate.driver_id,
                        empty_miles_km: round_km(candidate.empty_miles_km),
                    })
                }
                Err(JobStoreError::Cancelled(_)) => {
                    info!(job_id = %job.id, driver_id = candidate.driver_id, "job cancelled during reservation; releasing driver");
                    self.release(candidate.driver_id);
                    Ok(cancelled())
                }
                Err(err) => {
                    self.release(candidate.driver_id);
                    Err(MatchError::Job(err))
                }
            };
        }

        info!(job_id = %job.id, "all candidates claimed by concurrent matches");
        Ok(MatchResult::no_suitable_driver())
    }

    fn release(&self, driver_id: DriverId) {
        if let Err(err) = self.pool.release(driver_id) {
            error!(driver_id, error = %err, "failed to release reservation");
        }
    }
}

// Responses carry two decimals; ranking uses the raw estimate.
fn round_km(km: f64) -> f64 {
    (km * 100.0).round() / 100.0
}

fn cancelled() -> MatchResult {
    MatchResult::NoMatch {
        reason: NoMatchReason::JobCancelled,
    }
}

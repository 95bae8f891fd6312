pub mod ors;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::RoutingError;
use crate::geo::haversine_km;
use crate::models::driver::GeoPoint;
use crate::models::route::RouteEstimate;
use crate::observability::metrics::Metrics;

const AVERAGE_SPEED_KMH: f64 = 60.0;

// Pricing downstream relies on these exact values.
pub const FALLBACK_ESTIMATE: RouteEstimate = RouteEstimate {
    distance_km: 10.0,
    duration_minutes: 15.0,
};

#[async_trait]
pub trait RouteProvider: Send + Sync {
    async fn route(&self, from: GeoPoint, to: GeoPoint) -> Result<RouteEstimate, RoutingError>;
}

#[derive(Clone)]
pub struct RouteEstimator {
    provider: Option<Arc<dyn RouteProvider>>,
    timeout: Duration,
    metrics: Metrics,
}

impl RouteEstimator {
    pub fn local(metrics: Metrics) -> Self {
        Self {
            provider: None,
            timeout: Duration::ZERO,
            metrics,
        }
    }

    pub fn with_provider(provider: Arc<dyn RouteProvider>, timeout: Duration, metrics: Metrics) -> Self {
        Self {
            provider: Some(provider),
            timeout,
            metrics,
        }
    }

    pub async fn estimate(&self, from: &GeoPoint, to: &GeoPoint) -> RouteEstimate {
        let Some(provider) = &self.provider else {
            return self.approximate(from, to);
        };

        let outcome = match tokio::time::timeout(self.timeout, provider.route(*from, *to)).await {
            Ok(Ok(estimate)) if estimate.is_valid() => Ok(estimate),
            Ok(Ok(estimate)) => Err(RoutingError::Malformed(format!(
                "distance {} km, duration {} min",
                estimate.distance_km, estimate.duration_minutes
            ))),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(RoutingError::Timeout(self.timeout.as_millis())),
        };

        match outcome {
            Ok(estimate) => {
                self.record("provider");
                estimate
            }
            Err(err) => {
                warn!(error = %err, "routing provider failed; using fallback estimate");
                self.record("fallback");
                FALLBACK_ESTIMATE
            }
        }
    }

    fn approximate(&self, from: &GeoPoint, to: &GeoPoint) -> RouteEstimate {
        match haversine_estimate(from, to) {
            Some(estimate) => {
                self.record("haversine");
                estimate
            }
            None => {
                warn!(?from, ?to, "haversine approximation not finite; using fallback estimate");
                self.record("fallback");
                FALLBACK_ESTIMATE
            }
        }
    }

    fn record(&self, source: &str) {
        self.metrics
            .route_estimates_total
            .with_label_values(&[source])
            .inc();
    }
}

pub fn haversine_estimate(from: &GeoPoint, to: &GeoPoint) -> Option<RouteEstimate> {
    let distance_km = haversine_km(from, to);
    let estimate = RouteEstimate {
        distance_km,
        duration_minutes: distance_km / AVERAGE_SPEED_KMH * 60.0,
    };
    estimate.is_valid().then_some(estimate)
}

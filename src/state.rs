use std::sync::Arc;

use crate::collaborators::finance::HttpFinanceClient;
use crate::collaborators::legal::HttpComplianceClient;
use crate::config::Config;
use crate::engine::jobs::InMemoryJobStore;
use crate::engine::pool::InMemoryDriverPool;
use crate::error::AppError;
use crate::observability::metrics::Metrics;
use crate::routing::RouteEstimator;
use crate::routing::ors::OrsRouteProvider;
use crate::service::DispatchService;

pub struct AppState {
    pub dispatch: DispatchService,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(dispatch: DispatchService, metrics: Metrics) -> Self {
        Self { dispatch, metrics }
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let metrics = Metrics::new();

        let pool = Arc::new(
            InMemoryDriverPool::new(metrics.clone()).with_search_radius(config.candidate_radius_km),
        );

        let estimator = match &config.routing_provider_url {
            Some(url) => {
                let provider = OrsRouteProvider::new(
                    url,
                    &config.routing_profile,
                    config.routing_api_key.clone(),
                    config.routing_timeout,
                )
                .map_err(|err| AppError::Internal(format!("routing provider setup failed: {err}")))?;
                RouteEstimator::with_provider(Arc::new(provider), config.routing_timeout, metrics.clone())
            }
            None => RouteEstimator::local(metrics.clone()),
        };

        let mut dispatch = DispatchService::new(
            pool,
            Arc::new(InMemoryJobStore::new()),
            estimator,
            metrics.clone(),
            config.event_buffer_size,
        )
        .with_default_base_price(config.default_base_price)
        .with_estimate_concurrency(config.routing_concurrency);

        if let Some(url) = &config.legal_service_url {
            let client = HttpComplianceClient::new(url, config.collaborator_timeout)
                .map_err(|err| AppError::Internal(format!("legal client setup failed: {err}")))?;
            dispatch = dispatch.with_compliance(Arc::new(client));
        }

        if let Some(url) = &config.finance_service_url {
            let client = HttpFinanceClient::new(url, config.collaborator_timeout)
                .map_err(|err| AppError::Internal(format!("finance client setup failed: {err}")))?;
            dispatch = dispatch.with_finance(Arc::new(client));
        }

        Ok(Self::new(dispatch, metrics))
    }
}

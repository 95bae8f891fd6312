use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub matches_total: IntCounterVec,
    pub match_latency_seconds: HistogramVec,
    pub route_estimates_total: IntCounterVec,
    pub reservation_conflicts_total: IntCounter,
    pub drivers_reserved: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let matches_total = IntCounterVec::new(
            Opts::new("matches_total", "Total matching passes by outcome"),
            &["outcome"],
        )
        .expect("valid matches_total metric");

        let match_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "match_latency_seconds",
                "Latency of one matching pass in seconds",
            ),
            &["outcome"],
        )
        .expect("valid match_latency_seconds metric");

        let route_estimates_total = IntCounterVec::new(
            Opts::new(
                "route_estimates_total",
                "Route estimates by source (provider, haversine, fallback)",
            ),
            &["source"],
        )
        .expect("valid route_estimates_total metric");

        let reservation_conflicts_total = IntCounter::new(
            "reservation_conflicts_total",
            "Reservation attempts lost to a concurrent match",
        )
        .expect("valid reservation_conflicts_total metric");

        let drivers_reserved = IntGauge::new("drivers_reserved", "Drivers currently reserved")
            .expect("valid drivers_reserved metric");

        registry
            .register(Box::new(matches_total.clone()))
            .expect("register matches_total");
        registry
            .register(Box::new(match_latency_seconds.clone()))
            .expect("register match_latency_seconds");
        registry
            .register(Box::new(route_estimates_total.clone()))
            .expect("register route_estimates_total");
        registry
            .register(Box::new(reservation_conflicts_total.clone()))
            .expect("register reservation_conflicts_total");
        registry
            .register(Box::new(drivers_reserved.clone()))
            .expect("register drivers_reserved");

        Self {
            registry,
            matches_total,
            match_latency_seconds,
            route_estimates_total,
            reservation_conflicts_total,
            drivers_reserved,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family, gauge::Gauge},
    registry::Registry,
};

/// Label for probe outcomes.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct OutcomeLabel {
    pub status: String,
}

/// Metrics for the probe actor.
#[derive(Clone, Default)]
pub struct Metrics {
    /// Number of probes issued
    pub issued: Counter,
    /// Number of awaited probes by outcome
    pub outcomes: Family<OutcomeLabel, Counter>,
    /// Current number of probes waiting for completion
    pub pending: Gauge,
}

impl Metrics {
    /// Create and return a new set of metrics, registered with the given registry.
    pub fn init(registry: &mut Registry) -> Self {
        let metrics = Self::default();
        registry.register("probes_issued", "Number of probes issued", metrics.issued.clone());
        registry.register(
            "probe_outcomes",
            "Number of awaited probes by outcome",
            metrics.outcomes.clone(),
        );
        registry.register(
            "probes_pending",
            "Current number of probes waiting for completion",
            metrics.pending.clone(),
        );
        metrics
    }
}

//! Prometheus metrics definitions for Weathervane
//!
//! All metrics use the `weathervane_` prefix and are read-only.

use prometheus::{
    CounterVec, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
    core::{AtomicF64, GenericGauge},
};
use std::sync::Arc;

/// Prometheus metrics for the fusion engine
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Upstream fetches by source and outcome
    pub fetches_total: CounterVec,
    /// Upstream fetch latency in seconds
    pub fetch_latency_seconds: HistogramVec,
    /// Rows in the most recent aligned dataset
    pub aligned_rows: GenericGauge<AtomicF64>,
    /// Service operations by name and outcome
    pub analyses_total: CounterVec,
    /// Model training runs by model and outcome
    pub model_trainings_total: CounterVec,
}

impl Metrics {
    /// Create a new Metrics instance with all gauges and counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let fetches_total = CounterVec::new(
            Opts::new(
                "weathervane_fetches_total",
                "Upstream fetches by source and outcome",
            ),
            &["source", "outcome"],
        )?;
        registry.register(Box::new(fetches_total.clone()))?;

        let fetch_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "weathervane_fetch_latency_seconds",
                "Upstream fetch latency in seconds",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
            &["source"],
        )?;
        registry.register(Box::new(fetch_latency_seconds.clone()))?;

        let aligned_rows = Gauge::with_opts(Opts::new(
            "weathervane_aligned_rows",
            "Rows in the most recent aligned dataset",
        ))?;
        registry.register(Box::new(aligned_rows.clone()))?;

        let analyses_total = CounterVec::new(
            Opts::new(
                "weathervane_analyses_total",
                "Service operations by name and outcome",
            ),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(analyses_total.clone()))?;

        let model_trainings_total = CounterVec::new(
            Opts::new(
                "weathervane_model_trainings_total",
                "Model training runs by model and outcome",
            ),
            &["model", "outcome"],
        )?;
        registry.register(Box::new(model_trainings_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            fetches_total,
            fetch_latency_seconds,
            aligned_rows,
            analyses_total,
            model_trainings_total,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn inc_fetch(&self, source: &str, outcome: &str) {
        self.fetches_total
            .with_label_values(&[source, outcome])
            .inc();
    }

    pub fn observe_fetch_latency(&self, source: &str, latency: f64) {
        self.fetch_latency_seconds
            .with_label_values(&[source])
            .observe(latency);
    }

    pub fn inc_analysis(&self, operation: &str, outcome: &str) {
        self.analyses_total
            .with_label_values(&[operation, outcome])
            .inc();
    }

    pub fn inc_training(&self, model: &str, outcome: &str) {
        self.model_trainings_total
            .with_label_values(&[model, outcome])
            .inc();
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create default Metrics")
    }
}

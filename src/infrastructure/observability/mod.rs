//! Pull-free observability for Weathervane
//!
//! Metrics are collected in a private Prometheus registry and rendered as text
//! on demand (the CLI prints them with `--metrics`). No HTTP endpoint is exposed.

pub mod metrics;

pub use metrics::Metrics;

//! Metrics collection and export for courier.
//!
//! This crate provides a unified metrics interface using the `metrics` crate facade.
//! When the `prometheus` feature is enabled, metrics are exported in Prometheus format.
//!
//! # Usage
//!
//! ```rust,ignore
//! use courier_metrics::{counter, histogram, pre_classifier, labels};
//!
//! counter!(pre_classifier::OUTCOMES_TOTAL, labels::ACTION => "STOP").increment(1);
//! histogram!(pre_classifier::DURATION_SECONDS).record(0.012);
//! ```

mod definitions;
mod recorder;

pub use {
    definitions::*,
    recorder::{MetricsHandle, MetricsRecorderConfig, init_metrics},
};

// Re-export metrics macros for convenience
pub use metrics::{counter, histogram};

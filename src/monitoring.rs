//! Prometheus metrics for submission monitoring.
//!
//! Transitions always emit `metrics` crate counters; this module adds an
//! optional Prometheus registry, behind the `metrics` feature, that an
//! orchestrator records into when attached with `with_metrics`.

#[cfg(feature = "metrics")]
use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry};
#[cfg(feature = "metrics")]
use std::time::Duration;

#[cfg(feature = "metrics")]
use crate::error::Result;

/// Prometheus metrics for the submission workflow.
#[cfg(feature = "metrics")]
#[derive(Clone)]
pub struct LeadCaptureMetrics {
    registry: Registry,
    submissions_total: CounterVec,
    notification_failures_total: CounterVec,
    submit_duration_seconds: HistogramVec,
}

#[cfg(feature = "metrics")]
impl LeadCaptureMetrics {
    /// Create the metrics and register them with `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric fails to register (e.g., duplicate registration).
    pub fn new(registry: Registry) -> Result<Self> {
        let submissions_total = CounterVec::new(
            Opts::new(
                "leadcapture_submissions_total",
                "Form submissions by outcome",
            ),
            &["outcome"],
        )
        .map_err(|e| anyhow::anyhow!("Failed to create submissions_total counter: {}", e))?;

        let notification_failures_total = CounterVec::new(
            Opts::new(
                "leadcapture_notification_failures_total",
                "Confirmation notifications that failed after the lead was stored",
            ),
            &["industry"],
        )
        .map_err(|e| {
            anyhow::anyhow!("Failed to create notification_failures_total counter: {}", e)
        })?;

        let submit_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "leadcapture_submit_duration_seconds",
                "Time from submit to outcome, in seconds",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["outcome"],
        )
        .map_err(|e| anyhow::anyhow!("Failed to create submit_duration_seconds histogram: {}", e))?;

        registry
            .register(Box::new(submissions_total.clone()))
            .map_err(|e| anyhow::anyhow!("Failed to register submissions_total: {}", e))?;
        registry
            .register(Box::new(notification_failures_total.clone()))
            .map_err(|e| {
                anyhow::anyhow!("Failed to register notification_failures_total: {}", e)
            })?;
        registry
            .register(Box::new(submit_duration_seconds.clone()))
            .map_err(|e| anyhow::anyhow!("Failed to register submit_duration_seconds: {}", e))?;

        Ok(Self {
            registry,
            submissions_total,
            notification_failures_total,
            submit_duration_seconds,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record a finished submit call.
    ///
    /// `outcome` should be one of `succeeded`, `rejected`, `failed`, `ignored`.
    pub fn record_submission(&self, outcome: &str, duration: Duration) {
        self.submissions_total.with_label_values(&[outcome]).inc();
        self.submit_duration_seconds
            .with_label_values(&[outcome])
            .observe(duration.as_secs_f64());
    }

    pub fn record_notification_failure(&self, industry: &str) {
        self.notification_failures_total
            .with_label_values(&[industry])
            .inc();
    }
}

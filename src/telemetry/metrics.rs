//! Prometheus metrics

use std::net::SocketAddr;
use std::time::Duration;

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Completed scan cycles, successful or not
    Cycles,
    /// Cycles that ended on a feed error
    FetchFailures,
    /// Cycles aborted by a storage error
    StorageFailures,
    /// Raw records that could not be parsed
    MalformedRecords,
    /// Pair records fetched
    CandidatesFetched,
    /// Snapshots admitted by the filter
    Admitted,
    /// Alerts confirmed delivered
    Dispatched,
    /// Delivery attempts that failed
    DeliveryFailures,
    /// Admitted candidates pushed to a later cycle by the cap
    Deferred,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Consecutive failed cycles
    ConsecutiveFailures,
    /// Deliveries awaiting a durable mark
    PendingMarks,
}

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// Whole scan cycle
    Cycle,
    /// Candidate fetch
    Fetch,
}

fn counter_name(metric: CounterMetric) -> &'static str {
    match metric {
        CounterMetric::Cycles => "pairwatch_cycles_total",
        CounterMetric::FetchFailures => "pairwatch_fetch_failures_total",
        CounterMetric::StorageFailures => "pairwatch_storage_failures_total",
        CounterMetric::MalformedRecords => "pairwatch_malformed_records_total",
        CounterMetric::CandidatesFetched => "pairwatch_candidates_fetched_total",
        CounterMetric::Admitted => "pairwatch_admitted_total",
        CounterMetric::Dispatched => "pairwatch_dispatched_total",
        CounterMetric::DeliveryFailures => "pairwatch_delivery_failures_total",
        CounterMetric::Deferred => "pairwatch_deferred_total",
    }
}

/// Add to a counter
pub fn increment(metric: CounterMetric, value: u64) {
    if value > 0 {
        metrics::counter!(counter_name(metric)).increment(value);
    }
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let metric_name = match metric {
        GaugeMetric::ConsecutiveFailures => "pairwatch_consecutive_failures",
        GaugeMetric::PendingMarks => "pairwatch_pending_marks",
    };
    metrics::gauge!(metric_name).set(value);
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    let metric_name = match metric {
        LatencyMetric::Cycle => "pairwatch_cycle_duration_seconds",
        LatencyMetric::Fetch => "pairwatch_fetch_duration_seconds",
    };
    metrics::histogram!(metric_name).record(duration.as_secs_f64());
}

/// Serve `/metrics` on all interfaces. Must run inside the Tokio runtime.
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to start metrics exporter: {}", e))?;

    tracing::info!(%addr, "Prometheus metrics exporter listening");
    Ok(())
}

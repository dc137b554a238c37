//! Metrics collection using metrics-rs.

use metrics::{Counter, Gauge, Histogram, Unit, counter, gauge, histogram};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Whether metrics have been initialized.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

// Metric names as constants for consistency
const PROBES_TOTAL: &str = "autoconvert_probes_total";
const PROPOSALS_TOTAL: &str = "autoconvert_proposals_total";
const REBUILDS_TOTAL: &str = "autoconvert_rebuilds_total";
const BUILD_COST: &str = "autoconvert_build_cost";
const BUILD_TIME_NS: &str = "autoconvert_build_time_ns";
const UNRESOLVED_OUTPUTS: &str = "autoconvert_unresolved_outputs";

/// Initialize metrics descriptions.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    metrics::describe_counter!(
        PROBES_TOTAL,
        Unit::Count,
        "Candidate chains instantiated in a probe graph"
    );
    metrics::describe_counter!(
        PROPOSALS_TOTAL,
        Unit::Count,
        "Proposals produced by planning passes"
    );
    metrics::describe_counter!(
        REBUILDS_TOTAL,
        Unit::Count,
        "Graph builds, first builds included"
    );
    metrics::describe_histogram!(
        BUILD_COST,
        Unit::Count,
        "Total cost of the selected conversion graph"
    );
    metrics::describe_histogram!(
        BUILD_TIME_NS,
        Unit::Nanoseconds,
        "Time to plan and build a graph"
    );
    metrics::describe_gauge!(
        UNRESOLVED_OUTPUTS,
        Unit::Count,
        "Output ports left unlinked by the last build"
    );
}

/// Record the outcome of one probe.
#[inline]
pub fn record_probe(accepted: bool) {
    let outcome = if accepted { "accepted" } else { "rejected" };
    counter!(PROBES_TOTAL, "outcome" => outcome).increment(1);
}

/// Metrics for one element's planning passes.
#[derive(Clone)]
pub struct PlannerMetrics {
    element: String,
    proposals: Counter,
    build_cost: Histogram,
    build_time: Histogram,
    unresolved: Gauge,
}

impl PlannerMetrics {
    /// Create a collector labelled with `element`.
    pub fn new(element: &str) -> Self {
        Self {
            element: element.to_string(),
            proposals: counter!(PROPOSALS_TOTAL, "element" => element.to_string()),
            build_cost: histogram!(BUILD_COST, "element" => element.to_string()),
            build_time: histogram!(BUILD_TIME_NS, "element" => element.to_string()),
            unresolved: gauge!(UNRESOLVED_OUTPUTS, "element" => element.to_string()),
        }
    }

    /// Record proposals generated by one pass.
    #[inline]
    pub fn record_proposals(&self, count: usize) {
        self.proposals.increment(count as u64);
    }

    /// Record a completed build.
    pub fn record_build(&self, reason: &'static str, cost: u64, unresolved: usize) {
        counter!(REBUILDS_TOTAL, "element" => self.element.clone(), "reason" => reason)
            .increment(1);
        self.build_cost.record(cost as f64);
        self.unresolved.set(unresolved as f64);
    }

    /// Record how long a build took.
    #[inline]
    pub fn record_time(&self, duration: Duration) {
        self.build_time.record(duration.as_nanos() as f64);
    }

    /// Start a timer that records on drop.
    pub fn start_timer(&self) -> TimerGuard<'_> {
        TimerGuard {
            start: Instant::now(),
            metrics: self,
        }
    }

    /// Get the element name.
    pub fn element(&self) -> &str {
        &self.element
    }
}

/// Guard that records build time when dropped.
pub struct TimerGuard<'a> {
    start: Instant,
    metrics: &'a PlannerMetrics,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.metrics.record_time(self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics() {
        init_metrics();
        init_metrics();
    }

    #[test]
    fn test_planner_metrics() {
        let metrics = PlannerMetrics::new("autoconvert0");
        metrics.record_proposals(3);
        metrics.record_build("initial", 15, 1);
        {
            let _timer = metrics.start_timer();
        }
        assert_eq!(metrics.element(), "autoconvert0");
    }

    #[test]
    fn test_record_probe_without_recorder() {
        record_probe(true);
        record_probe(false);
    }
}

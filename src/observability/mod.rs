//! Observability features: metrics and tracing.
//!
//! - **Metrics**: Counters, gauges, and histograms via `metrics-rs`
//! - **Tracing**: Structured logging and spans via `tracing`
//!
//! ## Metrics
//!
//! | Metric | Type | Description |
//! |--------|------|-------------|
//! | `autoconvert_probes_total` | Counter | Probed candidate chains, by outcome |
//! | `autoconvert_proposals_total` | Counter | Proposals produced by planning |
//! | `autoconvert_rebuilds_total` | Counter | Graph builds, by reason |
//! | `autoconvert_build_cost` | Histogram | Cost of the selected graph |
//! | `autoconvert_build_time_ns` | Histogram | Time to plan and build |
//! | `autoconvert_unresolved_outputs` | Gauge | Outputs left unlinked |
//!
//! ## Tracing
//!
//! Each (re)build runs inside a `build` span carrying the element name and
//! the reason. Planning milestones log at `debug`, individual probes at
//! `trace`, unresolved outputs and incomplete drains at `warn`.
//!
//! ## Example
//!
//! ```rust
//! use autoconvert::observability::init_metrics;
//!
//! // Describe the metrics once; install any metrics-rs recorder to collect them.
//! init_metrics();
//! ```

mod metrics;
mod tracing_support;

pub use metrics::{PlannerMetrics, TimerGuard, init_metrics, record_probe};
pub use tracing_support::{
    TracingConfig, instrument_build, span_build, span_build_at, trace_state_change,
};

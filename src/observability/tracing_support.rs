//! Tracing integration for structured logging and spans.

use tracing::{Level, Span, span};

/// Configuration for tracing behavior.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Whether to create a span around every (re)build.
    pub build_spans: bool,
    /// Whether to log every probed candidate chain.
    pub probe_tracing: bool,
    /// Level of the build span.
    pub level: Level,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            build_spans: true,
            probe_tracing: false, // One event per candidate
            level: Level::INFO,
        }
    }
}

impl TracingConfig {
    /// Create a config with everything enabled.
    pub fn all() -> Self {
        Self {
            build_spans: true,
            probe_tracing: true,
            level: Level::DEBUG,
        }
    }

    /// Create a minimal config (build spans only).
    pub fn minimal() -> Self {
        Self::default()
    }

    /// Disable all spans.
    pub fn none() -> Self {
        Self {
            build_spans: false,
            probe_tracing: false,
            level: Level::INFO,
        }
    }
}

/// Create a span for one graph (re)build.
///
/// # Example
///
/// ```rust
/// use autoconvert::observability::span_build;
///
/// let span = span_build("autoconvert0", "initial");
/// let _guard = span.enter();
/// ```
#[inline]
pub fn span_build(element: &str, reason: &str) -> Span {
    span_build_at(Level::INFO, element, reason)
}

/// Create a build span at `level`.
pub fn span_build_at(level: Level, element: &str, reason: &str) -> Span {
    macro_rules! build_span {
        ($level:expr) => {
            span!($level, "build", element = %element, reason = %reason)
        };
    }
    match level {
        Level::ERROR => build_span!(Level::ERROR),
        Level::WARN => build_span!(Level::WARN),
        Level::DEBUG => build_span!(Level::DEBUG),
        Level::TRACE => build_span!(Level::TRACE),
        _ => build_span!(Level::INFO),
    }
}

/// Enter a build span at the configured level if the config asks for one.
pub fn instrument_build(
    config: &TracingConfig,
    element: &str,
    reason: &str,
) -> Option<tracing::span::EnteredSpan> {
    config
        .build_spans
        .then(|| span_build_at(config.level, element, reason).entered())
}

/// Log a build state change.
#[inline]
pub fn trace_state_change(element: &str, from: &str, to: &str) {
    tracing::debug!(
        element = %element,
        from = %from,
        to = %to,
        "build state changed"
    );
}

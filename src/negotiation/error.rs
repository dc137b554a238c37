//! Negotiation error types.

use thiserror::Error;

/// Error during caps negotiation.
#[derive(Debug, Error)]
pub enum NegotiationError {
    /// No common format between connected nodes.
    #[error("No common format between {upstream} and {downstream}:\n  {explanation}")]
    NoCommonFormat {
        /// Name of upstream node.
        upstream: String,
        /// Name of downstream node.
        downstream: String,
        /// Detailed explanation.
        explanation: String,
    },

    /// A node's format was offered outside its accepted caps.
    #[error("{node} does not accept {format}")]
    NotAccepted {
        /// Node name.
        node: String,
        /// Offered format.
        format: String,
    },

    /// Data arrived before a graph was built for its port.
    #[error("{port} has no negotiated graph yet")]
    NotNegotiated {
        /// Input port name.
        port: String,
    },

    /// Candidate caps could not be fixated.
    #[error("Cannot fixate output format of {node}")]
    CannotFixate {
        /// Node name.
        node: String,
    },
}

impl NegotiationError {
    /// Create a "no common format" error.
    pub fn no_common_format(
        upstream: impl Into<String>,
        downstream: impl Into<String>,
        offered: &str,
        accepted: &str,
    ) -> Self {
        Self::NoCommonFormat {
            upstream: upstream.into(),
            downstream: downstream.into(),
            explanation: format!("Upstream offers: {}\nDownstream accepts: {}", offered, accepted),
        }
    }

    /// Create a "not accepted" error.
    pub fn not_accepted(node: impl Into<String>, format: impl std::fmt::Display) -> Self {
        Self::NotAccepted {
            node: node.into(),
            format: format.to_string(),
        }
    }
}

//! Error types for autoconvert.

use crate::negotiation::NegotiationError;
use thiserror::Error;

/// Result type alias using autoconvert's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for autoconvert operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The conversion policy supplied no stage catalog.
    #[error("no stage catalog: the conversion policy does not provide stage factories")]
    MissingCatalog,

    /// A port id that is not (or no longer) registered on the element.
    #[error("unknown port: {0}")]
    UnknownPort(String),

    /// A graph node id that does not exist.
    #[error("unknown graph node {0}")]
    UnknownNode(usize),

    /// A link was refused because a pad is missing or already linked.
    #[error("link refused: {0}")]
    LinkRefused(String),

    /// Linking would have created a cycle.
    #[error("linking {upstream} to {downstream} would create a cycle")]
    WouldCycle {
        /// Upstream node name.
        upstream: String,
        /// Downstream node name.
        downstream: String,
    },

    /// The output port limit was reached.
    #[error("too many output ports (maximum {max})")]
    TooManyOutputs {
        /// Maximum number of output ports.
        max: usize,
    },

    /// A buffer or format did not match what a stage was configured for.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// A stage failed while processing.
    #[error("stage '{stage}' failed: {reason}")]
    Stage {
        /// Stage name.
        stage: String,
        /// Failure description.
        reason: String,
    },

    /// Caps negotiation failed.
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),
}

impl Error {
    /// Create a stage error.
    pub fn stage(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Stage {
            stage: stage.into(),
            reason: reason.into(),
        }
    }
}

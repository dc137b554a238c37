//! Conversion policies: the stage catalog plus routing and cost hooks.

use super::catalog::CatalogEntry;
use super::chain::{ChainVerdict, validate_chain_caps, validate_non_consecutive};
use super::proposal::Route;
use crate::element::StageFactory;
use crate::format::MediaFormat;
use std::sync::Arc;

/// Supplies the stage catalog and steers planning.
///
/// Only [`stage_factories`](ConvertPolicy::stage_factories) is required;
/// every other hook has a neutral default.
///
/// # Example
///
/// ```rust
/// use autoconvert::element::StageFactory;
/// use autoconvert::elements::VideoScale;
/// use autoconvert::format::MediaFormat;
/// use autoconvert::negotiation::ConvertPolicy;
/// use std::sync::Arc;
///
/// struct ScaleOnly;
///
/// impl ConvertPolicy for ScaleOnly {
///     fn stage_factories(&self) -> Option<Vec<Arc<StageFactory>>> {
///         Some(vec![Arc::new(VideoScale::factory())])
///     }
///
///     fn cost_step(&self, _: &StageFactory, _: &MediaFormat, output: &MediaFormat) -> u64 {
///         output.buffer_size().unwrap_or(1) as u64
///     }
/// }
/// ```
pub trait ConvertPolicy: Send {
    /// Stage types available for planning; `None` means no catalog at all.
    fn stage_factories(&self) -> Option<Vec<Arc<StageFactory>>>;

    /// Whether a route is worth planning.
    fn validate_route(&self, _route: &Route) -> bool {
        true
    }

    /// Judge a candidate chain before it is probed.
    fn validate_chain(&self, route: &Route, chain: &[&CatalogEntry]) -> ChainVerdict {
        validate_chain_caps(route, chain).and_then(|| validate_non_consecutive(chain))
    }

    /// Cost of one negotiated step.
    fn cost_step(&self, _factory: &StageFactory, _input: &MediaFormat, _output: &MediaFormat) -> u64 {
        1
    }

    /// Called once per (re)build before planning with the inputs' current
    /// formats.
    fn begin_building_graph(&mut self, _inputs: &[MediaFormat]) {}
}

/// A policy that only supplies a fixed catalog.
#[derive(Debug, Clone, Default)]
pub struct DefaultPolicy {
    factories: Vec<Arc<StageFactory>>,
}

impl DefaultPolicy {
    /// Create a policy over `factories`.
    pub fn new(factories: Vec<Arc<StageFactory>>) -> Self {
        Self { factories }
    }

    /// Add a stage type.
    pub fn with_factory(mut self, factory: StageFactory) -> Self {
        self.factories.push(Arc::new(factory));
        self
    }
}

impl ConvertPolicy for DefaultPolicy {
    fn stage_factories(&self) -> Option<Vec<Arc<StageFactory>>> {
        Some(self.factories.clone())
    }
}

//! Conversion policy specialised for raw video.

use super::catalog::CatalogEntry;
use super::chain::{ChainVerdict, validate_chain_caps, validate_non_consecutive, validate_stage_order};
use super::policy::ConvertPolicy;
use super::proposal::Route;
use crate::element::StageFactory;
use crate::elements::{VideoConvert, VideoScale};
use crate::format::{Caps, FormatCaps, MediaFormat, VideoFormat};
use std::sync::Arc;

/// Cost multiplier for a step that grows the picture.
pub const UPSCALE_PENALTY: u64 = 4;

/// Pixel throughput represented by one unit of cost.
const PIXELS_PER_COST: f64 = 1_000_000.0;

/// Plans with `videoscale` and `videoconvert`.
///
/// Costs follow pixel throughput, so cheaper graphs convert after scaling
/// down and before scaling up. A route is refused when it would upscale
/// while another input already offers the destination size.
#[derive(Debug, Clone)]
pub struct VideoConvertPolicy {
    factories: Vec<Arc<StageFactory>>,
    input_sizes: Vec<(u32, u32)>,
}

impl Default for VideoConvertPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoConvertPolicy {
    /// Create the policy with the built-in video stages.
    pub fn new() -> Self {
        Self {
            factories: vec![
                Arc::new(VideoScale::factory()),
                Arc::new(VideoConvert::factory()),
            ],
            input_sizes: Vec::new(),
        }
    }

    /// Input sizes captured for the current build.
    pub fn input_sizes(&self) -> &[(u32, u32)] {
        &self.input_sizes
    }
}

fn fixed_size(caps: &Caps) -> Option<(u32, u32)> {
    caps.structures().iter().find_map(|s| match s {
        FormatCaps::VideoRaw(v) => Some((*v.width.as_fixed()?, *v.height.as_fixed()?)),
        _ => None,
    })
}

fn pixel_rate(format: &VideoFormat) -> f64 {
    format.width as f64 * format.height as f64 * format.framerate.fps()
}

impl ConvertPolicy for VideoConvertPolicy {
    fn stage_factories(&self) -> Option<Vec<Arc<StageFactory>>> {
        Some(self.factories.clone())
    }

    fn validate_route(&self, route: &Route) -> bool {
        let (Some((dw, dh)), Some((sw, sh))) = (
            fixed_size(&route.destination_caps),
            fixed_size(&route.source_caps),
        ) else {
            return true;
        };
        if dw <= sw && dh <= sh {
            return true;
        }
        let larger_input = self
            .input_sizes
            .iter()
            .any(|&(w, h)| w >= dw && h >= dh);
        if larger_input {
            tracing::trace!(
                destination = %route.destination,
                from = ?(sw, sh),
                to = ?(dw, dh),
                "refusing upscale, a larger input exists"
            );
        }
        !larger_input
    }

    fn validate_chain(&self, route: &Route, chain: &[&CatalogEntry]) -> ChainVerdict {
        validate_chain_caps(route, chain)
            .and_then(|| validate_non_consecutive(chain))
            .and_then(|| validate_stage_order(chain))
    }

    fn cost_step(&self, _factory: &StageFactory, input: &MediaFormat, output: &MediaFormat) -> u64 {
        let (Some(input), Some(output)) = (input.as_video_raw(), output.as_video_raw()) else {
            return 1;
        };
        let (rate_in, rate_out) = (pixel_rate(input), pixel_rate(output));
        let cost = ((rate_in.max(rate_out) / PIXELS_PER_COST).ceil() as u64).max(1);
        if rate_out > rate_in {
            cost.saturating_mul(UPSCALE_PENALTY)
        } else {
            cost
        }
    }

    fn begin_building_graph(&mut self, inputs: &[MediaFormat]) {
        self.input_sizes = inputs
            .iter()
            .filter_map(MediaFormat::as_video_raw)
            .map(|v| (v.width, v.height))
            .collect();
    }
}

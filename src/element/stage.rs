//! The single-input, single-output processing stage trait.

use super::pad::PadDirection;
use crate::buffer::Buffer;
use crate::error::Result;
use crate::format::{Caps, MediaFormat};

/// A processing stage with one sink pad and one src pad.
///
/// Stages take part in caps negotiation through [`transform_caps`] and
/// [`fixate`], are configured with [`set_formats`] once both sides are
/// fixed, and then process buffers.
///
/// [`transform_caps`]: Stage::transform_caps
/// [`fixate`]: Stage::fixate
/// [`set_formats`]: Stage::set_formats
///
/// # Example
///
/// ```rust
/// use autoconvert::buffer::Buffer;
/// use autoconvert::element::{PadDirection, Stage};
/// use autoconvert::error::Result;
/// use autoconvert::format::{Caps, MediaFormat};
///
/// struct Invert;
///
/// impl Stage for Invert {
///     fn name(&self) -> &str {
///         "invert"
///     }
///
///     fn transform_caps(&self, _direction: PadDirection, caps: &Caps) -> Caps {
///         caps.clone()
///     }
///
///     fn set_formats(&mut self, _input: &MediaFormat, _output: &MediaFormat) -> Result<()> {
///         Ok(())
///     }
///
///     fn process(&mut self, buffer: Buffer) -> Result<Option<Buffer>> {
///         let data: Vec<u8> = buffer.as_bytes().iter().map(|b| !b).collect();
///         Ok(Some(buffer.with_data(data)))
///     }
/// }
/// ```
pub trait Stage: Send {
    /// Stage type name.
    fn name(&self) -> &str;

    /// Caps reachable on the other side of the stage.
    ///
    /// With [`PadDirection::Input`], `caps` describes the sink side and the
    /// result is what the src side can produce; with
    /// [`PadDirection::Output`], `caps` describes the src side and the result
    /// is what the sink side must accept.
    fn transform_caps(&self, direction: PadDirection, caps: &Caps) -> Caps;

    /// Choose an output format from the negotiated candidates.
    fn fixate(&self, input: &MediaFormat, candidates: &Caps) -> Option<MediaFormat> {
        candidates.fixate_towards(input)
    }

    /// Configure the stage for a fixed input and output format.
    fn set_formats(&mut self, input: &MediaFormat, output: &MediaFormat) -> Result<()>;

    /// Process one buffer; `None` drops it.
    fn process(&mut self, buffer: Buffer) -> Result<Option<Buffer>>;

    /// Return to the unconfigured state.
    fn reset(&mut self) {}
}

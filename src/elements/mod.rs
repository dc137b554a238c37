//! Built-in stages and graph plumbing elements.
//!
//! - [`VideoScale`] and [`VideoConvert`]: raw video converters usable in a
//!   stage catalog.
//! - [`Identity`]: pass-through stage.
//! - [`Tee`] and [`DiscardSink`]: fan-out and termination points inserted by
//!   the graph builder.

mod convert;
mod discard;
mod identity;
mod scale;
mod tee;

pub use convert::{SUPPORTED_FORMATS, VideoConvert};
pub use discard::DiscardSink;
pub use identity::Identity;
pub use scale::{ScaleAlgorithm, VideoScale};
pub use tee::Tee;

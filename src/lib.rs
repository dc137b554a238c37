//! # Autoconvert
//!
//! An element that builds its own conversion graph.
//!
//! Data arrives on any number of input ports in varying formats and leaves
//! through output ports that each accept some set of formats. The element
//! plans the cheapest combination of processing stages that serves every
//! output, shares upstream work between outputs where that is cheaper, and
//! rebuilds the graph safely when requirements change while data flows.
//!
//! ## Features
//!
//! - **Pruned chain search**: candidate chains are enumerated shortest first
//!   and rejected suffixes are skipped wholesale
//! - **Sandbox probing**: every candidate is negotiated end to end by real
//!   stage instances before it is trusted
//! - **Global selection**: a subset DP over the output ports picks the
//!   cheapest cover, branching outputs off shared steps
//! - **Safe rebuilds**: the old graph drains with end-of-stream before it is
//!   torn down, and sticky events are replayed into the new one
//! - **Pluggable policies**: catalogs, validation and costs come from a
//!   [`ConvertPolicy`](negotiation::ConvertPolicy)
//!
//! ## Quick Start
//!
//! ```rust
//! use autoconvert::prelude::*;
//! use autoconvert::format::{Framerate, PixelFormat, VideoFormat, VideoFormatCaps};
//!
//! let element = AutoConvert::new(
//!     AutoConvertConfig::new("ac0"),
//!     Box::new(VideoConvertPolicy::new()),
//! )?;
//!
//! let input = element.request_input(None);
//! let output = element.request_output(None)?;
//!
//! let format = VideoFormat::new(1280, 720, PixelFormat::I420, Framerate::FPS_30);
//! element.send_event(input, Event::Caps(MediaFormat::VideoRaw(format)))?;
//! element.push(input, Buffer::from_vec(vec![0; format.frame_size()]))?;
//! assert!(element.last_report().is_some_and(|r| r.linked == [output]));
//! # Ok::<(), autoconvert::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod autoconvert;
pub mod buffer;
pub mod config;
pub mod element;
pub mod elements;
pub mod error;
pub mod event;
pub mod format;
pub mod negotiation;
pub mod observability;
pub mod pipeline;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::autoconvert::{AutoConvert, BuildReport, BuildState};
    pub use crate::buffer::Buffer;
    pub use crate::config::AutoConvertConfig;
    pub use crate::element::{Stage, StageFactory};
    pub use crate::error::{Error, Result};
    pub use crate::event::Event;
    pub use crate::format::{Caps, MediaFormat};
    pub use crate::negotiation::{ConvertPolicy, DefaultPolicy, VideoConvertPolicy};
    pub use crate::pipeline::{InputPortId, OutputPortId, PortPeer};
}

pub use error::{Error, Result};

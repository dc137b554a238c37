//! The live graph an element plans into.
//!
//! - [`Graph`]: DAG of stage, tee, discard, stub and port nodes
//! - [`LinkFlags`]: link behaviour
//! - [`PortPeer`]: the host-side counterpart of an element port
//!
//! # Example
//!
//! ```rust
//! use autoconvert::elements::VideoScale;
//! use autoconvert::event::Event;
//! use autoconvert::format::{Caps, Framerate, MediaFormat, PixelFormat, VideoFormat, VideoFormatCaps};
//! use autoconvert::pipeline::{Graph, LinkFlags};
//! use std::sync::Arc;
//!
//! let mut graph = Graph::new();
//! let scale = graph.add_stage("scale", Arc::new(VideoScale::factory()));
//! let stub = graph.add_stub("stub", Caps::from(VideoFormatCaps::any().with_size(640, 360)));
//! graph.link(scale, stub, LinkFlags::NO_RECONFIGURE)?;
//!
//! let input = VideoFormat::new(1280, 720, PixelFormat::I420, Framerate::FPS_30);
//! graph.send_event(scale, Event::Caps(MediaFormat::VideoRaw(input)))?;
//! let (_, output) = graph.stage_formats(scale).unwrap();
//! assert_eq!(output.as_video_raw().unwrap().width, 640);
//! # Ok::<(), autoconvert::Error>(())
//! ```

mod graph;
mod port;

pub use graph::{Graph, Link, LinkFlags, Node, NodeId, NodeKind, StageNode};
pub use port::{InputPortId, OutputPortId, PortPeer};

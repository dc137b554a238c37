//! Conversion planning.
//!
//! Given the formats arriving on the input ports and the caps each output
//! port accepts, planning finds the cheapest set of stage chains serving
//! every output, sharing upstream work where that is cheaper.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    ProposalGenerator                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  1. Index the policy's stage factories (StageCatalog)           │
//! │  2. Enumerate candidate chains, shortest first (ChainGenerator) │
//! │  3. Negotiate each candidate in a scratch graph (ProbeCache)    │
//! │  4. Branch further outputs off existing steps                   │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                    select()                                     │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  5. Cheapest disjoint cover of the output ports                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use autoconvert::format::{Caps, Framerate, MediaFormat, PixelFormat, VideoFormat, VideoFormatCaps};
//! use autoconvert::negotiation::{ProposalGenerator, StageCatalog, VideoConvertPolicy, select};
//! use autoconvert::pipeline::{InputPortId, OutputPortId};
//!
//! let policy = VideoConvertPolicy::new();
//! let catalog = StageCatalog::from_policy(&policy).unwrap();
//!
//! let input = MediaFormat::VideoRaw(VideoFormat::new(1280, 720, PixelFormat::I420, Framerate::FPS_30));
//! let inputs = [(InputPortId::new(0), input)];
//! let outputs = [(OutputPortId::new(0), Caps::from(VideoFormatCaps::rgba().with_size(640, 360)))];
//!
//! let mut generator = ProposalGenerator::new(&catalog, &policy, 4);
//! generator.generate_proposals(&inputs, &outputs);
//! let proposals = generator.into_proposals();
//!
//! let selection = select(&proposals, &[OutputPortId::new(0)]).unwrap();
//! assert!(selection.is_complete());
//! ```

mod catalog;
mod chain;
mod error;
mod policy;
mod probe;
mod proposal;
mod select;
mod video;

pub use catalog::{CatalogEntry, StageCatalog};
pub use chain::{
    Chain, ChainGenerator, ChainVerdict, validate_chain_caps, validate_non_consecutive,
    validate_stage_order,
};
pub use error::NegotiationError;
pub use policy::{ConvertPolicy, DefaultPolicy};
pub use probe::ProbeCache;
pub use proposal::{
    Proposal, ProposalGenerator, ProposalId, ProposalParent, ProposalSet, Route,
    TransformationStep,
};
pub use select::{MAX_OUTPUT_PORTS, Selection, select};
pub use video::{UPSCALE_PENALTY, VideoConvertPolicy};

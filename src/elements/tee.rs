//! Tee - fans one stream out to several consumers.

use crate::buffer::Buffer;
use crate::element::PadTemplate;
use crate::format::Caps;

/// Fan-out point with request src pads named `src_%u`.
///
/// The graph clones each buffer into every linked branch; cloning shares the
/// payload, so fan-out never copies data.
#[derive(Debug)]
pub struct Tee {
    template: PadTemplate,
    next_pad: u32,
    count: u64,
    bytes: u64,
}

impl Tee {
    /// Create a new tee.
    pub fn new() -> Self {
        Self {
            template: PadTemplate::request_src(Caps::any()),
            next_pad: 0,
            count: 0,
            bytes: 0,
        }
    }

    /// Allocate the name of a new request src pad.
    pub fn request_pad(&mut self) -> String {
        let name = self.template.instance_name(self.next_pad);
        self.next_pad += 1;
        name
    }

    /// Account for a buffer passing through.
    pub fn record(&mut self, buffer: &Buffer) {
        self.count += 1;
        self.bytes += buffer.len() as u64;
    }

    /// Number of buffers that have passed through.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Total bytes that have passed through.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

impl Default for Tee {
    fn default() -> Self {
        Self::new()
    }
}

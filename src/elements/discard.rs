//! DiscardSink - terminates input ports nothing is planned for.

use crate::buffer::Buffer;

/// A sink that discards everything it receives.
#[derive(Debug, Default)]
pub struct DiscardSink {
    count: u64,
    bytes: u64,
}

impl DiscardSink {
    /// Create a new discard sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop a buffer, counting it.
    pub fn consume(&mut self, buffer: Buffer) {
        self.count += 1;
        self.bytes += buffer.len() as u64;
    }

    /// Number of buffers discarded.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Total bytes discarded.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

//! Element ports and the peers connected to them.

use crate::buffer::Buffer;
use crate::error::Result;
use crate::event::Event;
use crate::format::Caps;
use std::fmt;

/// Identifier of an input (sink) port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InputPortId(pub(crate) u32);

impl InputPortId {
    /// Port with the given index.
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Numeric index of the port.
    pub fn index(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for InputPortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sink_{}", self.0)
    }
}

/// Identifier of an output (src) port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutputPortId(pub(crate) u32);

impl OutputPortId {
    /// Port with the given index.
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Numeric index of the port.
    pub fn index(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for OutputPortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "src_{}", self.0)
    }
}

/// The element on the other side of a port.
///
/// For an input port the peer is the upstream producer; only
/// [`query_caps`](PortPeer::query_caps) is used on it. For an output port the
/// peer is the downstream consumer and receives buffers and events.
pub trait PortPeer: Send + Sync {
    /// Formats the peer can handle, restricted by `filter` when given.
    fn query_caps(&self, filter: Option<&Caps>) -> Caps;

    /// Receive a buffer.
    fn push_buffer(&self, _buffer: Buffer) -> Result<()> {
        Ok(())
    }

    /// Receive an event.
    fn push_event(&self, _event: Event) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_names() {
        assert_eq!(InputPortId(0).to_string(), "sink_0");
        assert_eq!(OutputPortId(12).to_string(), "src_12");
        assert!(OutputPortId(1) < OutputPortId(2));
    }
}

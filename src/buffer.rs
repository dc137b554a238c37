//! Buffers carried through the conversion graph.

use bytes::Bytes;
use std::time::Duration;

/// Per-buffer timing and ordering metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Presentation timestamp.
    pub pts: Option<Duration>,
    /// Buffer duration.
    pub duration: Option<Duration>,
    /// Monotonic sequence number assigned by the producer.
    pub sequence: u64,
}

impl Metadata {
    /// Metadata with only a sequence number.
    pub fn with_sequence(sequence: u64) -> Self {
        Self {
            sequence,
            ..Self::default()
        }
    }

    /// Set the presentation timestamp.
    pub fn with_pts(mut self, pts: Duration) -> Self {
        self.pts = Some(pts);
        self
    }
}

/// A reference-counted chunk of media data plus metadata.
///
/// Cloning is cheap: the payload is shared, which is what fan-out relies on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Buffer {
    data: Bytes,
    metadata: Metadata,
}

impl Buffer {
    /// Create a buffer.
    pub fn new(data: impl Into<Bytes>, metadata: Metadata) -> Self {
        Self {
            data: data.into(),
            metadata,
        }
    }

    /// Create a buffer with default metadata.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self::new(data, Metadata::default())
    }

    /// Payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Shared payload handle.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Payload length.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Buffer metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Replace the payload, keeping metadata.
    pub fn with_data(self, data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            metadata: self.metadata,
        }
    }
}

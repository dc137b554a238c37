//! Identity stage: passes buffers through unchanged.

use crate::buffer::Buffer;
use crate::element::{PadDirection, Stage};
use crate::error::Result;
use crate::format::{Caps, MediaFormat};

/// A pass-through stage that counts what flows through it.
///
/// Useful as a placeholder stage type and for inspecting negotiated graphs.
#[derive(Debug, Default)]
pub struct Identity {
    count: u64,
    bytes: u64,
}

impl Identity {
    /// Create a new identity stage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buffers seen.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Total bytes seen.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

impl Stage for Identity {
    fn name(&self) -> &str {
        "identity"
    }

    fn transform_caps(&self, _direction: PadDirection, caps: &Caps) -> Caps {
        caps.clone()
    }

    fn set_formats(&mut self, _input: &MediaFormat, _output: &MediaFormat) -> Result<()> {
        Ok(())
    }

    fn process(&mut self, buffer: Buffer) -> Result<Option<Buffer>> {
        self.count += 1;
        self.bytes += buffer.len() as u64;
        Ok(Some(buffer))
    }

    fn reset(&mut self) {
        self.count = 0;
        self.bytes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_passthrough() {
        let mut identity = Identity::new();
        let out = identity.process(Buffer::from_vec(vec![1, 2, 3])).unwrap();
        assert_eq!(out.unwrap().as_bytes(), &[1, 2, 3]);
        assert_eq!(identity.count(), 1);
        assert_eq!(identity.bytes(), 3);
        identity.reset();
        assert_eq!(identity.count(), 0);
    }
}

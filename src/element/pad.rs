//! Pad templates: the declared connection points of a stage type.

use crate::format::Caps;

/// Direction of a pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadDirection {
    /// An input pad (receives data from upstream).
    Input,
    /// An output pad (sends data downstream).
    Output,
}

impl PadDirection {
    /// The opposite direction.
    pub fn opposite(self) -> Self {
        match self {
            Self::Input => Self::Output,
            Self::Output => Self::Input,
        }
    }
}

/// Whether a pad is always present or created dynamically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadPresence {
    /// Pad is always present.
    Always,
    /// Pad appears depending on the stream.
    Sometimes,
    /// Pad is created when requested.
    Request,
}

/// Template for creating pads, with the caps they can carry.
#[derive(Debug, Clone)]
pub struct PadTemplate {
    /// Name pattern for this pad (e.g., "src", "sink", "src_%u").
    pub name: String,
    /// Direction of this pad.
    pub direction: PadDirection,
    /// Whether this pad is always present or created on demand.
    pub presence: PadPresence,
    /// Formats the pad can carry.
    pub caps: Caps,
}

impl PadTemplate {
    /// Create a new pad template.
    pub fn new(
        name: impl Into<String>,
        direction: PadDirection,
        presence: PadPresence,
        caps: Caps,
    ) -> Self {
        Self {
            name: name.into(),
            direction,
            presence,
            caps,
        }
    }

    /// An always-present input pad named "sink".
    pub fn sink(caps: Caps) -> Self {
        Self::new("sink", PadDirection::Input, PadPresence::Always, caps)
    }

    /// An always-present output pad named "src".
    pub fn src(caps: Caps) -> Self {
        Self::new("src", PadDirection::Output, PadPresence::Always, caps)
    }

    /// Request output pads named "src_%u".
    pub fn request_src(caps: Caps) -> Self {
        Self::new("src_%u", PadDirection::Output, PadPresence::Request, caps)
    }

    /// Check if this is an input template.
    pub fn is_input(&self) -> bool {
        self.direction == PadDirection::Input
    }

    /// Check if this is an output template.
    pub fn is_output(&self) -> bool {
        self.direction == PadDirection::Output
    }

    /// Expand a request name pattern with an index.
    pub fn instance_name(&self, index: u32) -> String {
        self.name.replace("%u", &index.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_directions() {
        assert!(PadTemplate::sink(Caps::any()).is_input());
        assert!(PadTemplate::src(Caps::any()).is_output());
        assert_eq!(PadDirection::Input.opposite(), PadDirection::Output);
    }

    #[test]
    fn test_request_instance_name() {
        let template = PadTemplate::request_src(Caps::any());
        assert_eq!(template.presence, PadPresence::Request);
        assert_eq!(template.instance_name(3), "src_3");
    }
}

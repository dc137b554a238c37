//! Stage factories: named constructors with declared pads and classification.

use super::pad::{PadDirection, PadTemplate};
use super::stage::Stage;
use std::fmt;
use std::sync::Arc;

/// Constructor for a stage instance.
pub type StageConstructor = Arc<dyn Fn() -> Box<dyn Stage> + Send + Sync>;

/// Classification bits derived from a factory's klass string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StageKlass(u32);

impl StageKlass {
    /// Not classified.
    pub const NONE: Self = Self(0);
    /// Format converter (scaler, colorspace, resampler).
    pub const CONVERTER: Self = Self(1 << 0);
    /// Decoder.
    pub const DECODER: Self = Self(1 << 1);
    /// Encoder.
    pub const ENCODER: Self = Self(1 << 2);
    /// Parser.
    pub const PARSER: Self = Self(1 << 3);

    /// Classify a slash-separated klass string such as `"Codec/Decoder/Video"`.
    pub fn from_klass(klass: &str) -> Self {
        klass
            .split('/')
            .map(|token| match token.trim() {
                "Converter" => Self::CONVERTER,
                "Decoder" => Self::DECODER,
                "Encoder" => Self::ENCODER,
                "Parser" => Self::PARSER,
                _ => Self::NONE,
            })
            .fold(Self::NONE, |acc, k| acc | k)
    }

    /// Check if all bits of `other` are set.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Check if any bit of `other` is set.
    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Check if no bit is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for StageKlass {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A named stage type that can be instantiated any number of times.
#[derive(Clone)]
pub struct StageFactory {
    name: String,
    klass: String,
    templates: Vec<PadTemplate>,
    constructor: StageConstructor,
}

impl StageFactory {
    /// Create a factory with no pad templates.
    pub fn new<F>(name: impl Into<String>, klass: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> Box<dyn Stage> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            klass: klass.into(),
            templates: Vec::new(),
            constructor: Arc::new(constructor),
        }
    }

    /// Add a pad template.
    pub fn with_template(mut self, template: PadTemplate) -> Self {
        self.templates.push(template);
        self
    }

    /// Factory name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw klass metadata string.
    pub fn klass(&self) -> &str {
        &self.klass
    }

    /// All pad templates.
    pub fn templates(&self) -> &[PadTemplate] {
        &self.templates
    }

    /// Templates of one direction.
    pub fn templates_in(&self, direction: PadDirection) -> impl Iterator<Item = &PadTemplate> {
        self.templates
            .iter()
            .filter(move |t| t.direction == direction)
    }

    /// The single sink and src templates, if the factory declares exactly one of each.
    pub fn single_templates(&self) -> Option<(&PadTemplate, &PadTemplate)> {
        let mut sinks = self.templates_in(PadDirection::Input);
        let mut srcs = self.templates_in(PadDirection::Output);
        match (sinks.next(), sinks.next(), srcs.next(), srcs.next()) {
            (Some(sink), None, Some(src), None) => Some((sink, src)),
            _ => None,
        }
    }

    /// Instantiate a new stage.
    pub fn create(&self) -> Box<dyn Stage> {
        (self.constructor)()
    }
}

impl fmt::Debug for StageFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageFactory")
            .field("name", &self.name)
            .field("klass", &self.klass)
            .field("templates", &self.templates.len())
            .finish()
    }
}

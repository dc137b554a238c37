//! Events that flow downstream alongside buffers.
//!
//! Some events are *sticky*: the latest instance of each kind is remembered
//! per input port so that a freshly built graph can be brought up to date
//! with the stream state before the next buffer arrives.

use crate::format::MediaFormat;
use std::collections::BTreeMap;
use std::time::Duration;

// ============================================================================
// Event Enum
// ============================================================================

/// Downstream events.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Start of a new stream.
    StreamStart(StreamStartEvent),
    /// The stream's format from here on.
    Caps(MediaFormat),
    /// Playback segment.
    Segment(SegmentEvent),
    /// Stream tags.
    Tags(TagsEvent),
    /// Discard buffered data.
    FlushStart,
    /// Resume after a flush.
    FlushStop,
    /// End of stream.
    Eos,
}

/// Event kinds, in the order sticky events are replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    /// Stream start.
    StreamStart,
    /// Caps.
    Caps,
    /// Segment.
    Segment,
    /// Tags.
    Tags,
    /// Flush start.
    FlushStart,
    /// Flush stop.
    FlushStop,
    /// End of stream.
    Eos,
}

impl Event {
    /// The kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::StreamStart(_) => EventKind::StreamStart,
            Event::Caps(_) => EventKind::Caps,
            Event::Segment(_) => EventKind::Segment,
            Event::Tags(_) => EventKind::Tags,
            Event::FlushStart => EventKind::FlushStart,
            Event::FlushStop => EventKind::FlushStop,
            Event::Eos => EventKind::Eos,
        }
    }

    /// Whether the latest event of this kind is remembered on a port.
    pub fn is_sticky(&self) -> bool {
        !matches!(self, Event::FlushStart | Event::FlushStop)
    }

    /// Check if this is end-of-stream.
    pub fn is_eos(&self) -> bool {
        matches!(self, Event::Eos)
    }

    /// Get a human-readable name for this event type.
    pub fn name(&self) -> &'static str {
        match self {
            Event::StreamStart(_) => "stream-start",
            Event::Caps(_) => "caps",
            Event::Segment(_) => "segment",
            Event::Tags(_) => "tags",
            Event::FlushStart => "flush-start",
            Event::FlushStop => "flush-stop",
            Event::Eos => "eos",
        }
    }
}

/// Stream start event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamStartEvent {
    /// Unique stream identifier.
    pub stream_id: String,
}

impl StreamStartEvent {
    /// Create a new stream start event.
    pub fn new(stream_id: impl Into<String>) -> Self {
        Self {
            stream_id: stream_id.into(),
        }
    }
}

/// Segment event: the timeline the following buffers belong to.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentEvent {
    /// Segment start.
    pub start: Duration,
    /// Segment stop, if bounded.
    pub stop: Option<Duration>,
    /// Playback rate.
    pub rate: f64,
}

impl SegmentEvent {
    /// An unbounded segment starting at `start`.
    pub fn new(start: Duration) -> Self {
        Self {
            start,
            stop: None,
            rate: 1.0,
        }
    }
}

impl Default for SegmentEvent {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

/// Tags event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagsEvent {
    /// Tag values by name.
    pub tags: BTreeMap<String, String>,
}

impl TagsEvent {
    /// Add a tag.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// Sticky event storage
// ============================================================================

/// The latest sticky event of each kind seen on one port.
#[derive(Debug, Clone, Default)]
pub struct StickyEvents {
    events: BTreeMap<EventKind, Event>,
}

impl StickyEvents {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `event` if it is sticky.
    ///
    /// A stream start or flush stop clears the end-of-stream marker.
    pub fn store(&mut self, event: &Event) {
        match event {
            Event::StreamStart(_) | Event::FlushStop => {
                self.events.remove(&EventKind::Eos);
            }
            _ => {}
        }
        if event.is_sticky() {
            self.events.insert(event.kind(), event.clone());
        }
    }

    /// The current format, if a caps event was seen.
    pub fn caps(&self) -> Option<&MediaFormat> {
        match self.events.get(&EventKind::Caps) {
            Some(Event::Caps(format)) => Some(format),
            _ => None,
        }
    }

    /// Whether end-of-stream was seen.
    pub fn is_eos(&self) -> bool {
        self.events.contains_key(&EventKind::Eos)
    }

    /// Events to replay into a newly built graph, end-of-stream excluded.
    pub fn replayable(&self) -> impl Iterator<Item = &Event> {
        self.events.values().filter(|e| !e.is_eos())
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

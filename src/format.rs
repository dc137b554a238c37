//! Media formats and capability descriptors.
//!
//! A [`MediaFormat`] is a fully fixed description of a stream. A [`Caps`] is
//! an ordered set of [`FormatCaps`] structures, each of which constrains one
//! media type with [`CapsValue`] fields. Planning only ever needs four
//! operations on caps: intersection, the cheaper "can intersect" test, union
//! (merge) and fixation.
//!
//! ```rust
//! use autoconvert::format::{Caps, MediaFormat, PixelFormat, VideoFormat, VideoFormatCaps};
//!
//! let scaler_output = Caps::from(VideoFormatCaps::any());
//! let display = Caps::from(VideoFormatCaps::rgba().with_size(1280, 720));
//!
//! let common = scaler_output.intersect(&display);
//! assert!(!common.is_empty());
//! let fixed = common.fixate().unwrap();
//! assert_eq!(
//!     fixed,
//!     MediaFormat::VideoRaw(VideoFormat::new(1280, 720, PixelFormat::Rgba, Default::default()))
//! );
//! ```

use smallvec::SmallVec;
use std::fmt;

// ============================================================================
// CapsValue - constraint value for negotiation
// ============================================================================

/// A value that can be fixed, range, list, or any.
///
/// # Examples
///
/// ```rust
/// use autoconvert::format::CapsValue;
///
/// let fixed: CapsValue<u32> = CapsValue::Fixed(1920);
/// let range: CapsValue<u32> = CapsValue::Range { min: 720, max: 1920 };
/// assert_eq!(fixed.intersect(&range), Some(CapsValue::Fixed(1920)));
/// ```
#[derive(Clone, Debug, PartialEq, Default)]
pub enum CapsValue<T> {
    /// Exact value.
    Fixed(T),
    /// Range of acceptable values (inclusive).
    Range {
        /// Minimum acceptable value.
        min: T,
        /// Maximum acceptable value.
        max: T,
    },
    /// List of acceptable values, first is preferred.
    List(Vec<T>),
    /// Unconstrained.
    #[default]
    Any,
}

impl<T: Clone + Ord> CapsValue<T> {
    /// Check if a value is accepted by this constraint.
    pub fn accepts(&self, value: &T) -> bool {
        match self {
            Self::Fixed(v) => v == value,
            Self::Range { min, max } => value >= min && value <= max,
            Self::List(values) => values.contains(value),
            Self::Any => true,
        }
    }

    /// Intersect two constraints.
    ///
    /// Returns `None` if there's no overlap.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        match (self, other) {
            (Self::Any, other) => Some(other.clone()),
            (self_, Self::Any) => Some(self_.clone()),

            (Self::Fixed(a), Self::Fixed(b)) => (a == b).then(|| Self::Fixed(a.clone())),

            (Self::Fixed(v), Self::Range { min, max })
            | (Self::Range { min, max }, Self::Fixed(v)) => {
                (v >= min && v <= max).then(|| Self::Fixed(v.clone()))
            }

            (Self::Fixed(v), Self::List(list)) | (Self::List(list), Self::Fixed(v)) => {
                list.contains(v).then(|| Self::Fixed(v.clone()))
            }

            (
                Self::Range {
                    min: min1,
                    max: max1,
                },
                Self::Range {
                    min: min2,
                    max: max2,
                },
            ) => {
                let new_min = min1.max(min2);
                let new_max = max1.min(max2);
                if new_min > new_max {
                    None
                } else if new_min == new_max {
                    Some(Self::Fixed(new_min.clone()))
                } else {
                    Some(Self::Range {
                        min: new_min.clone(),
                        max: new_max.clone(),
                    })
                }
            }

            // Keeps the list's preference order.
            (Self::Range { min, max }, Self::List(list))
            | (Self::List(list), Self::Range { min, max }) => Self::collapse(
                list.iter()
                    .filter(|v| *v >= min && *v <= max)
                    .cloned()
                    .collect(),
            ),

            (Self::List(list1), Self::List(list2)) => Self::collapse(
                list1
                    .iter()
                    .filter(|v| list2.contains(v))
                    .cloned()
                    .collect(),
            ),
        }
    }

    fn collapse(mut values: Vec<T>) -> Option<Self> {
        match values.len() {
            0 => None,
            1 => values.pop().map(Self::Fixed),
            _ => Some(Self::List(values)),
        }
    }

    /// Choose a single value: first in list, min in range.
    ///
    /// Returns `None` for `Any`.
    pub fn fixate(&self) -> Option<T> {
        match self {
            Self::Fixed(v) => Some(v.clone()),
            Self::Range { min, .. } => Some(min.clone()),
            Self::List(values) => values.first().cloned(),
            Self::Any => None,
        }
    }

    /// Fixate with a default value for `Any`.
    pub fn fixate_with_default(&self, default: T) -> T {
        self.fixate().unwrap_or(default)
    }

    /// Choose the accepted value nearest to `preferred`.
    ///
    /// Ranges clamp, lists fall back to their first entry.
    pub fn fixate_towards(&self, preferred: &T) -> Option<T> {
        match self {
            Self::Fixed(v) => Some(v.clone()),
            Self::Range { min, max } if min <= max => {
                Some(preferred.clone().clamp(min.clone(), max.clone()))
            }
            Self::Range { .. } => None,
            Self::List(values) if values.contains(preferred) => Some(preferred.clone()),
            Self::List(values) => values.first().cloned(),
            Self::Any => Some(preferred.clone()),
        }
    }

    /// Check if this is a fixed value.
    #[inline]
    pub fn is_fixed(&self) -> bool {
        matches!(self, Self::Fixed(_))
    }

    /// Check if this accepts any value.
    #[inline]
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    /// Get the fixed value if this is fixed.
    #[inline]
    pub fn as_fixed(&self) -> Option<&T> {
        match self {
            Self::Fixed(v) => Some(v),
            _ => None,
        }
    }
}

impl<T: Clone + Ord> From<T> for CapsValue<T> {
    fn from(value: T) -> Self {
        Self::Fixed(value)
    }
}

impl<T: Clone + Ord> From<std::ops::RangeInclusive<T>> for CapsValue<T> {
    fn from(range: std::ops::RangeInclusive<T>) -> Self {
        let (min, max) = range.into_inner();
        Self::Range { min, max }
    }
}

impl<T: Clone + Ord> From<Vec<T>> for CapsValue<T> {
    fn from(values: Vec<T>) -> Self {
        Self::collapse(values).unwrap_or(Self::Any)
    }
}

// ============================================================================
// Media Formats
// ============================================================================

/// A fully fixed stream format.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MediaFormat {
    /// Raw video frames.
    VideoRaw(VideoFormat),
    /// Encoded video.
    Video(VideoCodec),
    /// Opaque bytes.
    Bytes,
}

impl MediaFormat {
    /// Bytes per buffer for raw formats, `None` for variable-size formats.
    pub fn buffer_size(&self) -> Option<usize> {
        match self {
            Self::VideoRaw(vf) => Some(vf.frame_size()),
            Self::Video(_) | Self::Bytes => None,
        }
    }

    /// The raw video format, if this is raw video.
    pub fn as_video_raw(&self) -> Option<&VideoFormat> {
        match self {
            Self::VideoRaw(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VideoRaw(v) => write!(
                f,
                "video/raw {}x{} {:?} {}/{}",
                v.width, v.height, v.pixel_format, v.framerate.num, v.framerate.den
            ),
            Self::Video(codec) => write!(f, "video/{codec:?}"),
            Self::Bytes => f.write_str("bytes"),
        }
    }
}

// ============================================================================
// Video Formats
// ============================================================================

/// Raw video format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct VideoFormat {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel format (color space and layout).
    pub pixel_format: PixelFormat,
    /// Frame rate.
    pub framerate: Framerate,
}

impl VideoFormat {
    /// Create a new video format.
    pub const fn new(
        width: u32,
        height: u32,
        pixel_format: PixelFormat,
        framerate: Framerate,
    ) -> Self {
        Self {
            width,
            height,
            pixel_format,
            framerate,
        }
    }

    /// Number of pixels per frame.
    pub const fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Calculate the frame size in bytes for this format.
    pub const fn frame_size(&self) -> usize {
        self.pixel_format.buffer_size(self.width, self.height)
    }
}

/// Pixel formats (color space and memory layout).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[repr(u8)]
pub enum PixelFormat {
    /// YUV 4:2:0 planar (Y plane, then U plane, then V plane).
    #[default]
    I420 = 0,
    /// YUV 4:2:0 semi-planar (Y plane, then interleaved UV plane).
    Nv12,
    /// RGB 8-bit per channel, packed (24 bits/pixel).
    Rgb24,
    /// RGBA 8-bit per channel, packed (32 bits/pixel).
    Rgba,
    /// BGR 8-bit per channel, packed (24 bits/pixel).
    Bgr24,
    /// BGRA 8-bit per channel, packed (32 bits/pixel).
    Bgra,
    /// 8-bit grayscale.
    Gray8,
}

impl PixelFormat {
    /// Bytes per pixel for packed formats, `None` for planar ones.
    pub const fn bytes_per_pixel(&self) -> Option<usize> {
        match self {
            Self::Rgb24 | Self::Bgr24 => Some(3),
            Self::Rgba | Self::Bgra => Some(4),
            Self::Gray8 => Some(1),
            Self::I420 | Self::Nv12 => None,
        }
    }

    /// Frame size in bytes at the given resolution.
    pub const fn buffer_size(&self, width: u32, height: u32) -> usize {
        let pixels = width as usize * height as usize;
        match self.bytes_per_pixel() {
            Some(bpp) => pixels * bpp,
            None => pixels + 2 * ((width as usize).div_ceil(2) * (height as usize).div_ceil(2)),
        }
    }

    /// Whether this is a YUV format.
    pub const fn is_yuv(&self) -> bool {
        matches!(self, Self::I420 | Self::Nv12)
    }
}

/// Video codecs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum VideoCodec {
    /// H.264 / AVC.
    H264,
    /// H.265 / HEVC.
    H265,
    /// VP8.
    Vp8,
    /// VP9.
    Vp9,
    /// AV1.
    Av1,
}

/// Frame rate as numerator/denominator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Framerate {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (time units).
    pub den: u32,
}

impl Framerate {
    /// Create a new framerate.
    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    /// 25 fps (PAL).
    pub const FPS_25: Self = Self::new(25, 1);
    /// 30 fps.
    pub const FPS_30: Self = Self::new(30, 1);
    /// 60 fps.
    pub const FPS_60: Self = Self::new(60, 1);
    /// 29.97 fps (NTSC).
    pub const FPS_29_97: Self = Self::new(30000, 1001);

    /// Get the framerate as a floating-point value.
    #[inline]
    pub fn fps(&self) -> f64 {
        self.num as f64 / self.den.max(1) as f64
    }
}

impl Default for Framerate {
    fn default() -> Self {
        Self::FPS_30
    }
}

impl PartialOrd for Framerate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Framerate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // a/b vs c/d => a*d vs c*b
        let lhs = (self.num as u64) * (other.den as u64);
        let rhs = (other.num as u64) * (self.den as u64);
        lhs.cmp(&rhs).then(self.den.cmp(&other.den))
    }
}

// ============================================================================
// Format Caps - constraint-based formats
// ============================================================================

/// Video format with constraints for negotiation.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct VideoFormatCaps {
    /// Width constraint.
    pub width: CapsValue<u32>,
    /// Height constraint.
    pub height: CapsValue<u32>,
    /// Pixel format constraint.
    pub pixel_format: CapsValue<PixelFormat>,
    /// Framerate constraint.
    pub framerate: CapsValue<Framerate>,
}

impl VideoFormatCaps {
    /// Create caps that accept any video format.
    pub fn any() -> Self {
        Self::default()
    }

    /// Create caps for a fixed video format.
    pub fn fixed(format: VideoFormat) -> Self {
        Self {
            width: CapsValue::Fixed(format.width),
            height: CapsValue::Fixed(format.height),
            pixel_format: CapsValue::Fixed(format.pixel_format),
            framerate: CapsValue::Fixed(format.framerate),
        }
    }

    /// I420 video of any size.
    pub fn yuv420() -> Self {
        Self {
            pixel_format: CapsValue::Fixed(PixelFormat::I420),
            ..Self::any()
        }
    }

    /// RGBA video of any size.
    pub fn rgba() -> Self {
        Self {
            pixel_format: CapsValue::Fixed(PixelFormat::Rgba),
            ..Self::any()
        }
    }

    /// Restrict to the given pixel formats, first preferred.
    pub fn with_pixel_formats(mut self, formats: impl IntoIterator<Item = PixelFormat>) -> Self {
        self.pixel_format = formats.into_iter().collect::<Vec<_>>().into();
        self
    }

    /// Restrict to a fixed size.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = CapsValue::Fixed(width);
        self.height = CapsValue::Fixed(height);
        self
    }

    /// Restrict to a size range.
    pub fn with_size_range(mut self, min_w: u32, max_w: u32, min_h: u32, max_h: u32) -> Self {
        self.width = CapsValue::Range {
            min: min_w,
            max: max_w,
        };
        self.height = CapsValue::Range {
            min: min_h,
            max: max_h,
        };
        self
    }

    /// Restrict to a fixed framerate.
    pub fn with_framerate(mut self, framerate: Framerate) -> Self {
        self.framerate = CapsValue::Fixed(framerate);
        self
    }

    /// Intersect with another video caps.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        Some(Self {
            width: self.width.intersect(&other.width)?,
            height: self.height.intersect(&other.height)?,
            pixel_format: self.pixel_format.intersect(&other.pixel_format)?,
            framerate: self.framerate.intersect(&other.framerate)?,
        })
    }

    /// Fixate to a concrete video format.
    pub fn fixate(&self) -> Option<VideoFormat> {
        Some(VideoFormat {
            width: self.width.fixate()?,
            height: self.height.fixate()?,
            pixel_format: self.pixel_format.fixate()?,
            framerate: self.framerate.fixate()?,
        })
    }

    /// Fixate with defaults for unconstrained values: 1920x1080, I420, 30fps.
    pub fn fixate_with_defaults(&self) -> VideoFormat {
        VideoFormat {
            width: self.width.fixate_with_default(1920),
            height: self.height.fixate_with_default(1080),
            pixel_format: self.pixel_format.fixate_with_default(PixelFormat::I420),
            framerate: self.framerate.fixate_with_default(Framerate::FPS_30),
        }
    }

    /// Fixate each field as close as possible to `preferred`.
    pub fn fixate_towards(&self, preferred: &VideoFormat) -> Option<VideoFormat> {
        Some(VideoFormat {
            width: self.width.fixate_towards(&preferred.width)?,
            height: self.height.fixate_towards(&preferred.height)?,
            pixel_format: self.pixel_format.fixate_towards(&preferred.pixel_format)?,
            framerate: self.framerate.fixate_towards(&preferred.framerate)?,
        })
    }

    /// Check if fully fixed.
    pub fn is_fixed(&self) -> bool {
        self.width.is_fixed()
            && self.height.is_fixed()
            && self.pixel_format.is_fixed()
            && self.framerate.is_fixed()
    }
}

impl From<VideoFormat> for VideoFormatCaps {
    fn from(format: VideoFormat) -> Self {
        Self::fixed(format)
    }
}

/// A single caps structure: constraints on one media type.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum FormatCaps {
    /// Raw video with constraints.
    VideoRaw(VideoFormatCaps),
    /// Encoded video.
    Video(VideoCodec),
    /// Opaque bytes.
    Bytes,
    /// Any format.
    #[default]
    Any,
}

impl FormatCaps {
    /// Intersect with another format caps.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        match (self, other) {
            (Self::Any, other) => Some(other.clone()),
            (self_, Self::Any) => Some(self_.clone()),

            (Self::VideoRaw(a), Self::VideoRaw(b)) => Some(Self::VideoRaw(a.intersect(b)?)),
            (Self::Video(a), Self::Video(b)) if a == b => Some(Self::Video(*a)),
            (Self::Bytes, Self::Bytes) => Some(Self::Bytes),

            _ => None,
        }
    }

    /// Fixate with defaults for unconstrained values.
    ///
    /// Returns `None` only for `Any`.
    pub fn fixate(&self) -> Option<MediaFormat> {
        match self {
            Self::VideoRaw(caps) => Some(MediaFormat::VideoRaw(caps.fixate_with_defaults())),
            Self::Video(codec) => Some(MediaFormat::Video(*codec)),
            Self::Bytes => Some(MediaFormat::Bytes),
            Self::Any => None,
        }
    }

    /// Fixate as close as possible to `preferred`.
    pub fn fixate_towards(&self, preferred: &MediaFormat) -> Option<MediaFormat> {
        match (self, preferred) {
            (Self::VideoRaw(caps), MediaFormat::VideoRaw(v)) => {
                caps.fixate_towards(v).map(MediaFormat::VideoRaw)
            }
            (Self::Any, preferred) => Some(preferred.clone()),
            _ => self.fixate(),
        }
    }

    /// Check if this is a video format (raw or encoded).
    pub fn is_video(&self) -> bool {
        matches!(self, Self::VideoRaw(_) | Self::Video(_))
    }
}

impl From<MediaFormat> for FormatCaps {
    fn from(format: MediaFormat) -> Self {
        match format {
            MediaFormat::VideoRaw(v) => Self::VideoRaw(v.into()),
            MediaFormat::Video(c) => Self::Video(c),
            MediaFormat::Bytes => Self::Bytes,
        }
    }
}

impl From<VideoFormatCaps> for FormatCaps {
    fn from(caps: VideoFormatCaps) -> Self {
        Self::VideoRaw(caps)
    }
}

// ============================================================================
// Caps - ordered set of structures
// ============================================================================

/// Capability descriptor: an ordered set of [`FormatCaps`] structures.
///
/// An empty set accepts nothing; a set containing [`FormatCaps::Any`]
/// accepts everything. Earlier structures are preferred.
#[derive(Clone, Debug, PartialEq)]
pub struct Caps(SmallVec<[FormatCaps; 2]>);

impl Caps {
    /// Caps accepting any format.
    pub fn any() -> Self {
        Self::new(FormatCaps::Any)
    }

    /// Caps accepting nothing.
    pub fn empty() -> Self {
        Self(SmallVec::new())
    }

    /// Caps with a single structure.
    pub fn new(structure: FormatCaps) -> Self {
        let mut v = SmallVec::new();
        v.push(structure);
        Self(v)
    }

    /// Caps with several structures, first preferred.
    pub fn many(structures: impl IntoIterator<Item = FormatCaps>) -> Self {
        let mut caps = Self::empty();
        for s in structures {
            caps.push(s);
        }
        caps
    }

    /// Caps describing exactly one fixed format.
    pub fn fixed(format: MediaFormat) -> Self {
        Self::new(format.into())
    }

    /// Does this accept any format?
    #[inline]
    pub fn is_any(&self) -> bool {
        self.0.iter().any(|s| matches!(s, FormatCaps::Any))
    }

    /// Does this accept nothing?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The structures, in preference order.
    #[inline]
    pub fn structures(&self) -> &[FormatCaps] {
        &self.0
    }

    fn push(&mut self, structure: FormatCaps) {
        if !self.0.contains(&structure) {
            self.0.push(structure);
        }
    }

    /// Whether any structure of `self` intersects any structure of `other`.
    pub fn can_intersect(&self, other: &Caps) -> bool {
        self.0
            .iter()
            .any(|a| other.0.iter().any(|b| a.intersect(b).is_some()))
    }

    /// Intersect, keeping `self`'s preference order.
    pub fn intersect(&self, other: &Caps) -> Caps {
        let mut out = Caps::empty();
        for a in &self.0 {
            for b in &other.0 {
                if let Some(s) = a.intersect(b) {
                    out.push(s);
                }
            }
        }
        out
    }

    /// Union of two caps.
    pub fn merge(&mut self, other: Caps) {
        if self.is_any() {
            return;
        }
        if other.is_any() {
            *self = Caps::any();
            return;
        }
        for s in other.0 {
            self.push(s);
        }
    }

    /// Union of two caps, by value.
    pub fn merged(mut self, other: Caps) -> Caps {
        self.merge(other);
        self
    }

    /// Apply an optional query filter; the filter's order wins.
    pub fn filtered(&self, filter: Option<&Caps>) -> Caps {
        match filter {
            Some(filter) => filter.intersect(self),
            None => self.clone(),
        }
    }

    /// Whether a fixed format is accepted.
    pub fn accepts(&self, format: &MediaFormat) -> bool {
        self.can_intersect(&Caps::fixed(format.clone()))
    }

    /// Fixate the first concrete structure.
    pub fn fixate(&self) -> Option<MediaFormat> {
        self.0.iter().find_map(FormatCaps::fixate)
    }

    /// Fixate as close as possible to `preferred`, first structure wins.
    pub fn fixate_towards(&self, preferred: &MediaFormat) -> Option<MediaFormat> {
        self.0.iter().find_map(|s| s.fixate_towards(preferred))
    }
}

impl Default for Caps {
    fn default() -> Self {
        Self::any()
    }
}

impl From<MediaFormat> for Caps {
    fn from(format: MediaFormat) -> Self {
        Self::fixed(format)
    }
}

impl From<FormatCaps> for Caps {
    fn from(structure: FormatCaps) -> Self {
        Self::new(structure)
    }
}

impl From<VideoFormatCaps> for Caps {
    fn from(caps: VideoFormatCaps) -> Self {
        Self::new(FormatCaps::VideoRaw(caps))
    }
}

impl FromIterator<FormatCaps> for Caps {
    fn from_iter<I: IntoIterator<Item = FormatCaps>>(iter: I) -> Self {
        Self::many(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(w: u32, h: u32, pf: PixelFormat) -> MediaFormat {
        MediaFormat::VideoRaw(VideoFormat::new(w, h, pf, Framerate::FPS_30))
    }

    #[test]
    fn test_caps_value_intersect() {
        let range = CapsValue::Range { min: 720, max: 1920 };
        assert_eq!(
            CapsValue::Fixed(1080).intersect(&range),
            Some(CapsValue::Fixed(1080))
        );
        assert_eq!(CapsValue::Fixed(480).intersect(&range), None);
        assert_eq!(
            CapsValue::List(vec![480, 720, 1080]).intersect(&range),
            Some(CapsValue::List(vec![720, 1080]))
        );
        assert_eq!(
            CapsValue::Range { min: 0, max: 720 }.intersect(&range),
            Some(CapsValue::Fixed(720))
        );
        assert_eq!(CapsValue::<u32>::Any.intersect(&range), Some(range));
    }

    #[test]
    fn test_caps_value_fixate_towards() {
        let range = CapsValue::Range { min: 16, max: 4096 };
        assert_eq!(range.fixate_towards(&1920), Some(1920));
        assert_eq!(range.fixate_towards(&8192), Some(4096));
        assert_eq!(CapsValue::List(vec![3, 5]).fixate_towards(&4), Some(3));
        assert_eq!(CapsValue::<u32>::Any.fixate_towards(&7), Some(7));
    }

    #[test]
    fn test_frame_size() {
        let fmt = VideoFormat::new(1920, 1080, PixelFormat::I420, Framerate::FPS_30);
        assert_eq!(fmt.frame_size(), 1920 * 1080 * 3 / 2);
        assert_eq!(PixelFormat::Rgba.buffer_size(4, 2), 32);
    }

    #[test]
    fn test_caps_any_and_empty() {
        assert!(Caps::any().is_any());
        assert!(Caps::empty().is_empty());
        assert!(!Caps::empty().can_intersect(&Caps::any()));
        assert!(Caps::any().can_intersect(&Caps::fixed(MediaFormat::Bytes)));
    }

    #[test]
    fn test_caps_intersect_keeps_order() {
        let a = Caps::many([
            VideoFormatCaps::rgba().into(),
            VideoFormatCaps::yuv420().into(),
        ]);
        let b = Caps::from(VideoFormatCaps::any().with_size(640, 480));
        let result = a.intersect(&b);
        assert_eq!(result.structures().len(), 2);
        assert_eq!(result.fixate(), Some(video(640, 480, PixelFormat::Rgba)));
        assert_eq!(
            b.intersect(&a).fixate(),
            Some(video(640, 480, PixelFormat::Rgba))
        );
    }

    #[test]
    fn test_caps_disjoint_media() {
        let video = Caps::from(VideoFormatCaps::any());
        let bytes = Caps::fixed(MediaFormat::Bytes);
        let h264 = Caps::new(FormatCaps::Video(VideoCodec::H264));
        assert!(!video.can_intersect(&bytes));
        assert!(!video.can_intersect(&h264));
        assert!(h264.can_intersect(&Caps::fixed(MediaFormat::Video(VideoCodec::H264))));
        assert!(!Caps::fixed(MediaFormat::Bytes).can_intersect(&h264));
    }

    #[test]
    fn test_caps_merge() {
        let mut caps = Caps::from(VideoFormatCaps::rgba());
        caps.merge(Caps::from(VideoFormatCaps::rgba()));
        assert_eq!(caps.structures().len(), 1);
        caps.merge(Caps::from(VideoFormatCaps::yuv420()));
        assert_eq!(caps.structures().len(), 2);
        caps.merge(Caps::any());
        assert!(caps.is_any());
        assert_eq!(caps.structures().len(), 1);
    }

    #[test]
    fn test_caps_filtered() {
        let caps = Caps::many([
            VideoFormatCaps::rgba().into(),
            VideoFormatCaps::yuv420().into(),
        ]);
        let filter = Caps::from(VideoFormatCaps::yuv420());
        let result = caps.filtered(Some(&filter));
        assert_eq!(result.structures().len(), 1);
        assert_eq!(caps.filtered(None), caps);
    }

    #[test]
    fn test_caps_fixate_towards_keeps_input_size() {
        let any_size = Caps::from(VideoFormatCaps::any().with_pixel_formats([PixelFormat::Rgba]));
        let input = video(1280, 720, PixelFormat::I420);
        assert_eq!(
            any_size.fixate_towards(&input),
            Some(video(1280, 720, PixelFormat::Rgba))
        );
        assert_eq!(Caps::any().fixate_towards(&input), Some(input.clone()));
        assert_eq!(Caps::empty().fixate_towards(&input), None);
        assert_eq!(Caps::any().fixate(), None);
    }

    #[test]
    fn test_media_format_display() {
        assert_eq!(
            video(1920, 1080, PixelFormat::I420).to_string(),
            "video/raw 1920x1080 I420 30/1"
        );
        assert_eq!(MediaFormat::Video(VideoCodec::H264).to_string(), "video/H264");
    }
}

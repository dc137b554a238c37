//! VideoConvert - pixel format conversion for raw video.

use crate::buffer::Buffer;
use crate::element::{PadDirection, PadTemplate, Stage, StageFactory};
use crate::error::{Error, Result};
use crate::format::{
    Caps, CapsValue, FormatCaps, MediaFormat, PixelFormat, VideoFormat, VideoFormatCaps,
};

/// Pixel formats the converter reads and writes, in preference order.
pub const SUPPORTED_FORMATS: [PixelFormat; 7] = [
    PixelFormat::I420,
    PixelFormat::Nv12,
    PixelFormat::Rgba,
    PixelFormat::Bgra,
    PixelFormat::Rgb24,
    PixelFormat::Bgr24,
    PixelFormat::Gray8,
];

/// Pixel format converter stage (BT.601, full range).
///
/// Size and framerate pass through unchanged.
#[derive(Debug, Default)]
pub struct VideoConvert {
    formats: Option<(VideoFormat, PixelFormat)>,
}

impl VideoConvert {
    /// Factory name.
    pub const NAME: &'static str = "videoconvert";

    /// Create a new converter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the converter accepts and produces.
    pub fn template_caps() -> Caps {
        Caps::from(VideoFormatCaps::any().with_pixel_formats(SUPPORTED_FORMATS))
    }

    /// A factory producing converters.
    pub fn factory() -> StageFactory {
        StageFactory::new(Self::NAME, "Filter/Converter/Video", || {
            Box::new(VideoConvert::new())
        })
        .with_template(PadTemplate::sink(Self::template_caps()))
        .with_template(PadTemplate::src(Self::template_caps()))
    }

    /// Convert one frame of `format` into `to`.
    pub fn convert(
        &self,
        format: &VideoFormat,
        to: PixelFormat,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<()> {
        let from = format.pixel_format;
        let (w, h) = (format.width as usize, format.height as usize);
        let in_size = from.buffer_size(format.width, format.height);
        let out_size = to.buffer_size(format.width, format.height);

        if input.len() < in_size || output.len() < out_size {
            return Err(Error::InvalidFormat(format!(
                "buffer too small for {:?} -> {:?} at {}x{}",
                from, to, w, h
            )));
        }

        let luma = w * h;
        let chroma = w.div_ceil(2) * h.div_ceil(2);

        match (from, to) {
            (a, b) if a == b => output[..in_size].copy_from_slice(&input[..in_size]),

            (PixelFormat::I420, PixelFormat::Nv12) => {
                output[..luma].copy_from_slice(&input[..luma]);
                let (u, v) = input[luma..].split_at(chroma);
                for (i, uv) in output[luma..out_size].chunks_exact_mut(2).enumerate() {
                    uv[0] = u[i];
                    uv[1] = v[i];
                }
            }
            (PixelFormat::Nv12, PixelFormat::I420) => {
                output[..luma].copy_from_slice(&input[..luma]);
                let (u, v) = output[luma..out_size].split_at_mut(chroma);
                for (i, uv) in input[luma..in_size].chunks_exact(2).enumerate() {
                    u[i] = uv[0];
                    v[i] = uv[1];
                }
            }
            (PixelFormat::I420 | PixelFormat::Nv12, PixelFormat::Gray8) => {
                output[..luma].copy_from_slice(&input[..luma]);
            }

            _ => {
                for y in 0..h {
                    for x in 0..w {
                        let px = read_pixel(from, input, w, h, x, y);
                        write_pixel(to, output, w, h, x, y, px);
                    }
                }
            }
        }

        Ok(())
    }
}

fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let y = y as i32;
    let u = u as i32 - 128;
    let v = v as i32 - 128;
    // BT.601, scaled by 1024
    let r = y + ((1436 * v) >> 10);
    let g = y - ((352 * u + 731 * v) >> 10);
    let b = y + ((1815 * u) >> 10);
    [r.clamp(0, 255) as u8, g.clamp(0, 255) as u8, b.clamp(0, 255) as u8]
}

fn rgb_to_yuv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    let y = ((306 * r + 601 * g + 117 * b) >> 10).clamp(0, 255);
    let u = (((-173 * r - 339 * g + 512 * b) >> 10) + 128).clamp(0, 255);
    let v = (((512 * r - 429 * g - 83 * b) >> 10) + 128).clamp(0, 255);
    [y as u8, u as u8, v as u8]
}

/// Chroma sample offsets (u, v) for planar or semi-planar 4:2:0.
fn chroma_offsets(format: PixelFormat, w: usize, h: usize, x: usize, y: usize) -> (usize, usize) {
    let cw = w.div_ceil(2);
    let ch = h.div_ceil(2);
    let c = (y / 2) * cw + x / 2;
    match format {
        PixelFormat::Nv12 => (w * h + c * 2, w * h + c * 2 + 1),
        _ => (w * h + c, w * h + cw * ch + c),
    }
}

fn read_pixel(
    format: PixelFormat,
    data: &[u8],
    w: usize,
    h: usize,
    x: usize,
    y: usize,
) -> [u8; 4] {
    let i = y * w + x;
    match format {
        PixelFormat::Rgb24 => [data[i * 3], data[i * 3 + 1], data[i * 3 + 2], 255],
        PixelFormat::Bgr24 => [data[i * 3 + 2], data[i * 3 + 1], data[i * 3], 255],
        PixelFormat::Rgba => [data[i * 4], data[i * 4 + 1], data[i * 4 + 2], data[i * 4 + 3]],
        PixelFormat::Bgra => [data[i * 4 + 2], data[i * 4 + 1], data[i * 4], data[i * 4 + 3]],
        PixelFormat::Gray8 => [data[i], data[i], data[i], 255],
        PixelFormat::I420 | PixelFormat::Nv12 => {
            let (u, v) = chroma_offsets(format, w, h, x, y);
            let [r, g, b] = yuv_to_rgb(data[i], data[u], data[v]);
            [r, g, b, 255]
        }
    }
}

fn write_pixel(
    format: PixelFormat,
    data: &mut [u8],
    w: usize,
    h: usize,
    x: usize,
    y: usize,
    [r, g, b, a]: [u8; 4],
) {
    let i = y * w + x;
    match format {
        PixelFormat::Rgb24 => data[i * 3..i * 3 + 3].copy_from_slice(&[r, g, b]),
        PixelFormat::Bgr24 => data[i * 3..i * 3 + 3].copy_from_slice(&[b, g, r]),
        PixelFormat::Rgba => data[i * 4..i * 4 + 4].copy_from_slice(&[r, g, b, a]),
        PixelFormat::Bgra => data[i * 4..i * 4 + 4].copy_from_slice(&[b, g, r, a]),
        PixelFormat::Gray8 => data[i] = rgb_to_yuv(r, g, b)[0],
        PixelFormat::I420 | PixelFormat::Nv12 => {
            let [luma, u, v] = rgb_to_yuv(r, g, b);
            data[i] = luma;
            // Top-left sample of each 2x2 block carries the chroma.
            if x % 2 == 0 && y % 2 == 0 {
                let (uo, vo) = chroma_offsets(format, w, h, x, y);
                data[uo] = u;
                data[vo] = v;
            }
        }
    }
}

impl Stage for VideoConvert {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn transform_caps(&self, _direction: PadDirection, caps: &Caps) -> Caps {
        caps.structures()
            .iter()
            .filter_map(|s| match s {
                FormatCaps::VideoRaw(v) => Some(FormatCaps::VideoRaw(VideoFormatCaps {
                    pixel_format: CapsValue::List(SUPPORTED_FORMATS.to_vec()),
                    ..v.clone()
                })),
                FormatCaps::Any => Some(FormatCaps::VideoRaw(
                    VideoFormatCaps::any().with_pixel_formats(SUPPORTED_FORMATS),
                )),
                _ => None,
            })
            .collect()
    }

    fn set_formats(&mut self, input: &MediaFormat, output: &MediaFormat) -> Result<()> {
        match (input, output) {
            (MediaFormat::VideoRaw(i), MediaFormat::VideoRaw(o))
                if i.width == o.width
                    && i.height == o.height
                    && i.framerate == o.framerate
                    && SUPPORTED_FORMATS.contains(&i.pixel_format)
                    && SUPPORTED_FORMATS.contains(&o.pixel_format) =>
            {
                self.formats = Some((*i, o.pixel_format));
                Ok(())
            }
            _ => Err(Error::InvalidFormat(format!(
                "{} cannot convert {} to {}",
                Self::NAME,
                input,
                output
            ))),
        }
    }

    fn process(&mut self, buffer: Buffer) -> Result<Option<Buffer>> {
        let (format, to) = self
            .formats
            .ok_or_else(|| Error::stage(Self::NAME, "not negotiated"))?;
        if format.pixel_format == to {
            return Ok(Some(buffer));
        }
        let mut output = vec![0u8; to.buffer_size(format.width, format.height)];
        self.convert(&format, to, buffer.as_bytes(), &mut output)?;
        Ok(Some(buffer.with_data(output)))
    }

    fn reset(&mut self) {
        self.formats = None;
    }
}

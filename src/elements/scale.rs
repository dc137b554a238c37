//! VideoScale - resolution conversion for raw video.

use crate::buffer::Buffer;
use crate::element::{PadDirection, PadTemplate, Stage, StageFactory};
use crate::error::{Error, Result};
use crate::format::{
    Caps, CapsValue, FormatCaps, MediaFormat, PixelFormat, VideoFormat, VideoFormatCaps,
};

/// Scaling algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleAlgorithm {
    /// Nearest neighbor - fastest, pixelated results.
    #[default]
    NearestNeighbor,
    /// Bilinear interpolation.
    Bilinear,
}

/// Video scaler stage.
///
/// Changes width and height; pixel format and framerate pass through.
#[derive(Debug, Default)]
pub struct VideoScale {
    algorithm: ScaleAlgorithm,
    formats: Option<(VideoFormat, VideoFormat)>,
}

impl VideoScale {
    /// Factory name.
    pub const NAME: &'static str = "videoscale";

    /// Create a new video scaler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scaling algorithm.
    pub fn with_algorithm(mut self, algorithm: ScaleAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Caps the scaler accepts and produces.
    pub fn template_caps() -> Caps {
        Caps::from(VideoFormatCaps::any().with_size_range(1, 16384, 1, 16384))
    }

    /// A factory producing nearest-neighbour scalers.
    pub fn factory() -> StageFactory {
        StageFactory::new(Self::NAME, "Filter/Converter/Video/Scaler", || {
            Box::new(VideoScale::new())
        })
        .with_template(PadTemplate::sink(Self::template_caps()))
        .with_template(PadTemplate::src(Self::template_caps()))
    }

    /// Scale one frame from `input` into `output`.
    pub fn scale(
        &self,
        from: &VideoFormat,
        to: &VideoFormat,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<()> {
        if input.len() < from.frame_size() || output.len() < to.frame_size() {
            return Err(Error::InvalidFormat(format!(
                "buffer too small for {}x{} -> {}x{}",
                from.width, from.height, to.width, to.height
            )));
        }

        let (in_w, in_h) = (from.width as usize, from.height as usize);
        let (out_w, out_h) = (to.width as usize, to.height as usize);

        match from.pixel_format.bytes_per_pixel() {
            Some(bpp) => self.scale_plane(input, in_w, in_h, output, out_w, out_h, bpp),
            None => {
                let (in_cw, in_ch) = (in_w.div_ceil(2), in_h.div_ceil(2));
                let (out_cw, out_ch) = (out_w.div_ceil(2), out_h.div_ceil(2));
                let (in_luma, in_chroma) = input.split_at(in_w * in_h);
                let (out_luma, out_chroma) = output.split_at_mut(out_w * out_h);

                self.scale_plane(in_luma, in_w, in_h, out_luma, out_w, out_h, 1);
                match from.pixel_format {
                    PixelFormat::Nv12 => {
                        self.scale_plane(in_chroma, in_cw, in_ch, out_chroma, out_cw, out_ch, 2);
                    }
                    _ => {
                        let (in_u, in_v) = in_chroma.split_at(in_cw * in_ch);
                        let (out_u, out_v) = out_chroma.split_at_mut(out_cw * out_ch);
                        self.scale_plane(in_u, in_cw, in_ch, out_u, out_cw, out_ch, 1);
                        self.scale_plane(in_v, in_cw, in_ch, out_v, out_cw, out_ch, 1);
                    }
                }
            }
        }

        Ok(())
    }

    /// Scale one plane of `channels` interleaved bytes per pixel.
    #[allow(clippy::too_many_arguments)]
    fn scale_plane(
        &self,
        input: &[u8],
        in_w: usize,
        in_h: usize,
        output: &mut [u8],
        out_w: usize,
        out_h: usize,
        channels: usize,
    ) {
        if in_w == 0 || in_h == 0 {
            return;
        }

        match self.algorithm {
            ScaleAlgorithm::NearestNeighbor => {
                for out_y in 0..out_h {
                    let in_y = (out_y * in_h / out_h).min(in_h - 1);
                    for out_x in 0..out_w {
                        let in_x = (out_x * in_w / out_w).min(in_w - 1);
                        let src = (in_y * in_w + in_x) * channels;
                        let dst = (out_y * out_w + out_x) * channels;
                        output[dst..dst + channels].copy_from_slice(&input[src..src + channels]);
                    }
                }
            }
            ScaleAlgorithm::Bilinear => {
                let x_ratio = (in_w as f32 - 1.0) / (out_w as f32).max(1.0);
                let y_ratio = (in_h as f32 - 1.0) / (out_h as f32).max(1.0);

                for out_y in 0..out_h {
                    let src_y = out_y as f32 * y_ratio;
                    let y0 = src_y.floor() as usize;
                    let y1 = (y0 + 1).min(in_h - 1);
                    let y_frac = src_y - y0 as f32;

                    for out_x in 0..out_w {
                        let src_x = out_x as f32 * x_ratio;
                        let x0 = src_x.floor() as usize;
                        let x1 = (x0 + 1).min(in_w - 1);
                        let x_frac = src_x - x0 as f32;

                        for c in 0..channels {
                            let p00 = input[(y0 * in_w + x0) * channels + c] as f32;
                            let p10 = input[(y0 * in_w + x1) * channels + c] as f32;
                            let p01 = input[(y1 * in_w + x0) * channels + c] as f32;
                            let p11 = input[(y1 * in_w + x1) * channels + c] as f32;

                            let top = p00 + x_frac * (p10 - p00);
                            let bottom = p01 + x_frac * (p11 - p01);
                            output[(out_y * out_w + out_x) * channels + c] =
                                (top + y_frac * (bottom - top)).round() as u8;
                        }
                    }
                }
            }
        }
    }
}

impl Stage for VideoScale {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn transform_caps(&self, _direction: PadDirection, caps: &Caps) -> Caps {
        caps.structures()
            .iter()
            .filter_map(|s| match s {
                FormatCaps::VideoRaw(v) => Some(FormatCaps::VideoRaw(VideoFormatCaps {
                    width: CapsValue::Any,
                    height: CapsValue::Any,
                    ..v.clone()
                })),
                FormatCaps::Any => Some(FormatCaps::VideoRaw(VideoFormatCaps::any())),
                _ => None,
            })
            .collect()
    }

    fn set_formats(&mut self, input: &MediaFormat, output: &MediaFormat) -> Result<()> {
        match (input, output) {
            (MediaFormat::VideoRaw(i), MediaFormat::VideoRaw(o))
                if i.pixel_format == o.pixel_format && i.framerate == o.framerate =>
            {
                self.formats = Some((*i, *o));
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
        let (from, to) = self
            .formats
            .ok_or_else(|| Error::stage(Self::NAME, "not negotiated"))?;
        if from == to {
            return Ok(Some(buffer));
        }
        let mut output = vec![0u8; to.frame_size()];
        self.scale(&from, &to, buffer.as_bytes(), &mut output)?;
        Ok(Some(buffer.with_data(output)))
    }

    fn reset(&mut self) {
        self.formats = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Framerate;

    fn fmt(w: u32, h: u32, pf: PixelFormat) -> VideoFormat {
        VideoFormat::new(w, h, pf, Framerate::FPS_30)
    }

    #[test]
    fn test_nearest_downscale_gray() {
        let scaler = VideoScale::new();
        #[rustfmt::skip]
        let input = [
            1, 1, 2, 2,
            1, 1, 2, 2,
            3, 3, 4, 4,
            3, 3, 4, 4,
        ];
        let mut output = [0u8; 4];
        scaler
            .scale(
                &fmt(4, 4, PixelFormat::Gray8),
                &fmt(2, 2, PixelFormat::Gray8),
                &input,
                &mut output,
            )
            .unwrap();
        assert_eq!(output, [1, 2, 3, 4]);
    }

    #[test]
    fn test_upscale_rgba_replicates_pixels() {
        let scaler = VideoScale::new();
        let input = [10, 20, 30, 255];
        let mut output = [0u8; 16];
        scaler
            .scale(
                &fmt(1, 1, PixelFormat::Rgba),
                &fmt(2, 2, PixelFormat::Rgba),
                &input,
                &mut output,
            )
            .unwrap();
        assert!(output.chunks(4).all(|px| px == [10, 20, 30, 255]));
    }

    #[test]
    fn test_i420_planes() {
        let scaler = VideoScale::new();
        let from = fmt(4, 4, PixelFormat::I420);
        let to = fmt(2, 2, PixelFormat::I420);
        let mut input = vec![100u8; from.frame_size()];
        input[16..20].fill(50);
        input[20..24].fill(200);
        let mut output = vec![0u8; to.frame_size()];
        scaler.scale(&from, &to, &input, &mut output).unwrap();
        assert_eq!(&output[..4], &[100; 4]);
        assert_eq!(output[4], 50);
        assert_eq!(output[5], 200);
    }

    #[test]
    fn test_bilinear_flat_image() {
        let scaler = VideoScale::new().with_algorithm(ScaleAlgorithm::Bilinear);
        let from = fmt(8, 8, PixelFormat::Rgb24);
        let to = fmt(3, 5, PixelFormat::Rgb24);
        let input = vec![77u8; from.frame_size()];
        let mut output = vec![0u8; to.frame_size()];
        scaler.scale(&from, &to, &input, &mut output).unwrap();
        assert!(output.iter().all(|&b| b == 77));
    }

    #[test]
    fn test_small_buffer_rejected() {
        let scaler = VideoScale::new();
        let mut output = [0u8; 4];
        let result = scaler.scale(
            &fmt(4, 4, PixelFormat::Gray8),
            &fmt(2, 2, PixelFormat::Gray8),
            &[0u8; 3],
            &mut output,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_transform_caps_frees_size() {
        let scaler = VideoScale::new();
        let input = Caps::fixed(MediaFormat::VideoRaw(fmt(1920, 1080, PixelFormat::I420)));
        let out = scaler.transform_caps(PadDirection::Input, &input);
        assert!(out.accepts(&MediaFormat::VideoRaw(fmt(640, 360, PixelFormat::I420))));
        assert!(!out.accepts(&MediaFormat::VideoRaw(fmt(640, 360, PixelFormat::Rgba))));
        assert!(
            scaler
                .transform_caps(PadDirection::Input, &Caps::fixed(MediaFormat::Bytes))
                .is_empty()
        );
    }

    #[test]
    fn test_set_formats_and_process() {
        let mut scaler = VideoScale::new();
        let from = fmt(4, 2, PixelFormat::Gray8);
        let to = fmt(2, 1, PixelFormat::Gray8);
        assert!(
            scaler
                .set_formats(
                    &MediaFormat::VideoRaw(from),
                    &MediaFormat::VideoRaw(fmt(2, 1, PixelFormat::Rgba))
                )
                .is_err()
        );
        scaler
            .set_formats(&MediaFormat::VideoRaw(from), &MediaFormat::VideoRaw(to))
            .unwrap();
        let out = scaler
            .process(Buffer::from_vec(vec![1, 1, 2, 2, 3, 3, 4, 4]))
            .unwrap()
            .unwrap();
        assert_eq!(out.as_bytes(), &[1, 2]);
    }
}

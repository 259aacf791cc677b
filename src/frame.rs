//! Sampled frames and their encoded form.
//!
//! [`TimestampedFrame`] is the only thing the sampler hands back. Downstream
//! consumers (description models, object detectors, UIs) usually want an
//! encoded image rather than raw pixels, so [`TimestampedFrame::encode`]
//! produces PNG or JPEG bytes.

use std::io::Cursor;
use std::time::Duration;

use image::{DynamicImage, ImageFormat, codecs::jpeg::JpegEncoder};

use crate::error::SamplerError;

/// A decoded video frame: an 8-bit-per-channel pixel buffer.
pub type Frame = DynamicImage;

/// Encoding used when handing frames downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageEncoding {
    /// Lossless PNG. This is the default.
    #[default]
    Png,
    /// JPEG at the given quality (1–100). Alpha is discarded.
    Jpeg {
        /// Encoder quality, clamped to 1–100.
        quality: u8,
    },
}

impl ImageEncoding {
    /// JPEG with a quality suited to model input.
    pub const JPEG: ImageEncoding = ImageEncoding::Jpeg { quality: 85 };

    /// Conventional file extension for this encoding.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageEncoding::Png => "png",
            ImageEncoding::Jpeg { .. } => "jpg",
        }
    }
}

/// A frame chosen by the sampler, with its position on the timeline.
///
/// `index` is 1-based and reflects the final time ordering.
#[derive(Debug, Clone)]
pub struct TimestampedFrame {
    /// The decoded frame.
    pub frame: Frame,
    /// Seconds from the start of the video.
    pub time: f64,
    /// 1-based position in the sampled sequence.
    pub index: usize,
}

impl TimestampedFrame {
    /// The frame time as a [`Duration`].
    pub fn timestamp(&self) -> Duration {
        Duration::from_secs_f64(self.time.max(0.0))
    }

    /// Encode the frame to an in-memory image buffer.
    ///
    /// # Errors
    ///
    /// Returns [`SamplerError::ImageError`] if the encoder rejects the
    /// frame.
    pub fn encode(&self, encoding: ImageEncoding) -> Result<Vec<u8>, SamplerError> {
        let mut buffer = Cursor::new(Vec::new());
        match encoding {
            ImageEncoding::Png => {
                self.frame.write_to(&mut buffer, ImageFormat::Png)?;
            }
            ImageEncoding::Jpeg { quality } => {
                // JPEG has no alpha channel.
                let rgb = DynamicImage::ImageRgb8(self.frame.to_rgb8());
                let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
                rgb.write_with_encoder(encoder)?;
            }
        }
        Ok(buffer.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};

    use super::*;

    fn sample_frame() -> TimestampedFrame {
        let image = RgbaImage::from_pixel(4, 3, Rgba([10, 200, 30, 128]));
        TimestampedFrame {
            frame: DynamicImage::ImageRgba8(image),
            time: 2.25,
            index: 1,
        }
    }

    #[test]
    fn png_bytes_carry_signature() {
        let bytes = sample_frame().encode(ImageEncoding::Png).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn jpeg_drops_alpha_and_decodes_back() {
        let bytes = sample_frame().encode(ImageEncoding::JPEG).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
    }

    #[test]
    fn timestamp_matches_time() {
        assert_eq!(sample_frame().timestamp(), Duration::from_millis(2250));
    }

    #[test]
    fn extensions() {
        assert_eq!(ImageEncoding::Png.extension(), "png");
        assert_eq!(ImageEncoding::JPEG.extension(), "jpg");
    }
}

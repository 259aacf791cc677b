//! Timestamp and pixel-buffer helpers shared by the FFmpeg-backed sources.

use ffmpeg_next::{Rational, frame::Video as VideoFrame};
use ffmpeg_sys_next::AV_TIME_BASE;

/// Copy pixel data from an FFmpeg video frame into a tightly-packed buffer.
///
/// `bytes_per_pixel` is the number of bytes per pixel for the output format
/// (3 for RGB24, 1 for GRAY8).
pub(crate) fn frame_to_buffer(
    video_frame: &VideoFrame,
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let row_length = (width as usize) * bytes_per_pixel;
    let data = video_frame.data(0);

    if stride == row_length {
        data[..row_length * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_length * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + row_length]);
        }
        buffer
    }
}

/// Rescale a PTS value from stream time base to seconds.
pub(crate) fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Rescale seconds to a PTS value in the stream time base.
pub(crate) fn seconds_to_pts(seconds: f64, time_base: Rational) -> i64 {
    let numerator = time_base.numerator().max(1) as f64;
    (seconds * time_base.denominator() as f64 / numerator).round() as i64
}

/// Convert seconds to a container-level seek timestamp.
///
/// `input_context.seek()` seeks across all streams (`stream_index = -1`),
/// which expects `AV_TIME_BASE` units.
pub(crate) fn seconds_to_seek_timestamp(seconds: f64) -> i64 {
    (seconds.max(0.0) * f64::from(AV_TIME_BASE)) as i64
}

/// Scaled dimensions for an analysis width, keeping the aspect ratio.
///
/// Never upscales, and keeps both sides at least one pixel.
pub(crate) fn analysis_dimensions(width: u32, height: u32, target_width: Option<u32>) -> (u32, u32) {
    match target_width {
        Some(target) if target > 0 && target < width => {
            let scaled_height = (u64::from(height) * u64::from(target) / u64::from(width)).max(1);
            (target, scaled_height as u32)
        }
        _ => (width.max(1), height.max(1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pts_round_trip() {
        let time_base = Rational::new(1, 90_000);
        assert_eq!(seconds_to_pts(2.5, time_base), 225_000);
        assert!((pts_to_seconds(225_000, time_base) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn seek_timestamps_are_microseconds() {
        assert_eq!(seconds_to_seek_timestamp(1.25), 1_250_000);
        assert_eq!(seconds_to_seek_timestamp(-3.0), 0);
    }

    #[test]
    fn analysis_keeps_aspect() {
        assert_eq!(analysis_dimensions(1920, 1080, Some(320)), (320, 180));
        assert_eq!(analysis_dimensions(160, 90, Some(320)), (160, 90));
        assert_eq!(analysis_dimensions(1920, 1080, None), (1920, 1080));
        assert_eq!(analysis_dimensions(4000, 1, Some(320)), (320, 1));
    }
}

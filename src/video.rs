//! [`FrameSource`] for [`MediaFile`].
//!
//! Every call builds a fresh decoder, seeks to the nearest keyframe before
//! the requested time and decodes forward. Random access returns RGB frames
//! at full resolution; the sequential scan returns grayscale frames scaled
//! down to the analysis width.

use std::ops::ControlFlow;

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::{DynamicImage, GrayImage, RgbImage};

use crate::{
    conversion::{analysis_dimensions, frame_to_buffer, pts_to_seconds, seconds_to_seek_timestamp},
    error::SamplerError,
    frame::Frame,
    media::MediaFile,
    source::{FrameSource, ScanWindow, Subclip},
};

impl FrameSource for MediaFile {
    fn duration(&self) -> f64 {
        self.metadata.duration_seconds()
    }

    fn frames_per_second(&self) -> f64 {
        self.metadata
            .video
            .as_ref()
            .map_or(0.0, |video| video.frames_per_second)
    }

    /// Decode the frame displayed at `time`.
    ///
    /// The first frame whose timestamp reaches `time` (within half a frame)
    /// is returned. If the stream ends first, the last decoded frame is.
    ///
    /// # Errors
    ///
    /// - [`SamplerError::NoVideoStream`] if the file has no video.
    /// - [`SamplerError::InvalidTimestamp`] if `time` is outside
    ///   `[0, duration]`.
    /// - [`SamplerError::VideoDecodeError`] if nothing could be decoded.
    fn frame_at(&mut self, time: f64) -> Result<Frame, SamplerError> {
        let stream_index = self.video_stream_index.ok_or(SamplerError::NoVideoStream)?;
        if !time.is_finite() || time < 0.0 || time > self.duration() {
            return Err(SamplerError::InvalidTimestamp(time));
        }

        let frames_per_second = self.frames_per_second();
        let tolerance = if frames_per_second > 0.0 {
            0.5 / frames_per_second
        } else {
            0.0
        };

        let (mut decoder, timeline) = open_video_decoder(&self.input_context, stream_index)?;
        self.input_context.seek(
            timeline.seek_timestamp(time),
            ..timeline.seek_timestamp(time),
        )?;

        log::debug!("Decoding frame at {time:.3}s (stream={stream_index})");

        let mut converter = FrameConverter::new(Pixel::RGB24, None);
        let mut previous = VideoFrame::empty();
        let mut has_previous = false;
        let mut found = None;

        decode_stream(
            &mut self.input_context,
            stream_index,
            &mut decoder,
            &mut |decoded| {
                let reached = timeline
                    .seconds(decoded)
                    .is_some_and(|seconds| seconds + tolerance >= time);
                if reached {
                    found = Some(converter.convert(decoded)?);
                    return Ok(ControlFlow::Break(()));
                }
                std::mem::swap(decoded, &mut previous);
                has_previous = true;
                Ok(ControlFlow::Continue(()))
            },
        )?;

        if let Some(frame) = found {
            return Ok(frame);
        }
        if has_previous {
            log::debug!("Stream ended before {time:.3}s, using the last decoded frame");
            return converter.convert(&previous);
        }
        Err(SamplerError::VideoDecodeError(format!(
            "No frame could be decoded at {time:.3}s"
        )))
    }

    fn scan(
        &mut self,
        window: ScanWindow,
        visitor: &mut dyn FnMut(f64, Frame) -> ControlFlow<()>,
    ) -> Result<(), SamplerError> {
        let stream_index = self.video_stream_index.ok_or(SamplerError::NoVideoStream)?;
        let (mut decoder, timeline) = open_video_decoder(&self.input_context, stream_index)?;
        self.input_context.seek(
            timeline.seek_timestamp(window.start),
            ..timeline.seek_timestamp(window.start),
        )?;

        log::debug!(
            "Scanning {:.3}s..{:.3}s (stream={stream_index}, width={:?})",
            window.start,
            window.end,
            window.analysis_width,
        );

        let mut converter = FrameConverter::new(Pixel::GRAY8, window.analysis_width);

        decode_stream(
            &mut self.input_context,
            stream_index,
            &mut decoder,
            &mut |decoded| {
                let Some(seconds) = timeline.seconds(decoded) else {
                    return Ok(ControlFlow::Continue(()));
                };
                if seconds < window.start {
                    return Ok(ControlFlow::Continue(()));
                }
                if seconds > window.end {
                    return Ok(ControlFlow::Break(()));
                }
                let frame = converter.convert(decoded)?;
                Ok(visitor(seconds, frame))
            },
        )?;

        Ok(())
    }

    fn subclip(&mut self, start: f64, end: f64) -> Result<Option<Subclip>, SamplerError> {
        crate::subclip::create(self, start, end).map(Some)
    }
}

/// Maps decoder timestamps onto the zero-based media timeline.
struct Timeline {
    time_base: Rational,
    start_pts: i64,
}

impl Timeline {
    fn seconds(&self, frame: &VideoFrame) -> Option<f64> {
        let pts = frame.timestamp().or_else(|| frame.pts())?;
        Some(pts_to_seconds(pts - self.start_pts, self.time_base))
    }

    fn seek_timestamp(&self, seconds: f64) -> i64 {
        seconds_to_seek_timestamp(seconds + pts_to_seconds(self.start_pts, self.time_base))
    }
}

fn open_video_decoder(
    input_context: &Input,
    stream_index: usize,
) -> Result<(VideoDecoder, Timeline), SamplerError> {
    let stream = input_context
        .stream(stream_index)
        .ok_or(SamplerError::NoVideoStream)?;
    let start_time = stream.start_time();
    let timeline = Timeline {
        time_base: stream.time_base(),
        // `AV_NOPTS_VALUE` when the container does not know.
        start_pts: if start_time == i64::MIN {
            0
        } else {
            start_time
        },
    };
    let decoder_context = CodecContext::from_parameters(stream.parameters())?;
    let decoder = decoder_context.decoder().video().map_err(|error| {
        SamplerError::VideoDecodeError(format!("Failed to create video decoder: {error}"))
    })?;
    Ok((decoder, timeline))
}

/// Feed packets of one stream through `decoder`, handing every decoded
/// frame to `on_frame` until it breaks or the stream ends.
fn decode_stream(
    input_context: &mut Input,
    stream_index: usize,
    decoder: &mut VideoDecoder,
    on_frame: &mut dyn FnMut(&mut VideoFrame) -> Result<ControlFlow<()>, SamplerError>,
) -> Result<(), SamplerError> {
    let mut decoded_frame = VideoFrame::empty();

    loop {
        let mut packet = Packet::empty();
        match packet.read(input_context) {
            Ok(()) => {
                if packet.stream() != stream_index {
                    continue;
                }
                decoder.send_packet(&packet).map_err(|error| {
                    SamplerError::VideoDecodeError(format!("Failed to decode packet: {error}"))
                })?;
            }
            Err(FfmpegError::Eof) => break,
            Err(error) => return Err(error.into()),
        }
        while decoder.receive_frame(&mut decoded_frame).is_ok() {
            if on_frame(&mut decoded_frame)?.is_break() {
                return Ok(());
            }
        }
    }

    decoder.send_eof()?;
    while decoder.receive_frame(&mut decoded_frame).is_ok() {
        if on_frame(&mut decoded_frame)?.is_break() {
            return Ok(());
        }
    }
    Ok(())
}

/// Converts decoded frames to RGB24 or GRAY8 images.
///
/// The scaler is built on first use and rebuilt whenever the decoder's
/// output format or size changes mid-stream.
struct FrameConverter {
    format: Pixel,
    target_width: Option<u32>,
    scaler: Option<ScalerState>,
    output: VideoFrame,
}

struct ScalerState {
    context: ScalingContext,
    input: (Pixel, u32, u32),
    output_width: u32,
    output_height: u32,
}

impl FrameConverter {
    fn new(format: Pixel, target_width: Option<u32>) -> Self {
        Self {
            format,
            target_width,
            scaler: None,
            output: VideoFrame::empty(),
        }
    }

    fn convert(&mut self, decoded: &VideoFrame) -> Result<Frame, SamplerError> {
        let input = (decoded.format(), decoded.width(), decoded.height());
        let stale = self
            .scaler
            .as_ref()
            .is_none_or(|state| state.input != input);
        if stale {
            let (output_width, output_height) =
                analysis_dimensions(input.1, input.2, self.target_width);
            let context = ScalingContext::get(
                input.0,
                input.1,
                input.2,
                self.format,
                output_width,
                output_height,
                ScalingFlags::BILINEAR,
            )?;
            self.scaler = Some(ScalerState {
                context,
                input,
                output_width,
                output_height,
            });
        }

        let Some(state) = self.scaler.as_mut() else {
            return Err(SamplerError::VideoDecodeError(
                "Pixel converter unavailable".to_string(),
            ));
        };
        state.context.run(decoded, &mut self.output)?;

        let (width, height) = (state.output_width, state.output_height);
        let image = match self.format {
            Pixel::GRAY8 => {
                let buffer = frame_to_buffer(&self.output, width, height, 1);
                GrayImage::from_raw(width, height, buffer).map(DynamicImage::ImageLuma8)
            }
            _ => {
                let buffer = frame_to_buffer(&self.output, width, height, 3);
                RgbImage::from_raw(width, height, buffer).map(DynamicImage::ImageRgb8)
            }
        };
        image.ok_or_else(|| {
            SamplerError::VideoDecodeError(
                "Failed to construct image from decoded frame data".to_string(),
            )
        })
    }
}

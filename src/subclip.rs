//! Disk-backed sub-clips for long scene scans.
//!
//! The video stream between two timestamps is stream-copied (no
//! re-encoding) into a Matroska file inside a private temporary directory.
//! Because the copy starts at the keyframe before the requested start, the
//! sub-clip's time zero sits slightly earlier than requested; that position
//! is reported as [`Subclip::origin`] so callers can map timestamps back.
//! The directory is removed when the sub-clip is dropped.

use std::ops::ControlFlow;

use ffmpeg_next::{Error as FfmpegError, Packet, codec::Id, encoder};
use tempfile::TempDir;

use crate::{
    conversion::{pts_to_seconds, seconds_to_pts, seconds_to_seek_timestamp},
    error::SamplerError,
    frame::Frame,
    media::MediaFile,
    source::{FrameSource, ScanWindow, Subclip},
};

const SUBCLIP_FILE_NAME: &str = "subclip.mkv";

/// A sub-clip file together with the directory that owns it.
pub(crate) struct SubclipSource {
    media: MediaFile,
    // Dropped after `media`, so the file is closed before it is deleted.
    _directory: TempDir,
}

impl FrameSource for SubclipSource {
    fn duration(&self) -> f64 {
        self.media.duration()
    }

    fn frames_per_second(&self) -> f64 {
        self.media.frames_per_second()
    }

    fn frame_at(&mut self, time: f64) -> Result<Frame, SamplerError> {
        self.media.frame_at(time)
    }

    fn scan(
        &mut self,
        window: ScanWindow,
        visitor: &mut dyn FnMut(f64, Frame) -> ControlFlow<()>,
    ) -> Result<(), SamplerError> {
        self.media.scan(window, visitor)
    }
}

/// Copy `[start, end]` of the video stream of `media` into a temporary
/// file and open it.
pub(crate) fn create(media: &mut MediaFile, start: f64, end: f64) -> Result<Subclip, SamplerError> {
    let stream_index = media.video_stream_index.ok_or(SamplerError::NoVideoStream)?;
    let directory = tempfile::Builder::new().prefix("framesift-").tempdir()?;
    let output_path = directory.path().join(SUBCLIP_FILE_NAME);

    log::debug!(
        "Writing sub-clip {start:.3}s..{end:.3}s to {}",
        output_path.display()
    );

    let (input_time_base, stream_start) = {
        let stream = media
            .input_context
            .stream(stream_index)
            .ok_or(SamplerError::NoVideoStream)?;
        let start_time = stream.start_time();
        let stream_start = if start_time == i64::MIN { 0 } else { start_time };
        (stream.time_base(), stream_start)
    };
    let start_offset = pts_to_seconds(stream_start, input_time_base);

    let mut output_context = ffmpeg_next::format::output(&output_path).map_err(|error| {
        SamplerError::FileOpen {
            path: output_path.clone(),
            reason: format!("Failed to create sub-clip: {error}"),
        }
    })?;
    {
        let stream = media
            .input_context
            .stream(stream_index)
            .ok_or(SamplerError::NoVideoStream)?;
        let mut output_stream = output_context.add_stream(encoder::find(Id::None))?;
        output_stream.set_parameters(stream.parameters());
        // Let the muxer choose its own codec tag.
        unsafe {
            (*output_stream.parameters().as_mut_ptr()).codec_tag = 0;
        }
    }
    output_context.write_header()?;

    let output_time_base = output_context
        .stream(0)
        .map(|stream| stream.time_base())
        .ok_or_else(|| SamplerError::FfmpegError("Sub-clip stream missing".to_string()))?;

    let seek_target = seconds_to_seek_timestamp(start + start_offset);
    media.input_context.seek(seek_target, ..seek_target)?;

    let end_pts = seconds_to_pts(end + start_offset, input_time_base);
    let mut base_pts: Option<i64> = None;
    let mut first_pts: Option<i64> = None;
    let mut packets_written = 0_u64;

    loop {
        let mut packet = Packet::empty();
        match packet.read(&mut media.input_context) {
            Ok(()) => {}
            Err(FfmpegError::Eof) => break,
            Err(error) => return Err(error.into()),
        }
        if packet.stream() != stream_index {
            continue;
        }
        let Some(position) = packet.pts().or_else(|| packet.dts()) else {
            continue;
        };
        // Keep going past `end` until the next keyframe so frames reordered
        // around the boundary are not lost.
        if position > end_pts && packet.is_key() {
            break;
        }

        // Rebase on the first decode timestamp so none go negative.
        let base = *base_pts.get_or_insert_with(|| packet.dts().unwrap_or(position).min(position));
        if let Some(pts) = packet.pts() {
            first_pts = Some(first_pts.map_or(pts, |first| first.min(pts)));
        }
        packet.set_pts(packet.pts().map(|pts| pts - base));
        packet.set_dts(packet.dts().map(|dts| dts - base));
        packet.set_stream(0);
        packet.rescale_ts(input_time_base, output_time_base);
        packet.set_position(-1);
        packet.write_interleaved(&mut output_context)?;
        packets_written += 1;
    }

    output_context.write_trailer()?;
    drop(output_context);

    let Some(base) = base_pts else {
        return Err(SamplerError::VideoDecodeError(format!(
            "No video packets between {start:.3}s and {end:.3}s"
        )));
    };
    // The sub-clip's own timeline starts at its earliest presentation time.
    let origin = pts_to_seconds(first_pts.unwrap_or(base) - stream_start, input_time_base);

    log::debug!("Sub-clip holds {packets_written} packet(s), origin {origin:.3}s");

    let clip = MediaFile::open(&output_path)?;
    Ok(Subclip {
        origin,
        source: Box::new(SubclipSource {
            media: clip,
            _directory: directory,
        }),
    })
}

//! The FFmpeg-backed media handle.
//!
//! [`MediaFile`] opens a container, picks the best video and audio streams
//! and caches their metadata. It implements [`FrameSource`](crate::FrameSource)
//! for the sampler and [`AudioSource`](crate::AudioSource) for transcription.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use ffmpeg_next::{codec::context::Context as CodecContext, format::context::Input, media::Type};

use crate::{
    error::SamplerError,
    metadata::{AudioMetadata, MediaMetadata, VideoMetadata},
    progress::{NoOpProgress, ProgressCallback},
};

/// An opened media file.
///
/// # Example
///
/// ```no_run
/// use framesift::MediaFile;
///
/// let media = MediaFile::open("input.mp4")?;
/// if let Some(video) = &media.metadata().video {
///     println!("{}x{} @ {:.2} fps", video.width, video.height, video.frames_per_second);
/// }
/// # Ok::<(), framesift::SamplerError>(())
/// ```
pub struct MediaFile {
    /// The opened FFmpeg input (demuxer) context.
    pub(crate) input_context: Input,
    /// Metadata read at open time.
    pub(crate) metadata: MediaMetadata,
    /// Index of the best video stream, if one exists.
    pub(crate) video_stream_index: Option<usize>,
    /// Index of the best audio stream, if one exists.
    pub(crate) audio_stream_index: Option<usize>,
    /// Path the file was opened from.
    pub(crate) file_path: PathBuf,
    /// Receives audio decoding progress.
    pub(crate) progress: Arc<dyn ProgressCallback>,
}

impl Debug for MediaFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("MediaFile")
            .field("file_path", &self.file_path)
            .field("metadata", &self.metadata)
            .field("video_stream_index", &self.video_stream_index)
            .field("audio_stream_index", &self.audio_stream_index)
            .finish_non_exhaustive()
    }
}

impl MediaFile {
    /// Open a media file.
    ///
    /// Initialises FFmpeg (idempotent), opens the container and reads the
    /// metadata of its best video and audio streams.
    ///
    /// # Errors
    ///
    /// Returns [`SamplerError::FileOpen`] if the file cannot be opened or
    /// its stream parameters cannot be read.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SamplerError> {
        let path = path.as_ref();
        let file_path = path.to_path_buf();

        log::debug!("Opening media file: {}", file_path.display());

        ffmpeg_next::init().map_err(|error| SamplerError::FileOpen {
            path: file_path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| SamplerError::FileOpen {
                path: file_path.clone(),
                reason: error.to_string(),
            })?;

        let video_stream_index = input_context
            .streams()
            .best(Type::Video)
            .map(|stream| stream.index());
        let audio_stream_index = input_context
            .streams()
            .best(Type::Audio)
            .map(|stream| stream.index());

        let duration_microseconds = input_context.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };
        let format = input_context.format().name().to_string();

        let video = match video_stream_index {
            Some(index) => Some(read_video_metadata(&input_context, index, duration, &file_path)?),
            None => None,
        };
        let audio = match audio_stream_index {
            Some(index) => Some(read_audio_metadata(&input_context, index, &file_path)?),
            None => None,
        };

        let metadata = MediaMetadata {
            video,
            audio,
            duration,
            format,
        };

        log::info!(
            "Opened {} ({}, {:.3}s, video={}, audio={})",
            file_path.display(),
            metadata.format,
            metadata.duration_seconds(),
            metadata.video.is_some(),
            metadata.audio.is_some(),
        );

        Ok(Self {
            input_context,
            metadata,
            video_stream_index,
            audio_stream_index,
            file_path,
            progress: Arc::new(NoOpProgress),
        })
    }

    /// Report audio decoding progress to `callback`.
    ///
    /// Frame sampling progress is configured on
    /// [`SamplerOptions`](crate::SamplerOptions) instead.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Metadata read when the file was opened.
    pub fn metadata(&self) -> &MediaMetadata {
        &self.metadata
    }

    /// Path the file was opened from.
    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

fn read_video_metadata(
    input_context: &Input,
    index: usize,
    duration: Duration,
    file_path: &Path,
) -> Result<VideoMetadata, SamplerError> {
    let open_error = |reason: String| SamplerError::FileOpen {
        path: file_path.to_path_buf(),
        reason,
    };

    let stream = input_context
        .stream(index)
        .ok_or_else(|| open_error(format!("Video stream {index} disappeared")))?;
    let decoder_context = CodecContext::from_parameters(stream.parameters()).map_err(|error| {
        open_error(format!(
            "Failed to read video codec parameters for stream {index}: {error}"
        ))
    })?;
    let decoder = decoder_context.decoder().video().map_err(|error| {
        open_error(format!(
            "Failed to create video decoder for stream {index}: {error}"
        ))
    })?;

    // Average frame rate first, the stream's nominal rate as a fallback.
    let frame_rate = stream.avg_frame_rate();
    let frames_per_second = if frame_rate.denominator() != 0 && frame_rate.numerator() > 0 {
        frame_rate.numerator() as f64 / frame_rate.denominator() as f64
    } else {
        let rate = stream.rate();
        if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        }
    };

    let frame_count = if frames_per_second > 0.0 {
        (duration.as_secs_f64() * frames_per_second) as u64
    } else {
        0
    };

    let codec = decoder
        .codec()
        .map(|codec| codec.name().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    Ok(VideoMetadata {
        width: decoder.width(),
        height: decoder.height(),
        frames_per_second,
        frame_count,
        codec,
    })
}

fn read_audio_metadata(
    input_context: &Input,
    index: usize,
    file_path: &Path,
) -> Result<AudioMetadata, SamplerError> {
    let open_error = |reason: String| SamplerError::FileOpen {
        path: file_path.to_path_buf(),
        reason,
    };

    let stream = input_context
        .stream(index)
        .ok_or_else(|| open_error(format!("Audio stream {index} disappeared")))?;
    let decoder_context = CodecContext::from_parameters(stream.parameters()).map_err(|error| {
        open_error(format!(
            "Failed to read audio codec parameters for stream {index}: {error}"
        ))
    })?;
    let decoder = decoder_context.decoder().audio().map_err(|error| {
        open_error(format!(
            "Failed to create audio decoder for stream {index}: {error}"
        ))
    })?;

    let codec = decoder
        .codec()
        .map(|codec| codec.name().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    Ok(AudioMetadata {
        sample_rate: decoder.rate(),
        channels: decoder.channels(),
        codec,
        bit_rate: decoder.bit_rate() as u64,
    })
}

//! What a [`MediaFile`](crate::MediaFile) knows about itself after opening.
//!
//! Only the best video and audio streams are described; those are the
//! streams the sampler and the audio extractor read from.

use std::time::Duration;

/// Container and stream properties, read once at open time.
///
/// # Example
///
/// ```no_run
/// use framesift::MediaFile;
///
/// let media = MediaFile::open("input.mp4")?;
/// let metadata = media.metadata();
/// println!("{} container, {:.1}s", metadata.format, metadata.duration_seconds());
/// # Ok::<(), framesift::SamplerError>(())
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct MediaMetadata {
    /// The best video stream, if the file has one.
    pub video: Option<VideoMetadata>,
    /// The best audio stream, if the file has one.
    pub audio: Option<AudioMetadata>,
    /// Container duration. Zero when the container does not report one.
    pub duration: Duration,
    /// Demuxer short name, e.g. `"mov,mp4,m4a,3gp,3g2,mj2"` or `"matroska,webm"`.
    pub format: String,
}

impl MediaMetadata {
    /// Duration in seconds, the unit the sampler works in.
    pub fn duration_seconds(&self) -> f64 {
        self.duration.as_secs_f64()
    }

    /// Whether there is an audio track to transcribe.
    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }
}

/// The sampled video stream.
#[derive(Debug, Clone)]
#[must_use]
pub struct VideoMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Average frame rate, falling back to the nominal rate. Zero if
    /// neither is known.
    pub frames_per_second: f64,
    /// `duration * frames_per_second`, rounded down. An estimate for
    /// variable-frame-rate streams.
    pub frame_count: u64,
    /// Decoder short name, e.g. `"h264"`.
    pub codec: String,
}

/// The transcribed audio stream.
#[derive(Debug, Clone)]
#[must_use]
pub struct AudioMetadata {
    /// Hertz.
    pub sample_rate: u32,
    /// Channel count, e.g. 2 for stereo.
    pub channels: u16,
    /// Decoder short name, e.g. `"aac"`.
    pub codec: String,
    /// Bits per second, zero when unknown.
    pub bit_rate: u64,
}

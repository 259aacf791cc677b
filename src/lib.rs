//! # framesift
//!
//! Pick a small, representative set of frames from a video.
//!
//! Sending every frame of a video to a vision model is slow and mostly
//! redundant. `framesift` chooses a bounded number of frames that still
//! cover what happens: one near the start, one near the end, one at each
//! detected scene cut in between, and evenly spaced fill-ins when the video
//! has fewer cuts than the budget allows. The same video and options always
//! produce the same timestamps.
//!
//! Decoding goes through FFmpeg via
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next), behind the
//! [`FrameSource`] trait so the selection logic can run on any frame
//! provider.
//!
//! ## Quick Start
//!
//! ### Sample Frames
//!
//! ```no_run
//! use framesift::{FrameSampler, ImageEncoding, MediaFile, SamplerOptions};
//!
//! let mut media = MediaFile::open("input.mp4")?;
//! let sampler = FrameSampler::new(SamplerOptions::new().with_max_frames(7));
//! for sampled in sampler.sample(&mut media)? {
//!     let jpeg = sampled.encode(ImageEncoding::JPEG)?;
//!     std::fs::write(format!("frame_{}.jpg", sampled.index), jpeg)?;
//! }
//! # Ok::<(), framesift::SamplerError>(())
//! ```
//!
//! ### Detect Scene Cuts
//!
//! ```no_run
//! use framesift::{FrameSource, MediaFile, SceneChangeDetector, SceneDetector};
//!
//! let mut media = MediaFile::open("input.mp4")?;
//! let duration = media.duration();
//! let cuts = SceneChangeDetector::default().detect(&mut media, 0.0, duration, 10)?;
//! for cut in cuts {
//!     println!("{:.2}s (score {:.1})", cut.time, cut.diff_score);
//! }
//! # Ok::<(), framesift::SamplerError>(())
//! ```
//!
//! ### Transcribe Audio
//!
//! ```no_run
//! use framesift::{BoxError, MediaFile, transcribe_audio};
//!
//! let mut media = MediaFile::open("input.mp4")?;
//! let transcriber = |samples: &[f32], rate: u32| -> Result<String, BoxError> {
//!     // Hand `samples` to a speech-to-text model here.
//!     Ok(format!("{} seconds of audio", samples.len() as u32 / rate.max(1)))
//! };
//! let transcript = transcribe_audio(&mut media, &transcriber)?;
//! println!("{transcript}");
//! # Ok::<(), framesift::SamplerError>(())
//! ```
//!
//! ## Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ffmpeg` (default) | [`MediaFile`], disk-backed sub-clips and the `framesift` binary |
//!
//! Without `ffmpeg` the crate still provides the selection logic, scene
//! detection over any [`FrameSource`], frame encoding and the audio
//! interfaces.
//!
//! ## Requirements
//!
//! The `ffmpeg` feature needs the FFmpeg development libraries installed on
//! the system.

pub mod audio;
pub mod configuration;
#[cfg(feature = "ffmpeg")]
mod conversion;
pub mod error;
#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;
pub mod frame;
#[cfg(feature = "ffmpeg")]
pub mod media;
pub mod metadata;
pub mod progress;
pub mod sampler;
pub mod scene;
pub mod source;
#[cfg(feature = "ffmpeg")]
mod subclip;
#[cfg(feature = "ffmpeg")]
mod video;

pub use audio::{
    AudioBuffer, AudioSource, BoxError, Transcriber, Transcript, downmix_to_mono,
    transcribe_audio,
};
pub use configuration::{
    DEFAULT_ANALYSIS_WIDTH, DEFAULT_MAX_FRAMES, DEFAULT_MAX_SCAN_DURATION,
    DEFAULT_MIN_SCENE_SPACING, DEFAULT_SCENE_THRESHOLD, MIN_FRAME_SPACING, SamplerOptions,
};
pub use error::SamplerError;
#[cfg(feature = "ffmpeg")]
pub use ffmpeg::{FfmpegLogLevel, get_ffmpeg_log_level, set_ffmpeg_log_level};
pub use frame::{Frame, ImageEncoding, TimestampedFrame};
#[cfg(feature = "ffmpeg")]
pub use media::MediaFile;
pub use metadata::{AudioMetadata, MediaMetadata, VideoMetadata};
pub use progress::{OperationType, ProgressCallback, ProgressInfo};
pub use sampler::{FrameSampler, end_anchor, start_anchor};
pub use scene::{
    SceneCandidate, SceneChangeDetector, SceneDetectionOptions, SceneDetector,
    mean_absolute_difference, min_scene_spacing,
};
pub use source::{FrameSource, ScanWindow, Subclip};

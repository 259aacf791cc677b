//! Error types for the `framesift` crate.
//!
//! This module defines [`SamplerError`], the unified error type returned by
//! all fallible operations in the crate. Most failures that happen *during*
//! sampling (a frame that will not decode, a scan that dies halfway) are
//! recovered internally and only logged; the variants here are what a caller
//! can actually observe.

use std::{io::Error as IoError, path::PathBuf};

#[cfg(feature = "ffmpeg")]
use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `framesift` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SamplerError {
    /// The media file could not be opened.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::MediaFile::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// The file does not contain an audio stream.
    #[error("No audio stream found in file")]
    NoAudioStream,

    /// A video frame could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// Audio data could not be decoded.
    #[error("Failed to decode audio: {0}")]
    AudioDecodeError(String),

    /// The requested timestamp (in seconds) lies outside the media timeline.
    #[error("Invalid timestamp: {0:.3}s")]
    InvalidTimestamp(f64),

    /// Sampler or detector options were rejected before any decoding.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The source reported a non-finite duration.
    #[error("Invalid media duration: {0}")]
    InvalidDuration(f64),

    /// Scene detection could not run at all (e.g. the sub-clip could not
    /// be written). The sampler treats this as "no scene changes".
    #[error("Scene detection unavailable: {0}")]
    SceneDetectionUnavailable(String),

    /// The external transcriber failed.
    #[error("Transcription failed: {0}")]
    TranscriptionError(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate during frame conversion or encoding.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),
}

#[cfg(feature = "ffmpeg")]
impl From<FfmpegError> for SamplerError {
    fn from(error: FfmpegError) -> Self {
        SamplerError::FfmpegError(error.to_string())
    }
}

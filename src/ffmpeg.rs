//! FFmpeg's own log verbosity.
//!
//! Decoders print warnings straight to stderr (broken references after a
//! seek, skipped B-frames, and so on). Sampling seeks a lot, so this output
//! is usually noise. These helpers set FFmpeg's level without pulling
//! `ffmpeg-next` into the caller's dependencies. Diagnostics emitted by
//! `framesift` itself go through the `log` facade and are unaffected.
//!
//! # Example
//!
//! ```no_run
//! use framesift::{FfmpegLogLevel, FrameSampler, MediaFile};
//!
//! framesift::set_ffmpeg_log_level(FfmpegLogLevel::Error);
//!
//! let mut media = MediaFile::open("input.mp4")?;
//! let frames = FrameSampler::default().sample(&mut media)?;
//! # Ok::<(), framesift::SamplerError>(())
//! ```

use std::str::FromStr;

use ffmpeg_next::util::log::Level;

/// Verbosity of FFmpeg's stderr logging, from silent to most verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    /// Nothing at all.
    Quiet,
    /// Unrecoverable errors that abort the process.
    Panic,
    /// Unrecoverable errors.
    Fatal,
    /// Recoverable errors, such as a corrupt packet.
    Error,
    /// Warnings. FFmpeg's default.
    Warning,
    /// Informational messages.
    Info,
    Verbose,
    Debug,
    /// Everything.
    Trace,
}

/// Each level with its FFmpeg counterpart and command-line name.
const LEVELS: [(FfmpegLogLevel, Level, &str); 9] = [
    (FfmpegLogLevel::Quiet, Level::Quiet, "quiet"),
    (FfmpegLogLevel::Panic, Level::Panic, "panic"),
    (FfmpegLogLevel::Fatal, Level::Fatal, "fatal"),
    (FfmpegLogLevel::Error, Level::Error, "error"),
    (FfmpegLogLevel::Warning, Level::Warning, "warning"),
    (FfmpegLogLevel::Info, Level::Info, "info"),
    (FfmpegLogLevel::Verbose, Level::Verbose, "verbose"),
    (FfmpegLogLevel::Debug, Level::Debug, "debug"),
    (FfmpegLogLevel::Trace, Level::Trace, "trace"),
];

impl FfmpegLogLevel {
    /// Lower-case name accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        LEVELS
            .iter()
            .find(|(level, _, _)| *level == self)
            .map_or("warning", |(_, _, name)| name)
    }
}

impl From<FfmpegLogLevel> for Level {
    fn from(level: FfmpegLogLevel) -> Self {
        LEVELS
            .iter()
            .find(|(ours, _, _)| *ours == level)
            .map_or(Level::Warning, |(_, theirs, _)| *theirs)
    }
}

impl FromStr for FfmpegLogLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_ascii_lowercase();
        let wanted = if wanted == "warn" { "warning" } else { wanted.as_str() };
        LEVELS
            .iter()
            .find(|(_, _, name)| *name == wanted)
            .map(|(level, _, _)| *level)
            .ok_or_else(|| format!("unknown FFmpeg log level '{value}'"))
    }
}

/// Set FFmpeg's log level for the whole process.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    log::debug!("Setting FFmpeg log level to {}", level.name());
    ffmpeg_next::util::log::set_level(level.into());
}

/// FFmpeg's current log level, or `None` if it is set to a value between
/// the named levels.
pub fn get_ffmpeg_log_level() -> Option<FfmpegLogLevel> {
    let current = ffmpeg_next::util::log::get_level().ok()?;
    LEVELS
        .iter()
        .find(|(_, theirs, _)| *theirs == current)
        .map(|(level, _, _)| *level)
}

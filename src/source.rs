//! The decoding boundary.
//!
//! The sampler never talks to a codec directly. Everything it needs from a
//! video goes through [`FrameSource`]: the timeline length, random access to
//! a frame at a time, and a cheap sequential scan for scene detection.
//! [`MediaFile`](crate::MediaFile) is the FFmpeg-backed implementation; tests
//! and embedders can provide their own.

use std::ops::ControlFlow;

use crate::error::SamplerError;
use crate::frame::Frame;

/// A time window to scan sequentially.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanWindow {
    /// First timestamp of interest, in seconds.
    pub start: f64,
    /// Last timestamp of interest, in seconds (inclusive).
    pub end: f64,
    /// Width scanned frames may be scaled to. Sources are free to ignore it.
    pub analysis_width: Option<u32>,
}

impl ScanWindow {
    /// Length of the window in seconds.
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Shift the window by `offset` seconds.
    pub fn shifted(&self, offset: f64) -> Self {
        Self {
            start: self.start + offset,
            end: self.end + offset,
            analysis_width: self.analysis_width,
        }
    }
}

/// A bounded copy of part of a video, with its own timeline.
///
/// Time zero of `source` corresponds to `origin` seconds on the parent
/// timeline. Any disk-backed storage belongs to `source` and is released
/// when the sub-clip is dropped.
pub struct Subclip {
    /// Parent-timeline position of the sub-clip's time zero.
    pub origin: f64,
    /// The sub-clip itself.
    pub source: Box<dyn FrameSource>,
}

impl std::fmt::Debug for Subclip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subclip")
            .field("origin", &self.origin)
            .field("duration", &self.source.duration())
            .finish_non_exhaustive()
    }
}

/// Something the sampler can pull frames from.
///
/// Implementations are used by one sampling call at a time and need not be
/// thread-safe.
pub trait FrameSource {
    /// Total duration in seconds.
    fn duration(&self) -> f64;

    /// Nominal frame rate. May be `0.0` when unknown.
    fn frames_per_second(&self) -> f64;

    /// Decode the frame displayed at `time` seconds.
    fn frame_at(&mut self, time: f64) -> Result<Frame, SamplerError>;

    /// Decode frames in `window` in presentation order, passing each one
    /// with its timestamp to `visitor` until the window ends or the visitor
    /// breaks.
    ///
    /// An error returned after some frames were visited leaves those visits
    /// valid.
    fn scan(
        &mut self,
        window: ScanWindow,
        visitor: &mut dyn FnMut(f64, Frame) -> ControlFlow<()>,
    ) -> Result<(), SamplerError>;

    /// Produce a bounded sub-clip covering at least `[start, end]`.
    ///
    /// Returns `Ok(None)` when the source has no cheaper representation
    /// than itself; callers then scan the source directly.
    fn subclip(&mut self, _start: f64, _end: f64) -> Result<Option<Subclip>, SamplerError> {
        Ok(None)
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn duration(&self) -> f64 {
        (**self).duration()
    }

    fn frames_per_second(&self) -> f64 {
        (**self).frames_per_second()
    }

    fn frame_at(&mut self, time: f64) -> Result<Frame, SamplerError> {
        (**self).frame_at(time)
    }

    fn scan(
        &mut self,
        window: ScanWindow,
        visitor: &mut dyn FnMut(f64, Frame) -> ControlFlow<()>,
    ) -> Result<(), SamplerError> {
        (**self).scan(window, visitor)
    }

    fn subclip(&mut self, start: f64, end: f64) -> Result<Option<Subclip>, SamplerError> {
        (**self).subclip(start, end)
    }
}

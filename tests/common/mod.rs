//! Synthetic frame sources shared by the integration tests.

#![allow(dead_code)]

use std::ops::ControlFlow;

use framesift::{Frame, FrameSource, SamplerError, ScanWindow, Subclip};
use image::{DynamicImage, GrayImage, Luma};

/// How [`SyntheticVideo::subclip`] behaves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SubclipBehaviour {
    /// No sub-clip support; scans run on the video itself.
    Unsupported,
    /// Return a copy starting `lead` seconds before the requested start,
    /// the way a keyframe-aligned stream copy does.
    KeyframeAligned { lead: f64 },
    /// Fail to create the sub-clip.
    Fails,
}

/// A flat-colour video whose intensity flips between 0 and 200 at every
/// cut time.
#[derive(Debug, Clone)]
pub struct SyntheticVideo {
    pub duration: f64,
    pub fps: f64,
    pub cuts: Vec<f64>,
    pub width: u32,
    pub height: u32,
    /// `frame_at` fails for every timestamp.
    pub fail_all_decodes: bool,
    /// `frame_at` fails for timestamps within 1 ms of these.
    pub failing_times: Vec<f64>,
    /// `scan` errors on the first frame past this time.
    pub scan_fails_after: Option<f64>,
    pub subclip_behaviour: SubclipBehaviour,
    /// Timestamps passed to `frame_at`, in call order.
    pub decoded: Vec<f64>,
    /// Windows passed to `scan`, in call order.
    pub scans: Vec<ScanWindow>,
    /// Requests passed to `subclip`.
    pub subclip_requests: Vec<(f64, f64)>,
    /// Offset of this video on its parent's timeline (sub-clips only).
    offset: f64,
}

impl SyntheticVideo {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            fps: 10.0,
            cuts: Vec::new(),
            width: 16,
            height: 9,
            fail_all_decodes: false,
            failing_times: Vec::new(),
            scan_fails_after: None,
            subclip_behaviour: SubclipBehaviour::Unsupported,
            decoded: Vec::new(),
            scans: Vec::new(),
            subclip_requests: Vec::new(),
            offset: 0.0,
        }
    }

    pub fn with_cuts(mut self, cuts: &[f64]) -> Self {
        self.cuts = cuts.to_vec();
        self
    }

    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = fps;
        self
    }

    /// Intensity at `time` on this video's own timeline.
    pub fn intensity(&self, time: f64) -> u8 {
        let absolute = time + self.offset;
        let flips = self.cuts.iter().filter(|&&cut| cut <= absolute).count();
        if flips % 2 == 0 { 0 } else { 200 }
    }

    fn render(&self, time: f64) -> Frame {
        let value = self.intensity(time);
        DynamicImage::ImageLuma8(GrayImage::from_pixel(self.width, self.height, Luma([value])))
    }
}

impl FrameSource for SyntheticVideo {
    fn duration(&self) -> f64 {
        self.duration
    }

    fn frames_per_second(&self) -> f64 {
        self.fps
    }

    fn frame_at(&mut self, time: f64) -> Result<Frame, SamplerError> {
        self.decoded.push(time);
        if self.fail_all_decodes
            || self
                .failing_times
                .iter()
                .any(|&failing| (failing - time).abs() < 1e-3)
        {
            return Err(SamplerError::VideoDecodeError(format!(
                "synthetic failure at {time:.3}s"
            )));
        }
        if !(0.0..=self.duration).contains(&time) {
            return Err(SamplerError::InvalidTimestamp(time));
        }
        Ok(self.render(time))
    }

    fn scan(
        &mut self,
        window: ScanWindow,
        visitor: &mut dyn FnMut(f64, Frame) -> ControlFlow<()>,
    ) -> Result<(), SamplerError> {
        self.scans.push(window);
        let first = (window.start.max(0.0) * self.fps - 1e-9).ceil() as u64;
        let mut index = first;
        loop {
            let time = index as f64 / self.fps;
            if time > window.end || time > self.duration {
                return Ok(());
            }
            if let Some(limit) = self.scan_fails_after {
                if time + self.offset > limit {
                    return Err(SamplerError::VideoDecodeError(format!(
                        "synthetic scan failure at {time:.3}s"
                    )));
                }
            }
            if visitor(time, self.render(time)).is_break() {
                return Ok(());
            }
            index += 1;
        }
    }

    fn subclip(&mut self, start: f64, end: f64) -> Result<Option<Subclip>, SamplerError> {
        self.subclip_requests.push((start, end));
        match self.subclip_behaviour {
            SubclipBehaviour::Unsupported => Ok(None),
            SubclipBehaviour::Fails => Err(SamplerError::IoError(std::io::Error::other(
                "synthetic sub-clip failure",
            ))),
            SubclipBehaviour::KeyframeAligned { lead } => {
                let origin = (start - lead).max(0.0);
                let mut clip = SyntheticVideo::new(end - origin)
                    .with_cuts(&self.cuts)
                    .with_fps(self.fps);
                clip.offset = self.offset + origin;
                clip.scan_fails_after = self.scan_fails_after;
                Ok(Some(Subclip {
                    origin,
                    source: Box::new(clip),
                }))
            }
        }
    }
}

/// Times of a sampled sequence.
pub fn times(frames: &[framesift::TimestampedFrame]) -> Vec<f64> {
    frames.iter().map(|frame| frame.time).collect()
}

pub fn assert_times_near(actual: &[f64], expected: &[f64]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "expected {expected:?}, got {actual:?}"
    );
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-6, "expected {expected:?}, got {actual:?}");
    }
}

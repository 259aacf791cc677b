//! Scene change detection.
//!
//! [`SceneChangeDetector`] walks a window of the video frame by frame,
//! reduces each frame to 8-bit luma and scores adjacent pairs by their mean
//! absolute per-pixel difference. A score above the threshold marks a cut,
//! provided it is far enough from the previous one.
//!
//! Detection is best effort: a scan that fails halfway still returns the
//! cuts it found, and an empty result simply means "no scene changes".
//!
//! # Example
//!
//! ```no_run
//! use framesift::{MediaFile, SceneChangeDetector, SceneDetectionOptions, SceneDetector};
//!
//! let mut media = MediaFile::open("input.mp4")?;
//! let detector = SceneChangeDetector::new(SceneDetectionOptions::new().threshold(25.0));
//! for scene in detector.detect(&mut media, 0.0, 120.0, 10)? {
//!     println!("cut at {:.2}s (score {:.1})", scene.time, scene.diff_score);
//! }
//! # Ok::<(), framesift::SamplerError>(())
//! ```

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use image::GrayImage;

use crate::configuration::{
    DEFAULT_ANALYSIS_WIDTH, DEFAULT_MAX_SCAN_DURATION, DEFAULT_MIN_SCENE_SPACING,
    DEFAULT_SCENE_THRESHOLD,
};
use crate::error::SamplerError;
use crate::frame::Frame;
use crate::progress::{NoOpProgress, OperationType, ProgressCallback, ProgressTracker};
use crate::source::{FrameSource, ScanWindow};

/// Score given to a pair of frames whose dimensions differ.
const MAX_DIFFERENCE: f64 = 255.0;

/// A detected scene change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneCandidate {
    /// Timestamp of the first frame of the new scene, in seconds.
    pub time: f64,
    /// Mean absolute luma difference against the preceding frame (0–255).
    pub diff_score: f64,
}

/// Scene detection settings.
#[derive(Debug, Clone)]
pub struct SceneDetectionOptions {
    /// Minimum mean absolute difference for a cut. Range 0.0–255.0.
    /// Default: 30.0.
    pub threshold: f64,
    /// Lower bound on the spacing between two cuts, in seconds.
    /// Default: 1.0.
    pub min_spacing_floor: f64,
    /// Only the first `max_scan_duration` of a window is scanned.
    /// Default: 60 seconds.
    pub max_scan_duration: Duration,
    /// Width frames are scaled to before differencing. Default: 320.
    pub analysis_width: Option<u32>,
}

impl Default for SceneDetectionOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SCENE_THRESHOLD,
            min_spacing_floor: DEFAULT_MIN_SCENE_SPACING,
            max_scan_duration: DEFAULT_MAX_SCAN_DURATION,
            analysis_width: Some(DEFAULT_ANALYSIS_WIDTH),
        }
    }
}

impl SceneDetectionOptions {
    /// Create a new scene detection configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum score required for a cut.
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the floor for inter-scene spacing.
    pub fn min_spacing_floor(mut self, seconds: f64) -> Self {
        self.min_spacing_floor = seconds;
        self
    }

    /// Limit scanning to the first `duration` of each window.
    pub fn max_scan_duration(mut self, duration: Duration) -> Self {
        self.max_scan_duration = duration;
        self
    }

    /// Set the analysis width (`None` keeps the source width).
    pub fn analysis_width(mut self, width: Option<u32>) -> Self {
        self.analysis_width = width;
        self
    }

    /// Reject settings that cannot produce meaningful results.
    pub fn validate(&self) -> Result<(), SamplerError> {
        if !self.threshold.is_finite() || !(0.0..=MAX_DIFFERENCE).contains(&self.threshold) {
            return Err(SamplerError::InvalidConfiguration(format!(
                "scene threshold must be within 0..=255, got {}",
                self.threshold
            )));
        }
        if !self.min_spacing_floor.is_finite() || self.min_spacing_floor <= 0.0 {
            return Err(SamplerError::InvalidConfiguration(format!(
                "minimum scene spacing must be positive, got {}",
                self.min_spacing_floor
            )));
        }
        if self.max_scan_duration.is_zero() {
            return Err(SamplerError::InvalidConfiguration(
                "maximum scan duration must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Anything that can propose scene cuts inside a window.
///
/// [`FrameSampler`](crate::FrameSampler) is generic over this so the
/// detection pass can be swapped out.
pub trait SceneDetector {
    /// Return up to `max_scenes` cuts in `[window_start, window_end]`,
    /// ordered by time and expressed on the source's timeline.
    fn detect(
        &self,
        source: &mut dyn FrameSource,
        window_start: f64,
        window_end: f64,
        max_scenes: usize,
    ) -> Result<Vec<SceneCandidate>, SamplerError>;
}

/// Luma-difference scene detector.
#[derive(Clone)]
pub struct SceneChangeDetector {
    options: SceneDetectionOptions,
    progress: Arc<dyn ProgressCallback>,
}

impl std::fmt::Debug for SceneChangeDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneChangeDetector")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Default for SceneChangeDetector {
    fn default() -> Self {
        Self::new(SceneDetectionOptions::default())
    }
}

impl SceneChangeDetector {
    /// Create a detector with the given settings.
    pub fn new(options: SceneDetectionOptions) -> Self {
        Self {
            options,
            progress: Arc::new(NoOpProgress),
        }
    }

    /// Report scanned frames to `callback`.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// The detector's settings.
    pub fn options(&self) -> &SceneDetectionOptions {
        &self.options
    }
}

impl SceneDetector for SceneChangeDetector {
    /// # Errors
    ///
    /// Returns [`SamplerError::SceneDetectionUnavailable`] if the source
    /// failed to produce a sub-clip for a truncated window. Failures during
    /// the scan itself are not errors.
    fn detect(
        &self,
        source: &mut dyn FrameSource,
        window_start: f64,
        window_end: f64,
        max_scenes: usize,
    ) -> Result<Vec<SceneCandidate>, SamplerError> {
        let has_window = window_end > window_start;
        if max_scenes == 0 || !has_window {
            return Ok(Vec::new());
        }

        let scan_limit = self.options.max_scan_duration.as_secs_f64();
        let scan_end = window_end.min(window_start + scan_limit);
        let window = ScanWindow {
            start: window_start,
            end: scan_end,
            analysis_width: self.options.analysis_width,
        };
        let spacing =
            min_scene_spacing(window.duration(), max_scenes, self.options.min_spacing_floor);

        log::debug!(
            "Detecting scenes in {:.3}s..{:.3}s (requested {:.3}s, threshold={}, spacing={:.3}s, max={})",
            window.start,
            window.end,
            window_end,
            self.options.threshold,
            spacing,
            max_scenes,
        );

        // Long windows are copied out first so the scan does not have to
        // walk the parent container.
        let subclip = if scan_end < window_end {
            source
                .subclip(window.start, window.end)
                .map_err(|error| SamplerError::SceneDetectionUnavailable(error.to_string()))?
        } else {
            None
        };

        let frames_per_second = source.frames_per_second();
        let expected_frames = (frames_per_second > 0.0)
            .then(|| (window.duration() * frames_per_second).ceil() as u64);
        let mut tracker = ProgressTracker::new(
            self.progress.clone(),
            OperationType::SceneDetection,
            expected_frames,
        );

        let mut scanner = CutScanner::new(window, self.options.threshold, spacing, max_scenes);

        let outcome = match subclip {
            Some(mut clip) => {
                let origin = clip.origin;
                log::debug!("Scanning sub-clip with origin {origin:.3}s");
                clip.source.scan(window.shifted(-origin), &mut |local_time, frame| {
                    tracker.advance(Some(local_time + origin));
                    scanner.visit(local_time + origin, frame)
                })
            }
            None => source.scan(window, &mut |time, frame| {
                tracker.advance(Some(time));
                scanner.visit(time, frame)
            }),
        };

        if let Err(error) = outcome {
            log::warn!(
                "Scene scan stopped early after {} frame(s), keeping {} candidate(s): {error}",
                scanner.frames_seen,
                scanner.candidates.len(),
            );
        }

        log::debug!(
            "Scene scan found {} candidate(s) in {} frame(s)",
            scanner.candidates.len(),
            scanner.frames_seen,
        );

        Ok(scanner.candidates)
    }
}

/// Spacing between cuts for a window: `window / (max_scenes * 2)`, never
/// below `floor`.
pub fn min_scene_spacing(window_duration: f64, max_scenes: usize, floor: f64) -> f64 {
    if max_scenes == 0 {
        return floor;
    }
    (window_duration / (max_scenes as f64 * 2.0)).max(floor)
}

/// Mean absolute per-pixel difference between two luma images.
///
/// Returns `None` when the images differ in size or are empty.
pub fn mean_absolute_difference(previous: &GrayImage, current: &GrayImage) -> Option<f64> {
    if previous.dimensions() != current.dimensions() {
        return None;
    }
    let previous = previous.as_raw();
    let current = current.as_raw();
    if previous.is_empty() {
        return None;
    }
    let total: u64 = previous
        .iter()
        .zip(current)
        .map(|(&a, &b)| u64::from(a.abs_diff(b)))
        .sum();
    Some(total as f64 / previous.len() as f64)
}

/// Per-scan state: the previous luma frame and the cuts so far.
struct CutScanner {
    window: ScanWindow,
    threshold: f64,
    spacing: f64,
    max_scenes: usize,
    previous: Option<GrayImage>,
    candidates: Vec<SceneCandidate>,
    frames_seen: u64,
}

impl CutScanner {
    fn new(window: ScanWindow, threshold: f64, spacing: f64, max_scenes: usize) -> Self {
        Self {
            window,
            threshold,
            spacing,
            max_scenes,
            previous: None,
            candidates: Vec::new(),
            frames_seen: 0,
        }
    }

    fn visit(&mut self, time: f64, frame: Frame) -> ControlFlow<()> {
        if time > self.window.end {
            return ControlFlow::Break(());
        }
        // Sources may hand back a few frames from before the seek point.
        if time < self.window.start {
            return ControlFlow::Continue(());
        }
        self.frames_seen += 1;

        let current = frame.into_luma8();
        if let Some(previous) = &self.previous {
            let score = mean_absolute_difference(previous, &current).unwrap_or(MAX_DIFFERENCE);
            let since = self
                .candidates
                .last()
                .map_or(self.window.start, |candidate| candidate.time);

            if score > self.threshold && time - since >= self.spacing {
                log::trace!("Cut at {time:.3}s (score {score:.2})");
                self.candidates.push(SceneCandidate {
                    time,
                    diff_score: score,
                });
                if self.candidates.len() >= self.max_scenes {
                    return ControlFlow::Break(());
                }
            }
        }
        self.previous = Some(current);
        ControlFlow::Continue(())
    }
}

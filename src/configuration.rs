//! Sampling configuration.
//!
//! [`SamplerOptions`] is a builder that carries the frame budget, the
//! scene-detection tuning and an optional progress callback into
//! [`FrameSampler`](crate::FrameSampler) without widening every signature.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use framesift::SamplerOptions;
//!
//! let options = SamplerOptions::new()
//!     .with_max_frames(9)
//!     .with_scene_threshold(24.0)
//!     .with_max_scan_duration(Duration::from_secs(30));
//! assert!(options.validate().is_ok());
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use std::time::Duration;

use crate::error::SamplerError;
use crate::progress::{NoOpProgress, ProgressCallback};
use crate::scene::SceneDetectionOptions;

/// Default number of frames returned by a sample.
pub const DEFAULT_MAX_FRAMES: usize = 7;

/// Default mean-absolute-difference threshold, in 8-bit intensity units.
pub const DEFAULT_SCENE_THRESHOLD: f64 = 30.0;

/// Default lower bound on the spacing between two scene candidates.
pub const DEFAULT_MIN_SCENE_SPACING: f64 = 1.0;

/// Smallest gap, in seconds, allowed between two returned frames.
pub const MIN_FRAME_SPACING: f64 = 1.0;

/// Default cap on how much of a window the scene scan decodes.
pub const DEFAULT_MAX_SCAN_DURATION: Duration = Duration::from_secs(60);

/// Default width frames are scaled to before differencing.
pub const DEFAULT_ANALYSIS_WIDTH: u32 = 320;

/// Configuration for [`FrameSampler`](crate::FrameSampler).
///
/// All fields have defaults; a default-constructed value samples seven
/// frames with a 30.0 scene threshold.
#[derive(Clone)]
#[must_use]
pub struct SamplerOptions {
    pub(crate) max_frames: usize,
    pub(crate) scene_threshold: f64,
    pub(crate) min_scene_spacing_floor: f64,
    pub(crate) max_scan_duration: Duration,
    pub(crate) analysis_width: Option<u32>,
    pub(crate) progress: Arc<dyn ProgressCallback>,
}

impl Debug for SamplerOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("SamplerOptions")
            .field("max_frames", &self.max_frames)
            .field("scene_threshold", &self.scene_threshold)
            .field("min_scene_spacing_floor", &self.min_scene_spacing_floor)
            .field("max_scan_duration", &self.max_scan_duration)
            .field("analysis_width", &self.analysis_width)
            .finish_non_exhaustive()
    }
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl SamplerOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            max_frames: DEFAULT_MAX_FRAMES,
            scene_threshold: DEFAULT_SCENE_THRESHOLD,
            min_scene_spacing_floor: DEFAULT_MIN_SCENE_SPACING,
            max_scan_duration: DEFAULT_MAX_SCAN_DURATION,
            analysis_width: Some(DEFAULT_ANALYSIS_WIDTH),
            progress: Arc::new(NoOpProgress),
        }
    }

    /// Set the maximum number of frames a sample may return. Must be ≥ 1.
    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Set the scene-change threshold (mean absolute luma difference,
    /// 0.0–255.0).
    pub fn with_scene_threshold(mut self, threshold: f64) -> Self {
        self.scene_threshold = threshold;
        self
    }

    /// Set the floor for the spacing between scene candidates, in seconds.
    pub fn with_min_scene_spacing_floor(mut self, seconds: f64) -> Self {
        self.min_scene_spacing_floor = seconds;
        self
    }

    /// Limit how much of the detection window is scanned.
    pub fn with_max_scan_duration(mut self, duration: Duration) -> Self {
        self.max_scan_duration = duration;
        self
    }

    /// Set the width scanned frames are scaled to. `None` keeps the source
    /// width.
    pub fn with_analysis_width(mut self, width: Option<u32>) -> Self {
        self.analysis_width = width;
        self
    }

    /// Attach a progress callback.
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// The configured frame budget.
    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    /// Derive the scene-detection settings from these options.
    pub fn scene_options(&self) -> SceneDetectionOptions {
        SceneDetectionOptions::new()
            .threshold(self.scene_threshold)
            .min_spacing_floor(self.min_scene_spacing_floor)
            .max_scan_duration(self.max_scan_duration)
            .analysis_width(self.analysis_width)
    }

    /// Check the options before any decode work starts.
    ///
    /// # Errors
    ///
    /// Returns [`SamplerError::InvalidConfiguration`] when `max_frames` is
    /// zero or the scene settings are out of range.
    pub fn validate(&self) -> Result<(), SamplerError> {
        if self.max_frames < 1 {
            return Err(SamplerError::InvalidConfiguration(
                "max_frames must be at least 1".to_string(),
            ));
        }
        self.scene_options().validate()
    }
}

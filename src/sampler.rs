//! Strategic frame sampling.
//!
//! [`FrameSampler`] picks a handful of frames that summarise a video:
//!
//! 1. an anchor just after the start and another just before the end,
//! 2. interior frames at detected scene cuts,
//! 3. evenly spaced fill-ins when detection comes up short,
//!
//! with every pair of chosen timestamps at least [`MIN_FRAME_SPACING`]
//! apart. The plan is deterministic: the same video and options always
//! yield the same timestamps.
//!
//! # Example
//!
//! ```no_run
//! use framesift::{FrameSampler, ImageEncoding, MediaFile, SamplerOptions};
//!
//! let mut media = MediaFile::open("input.mp4")?;
//! let sampler = FrameSampler::new(SamplerOptions::new().with_max_frames(5));
//! for sampled in sampler.sample(&mut media)? {
//!     let bytes = sampled.encode(ImageEncoding::JPEG)?;
//!     println!("#{} at {:.2}s: {} bytes", sampled.index, sampled.time, bytes.len());
//! }
//! # Ok::<(), framesift::SamplerError>(())
//! ```

use crate::configuration::{MIN_FRAME_SPACING, SamplerOptions};
use crate::error::SamplerError;
use crate::frame::TimestampedFrame;
use crate::progress::{OperationType, ProgressTracker};
use crate::scene::{SceneCandidate, SceneChangeDetector, SceneDetector};
use crate::source::FrameSource;

/// Scene detection only runs on videos longer than this many seconds.
const MIN_DETECTION_DURATION: f64 = 3.0;

/// Picks a bounded, time-ordered set of representative frames.
#[derive(Debug, Clone)]
pub struct FrameSampler<D = SceneChangeDetector> {
    options: SamplerOptions,
    detector: D,
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self::new(SamplerOptions::default())
    }
}

impl FrameSampler {
    /// Create a sampler using the built-in luma-difference detector,
    /// configured from `options`.
    pub fn new(options: SamplerOptions) -> Self {
        let detector = SceneChangeDetector::new(options.scene_options())
            .with_progress(options.progress.clone());
        Self { options, detector }
    }
}

impl<D: SceneDetector> FrameSampler<D> {
    /// Create a sampler with a custom scene detector.
    pub fn with_detector(options: SamplerOptions, detector: D) -> Self {
        Self { options, detector }
    }

    /// The sampler's options.
    pub fn options(&self) -> &SamplerOptions {
        &self.options
    }

    /// The scene detector consulted by [`plan`](FrameSampler::plan).
    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Choose the timestamps a [`sample`](FrameSampler::sample) call would
    /// decode, without decoding them.
    ///
    /// Runs scene detection when the video is long enough. The result is
    /// sorted, holds at most `max_frames` entries and is empty only when the
    /// video has no positive duration.
    ///
    /// # Errors
    ///
    /// - [`SamplerError::InvalidConfiguration`] for invalid options.
    /// - [`SamplerError::InvalidDuration`] if the source reports a
    ///   non-finite duration.
    pub fn plan(&self, source: &mut dyn FrameSource) -> Result<Vec<f64>, SamplerError> {
        self.options.validate()?;

        let duration = source.duration();
        if !duration.is_finite() {
            return Err(SamplerError::InvalidDuration(duration));
        }
        if duration <= 0.0 {
            log::debug!("Empty timeline ({duration}s), nothing to sample");
            return Ok(Vec::new());
        }

        let max_frames = self.options.max_frames;
        let middle_slots = max_frames.saturating_sub(2);
        let first = start_anchor(duration);

        let candidates = if duration > MIN_DETECTION_DURATION && middle_slots > 0 {
            match self.detector.detect(source, first, duration, middle_slots) {
                Ok(candidates) => candidates,
                Err(error) => {
                    log::warn!("Scene detection failed, using evenly spaced frames: {error}");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let times = plan_timestamps(duration, max_frames, &candidates);
        log::debug!(
            "Planned {} timestamp(s) for {:.3}s video from {} scene candidate(s): {:?}",
            times.len(),
            duration,
            candidates.len(),
            times,
        );
        Ok(times)
    }

    /// Sample representative frames from `source`.
    ///
    /// Timestamps that fail to decode are skipped; if all of them fail the
    /// result is empty. Indices are assigned after the final sort.
    ///
    /// # Errors
    ///
    /// Only the validation errors of [`plan`](FrameSampler::plan).
    pub fn sample(
        &self,
        source: &mut dyn FrameSource,
    ) -> Result<Vec<TimestampedFrame>, SamplerError> {
        let times = self.plan(source)?;

        let mut tracker = ProgressTracker::new(
            self.options.progress.clone(),
            OperationType::FrameDecoding,
            Some(times.len() as u64),
        );

        let mut decoded = Vec::with_capacity(times.len());
        for time in times {
            match source.frame_at(time) {
                Ok(frame) => decoded.push((time, frame)),
                Err(error) => log::warn!("Skipping frame at {time:.3}s: {error}"),
            }
            tracker.advance(Some(time));
        }

        decoded.sort_by(|a, b| a.0.total_cmp(&b.0));

        let frames: Vec<TimestampedFrame> = decoded
            .into_iter()
            .enumerate()
            .map(|(position, (time, frame))| TimestampedFrame {
                frame,
                time,
                index: position + 1,
            })
            .collect();

        log::info!(
            "Sampled {} frame(s) at [{}]",
            frames.len(),
            frames
                .iter()
                .map(|f| format!("{:.2}", f.time))
                .collect::<Vec<_>>()
                .join(", "),
        );

        Ok(frames)
    }
}

/// Start anchor: half a second in, or 10% of a short video.
pub fn start_anchor(duration: f64) -> f64 {
    0.5_f64.min(duration * 0.1)
}

/// End anchor: half a second before the end, or 90% of a short video.
pub fn end_anchor(duration: f64) -> f64 {
    (duration - 0.5).max(duration * 0.9)
}

/// Build the sorted timestamp plan for a video of `duration` seconds given
/// the scene candidates already detected.
///
/// `duration` must be positive and `max_frames` at least 1.
pub(crate) fn plan_timestamps(
    duration: f64,
    max_frames: usize,
    candidates: &[SceneCandidate],
) -> Vec<f64> {
    let first = start_anchor(duration);
    let last = end_anchor(duration);
    let middle_slots = max_frames.saturating_sub(2);

    let mut chosen = vec![first];
    // The end anchor's neighbourhood is reserved before anything else is
    // placed, so interior frames can never crowd it out.
    let blocked = |chosen: &[f64], time: f64| {
        is_near(chosen, time) || (time - last).abs() < MIN_FRAME_SPACING
    };

    let mut scene_times: Vec<f64> = candidates
        .iter()
        .map(|candidate| candidate.time)
        .filter(|time| time.is_finite())
        .collect();
    scene_times.sort_by(f64::total_cmp);
    scene_times.dedup();

    let mut interior = 0;
    for time in scene_times {
        if interior == middle_slots {
            break;
        }
        if !(0.0..=duration).contains(&time)
            || duration - time < MIN_FRAME_SPACING
            || blocked(&chosen, time)
        {
            log::trace!("Dropping scene candidate at {time:.3}s");
            continue;
        }
        chosen.push(time);
        interior += 1;
    }

    let remaining = middle_slots - interior;
    if remaining > 0 {
        let step = duration / (remaining as f64 + 2.0);
        let clamp_at = duration - 1.0;
        let mut i = 1_usize;
        while i <= remaining {
            let time = (first + i as f64 * step).min(clamp_at).max(0.0);
            // Latest time that rules this position out, if any.
            let blocker = chosen
                .iter()
                .copied()
                .chain(std::iter::once(last))
                .filter(|&existing| (existing - time).abs() < MIN_FRAME_SPACING)
                .reduce(f64::max);
            let clear_after = match blocker {
                Some(existing) => existing,
                None => {
                    chosen.push(time);
                    time
                }
            };
            // Every later position clamps to the same time.
            if time >= clamp_at {
                break;
            }
            // Positions are increasing, so skip straight to the first one
            // that can be a full spacing past `clear_after`.
            let next = ((clear_after + MIN_FRAME_SPACING - first) / step).floor();
            i = if next > i as f64 {
                if next > remaining as f64 {
                    break;
                }
                next as usize
            } else {
                match i.checked_add(1) {
                    Some(next) => next,
                    None => break,
                }
            };
        }
    }

    if chosen.len() < max_frames && !is_near(&chosen, last) {
        chosen.push(last);
    }

    chosen.sort_by(f64::total_cmp);
    chosen
}

fn is_near(chosen: &[f64], time: f64) -> bool {
    chosen
        .iter()
        .any(|&existing| (existing - time).abs() < MIN_FRAME_SPACING)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(times: &[f64]) -> Vec<SceneCandidate> {
        times
            .iter()
            .map(|&time| SceneCandidate {
                time,
                diff_score: 100.0,
            })
            .collect()
    }

    fn assert_times(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "{actual:?} vs {expected:?}");
        }
    }

    #[test]
    fn anchors() {
        assert_eq!(start_anchor(10.0), 0.5);
        assert_eq!(start_anchor(2.0), 0.2);
        assert_eq!(end_anchor(10.0), 9.5);
        assert_eq!(end_anchor(2.0), 1.8);
    }

    #[test]
    fn scene_cuts_fill_interior() {
        let plan = plan_timestamps(10.0, 7, &candidates(&[2.0, 4.0, 6.0, 8.0]));
        assert_times(&plan, &[0.5, 2.0, 4.0, 6.0, 8.0, 9.5]);
    }

    #[test]
    fn no_cuts_falls_back_to_even_spacing() {
        let plan = plan_timestamps(10.0, 7, &[]);
        let step = 10.0 / 7.0;
        let expected: Vec<f64> = std::iter::once(0.5)
            .chain((1..=5).map(|i| 0.5 + i as f64 * step))
            .chain(std::iter::once(9.5))
            .collect();
        assert_times(&plan, &expected);
    }

    #[test]
    fn short_video_collapses_to_anchors() {
        assert_times(&plan_timestamps(2.0, 7, &[]), &[0.2, 1.8]);
    }

    #[test]
    fn very_short_video_keeps_only_start() {
        assert_times(&plan_timestamps(0.8, 7, &[]), &[0.08]);
    }

    #[test]
    fn cuts_near_anchors_are_dropped() {
        // 1.2 is near the start anchor, 9.0 near the end anchor and 9.7 is
        // within a second of the end of the video.
        let plan = plan_timestamps(10.0, 5, &candidates(&[1.2, 5.0, 9.0, 9.7]));
        // One cut accepted; two slots filled evenly, one of which lands
        // near 5.0 and is skipped.
        let step = 10.0 / 4.0;
        assert_times(&plan, &[0.5, 0.5 + step, 5.0, 9.5]);
    }

    #[test]
    fn unsorted_duplicate_and_out_of_range_cuts_are_normalised() {
        let plan = plan_timestamps(
            20.0,
            4,
            &candidates(&[12.0, 4.0, 4.0, -3.0, 25.0, f64::NAN]),
        );
        assert_times(&plan, &[0.5, 4.0, 12.0, 19.5]);
    }

    #[test]
    fn single_frame_budget_returns_start_only() {
        assert_times(&plan_timestamps(30.0, 1, &[]), &[0.5]);
    }

    #[test]
    fn two_frame_budget_returns_both_anchors() {
        assert_times(&plan_timestamps(30.0, 2, &candidates(&[10.0])), &[0.5, 29.5]);
    }

    /// Position-by-position uniform fill, for comparison.
    fn fill_one_by_one(duration: f64, max_frames: usize, accepted: &[f64]) -> Vec<f64> {
        let first = start_anchor(duration);
        let last = end_anchor(duration);
        let mut chosen = vec![first];
        chosen.extend_from_slice(accepted);
        let remaining = max_frames.saturating_sub(2) - accepted.len();
        let step = duration / (remaining as f64 + 2.0);
        for i in 1..=remaining {
            let time = (first + i as f64 * step).min(duration - 1.0).max(0.0);
            if is_near(&chosen, time) || (time - last).abs() < MIN_FRAME_SPACING {
                continue;
            }
            chosen.push(time);
        }
        if chosen.len() < max_frames && !is_near(&chosen, last) {
            chosen.push(last);
        }
        chosen.sort_by(f64::total_cmp);
        chosen
    }

    #[test]
    fn skipping_fill_matches_one_by_one_fill() {
        for tenths in 1..=400 {
            let duration = tenths as f64 / 10.0;
            for max_frames in [3, 5, 7, 12, 40, 97, 1_000, 25_000] {
                assert_times(
                    &plan_timestamps(duration, max_frames, &[]),
                    &fill_one_by_one(duration, max_frames, &[]),
                );
            }
        }
        // With accepted cuts splitting the timeline.
        for max_frames in [5, 9, 64, 5_000] {
            assert_times(
                &plan_timestamps(30.0, max_frames, &candidates(&[7.3, 19.0])),
                &fill_one_by_one(30.0, max_frames, &[7.3, 19.0]),
            );
        }
    }

    #[test]
    fn huge_budget_is_bounded_by_the_timeline() {
        for duration in [0.5, 10.0, 600.0] {
            let plan = plan_timestamps(duration, usize::MAX, &candidates(&[4.0]));
            assert!(plan.len() as f64 <= duration / MIN_FRAME_SPACING + 1.0, "{plan:?}");
            assert_eq!(plan[0], start_anchor(duration));
            for pair in plan.windows(2) {
                assert!(pair[1] - pair[0] >= MIN_FRAME_SPACING - 1e-9, "{plan:?}");
            }
            if plan.len() >= 2 {
                assert_eq!(*plan.last().unwrap(), end_anchor(duration));
            }
        }
    }

    #[test]
    fn plans_respect_spacing_and_bounds() {
        for tenths in 1..=600 {
            let duration = tenths as f64 / 10.0;
            for max_frames in 1..=12 {
                let plan = plan_timestamps(duration, max_frames, &[]);
                assert!(!plan.is_empty());
                assert!(plan.len() <= max_frames, "{duration} {max_frames} {plan:?}");
                assert_eq!(plan[0], start_anchor(duration));
                for pair in plan.windows(2) {
                    assert!(pair[1] - pair[0] >= MIN_FRAME_SPACING - 1e-9, "{plan:?}");
                }
                if plan.len() >= 2 {
                    assert_eq!(*plan.last().unwrap(), end_anchor(duration));
                }
                assert!(plan.iter().all(|t| (0.0..=duration).contains(t)));
            }
        }
    }
}

//! Scene detector integration tests over synthetic sources.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{SubclipBehaviour, SyntheticVideo, assert_times_near};
use framesift::{
    FrameSampler, OperationType, ProgressCallback, ProgressInfo, SamplerError, SamplerOptions,
    ScanWindow, SceneCandidate, SceneChangeDetector, SceneDetectionOptions, SceneDetector,
};

fn candidate_times(candidates: &[SceneCandidate]) -> Vec<f64> {
    candidates.iter().map(|candidate| candidate.time).collect()
}

fn short_scan_detector() -> SceneChangeDetector {
    SceneChangeDetector::new(
        SceneDetectionOptions::new().max_scan_duration(Duration::from_secs(5)),
    )
}

#[test]
fn finds_every_hard_cut() {
    let detector = SceneChangeDetector::default();
    let mut video = SyntheticVideo::new(10.0).with_cuts(&[2.0, 4.0, 6.0, 8.0]);

    let scenes = detector.detect(&mut video, 0.5, 10.0, 5).unwrap();

    assert_times_near(&candidate_times(&scenes), &[2.0, 4.0, 6.0, 8.0]);
    assert!(scenes.iter().all(|scene| scene.diff_score == 200.0));
    assert_eq!(video.scans.len(), 1);
    assert!(video.subclip_requests.is_empty());
}

#[test]
fn small_budget_widens_spacing() {
    // 9.5s window over 2 scenes: cuts must be 2.375s apart.
    let detector = SceneChangeDetector::default();
    let mut video = SyntheticVideo::new(10.0).with_cuts(&[2.0, 4.0, 6.0, 8.0]);

    let scenes = detector.detect(&mut video, 0.5, 10.0, 2).unwrap();

    assert_times_near(&candidate_times(&scenes), &[4.0, 8.0]);
}

#[test]
fn differences_below_threshold_are_ignored() {
    let detector = SceneChangeDetector::new(SceneDetectionOptions::new().threshold(250.0));
    let mut video = SyntheticVideo::new(10.0).with_cuts(&[2.0, 4.0, 6.0, 8.0]);

    let scenes = detector.detect(&mut video, 0.5, 10.0, 5).unwrap();

    assert!(scenes.is_empty());
}

#[test]
fn zero_budget_or_empty_window_does_not_scan() {
    let detector = SceneChangeDetector::default();
    let mut video = SyntheticVideo::new(10.0).with_cuts(&[2.0]);

    assert!(detector.detect(&mut video, 0.5, 10.0, 0).unwrap().is_empty());
    assert!(detector.detect(&mut video, 5.0, 5.0, 3).unwrap().is_empty());
    assert!(detector.detect(&mut video, 6.0, 2.0, 3).unwrap().is_empty());
    assert!(video.scans.is_empty());
}

#[test]
fn failed_scan_keeps_earlier_cuts() {
    let detector = SceneChangeDetector::default();
    let mut video = SyntheticVideo::new(10.0).with_cuts(&[2.0, 4.0, 6.0, 8.0]);
    video.scan_fails_after = Some(5.0);

    let scenes = detector.detect(&mut video, 0.5, 10.0, 5).unwrap();

    assert_times_near(&candidate_times(&scenes), &[2.0, 4.0]);
}

#[test]
fn long_window_scans_a_subclip_on_the_parent_timeline() {
    let detector = short_scan_detector();
    let mut video = SyntheticVideo::new(20.0).with_cuts(&[2.0, 4.0, 12.0]);
    video.subclip_behaviour = SubclipBehaviour::KeyframeAligned { lead: 0.3 };

    let scenes = detector.detect(&mut video, 0.5, 20.0, 5).unwrap();

    let found = candidate_times(&scenes);
    assert_eq!(found.len(), 2, "{found:?}");
    assert!((found[0] - 2.0).abs() < 0.11, "{found:?}");
    assert!((found[1] - 4.0).abs() < 0.11, "{found:?}");
    assert_eq!(video.subclip_requests, vec![(0.5, 5.5)]);
    assert!(video.scans.is_empty(), "parent should not be scanned");
}

#[test]
fn unsupported_subclip_scans_the_truncated_window() {
    let detector = short_scan_detector();
    let mut video = SyntheticVideo::new(20.0).with_cuts(&[2.0, 12.0]);

    let scenes = detector.detect(&mut video, 0.5, 20.0, 5).unwrap();

    assert_times_near(&candidate_times(&scenes), &[2.0]);
    assert_eq!(video.subclip_requests, vec![(0.5, 5.5)]);
    assert_eq!(
        video.scans,
        vec![ScanWindow {
            start: 0.5,
            end: 5.5,
            analysis_width: Some(320),
        }]
    );
}

#[test]
fn failed_subclip_makes_detection_unavailable() {
    let detector = short_scan_detector();
    let mut video = SyntheticVideo::new(20.0).with_cuts(&[2.0]);
    video.subclip_behaviour = SubclipBehaviour::Fails;

    let error = detector.detect(&mut video, 0.5, 20.0, 5).unwrap_err();

    assert!(
        matches!(error, SamplerError::SceneDetectionUnavailable(_)),
        "{error}"
    );
    assert!(video.scans.is_empty());
}

#[test]
fn sampler_survives_unavailable_detection() {
    let sampler = FrameSampler::with_detector(
        SamplerOptions::new().with_max_frames(5),
        short_scan_detector(),
    );
    let mut video = SyntheticVideo::new(20.0).with_cuts(&[2.0]);
    video.subclip_behaviour = SubclipBehaviour::Fails;

    let plan = sampler.plan(&mut video).unwrap();

    assert_times_near(&plan, &[0.5, 4.5, 8.5, 12.5, 19.5]);
}

#[test]
fn short_windows_never_request_a_subclip() {
    let detector = short_scan_detector();
    let mut video = SyntheticVideo::new(5.0).with_cuts(&[2.5]);
    video.subclip_behaviour = SubclipBehaviour::Fails;

    let scenes = detector.detect(&mut video, 0.5, 5.0, 3).unwrap();

    assert_times_near(&candidate_times(&scenes), &[2.5]);
    assert!(video.subclip_requests.is_empty());
}

#[derive(Default)]
struct RecordingProgress {
    infos: Mutex<Vec<ProgressInfo>>,
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.infos.lock().unwrap().push(info.clone());
    }
}

#[test]
fn scan_reports_progress_per_frame() {
    let recorder = Arc::new(RecordingProgress::default());
    let detector = SceneChangeDetector::default().with_progress(recorder.clone());
    let mut video = SyntheticVideo::new(10.0);

    detector.detect(&mut video, 0.5, 10.0, 5).unwrap();

    let infos = recorder.infos.lock().unwrap();
    assert!(infos.len() >= 95, "{} events", infos.len());
    assert!(
        infos
            .iter()
            .all(|info| info.operation == OperationType::SceneDetection)
    );
    assert_eq!(infos[0].total, Some(95));
    for pair in infos.windows(2) {
        assert_eq!(pair[1].current, pair[0].current + 1);
        assert!(pair[1].current_time >= pair[0].current_time);
    }
    assert_eq!(infos[infos.len() - 1].percentage, Some(100.0));
}

//! FFmpeg-backed integration tests.
//!
//! Tests that need media skip themselves when the fixtures are missing;
//! run `tests/fixtures/generate_fixtures.sh` to create them.

#![cfg(feature = "ffmpeg")]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use framesift::{
    BoxError, FrameSampler, FrameSource, MIN_FRAME_SPACING, MediaFile, SamplerError,
    SamplerOptions, SceneChangeDetector, SceneDetectionOptions, SceneDetector, Transcript,
    transcribe_audio,
};

const SAMPLE_VIDEO: &str = "tests/fixtures/sample_video.mp4";
const SILENT_VIDEO: &str = "tests/fixtures/silent_video.mp4";

fn open_fixture(path: &str) -> Option<MediaFile> {
    if !Path::new(path).exists() {
        return None;
    }
    Some(MediaFile::open(path).expect("Failed to open fixture"))
}

#[test]
fn open_nonexistent_file() {
    let error = MediaFile::open("this_file_does_not_exist.mp4").unwrap_err();

    assert!(matches!(error, SamplerError::FileOpen { .. }));
    assert!(
        error.to_string().contains("Failed to open media file"),
        "Error message should mention file open failure: {error}",
    );
}

#[test]
fn open_invalid_file() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let invalid_file_path = temporary_directory.path().join("invalid.mp4");
    std::fs::write(&invalid_file_path, b"this is not a media file")
        .expect("Failed to write invalid file");

    assert!(MediaFile::open(&invalid_file_path).is_err());
}

#[test]
fn metadata_describes_both_streams() {
    let Some(media) = open_fixture(SAMPLE_VIDEO) else {
        return;
    };

    let metadata = media.metadata();
    let video = metadata.video.as_ref().expect("Expected a video stream");
    assert_eq!((video.width, video.height), (640, 480));
    assert!((video.frames_per_second - 30.0).abs() < 0.01);
    assert!((metadata.duration_seconds() - 10.0).abs() < 0.2);
    assert!(metadata.has_audio());
    assert!((media.duration() - metadata.duration_seconds()).abs() < 1e-9);
}

#[test]
fn sampling_returns_ordered_spaced_frames() {
    let Some(mut media) = open_fixture(SAMPLE_VIDEO) else {
        return;
    };

    let sampler = FrameSampler::new(SamplerOptions::new().with_max_frames(5));
    let frames = sampler.sample(&mut media).expect("Sampling failed");

    assert!(!frames.is_empty() && frames.len() <= 5);
    for pair in frames.windows(2) {
        assert!(pair[1].time - pair[0].time >= MIN_FRAME_SPACING - 1e-9);
    }
    for (position, frame) in frames.iter().enumerate() {
        assert_eq!(frame.index, position + 1);
        assert_eq!((frame.frame.width(), frame.frame.height()), (640, 480));
    }
}

#[test]
fn plan_is_reproducible() {
    let Some(mut media) = open_fixture(SAMPLE_VIDEO) else {
        return;
    };

    let sampler = FrameSampler::default();
    let first = sampler.plan(&mut media).expect("Planning failed");
    let second = sampler.plan(&mut media).expect("Planning failed");

    assert_eq!(first, second);
}

#[test]
fn scene_scan_runs_on_real_video() {
    let Some(mut media) = open_fixture(SAMPLE_VIDEO) else {
        return;
    };

    let scenes = SceneChangeDetector::default()
        .detect(&mut media, 0.5, 10.0, 5)
        .expect("Detection failed");

    assert!(scenes.len() <= 5);
    for pair in scenes.windows(2) {
        assert!(pair[1].time > pair[0].time);
    }
}

/// Sub-clip scratch directories currently in the system temp dir.
fn scratch_directories() -> HashSet<PathBuf> {
    std::fs::read_dir(std::env::temp_dir())
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|entry| entry.file_name().to_string_lossy().starts_with("framesift-"))
                .map(|entry| entry.path())
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn truncated_scan_maps_subclip_cuts_to_the_parent_timeline() {
    let Some(mut media) = open_fixture(SAMPLE_VIDEO) else {
        return;
    };
    let before = scratch_directories();

    // 6s of the 9.5s window: the scan runs on a stream-copied sub-clip.
    let detector = SceneChangeDetector::new(
        SceneDetectionOptions::new().max_scan_duration(Duration::from_secs(6)),
    );
    let scenes = detector
        .detect(&mut media, 0.5, 10.0, 5)
        .expect("Detection failed");

    // The fixture switches source at 2.5s and 5.0s; one frame is 1/30s.
    let tolerance = 1.0 / 30.0 + 1e-3;
    for expected in [2.5, 5.0] {
        assert!(
            scenes
                .iter()
                .any(|scene| (scene.time - expected).abs() <= tolerance),
            "no cut near {expected}s in {scenes:?}",
        );
    }
    assert!(scenes.iter().all(|scene| scene.time <= 6.5 + tolerance));

    let leftover: Vec<PathBuf> = scratch_directories().difference(&before).cloned().collect();
    assert!(leftover.is_empty(), "sub-clip directories left behind: {leftover:?}");
}

#[test]
fn frame_out_of_range() {
    let Some(mut media) = open_fixture(SAMPLE_VIDEO) else {
        return;
    };

    let error = media.frame_at(999_999.0).unwrap_err();
    assert!(matches!(error, SamplerError::InvalidTimestamp(_)), "{error}");

    let error = media.frame_at(-1.0).unwrap_err();
    assert!(matches!(error, SamplerError::InvalidTimestamp(_)), "{error}");
}

#[test]
fn transcription_receives_the_whole_track() {
    let Some(mut media) = open_fixture(SAMPLE_VIDEO) else {
        return;
    };
    let sample_rate = media
        .metadata()
        .audio
        .as_ref()
        .expect("Expected an audio stream")
        .sample_rate;

    let transcriber = |samples: &[f32], rate: u32| -> Result<String, BoxError> {
        Ok(format!("{:.1}", samples.len() as f64 / rate as f64))
    };
    let transcript = transcribe_audio(&mut media, &transcriber).expect("Transcription failed");

    let seconds: f64 = transcript.as_str().parse().expect("Expected a duration");
    assert!((seconds - 10.0).abs() <= 0.2, "{seconds}");
    assert_eq!(sample_rate, 44_100);
}

#[test]
fn silent_video_has_no_transcript() {
    let Some(mut media) = open_fixture(SILENT_VIDEO) else {
        return;
    };

    let transcriber = |_: &[f32], _: u32| -> Result<String, BoxError> {
        panic!("Transcriber must not be called without audio")
    };
    let transcript = transcribe_audio(&mut media, &transcriber).expect("Transcription failed");

    assert_eq!(transcript, Transcript::NoAudioTrack);
}

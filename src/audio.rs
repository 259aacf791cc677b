//! Audio extraction for transcription.
//!
//! Speech recognition itself is an external collaborator, modelled by the
//! [`Transcriber`] trait. This module only gets the audio into the shape a
//! transcriber expects: a mono `f32` buffer plus its sample rate. Multi-channel
//! audio is downmixed by averaging the channels of each sample frame.
//!
//! # Example
//!
//! ```no_run
//! use framesift::{BoxError, MediaFile, transcribe_audio};
//!
//! let mut media = MediaFile::open("input.mp4")?;
//! let transcriber = |samples: &[f32], rate: u32| -> Result<String, BoxError> {
//!     Ok(format!("{} samples at {rate} Hz", samples.len()))
//! };
//! let transcript = transcribe_audio(&mut media, &transcriber)?;
//! println!("{transcript}");
//! # Ok::<(), framesift::SamplerError>(())
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};

#[cfg(feature = "ffmpeg")]
use ffmpeg_next::{
    Error as FfmpegError, Packet,
    codec::context::Context as CodecContext,
    format::{Sample, sample::Type as SampleType},
    frame::Audio as AudioFrame,
    software::resampling::Context as ResamplingContext,
};

use crate::error::SamplerError;
#[cfg(feature = "ffmpeg")]
use crate::media::MediaFile;
#[cfg(feature = "ffmpeg")]
use crate::progress::{OperationType, ProgressTracker};

/// Error type transcribers may return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A decoded mono audio track.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Mono samples, nominally in `-1.0..=1.0`.
    pub samples: Vec<f32>,
    /// Sample rate in hertz.
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Length of the buffer in seconds.
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Something that can yield its audio track as mono samples.
pub trait AudioSource {
    /// Decode the whole audio track. `Ok(None)` means the media has no
    /// audio track.
    fn mono_audio(&mut self) -> Result<Option<AudioBuffer>, SamplerError>;
}

/// Speech-to-text collaborator.
pub trait Transcriber {
    /// Transcribe mono `samples` recorded at `sample_rate` Hz.
    fn transcribe(&self, samples: &[f32], sample_rate: u32) -> Result<String, BoxError>;
}

impl<F> Transcriber for F
where
    F: Fn(&[f32], u32) -> Result<String, BoxError>,
{
    fn transcribe(&self, samples: &[f32], sample_rate: u32) -> Result<String, BoxError> {
        self(samples, sample_rate)
    }
}

/// Outcome of [`transcribe_audio`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transcript {
    /// Text produced by the transcriber.
    Text(String),
    /// The media has no audio track; the transcriber was not called.
    NoAudioTrack,
}

impl Transcript {
    /// Sentinel text reported for media without an audio track.
    pub const NO_AUDIO_TRACK: &'static str = "No audio track found in video.";

    /// The transcript text, or the sentinel for a missing track.
    pub fn as_str(&self) -> &str {
        match self {
            Transcript::Text(text) => text,
            Transcript::NoAudioTrack => Self::NO_AUDIO_TRACK,
        }
    }
}

impl Display for Transcript {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Extract the mono audio of `source` and hand it to `transcriber`.
///
/// # Errors
///
/// Returns decode errors from the source, or
/// [`SamplerError::TranscriptionError`] if the transcriber fails.
pub fn transcribe_audio<A, T>(source: &mut A, transcriber: &T) -> Result<Transcript, SamplerError>
where
    A: AudioSource + ?Sized,
    T: Transcriber + ?Sized,
{
    let Some(audio) = source.mono_audio()? else {
        log::info!("No audio track, skipping transcription");
        return Ok(Transcript::NoAudioTrack);
    };

    log::debug!(
        "Transcribing {:.2}s of audio ({} samples at {} Hz)",
        audio.duration_seconds(),
        audio.samples.len(),
        audio.sample_rate,
    );

    transcriber
        .transcribe(&audio.samples, audio.sample_rate)
        .map(Transcript::Text)
        .map_err(|error| SamplerError::TranscriptionError(error.to_string()))
}

/// Average interleaved `channels`-channel samples into mono.
///
/// A trailing partial sample frame is averaged over the channels present.
pub fn downmix_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

#[cfg(feature = "ffmpeg")]
impl AudioSource for MediaFile {
    fn mono_audio(&mut self) -> Result<Option<AudioBuffer>, SamplerError> {
        let Some(audio_stream_index) = self.audio_stream_index else {
            return Ok(None);
        };

        log::debug!("Decoding audio track (stream={audio_stream_index})");

        let stream = self
            .input_context
            .stream(audio_stream_index)
            .ok_or(SamplerError::NoAudioStream)?;
        let codec_parameters = stream.parameters();
        let decoder_context = CodecContext::from_parameters(codec_parameters)?;
        let mut decoder = decoder_context.decoder().audio().map_err(|e| {
            SamplerError::AudioDecodeError(format!("Failed to create audio decoder: {e}"))
        })?;

        let sample_rate = decoder.rate();
        let layout = decoder.channel_layout();

        // Convert to packed f32 without touching the channel count; the
        // downmix is done here so every channel is weighted equally.
        let mut resampler = ResamplingContext::get(
            decoder.format(),
            layout,
            sample_rate,
            Sample::F32(SampleType::Packed),
            layout,
            sample_rate,
        )
        .map_err(|e| SamplerError::AudioDecodeError(format!("Failed to create resampler: {e}")))?;

        self.input_context.seek(0, ..0)?;

        let mut tracker = ProgressTracker::new(
            self.progress.clone(),
            OperationType::AudioExtraction,
            None,
        );
        let mut samples = Vec::new();
        let mut decoded_frame = AudioFrame::empty();
        let mut converted_frame = AudioFrame::empty();

        let mut drain = |decoder: &mut ffmpeg_next::decoder::Audio,
                         samples: &mut Vec<f32>|
         -> Result<(), SamplerError> {
            while decoder.receive_frame(&mut decoded_frame).is_ok() {
                resampler
                    .run(&decoded_frame, &mut converted_frame)
                    .map_err(|e| SamplerError::AudioDecodeError(format!("Resample error: {e}")))?;
                let frame_channels = usize::from(converted_frame.channels()).max(1);
                let count = converted_frame.samples() * frame_channels;
                let data = converted_frame.data(0);
                // SAFETY: packed f32 output holds `samples * channels` floats
                // in plane 0.
                let interleaved: &[f32] =
                    unsafe { std::slice::from_raw_parts(data.as_ptr() as *const f32, count) };
                samples.extend(downmix_to_mono(interleaved, frame_channels));
                tracker.advance(Some(samples.len() as f64 / f64::from(sample_rate.max(1))));
            }
            Ok(())
        };

        loop {
            let mut packet = Packet::empty();
            match packet.read(&mut self.input_context) {
                Ok(()) => {
                    if packet.stream() != audio_stream_index {
                        continue;
                    }
                    if let Err(error) = decoder.send_packet(&packet) {
                        log::warn!("Dropping undecodable audio packet: {error}");
                        continue;
                    }
                    drain(&mut decoder, &mut samples)?;
                }
                Err(FfmpegError::Eof) => break,
                Err(error) => {
                    log::warn!("Audio read stopped early: {error}");
                    break;
                }
            }
        }

        decoder
            .send_eof()
            .map_err(|e| SamplerError::AudioDecodeError(e.to_string()))?;
        drain(&mut decoder, &mut samples)?;

        log::debug!(
            "Decoded {} mono sample(s) at {} Hz",
            samples.len(),
            sample_rate,
        );

        Ok(Some(AudioBuffer {
            samples,
            sample_rate,
        }))
    }
}

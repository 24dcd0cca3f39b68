use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use parking_lot::Mutex;
use thiserror::Error;

use super::sample::AudioSample;

/// Playback failures surfaced to the presentation layer. Transport-control
/// races (no sample loaded, stopping an already-finished voice) recover
/// locally and never reach this type.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Audio output unavailable: {0}")]
    OutputUnavailable(String),
}

/// The platform audio output facility, acquired explicitly and held for the
/// lifetime of the controller that owns it.
pub struct OutputContext {
    device: cpal::Device,
    config: cpal::SupportedStreamConfig,
}

impl OutputContext {
    pub fn acquire() -> Result<Self, PlaybackError> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| PlaybackError::OutputUnavailable("No output device".into()))?;

        let config = device.default_output_config().map_err(|e| {
            PlaybackError::OutputUnavailable(format!("Failed to get output config: {}", e))
        })?;

        Ok(Self { device, config })
    }

    /// Output device sample rate. Samples are resampled to this rate once at
    /// load time, so voices never resample.
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate().0
    }

    pub fn channels(&self) -> u16 {
        self.config.channels()
    }

    /// Start a one-shot voice streaming `sample` from `offset_secs`. The
    /// returned voice is already running: the stream is built and then
    /// resumed, which is the platform handshake that actually makes it
    /// audible. A voice cannot be restarted; stopping it is dropping it.
    pub fn start_voice(
        &self,
        sample: Arc<AudioSample>,
        offset_secs: f64,
        volume: Arc<Mutex<f32>>,
    ) -> Result<Voice, PlaybackError> {
        let start_frame = (offset_secs.max(0.0) * sample.sample_rate() as f64) as usize;
        let cursor = Arc::new(AtomicUsize::new(start_frame));

        let stream_config: StreamConfig = self.config.clone().into();
        let stream = match self.config.sample_format() {
            cpal::SampleFormat::F32 => self.build_voice_stream::<f32>(
                &stream_config,
                sample,
                cursor.clone(),
                volume,
            )?,
            cpal::SampleFormat::I16 => self.build_voice_stream::<i16>(
                &stream_config,
                sample,
                cursor.clone(),
                volume,
            )?,
            cpal::SampleFormat::U16 => self.build_voice_stream::<u16>(
                &stream_config,
                sample,
                cursor.clone(),
                volume,
            )?,
            format => {
                return Err(PlaybackError::OutputUnavailable(format!(
                    "Unsupported sample format: {:?}",
                    format
                )))
            }
        };

        stream.play().map_err(|e| {
            PlaybackError::OutputUnavailable(format!("Failed to resume output stream: {}", e))
        })?;

        Ok(Voice { _stream: stream })
    }

    fn build_voice_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
        &self,
        config: &StreamConfig,
        sample: Arc<AudioSample>,
        cursor: Arc<AtomicUsize>,
        volume: Arc<Mutex<f32>>,
    ) -> Result<Stream, PlaybackError> {
        let out_channels = config.channels as usize;
        let in_channels = sample.channels() as usize;
        let total_frames = sample.frames();

        let stream = self
            .device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let vol = *volume.lock();
                    let frames = data.len() / out_channels;
                    let base = cursor.fetch_add(frames, Ordering::SeqCst);

                    for (i, frame) in data.chunks_mut(out_channels).enumerate() {
                        let src_frame = base + i;
                        for (ch, slot) in frame.iter_mut().enumerate() {
                            let value = if src_frame < total_frames {
                                // Mono sources fan out to every output channel
                                let src_ch = ch.min(in_channels - 1);
                                sample.samples()[src_frame * in_channels + src_ch] * vol
                            } else {
                                0.0
                            };
                            *slot = T::from_sample(value);
                        }
                    }
                },
                move |err| {
                    tracing::error!("Audio output error: {}", err);
                },
                None,
            )
            .map_err(|e| {
                PlaybackError::OutputUnavailable(format!("Failed to build output stream: {}", e))
            })?;

        Ok(stream)
    }
}

/// A live, one-shot rendering of a sample. Dropping it stops and releases
/// the underlying stream; dropping a voice that already played out is a
/// no-op, so teardown paths never need to distinguish the two.
pub struct Voice {
    _stream: Stream,
}

// Safety: cpal::Stream wraps a platform audio handle that is thread-safe on
// the platforms we target. A Voice is always accessed behind the controller's
// Mutex, so concurrent access to the stream is impossible.
unsafe impl Send for Voice {}

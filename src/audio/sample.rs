use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, Result};

/// A fully-decoded, immutable audio buffer: interleaved f32 samples with a
/// known sample rate and channel count. Produced once per synthesis result
/// and replaced wholesale, never mutated.
#[derive(Debug, Clone)]
pub struct AudioSample {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl AudioSample {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Result<Self> {
        if sample_rate == 0 {
            anyhow::bail!("Sample rate must be non-zero");
        }
        if channels == 0 {
            anyhow::bail!("Channel count must be non-zero");
        }
        if samples.len() % channels as usize != 0 {
            anyhow::bail!(
                "Sample count {} is not a multiple of channel count {}",
                samples.len(),
                channels
            );
        }
        Ok(Self { samples, sample_rate, channels })
    }

    /// Decode signed 16-bit little-endian PCM, the wire format the speech
    /// synthesis API returns inline.
    pub fn from_pcm16_le(bytes: &[u8], sample_rate: u32, channels: u16) -> Result<Self> {
        if bytes.len() % 2 != 0 {
            anyhow::bail!("PCM16 payload has odd byte length {}", bytes.len());
        }
        let samples: Vec<f32> = bytes
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
            .collect();
        Self::new(samples, sample_rate, channels)
    }

    /// Decode a WAV payload (integer or float PCM).
    pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = hound::WavReader::new(Cursor::new(bytes))
            .context("Failed to parse WAV payload")?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<std::result::Result<_, _>>()
                .context("Failed to read float WAV samples")?,
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<std::result::Result<_, _>>()
                    .context("Failed to read integer WAV samples")?
            }
        };

        Self::new(samples, spec.sample_rate, spec.channels)
    }

    /// Write the buffer to a 32-bit float WAV file.
    pub fn write_wav(&self, path: &Path) -> Result<()> {
        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec)
            .context(format!("Failed to create WAV file: {:?}", path))?;
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize().context("Failed to finalize WAV file")?;
        Ok(())
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of frames (one sample per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Total duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(frames: usize, sample_rate: u32, channels: u16) -> AudioSample {
        let samples = vec![0.25f32; frames * channels as usize];
        AudioSample::new(samples, sample_rate, channels).unwrap()
    }

    #[test]
    fn test_duration_mono() {
        let sample = tone(24000, 24000, 1);
        assert_eq!(sample.duration_secs(), 1.0);
        assert_eq!(sample.frames(), 24000);
    }

    #[test]
    fn test_duration_stereo() {
        let sample = tone(48000, 48000, 2);
        assert_eq!(sample.duration_secs(), 1.0);
        assert_eq!(sample.samples().len(), 96000);
    }

    #[test]
    fn test_rejects_zero_rate() {
        assert!(AudioSample::new(vec![0.0; 4], 0, 1).is_err());
    }

    #[test]
    fn test_rejects_misaligned_channel_count() {
        assert!(AudioSample::new(vec![0.0; 3], 24000, 2).is_err());
    }

    #[test]
    fn test_pcm16_decode() {
        // 0, i16::MAX, i16::MIN as little-endian bytes
        let bytes = [0u8, 0, 0xFF, 0x7F, 0x00, 0x80, 0, 0];
        let sample = AudioSample::from_pcm16_le(&bytes, 24000, 1).unwrap();
        assert_eq!(sample.frames(), 4);
        assert_eq!(sample.samples()[0], 0.0);
        assert!((sample.samples()[1] - 0.99997).abs() < 1e-4);
        assert_eq!(sample.samples()[2], -1.0);
    }

    #[test]
    fn test_pcm16_rejects_odd_length() {
        assert!(AudioSample::from_pcm16_le(&[0u8, 0, 0], 24000, 1).is_err());
    }

    #[test]
    fn test_wav_round_trip_in_memory() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut bytes = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut bytes, spec).unwrap();
            for v in [0i16, 16384, -16384, 0] {
                writer.write_sample(v).unwrap();
            }
            writer.finalize().unwrap();
        }

        let sample = AudioSample::from_wav_bytes(&bytes.into_inner()).unwrap();
        assert_eq!(sample.sample_rate(), 16000);
        assert_eq!(sample.channels(), 1);
        assert_eq!(sample.frames(), 4);
        assert!((sample.samples()[1] - 0.5).abs() < 1e-4);
        assert!((sample.samples()[2] + 0.5).abs() < 1e-4);
    }
}

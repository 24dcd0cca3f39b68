use anyhow::Result;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use super::sample::AudioSample;

/// Resample a decoded buffer to a new rate, e.g. to match the output device.
/// Returns the input unchanged when the rates already agree.
pub fn resample(sample: &AudioSample, to_rate: u32) -> Result<AudioSample> {
    let from_rate = sample.sample_rate();
    if from_rate == to_rate {
        return Ok(sample.clone());
    }

    let channels = sample.channels() as usize;
    let frames = sample.frames();
    if frames == 0 {
        return AudioSample::new(Vec::new(), to_rate, sample.channels());
    }

    // Deinterleave into one plane per channel for rubato
    let mut planes: Vec<Vec<f32>> = vec![Vec::with_capacity(frames); channels];
    for frame in sample.samples().chunks_exact(channels) {
        for (ch, &value) in frame.iter().enumerate() {
            planes[ch].push(value);
        }
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_rate as f64 / from_rate as f64;
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, frames, channels)?;

    let output = resampler.process(&planes, None)?;

    let out_frames = output.first().map(|p| p.len()).unwrap_or(0);
    let mut interleaved = Vec::with_capacity(out_frames * channels);
    for frame in 0..out_frames {
        for plane in &output {
            interleaved.push(plane[frame]);
        }
    }

    AudioSample::new(interleaved, to_rate, sample.channels())
}

/// Peak-normalize in place so the loudest sample hits full scale.
pub fn normalize(samples: &mut [f32]) {
    let max_val = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
    if max_val > 0.0 && max_val != 1.0 {
        for sample in samples.iter_mut() {
            *sample /= max_val;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_same_rate_is_passthrough() {
        let sample = AudioSample::new(vec![0.1, 0.2, 0.3, 0.4], 24000, 1).unwrap();
        let out = resample(&sample, 24000).unwrap();
        assert_eq!(out.samples(), sample.samples());
        assert_eq!(out.sample_rate(), 24000);
    }

    #[test]
    fn test_resample_changes_rate_and_duration_is_preserved() {
        let frames = 24000;
        let sample = AudioSample::new(vec![0.5; frames], 24000, 1).unwrap();
        let out = resample(&sample, 48000).unwrap();
        assert_eq!(out.sample_rate(), 48000);
        // One second in, roughly one second out
        assert!((out.duration_secs() - 1.0).abs() < 0.05);
    }

    #[test]
    fn test_resample_empty() {
        let sample = AudioSample::new(Vec::new(), 24000, 2).unwrap();
        let out = resample(&sample, 48000).unwrap();
        assert_eq!(out.frames(), 0);
        assert_eq!(out.sample_rate(), 48000);
    }

    #[test]
    fn test_normalize() {
        let mut samples = vec![0.25, -0.5, 0.125];
        normalize(&mut samples);
        assert_eq!(samples, vec![0.5, -1.0, 0.25]);
    }

    #[test]
    fn test_normalize_silence_untouched() {
        let mut samples = vec![0.0, 0.0];
        normalize(&mut samples);
        assert_eq!(samples, vec![0.0, 0.0]);
    }
}

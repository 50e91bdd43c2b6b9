//! C1 — Signal Front-End: decode audio to mono PCM, compute a magnitude spectrogram.

use std::f32::consts::PI;
use std::path::Path;

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum FrontendError {
    #[error("failed to decode audio: {0}")]
    Decode(String),
    #[error("empty audio")]
    EmptyAudio,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Decode an audio file to mono `f32` samples at `cfg.sample_rate` Hz.
pub fn load(path: impl AsRef<Path>, cfg: &Config) -> Result<Vec<f32>, FrontendError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| FrontendError::Decode(e.to_string()))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| FrontendError::Decode("no audio track found".into()))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let source_rate = codec_params.sample_rate.unwrap_or(44_100);
    let channels = codec_params.channels.map(|c| c.count()).unwrap_or(1).max(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| FrontendError::Decode(e.to_string()))?;

    let mut mono: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(_) => break,
        };
        if packet.track_id() != track_id {
            continue;
        }
        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(_) => continue,
        };
        let spec = *decoded.spec();
        let n_frames = decoded.capacity();
        let mut sample_buf = SampleBuffer::<f32>::new(n_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        for frame in sample_buf.samples().chunks(channels) {
            mono.push(frame.iter().sum::<f32>() / channels as f32);
        }
    }

    if mono.is_empty() {
        return Err(FrontendError::EmptyAudio);
    }

    if source_rate != cfg.sample_rate {
        mono = resample(&mono, source_rate, cfg.sample_rate);
    }

    if mono.len() < cfg.n_fft {
        return Err(FrontendError::EmptyAudio);
    }

    Ok(mono)
}

/// Sinc-interpolated resampling via `rubato`.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    use rubato::{FftFixedIn, Resampler};

    if samples.is_empty() {
        return Vec::new();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let chunk_size = 1024;

    let mut resampler =
        FftFixedIn::<f32>::new(from_rate as usize, to_rate as usize, chunk_size, 2, 1)
            .expect("failed to create resampler");

    let mut output = Vec::with_capacity((samples.len() as f64 * ratio) as usize + chunk_size);

    let mut pos = 0;
    while pos + chunk_size <= samples.len() {
        let chunk = vec![samples[pos..pos + chunk_size].to_vec()];
        if let Ok(out) = resampler.process(&chunk, None) {
            if let Some(ch) = out.first() {
                output.extend_from_slice(ch);
            }
        }
        pos += chunk_size;
    }

    if pos < samples.len() {
        let remaining = samples.len() - pos;
        let mut padded = samples[pos..].to_vec();
        padded.resize(chunk_size, 0.0);
        let chunk = vec![padded];
        if let Ok(out) = resampler.process(&chunk, None) {
            if let Some(ch) = out.first() {
                let take = ((remaining as f64 * ratio) as usize).min(ch.len());
                output.extend_from_slice(&ch[..take]);
            }
        }
    }

    output
}

fn hann_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / n as f32).cos()))
        .collect()
}

/// Magnitude spectrogram: `frames` rows of `cfg.num_bins()` linear magnitudes each.
pub fn spectrogram(samples: &[f32], cfg: &Config) -> Vec<Vec<f32>> {
    let n_fft = cfg.n_fft;
    let hop = cfg.hop_length;
    let n_bins = cfg.num_bins();

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n_fft);
    let window = hann_window(n_fft);

    let mut frames = Vec::new();
    let mut pos = 0;
    while pos + n_fft <= samples.len() {
        let mut buffer: Vec<Complex<f32>> = (0..n_fft)
            .map(|i| Complex::new(samples[pos + i] * window[i], 0.0))
            .collect();
        fft.process(&mut buffer);

        let magnitudes: Vec<f32> = buffer[..n_bins].iter().map(|c| c.norm()).collect();
        frames.push(magnitudes);
        pos += hop;
    }

    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_wave(freq: f32, duration_secs: f32, amplitude: f32, sr: u32) -> Vec<f32> {
        let n = (sr as f32 * duration_secs) as usize;
        (0..n)
            .map(|i| amplitude * (2.0 * PI * freq * i as f32 / sr as f32).sin())
            .collect()
    }

    #[test]
    fn spectrogram_shape_matches_config() {
        let cfg = Config::default();
        let samples = sine_wave(440.0, 2.0, 0.5, cfg.sample_rate);
        let spec = spectrogram(&samples, &cfg);
        assert!(!spec.is_empty());
        for frame in &spec {
            assert_eq!(frame.len(), cfg.num_bins());
        }
        let expected_frames = (samples.len() - cfg.n_fft) / cfg.hop_length + 1;
        assert_eq!(spec.len(), expected_frames);
    }

    #[test]
    fn pure_tone_concentrates_energy_in_one_band() {
        let cfg = Config::default();
        let samples = sine_wave(1000.0, 1.0, 1.0, cfg.sample_rate);
        let spec = spectrogram(&samples, &cfg);
        let frame = &spec[spec.len() / 2];
        let (peak_bin, peak_mag) = frame
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap();
        let expected_bin = (1000.0 * cfg.n_fft as f32 / cfg.sample_rate as f32).round() as usize;
        assert!((peak_bin as i64 - expected_bin as i64).abs() <= 1);
        assert!(*peak_mag > 10.0);
    }

    #[test]
    fn silence_produces_near_zero_magnitudes() {
        let cfg = Config::default();
        let samples = vec![0.0f32; cfg.sample_rate as usize * 2];
        let spec = spectrogram(&samples, &cfg);
        for frame in &spec {
            for &m in frame {
                assert!(m.abs() < 1e-4);
            }
        }
    }

    #[test]
    fn too_short_audio_is_rejected_by_load_precondition() {
        // spectrogram() itself just yields zero frames when too short; the
        // EmptyAudio rejection lives in `load`, exercised via decode tests
        // in the integration suite (no bundled sample files live in-tree).
        let cfg = Config::default();
        let samples = vec![0.0f32; cfg.n_fft - 1];
        let spec = spectrogram(&samples, &cfg);
        assert!(spec.is_empty());
    }
}

//! Tunable parameters shared by every pipeline stage.
//!
//! Every field here affects the hashes a catalogue is built from
//! (invariant 5: a query and the index it is run against must share a
//! `Config`, or results are meaningless). [`Index`](crate::store::Index)
//! pins the active config into the catalogue on first ingest and
//! refuses to open with a different one.

use serde::{Deserialize, Serialize};

/// Pipeline configuration. See `Default` for the reference values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Target mono sample rate audio is decoded/resampled to, in Hz.
    pub sample_rate: u32,
    /// STFT window size.
    pub n_fft: usize,
    /// Samples advanced between STFT frames.
    pub hop_length: usize,
    /// Dilation count `K` for the peak-detection footprint.
    pub peak_neighborhood_radius: u32,
    /// Minimum linear magnitude for a cell to qualify as a peak.
    pub min_amplitude: f32,
    /// Number of forward peaks paired with each anchor.
    pub fan_value: usize,
    /// Maximum anchor-to-target frame distance, in frames.
    pub time_window: u32,
    /// Bucket width used when histogramming alignment offsets, in frames.
    pub alignment_bucket: i64,
    /// Minimum bucket score for a match to be reported.
    pub min_confidence: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate: 22_050,
            n_fft: 2048,
            hop_length: 512,
            peak_neighborhood_radius: 20,
            min_amplitude: 10.0,
            fan_value: 5,
            time_window: 200,
            alignment_bucket: 10,
            min_confidence: 5,
        }
    }
}

/// Error returned by [`Config::validate`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("n_fft must be a power of two, got {0}")]
    NFftNotPowerOfTwo(usize),
    #[error("hop_length ({hop_length}) must be <= n_fft ({n_fft})")]
    HopTooLarge { hop_length: usize, n_fft: usize },
    #[error("fan_value must be > 0")]
    ZeroFanValue,
    #[error("alignment_bucket must be > 0")]
    ZeroAlignmentBucket,
    #[error("sample_rate must be > 0")]
    ZeroSampleRate,
}

impl Config {
    /// Bin count of the magnitude spectrogram: `n_fft / 2 + 1`.
    pub fn num_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Reject configurations that can never produce usable fingerprints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_fft == 0 || !self.n_fft.is_power_of_two() {
            return Err(ConfigError::NFftNotPowerOfTwo(self.n_fft));
        }
        if self.hop_length == 0 || self.hop_length > self.n_fft {
            return Err(ConfigError::HopTooLarge {
                hop_length: self.hop_length,
                n_fft: self.n_fft,
            });
        }
        if self.fan_value == 0 {
            return Err(ConfigError::ZeroFanValue);
        }
        if self.alignment_bucket <= 0 {
            return Err(ConfigError::ZeroAlignmentBucket);
        }
        if self.sample_rate == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }
        Ok(())
    }

    /// Seconds represented by one spectrogram frame (hop).
    pub fn frame_duration_secs(&self) -> f64 {
        self.hop_length as f64 / self.sample_rate as f64
    }
}

//! C2 — Peak Extraction: sparse local maxima over a magnitude spectrogram.
//!
//! Mirrors scipy's `maximum_filter`-based peak test over a disk-shaped
//! structuring element grown to `peak_neighborhood_radius`: a cell is a
//! local maximum if it equals the max of its neighborhood, and separately
//! a cell "has a zero neighbor" if any cell in that same neighborhood
//! (out-of-bounds cells count as non-zero) is exactly zero. A candidate
//! is a peak when exactly one of those two conditions holds — i.e. the
//! local-maximum test XOR the zero-neighbor test — and its amplitude
//! clears `cfg.min_amplitude`.

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Peak {
    pub frame: usize,
    pub freq_bin: usize,
}

/// Disk-shaped offset footprint of the given radius, built once per call.
///
/// scipy grows a rank-1 (`+`-shaped) binary structure by iterating it
/// `radius` times, which produces exactly the set of integer offsets
/// within Manhattan (L1) distance `radius` of the origin.
fn footprint(radius: u32) -> Vec<(i64, i64)> {
    let r = radius as i64;
    let mut offsets = Vec::new();
    for df in -r..=r {
        for dt in -r..=r {
            if df.abs() + dt.abs() <= r {
                offsets.push((df, dt));
            }
        }
    }
    offsets
}

/// Find local-maximum cells that clear `cfg.min_amplitude`, sorted by
/// ascending `frame` then ascending `freq_bin` for deterministic pairing.
pub fn find_peaks(spectrogram: &[Vec<f32>], cfg: &Config) -> Vec<Peak> {
    if spectrogram.is_empty() {
        return Vec::new();
    }
    let n_frames = spectrogram.len();
    let n_bins = spectrogram[0].len();
    let offsets = footprint(cfg.peak_neighborhood_radius);

    let mut peaks = Vec::new();
    for frame in 0..n_frames {
        for bin in 0..n_bins {
            let value = spectrogram[frame][bin];
            if value <= cfg.min_amplitude {
                continue;
            }

            let mut neighborhood_max = f32::MIN;
            let mut has_zero_neighbor = false;
            for &(df, dt) in &offsets {
                let nf = frame as i64 + dt;
                let nb = bin as i64 + df;
                if nf < 0 || nf >= n_frames as i64 || nb < 0 || nb >= n_bins as i64 {
                    continue;
                }
                let v = spectrogram[nf as usize][nb as usize];
                if v > neighborhood_max {
                    neighborhood_max = v;
                }
                if v == 0.0 {
                    has_zero_neighbor = true;
                }
            }

            let is_local_max = value >= neighborhood_max;
            if is_local_max != has_zero_neighbor {
                peaks.push(Peak { frame, freq_bin: bin });
            }
        }
    }

    peaks.sort_by_key(|p| (p.frame, p.freq_bin));
    peaks.dedup();
    peaks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(frames: usize, bins: usize, value: f32) -> Vec<Vec<f32>> {
        vec![vec![value; bins]; frames]
    }

    /// A background level below `min_amplitude` but away from exact zero,
    /// so spikes sit in a textured rather than a perfectly zero-valued
    /// neighborhood (see `spike_on_zero_background_is_rejected` below for
    /// the exact-zero case this is deliberately avoiding).
    const NOISE_FLOOR: f32 = 0.001;

    #[test]
    fn all_zero_spectrogram_has_no_peaks() {
        let cfg = Config::default();
        let spec = flat(50, cfg.num_bins(), 0.0);
        assert!(find_peaks(&spec, &cfg).is_empty());
    }

    #[test]
    fn single_spike_is_detected() {
        let cfg = Config::default();
        let mut spec = flat(50, cfg.num_bins(), NOISE_FLOOR);
        spec[25][100] = 50.0;
        let peaks = find_peaks(&spec, &cfg);
        assert_eq!(peaks, vec![Peak { frame: 25, freq_bin: 100 }]);
    }

    #[test]
    fn below_min_amplitude_is_ignored() {
        let cfg = Config::default();
        let mut spec = flat(50, cfg.num_bins(), NOISE_FLOOR);
        spec[25][100] = cfg.min_amplitude - 0.1;
        assert!(find_peaks(&spec, &cfg).is_empty());
    }

    #[test]
    fn exact_min_amplitude_is_ignored() {
        let cfg = Config::default();
        let mut spec = flat(50, cfg.num_bins(), NOISE_FLOOR);
        spec[25][100] = cfg.min_amplitude;
        assert!(find_peaks(&spec, &cfg).is_empty());
    }

    #[test]
    fn spike_on_zero_background_is_rejected() {
        // A spike whose entire footprint is exactly zero is a local
        // maximum (value >= neighborhood_max) AND has a zero neighbor,
        // so the two conditions cancel and it is not reported.
        let cfg = Config::default();
        let mut spec = flat(50, cfg.num_bins(), 0.0);
        spec[25][100] = 50.0;
        assert!(find_peaks(&spec, &cfg).is_empty());
    }

    #[test]
    fn two_spikes_far_apart_both_detected() {
        let cfg = Config::default();
        let mut spec = flat(200, cfg.num_bins(), NOISE_FLOOR);
        spec[10][10] = 40.0;
        spec[180][900] = 40.0;
        let peaks = find_peaks(&spec, &cfg);
        assert_eq!(peaks.len(), 2);
    }

    #[test]
    fn peaks_are_sorted_by_frame_then_bin() {
        let cfg = Config::default();
        let mut spec = flat(200, cfg.num_bins(), NOISE_FLOOR);
        spec[180][900] = 40.0;
        spec[10][500] = 40.0;
        spec[10][10] = 40.0;
        let peaks = find_peaks(&spec, &cfg);
        let mut sorted = peaks.clone();
        sorted.sort_by_key(|p| (p.frame, p.freq_bin));
        assert_eq!(peaks, sorted);
    }
}

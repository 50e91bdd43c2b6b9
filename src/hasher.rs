//! C3 — Landmark Hashing: pair peaks into fan-out hashes `H(f1, f2, Δt)`.

use sha1::{Digest, Sha1};

use crate::config::Config;
use crate::model::{Hash40, RawPosting};
use crate::peaks::Peak;

fn hash_pair(freq1: usize, freq2: usize, delta_t: i64) -> Hash40 {
    let payload = format!("{}|{}|{}", freq1, freq2, delta_t);
    let mut hasher = Sha1::new();
    hasher.update(payload.as_bytes());
    Hash40(hex::encode(hasher.finalize()))
}

/// Pair each peak (as anchor) with up to `cfg.fan_value` following peaks
/// (as targets) within `cfg.time_window` frames, emitting one hash per pair.
///
/// `peaks` must already be sorted by ascending `frame` then `freq_bin`
/// (the order [`find_peaks`](crate::peaks::find_peaks) produces); this is
/// what makes the target window and the resulting hash set deterministic.
pub fn hashes(peaks: &[Peak], cfg: &Config) -> Vec<RawPosting> {
    let mut out = Vec::new();

    for (i, anchor) in peaks.iter().enumerate() {
        for target in peaks.iter().skip(i + 1).take(cfg.fan_value) {
            let delta_t = target.frame as i64 - anchor.frame as i64;
            if delta_t > cfg.time_window as i64 {
                break;
            }
            let hash = hash_pair(anchor.freq_bin, target.freq_bin, delta_t);
            out.push(RawPosting {
                hash,
                anchor_time: anchor.frame as u32,
            });
        }
    }

    out
}

//! Read-only audio diagnostics, carried over from the original prototype's
//! inspection script. Has no bearing on the catalogue.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::frontend::{self, FrontendError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioInfo {
    pub sample_rate: u32,
    pub duration_secs: f64,
    pub num_samples: usize,
}

/// Decode `path` and report basic facts about it, without fingerprinting.
pub fn inspect(path: impl AsRef<Path>, cfg: &Config) -> Result<AudioInfo, FrontendError> {
    let samples = frontend::load(path, cfg)?;
    Ok(AudioInfo {
        sample_rate: cfg.sample_rate,
        duration_secs: samples.len() as f64 / cfg.sample_rate as f64,
        num_samples: samples.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inspect_of_missing_file_errors() {
        let cfg = Config::default();
        assert!(inspect("does-not-exist.mp3", &cfg).is_err());
    }
}

//! Facade combining the pipeline (C1-C3) and the catalogue (C4) behind a
//! single handle, mirroring the teacher's `MemoryEngine` shape.

use std::path::Path;

use crate::config::Config;
use crate::frontend::{self, FrontendError};
use crate::hasher;
use crate::matcher;
use crate::model::{IngestMeta, MatchResult, RawPosting, Statistics};
use crate::peaks;
use crate::store::{Index, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Frontend(#[from] FrontendError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The whole pipeline and its catalogue, opened against one database file.
pub struct Engine {
    cfg: Config,
    index: Index,
}

impl Engine {
    pub fn open(db_path: impl AsRef<Path>, cfg: Config) -> Result<Self, EngineError> {
        let index = Index::open(db_path, &cfg)?;
        Ok(Engine { cfg, index })
    }

    /// Run C1-C3 over an audio file, returning the landmark hashes it
    /// produces. Does not touch the catalogue.
    pub fn fingerprint(&self, audio_path: impl AsRef<Path>) -> Result<Vec<RawPosting>, EngineError> {
        let samples = frontend::load(audio_path, &self.cfg)?;
        let spectrogram = frontend::spectrogram(&samples, &self.cfg);
        let found_peaks = peaks::find_peaks(&spectrogram, &self.cfg);
        Ok(hasher::hashes(&found_peaks, &self.cfg))
    }

    /// Fingerprint `audio_path` and add it to the catalogue under `meta`.
    /// Idempotent per `meta.source_path`.
    pub fn ingest(
        &mut self,
        meta: IngestMeta,
        audio_path: impl AsRef<Path>,
    ) -> Result<i64, EngineError> {
        let postings = self.fingerprint(audio_path)?;
        Ok(self.index.ingest(&meta, &postings)?)
    }

    /// Fingerprint `audio_path` and look it up against the catalogue.
    /// Returns `Ok(None)` when no catalogued work clears `min_confidence`
    /// — that is not a failure, just the absence of a match.
    pub fn match_audio(
        &self,
        audio_path: impl AsRef<Path>,
        min_confidence: u32,
    ) -> Result<Option<MatchResult>, EngineError> {
        let postings = self.fingerprint(audio_path)?;
        Ok(matcher::match_query(&self.index, &postings, &self.cfg, min_confidence)?)
    }

    pub fn statistics(&self) -> Result<Statistics, EngineError> {
        Ok(self.index.statistics()?)
    }
}

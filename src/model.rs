//! Shared data types for catalogue entries, ingest metadata, and results.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a catalogued work is. `"tv"` is accepted as a legacy synonym for
/// `Episode` on read but is never written back out; see the tie-break
/// rule `soundmark` picked for this in `DESIGN.md`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Movie,
    Episode,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Movie => write!(f, "movie"),
            Kind::Episode => write!(f, "episode"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown kind: {0}")]
pub struct UnknownKind(String);

impl FromStr for Kind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(Kind::Movie),
            "episode" | "tv" => Ok(Kind::Episode),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// Metadata supplied by the caller when ingesting a new source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestMeta {
    pub title: String,
    pub kind: Kind,
    pub source_path: String,
    pub season: Option<u32>,
    pub episode_number: Option<u32>,
}

/// Hex-encoded SHA-1 digest of an anchor/target peak pair. 40 hex chars.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hash40(pub String);

impl fmt::Display for Hash40 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("hash must be 40 hex characters, got {0:?}")]
pub struct InvalidHash(String);

impl FromStr for Hash40 {
    type Err = InvalidHash;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == 40 && s.chars().all(|c| c.is_ascii_hexdigit()) {
            Ok(Hash40(s.to_string()))
        } else {
            Err(InvalidHash(s.to_string()))
        }
    }
}

/// A hash paired with the frame at which its anchor peak occurs — the
/// transient, not-yet-attached-to-a-work output of the hasher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPosting {
    pub hash: Hash40,
    pub anchor_time: u32,
}

/// A catalogued work as stored in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Work {
    pub id: i64,
    pub title: String,
    pub kind: Kind,
    pub season: Option<u32>,
    pub episode_number: Option<u32>,
    pub source_path: String,
    pub posting_count: u64,
    pub created_at: DateTime<Utc>,
}

/// Result of a successful query-clip match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchResult {
    pub work_id: i64,
    pub title: String,
    pub kind: Kind,
    pub season: Option<u32>,
    pub episode_number: Option<u32>,
    pub confidence: u32,
    pub time_offset_seconds: f64,
    pub total_raw_matches: usize,
}

/// Aggregate counts over the catalogue, grouped by kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Statistics {
    pub total_works: u64,
    pub total_postings: u64,
    pub movies: u64,
    pub episodes: u64,
}

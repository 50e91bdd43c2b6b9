//! C4 (scoring half) — histogram-of-offsets alignment matching.

use std::collections::HashMap;

use crate::config::Config;
use crate::model::{Hash40, MatchResult, RawPosting};
use crate::store::{Index, StoreError};

/// Score a set of query postings against the catalogue and return the
/// best-aligned work, or `None` if nothing clears `min_confidence`.
///
/// 1. Build `query_hash -> anchor_time` (last anchor wins on a duplicate
///    hash within the query clip itself).
/// 2. For every query hash present in the catalogue, and every stored
///    posting under that hash, compute `delta = stored.anchor_time as i64
///    - query_anchor_time as i64`.
/// 3. Bucket `delta` to the nearest multiple of `cfg.alignment_bucket`
///    (round-half-to-even, matching the reference scorer's use of
///    Python's `round()`) and tally occurrences per `(work_id, bucket)`.
/// 4. For each work, the winning bucket is the one with the most tallies;
///    its count is that work's score.
/// 5. The work with the highest score wins; ties are broken by the lower
///    `work_id`.
/// 6. If the winning score is below `min_confidence`, return `None`.
/// 7. Convert the winning bucket (in frames) to seconds via
///    `cfg.frame_duration_secs()`.
pub fn match_query(
    index: &Index,
    postings: &[RawPosting],
    cfg: &Config,
    min_confidence: u32,
) -> Result<Option<MatchResult>, StoreError> {
    let mut query_hash_times: HashMap<String, u32> = HashMap::new();
    for p in postings {
        query_hash_times.insert(p.hash.0.clone(), p.anchor_time);
    }

    let mut bucket_counts: HashMap<(i64, i64), u32> = HashMap::new();
    let mut total_raw_matches = 0usize;

    for (hash, &query_time) in &query_hash_times {
        let stored = index.postings_for_hash(&Hash40(hash.clone()))?;
        for hit in stored {
            total_raw_matches += 1;
            let delta = hit.anchor_time as i64 - query_time as i64;
            let bucket = round_to_bucket(delta, cfg.alignment_bucket);
            *bucket_counts.entry((hit.work_id, bucket)).or_insert(0) += 1;
        }
    }

    // Best bucket per work.
    let mut best_per_work: HashMap<i64, (i64, u32)> = HashMap::new();
    for (&(work_id, bucket), &count) in &bucket_counts {
        let entry = best_per_work.entry(work_id).or_insert((bucket, count));
        if count > entry.1 {
            *entry = (bucket, count);
        }
    }

    let winner = best_per_work
        .iter()
        .max_by(|a, b| a.1 .1.cmp(&b.1 .1).then_with(|| b.0.cmp(a.0)))
        .map(|(&work_id, &(bucket, score))| (work_id, bucket, score));

    let Some((work_id, bucket, score)) = winner else {
        return Ok(None);
    };

    if score < min_confidence {
        return Ok(None);
    }

    let work = index.get_work(work_id)?;
    let offset_seconds = bucket as f64 * cfg.frame_duration_secs();

    Ok(Some(MatchResult {
        work_id,
        title: work.title,
        kind: work.kind,
        season: work.season,
        episode_number: work.episode_number,
        confidence: score,
        time_offset_seconds: offset_seconds,
        total_raw_matches,
    }))
}

/// Round `value / bucket` to the nearest integer, ties to even, then
/// scale back up. Matches Python's `round()` used by the reference
/// scorer, rather than the half-away-from-zero rounding `i64` division
/// would otherwise suggest.
fn round_to_bucket(value: i64, bucket: i64) -> i64 {
    let q = value as f64 / bucket as f64;
    let floor = q.floor();
    let diff = q - floor;
    let rounded = if diff < 0.5 {
        floor
    } else if diff > 0.5 {
        floor + 1.0
    } else if (floor as i64) % 2 == 0 {
        floor
    } else {
        floor + 1.0
    };
    (rounded as i64) * bucket
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Hash40, IngestMeta, Kind};

    fn posting(hash: &str, anchor_time: u32) -> RawPosting {
        RawPosting {
            hash: Hash40(hash.to_string()),
            anchor_time,
        }
    }

    fn meta(title: &str, source_path: &str) -> IngestMeta {
        IngestMeta {
            title: title.to_string(),
            kind: Kind::Movie,
            source_path: source_path.to_string(),
            season: None,
            episode_number: None,
        }
    }

    #[test]
    fn round_to_bucket_groups_nearby_offsets() {
        assert_eq!(round_to_bucket(0, 10), 0);
        assert_eq!(round_to_bucket(4, 10), 0);
        assert_eq!(round_to_bucket(6, 10), 10);
        assert_eq!(round_to_bucket(-6, 10), -10);
    }

    #[test]
    fn round_to_bucket_breaks_ties_to_even() {
        assert_eq!(round_to_bucket(5, 10), 0);
        assert_eq!(round_to_bucket(-5, 10), 0);
        assert_eq!(round_to_bucket(25, 10), 20);
        assert_eq!(round_to_bucket(15, 10), 20);
    }

    #[test]
    fn exact_match_scores_highly_and_offsets_near_zero() {
        let cfg = Config::default();
        let mut index = Index::open_in_memory(&cfg).unwrap();
        let catalogue_postings: Vec<RawPosting> = (0..20)
            .map(|i| posting(&format!("{:040x}", i), i))
            .collect();
        index
            .ingest(&meta("Movie A", "a.mp3"), &catalogue_postings)
            .unwrap();

        let result = match_query(&index, &catalogue_postings, &cfg, 5)
            .unwrap()
            .unwrap();
        assert_eq!(result.title, "Movie A");
        assert!(result.time_offset_seconds.abs() < 0.1);
        assert!(result.confidence >= 5);
    }

    #[test]
    fn no_overlap_returns_none() {
        let cfg = Config::default();
        let mut index = Index::open_in_memory(&cfg).unwrap();
        let catalogue_postings: Vec<RawPosting> =
            (0..20).map(|i| posting(&format!("{:040x}", i), i)).collect();
        index
            .ingest(&meta("Movie A", "a.mp3"), &catalogue_postings)
            .unwrap();

        let query: Vec<RawPosting> = (1000..1010)
            .map(|i| posting(&format!("{:040x}", i), i))
            .collect();
        let result = match_query(&index, &query, &cfg, 5).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn below_min_confidence_returns_none() {
        let cfg = Config::default();
        let mut index = Index::open_in_memory(&cfg).unwrap();
        let catalogue_postings: Vec<RawPosting> =
            (0..3).map(|i| posting(&format!("{:040x}", i), i)).collect();
        index
            .ingest(&meta("Movie A", "a.mp3"), &catalogue_postings)
            .unwrap();

        let result = match_query(&index, &catalogue_postings, &cfg, 100).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn sub_clip_offset_reflects_shift() {
        let cfg = Config::default();
        let mut index = Index::open_in_memory(&cfg).unwrap();
        let catalogue_postings: Vec<RawPosting> = (0..200)
            .map(|i| posting(&format!("{:040x}", i), i))
            .collect();
        index
            .ingest(&meta("Movie A", "a.mp3"), &catalogue_postings)
            .unwrap();

        // A sub-clip starting 50 frames into the work: its own anchor
        // times are re-zeroed, so stored deltas should cluster around 50.
        let query: Vec<RawPosting> = (50..90)
            .map(|i| posting(&format!("{:040x}", i), i - 50))
            .collect();
        let result = match_query(&index, &query, &cfg, 5).unwrap().unwrap();
        let expected_offset = 50.0 * cfg.frame_duration_secs();
        assert!((result.time_offset_seconds - expected_offset).abs() < cfg.frame_duration_secs() * 2.0);
    }
}

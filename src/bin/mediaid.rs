//! Simple CLI for exercising the soundmark fingerprinting engine.

use std::env;
use std::path::PathBuf;
use std::process;

use soundmark::{Config, Engine, IngestMeta, Kind};

fn db_path() -> PathBuf {
    env::var("MEDIAID_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("catalogue.db"))
}

fn usage() -> ! {
    eprintln!("Usage: mediaid <command> [args]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  ingest <path> --title <title> [--kind movie|episode] [--season N] [--episode N]");
    eprintln!("  match <path> [--min-confidence N]");
    eprintln!("  stats");
    eprintln!("  inspect <path>");
    process::exit(1);
}

fn take_flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage();
    }

    let cfg = Config::default();

    match args[1].as_str() {
        "ingest" => {
            if args.len() < 3 {
                eprintln!("Usage: mediaid ingest <path> --title <title> [--kind movie|episode] [--season N] [--episode N]");
                process::exit(1);
            }
            let path = PathBuf::from(&args[2]);
            let title = take_flag_value(&args, "--title").unwrap_or_else(|| {
                eprintln!("--title is required");
                process::exit(1);
            });
            let kind = take_flag_value(&args, "--kind")
                .map(|k| k.parse::<Kind>().unwrap_or(Kind::Movie))
                .unwrap_or(Kind::Movie);
            let season = take_flag_value(&args, "--season").and_then(|s| s.parse().ok());
            let episode_number = take_flag_value(&args, "--episode").and_then(|s| s.parse().ok());

            let mut engine = match Engine::open(db_path(), cfg) {
                Ok(e) => e,
                Err(e) => {
                    eprintln!("Failed to open catalogue: {e}");
                    process::exit(1);
                }
            };

            let meta = IngestMeta {
                title: title.clone(),
                kind,
                source_path: path.to_string_lossy().to_string(),
                season,
                episode_number,
            };

            match engine.ingest(meta, &path) {
                Ok(work_id) => println!("Ingested \"{title}\" as work {work_id}"),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            }
        }
        "match" => {
            if args.len() < 3 {
                eprintln!("Usage: mediaid match <path> [--min-confidence N]");
                process::exit(1);
            }
            let path = PathBuf::from(&args[2]);
            let min_confidence = take_flag_value(&args, "--min-confidence")
                .and_then(|s| s.parse().ok())
                .unwrap_or(cfg.min_confidence);

            let engine = match Engine::open(db_path(), cfg) {
                Ok(e) => e,
                Err(e) => {
                    eprintln!("Failed to open catalogue: {e}");
                    process::exit(1);
                }
            };

            match engine.match_audio(&path, min_confidence) {
                Ok(Some(result)) => {
                    println!("Matched: {}", result.title);
                    println!("  Kind: {}", result.kind);
                    if let (Some(season), Some(episode)) = (result.season, result.episode_number) {
                        println!("  Season {season}, Episode {episode}");
                    }
                    println!("  Confidence: {}", result.confidence);
                    println!("  Offset: {:.2}s", result.time_offset_seconds);
                    println!("  Raw matches: {}", result.total_raw_matches);
                }
                Ok(None) => println!("No match found."),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            }
        }
        "stats" => {
            let engine = match Engine::open(db_path(), cfg) {
                Ok(e) => e,
                Err(e) => {
                    eprintln!("Failed to open catalogue: {e}");
                    process::exit(1);
                }
            };
            match engine.statistics() {
                Ok(stats) => {
                    println!("Catalogue statistics:");
                    println!("  Total works: {}", stats.total_works);
                    println!("  Movies: {}", stats.movies);
                    println!("  Episodes: {}", stats.episodes);
                    println!("  Total postings: {}", stats.total_postings);
                }
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            }
        }
        "inspect" => {
            if args.len() < 3 {
                eprintln!("Usage: mediaid inspect <path>");
                process::exit(1);
            }
            match soundmark::inspect(&args[2], &cfg) {
                Ok(info) => {
                    println!("Sample rate: {} Hz", info.sample_rate);
                    println!("Duration: {:.2}s", info.duration_secs);
                    println!("Samples: {}", info.num_samples);
                }
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            }
        }
        _ => usage(),
    }
}

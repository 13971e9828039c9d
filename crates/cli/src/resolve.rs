//! `paddock resolve`: ad-hoc lookup of one label against a reference CSV.

use std::path::PathBuf;

use paddock_resolve::{best_match, split_label, CandidatePool, Resolver, Scored, Scorer, DEFAULT_SEPARATORS};
use paddock_stage::config::DEFAULT_NULL_TOKEN;
use paddock_stage::Table;
use serde::Serialize;

use crate::exit_codes::{EXIT_IO, EXIT_NO_MATCH, EXIT_USAGE};
use crate::CliError;

pub struct ResolveArgs {
    pub label: String,
    pub pool: PathBuf,
    pub key: String,
    pub label_column: String,
    pub threshold: f64,
    pub scorer: Scorer,
    pub split: bool,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct MatchOutput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    part: Option<String>,
    key: &'a str,
    label: &'a str,
    score: f64,
    ties: usize,
}

#[derive(Debug, Serialize)]
struct ResolveOutput<'a> {
    label: &'a str,
    threshold: f64,
    scorer: String,
    matches: Vec<MatchOutput<'a>>,
}

pub fn cmd_resolve(args: ResolveArgs) -> Result<(), CliError> {
    let resolver = Resolver::checked(args.threshold, args.scorer)
        .map_err(|e| CliError::new(EXIT_USAGE, e.to_string()))?;
    let pool = read_pool(&args)?;
    if let Err(e) = pool.check_integrity() {
        log::warn!("{}: {e}", args.pool.display());
    }

    let matches: Vec<MatchOutput> = if args.split {
        resolver
            .split_and_resolve(&args.label, &pool, DEFAULT_SEPARATORS)
            .into_iter()
            .map(|m| MatchOutput {
                part: Some(m.part),
                key: m.matched.key,
                label: m.matched.label,
                score: m.matched.score,
                ties: m.matched.ties,
            })
            .collect()
    } else {
        resolver
            .resolve_scored(&args.label, &pool)
            .map(|m| MatchOutput {
                part: None,
                key: m.key,
                label: m.label,
                score: m.score,
                ties: m.ties,
            })
            .into_iter()
            .collect()
    };

    if args.json {
        let output = ResolveOutput {
            label: &args.label,
            threshold: args.threshold,
            scorer: args.scorer.to_string(),
            matches,
        };
        let json_str = serde_json::to_string_pretty(&output)
            .map_err(|e| CliError::new(EXIT_IO, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
        return no_match_unless(!output.matches.is_empty(), &args, &pool);
    }

    for m in &matches {
        match m.part {
            Some(ref part) => println!("{part}\t{}\t{}\t{:.1}", m.key, m.label, m.score),
            None => println!("{}\t{}\t{:.1}", m.key, m.label, m.score),
        }
        if m.ties > 0 {
            eprintln!("note: {} other candidates scored {:.1}; kept the first", m.ties, m.score);
        }
    }
    no_match_unless(!matches.is_empty(), &args, &pool)
}

fn no_match_unless(matched: bool, args: &ResolveArgs, pool: &CandidatePool<String>) -> Result<(), CliError> {
    if matched {
        return Ok(());
    }
    let err = CliError::new(
        EXIT_NO_MATCH,
        format!("no match for \"{}\" at threshold {}", args.label, args.threshold),
    );
    if !args.split {
        return match best_match(&args.label, pool, args.scorer) {
            Some(best) => Err(err.with_hint(closest_hint(&best))),
            None => Err(err),
        };
    }

    // hint from the part that came closest, since parts resolve independently
    let parts = split_label(&args.label, DEFAULT_SEPARATORS);
    let closest = parts
        .iter()
        .filter_map(|part| best_match(part, pool, args.scorer).map(|best| (part, best)))
        .fold(None, |acc: Option<(&String, Scored<'_, String>)>, (part, best)| match acc {
            Some(current) if best.score <= current.1.score => Some(current),
            _ => Some((part, best)),
        });
    match closest {
        Some((part, best)) => Err(err.with_hint(format!("{} for part \"{part}\"", closest_hint(&best)))),
        None => Err(err),
    }
}

fn closest_hint(best: &Scored<'_, String>) -> String {
    format!("closest candidate \"{}\" ({}) scored {:.1}", best.label, best.key, best.score)
}

fn read_pool(args: &ResolveArgs) -> Result<CandidatePool<String>, CliError> {
    let table = Table::read(&args.pool, DEFAULT_NULL_TOKEN)
        .map_err(|e| CliError::new(EXIT_IO, e.to_string()))?;
    let key = table
        .require(&args.key)
        .map_err(|e| CliError::new(EXIT_USAGE, e.to_string()))?;
    let label = table
        .require(&args.label_column)
        .map_err(|e| CliError::new(EXIT_USAGE, e.to_string()))?;

    let mut pool = CandidatePool::new();
    for row in 0..table.len() {
        if let (Some(k), Some(l)) = (table.value(row, key), table.value(row, label)) {
            pool.push(k.to_string(), l);
        }
    }
    log::info!("{}: {} candidates", args.pool.display(), pool.len());
    Ok(pool)
}

//! Fuzzy link passes.
//!
//! `attach` appends the best-matching reference key to every source row
//! (race -> meeting). `junction` splits multi-value labels and emits one
//! (source key, reference key) row per matched part (driver -> country).

use std::collections::HashSet;

use paddock_resolve::{CandidatePool, Resolver, ScopedPools, Scorer, DEFAULT_SEPARATORS};
use serde::{Deserialize, Serialize};

use crate::coerce::to_integer;
use crate::error::StageError;
use crate::table::{Cell, Table};

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

/// Which columns of a table take part in a link.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkSide {
    /// Staged output name or raw input file name.
    pub table: String,
    pub key: String,
    pub label: String,
    /// Exact-match column that narrows the candidate pool (e.g. `year`).
    /// Must be set on both sides or neither.
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttachSpec {
    pub source: LinkSide,
    pub reference: LinkSide,
    /// Name of the appended column holding the matched reference key.
    pub column: String,
    #[serde(default = "default_attach_threshold")]
    pub threshold: f64,
    #[serde(default)]
    pub scorer: Scorer,
    /// Where to stage the result; defaults to replacing the source table.
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JunctionSpec {
    pub source: LinkSide,
    pub reference: LinkSide,
    pub output: String,
    /// Header of the two-column output: source key, reference key.
    ///
    /// The second column holds whatever `reference.key` names. To emit the
    /// matched label instead of a key, point `reference.key` at the label
    /// column (e.g. `key = "nationality", label = "nationality"`).
    pub columns: Vec<String>,
    #[serde(default = "default_junction_threshold")]
    pub threshold: f64,
    #[serde(default)]
    pub scorer: Scorer,
    #[serde(default = "default_separators")]
    pub separators: Vec<char>,
}

fn default_attach_threshold() -> f64 {
    85.0
}

fn default_junction_threshold() -> f64 {
    70.0
}

fn default_separators() -> Vec<char> {
    DEFAULT_SEPARATORS.to_vec()
}

impl AttachSpec {
    pub fn output_name(&self) -> &str {
        self.output.as_deref().unwrap_or(&self.source.table)
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    Attach,
    Junction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkStats {
    pub kind: LinkKind,
    pub source: String,
    pub reference: String,
    pub output: String,
    pub threshold: f64,
    pub scorer: Scorer,
    /// Source rows examined.
    pub rows: usize,
    /// Source rows with at least one match.
    pub matched: usize,
    pub unmatched: usize,
    /// Matches decided by the first-in-pool tie-break.
    pub tied: usize,
    /// Rows written to the output (junction only counts emitted pairs).
    pub emitted: usize,
}

// ---------------------------------------------------------------------------
// Reference index
// ---------------------------------------------------------------------------

/// Reference pool, flat or partitioned by scope value.
enum ReferenceIndex {
    Flat(CandidatePool<String>),
    Scoped(ScopedPools<String, String>),
}

impl ReferenceIndex {
    fn build(table: &Table, side: &LinkSide, scoped: bool) -> Result<Self, StageError> {
        let key_idx = table.require(&side.key)?;
        let label_idx = table.require(&side.label)?;
        let scope_idx = match (&side.scope, scoped) {
            (Some(col), true) => Some(table.require(col)?),
            _ => None,
        };

        let mut skipped = 0usize;
        let mut index = match scope_idx {
            Some(_) => Self::Scoped(ScopedPools::new()),
            None => Self::Flat(CandidatePool::new()),
        };

        for row in 0..table.len() {
            let (Some(key), Some(label)) = (table.value(row, key_idx), table.value(row, label_idx)) else {
                skipped += 1;
                continue;
            };
            match &mut index {
                Self::Scoped(pools) => match scope_idx.and_then(|si| table.value(row, si)) {
                    Some(scope) => pools.push(scope_value(scope), key.to_string(), label),
                    None => skipped += 1,
                },
                Self::Flat(pool) => pool.push(key.to_string(), label),
            }
        }

        if skipped > 0 {
            log::warn!("{}: skipped {skipped} reference row(s) with a null key, label, or scope", table.name);
        }

        let pool_err = |source| StageError::Pool { table: table.name.clone(), source };
        match &index {
            Self::Flat(pool) => pool.check_integrity().map_err(pool_err)?,
            Self::Scoped(pools) => {
                for (_, pool) in pools.iter() {
                    pool.check_integrity().map_err(pool_err)?;
                }
                log::debug!("{}: {} scopes", table.name, pools.scope_count());
            }
        }

        Ok(index)
    }

    fn pool_for(&self, scope: Option<&str>) -> Option<&CandidatePool<String>> {
        match self {
            Self::Flat(pool) => Some(pool),
            Self::Scoped(pools) => scope.map(|s| pools.get(&scope_value(s))),
        }
    }
}

/// Canonical scope value: "2023" and "2023.0" land in the same partition.
fn scope_value(raw: &str) -> String {
    to_integer(raw).unwrap_or_else(|| raw.trim().to_string())
}

fn is_scoped(spec_source: &LinkSide, spec_reference: &LinkSide) -> bool {
    spec_source.scope.is_some() && spec_reference.scope.is_some()
}

// ---------------------------------------------------------------------------
// Attach
// ---------------------------------------------------------------------------

/// Append `spec.column` to `source`, holding each row's matched reference key
/// (null when nothing clears the threshold).
pub fn attach(source: &Table, reference: &Table, spec: &AttachSpec) -> Result<(Table, LinkStats), StageError> {
    let scoped = is_scoped(&spec.source, &spec.reference);
    let index = ReferenceIndex::build(reference, &spec.reference, scoped)?;
    let resolver = Resolver::new(spec.threshold).with_scorer(spec.scorer);

    let key_idx = source.require(&spec.source.key)?;
    let label_idx = source.require(&spec.source.label)?;
    let scope_idx = match &spec.source.scope {
        Some(col) if scoped => Some(source.require(col)?),
        _ => None,
    };

    let mut stats = LinkStats {
        kind: LinkKind::Attach,
        source: spec.source.table.clone(),
        reference: spec.reference.table.clone(),
        output: spec.output_name().to_string(),
        threshold: spec.threshold,
        scorer: spec.scorer,
        rows: source.len(),
        matched: 0,
        unmatched: 0,
        tied: 0,
        emitted: 0,
    };

    let mut values: Vec<Cell> = Vec::with_capacity(source.len());
    for row in 0..source.len() {
        let scope = scope_idx.and_then(|si| source.value(row, si));
        let pool = index.pool_for(scope);
        let label = source.value(row, label_idx);

        let best = match (pool, label) {
            (Some(pool), Some(label)) => resolver.resolve_scored(label, pool),
            _ => None,
        };

        match best {
            Some(best) => {
                let source_key = source.value(row, key_idx).unwrap_or("?");
                log::debug!(
                    "{}: {source_key} '{}' -> {} '{}' ({:.1})",
                    source.name,
                    label.unwrap_or_default(),
                    best.key,
                    best.label,
                    best.score,
                );
                if best.ties > 0 {
                    stats.tied += 1;
                    log::warn!(
                        "{}: {source_key} matched {} by pool order; {} other candidate(s) scored {:.1}",
                        source.name,
                        best.key,
                        best.ties,
                        best.score,
                    );
                }
                stats.matched += 1;
                values.push(Some(best.key.clone()));
            }
            None => {
                stats.unmatched += 1;
                values.push(None);
            }
        }
    }

    let mut out = source.clone();
    out.name = stats.output.clone();
    out.push_column(&spec.column, values)?;
    stats.emitted = out.len();

    log::info!(
        "attach {} -> {}: {} matched, {} unmatched",
        stats.source,
        stats.reference,
        stats.matched,
        stats.unmatched,
    );
    Ok((out, stats))
}

// ---------------------------------------------------------------------------
// Junction
// ---------------------------------------------------------------------------

/// Build a two-column table of (source key, reference key), one row per
/// matched part of each source label. Repeated pairs are written once.
pub fn junction(source: &Table, reference: &Table, spec: &JunctionSpec) -> Result<(Table, LinkStats), StageError> {
    let scoped = is_scoped(&spec.source, &spec.reference);
    let index = ReferenceIndex::build(reference, &spec.reference, scoped)?;
    let resolver = Resolver::new(spec.threshold).with_scorer(spec.scorer);

    let key_idx = source.require(&spec.source.key)?;
    let label_idx = source.require(&spec.source.label)?;
    let scope_idx = match &spec.source.scope {
        Some(col) if scoped => Some(source.require(col)?),
        _ => None,
    };

    let mut stats = LinkStats {
        kind: LinkKind::Junction,
        source: spec.source.table.clone(),
        reference: spec.reference.table.clone(),
        output: spec.output.clone(),
        threshold: spec.threshold,
        scorer: spec.scorer,
        rows: source.len(),
        matched: 0,
        unmatched: 0,
        tied: 0,
        emitted: 0,
    };

    let mut out = Table::new(spec.output.clone(), spec.columns.clone());
    let mut seen: HashSet<(String, String)> = HashSet::new();

    for row in 0..source.len() {
        let (Some(source_key), Some(raw)) = (source.value(row, key_idx), source.value(row, label_idx)) else {
            stats.unmatched += 1;
            continue;
        };
        let scope = scope_idx.and_then(|si| source.value(row, si));
        let Some(pool) = index.pool_for(scope) else {
            stats.unmatched += 1;
            continue;
        };

        let parts = resolver.split_and_resolve(raw, pool, &spec.separators);
        if parts.is_empty() {
            log::debug!("{}: {source_key} '{raw}' has no match", source.name);
            stats.unmatched += 1;
            continue;
        }
        stats.matched += 1;

        for part in parts {
            if part.matched.ties > 0 {
                stats.tied += 1;
                log::warn!(
                    "{}: {source_key} part '{}' matched {} by pool order; {} other candidate(s) scored {:.1}",
                    source.name,
                    part.part,
                    part.matched.key,
                    part.matched.ties,
                    part.matched.score,
                );
            }
            let pair = (source_key.to_string(), part.matched.key.clone());
            if seen.insert(pair.clone()) {
                out.rows.push(vec![Some(pair.0), Some(pair.1)]);
            }
        }
    }

    stats.emitted = out.len();
    log::info!(
        "junction {} -> {}: {} pair(s) from {} matched row(s), {} unmatched",
        stats.source,
        stats.reference,
        stats.emitted,
        stats.matched,
        stats.unmatched,
    );
    Ok((out, stats))
}

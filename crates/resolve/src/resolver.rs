use serde::Serialize;

use crate::error::ResolveError;
use crate::normalize::{split_label, DEFAULT_SEPARATORS};
use crate::pool::CandidatePool;
use crate::score::{Scorer, Tokens};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Highest scoring candidate for a label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scored<'p, K> {
    pub key: &'p K,
    pub label: &'p str,
    pub score: f64,
    /// Other candidates that reached the same score. The winner is the
    /// first of them in pool order.
    pub ties: usize,
}

/// One matched part of a multi-value label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartMatch<'p, K> {
    pub part: String,
    pub matched: Scored<'p, K>,
}

// ---------------------------------------------------------------------------
// Argmax
// ---------------------------------------------------------------------------

/// Best candidate for `label` regardless of threshold.
///
/// Absent when the label has no tokens or the pool is empty. Candidates that
/// tie on score never displace an earlier one.
pub fn best_match<'p, K>(label: &str, pool: &'p CandidatePool<K>, scorer: Scorer) -> Option<Scored<'p, K>> {
    let query = Tokens::from_raw(label);
    if query.is_empty() {
        return None;
    }

    pool.iter().fold(None, |best: Option<Scored<'p, K>>, candidate| {
        let score = scorer.score(&query, &candidate.tokens);
        match best {
            Some(mut current) if score <= current.score => {
                if score == current.score {
                    current.ties += 1;
                }
                Some(current)
            }
            _ => Some(Scored {
                key: &candidate.key,
                label: &candidate.label,
                score,
                ties: 0,
            }),
        }
    })
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Threshold and scorer for one call site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolver {
    pub threshold: f64,
    pub scorer: Scorer,
}

impl Resolver {
    pub fn new(threshold: f64) -> Self {
        Self { threshold, scorer: Scorer::default() }
    }

    /// Like [`Resolver::new`] but rejects thresholds outside 0..=100.
    pub fn checked(threshold: f64, scorer: Scorer) -> Result<Self, ResolveError> {
        if !(0.0..=100.0).contains(&threshold) {
            return Err(ResolveError::InvalidThreshold(threshold));
        }
        Ok(Self { threshold, scorer })
    }

    pub fn with_scorer(mut self, scorer: Scorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn resolve_scored<'p, K>(&self, label: &str, pool: &'p CandidatePool<K>) -> Option<Scored<'p, K>> {
        best_match(label, pool, self.scorer).filter(|best| best.score >= self.threshold)
    }

    pub fn resolve<'p, K>(&self, label: &str, pool: &'p CandidatePool<K>) -> Option<&'p K> {
        self.resolve_scored(label, pool).map(|best| best.key)
    }

    /// Resolve every part of a multi-value label independently.
    ///
    /// Parts below the threshold are dropped; the result may be empty.
    pub fn split_and_resolve<'p, K>(
        &self,
        raw: &str,
        pool: &'p CandidatePool<K>,
        separators: &[char],
    ) -> Vec<PartMatch<'p, K>> {
        split_label(raw, separators)
            .into_iter()
            .filter_map(|part| {
                self.resolve_scored(&part, pool)
                    .map(|matched| PartMatch { part, matched })
            })
            .collect()
    }
}

/// Key of the best candidate scoring at least `threshold`, using the
/// default token-sort scorer.
pub fn resolve<'p, K>(label: &str, pool: &'p CandidatePool<K>, threshold: f64) -> Option<&'p K> {
    Resolver::new(threshold).resolve(label, pool)
}

/// Split `raw` on `/` and `-` and resolve each part against `pool`.
pub fn split_and_resolve<'p, K>(raw: &str, pool: &'p CandidatePool<K>, threshold: f64) -> Vec<PartMatch<'p, K>> {
    Resolver::new(threshold).split_and_resolve(raw, pool, DEFAULT_SEPARATORS)
}

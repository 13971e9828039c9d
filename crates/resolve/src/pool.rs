use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

use crate::error::ResolveError;
use crate::normalize::normalize_label;
use crate::score::Tokens;

// ---------------------------------------------------------------------------
// Candidate
// ---------------------------------------------------------------------------

/// A reference record prepared for scoring.
#[derive(Debug, Clone)]
pub struct Candidate<K> {
    pub key: K,
    /// Normalized label (lower-case, trimmed, single-spaced).
    pub label: String,
    pub tokens: Tokens,
}

impl<K> Candidate<K> {
    pub fn new(key: K, raw_label: &str) -> Self {
        let label = normalize_label(raw_label);
        let tokens = Tokens::from_normalized(&label);
        Self { key, label, tokens }
    }
}

// ---------------------------------------------------------------------------
// Pool
// ---------------------------------------------------------------------------

/// Ordered set of reference records a label is resolved against.
///
/// Iteration order is insertion order. Ties between equally scored candidates
/// go to the earliest one, so the order records are pushed in is part of the
/// result.
#[derive(Debug, Clone)]
pub struct CandidatePool<K> {
    candidates: Vec<Candidate<K>>,
}

impl<K> Default for CandidatePool<K> {
    fn default() -> Self {
        Self { candidates: Vec::new() }
    }
}

impl<K> CandidatePool<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: K, raw_label: &str) {
        self.candidates.push(Candidate::new(key, raw_label));
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candidate<K>> {
        self.candidates.iter()
    }
}

impl<K: Eq + Hash + Display> CandidatePool<K> {
    /// Reject pools that carry one key under two different labels.
    ///
    /// The resolver itself never calls this; loaders that build pools from
    /// files run it once before the first lookup.
    pub fn check_integrity(&self) -> Result<(), ResolveError> {
        let mut seen: HashMap<&K, &str> = HashMap::with_capacity(self.candidates.len());
        for c in &self.candidates {
            match seen.get(&c.key) {
                Some(first) if *first != c.label => {
                    return Err(ResolveError::ConflictingKey {
                        key: c.key.to_string(),
                        first: first.to_string(),
                        second: c.label.clone(),
                    });
                }
                Some(_) => {}
                None => {
                    seen.insert(&c.key, &c.label);
                }
            }
        }
        Ok(())
    }
}

impl<'a, K> IntoIterator for &'a CandidatePool<K> {
    type Item = &'a Candidate<K>;
    type IntoIter = std::slice::Iter<'a, Candidate<K>>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.iter()
    }
}

impl<K, L: AsRef<str>> FromIterator<(K, L)> for CandidatePool<K> {
    fn from_iter<I: IntoIterator<Item = (K, L)>>(iter: I) -> Self {
        let candidates = iter
            .into_iter()
            .map(|(key, label)| Candidate::new(key, label.as_ref()))
            .collect();
        Self { candidates }
    }
}

// ---------------------------------------------------------------------------
// Scoped pools
// ---------------------------------------------------------------------------

/// Reference records partitioned by an exact-match scoping key (e.g. year).
///
/// Each partition keeps the relative order of its records.
#[derive(Debug, Clone)]
pub struct ScopedPools<S, K> {
    pools: HashMap<S, CandidatePool<K>>,
    empty: CandidatePool<K>,
}

impl<S: Eq + Hash, K> ScopedPools<S, K> {
    pub fn new() -> Self {
        Self { pools: HashMap::new(), empty: CandidatePool::new() }
    }

    pub fn push(&mut self, scope: S, key: K, raw_label: &str) {
        self.pools.entry(scope).or_default().push(key, raw_label);
    }

    /// Pool for `scope`; empty when no reference shares the scope.
    pub fn get(&self, scope: &S) -> &CandidatePool<K> {
        self.pools.get(scope).unwrap_or(&self.empty)
    }

    pub fn scope_count(&self) -> usize {
        self.pools.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&S, &CandidatePool<K>)> {
        self.pools.iter()
    }
}

impl<S: Eq + Hash, K> Default for ScopedPools<S, K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Eq + Hash, K, L: AsRef<str>> FromIterator<(S, K, L)> for ScopedPools<S, K> {
    fn from_iter<I: IntoIterator<Item = (S, K, L)>>(iter: I) -> Self {
        let mut scoped = Self::new();
        for (scope, key, label) in iter {
            scoped.push(scope, key, label.as_ref());
        }
        scoped
    }
}

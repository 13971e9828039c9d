// Token-order-invariant similarity scores in the range [0, 100].

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strsim::normalized_levenshtein;

use crate::normalize::{normalize_label, tokenize};

/// Pre-tokenized form of a normalized label.
///
/// Built once per pool label at load time so scoring a candidate never
/// re-normalizes or re-sorts it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tokens {
    sorted: Vec<String>,
    joined: String,
}

impl Tokens {
    pub fn from_normalized(normalized: &str) -> Self {
        let mut sorted: Vec<String> = tokenize(normalized).into_iter().map(String::from).collect();
        sorted.sort();
        let joined = sorted.join(" ");
        Self { sorted, joined }
    }

    pub fn from_raw(raw: &str) -> Self {
        Self::from_normalized(&normalize_label(raw))
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// Tokens in sorted order, joined by single spaces.
    pub fn joined(&self) -> &str {
        &self.joined
    }

    fn set(&self) -> BTreeSet<&str> {
        self.sorted.iter().map(String::as_str).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scorer {
    /// Edit similarity of the sorted token sequences.
    #[default]
    TokenSort,
    /// Best edit similarity among the shared tokens and each side's
    /// shared-plus-remaining tokens. Scores 100 when one token set contains
    /// the other.
    TokenSet,
}

impl Scorer {
    pub fn score(&self, a: &Tokens, b: &Tokens) -> f64 {
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        match self {
            Self::TokenSort => ratio(a.joined(), b.joined()),
            Self::TokenSet => token_set_ratio(a, b),
        }
    }

    /// Score two raw labels, normalizing both first.
    pub fn score_labels(&self, a: &str, b: &str) -> f64 {
        self.score(&Tokens::from_raw(a), &Tokens::from_raw(b))
    }
}

impl fmt::Display for Scorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TokenSort => write!(f, "token_sort"),
            Self::TokenSet => write!(f, "token_set"),
        }
    }
}

impl FromStr for Scorer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "token_sort" => Ok(Self::TokenSort),
            "token_set" => Ok(Self::TokenSet),
            other => Err(format!("unknown scorer \"{other}\" (expected token_sort or token_set)")),
        }
    }
}

fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    normalized_levenshtein(a, b) * 100.0
}

fn join_parts(head: &str, tail: &str) -> String {
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => head.to_string(),
        _ => format!("{head} {tail}"),
    }
}

fn token_set_ratio(a: &Tokens, b: &Tokens) -> f64 {
    let set_a = a.set();
    let set_b = b.set();

    let sect = set_a.intersection(&set_b).copied().collect::<Vec<_>>().join(" ");
    let only_a = set_a.difference(&set_b).copied().collect::<Vec<_>>().join(" ");
    let only_b = set_b.difference(&set_a).copied().collect::<Vec<_>>().join(" ");

    if !sect.is_empty() && (only_a.is_empty() || only_b.is_empty()) {
        return 100.0;
    }

    let combined_a = join_parts(&sect, &only_a);
    let combined_b = join_parts(&sect, &only_b);

    let mut best = ratio(&combined_a, &combined_b);
    if !sect.is_empty() {
        best = best.max(ratio(&sect, &combined_a)).max(ratio(&sect, &combined_b));
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_labels_score_100() {
        assert_eq!(Scorer::TokenSort.score_labels("Bahrain Grand Prix", "bahrain grand prix"), 100.0);
        assert_eq!(Scorer::TokenSet.score_labels("Bahrain Grand Prix", "bahrain grand prix"), 100.0);
    }

    #[test]
    fn token_order_does_not_matter() {
        let s = Scorer::TokenSort.score_labels("Grand Prix Abu Dhabi", "abu dhabi grand prix");
        assert_eq!(s, 100.0);
    }

    #[test]
    fn token_content_matters() {
        let s = Scorer::TokenSort.score_labels("monaco grand prix", "italian grand prix");
        assert!(s < 85.0, "score was {s}");
        assert!(s > 0.0);
    }

    #[test]
    fn punctuation_is_ignored() {
        let s = Scorer::TokenSort.score_labels("Grand Prix of St. Petersburg", "st petersburg grand prix of");
        assert_eq!(s, 100.0);
    }

    #[test]
    fn empty_side_scores_zero() {
        assert_eq!(Scorer::TokenSort.score_labels("", "anything"), 0.0);
        assert_eq!(Scorer::TokenSort.score_labels("  ", "  "), 0.0);
        assert_eq!(Scorer::TokenSet.score_labels("anything", ""), 0.0);
    }

    #[test]
    fn token_set_subset_scores_100() {
        let s = Scorer::TokenSet.score_labels("british", "british national");
        assert_eq!(s, 100.0);
        let sort = Scorer::TokenSort.score_labels("british", "british national");
        assert!(sort < 100.0);
    }

    #[test]
    fn token_set_disjoint_uses_full_strings() {
        let s = Scorer::TokenSet.score_labels("italian", "monegasque");
        assert!(s < 50.0, "score was {s}");
    }

    #[test]
    fn scores_stay_in_range() {
        for (a, b) in [("a", "b"), ("abc", "abd"), ("x y z", "z y x"), ("long label here", "l")] {
            for scorer in [Scorer::TokenSort, Scorer::TokenSet] {
                let s = scorer.score_labels(a, b);
                assert!((0.0..=100.0).contains(&s), "{scorer} {a:?} {b:?} -> {s}");
            }
        }
    }

    #[test]
    fn scorer_parses_both_spellings() {
        assert_eq!("token-sort".parse::<Scorer>().unwrap(), Scorer::TokenSort);
        assert_eq!("TOKEN_SET".parse::<Scorer>().unwrap(), Scorer::TokenSet);
        assert!("ratio".parse::<Scorer>().is_err());
    }
}

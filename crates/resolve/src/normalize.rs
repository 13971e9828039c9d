// Label normalization shared by both sides of a comparison.

/// Separators that join several values inside one label ("British/American",
/// "Anglo-Irish").
pub const DEFAULT_SEPARATORS: &[char] = &['/', '-'];

/// Lower-case, trim, and collapse internal whitespace runs to one space.
pub fn normalize_label(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a normalized label into scoring tokens.
///
/// Any non-alphanumeric character separates tokens, so "São Paulo" and
/// "sao-paulo"-style punctuation differences do not leak into the score.
pub fn tokenize(normalized: &str) -> Vec<&str> {
    normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Split a raw multi-value label on `separators`, normalizing each part and
/// discarding parts that are empty after normalization.
pub fn split_label(raw: &str, separators: &[char]) -> Vec<String> {
    raw.split(|c: char| separators.contains(&c))
        .map(normalize_label)
        .filter(|part| !part.is_empty())
        .collect()
}

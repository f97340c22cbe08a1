use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

static WORD_RE: OnceLock<Regex> = OnceLock::new();

fn word_pattern() -> &'static Regex {
    WORD_RE.get_or_init(|| Regex::new(r"\w+").expect("valid word regex"))
}

/// Lowercased set of Unicode word tokens.
pub fn tokenize(text: &str) -> HashSet<String> {
    let lowered = text.to_lowercase();
    word_pattern()
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// |a ∩ b| / |a ∪ b|, or 0.0 when either set is empty.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f32 / union as f32
}

/// Fraction of `target` tokens that also appear in `source`.
pub fn coverage(source: &HashSet<String>, target: &HashSet<String>) -> f32 {
    if target.is_empty() {
        return 0.0;
    }
    source.intersection(target).count() as f32 / target.len() as f32
}

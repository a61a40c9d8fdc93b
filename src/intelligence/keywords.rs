/// Keyword extraction and set similarity
///
/// Shared by the miner, the matcher and the ranker so every component agrees on
/// what a "keyword" is.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9][a-z0-9_\-]*").expect("valid regex"));

const STOP_WORDS: &[&str] = &[
    "the", "and", "but", "for", "with", "this", "that", "these", "those", "were", "will",
    "would", "could", "should", "from", "into", "then", "than", "have", "some", "also",
];

/// Lowercased words longer than three characters that aren't stop words,
/// deduplicated in first-seen order.
pub fn extract(content: &str) -> Vec<String> {
    let lowered = content.to_lowercase();
    let mut seen = HashSet::new();

    WORD.find_iter(&lowered)
        .map(|m| m.as_str().trim_matches('-'))
        .filter(|word| word.chars().count() > 3 && !STOP_WORDS.contains(word))
        .filter(|word| seen.insert(word.to_string()))
        .map(str::to_string)
        .collect()
}

/// Merge `incoming` into `into`, keeping order and skipping duplicates
pub fn merge(into: &mut Vec<String>, incoming: &[String]) {
    for keyword in incoming {
        if !into.contains(keyword) {
            into.push(keyword.clone());
        }
    }
}

/// Jaccard similarity of two keyword sets. Nothing to compare on either side is
/// neutral (0.5), not a mismatch.
pub fn jaccard<A, B>(a: &[A], b: &[B]) -> f64
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let left: HashSet<&str> = a.iter().map(AsRef::as_ref).collect();
    let right: HashSet<&str> = b.iter().map(AsRef::as_ref).collect();

    if left.is_empty() || right.is_empty() {
        return 0.5;
    }

    let intersection = left.intersection(&right).count();
    let union = left.union(&right).count();

    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_filters_short_and_stop_words() {
        let words = extract("Fix the login crash in the OAuth flow, then fix login again");
        assert_eq!(words, vec!["login", "crash", "oauth", "flow", "again"]);
    }

    #[test]
    fn test_extract_keeps_hyphenated_terms() {
        let words = extract("rate-limit the api-gateway");
        assert_eq!(words, vec!["rate-limit", "api-gateway"]);
    }

    #[test]
    fn test_jaccard() {
        let a = vec!["login", "crash", "oauth"];
        let b = vec!["login", "oauth", "token", "refresh"];
        assert!((jaccard(&a, &b) - 2.0 / 5.0).abs() < 1e-9);
        assert_eq!(jaccard(&a, &a), 1.0);
    }

    #[test]
    fn test_jaccard_empty_side_is_neutral() {
        let empty: Vec<String> = Vec::new();
        assert_eq!(jaccard(&empty, &["login"]), 0.5);
        assert_eq!(jaccard(&["login"], &empty), 0.5);
    }

    #[test]
    fn test_merge_skips_duplicates() {
        let mut into = vec!["login".to_string()];
        merge(&mut into, &["crash".to_string(), "login".to_string()]);
        assert_eq!(into, vec!["login", "crash"]);
    }
}

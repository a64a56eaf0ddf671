//! Shared helpers used by several checkers: Levenshtein distance (phantom
//! suggestions, library-confusion detection), fuzzy token-overlap
//! similarity (fabricated-code classification), and a generic word
//! tokenizer.

use std::collections::HashSet;

/// Full Wagner-Fischer Levenshtein distance: the minimum number of
/// single-character edits (insertions, deletions, substitutions) needed to
/// transform `a` into `b`.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    let mut prev = vec![0usize; n + 1];
    let mut curr = vec![0usize; n + 1];

    for (j, val) in prev.iter_mut().enumerate().take(n + 1) {
        *val = j;
    }

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = if a_chars[i - 1] == b_chars[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Best match within Levenshtein distance 3 among `candidates`, or `None`.
pub fn find_closest(target: &str, candidates: &HashSet<&str>) -> Option<(String, usize)> {
    let mut best_distance = usize::MAX;
    let mut best: Option<&str> = None;

    for &candidate in candidates {
        let dist = levenshtein(target, candidate);
        if dist < best_distance && dist <= 3 {
            best_distance = dist;
            best = Some(candidate);
        }
    }

    best.map(|name| (name.to_string(), best_distance))
}

/// Lowercased, punctuation-stripped word tokenization shared by the
/// semantic-drift and confidence-fabrication claim extractors.
pub fn tokenize_words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// Normalized token-overlap similarity in `[0, 1]`: the fraction of `needle`'s
/// tokens (by count, duplicates counted once) that also appear in
/// `haystack`. Used to classify fenced code blocks as "modified" rather than
/// wholesale fabricated.
pub fn token_overlap_similarity(needle: &str, haystack: &str) -> f64 {
    let needle_tokens: HashSet<String> = tokenize_words(needle).into_iter().collect();
    if needle_tokens.is_empty() {
        return 0.0;
    }
    let haystack_tokens: HashSet<String> = tokenize_words(haystack).into_iter().collect();
    let shared = needle_tokens.intersection(&haystack_tokens).count();
    shared as f64 / needle_tokens.len() as f64
}

/// Strips fenced code blocks (```...```) and inline code spans (`...`) from
/// prose, so pattern-based claim extractors aren't confused by code
/// appearing inside the response.
pub fn strip_code(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if text[i..].starts_with("```") {
            if let Some(end) = text[i + 3..].find("```") {
                i += 3 + end + 3;
                continue;
            } else {
                break;
            }
        }
        if bytes[i] == b'`' {
            if let Some(end) = text[i + 1..].find('`') {
                i += 1 + end + 1;
                continue;
            }
        }
        let ch = text[i..].chars().next().unwrap();
        out.push(ch);
        i += ch.len_utf8();
    }
    let _ = &mut chars;
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levenshtein_known_distances() {
        assert_eq!(levenshtein("hello", "hello"), 0);
        assert_eq!(levenshtein("hello", "helo"), 1);
        assert_eq!(levenshtein("", "hello"), 5);
        assert_eq!(levenshtein("abc", "xyz"), 3);
    }

    #[test]
    fn token_overlap_detects_near_duplicates() {
        let original = "func add(a int, b int) int { return a + b }";
        let modified = "func add(a int, b int) int { return a+b; }";
        assert!(token_overlap_similarity(modified, original) > 0.8);

        let unrelated = "completely different content here";
        assert!(token_overlap_similarity(unrelated, original) < 0.3);
    }

    #[test]
    fn strip_code_removes_fenced_and_inline_spans() {
        let text = "See `foo()` and:\n```go\nfunc foo() {}\n```\ndone.";
        let stripped = strip_code(text);
        assert!(!stripped.contains("func foo"));
        assert!(stripped.contains("See"));
        assert!(stripped.contains("done."));
    }
}

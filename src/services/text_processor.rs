// Text Processing Service
// Rule-based tokenizer and sentence splitter used by the feature extractor.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Sentence-terminal punctuation (ASCII and full-width).
const SENTENCE_TERMINALS: &str = r"[.!?？！。；;]+";

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z0-9']+|[\u{4e00}-\u{9fff}]").expect("word regex"))
}

fn sentence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(SENTENCE_TERMINALS).expect("sentence regex"))
}

/// Lowercased word tokens. Latin runs of letters, digits and apostrophes form
/// one token; every CJK ideograph is its own token.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    word_re()
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Count tokens without allocating them
pub fn count_tokens(text: &str) -> usize {
    word_re().find_iter(text).count()
}

/// Split on runs of sentence-terminal punctuation, keeping pieces that contain
/// at least one word token.
pub fn split_sentences(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return vec![];
    }

    sentence_re()
        .split(text)
        .map(str::trim)
        .filter(|s| count_tokens(s) > 0)
        .collect()
}

/// Sentence lengths in word tokens
pub fn sentence_lengths(text: &str) -> Vec<usize> {
    split_sentences(text).into_iter().map(count_tokens).collect()
}

/// Fraction of n-grams that repeat an earlier occurrence of the same n-gram.
/// Returns `None` when the token stream is too short to form a repeat.
pub fn ngram_repeat_rate<S: AsRef<str>>(tokens: &[S], n: usize) -> Option<f64> {
    if n == 0 || tokens.len() < n + 1 {
        return None;
    }
    let mut counts: HashMap<Vec<&str>, usize> = HashMap::new();
    let mut total = 0usize;
    for window in tokens.windows(n) {
        let key: Vec<&str> = window.iter().map(|t| t.as_ref()).collect();
        *counts.entry(key).or_insert(0) += 1;
        total += 1;
    }
    let repeats = counts.values().filter(|&&c| c >= 2).map(|&c| c - 1).sum::<usize>();
    Some(repeats as f64 / total.max(1) as f64)
}

// Feature Extractor
// Turns raw text into the fixed stylometric FeatureVector.
//
// Every feature is a ratio in [0, 1]. When the text gives a feature nothing to
// measure (one sentence, fewer than four words, ...) it reports the feature's
// neutral value instead of dividing by zero.

use crate::models::{FeatureKind, FeatureVector};
use crate::services::lexicon::StopWords;
use crate::services::text_processor::{ngram_repeat_rate, sentence_lengths, tokenize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const DEFAULT_MIN_WORD_COUNT: usize = 5;
const REPEAT_NGRAM: usize = 3;
const PUNCTUATION: &str = ".,;:!?()[]\"'";

#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    stopwords: Arc<StopWords>,
    min_word_count: usize,
}

impl FeatureExtractor {
    pub fn new(stopwords: Arc<StopWords>, min_word_count: usize) -> Self {
        Self {
            stopwords,
            min_word_count: min_word_count.max(1),
        }
    }

    pub fn min_word_count(&self) -> usize {
        self.min_word_count
    }

    /// Total and side-effect free. Texts with fewer than `min_word_count`
    /// tokens yield a neutral vector flagged as insufficient.
    pub fn extract(&self, text: &str) -> FeatureVector {
        let tokens = tokenize(text);
        if tokens.len() < self.min_word_count {
            return FeatureVector::insufficient();
        }

        let lengths = sentence_lengths(text);
        FeatureVector::neutral()
            .with(FeatureKind::Complexity, complexity(&tokens, &lengths))
            .with(FeatureKind::Burstiness, burstiness(&lengths))
            .with(FeatureKind::Repetition, repetition(&tokens))
            .with(FeatureKind::Diversity, diversity(&tokens))
            .with(FeatureKind::StopwordRatio, stopword_ratio(&tokens, &self.stopwords))
            .with(FeatureKind::PunctuationDensity, char_ratio(text, |c| PUNCTUATION.contains(c)))
            .with(FeatureKind::Entropy, entropy(&tokens))
            .with(FeatureKind::UppercaseRatio, char_ratio(text, char::is_uppercase))
            .with(FeatureKind::DigitRatio, char_ratio(text, |c| c.is_ascii_digit()))
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

fn scale(value: f64, min_value: f64, max_value: f64) -> f64 {
    if max_value == min_value {
        return 0.0;
    }
    ((value - min_value) / (max_value - min_value)).clamp(0.0, 1.0)
}

/// 0.7 * scaled sentence length (10..40 words) + 0.3 * scaled word length (4..8 chars)
pub fn complexity(tokens: &[String], sentence_lengths: &[usize]) -> f64 {
    let Some(avg_word_len) = mean(tokens.iter().map(|t| t.chars().count() as f64)) else {
        return FeatureKind::Complexity.neutral();
    };
    let avg_sentence_len =
        mean(sentence_lengths.iter().map(|&l| l as f64)).unwrap_or(tokens.len() as f64);
    scale(avg_sentence_len, 10.0, 40.0) * 0.7 + scale(avg_word_len, 4.0, 8.0) * 0.3
}

/// Coefficient of variation of sentence lengths, clipped to [0, 1].
/// Needs at least two sentences.
pub fn burstiness(sentence_lengths: &[usize]) -> f64 {
    if sentence_lengths.len() < 2 {
        return FeatureKind::Burstiness.neutral();
    }
    let lengths: Vec<f64> = sentence_lengths.iter().map(|&l| l as f64).collect();
    let mean_len = lengths.iter().sum::<f64>() / lengths.len() as f64;
    if mean_len == 0.0 {
        return FeatureKind::Burstiness.neutral();
    }
    let variance =
        lengths.iter().map(|l| (l - mean_len).powi(2)).sum::<f64>() / lengths.len() as f64;
    (variance.sqrt() / mean_len).clamp(0.0, 1.0)
}

/// Share of word trigrams that repeat an earlier trigram
pub fn repetition(tokens: &[String]) -> f64 {
    ngram_repeat_rate(tokens, REPEAT_NGRAM).unwrap_or_else(|| FeatureKind::Repetition.neutral())
}

/// Type-token ratio
pub fn diversity(tokens: &[String]) -> f64 {
    if tokens.is_empty() {
        return FeatureKind::Diversity.neutral();
    }
    let distinct = frequencies(tokens).len();
    distinct as f64 / tokens.len() as f64
}

pub fn stopword_ratio(tokens: &[String], stopwords: &StopWords) -> f64 {
    if tokens.is_empty() {
        return FeatureKind::StopwordRatio.neutral();
    }
    tokens.iter().filter(|t| stopwords.contains(t)).count() as f64 / tokens.len() as f64
}

/// Shannon entropy of the token distribution divided by its maximum
/// (log2 of the distinct count). A single distinct token scores 0.
pub fn entropy(tokens: &[String]) -> f64 {
    if tokens.is_empty() {
        return FeatureKind::Entropy.neutral();
    }
    let freq = frequencies(tokens);
    let total = tokens.len() as f64;
    let h = -freq
        .values()
        .map(|&c| {
            let p = c as f64 / total;
            p * p.log2()
        })
        .sum::<f64>();
    let max_entropy = if freq.len() > 1 { (freq.len() as f64).log2() } else { 1.0 };
    (h / max_entropy).clamp(0.0, 1.0)
}

/// Ordered so floating-point sums over the counts always run in the same order.
fn frequencies(tokens: &[String]) -> BTreeMap<&str, usize> {
    let mut freq = BTreeMap::new();
    for t in tokens {
        *freq.entry(t.as_str()).or_insert(0) += 1;
    }
    freq
}

fn char_ratio(text: &str, pred: impl Fn(char) -> bool) -> f64 {
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }
    text.chars().filter(|c| pred(*c)).count() as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::new(Arc::new(StopWords::builtin().unwrap()), DEFAULT_MIN_WORD_COUNT)
    }

    fn toks(text: &str) -> Vec<String> {
        tokenize(text)
    }

    #[test]
    fn test_empty_and_whitespace_are_insufficient() {
        let ex = extractor();
        for text in ["", "   ", "\n\t", "...!!!", "two words", "a b c"] {
            let fv = ex.extract(text);
            assert!(fv.is_insufficient(), "{text:?} should be insufficient");
            assert_eq!(fv, FeatureVector::insufficient());
        }
    }

    #[test]
    fn test_every_key_present_and_in_range() {
        let fv = extractor().extract("Short text. Then a much longer sentence follows it here!");
        assert!(!fv.is_insufficient());
        assert_eq!(fv.iter().count(), FeatureKind::ALL.len());
        for (kind, value) in fv.iter() {
            let (lo, hi) = kind.range();
            assert!(value >= lo && value <= hi, "{kind}={value}");
        }
    }

    #[test]
    fn test_burstiness_uniform_sentences_is_zero() {
        assert_eq!(burstiness(&[8, 8, 8, 8]), 0.0);
    }

    #[test]
    fn test_burstiness_single_sentence_is_neutral() {
        assert_eq!(burstiness(&[12]), FeatureKind::Burstiness.neutral());
        assert_eq!(burstiness(&[]), FeatureKind::Burstiness.neutral());
    }

    #[test]
    fn test_burstiness_varied_sentences() {
        // lengths 2 and 6: mean 4, population std 2 -> 0.5
        assert!((burstiness(&[2, 6]) - 0.5).abs() < 1e-12);
        assert_eq!(burstiness(&[1, 30]), (14.5 / 15.5f64).min(1.0));
    }

    #[test]
    fn test_diversity_is_type_token_ratio() {
        assert_eq!(diversity(&toks("the cat and the hat")), 0.8);
        assert_eq!(diversity(&toks("The THE the")), 1.0 / 3.0);
    }

    #[test]
    fn test_repetition_of_looped_sentence_is_high() {
        let text = "alpha beta gamma delta. ".repeat(10);
        let rep = repetition(&toks(&text));
        // 40 tokens, 38 trigrams, 4 distinct
        assert!((rep - 34.0 / 38.0).abs() < 1e-12);
        assert_eq!(repetition(&toks("one two three four five six")), 0.0);
    }

    #[test]
    fn test_repetition_short_text_is_neutral() {
        assert_eq!(repetition(&toks("one two three")), FeatureKind::Repetition.neutral());
    }

    #[test]
    fn test_stopword_ratio() {
        let words = StopWords::builtin().unwrap();
        assert_eq!(stopword_ratio(&toks("The cat is on the mat"), &words), 4.0 / 6.0);
    }

    #[test]
    fn test_entropy_bounds() {
        assert_eq!(entropy(&toks("same same same same")), 0.0);
        assert!((entropy(&toks("a b c d")) - 1.0).abs() < 1e-12);
        let skewed = entropy(&toks("a a a a a a b"));
        assert!(skewed > 0.0 && skewed < 1.0);
    }

    #[test]
    fn test_complexity_components() {
        // 1 sentence of 10 four-letter words -> both scales at 0
        let text = "word ".repeat(10);
        assert_eq!(complexity(&toks(&text), &[10]), 0.0);
        // 40-word sentences of 8-letter words -> both scales saturate
        let long = "abcdefgh ".repeat(40);
        assert!((complexity(&toks(&long), &[40]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_char_ratios() {
        let fv = extractor().extract("ABC def 123 gh ij.");
        assert!((fv.get(FeatureKind::UppercaseRatio) - 3.0 / 18.0).abs() < 1e-12);
        assert!((fv.get(FeatureKind::DigitRatio) - 3.0 / 18.0).abs() < 1e-12);
        assert!((fv.get(FeatureKind::PunctuationDensity) - 1.0 / 18.0).abs() < 1e-12);
    }

    #[test]
    fn test_cjk_text_is_measured_per_character() {
        let fv = extractor().extract("我在花東縱谷騎腳踏車。店長端來熱茶。");
        assert!(!fv.is_insufficient());
        assert!(fv.get(FeatureKind::Diversity) > 0.8);
    }

    #[test]
    fn test_extract_is_deterministic() {
        let ex = extractor();
        let text = "Repeat this. Repeat that. Something else entirely, with commas!";
        assert_eq!(ex.extract(text), ex.extract(text));
    }
}

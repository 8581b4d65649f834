// Styloscope Data Models
// Serializable types shared by the extractor, scorer, batch layer and CLI.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// ============ Features ============

/// Stylometric features emitted by the extractor.
///
/// Declaration order is the display order and the tie-break order for notes,
/// so new variants go at the end.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Complexity,
    Burstiness,
    Repetition,
    Diversity,
    StopwordRatio,
    PunctuationDensity,
    Entropy,
    UppercaseRatio,
    DigitRatio,
}

pub const FEATURE_COUNT: usize = 9;

impl FeatureKind {
    pub const ALL: [FeatureKind; FEATURE_COUNT] = [
        FeatureKind::Complexity,
        FeatureKind::Burstiness,
        FeatureKind::Repetition,
        FeatureKind::Diversity,
        FeatureKind::StopwordRatio,
        FeatureKind::PunctuationDensity,
        FeatureKind::Entropy,
        FeatureKind::UppercaseRatio,
        FeatureKind::DigitRatio,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FeatureKind::Complexity => "complexity",
            FeatureKind::Burstiness => "burstiness",
            FeatureKind::Repetition => "repetition",
            FeatureKind::Diversity => "diversity",
            FeatureKind::StopwordRatio => "stopword_ratio",
            FeatureKind::PunctuationDensity => "punctuation_density",
            FeatureKind::Entropy => "entropy",
            FeatureKind::UppercaseRatio => "uppercase_ratio",
            FeatureKind::DigitRatio => "digit_ratio",
        }
    }

    /// Valid value range. Every current feature is a ratio.
    pub fn range(self) -> (f64, f64) {
        (0.0, 1.0)
    }

    /// Value reported when the text gives the feature nothing to measure.
    /// Also the default reference point of the weight table, so a defaulted
    /// feature never moves the score.
    pub fn neutral(self) -> f64 {
        match self {
            FeatureKind::Complexity => 0.30,
            FeatureKind::Burstiness => 0.40,
            FeatureKind::Repetition => 0.05,
            FeatureKind::Diversity => 0.60,
            FeatureKind::StopwordRatio => 0.35,
            FeatureKind::PunctuationDensity => 0.03,
            FeatureKind::Entropy => 0.90,
            FeatureKind::UppercaseRatio => 0.03,
            FeatureKind::DigitRatio => 0.0,
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fixed-shape feature vector. Every [`FeatureKind`] is always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureVector {
    values: BTreeMap<FeatureKind, f64>,
    insufficient_data: bool,
}

impl FeatureVector {
    /// All features at their neutral value.
    pub fn neutral() -> Self {
        Self {
            values: FeatureKind::ALL.iter().map(|k| (*k, k.neutral())).collect(),
            insufficient_data: false,
        }
    }

    /// Neutral vector flagged as too short to analyze.
    pub fn insufficient() -> Self {
        Self {
            insufficient_data: true,
            ..Self::neutral()
        }
    }

    pub fn get(&self, kind: FeatureKind) -> f64 {
        self.values.get(&kind).copied().unwrap_or_else(|| kind.neutral())
    }

    /// Store a value, clamped into the feature's range. Non-finite values fall
    /// back to the neutral value.
    pub fn set(&mut self, kind: FeatureKind, value: f64) {
        let (lo, hi) = kind.range();
        let v = if value.is_finite() { value.clamp(lo, hi) } else { kind.neutral() };
        self.values.insert(kind, v);
    }

    pub fn with(mut self, kind: FeatureKind, value: f64) -> Self {
        self.set(kind, value);
        self
    }

    pub fn is_insufficient(&self) -> bool {
        self.insufficient_data
    }

    /// Values in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (FeatureKind, f64)> + '_ {
        FeatureKind::ALL.iter().map(move |k| (*k, self.get(*k)))
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::neutral()
    }
}

// ============ Scoring ============

/// Per-feature signed contributions.
///
/// `raw_score == intercept + sum(contributions)` summed in declaration order;
/// `ai_confidence` is the logistic of `raw_score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub intercept: f64,
    pub contributions: BTreeMap<FeatureKind, f64>,
    pub raw_score: f64,
}

impl ScoreBreakdown {
    /// All-zero breakdown, used when nothing was scored.
    pub fn zero() -> Self {
        Self {
            intercept: 0.0,
            contributions: FeatureKind::ALL.iter().map(|k| (*k, 0.0)).collect(),
            raw_score: 0.0,
        }
    }

    pub fn contribution(&self, kind: FeatureKind) -> f64 {
        self.contributions.get(&kind).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        FeatureKind::ALL
            .iter()
            .fold(self.intercept, |acc, k| acc + self.contribution(*k))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "AI")]
    Ai,
    Human,
    Uncertain,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Ai => f.write_str("AI"),
            Label::Human => f.write_str("Human"),
            Label::Uncertain => f.write_str("Uncertain"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub label: Label,
    pub ai_confidence: f64,
    pub human_confidence: f64,
    pub features: FeatureVector,
    pub breakdown: ScoreBreakdown,
    pub notes: Vec<String>,
    pub weights_version: String,
}

// ============ Batch ============

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RowError {
    #[error("record has no `text` field")]
    MissingText,
    #[error("`text` field is {found}, expected a string")]
    NotText { found: String },
    #[error("record is {found}, expected an object with a `text` field")]
    NotAnObject { found: String },
    #[error("`text` cell is empty")]
    EmptyText,
    #[error("invalid JSON: {message}")]
    InvalidJson { message: String },
    #[error("invalid CSV record: {message}")]
    InvalidCsv { message: String },
}

/// One input record of a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchRow {
    Text(String),
    Malformed(RowError),
}

impl BatchRow {
    /// Interpret a parsed record. Only `{"text": "<string>", ...}` is well-formed.
    pub fn from_value(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(map) => match map.get("text") {
                None => BatchRow::Malformed(RowError::MissingText),
                Some(serde_json::Value::String(s)) => BatchRow::Text(s.clone()),
                Some(other) => BatchRow::Malformed(RowError::NotText {
                    found: json_kind(other).to_string(),
                }),
            },
            other => BatchRow::Malformed(RowError::NotAnObject {
                found: json_kind(other).to_string(),
            }),
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            BatchRow::Text(text) => Some(text),
            BatchRow::Malformed(_) => None,
        }
    }
}

impl From<&str> for BatchRow {
    fn from(text: &str) -> Self {
        BatchRow::Text(text.to_string())
    }
}

impl From<String> for BatchRow {
    fn from(text: String) -> Self {
        BatchRow::Text(text)
    }
}

impl From<&serde_json::Value> for BatchRow {
    fn from(value: &serde_json::Value) -> Self {
        BatchRow::from_value(value)
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCounts {
    #[serde(rename = "AI")]
    pub ai: usize,
    #[serde(rename = "Human")]
    pub human: usize,
    #[serde(rename = "Uncertain")]
    pub uncertain: usize,
}

impl LabelCounts {
    pub fn record(&mut self, label: Label) {
        match label {
            Label::Ai => self.ai += 1,
            Label::Human => self.human += 1,
            Label::Uncertain => self.uncertain += 1,
        }
    }

    pub fn get(&self, label: Label) -> usize {
        match label {
            Label::Ai => self.ai,
            Label::Human => self.human,
            Label::Uncertain => self.uncertain,
        }
    }
}

/// Half-open bucket `[lower, upper)`; the last bucket also holds 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBucket {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub count: usize,
    pub mean_ai_confidence: f64,
    pub p95_ai_confidence: f64,
    pub label_counts: LabelCounts,
    pub histogram: Vec<HistogramBucket>,
    /// Input positions of rows that could not be read as text.
    pub malformed_rows: Vec<usize>,
    pub items: Vec<DetectionResult>,
}

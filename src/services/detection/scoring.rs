// Scorer / Classifier
// Maps a FeatureVector to a bounded AI confidence, a label and ordered notes.
//
// Each feature adds weight * (value - reference) in logit space on top of the
// table's intercept; the logistic of the sum is the AI confidence. Results
// within `uncertain_margin` of 0.5 are labeled Uncertain.

use crate::error::{Error, Result};
use crate::models::{DetectionResult, FeatureKind, FeatureVector, Label, ScoreBreakdown};
use super::weights::{Polarity, WeightEntry, WeightTable};
use std::collections::BTreeMap;
use tracing::debug;

pub const DEFAULT_UNCERTAIN_MARGIN: f64 = 0.15;
pub const DEFAULT_MATERIALITY_THRESHOLD: f64 = 0.25;

pub const INSUFFICIENT_TEXT_NOTE: &str =
    "too little text to analyze: stylometric signals need several words and sentences";
pub const NO_MATERIAL_SIGNAL_NOTE: &str =
    "features fall within common ranges; no single signal is decisive";

#[derive(Debug, Clone)]
pub struct Scorer {
    weights: WeightTable,
    uncertain_margin: f64,
    materiality_threshold: f64,
}

impl Scorer {
    pub fn new(weights: WeightTable, uncertain_margin: f64, materiality_threshold: f64) -> Result<Self> {
        weights.validate()?;
        if !(0.0..0.5).contains(&uncertain_margin) {
            return Err(Error::Config(format!(
                "uncertain margin {} must be in [0, 0.5)",
                uncertain_margin
            )));
        }
        if !materiality_threshold.is_finite() || materiality_threshold < 0.0 {
            return Err(Error::Config(format!(
                "materiality threshold {} must be a non-negative number",
                materiality_threshold
            )));
        }
        Ok(Self {
            weights,
            uncertain_margin,
            materiality_threshold,
        })
    }

    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }

    pub fn uncertain_margin(&self) -> f64 {
        self.uncertain_margin
    }

    /// Score a feature vector. Insufficient vectors short-circuit to an
    /// Uncertain 0.5 result.
    pub fn score(&self, features: FeatureVector) -> DetectionResult {
        if features.is_insufficient() {
            return self.uncertain(features, INSUFFICIENT_TEXT_NOTE.to_string());
        }

        let intercept = self.weights.intercept();
        let contributions: BTreeMap<FeatureKind, f64> = features
            .iter()
            .map(|(kind, value)| {
                let c = self.weights.weight(kind) * (value - self.weights.reference(kind));
                (kind, c)
            })
            .collect();
        let breakdown = ScoreBreakdown {
            intercept,
            raw_score: 0.0,
            contributions,
        };
        let raw_score = breakdown.total();
        let breakdown = ScoreBreakdown { raw_score, ..breakdown };

        let ai_confidence = logistic(raw_score);
        let label = self.label_for(ai_confidence);
        let notes = self.build_notes(&features, &breakdown);

        debug!(
            raw_score,
            ai_confidence,
            label = %label,
            notes = notes.len(),
            "detection.scored"
        );

        DetectionResult {
            label,
            ai_confidence,
            human_confidence: 1.0 - ai_confidence,
            features,
            breakdown,
            notes,
            weights_version: self.weights.version.clone(),
        }
    }

    pub fn label_for(&self, ai_confidence: f64) -> Label {
        if (ai_confidence - 0.5).abs() <= self.uncertain_margin {
            Label::Uncertain
        } else if ai_confidence > 0.5 {
            Label::Ai
        } else {
            Label::Human
        }
    }

    /// Well-formed Uncertain result: confidence 0.5, zero breakdown, one note.
    pub fn uncertain(&self, features: FeatureVector, note: String) -> DetectionResult {
        DetectionResult {
            label: Label::Uncertain,
            ai_confidence: 0.5,
            human_confidence: 0.5,
            features,
            breakdown: ScoreBreakdown::zero(),
            notes: vec![note],
            weights_version: self.weights.version.clone(),
        }
    }

    /// Material contributions sorted by descending magnitude; the sort is
    /// stable so equal magnitudes keep declaration order.
    fn build_notes(&self, features: &FeatureVector, breakdown: &ScoreBreakdown) -> Vec<String> {
        let mut material: Vec<(FeatureKind, f64)> = FeatureKind::ALL
            .iter()
            .map(|k| (*k, breakdown.contribution(*k)))
            .filter(|(_, c)| c.abs() >= self.materiality_threshold && *c != 0.0)
            .collect();
        material.sort_by(|a, b| {
            b.1.abs()
                .partial_cmp(&a.1.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        if material.is_empty() {
            return vec![NO_MATERIAL_SIGNAL_NOTE.to_string()];
        }

        material
            .into_iter()
            .map(|(kind, contribution)| {
                let value = features.get(kind);
                let above = value > self.weights.reference(kind);
                let polarity = self
                    .weights
                    .entry(kind)
                    .map_or(Polarity::Neutral, WeightEntry::polarity);
                let toward = match (polarity, above) {
                    (Polarity::Ai, true) | (Polarity::Human, false) => "AI",
                    _ => "Human",
                };
                format!(
                    "{} ({}={:.3}, {:+.2} toward {})",
                    describe(kind, above),
                    kind,
                    value,
                    contribution,
                    toward
                )
            })
            .collect()
    }
}

/// Observation for a feature sitting above or below its reference value.
fn describe(kind: FeatureKind, above: bool) -> &'static str {
    match (kind, above) {
        (FeatureKind::Complexity, true) => "long sentences built from long words",
        (FeatureKind::Complexity, false) => "short, simple sentences",
        (FeatureKind::Burstiness, true) => "sentence lengths vary widely",
        (FeatureKind::Burstiness, false) => "unusually low sentence-length variation",
        (FeatureKind::Repetition, true) => "word sequences repeat throughout the text",
        (FeatureKind::Repetition, false) => "almost no repeated phrasing",
        (FeatureKind::Diversity, true) => "rich vocabulary with few repeated words",
        (FeatureKind::Diversity, false) => "low lexical diversity",
        (FeatureKind::StopwordRatio, true) => "heavy use of common function words",
        (FeatureKind::StopwordRatio, false) => "sparse use of common function words",
        (FeatureKind::PunctuationDensity, true) => "dense punctuation",
        (FeatureKind::PunctuationDensity, false) => "sparse punctuation",
        (FeatureKind::Entropy, true) => "unpredictable word choice (high entropy)",
        (FeatureKind::Entropy, false) => "predictable word choice (low entropy)",
        (FeatureKind::UppercaseRatio, true) => "many uppercase letters",
        (FeatureKind::UppercaseRatio, false) => "few uppercase letters",
        (FeatureKind::DigitRatio, true) => "many digits",
        (FeatureKind::DigitRatio, false) => "few digits",
    }
}

/// Logistic curve, saturating outside [-40, 40]
pub fn logistic(x: f64) -> f64 {
    if x > 40.0 {
        1.0
    } else if x < -40.0 {
        0.0
    } else {
        1.0 / (1.0 + (-x).exp())
    }
}

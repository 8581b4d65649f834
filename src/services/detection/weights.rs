// Weight Table
// Versioned {feature -> (weight, reference)} configuration for the scorer.
//
// Polarity is the sign of the weight: positive pushes toward AI, negative
// toward Human, zero means the feature is reported but not scored.

use crate::error::{Error, Result};
use crate::models::FeatureKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const DEFAULT_WEIGHTS_VERSION: &str = "stylometry-v1";
const DEFAULT_BIAS: f64 = 0.15;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Polarity {
    Ai,
    Human,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightEntry {
    pub feature: FeatureKind,
    pub weight: f64,
    /// Value at which the feature contributes nothing.
    pub reference: f64,
}

impl WeightEntry {
    pub fn polarity(&self) -> Polarity {
        if self.weight > 0.0 {
            Polarity::Ai
        } else if self.weight < 0.0 {
            Polarity::Human
        } else {
            Polarity::Neutral
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightTable {
    pub version: String,
    pub bias: f64,
    pub entries: Vec<WeightEntry>,
}

impl Default for WeightTable {
    fn default() -> Self {
        let entries = FeatureKind::ALL
            .iter()
            .map(|&feature| WeightEntry {
                feature,
                weight: default_weight(feature),
                reference: feature.neutral(),
            })
            .collect();
        Self {
            version: DEFAULT_WEIGHTS_VERSION.to_string(),
            bias: DEFAULT_BIAS,
            entries,
        }
    }
}

fn default_weight(feature: FeatureKind) -> f64 {
    match feature {
        FeatureKind::Complexity => 1.2,
        FeatureKind::Burstiness => -1.4,
        FeatureKind::Repetition => 1.1,
        FeatureKind::Diversity => -1.3,
        FeatureKind::StopwordRatio => 0.8,
        FeatureKind::PunctuationDensity => -0.4,
        FeatureKind::Entropy => -0.7,
        FeatureKind::UppercaseRatio => 0.0,
        FeatureKind::DigitRatio => 0.0,
    }
}

impl WeightTable {
    /// Every feature exactly once, finite numbers, references inside the
    /// feature's range.
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(Error::InvalidWeights("version must not be empty".to_string()));
        }
        if !self.bias.is_finite() {
            return Err(Error::InvalidWeights("bias must be finite".to_string()));
        }

        let mut seen = BTreeSet::new();
        for entry in &self.entries {
            if !seen.insert(entry.feature) {
                return Err(Error::InvalidWeights(format!("{} listed twice", entry.feature)));
            }
            if !entry.weight.is_finite() || !entry.reference.is_finite() {
                return Err(Error::InvalidWeights(format!("{} has a non-finite value", entry.feature)));
            }
            let (lo, hi) = entry.feature.range();
            if entry.reference < lo || entry.reference > hi {
                return Err(Error::InvalidWeights(format!(
                    "{} reference {} outside [{}, {}]",
                    entry.feature, entry.reference, lo, hi
                )));
            }
        }

        if let Some(missing) = FeatureKind::ALL.iter().find(|k| !seen.contains(*k)) {
            return Err(Error::InvalidWeights(format!("{} has no entry", missing)));
        }
        Ok(())
    }

    pub fn entry(&self, feature: FeatureKind) -> Option<&WeightEntry> {
        self.entries.iter().find(|e| e.feature == feature)
    }

    pub fn weight(&self, feature: FeatureKind) -> f64 {
        self.entry(feature).map(|e| e.weight).unwrap_or(0.0)
    }

    pub fn reference(&self, feature: FeatureKind) -> f64 {
        self.entry(feature).map(|e| e.reference).unwrap_or_else(|| feature.neutral())
    }

    /// Raw score of a vector sitting exactly on every reference point.
    pub fn intercept(&self) -> f64 {
        FeatureKind::ALL
            .iter()
            .fold(self.bias, |acc, k| acc + self.weight(*k) * self.reference(*k))
    }
}

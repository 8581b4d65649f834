// Detector
// Owns the extractor, scorer and reference data; the entry point callers use.

use crate::error::Result;
use crate::models::{BatchRow, BatchSummary, DetectionResult, FeatureVector, RowError};
use crate::services::config_store::{AppConfig, DetectionConfig};
use crate::services::lexicon::StopWords;
use crate::services::text_processor::count_tokens;
use super::aggregation::{aggregate, summarize};
use super::features::FeatureExtractor;
use super::scoring::Scorer;
use super::weights::WeightTable;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

pub const DEFAULT_SHORT_SAMPLE_WORDS: usize = 30;

fn short_sample_note(words: usize) -> String {
    format!(
        "short sample ({} words): stylometric signals are unstable at this length, treat the estimate with caution",
        words
    )
}

/// Cheap to clone: the stop-word table and scorer are shared read-only.
#[derive(Debug, Clone)]
pub struct Detector {
    extractor: FeatureExtractor,
    scorer: Arc<Scorer>,
    config: DetectionConfig,
}

impl Detector {
    /// Build from application config, loading the stop-word list once.
    pub fn new(config: &AppConfig) -> Result<Self> {
        config.validate()?;
        let stopwords = match &config.stopwords_path {
            Some(path) => StopWords::load(path)?,
            None => StopWords::builtin()?,
        };
        Self::from_parts(config.detection.clone(), config.weights.clone(), Arc::new(stopwords))
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(&AppConfig::default())
    }

    pub fn from_parts(
        config: DetectionConfig,
        weights: WeightTable,
        stopwords: Arc<StopWords>,
    ) -> Result<Self> {
        config.validate()?;
        let scorer = Scorer::new(weights, config.uncertain_margin, config.materiality_threshold)?;
        info!(
            weights = %scorer.weights().version,
            stopwords = stopwords.len(),
            min_word_count = config.min_word_count,
            "detector.initialized"
        );
        Ok(Self {
            extractor: FeatureExtractor::new(stopwords, config.min_word_count),
            scorer: Arc::new(scorer),
            config,
        })
    }

    /// Process-wide detector with default configuration, built on first use.
    pub fn shared() -> Result<&'static Detector> {
        static SHARED: OnceLock<Detector> = OnceLock::new();
        if let Some(detector) = SHARED.get() {
            return Ok(detector);
        }
        let detector = Self::with_defaults()?;
        Ok(SHARED.get_or_init(|| detector))
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    pub fn extract(&self, text: &str) -> FeatureVector {
        self.extractor.extract(text)
    }

    pub fn score(&self, features: FeatureVector) -> DetectionResult {
        self.scorer.score(features)
    }

    /// Score one text. Scored texts shorter than `short_sample_words` get a
    /// trailing caution note after the feature notes.
    pub fn detect_single(&self, text: &str) -> DetectionResult {
        let features = self.extract(text);
        let mut result = self.score(features);
        if !result.features.is_insufficient() {
            let words = count_tokens(text);
            if words < self.config.short_sample_words {
                result.notes.push(short_sample_note(words));
            }
        }
        debug!(
            chars = text.chars().count(),
            label = %result.label,
            ai_confidence = result.ai_confidence,
            "detection.single"
        );
        result
    }

    /// Sequential batch, results in input order.
    pub fn detect_batch<I>(&self, rows: I) -> BatchSummary
    where
        I: IntoIterator<Item = BatchRow>,
    {
        aggregate(self, rows)
    }

    /// Batch scored on the blocking pool with at most `concurrency` rows in
    /// flight. Output is identical to [`Detector::detect_batch`]; a row whose
    /// task dies becomes an Uncertain result at its position.
    pub async fn detect_batch_parallel(&self, rows: Vec<BatchRow>, concurrency: usize) -> BatchSummary {
        let started = Instant::now();
        let total = rows.len();
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut join_set: JoinSet<(usize, Option<DetectionResult>)> = JoinSet::new();
        let mut slots: Vec<Option<DetectionResult>> = vec![None; total];
        let mut malformed_rows = Vec::new();

        for (idx, row) in rows.into_iter().enumerate() {
            match row {
                BatchRow::Malformed(err) => {
                    warn!(row = idx, error = %err, "batch.row_malformed");
                    malformed_rows.push(idx);
                    slots[idx] = Some(self.malformed_row(idx, &err));
                }
                BatchRow::Text(text) => {
                    let detector = self.clone();
                    let semaphore = semaphore.clone();
                    join_set.spawn(async move {
                        let Ok(_permit) = semaphore.acquire_owned().await else {
                            return (idx, None);
                        };
                        let scored =
                            tokio::task::spawn_blocking(move || detector.detect_single(&text)).await;
                        match scored {
                            Ok(result) => (idx, Some(result)),
                            Err(e) => {
                                warn!(row = idx, error = %e, "batch.row_task_failed");
                                (idx, None)
                            }
                        }
                    });
                }
            }
        }

        while let Some(res) = join_set.join_next().await {
            match res {
                Ok((idx, result)) => slots[idx] = result,
                Err(e) => warn!(error = %e, "batch.task_join_failed"),
            }
        }

        let items: Vec<DetectionResult> = slots
            .into_iter()
            .enumerate()
            .map(|(idx, slot)| slot.unwrap_or_else(|| self.failed_row(idx)))
            .collect();

        info!(
            rows = total,
            concurrency,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch.parallel_done"
        );
        summarize(items, malformed_rows, self.config.histogram_buckets)
    }

    /// Uncertain placeholder for a record that carried no usable text.
    pub fn malformed_row(&self, idx: usize, err: &RowError) -> DetectionResult {
        self.scorer
            .uncertain(FeatureVector::insufficient(), format!("row {}: {}", idx, err))
    }

    fn failed_row(&self, idx: usize) -> DetectionResult {
        self.scorer.uncertain(
            FeatureVector::insufficient(),
            format!("row {}: analysis did not complete", idx),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Label;

    #[test]
    fn test_shared_detector_is_reused() {
        let a = Detector::shared().unwrap() as *const Detector;
        let b = Detector::shared().unwrap() as *const Detector;
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_stopwords_path_fails_construction() {
        let config = AppConfig {
            stopwords_path: Some("/nonexistent/styloscope/stopwords.txt".into()),
            ..AppConfig::default()
        };
        assert!(Detector::new(&config).is_err());
    }

    #[test]
    fn test_custom_stopwords_change_the_feature() {
        let words = Arc::new(StopWords::parse("cat\nmat\n").unwrap());
        let detector =
            Detector::from_parts(DetectionConfig::default(), WeightTable::default(), words).unwrap();
        let fv = detector.extract("The cat sat on the mat");
        assert_eq!(fv.get(crate::models::FeatureKind::StopwordRatio), 2.0 / 6.0);
    }

    #[test]
    fn test_detect_single_degenerate() {
        let detector = Detector::with_defaults().unwrap();
        for text in ["", "   "] {
            let result = detector.detect_single(text);
            assert_eq!(result.label, Label::Uncertain);
            assert_eq!(result.ai_confidence, 0.5);
        }
    }

    #[test]
    fn test_three_words_are_not_enough_by_default() {
        let result = Detector::with_defaults().unwrap().detect_single("a b c");
        assert_eq!(result.label, Label::Uncertain);
        assert_eq!(result.ai_confidence, 0.5);
        assert_eq!(result.notes, vec![crate::services::detection::INSUFFICIENT_TEXT_NOTE.to_string()]);
    }

    #[test]
    fn test_short_sample_gets_caution_note() {
        let detector = Detector::with_defaults().unwrap();
        let short = detector.detect_single("Rain again today. I gave up on the garden.");
        assert_eq!(short.notes.last(), Some(&short_sample_note(9)));
        assert_eq!(short.notes.iter().filter(|n| n.starts_with("short sample")).count(), 1);

        let long = "The committee met on Tuesday and argued for hours about the budget. ".repeat(3);
        let result = detector.detect_single(&long);
        assert!(result.notes.iter().all(|n| !n.starts_with("short sample")));
    }

    #[test]
    fn test_short_sample_note_can_be_disabled() {
        let config = AppConfig {
            detection: DetectionConfig { short_sample_words: 0, ..DetectionConfig::default() },
            ..AppConfig::default()
        };
        let result = Detector::new(&config).unwrap().detect_single("Rain again today. I gave up on the garden.");
        assert!(result.notes.iter().all(|n| !n.starts_with("short sample")));
    }

    #[test]
    fn test_min_word_count_is_configurable() {
        let config = AppConfig {
            detection: DetectionConfig { min_word_count: 10, ..DetectionConfig::default() },
            ..AppConfig::default()
        };
        let detector = Detector::new(&config).unwrap();
        assert!(detector.extract("only five words right here").is_insufficient());
    }

    #[tokio::test]
    async fn test_parallel_matches_sequential() {
        let detector = Detector::with_defaults().unwrap();
        let texts = [
            "The committee met on Tuesday. It argued for hours about the budget!",
            "",
            "Short. Shorter. A much longer sentence that keeps going for a while.",
            "Data pipelines transform data into data products for data teams.",
        ];
        let rows: Vec<BatchRow> = texts.iter().map(|t| BatchRow::from(*t)).collect();
        let sequential = detector.detect_batch(rows.clone());
        let parallel = detector.detect_batch_parallel(rows, 3).await;
        assert_eq!(sequential, parallel);
    }
}

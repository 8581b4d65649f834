// Batch Aggregation
// Runs the detector over many rows and folds the results into a BatchSummary.

use crate::models::{BatchRow, BatchSummary, DetectionResult, HistogramBucket, LabelCounts};
use super::detector::Detector;
use tracing::{info, warn};

pub const DEFAULT_HISTOGRAM_BUCKETS: usize = 10;

/// Score every row in input order. A malformed row becomes an Uncertain result
/// at its own position; the rest of the batch is unaffected.
pub fn aggregate<I>(detector: &Detector, rows: I) -> BatchSummary
where
    I: IntoIterator<Item = BatchRow>,
{
    let mut items = Vec::new();
    let mut malformed_rows = Vec::new();

    for (idx, row) in rows.into_iter().enumerate() {
        let result = match row {
            BatchRow::Text(text) => detector.detect_single(&text),
            BatchRow::Malformed(err) => {
                warn!(row = idx, error = %err, "batch.row_malformed");
                malformed_rows.push(idx);
                detector.malformed_row(idx, &err)
            }
        };
        items.push(result);
    }

    summarize(items, malformed_rows, detector.config().histogram_buckets)
}

/// Fold per-item results (already in input order) into summary statistics.
pub fn summarize(items: Vec<DetectionResult>, malformed_rows: Vec<usize>, buckets: usize) -> BatchSummary {
    let count = items.len();
    let mut label_counts = LabelCounts::default();
    for item in &items {
        label_counts.record(item.label);
    }

    let confidences: Vec<f64> = items.iter().map(|r| r.ai_confidence).collect();
    let mean_ai_confidence = if count == 0 {
        0.0
    } else {
        confidences.iter().sum::<f64>() / count as f64
    };
    let p95_ai_confidence = percentile(&confidences, 0.95);
    let histogram = histogram(&confidences, buckets);

    info!(
        count,
        ai = label_counts.ai,
        human = label_counts.human,
        uncertain = label_counts.uncertain,
        malformed = malformed_rows.len(),
        mean_ai_confidence,
        "batch.summarized"
    );

    BatchSummary {
        count,
        mean_ai_confidence,
        p95_ai_confidence,
        label_counts,
        histogram,
        malformed_rows,
        items,
    }
}

/// Nearest-rank percentile; 0 for an empty slice
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let rank = (q.clamp(0.0, 1.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// Equal-width buckets over [0, 1]; 1.0 lands in the last bucket.
pub fn histogram(values: &[f64], buckets: usize) -> Vec<HistogramBucket> {
    let buckets = buckets.max(1);
    let width = 1.0 / buckets as f64;
    let mut out: Vec<HistogramBucket> = (0..buckets)
        .map(|i| HistogramBucket {
            lower: i as f64 * width,
            upper: if i + 1 == buckets { 1.0 } else { (i + 1) as f64 * width },
            count: 0,
        })
        .collect();

    for v in values {
        let idx = ((v.clamp(0.0, 1.0) * buckets as f64) as usize).min(buckets - 1);
        out[idx].count += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeatureVector, Label, RowError, ScoreBreakdown};

    fn result(label: Label, ai: f64) -> DetectionResult {
        DetectionResult {
            label,
            ai_confidence: ai,
            human_confidence: 1.0 - ai,
            features: FeatureVector::neutral(),
            breakdown: ScoreBreakdown::zero(),
            notes: vec![],
            weights_version: "test".to_string(),
        }
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(vec![], vec![], 10);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.mean_ai_confidence, 0.0);
        assert_eq!(summary.p95_ai_confidence, 0.0);
        assert_eq!(summary.histogram.len(), 10);
        assert!(summary.histogram.iter().all(|b| b.count == 0));
    }

    #[test]
    fn test_summarize_counts_and_mean() {
        let items = vec![
            result(Label::Ai, 0.9),
            result(Label::Human, 0.1),
            result(Label::Uncertain, 0.5),
            result(Label::Ai, 0.7),
        ];
        let summary = summarize(items, vec![], 10);
        assert_eq!(summary.count, 4);
        assert_eq!(summary.label_counts.get(Label::Ai), 2);
        assert_eq!(summary.label_counts.get(Label::Human), 1);
        assert_eq!(summary.label_counts.get(Label::Uncertain), 1);
        assert!((summary.mean_ai_confidence - 0.55).abs() < 1e-12);
        assert_eq!(summary.p95_ai_confidence, 0.9);
        assert_eq!(summary.items[1].ai_confidence, 0.1);
    }

    #[test]
    fn test_histogram_edges() {
        let h = histogram(&[0.0, 0.05, 0.5, 0.99, 1.0], 10);
        assert_eq!(h[0].count, 2);
        assert_eq!(h[5].count, 1);
        assert_eq!(h[9].count, 2);
        assert_eq!(h[9].upper, 1.0);
        assert_eq!(h.iter().map(|b| b.count).sum::<usize>(), 5);
    }

    #[test]
    fn test_histogram_zero_buckets_clamps_to_one() {
        let h = histogram(&[0.2, 0.8], 0);
        assert_eq!(h.len(), 1);
        assert_eq!(h[0].count, 2);
    }

    #[test]
    fn test_percentile_nearest_rank() {
        let values: Vec<f64> = (1..=20).map(|i| i as f64 / 20.0).collect();
        assert_eq!(percentile(&values, 0.95), 0.95);
        assert_eq!(percentile(&[0.3], 0.95), 0.3);
    }

    #[test]
    fn test_aggregate_isolates_malformed_rows() {
        let detector = Detector::with_defaults().unwrap();
        let rows = vec![
            BatchRow::from("The committee met on Tuesday and argued for hours about the budget."),
            BatchRow::Malformed(RowError::MissingText),
            BatchRow::from("Rain again. I gave up on the garden and read all afternoon instead."),
        ];
        let summary = aggregate(&detector, rows);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.malformed_rows, vec![1]);
        assert_eq!(summary.items[1].label, Label::Uncertain);
        assert_eq!(summary.items[1].ai_confidence, 0.5);
        assert!(summary.items[1].notes[0].contains("row 1"));
        assert!(!summary.items[0].features.is_insufficient());
        assert!(!summary.items[2].features.is_insufficient());
    }
}

use serde_json::json;
use styloscope::models::{BatchRow, FeatureKind, Label};
use styloscope::services::detection::INSUFFICIENT_TEXT_NOTE;
use styloscope::Detector;

const REPEATED_SENTENCE: &str = "Machine learning models generate fluent text very quickly.";

const OPINION: &str = "The class discussion felt messy but alive. People interrupted each other, \
    changed their minds mid-sentence, and even abandoned examples halfway through. \
    That jagged energy is the opposite of the tidy, polished voice I'm used to from chatbots.";

fn detector() -> &'static Detector {
    Detector::shared().unwrap()
}

fn repetitive_text() -> String {
    vec![REPEATED_SENTENCE; 50].join(" ")
}

#[test]
fn test_same_text_gives_identical_results() {
    let a = detector().detect_single(OPINION);
    let b = detector().detect_single(OPINION);
    assert_eq!(a, b);
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn test_confidences_are_bounded_and_complementary() {
    let texts = [
        OPINION.to_string(),
        repetitive_text(),
        "Numbers: 1, 2, 3, 4, 5! ALL CAPS HERE. ok".to_string(),
        "我在花東縱谷騎腳踏車時被午後雷陣雨嚇了一跳。".to_string(),
    ];
    for text in &texts {
        let result = detector().detect_single(text);
        assert!((0.0..=1.0).contains(&result.ai_confidence));
        assert_eq!(result.human_confidence, 1.0 - result.ai_confidence);
        for kind in FeatureKind::ALL {
            let value = result.features.get(kind);
            assert!((0.0..=1.0).contains(&value), "{} = {}", kind, value);
        }
    }
}

#[test]
fn test_breakdown_sums_to_raw_score() {
    let result = detector().detect_single(OPINION);
    assert!((result.breakdown.total() - result.breakdown.raw_score).abs() < 1e-12);
}

#[test]
fn test_degenerate_inputs_are_uncertain() {
    for text in ["", "   ", "\n\t"] {
        let result = detector().detect_single(text);
        assert_eq!(result.label, Label::Uncertain);
        assert_eq!(result.ai_confidence, 0.5);
        assert_eq!(result.human_confidence, 0.5);
        assert!(result.features.is_insufficient());
        assert_eq!(result.notes, vec![INSUFFICIENT_TEXT_NOTE.to_string()]);
    }
}

#[test]
fn test_repetitive_text_leans_ai() {
    let result = detector().detect_single(&repetitive_text());
    assert_eq!(result.label, Label::Ai);
    assert!(result.ai_confidence > 0.65);
    assert!(result.notes[0].starts_with("word sequences repeat"));
    assert!(result.notes.iter().any(|n| n.contains("unusually low sentence-length variation")));
}

#[test]
fn test_varied_opinion_leans_human() {
    let result = detector().detect_single(OPINION);
    assert_eq!(result.label, Label::Human);
    assert!(result.ai_confidence < 0.35);
}

#[test]
fn test_repetitive_scores_above_varied() {
    let repetitive = detector().detect_single(&repetitive_text());
    let varied = detector().detect_single(OPINION);
    assert!(repetitive.ai_confidence > varied.ai_confidence);
}

#[test]
fn test_batch_preserves_input_order() {
    let texts = [OPINION.to_string(), repetitive_text(), String::new()];
    let summary = detector().detect_batch(texts.iter().cloned().map(BatchRow::from));
    assert_eq!(summary.count, 3);
    for (item, text) in summary.items.iter().zip(&texts) {
        assert_eq!(item, &detector().detect_single(text));
    }
    assert_eq!(summary.label_counts.get(Label::Human), 1);
    assert_eq!(summary.label_counts.get(Label::Ai), 1);
    assert_eq!(summary.label_counts.get(Label::Uncertain), 1);
}

#[test]
fn test_empty_batch() {
    let summary = detector().detect_batch(Vec::<BatchRow>::new());
    assert_eq!(summary.count, 0);
    assert_eq!(summary.mean_ai_confidence, 0.0);
    assert!(summary.items.is_empty());
}

#[test]
fn test_malformed_rows_do_not_abort_batch() {
    let records = [
        json!({"text": OPINION}),
        json!({"body": "no text field"}),
        json!({"text": 42}),
        json!("bare string"),
        json!({"text": REPEATED_SENTENCE}),
    ];
    let summary = detector().detect_batch(records.iter().map(BatchRow::from));
    assert_eq!(summary.count, 5);
    assert_eq!(summary.malformed_rows, vec![1, 2, 3]);
    for idx in [1, 2, 3] {
        assert_eq!(summary.items[idx].label, Label::Uncertain);
        assert_eq!(summary.items[idx].ai_confidence, 0.5);
        assert!(summary.items[idx].notes[0].starts_with(&format!("row {}:", idx)));
    }
    assert_eq!(summary.items[0], detector().detect_single(OPINION));
    assert_eq!(summary.items[4], detector().detect_single(REPEATED_SENTENCE));
}

#[test]
fn test_summary_serializes_label_counts() {
    let summary = detector().detect_batch(vec![BatchRow::from(OPINION)]);
    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["labelCounts"]["Human"], 1);
    assert_eq!(json["items"][0]["label"], "Human");
    assert_eq!(json["items"][0]["weightsVersion"], "stylometry-v1");
}

#[tokio::test]
async fn test_parallel_batch_matches_sequential() {
    let rows: Vec<BatchRow> = (0..12)
        .map(|i| {
            if i % 5 == 3 {
                BatchRow::from(&json!({"title": i}))
            } else if i % 2 == 0 {
                BatchRow::from(OPINION)
            } else {
                BatchRow::from(vec![REPEATED_SENTENCE; i + 1].join(" "))
            }
        })
        .collect();
    let sequential = detector().detect_batch(rows.clone());
    for concurrency in [1, 4, 32] {
        let parallel = detector().detect_batch_parallel(rows.clone(), concurrency).await;
        assert_eq!(parallel, sequential);
    }
}

// Detection Module
// Stylometric detection organized into specialized submodules:
// - features: Feature extraction from raw text
// - weights: Versioned weight table and feature references
// - scoring: Logistic scoring, labeling and explanatory notes
// - aggregation: Batch summaries over many detection results
// - detector: Facade owning extractor, scorer and reference data
// - double_check: Optional cloud second opinion next to the local verdict

pub mod features;
pub mod weights;
pub mod scoring;
pub mod aggregation;
pub mod detector;
pub mod double_check;

// Re-export commonly used items
pub use features::{FeatureExtractor, DEFAULT_MIN_WORD_COUNT};
pub use weights::{Polarity, WeightEntry, WeightTable, DEFAULT_WEIGHTS_VERSION};
pub use scoring::{logistic, Scorer, INSUFFICIENT_TEXT_NOTE, NO_MATERIAL_SIGNAL_NOTE};
pub use aggregation::{aggregate, histogram, percentile, summarize, DEFAULT_HISTOGRAM_BUCKETS};
pub use detector::Detector;
pub use double_check::{detect_with_double_check, CloudOutcome, DoubleCheckReport};

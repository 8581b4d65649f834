// Styloscope Core Services

pub mod text_processor;
pub mod lexicon;
pub mod batch_io;
pub mod config_store;
pub mod providers;
pub mod detection;

pub use text_processor::*;
pub use lexicon::StopWords;
pub use batch_io::{read_csv_rows, read_json_rows, write_csv_results, BatchFormat};
pub use config_store::*;
pub use providers::*;

// Re-export detection entry points
pub use detection::{
    aggregate,
    detect_with_double_check,
    CloudOutcome,
    Detector,
    DoubleCheckReport,
    FeatureExtractor,
    Scorer,
    WeightTable,
};

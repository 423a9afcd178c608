pub mod extract;
pub mod table;
pub mod timestamp;
pub mod window;

pub use extract::{
    records_from_frame, split_by_condition, ConditionSubset, EcgRecord, ExtractionReport,
    FeatureExtractor, WindowTally,
};
pub use table::{Cell, HrvFeatureRow, HrvFeatureTable, TAG_COLUMNS};
pub use timestamp::Timestamp;
pub use window::{overlap_rows, window_count, windows, Windows};

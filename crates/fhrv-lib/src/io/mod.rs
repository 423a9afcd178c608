pub mod csv;
pub mod dataset;
pub mod ingest;
pub mod output;

pub use dataset::{FlatDataset, RawSample};
pub use ingest::{DataType, Ingestor, UserRange};
pub use output::{save_table, OutputFormat};

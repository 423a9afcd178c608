pub mod config;
pub mod error;
pub mod features;
pub mod frame;
pub mod io;
pub mod metrics;
pub mod signal;

pub use config::PipelineConfig;
pub use error::*;
pub use features::*;
pub use frame::Frame;
pub use metrics::{FeatureVector, HrvBackend, NativeHrv};
pub use signal::*;

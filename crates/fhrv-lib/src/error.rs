use std::path::PathBuf;
use thiserror::Error;

/// Column bookkeeping failures on a [`crate::frame::Frame`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("missing column '{column}' (available: {available:?})")]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },
}

/// Why a single window produced no HRV row.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HrvError {
    #[error("no valid peaks in window")]
    NoPeaks,
    #[error("too few beats for HRV: found {found}, need at least {required}")]
    TooFewBeats { found: usize, required: usize },
    #[error("invalid sampling rate {0}")]
    InvalidSamplingRate(f64),
    #[error(
        "RR interval of {0} ms exceeds the {max} ms limit",
        max = crate::metrics::hrv::MAX_RR_MS
    )]
    ImplausibleInterval(f64),
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("unsupported output format '{0}' (use 'csv' or 'xlsx')")]
    UnsupportedFormat(String),
    #[error("sampling rate must be positive, got {0}")]
    SamplingRate(f64),
    #[error("window size must be at least 1")]
    WindowSize,
    #[error("overlap ratio must lie in [0, 1), got {0}")]
    OverlapRatio(f64),
    #[error("condition list is empty")]
    NoConditions,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{path}: line {line} has {found} fields, expected {expected}")]
    MalformedRow {
        path: PathBuf,
        line: u64,
        found: usize,
        expected: usize,
    },
    #[error("user folder '{0}' has no numeric id after the 'user' prefix")]
    UserId(String),
    #[error("missing data folder {0}")]
    MissingFolder(PathBuf),
}

pub mod hrv;

use crate::error::HrvError;
use crate::signal::{intervals_to_peaks, Events};
use serde::{Deserialize, Serialize};

/// Ordered, named numeric features computed for one window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    entries: Vec<(String, f64)>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: f64) {
        self.entries.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| *value)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        }
    }
}

/// Peak reconstruction and HRV computation used by the window pipeline.
///
/// Implementations must be pure: the same input always yields the same output,
/// so windows can be evaluated in any order.
pub trait HrvBackend: Send + Sync {
    /// Beat positions (sample indices at `sampling_rate`) for a series of
    /// inter-beat intervals in milliseconds.
    fn intervals_to_peaks(&self, intervals_ms: &[f64], sampling_rate: f64) -> Events;

    /// Feature battery for one window of beats.
    fn hrv(&self, peaks: &Events, sampling_rate: f64) -> Result<FeatureVector, HrvError>;
}

/// Built-in backend: time-domain, Welch PSD and nonlinear metrics.
#[derive(Debug, Clone, Copy)]
pub struct NativeHrv {
    /// Resampling rate of the RR tachogram before the Welch estimate (Hz).
    pub interp_fs: f64,
}

impl Default for NativeHrv {
    fn default() -> Self {
        Self { interp_fs: 4.0 }
    }
}

impl HrvBackend for NativeHrv {
    fn intervals_to_peaks(&self, intervals_ms: &[f64], sampling_rate: f64) -> Events {
        intervals_to_peaks(intervals_ms, sampling_rate)
    }

    fn hrv(&self, peaks: &Events, sampling_rate: f64) -> Result<FeatureVector, HrvError> {
        hrv::hrv_features(peaks, sampling_rate, self.interp_fs)
    }
}

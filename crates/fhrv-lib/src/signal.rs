/// Beat occurrences on a timeline, as sample indices at a known sampling rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Events {
    pub indices: Vec<usize>,
}

impl Events {
    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// RR intervals (milliseconds)
#[derive(Debug, Clone)]
pub struct RRSeries {
    pub rr: Vec<f64>,
}

impl RRSeries {
    /// Successive peak distances converted from samples to milliseconds.
    pub fn from_events(events: &Events, fs: f64) -> Self {
        let rr = events
            .indices
            .windows(2)
            .map(|w| (w[1] as f64 - w[0] as f64) / fs * 1000.0)
            .collect();
        Self { rr }
    }

    pub fn len(&self) -> usize {
        self.rr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rr.is_empty()
    }
}

/// Rebuild beat positions from inter-beat intervals given in milliseconds.
///
/// Missing (non-finite) and non-positive intervals are dropped. The first beat
/// sits at sample 0 and every further beat at the running interval sum,
/// rounded to the nearest sample at `fs`.
pub fn intervals_to_peaks(intervals_ms: &[f64], fs: f64) -> Events {
    let valid: Vec<f64> = intervals_ms
        .iter()
        .copied()
        .filter(|v| v.is_finite() && *v > 0.0)
        .collect();
    if valid.is_empty() || !(fs.is_finite() && fs > 0.0) {
        return Events::from_indices(Vec::new());
    }
    let mut indices = Vec::with_capacity(valid.len() + 1);
    indices.push(0);
    let mut elapsed_ms = 0.0;
    for interval in valid {
        elapsed_ms += interval;
        indices.push((elapsed_ms / 1000.0 * fs).round() as usize);
    }
    Events::from_indices(indices)
}

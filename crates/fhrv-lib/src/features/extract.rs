use crate::config::PipelineConfig;
use crate::error::{FrameError, HrvError};
use crate::features::table::{HrvFeatureRow, HrvFeatureTable};
use crate::features::timestamp::Timestamp;
use crate::features::window::{window_count, windows};
use crate::frame::Frame;
use crate::metrics::HrvBackend;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;

pub const USER: &str = "User";
pub const CONDITION: &str = "Condition";
pub const TIMESTAMP: &str = "Timestamp";
pub const HR_BPM: &str = "HR_bpm";
pub const RR_INTERVAL_MS: &str = "RR_Interval_ms";

/// One ECG sample after rename, selection and timestamp normalisation.
#[derive(Debug, Clone, PartialEq)]
pub struct EcgRecord {
    pub user: String,
    pub condition: String,
    pub timestamp: Timestamp,
    /// NaN when the cell is not numeric.
    pub hr_bpm: f64,
    /// NaN when the cell is not numeric.
    pub rr_interval_ms: f64,
}

/// Typed ECG records from a frame carrying the semantic column names.
pub fn records_from_frame(frame: &Frame) -> Result<Vec<EcgRecord>, FrameError> {
    let user = frame.column_index(USER)?;
    let condition = frame.column_index(CONDITION)?;
    let timestamp = frame.column_index(TIMESTAMP)?;
    let hr = frame.column_index(HR_BPM)?;
    let rr = frame.column_index(RR_INTERVAL_MS)?;
    Ok(frame
        .rows()
        .iter()
        .map(|row| EcgRecord {
            user: row[user].clone(),
            condition: row[condition].clone(),
            timestamp: Timestamp::parse(&row[timestamp]),
            hr_bpm: parse_number(&row[hr]),
            rr_interval_ms: parse_number(&row[rr]),
        })
        .collect())
}

fn parse_number(cell: &str) -> f64 {
    cell.trim().parse::<f64>().unwrap_or(f64::NAN)
}

/// All records carrying one condition label.
#[derive(Debug, Clone)]
pub struct ConditionSubset<'a> {
    pub condition: String,
    pub records: Vec<&'a EcgRecord>,
}

/// One subset per declared condition, in declared order. A label absent from
/// the data yields an empty subset.
pub fn split_by_condition<'a>(
    records: &'a [EcgRecord],
    conditions: &[String],
) -> Vec<ConditionSubset<'a>> {
    conditions
        .iter()
        .map(|condition| ConditionSubset {
            condition: condition.clone(),
            records: records
                .iter()
                .filter(|r| &r.condition == condition)
                .collect(),
        })
        .collect()
}

impl<'a> ConditionSubset<'a> {
    /// One user's rows in time order. Rows without a valid timestamp cannot be
    /// placed and are left out; ties keep their input order.
    pub fn user_timeline(&self, user: &str) -> Vec<&'a EcgRecord> {
        let mut timeline: Vec<&'a EcgRecord> = self
            .records
            .iter()
            .copied()
            .filter(|r| r.user == user && r.timestamp.is_valid())
            .collect();
        timeline.sort_by_key(|r| r.timestamp.time());
        timeline
    }
}

/// Windows attempted and dropped for one (condition, user) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowTally {
    pub condition: String,
    pub user: String,
    pub windows: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionReport {
    #[serde(skip)]
    pub tables: Vec<HrvFeatureTable>,
    pub tallies: Vec<WindowTally>,
    /// Rows whose timestamp could not be parsed; kept out of every window.
    pub invalid_timestamps: usize,
}

impl ExtractionReport {
    pub fn skipped_windows(&self) -> usize {
        self.tallies.iter().map(|t| t.skipped).sum()
    }

    /// Skipped windows summed over every user of one condition.
    pub fn skipped_in(&self, condition: &str) -> usize {
        self.tallies
            .iter()
            .filter(|t| t.condition == condition)
            .map(|t| t.skipped)
            .sum()
    }
}

/// Turns an interim ECG frame into one HRV feature table per condition.
pub struct FeatureExtractor<B> {
    config: PipelineConfig,
    backend: B,
}

impl<B: HrvBackend> FeatureExtractor<B> {
    pub fn new(config: PipelineConfig, backend: B) -> Self {
        Self { config, backend }
    }

    /// Rename, select and type the raw interim columns.
    pub fn prepare(&self, frame: &Frame) -> Result<Vec<EcgRecord>, FrameError> {
        let selected = frame
            .rename(&self.config.column_mapping)
            .select(&self.config.selected_columns)?;
        records_from_frame(&selected)
    }

    pub fn run_file(&self, path: &Path) -> Result<ExtractionReport> {
        info!("Loading interim ECG dataset {}", path.display());
        let frame = Frame::read_csv(path)?;
        self.run(&frame)
            .with_context(|| format!("extracting features from {}", path.display()))
    }

    pub fn run(&self, frame: &Frame) -> Result<ExtractionReport, FrameError> {
        let records = self.prepare(frame)?;
        let invalid_timestamps = records.iter().filter(|r| !r.timestamp.is_valid()).count();
        if invalid_timestamps > 0 {
            warn!("{invalid_timestamps} row(s) with unparsable timestamps kept out of windows");
        }
        let mut report = ExtractionReport {
            invalid_timestamps,
            ..ExtractionReport::default()
        };
        for subset in split_by_condition(&records, &self.config.conditions) {
            let (table, tallies) = self.extract_condition(&subset);
            info!(
                "Condition {}: {} feature row(s) from {} record(s)",
                subset.condition,
                table.len(),
                subset.records.len()
            );
            report.tables.push(table);
            report.tallies.extend(tallies);
        }
        Ok(report)
    }

    /// Feature rows of every declared user for one condition.
    ///
    /// Users are evaluated in parallel; the result is collected in declared
    /// user order so the table is identical to a sequential run.
    pub fn extract_condition(
        &self,
        subset: &ConditionSubset<'_>,
    ) -> (HrvFeatureTable, Vec<WindowTally>) {
        let per_user: Vec<(Vec<HrvFeatureRow>, WindowTally)> = self
            .config
            .users
            .par_iter()
            .map(|user| self.extract_user(subset, user))
            .collect();
        let mut table = HrvFeatureTable::new(subset.condition.clone());
        let mut tallies = Vec::with_capacity(per_user.len());
        for (rows, tally) in per_user {
            table.rows.extend(rows);
            tallies.push(tally);
        }
        (table, tallies)
    }

    fn extract_user(
        &self,
        subset: &ConditionSubset<'_>,
        user: &str,
    ) -> (Vec<HrvFeatureRow>, WindowTally) {
        let timeline = subset.user_timeline(user);
        if timeline.is_empty() && subset.records.iter().any(|r| r.user == user) {
            warn!(
                "{user} / {}: no row has a parsable timestamp, nothing to window",
                subset.condition
            );
        }
        let overlap = self.config.overlap_rows();
        debug!(
            "{user} / {}: {} row(s), {} window(s)",
            subset.condition,
            timeline.len(),
            window_count(timeline.len(), self.config.window_size, overlap)
        );
        let mut rows = Vec::new();
        let mut tally = WindowTally {
            condition: subset.condition.clone(),
            user: user.to_string(),
            windows: 0,
            skipped: 0,
        };
        for (index, window) in windows(&timeline, self.config.window_size, overlap).enumerate() {
            tally.windows += 1;
            match self.window_features(window, user, &subset.condition) {
                Ok(row) => rows.push(row),
                Err(err) => {
                    tally.skipped += 1;
                    warn!(
                        "Skipping window {index} of {user} / {}: {err}",
                        subset.condition
                    );
                }
            }
        }
        if tally.skipped > 0 {
            info!(
                "{user} / {}: skipped {} of {} window(s)",
                subset.condition, tally.skipped, tally.windows
            );
        }
        (rows, tally)
    }

    /// Peaks, HRV battery and tags for one window.
    pub fn window_features(
        &self,
        window: &[&EcgRecord],
        user: &str,
        condition: &str,
    ) -> Result<HrvFeatureRow, HrvError> {
        let intervals: Vec<f64> = window.iter().map(|r| r.rr_interval_ms).collect();
        let peaks = self
            .backend
            .intervals_to_peaks(&intervals, self.config.sampling_rate);
        if peaks.is_empty() {
            return Err(HrvError::NoPeaks);
        }
        let features = self.backend.hrv(&peaks, self.config.sampling_rate)?;
        Ok(HrvFeatureRow {
            user: user.to_string(),
            condition: condition.to_string(),
            ecg_rate_mean: finite_mean(window.iter().map(|r| r.hr_bpm)),
            features,
        })
    }
}

fn finite_mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

use crate::metrics::FeatureVector;
use serde::Serialize;

/// Leading columns every feature row carries ahead of its HRV metrics.
pub const TAG_COLUMNS: [&str; 3] = ["User", "Condition", "ECG_Rate_Mean"];

/// HRV metrics of one window, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HrvFeatureRow {
    pub user: String,
    pub condition: String,
    /// Mean heart rate (bpm) over the window's rows.
    pub ecg_rate_mean: f64,
    pub features: FeatureVector,
}

/// One typed output cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Text(&'a str),
    Number(f64),
    Empty,
}

impl Cell<'_> {
    /// Text form used by delimited output; missing and NaN values stay empty.
    pub fn render(&self) -> String {
        match self {
            Cell::Text(text) => text.to_string(),
            Cell::Number(value) if value.is_nan() => String::new(),
            Cell::Number(value) => value.to_string(),
            Cell::Empty => String::new(),
        }
    }
}

/// All feature rows for one condition, in (user list, window index) order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HrvFeatureTable {
    pub condition: String,
    pub rows: Vec<HrvFeatureRow>,
}

impl HrvFeatureTable {
    pub fn new(condition: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Union of feature names across rows, in first-seen order.
    pub fn feature_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for row in &self.rows {
            for name in row.features.names() {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    pub fn columns(&self) -> Vec<&str> {
        TAG_COLUMNS
            .iter()
            .copied()
            .chain(self.feature_names())
            .collect()
    }

    /// Rows laid out against [`Self::columns`]; absent features are empty.
    pub fn cells(&self) -> Vec<Vec<Cell<'_>>> {
        let names = self.feature_names();
        self.rows
            .iter()
            .map(|row| {
                let mut cells = vec![
                    Cell::Text(&row.user),
                    Cell::Text(&row.condition),
                    Cell::Number(row.ecg_rate_mean),
                ];
                cells.extend(
                    names
                        .iter()
                        .map(|name| row.features.get(name).map_or(Cell::Empty, Cell::Number)),
                );
                cells
            })
            .collect()
    }
}

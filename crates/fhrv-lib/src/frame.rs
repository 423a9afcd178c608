use crate::error::FrameError;
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::collections::BTreeMap;
use std::path::Path;

/// Named-column table of raw text cells, the shape an interim CSV reads back as.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Frame {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, FrameError> {
        if let Some((row, cells)) = rows
            .iter()
            .enumerate()
            .find(|(_, cells)| cells.len() != columns.len())
        {
            return Err(FrameError::RaggedRow {
                row,
                found: cells.len(),
                expected: columns.len(),
            });
        }
        Ok(Self { columns, rows })
    }

    /// Load a headered CSV file, every cell kept as text.
    pub fn read_csv(path: &Path) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .with_context(|| format!("opening {}", path.display()))?;
        let columns: Vec<String> = reader
            .headers()
            .with_context(|| format!("reading header of {}", path.display()))?
            .iter()
            .map(str::to_string)
            .collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.with_context(|| format!("reading record in {}", path.display()))?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self::new(columns, rows)?)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Result<usize, FrameError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| FrameError::MissingColumn {
                column: name.to_string(),
                available: self.columns.clone(),
            })
    }

    /// Same rows, columns renamed through `mapping`; unmapped names are kept.
    pub fn rename(&self, mapping: &BTreeMap<String, String>) -> Frame {
        let columns = self
            .columns
            .iter()
            .map(|c| mapping.get(c).cloned().unwrap_or_else(|| c.clone()))
            .collect();
        Frame {
            columns,
            rows: self.rows.clone(),
        }
    }

    /// Project onto `columns`, in the order given.
    pub fn select<S: AsRef<str>>(&self, columns: &[S]) -> Result<Frame, FrameError> {
        let indices = columns
            .iter()
            .map(|c| self.column_index(c.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Ok(Frame {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Frame {
        Frame::new(
            vec!["User".into(), "Column2".into(), "Column6".into()],
            vec![
                vec!["user0".into(), "72".into(), "830".into()],
                vec!["user1".into(), "65".into(), "910".into()],
            ],
        )
        .unwrap()
    }

    fn mapping() -> BTreeMap<String, String> {
        [("Column2", "HR_bpm"), ("Column6", "RR_Interval_ms")]
            .into_iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    #[test]
    fn rename_keeps_rows() {
        let renamed = sample().rename(&mapping());
        assert_eq!(renamed.columns(), ["User", "HR_bpm", "RR_Interval_ms"]);
        assert_eq!(renamed.rows(), sample().rows());
    }

    #[test]
    fn select_projects_in_requested_order() {
        let selected = sample()
            .rename(&mapping())
            .select(&["RR_Interval_ms", "User"])
            .unwrap();
        assert_eq!(selected.columns(), ["RR_Interval_ms", "User"]);
        assert_eq!(selected.rows()[1], vec!["910".to_string(), "user1".to_string()]);
    }

    #[test]
    fn select_is_idempotent() {
        let cols = ["User", "HR_bpm"];
        let once = sample().rename(&mapping()).select(&cols).unwrap();
        let twice = once.select(&cols).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn select_reports_missing_column() {
        let err = sample().select(&["Timestamp"]).unwrap_err();
        assert_eq!(
            err,
            FrameError::MissingColumn {
                column: "Timestamp".into(),
                available: vec!["User".into(), "Column2".into(), "Column6".into()],
            }
        );
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = Frame::new(vec!["a".into(), "b".into()], vec![vec!["1".into()]]).unwrap_err();
        assert_eq!(
            err,
            FrameError::RaggedRow {
                row: 0,
                found: 1,
                expected: 2
            }
        );
    }
}

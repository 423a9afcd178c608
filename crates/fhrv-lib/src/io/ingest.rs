use crate::error::IngestError;
use crate::io::dataset::{FlatDataset, RawSample};
use anyhow::{bail, Context, Result};
use csv::ReaderBuilder;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

/// Kind of recording, which also names its per-user subfolder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Ecg,
    EdaEmg,
}

impl DataType {
    pub fn folder_name(&self) -> &'static str {
        match self {
            DataType::Ecg => "ECG_Analysis",
            DataType::EdaEmg => "EDA-EMG",
        }
    }

    /// Columns of one raw line, timestamp first.
    pub fn raw_columns(&self) -> &'static [&'static str] {
        match self {
            DataType::Ecg => &[
                "Timestamp", "Column2", "Column3", "Column4", "Column5", "Column6",
            ],
            DataType::EdaEmg => &["Timestamp", "Column2", "Column3", "Column4"],
        }
    }

    /// Interim CSV header: tags followed by the raw columns.
    pub fn header(&self) -> Vec<&'static str> {
        let mut header = vec!["User", "Condition"];
        header.extend_from_slice(self.raw_columns());
        header
    }
}

/// Which slice of the numerically sorted user folders to ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRange {
    /// Sorted positions `0..30`.
    First30,
    /// Sorted positions `29..60`; position 29 is shared with [`UserRange::First30`].
    Last30,
}

impl UserRange {
    pub fn bounds(&self) -> (usize, usize) {
        match self {
            UserRange::First30 => (0, 30),
            UserRange::Last30 => (29, 60),
        }
    }

    pub fn apply<T>(&self, sorted: Vec<T>) -> Vec<T> {
        let (start, end) = self.bounds();
        sorted.into_iter().take(end).skip(start).collect()
    }
}

/// Walks `<root>/user<N>/<data type>/<user>_<condition>.txt`.
#[derive(Debug, Clone)]
pub struct Ingestor {
    root: PathBuf,
}

impl Ingestor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// User folder names in the selected range, ordered by numeric id.
    pub fn user_folders(&self, range: UserRange) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("failed to read input folder {}", self.root.display()))?;
        let mut users = Vec::new();
        for entry in entries {
            let entry = entry.with_context(|| format!("listing {}", self.root.display()))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with("user") || !entry.path().is_dir() {
                continue;
            }
            let id = user_id(&name)?;
            users.push((id, name));
        }
        users.sort();
        Ok(range
            .apply(users)
            .into_iter()
            .map(|(_, name)| name)
            .collect())
    }

    /// Concatenate every condition file of every selected user.
    pub fn process(
        &self,
        data_type: DataType,
        delimiter: char,
        range: UserRange,
    ) -> Result<FlatDataset> {
        let mut dataset = FlatDataset::new(data_type);
        for user in self.user_folders(range)? {
            info!("Getting data for {user} ...");
            let folder = self.root.join(&user).join(data_type.folder_name());
            if !folder.is_dir() {
                return Err(IngestError::MissingFolder(folder).into());
            }
            for (condition, path) in condition_files(&folder, &user)? {
                for values in read_raw_file(&path, data_type, delimiter)? {
                    let mut values = values.into_iter();
                    let timestamp = values.next().unwrap_or_default();
                    dataset.samples.push(RawSample {
                        user: user.clone(),
                        condition: condition.clone(),
                        timestamp,
                        values: values.collect(),
                    });
                }
            }
        }
        info!(
            "Collected {} {} sample(s)",
            dataset.len(),
            data_type.folder_name()
        );
        Ok(dataset)
    }
}

fn user_id(name: &str) -> Result<u64, IngestError> {
    name["user".len()..]
        .parse()
        .map_err(|_| IngestError::UserId(name.to_string()))
}

/// `(condition, path)` for each `.txt` file in `folder`, sorted by file name.
fn condition_files(folder: &Path, user: &str) -> Result<Vec<(String, PathBuf)>> {
    let prefix = format!("{user}_");
    let mut files = Vec::new();
    for entry in fs::read_dir(folder).with_context(|| format!("listing {}", folder.display()))? {
        let path = entry
            .with_context(|| format!("listing {}", folder.display()))?
            .path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(stem) = name.strip_suffix(".txt") else {
            continue;
        };
        let condition = stem.strip_prefix(&prefix).unwrap_or(stem).to_string();
        files.push((condition, path));
    }
    files.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(files)
}

/// Every line of a headerless raw file, checked against the data type's width.
pub fn read_raw_file(
    path: &Path,
    data_type: DataType,
    delimiter: char,
) -> Result<Vec<Vec<String>>> {
    if !delimiter.is_ascii() {
        bail!("delimiter {delimiter:?} is not a single-byte character");
    }
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter as u8)
        .from_path(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let expected = data_type.raw_columns().len();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("reading {}", path.display()))?;
        if record.len() != expected {
            return Err(IngestError::MalformedRow {
                path: path.to_path_buf(),
                line: record.position().map_or(0, |p| p.line()),
                found: record.len(),
                expected,
            }
            .into());
        }
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

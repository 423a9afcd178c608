use crate::io::ingest::DataType;
use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use std::fs;
use std::path::Path;

/// One line of a raw recording, tagged with who and under which condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSample {
    pub user: String,
    pub condition: String,
    pub timestamp: String,
    /// Remaining raw fields (`Column2..`), untouched.
    pub values: Vec<String>,
}

impl RawSample {
    fn to_record(&self) -> Vec<&str> {
        let mut record = vec![
            self.user.as_str(),
            self.condition.as_str(),
            self.timestamp.as_str(),
        ];
        record.extend(self.values.iter().map(String::as_str));
        record
    }
}

/// All samples of one data type, in ingestion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatDataset {
    pub data_type: DataType,
    pub samples: Vec<RawSample>,
}

impl FlatDataset {
    pub fn new(data_type: DataType) -> Self {
        Self {
            data_type,
            samples: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Write the interim CSV, creating its parent directory if needed.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut writer = WriterBuilder::new()
            .from_path(path)
            .with_context(|| format!("creating {}", path.display()))?;
        writer.write_record(self.data_type.header())?;
        for sample in &self.samples {
            writer.write_record(sample.to_record())?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Read an interim CSV written by [`Self::write_csv`].
    pub fn read_csv(path: &Path, data_type: DataType) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .with_context(|| format!("opening interim dataset {}", path.display()))?;
        let header = reader.headers()?.clone();
        let expected = data_type.header();
        if header.iter().ne(expected.iter().copied()) {
            bail!(
                "{}: header {:?} does not match {:?}",
                path.display(),
                header,
                expected
            );
        }
        let mut dataset = Self::new(data_type);
        for record in reader.records() {
            let record =
                record.with_context(|| format!("reading record in {}", path.display()))?;
            let mut fields = record.iter().map(str::to_string);
            let (Some(user), Some(condition), Some(timestamp)) =
                (fields.next(), fields.next(), fields.next())
            else {
                bail!("{}: short record {:?}", path.display(), record.position());
            };
            dataset.samples.push(RawSample {
                user,
                condition,
                timestamp,
                values: fields.collect(),
            });
        }
        Ok(dataset)
    }
}

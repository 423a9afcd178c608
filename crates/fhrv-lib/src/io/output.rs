use crate::error::ConfigError;
use crate::features::table::{Cell, HrvFeatureTable};
use anyhow::{Context, Result};
use csv::WriterBuilder;
use rust_xlsxwriter::Workbook;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Xlsx,
}

impl OutputFormat {
    /// Accepts `csv`/`xlsx`, with or without the leading dot.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "xlsx" => Ok(OutputFormat::Xlsx),
            _ => Err(ConfigError::UnsupportedFormat(value.to_string())),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Xlsx => "xlsx",
        }
    }
}

/// Write `table` to `<dir>/<stem>.<ext>`, creating `dir` as needed.
pub fn save_table(
    table: &HrvFeatureTable,
    stem: &str,
    format: OutputFormat,
    dir: &Path,
) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(format!("{stem}.{}", format.extension()));
    let written = match format {
        OutputFormat::Csv => write_csv(&path, table),
        OutputFormat::Xlsx => write_xlsx(&path, table),
    };
    written.with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

pub fn write_csv(path: &Path, table: &HrvFeatureTable) -> Result<()> {
    let mut writer = WriterBuilder::new().from_path(path)?;
    writer.write_record(table.columns())?;
    for row in table.cells() {
        writer.write_record(row.iter().map(Cell::render))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_xlsx(path: &Path, table: &HrvFeatureTable) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, name) in table.columns().into_iter().enumerate() {
        sheet.write_string(0, col as u16, name)?;
    }
    for (r, row) in table.cells().iter().enumerate() {
        let r = r as u32 + 1;
        for (col, cell) in row.iter().enumerate() {
            let col = col as u16;
            match cell {
                Cell::Text(text) => {
                    sheet.write_string(r, col, *text)?;
                }
                Cell::Number(value) if value.is_finite() => {
                    sheet.write_number(r, col, *value)?;
                }
                Cell::Number(_) | Cell::Empty => {}
            }
        }
    }
    workbook.save(path)?;
    Ok(())
}

#[cfg(feature = "polars")]
pub mod polars_io {
    use crate::features::table::{Cell, HrvFeatureTable};
    use crate::frame::Frame;
    use anyhow::Result;
    use polars::prelude::*;

    /// Load an interim dataset with polars' CSV reader, all columns as text.
    pub fn load_interim(path: &str) -> Result<DataFrame> {
        let df = CsvReadOptions::default()
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(path.into()))?
            .finish()?;
        Ok(df)
    }

    /// Text columns of a [`Frame`] as a polars frame.
    pub fn frame_to_polars(frame: &Frame) -> Result<DataFrame> {
        let columns = frame
            .columns()
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let values: Vec<&str> = frame.rows().iter().map(|row| row[i].as_str()).collect();
                Series::new(name.as_str().into(), values)
            })
            .collect::<Vec<_>>();
        Ok(DataFrame::new(columns)?)
    }

    /// Feature table with string tag columns and nullable float metrics.
    pub fn features_to_polars(table: &HrvFeatureTable) -> Result<DataFrame> {
        let cells = table.cells();
        let columns = table
            .columns()
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                if i < 2 {
                    let values: Vec<&str> = cells
                        .iter()
                        .map(|row| match row[i] {
                            Cell::Text(text) => text,
                            _ => "",
                        })
                        .collect();
                    Series::new(name.into(), values)
                } else {
                    let values: Vec<Option<f64>> = cells
                        .iter()
                        .map(|row| match row[i] {
                            Cell::Number(v) if !v.is_nan() => Some(v),
                            _ => None,
                        })
                        .collect();
                    Series::new(name.into(), values)
                }
            })
            .collect::<Vec<_>>();
        Ok(DataFrame::new(columns)?)
    }

}

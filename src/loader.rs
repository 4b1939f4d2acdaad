use crate::{Error, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Reads a `.parquet` or `.csv` file into a frame.
pub fn load_table(path: &Path) -> Result<DataFrame> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    let loaded = match extension.as_deref() {
        Some("parquet") => read_parquet(path),
        Some("csv") => read_csv(path),
        _ => {
            return Err(Error::InputConversion {
                path: path.to_path_buf(),
                reason: "unsupported extension, expected .parquet or .csv".to_string(),
            });
        }
    };

    let df = loaded.map_err(|err| Error::InputConversion {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;

    debug!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "Loaded table"
    );

    Ok(df)
}

fn read_parquet(path: &Path) -> Result<DataFrame> {
    let mut file = File::open(path)?;
    let df = ParquetReader::new(&mut file).finish()?;
    Ok(df)
}

pub(crate) fn read_csv(path: &Path) -> Result<DataFrame> {
    let df = CsvReader::from_path(path)?.has_header(true).finish()?;
    Ok(df)
}

// src/process/write.rs

use anyhow::{Context, Result};
use arrow::{csv::WriterBuilder, record_batch::RecordBatch};
use std::{fs, io::Write, path::Path};
use tracing::{debug, instrument};

use crate::schema::tables::{ESCAPE_CHAR, QUOTE_CHAR, SEPARATOR_CHAR};

/// Serialize `batch` as CSV without a header row, quoting and escaping the
/// way the table's OpenCSVSerde reads it back.
pub fn to_csv_bytes(batch: &RecordBatch) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut writer = WriterBuilder::new()
            .with_header(false)
            .with_delimiter(SEPARATOR_CHAR)
            .with_quote(QUOTE_CHAR)
            .with_escape(ESCAPE_CHAR)
            .with_double_quote(false)
            .build(&mut buf);
        writer.write(batch).context("writing CSV batch")?;
    }
    Ok(buf)
}

/// Write `batch` to `path` as headerless CSV, returning the bytes written.
#[instrument(level = "debug", skip(batch), fields(path = %path.display(), rows = batch.num_rows()))]
pub fn write_headerless_csv(batch: &RecordBatch, path: &Path) -> Result<Vec<u8>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    let bytes = to_csv_bytes(batch)?;
    let mut file =
        fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    file.write_all(&bytes)
        .with_context(|| format!("writing {}", path.display()))?;
    file.sync_all()?;
    debug!(bytes = bytes.len(), "wrote CSV");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn sample() -> Result<RecordBatch> {
        Ok(RecordBatch::try_from_iter(vec![
            (
                "Province_State",
                Arc::new(StringArray::from(vec![Some("acre"), None])) as ArrayRef,
            ),
            (
                "Confirmed",
                Arc::new(Int64Array::from(vec![8127, 5])) as ArrayRef,
            ),
            (
                "Incidence_Rate",
                Arc::new(Float64Array::from(vec![Some(921.5163), None])) as ArrayRef,
            ),
        ])?)
    }

    #[test]
    fn output_has_no_header_row() -> Result<()> {
        let text = String::from_utf8(to_csv_bytes(&sample()?)?)?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["acre,8127,921.5163", ",5,"]);
        Ok(())
    }

    #[test]
    fn file_matches_returned_bytes() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("out.csv");
        let bytes = write_headerless_csv(&sample()?, &path)?;
        assert_eq!(fs::read(&path)?, bytes);
        Ok(())
    }
}

use anyhow::{anyhow, Result};
use arrow::{
    array::{Array, StringArray},
    record_batch::RecordBatch,
};

/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Borrow column `name` of `batch` as text.
pub fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    let idx = batch.schema().index_of(name)?;
    batch
        .column(idx)
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| anyhow!("column {} is not text", name))
}

/// Rows of an all-text batch, e.g. a query result.
pub fn string_rows(batch: &RecordBatch) -> Result<Vec<Vec<Option<String>>>> {
    let columns = batch
        .columns()
        .iter()
        .enumerate()
        .map(|(i, col)| {
            col.as_any().downcast_ref::<StringArray>().ok_or_else(|| {
                anyhow!("column {} is not text", batch.schema().field(i).name())
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((0..batch.num_rows())
        .map(|row| {
            columns
                .iter()
                .map(|col| {
                    if col.is_null(row) {
                        None
                    } else {
                        Some(col.value(row).to_string())
                    }
                })
                .collect()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_str_strips_quotes_and_whitespace() {
        assert_eq!(clean_str("  \"Brazil\" "), "Brazil");
        assert_eq!(clean_str("Acre"), "Acre");
        assert_eq!(clean_str("\""), "\"");
    }
}

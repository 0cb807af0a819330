// src/cloud/mod.rs

use anyhow::{bail, Context, Result};
use arrow::{
    array::{ArrayRef, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

use crate::schema::{Column, TableSpec};

pub mod athena;
pub mod aws;
pub mod glue;
pub mod memory;
#[cfg(test)]
pub(crate) mod replay;
pub mod s3;

/// Bucket/object side of the pipeline.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create `bucket` unless the caller already owns it. Returns true when created.
    async fn ensure_bucket(&self, bucket: &str) -> Result<bool>;

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()>;
}

/// What `Catalog::upsert_table` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableAction {
    Created,
    Updated,
}

/// Database/table metadata service.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Create `name` unless it exists. Returns true when created.
    async fn ensure_database(&self, name: &str, description: &str) -> Result<bool>;

    async fn upsert_table(&self, database: &str, table: &TableSpec) -> Result<TableAction>;

    /// Columns of a registered table, in storage order, or None if absent.
    async fn table_columns(&self, database: &str, table: &str) -> Result<Option<Vec<Column>>>;
}

/// SQL engine over catalog tables. Results come back as text columns.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    async fn query(&self, database: &str, sql: &str) -> Result<RecordBatch>;
}

/// Double-quote an identifier, doubling embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// `SELECT *` over a table by the name the catalog stores it under.
pub fn select_all_sql(database: &str, table: &str, limit: u32) -> String {
    format!(
        "SELECT * FROM {}.{} LIMIT {}",
        quote_ident(database),
        quote_ident(&table.to_lowercase()),
        limit
    )
}

/// Split `s3://bucket/some/prefix/` into `("bucket", "some/prefix/")`.
pub fn split_s3_uri(uri: &str) -> Result<(String, String)> {
    let url = Url::parse(uri).with_context(|| format!("parsing {}", uri))?;
    if url.scheme() != "s3" {
        bail!("{} is not an s3:// URI", uri);
    }
    let bucket = match url.host_str() {
        Some(b) if !b.is_empty() => b.to_string(),
        _ => bail!("{} has no bucket", uri),
    };
    let prefix = url.path().trim_start_matches('/').to_string();
    Ok((bucket, prefix))
}

/// Build an all-text batch from result rows.
pub fn text_batch(columns: &[String], rows: &[Vec<Option<String>>]) -> Result<RecordBatch> {
    let fields: Vec<Field> = columns
        .iter()
        .map(|n| Field::new(n, DataType::Utf8, true))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    for (i, row) in rows.iter().enumerate() {
        if row.len() != columns.len() {
            bail!(
                "result row {} has {} values for {} columns",
                i,
                row.len(),
                columns.len()
            );
        }
    }

    let arrays: Vec<ArrayRef> = (0..columns.len())
        .map(|c| {
            Arc::new(rows.iter().map(|r| r[c].as_deref()).collect::<StringArray>()) as ArrayRef
        })
        .collect();

    if arrays.is_empty() {
        return Ok(RecordBatch::new_empty(schema));
    }
    RecordBatch::try_new(schema, arrays).context("building result batch")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_uses_lowercased_table_name() {
        assert_eq!(
            select_all_sql("nina-teste", "Covid Data", 10),
            r#"SELECT * FROM "nina-teste"."covid data" LIMIT 10"#
        );
        assert_eq!(quote_ident(r#"a"b"#), r#""a""b""#);
    }

    #[test]
    fn s3_uri_splits_into_bucket_and_prefix() -> Result<()> {
        assert_eq!(
            split_s3_uri("s3://teste-nina/covid-data/")?,
            ("teste-nina".to_string(), "covid-data/".to_string())
        );
        assert_eq!(
            split_s3_uri("s3://teste-nina-agg/")?,
            ("teste-nina-agg".to_string(), String::new())
        );
        assert!(split_s3_uri("https://teste-nina/").is_err());
        Ok(())
    }

    #[test]
    fn text_batch_checks_row_width() -> Result<()> {
        let cols = vec!["a".to_string(), "b".to_string()];
        let batch = text_batch(&cols, &[vec![Some("1".into()), None]])?;
        assert_eq!(batch.num_rows(), 1);
        assert!(text_batch(&cols, &[vec![Some("1".into())]]).is_err());

        let empty = text_batch(&cols, &[])?;
        assert_eq!(empty.num_rows(), 0);
        assert_eq!(empty.num_columns(), 2);
        Ok(())
    }
}

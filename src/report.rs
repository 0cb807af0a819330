// src/report.rs

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{fs, io::Write, path::Path, path::PathBuf};

use crate::{cloud::TableAction, process::Totals};

/// Outcome of one upload/register/query cycle.
#[derive(Debug, Clone, Serialize)]
pub struct PublishedTable {
    pub database: String,
    pub table: String,
    pub location: String,
    pub bucket: String,
    pub key: String,
    pub local_file: PathBuf,
    pub rows: usize,
    pub bytes: usize,
    pub bucket_created: bool,
    pub table_action: TableAction,
    pub query: String,
    pub query_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dataset_url: String,
    pub country_filter: String,
    pub rows_fetched: usize,
    pub rows_retained: usize,
    pub database_created: bool,
    pub totals: Totals,
    pub raw: PublishedTable,
    pub aggregate: PublishedTable,
}

impl RunReport {
    /// Pretty-printed JSON with a trailing newline.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        let mut file = fs::File::create(path)
            .with_context(|| format!("creating report {}", path.display()))?;
        serde_json::to_writer_pretty(&mut file, self).context("serializing run report")?;
        file.write_all(b"\n")?;
        Ok(())
    }
}

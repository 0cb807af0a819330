// src/config.rs

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

const DEFAULT_DATASET_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_daily_reports/06-18-2020.csv";

/// Everything a run needs. `Default` is the stock Brazil pipeline; a TOML
/// file may override any subset of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub region: String,
    /// Directory for the intermediate CSV files.
    pub work_dir: PathBuf,
    pub dataset: DatasetConfig,
    pub catalog: CatalogConfig,
    pub raw: TargetConfig,
    pub aggregate: TargetConfig,
    pub query: QueryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub url: String,
    /// Case-sensitive substring a row's country must contain.
    pub country_filter: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub database: String,
    pub description: String,
}

/// Where one dataset lands: local file, bucket/key and catalog table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub bucket: String,
    /// Key prefix; the table location is `s3://<bucket>/<prefix>`.
    pub prefix: String,
    pub key: String,
    pub local_file: String,
    pub table: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Where the query service writes result files.
    pub staging_dir: String,
    pub limit: u32,
    pub poll_interval_ms: u64,
    pub max_wait_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".into(),
            work_dir: PathBuf::from("."),
            dataset: DatasetConfig {
                url: DEFAULT_DATASET_URL.into(),
                country_filter: "Brazil".into(),
            },
            catalog: CatalogConfig {
                database: "nina-teste".into(),
                description: "Database with covid informations".into(),
            },
            raw: TargetConfig {
                bucket: "teste-nina".into(),
                prefix: "covid-data/".into(),
                key: "covid-brasil-report.csv".into(),
                local_file: "covid-brasil-data.csv".into(),
                table: "Covid Data".into(),
                description: "Covid informations of Brazil".into(),
            },
            aggregate: TargetConfig {
                bucket: "teste-nina-agg".into(),
                prefix: String::new(),
                key: "covid-brasil-agg-report.csv".into(),
                local_file: "covid-brasil-agg.csv".into(),
                table: "aggregation".into(),
                description: "Covid totals of Brazil".into(),
            },
            query: QueryConfig {
                staging_dir: "s3://teste-nina/athena-results/".into(),
                limit: 10,
                poll_interval_ms: 500,
                max_wait_secs: 300,
            },
        }
    }
}

impl TargetConfig {
    pub fn object_key(&self) -> String {
        format!("{}{}", normalize_prefix(&self.prefix), self.key)
    }

    pub fn location(&self) -> String {
        format!("s3://{}/{}", self.bucket, normalize_prefix(&self.prefix))
    }

    pub fn local_path(&self, work_dir: &Path) -> PathBuf {
        work_dir.join(&self.local_file)
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}/", trimmed)
    }
}

impl PipelineConfig {
    /// Read a TOML file and lay it over the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let overrides: toml::Value = toml::from_str(text)?;
        let mut merged =
            toml::Value::try_from(Self::default()).context("serializing default config")?;
        merge(&mut merged, overrides);
        merged
            .try_into::<Self>()
            .context("decoding merged config")
    }

    pub fn validate(&self) -> Result<()> {
        for (what, value) in [
            ("region", &self.region),
            ("dataset.url", &self.dataset.url),
            ("dataset.country_filter", &self.dataset.country_filter),
            ("catalog.database", &self.catalog.database),
            ("raw.bucket", &self.raw.bucket),
            ("raw.key", &self.raw.key),
            ("raw.table", &self.raw.table),
            ("aggregate.bucket", &self.aggregate.bucket),
            ("aggregate.key", &self.aggregate.key),
            ("aggregate.table", &self.aggregate.table),
        ] {
            if value.trim().is_empty() {
                bail!("{} must not be empty", what);
            }
        }
        if self.raw.table.eq_ignore_ascii_case(&self.aggregate.table) {
            bail!("raw and aggregate tables share the name {}", self.raw.table);
        }
        let (raw, agg) = (self.raw.location(), self.aggregate.location());
        if raw.starts_with(&agg) || agg.starts_with(&raw) {
            bail!("raw table location {} overlaps aggregate location {}", raw, agg);
        }
        if self.query.limit == 0 {
            bail!("query.limit must be positive");
        }
        if !self.query.staging_dir.starts_with("s3://") {
            bail!("query.staging_dir must be an s3:// URI");
        }
        for target in [&self.raw, &self.aggregate] {
            if self.query.staging_dir.starts_with(&target.location()) {
                bail!(
                    "query.staging_dir {} lies inside table location {}",
                    self.query.staging_dir,
                    target.location()
                );
            }
        }
        Ok(())
    }
}

/// Recursively overlay `overrides` onto `base`; tables merge, everything else replaces.
fn merge(base: &mut toml::Value, overrides: toml::Value) {
    match (base, overrides) {
        (toml::Value::Table(base), toml::Value::Table(overrides)) => {
            for (k, v) in overrides {
                match base.get_mut(&k) {
                    Some(existing) => merge(existing, v),
                    None => {
                        base.insert(k, v);
                    }
                }
            }
        }
        (base, overrides) => *base = overrides,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_are_valid() -> Result<()> {
        let cfg = PipelineConfig::default();
        cfg.validate()?;
        assert_eq!(cfg.raw.location(), "s3://teste-nina/covid-data/");
        assert_eq!(cfg.raw.object_key(), "covid-data/covid-brasil-report.csv");
        assert_eq!(cfg.aggregate.location(), "s3://teste-nina-agg/");
        assert_eq!(cfg.aggregate.object_key(), "covid-brasil-agg-report.csv");
        Ok(())
    }

    #[test]
    fn partial_section_keeps_its_own_defaults() -> Result<()> {
        let cfg = PipelineConfig::from_toml_str(
            r#"
            region = "sa-east-1"

            [aggregate]
            bucket = "other-agg"
            "#,
        )?;
        assert_eq!(cfg.region, "sa-east-1");
        assert_eq!(cfg.aggregate.bucket, "other-agg");
        assert_eq!(cfg.aggregate.table, "aggregation");
        assert_eq!(cfg.raw, PipelineConfig::default().raw);
        Ok(())
    }

    #[test]
    fn load_reads_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("pipeline.toml");
        fs::write(&path, "[dataset]\ncountry_filter = \"Chile\"\n")?;
        let cfg = PipelineConfig::load(&path)?;
        assert_eq!(cfg.dataset.country_filter, "Chile");
        assert_eq!(cfg.dataset.url, DEFAULT_DATASET_URL);
        Ok(())
    }

    #[test]
    fn staging_inside_table_location_is_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.query.staging_dir = "s3://teste-nina-agg/results/".into();
        assert!(cfg.validate().is_err());

        let mut cfg = PipelineConfig::default();
        cfg.raw.prefix = String::new();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn nested_table_locations_are_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.raw.prefix = String::new();
        cfg.aggregate.bucket = cfg.raw.bucket.clone();
        cfg.aggregate.prefix = "agg/".into();
        cfg.query.staging_dir = "s3://results-bucket/".into();
        assert!(cfg.validate().is_err());

        // and the other way round
        let mut cfg = PipelineConfig::default();
        cfg.aggregate.bucket = cfg.raw.bucket.clone();
        cfg.aggregate.prefix = "covid-data/agg/".into();
        assert!(cfg.validate().is_err());

        // siblings under one bucket are fine
        let mut cfg = PipelineConfig::default();
        cfg.aggregate.bucket = cfg.raw.bucket.clone();
        cfg.aggregate.prefix = "covid-agg/".into();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn prefix_slashes_are_normalized() {
        let mut target = PipelineConfig::default().raw;
        target.prefix = "/a/b".into();
        assert_eq!(target.object_key(), "a/b/covid-brasil-report.csv");
        assert_eq!(target.location(), "s3://teste-nina/a/b/");
    }
}

// src/pipeline.rs

use anyhow::{anyhow, Context, Result};
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use reqwest::Client;
use tracing::{debug, info, instrument};

use crate::{
    cloud::{select_all_sql, Catalog, ObjectStore, QueryEngine},
    config::{PipelineConfig, TargetConfig},
    fetch,
    process::{self, utils::string_rows},
    report::{PublishedTable, RunReport},
    schema::{
        aggregate_table, raw_table, tables::COUNTRY_REGION, verify_batch, verify_columns,
        TableSpec,
    },
};

/// Fetch → filter/cast → publish raw → aggregate → publish aggregate.
pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
    store: &'a dyn ObjectStore,
    catalog: &'a dyn Catalog,
    query: &'a dyn QueryEngine,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        store: &'a dyn ObjectStore,
        catalog: &'a dyn Catalog,
        query: &'a dyn QueryEngine,
    ) -> Self {
        Self {
            config,
            store,
            catalog,
            query,
        }
    }

    pub fn raw_spec(&self) -> TableSpec {
        let t = &self.config.raw;
        raw_table(&t.table, &t.description, &t.location())
    }

    pub fn aggregate_spec(&self) -> TableSpec {
        let t = &self.config.aggregate;
        aggregate_table(&t.table, &t.description, &t.location())
    }

    /// Download the configured dataset and run every stage on it.
    pub async fn run(&self, client: &Client) -> Result<RunReport> {
        let text = fetch::fetch_csv(client, &self.config.dataset.url).await?;
        self.run_with_csv(&text).await
    }

    /// Load, project, filter and cast. Returns the typed batch and the number of rows loaded.
    #[instrument(level = "info", skip(self, text))]
    pub fn prepare(&self, text: &str) -> Result<(RecordBatch, usize)> {
        let spec = self.raw_spec();
        let loaded = process::read_csv(text)?;
        let fetched = loaded.num_rows();

        let projected = process::project(&loaded, &spec.column_names())?;
        let filtered = process::filter_contains(
            &projected,
            COUNTRY_REGION,
            &self.config.dataset.country_filter,
        )?;
        let typed = process::coerce(&filtered, &spec)?;

        info!(
            fetched,
            retained = typed.num_rows(),
            filter = %self.config.dataset.country_filter,
            "prepared dataset"
        );
        Ok((typed, fetched))
    }

    pub async fn run_with_csv(&self, text: &str) -> Result<RunReport> {
        let started_at = Utc::now();
        let (typed, rows_fetched) = self.prepare(text)?;

        let database_created = self
            .catalog
            .ensure_database(&self.config.catalog.database, &self.config.catalog.description)
            .await?;

        let raw = self
            .publish(&typed, &self.raw_spec(), &self.config.raw)
            .await
            .context("publishing raw table")?;

        let agg_spec = self.aggregate_spec();
        let (summary, totals) = process::summarize(&typed, &agg_spec)?;
        let aggregate = self
            .publish(&summary, &agg_spec, &self.config.aggregate)
            .await
            .context("publishing aggregate table")?;

        Ok(RunReport {
            started_at,
            finished_at: Utc::now(),
            dataset_url: self.config.dataset.url.clone(),
            country_filter: self.config.dataset.country_filter.clone(),
            rows_fetched,
            rows_retained: typed.num_rows(),
            database_created,
            totals,
            raw,
            aggregate,
        })
    }

    /// Upload `batch` as headerless CSV, register it under `spec` and query it back.
    #[instrument(level = "info", skip_all, fields(table = %spec.name, bucket = %target.bucket))]
    pub async fn publish(
        &self,
        batch: &RecordBatch,
        spec: &TableSpec,
        target: &TargetConfig,
    ) -> Result<PublishedTable> {
        let database = &self.config.catalog.database;
        verify_batch(spec, batch)?;

        let bucket_created = self.store.ensure_bucket(&target.bucket).await?;

        let local_file = target.local_path(&self.config.work_dir);
        let body = process::write_headerless_csv(batch, &local_file)?;
        let bytes = body.len();
        let key = target.object_key();
        self.store.put_object(&target.bucket, &key, body).await?;

        let table_action = self.catalog.upsert_table(database, spec).await?;
        let registered = self
            .catalog
            .table_columns(database, &spec.name)
            .await?
            .ok_or_else(|| anyhow!("table {}.{} missing after registration", database, spec.name))?;
        verify_columns(&spec.name, &spec.columns, &registered)?;

        let sql = select_all_sql(database, &spec.name, self.config.query.limit);
        let result = self.query.query(database, &sql).await?;
        for row in string_rows(&result)? {
            debug!(?row, "query row");
        }
        info!(
            rows = batch.num_rows(),
            bytes,
            query_rows = result.num_rows(),
            action = ?table_action,
            "published"
        );

        Ok(PublishedTable {
            database: database.clone(),
            table: spec.name.clone(),
            location: spec.location.clone(),
            bucket: target.bucket.clone(),
            key,
            local_file,
            rows: batch.num_rows(),
            bytes,
            bucket_created,
            table_action,
            query: sql,
            query_rows: result.num_rows(),
        })
    }
}

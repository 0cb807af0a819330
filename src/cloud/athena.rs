// src/cloud/athena.rs

use anyhow::{anyhow, bail, Context, Result};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use aws_sdk_athena::{
    types::{QueryExecutionContext, QueryExecutionState, ResultConfiguration},
    Client,
};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument};

use super::{text_batch, QueryEngine};

/// Athena runs queries asynchronously; results are staged to S3 and paged back.
pub struct AthenaQueryEngine {
    client: Client,
    staging_dir: String,
    poll_interval: Duration,
    max_wait: Duration,
}

impl AthenaQueryEngine {
    pub fn new(
        client: Client,
        staging_dir: String,
        poll_interval: Duration,
        max_wait: Duration,
    ) -> Self {
        Self {
            client,
            staging_dir,
            poll_interval,
            max_wait,
        }
    }

    async fn start(&self, database: &str, sql: &str) -> Result<String> {
        let output = self
            .client
            .start_query_execution()
            .query_string(sql)
            .query_execution_context(QueryExecutionContext::builder().database(database).build())
            .result_configuration(
                ResultConfiguration::builder()
                    .output_location(&self.staging_dir)
                    .build(),
            )
            .send()
            .await
            .with_context(|| format!("starting query {:?}", sql))?;

        output
            .query_execution_id()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("query service returned no execution id"))
    }

    async fn wait(&self, id: &str) -> Result<()> {
        let start = Instant::now();
        loop {
            let output = self
                .client
                .get_query_execution()
                .query_execution_id(id)
                .send()
                .await
                .with_context(|| format!("polling query {}", id))?;

            let status = output.query_execution().and_then(|q| q.status());
            let state = status.and_then(|s| s.state());
            match state {
                Some(QueryExecutionState::Succeeded) => {
                    debug!(id, elapsed = ?start.elapsed(), "query succeeded");
                    return Ok(());
                }
                Some(QueryExecutionState::Failed) | Some(QueryExecutionState::Cancelled) => {
                    let reason = status
                        .and_then(|s| s.state_change_reason())
                        .unwrap_or("no reason given");
                    bail!("query {} ended as {:?}: {}", id, state, reason);
                }
                _ => {}
            }

            if start.elapsed() >= self.max_wait {
                bail!("query {} still {:?} after {:?}", id, state, self.max_wait);
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn fetch(&self, id: &str) -> Result<RecordBatch> {
        let mut columns: Vec<String> = Vec::new();
        let mut rows: Vec<Vec<Option<String>>> = Vec::new();
        let mut next_token: Option<String> = None;
        let mut first_page = true;

        loop {
            let page = self
                .client
                .get_query_results()
                .query_execution_id(id)
                .set_next_token(next_token.take())
                .send()
                .await
                .with_context(|| format!("fetching results of query {}", id))?;

            if let Some(rs) = page.result_set() {
                if columns.is_empty() {
                    if let Some(meta) = rs.result_set_metadata() {
                        columns = meta
                            .column_info()
                            .iter()
                            .map(|c| c.name().to_string())
                            .collect();
                    }
                }
                let page_rows: Vec<Vec<Option<String>>> = rs
                    .rows()
                    .iter()
                    .map(|r| {
                        r.data()
                            .iter()
                            .map(|d| d.var_char_value().map(str::to_string))
                            .collect()
                    })
                    .collect();
                let skip = usize::from(first_page && is_header_row(&columns, page_rows.first()));
                rows.extend(page_rows.into_iter().skip(skip));
            }
            first_page = false;

            next_token = page.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        text_batch(&columns, &rows)
    }
}

/// SELECT results echo the column names as the first row.
pub fn is_header_row(columns: &[String], row: Option<&Vec<Option<String>>>) -> bool {
    match row {
        Some(row) if !columns.is_empty() && row.len() == columns.len() => row
            .iter()
            .zip(columns)
            .all(|(v, c)| v.as_deref() == Some(c.as_str())),
        _ => false,
    }
}

#[async_trait]
impl QueryEngine for AthenaQueryEngine {
    #[instrument(level = "info", skip(self))]
    async fn query(&self, database: &str, sql: &str) -> Result<RecordBatch> {
        let id = self.start(database, sql).await?;
        info!(id = %id, "query submitted");
        self.wait(&id).await?;
        let batch = self.fetch(&id).await?;
        info!(id = %id, rows = batch.num_rows(), "query results fetched");
        Ok(batch)
    }
}

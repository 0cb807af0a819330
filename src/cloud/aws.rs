// src/cloud/aws.rs

use anyhow::{anyhow, Context, Result};
use aws_config::{BehaviorVersion, Region};
use std::time::Duration;
use tracing::info;

use super::{athena::AthenaQueryEngine, glue::GlueCatalog, s3::S3Store};
use crate::config::PipelineConfig;

/// The three AWS services the pipeline talks to, sharing one SDK config.
pub struct AwsBackends {
    pub store: S3Store,
    pub catalog: GlueCatalog,
    pub query: AthenaQueryEngine,
}

/// Load credentials from the default chain and build every client.
pub async fn connect(cfg: &PipelineConfig) -> Result<AwsBackends> {
    let sdk = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(cfg.region.clone()))
        .load()
        .await;

    let identity = aws_sdk_sts::Client::new(&sdk)
        .get_caller_identity()
        .send()
        .await
        .context("resolving caller identity")?;
    let account_id = identity
        .account()
        .ok_or_else(|| anyhow!("caller identity has no account id"))?
        .to_string();
    info!(account = %account_id, region = %cfg.region, "connected to AWS");

    Ok(AwsBackends {
        store: S3Store::new(aws_sdk_s3::Client::new(&sdk), cfg.region.clone()),
        catalog: GlueCatalog::new(aws_sdk_glue::Client::new(&sdk), account_id),
        query: AthenaQueryEngine::new(
            aws_sdk_athena::Client::new(&sdk),
            cfg.query.staging_dir.clone(),
            Duration::from_millis(cfg.query.poll_interval_ms),
            Duration::from_secs(cfg.query.max_wait_secs),
        ),
    })
}

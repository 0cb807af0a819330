// src/cloud/s3.rs

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::{
    primitives::ByteStream,
    types::{BucketLocationConstraint, CreateBucketConfiguration},
    Client,
};
use tracing::{debug, info, instrument};

use super::ObjectStore;

/// us-east-1 rejects an explicit location constraint.
const DEFAULT_REGION: &str = "us-east-1";

pub struct S3Store {
    client: Client,
    region: String,
}

impl S3Store {
    pub fn new(client: Client, region: String) -> Self {
        Self { client, region }
    }

    fn bucket_configuration(&self) -> Option<CreateBucketConfiguration> {
        if self.region == DEFAULT_REGION {
            return None;
        }
        Some(
            CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                .build(),
        )
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    /// HeadBucket first: in us-east-1 CreateBucket answers 200 for a bucket the
    /// caller already owns, so its result alone cannot tell a rerun from a create.
    #[instrument(level = "info", skip(self))]
    async fn ensure_bucket(&self, bucket: &str) -> Result<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => {
                debug!(bucket, "bucket already owned");
                return Ok(false);
            }
            Err(err) => {
                let err = err.into_service_error();
                if !err.is_not_found() {
                    return Err(anyhow::Error::new(err))
                        .with_context(|| format!("checking bucket {}", bucket));
                }
            }
        }

        let result = self
            .client
            .create_bucket()
            .bucket(bucket)
            .set_create_bucket_configuration(self.bucket_configuration())
            .send()
            .await;

        match result {
            Ok(_) => {
                info!(bucket, region = %self.region, "created bucket");
                Ok(true)
            }
            Err(err) => {
                let err = err.into_service_error();
                if err.is_bucket_already_owned_by_you() {
                    debug!(bucket, "bucket already owned");
                    Ok(false)
                } else {
                    Err(anyhow::Error::new(err))
                        .with_context(|| format!("creating bucket {}", bucket))
                }
            }
        }
    }

    #[instrument(level = "info", skip(self, body), fields(bytes = body.len()))]
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()> {
        let len = body.len();
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type("text/csv")
            .body(ByteStream::from(body))
            .send()
            .await
            .with_context(|| format!("uploading s3://{}/{}", bucket, key))?;

        info!(object = %format!("s3://{}/{}", bucket, key), bytes = len, "uploaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::replay::{methods, respond, xml_error, REGION};
    use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
    use aws_smithy_runtime::client::http::test_util::{ReplayEvent, StaticReplayClient};

    fn s3_store(region: &str, events: Vec<ReplayEvent>) -> (S3Store, StaticReplayClient) {
        let http = StaticReplayClient::new(events);
        let conf = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(Credentials::new("akid", "secret", None, None, "test"))
            .http_client(http.clone())
            .build();
        (
            S3Store::new(Client::from_conf(conf), region.to_string()),
            http,
        )
    }

    #[tokio::test]
    async fn owned_bucket_is_not_recreated() -> Result<()> {
        let (store, http) = s3_store(REGION, vec![respond(200, "")]);
        assert!(!store.ensure_bucket("teste-nina").await?);
        assert_eq!(methods(&http), vec!["HEAD"]);
        Ok(())
    }

    #[tokio::test]
    async fn missing_bucket_is_created() -> Result<()> {
        let (store, http) = s3_store(REGION, vec![respond(404, ""), respond(200, "")]);
        assert!(store.ensure_bucket("teste-nina").await?);
        assert_eq!(methods(&http), vec!["HEAD", "PUT"]);
        Ok(())
    }

    #[tokio::test]
    async fn create_race_with_own_bucket_is_success() -> Result<()> {
        let (store, _http) = s3_store(
            "sa-east-1",
            vec![respond(404, ""), xml_error(409, "BucketAlreadyOwnedByYou")],
        );
        assert!(!store.ensure_bucket("teste-nina").await?);
        Ok(())
    }

    #[tokio::test]
    async fn bucket_owned_by_someone_else_fails() {
        let (store, _http) = s3_store(
            REGION,
            vec![respond(404, ""), xml_error(409, "BucketAlreadyExists")],
        );
        let err = store.ensure_bucket("teste-nina").await.unwrap_err();
        assert!(format!("{:#}", err).contains("creating bucket teste-nina"));

        let (store, http) = s3_store(REGION, vec![respond(403, "")]);
        let err = store.ensure_bucket("teste-nina").await.unwrap_err();
        assert!(format!("{:#}", err).contains("checking bucket teste-nina"));
        assert_eq!(methods(&http), vec!["HEAD"]);
    }

    #[test]
    fn location_constraint_only_outside_us_east_1() {
        let (east, _) = s3_store(REGION, vec![]);
        assert!(east.bucket_configuration().is_none());
        let (sa, _) = s3_store("sa-east-1", vec![]);
        let conf = sa.bucket_configuration().expect("configuration");
        assert_eq!(
            conf.location_constraint(),
            Some(&BucketLocationConstraint::SaEast1)
        );
    }
}

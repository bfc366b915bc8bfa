//! S3 object backend built on the AWS SDK.

use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::{RetryConfig, RetryMode};
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration, ObjectCannedAcl};
use aws_sdk_s3::Client;
use bytes::Bytes;
use offsite_core::StorageSettings;

use crate::traits::{FetchedObject, ObjectAcl, ObjectBackend, StorageError, StorageResult};

const MAX_RETRY_ATTEMPTS: u32 = 5;
const CREDENTIALS_PROVIDER_NAME: &str = "offsite";

/// S3 backend implementation
#[derive(Debug)]
pub struct S3Backend {
    client: Client,
    region: String,
}

impl S3Backend {
    /// Build a client from the configured credentials.
    ///
    /// A custom `endpoint` switches the client to path-style addressing,
    /// which S3-compatible providers such as MinIO require.
    pub async fn connect(settings: &StorageSettings) -> StorageResult<Self> {
        if settings.access_key_id.is_empty() || settings.secret_access_key.is_empty() {
            return Err(StorageError::Config(
                "object storage credentials are not configured".to_string(),
            ));
        }
        if settings.region.is_empty() {
            return Err(StorageError::Config(
                "object storage region is not configured".to_string(),
            ));
        }

        let credentials = Credentials::new(
            settings.access_key_id.clone(),
            settings.secret_access_key.clone(),
            None,
            None,
            CREDENTIALS_PROVIDER_NAME,
        );

        let region_provider =
            RegionProviderChain::first_try(Region::new(settings.region.clone()));

        let retry_config = RetryConfig::standard()
            .with_max_attempts(MAX_RETRY_ATTEMPTS)
            .with_retry_mode(RetryMode::Adaptive);

        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .credentials_provider(credentials)
            .retry_config(retry_config)
            .load()
            .await;

        let client = if let Some(ref endpoint) = settings.endpoint {
            let s3_config = aws_sdk_s3::config::Builder::from(&shared_config)
                .endpoint_url(endpoint)
                .force_path_style(true)
                .build();
            Client::from_conf(s3_config)
        } else {
            Client::new(&shared_config)
        };

        Ok(S3Backend {
            client,
            region: settings.region.clone(),
        })
    }
}

#[async_trait]
impl ObjectBackend for S3Backend {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: Option<&str>,
        acl: ObjectAcl,
    ) -> StorageResult<()> {
        let size = data.len() as u64;
        let body = ByteStream::from(data);
        let canned_acl = match acl {
            ObjectAcl::PublicRead => ObjectCannedAcl::PublicRead,
            ObjectAcl::Private => ObjectCannedAcl::Private,
        };

        let start = std::time::Instant::now();

        let mut request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .acl(canned_acl);
        if let Some(content_type) = content_type {
            request = request.content_type(content_type);
        }

        request.send().await.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            StorageError::UploadFailed {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: e.to_string(),
            }
        })?;

        tracing::info!(
            bucket = %bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<FetchedObject> {
        let start = std::time::Instant::now();

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match &e {
                SdkError::ServiceError(service_err)
                    if matches!(service_err.err(), GetObjectError::NoSuchKey(_)) =>
                {
                    StorageError::NotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    }
                }
                _ => {
                    tracing::error!(
                        error = %e,
                        bucket = %bucket,
                        key = %key,
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "S3 download failed"
                    );
                    StorageError::DownloadFailed {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                        message: e.to_string(),
                    }
                }
            })?;

        let content_type = response
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::DownloadFailed {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: e.to_string(),
            })?;
        let bytes = data.into_bytes();

        tracing::info!(
            bucket = %bucket,
            key = %key,
            size_bytes = bytes.len() as u64,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );

        Ok(FetchedObject {
            bytes,
            content_type,
        })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        let start = std::time::Instant::now();

        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                StorageError::DeleteFailed {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    message: e.to_string(),
                }
            })?;

        tracing::info!(
            bucket = %bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn create_bucket(&self, bucket: &str) -> StorageResult<()> {
        let mut request = self.client.create_bucket().bucket(bucket);
        // us-east-1 is the API default and must not be sent as a constraint.
        if self.region != "us-east-1" {
            let constraint = BucketLocationConstraint::from(self.region.as_str());
            let configuration = CreateBucketConfiguration::builder()
                .location_constraint(constraint)
                .build();
            request = request.create_bucket_configuration(configuration);
        }

        request.send().await.map_err(|e| {
            tracing::error!(error = %e, bucket = %bucket, "S3 create bucket failed");
            StorageError::BucketOperation {
                bucket: bucket.to_string(),
                message: e.to_string(),
            }
        })?;

        tracing::info!(bucket = %bucket, region = %self.region, "S3 bucket created");
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> StorageResult<()> {
        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, bucket = %bucket, "S3 delete bucket failed");
                StorageError::BucketOperation {
                    bucket: bucket.to_string(),
                    message: e.to_string(),
                }
            })?;

        tracing::info!(bucket = %bucket, "S3 bucket deleted");
        Ok(())
    }

    async fn list_buckets(&self) -> StorageResult<Vec<String>> {
        let response = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let names = response
            .buckets()
            .iter()
            .filter_map(|bucket| bucket.name().map(str::to_string))
            .collect();

        Ok(names)
    }

    fn region(&self) -> &str {
        &self.region
    }
}

//! S3 object store backed by `aws-sdk-s3`.
//!
//! Works against AWS and S3-compatible services (MinIO, Ceph, LocalStack)
//! through an explicit endpoint, static credentials and optional path-style
//! addressing. No ambient credential chain is consulted.
//!
//! Retries and timeouts are the SDK's defaults.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Builder, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::{ByteStream, DateTime as SdkDateTime};
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, Delete, ObjectIdentifier};
use chrono::{DateTime, Utc};
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::{
    ListPage, ListRequest, ObjectHead, ObjectReader, ObjectStore, ObjectSummary, check_batch,
};
use crate::MIN_TIMESTAMP;
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::logging::sanitize_for_log;

/// Uploads up to this size go out as a single PutObject; larger ones are
/// split into parts of this size.
pub const MULTIPART_PART_SIZE: u64 = 8 * 1024 * 1024;

const CREDENTIALS_PROVIDER: &str = "bucketfs";

/// Object store talking to an S3-compatible service.
#[derive(Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    /// Build a client from `config`.
    ///
    /// Only checks that required fields are present; credentials are first
    /// used by the first request.
    pub fn new(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        tracing::debug!(config = ?config, "building s3 client");

        let credentials = Credentials::new(
            config.access_key_id(),
            config.secret_access_key(),
            None,
            None,
            CREDENTIALS_PROVIDER,
        );
        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region().to_string()))
            .credentials_provider(credentials)
            .endpoint_url(config.endpoint())
            .force_path_style(config.force_path_style())
            .build();

        Ok(Self::from_client(Client::from_conf(sdk_config), config.bucket()))
    }

    /// Wrap an already configured client.
    pub fn from_client(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    async fn put_multipart(&self, key: &str, source: &Path) -> Result<()> {
        let created = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| map_sdk_error(key, err))?;
        let upload_id = created.upload_id().ok_or_else(|| {
            Error::StoreUnavailable(format!(
                "multipart upload for '{}' returned no upload id",
                sanitize_for_log(key)
            ))
        })?;

        match self.upload_parts(key, upload_id, source).await {
            Ok(parts) => {
                let completed = CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build();
                self.client
                    .complete_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(upload_id)
                    .multipart_upload(completed)
                    .send()
                    .await
                    .map_err(|err| map_sdk_error(key, err))?;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(
                    key = %sanitize_for_log(key),
                    error = %err,
                    "aborting multipart upload"
                );
                if let Err(abort_err) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(upload_id)
                    .send()
                    .await
                {
                    tracing::warn!(
                        error = %DisplayErrorContext(&abort_err),
                        "abort multipart upload failed"
                    );
                }
                Err(err)
            }
        }
    }

    async fn upload_parts(
        &self,
        key: &str,
        upload_id: &str,
        source: &Path,
    ) -> Result<Vec<CompletedPart>> {
        let mut file = tokio::fs::File::open(source).await?;
        let mut parts = Vec::new();
        let mut part_number: i32 = 1;

        loop {
            let mut chunk = Vec::with_capacity(MULTIPART_PART_SIZE as usize);
            (&mut file)
                .take(MULTIPART_PART_SIZE)
                .read_to_end(&mut chunk)
                .await?;
            if chunk.is_empty() {
                break;
            }

            tracing::debug!(part_number, bytes = chunk.len(), "uploading part");
            let uploaded = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(chunk))
                .send()
                .await
                .map_err(|err| map_sdk_error(key, err))?;

            parts.push(
                CompletedPart::builder()
                    .set_e_tag(uploaded.e_tag().map(str::to_string))
                    .part_number(part_number)
                    .build(),
            );
            part_number += 1;
        }
        Ok(parts)
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list(&self, request: &ListRequest) -> Result<ListPage> {
        let max_keys = request
            .max_keys
            .map(|max| i32::try_from(max).unwrap_or(i32::MAX));
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(&request.prefix)
            .set_delimiter(request.delimiter.map(String::from))
            .set_max_keys(max_keys)
            .set_start_after(request.start_after.clone())
            .send()
            .await
            .map_err(|err| map_sdk_error(&request.prefix, err))?;

        let objects = output
            .contents()
            .iter()
            .filter_map(|object| {
                Some(ObjectSummary {
                    key: object.key()?.to_string(),
                    last_modified: to_chrono(object.last_modified()),
                    size: object.size().unwrap_or(0).max(0) as u64,
                    etag: object.e_tag().map(str::to_string),
                })
            })
            .collect();
        let common_prefixes = output
            .common_prefixes()
            .iter()
            .filter_map(|prefix| prefix.prefix().map(str::to_string))
            .collect();

        Ok(ListPage {
            objects,
            common_prefixes,
            is_truncated: output.is_truncated().unwrap_or(false),
        })
    }

    async fn head(&self, key: &str) -> Result<ObjectHead> {
        let output = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| map_sdk_error(key, err))?;

        Ok(ObjectHead {
            last_modified: to_chrono(output.last_modified()),
            content_length: output.content_length().unwrap_or(0).max(0) as u64,
            etag: output.e_tag().map(str::to_string),
        })
    }

    async fn put(&self, key: &str, content: Vec<u8>) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(content))
            .send()
            .await
            .map_err(|err| map_sdk_error(key, err))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<ObjectReader> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| map_sdk_error(key, err))?;
        Ok(Box::new(Box::pin(output.body.into_async_read())))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| map_sdk_error(key, err))?;
        Ok(())
    }

    async fn delete_batch(&self, keys: &[String]) -> Result<()> {
        check_batch(keys)?;
        if keys.is_empty() {
            return Ok(());
        }

        let identifiers = keys
            .iter()
            .map(|key| {
                ObjectIdentifier::builder()
                    .key(key)
                    .build()
                    .map_err(|err| Error::Config(err.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        let delete = Delete::builder()
            .set_objects(Some(identifiers))
            .quiet(true)
            .build()
            .map_err(|err| Error::Config(err.to_string()))?;

        let output = self
            .client
            .delete_objects()
            .bucket(&self.bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|err| map_sdk_error(&keys[0], err))?;

        if !output.errors().is_empty() {
            let failed: Vec<String> = output
                .errors()
                .iter()
                .filter_map(|error| error.key().map(str::to_string))
                .collect();
            return Err(Error::PartialBatchFailure {
                attempted: keys.len(),
                failed,
            });
        }
        Ok(())
    }

    async fn upload_file(&self, key: &str, source: &Path) -> Result<()> {
        let size = tokio::fs::metadata(source).await?.len();
        if size <= MULTIPART_PART_SIZE {
            let content = tokio::fs::read(source).await?;
            return self.put(key, content).await;
        }
        tracing::debug!(key = %sanitize_for_log(key), size, "starting multipart upload");
        self.put_multipart(key, source).await
    }

    async fn download_file(&self, key: &str, destination: &Path) -> Result<u64> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| map_sdk_error(key, err))?;

        let mut reader = Box::pin(output.body.into_async_read());
        let mut file = tokio::fs::File::create(destination).await?;
        let written = tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;
        Ok(written)
    }
}

/// Map an SDK failure onto the crate's error kinds.
///
/// `NotFound` (HeadObject) and `NoSuchKey` (GetObject) are the only codes
/// reported as not-found.
fn map_sdk_error<E, R>(key: &str, err: SdkError<E, R>) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    match err.code() {
        Some("NotFound") | Some("NoSuchKey") => Error::NotFound(key.to_string()),
        _ => Error::StoreUnavailable(DisplayErrorContext(&err).to_string()),
    }
}

fn to_chrono(timestamp: Option<&SdkDateTime>) -> DateTime<Utc> {
    timestamp
        .and_then(|ts| DateTime::from_timestamp(ts.secs(), ts.subsec_nanos()))
        .unwrap_or(MIN_TIMESTAMP)
}

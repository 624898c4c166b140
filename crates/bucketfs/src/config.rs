//! Store configuration.
//!
//! A flat record describing how to reach one bucket. Only the endpoint,
//! region and addressing style have defaults; the bucket and the credential
//! pair must always be supplied by the caller.
//!
//! Credential formats are not validated here; the store rejects bad ones on
//! first use.

use serde::Deserialize;
use std::fmt;

use crate::error::{Error, Result};
use crate::logging::{LogConfig, mask_access_key};

/// Endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "https://s3.amazonaws.com";

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Connection settings for an S3-compatible bucket.
///
/// # Example
///
/// ```rust
/// use bucketfs::StoreConfig;
///
/// let config = StoreConfig::new("reports", "AKIAEXAMPLE", "secret")
///     .with_endpoint("https://storage.example.com")
///     .with_region("eu-central-1");
/// assert_eq!(config.bucket(), "reports");
/// ```
#[derive(Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_endpoint")]
    endpoint: String,
    #[serde(default = "default_region")]
    region: String,
    bucket: String,
    access_key_id: String,
    secret_access_key: String,
    #[serde(default = "default_force_path_style")]
    force_path_style: bool,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_force_path_style() -> bool {
    true
}

impl StoreConfig {
    /// Create a configuration for `bucket` with an explicit credential pair.
    pub fn new(
        bucket: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: default_endpoint(),
            region: default_region(),
            bucket: bucket.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            force_path_style: default_force_path_style(),
        }
    }

    /// Override the service endpoint URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Override the signing region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Override the bucket name.
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    /// Replace the credential pair.
    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.access_key_id = access_key_id.into();
        self.secret_access_key = secret_access_key.into();
        self
    }

    /// Use path-style (`endpoint/bucket/key`) instead of virtual-host addressing.
    pub fn with_force_path_style(mut self, force_path_style: bool) -> Self {
        self.force_path_style = force_path_style;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    pub fn force_path_style(&self) -> bool {
        self.force_path_style
    }

    /// Check that every required field is present.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("endpoint", &self.endpoint),
            ("region", &self.region),
            ("bucket", &self.bucket),
            ("access_key_id", &self.access_key_id),
            ("secret_access_key", &self.secret_access_key),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{} must not be empty", field)));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let log = LogConfig::new();
        f.debug_struct("StoreConfig")
            .field("endpoint", &log.redact_url(&self.endpoint))
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("access_key_id", &mask_access_key(&self.access_key_id))
            .field("secret_access_key", &"[REDACTED]")
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

impl fmt::Display for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} - {}",
            self.bucket,
            LogConfig::new().redact_url(&self.endpoint),
            mask_access_key(&self.access_key_id)
        )
    }
}

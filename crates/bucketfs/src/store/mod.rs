//! Object store seam.
//!
//! [`ObjectStore`] is the single point of contact with the remote bucket.
//! Nodes and the pager only ever talk to the store through this trait, and
//! share it read-only as `Arc<dyn ObjectStore>`.
//!
//! Implementations:
//! - [`InMemoryStore`]: in-process bucket with S3 listing semantics
//! - `S3Store`: aws-sdk-s3 backed bucket (feature `s3`)

mod memory;
#[cfg(feature = "s3")]
mod s3;

pub use memory::InMemoryStore;
#[cfg(feature = "s3")]
pub use s3::{MULTIPART_PART_SIZE, S3Store};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;
use tokio::io::AsyncRead;

use crate::error::{Error, Result};

/// Largest batch a single `delete_batch` call accepts.
pub const MAX_DELETE_BATCH: usize = 1000;

/// Largest page a single `list` call returns.
pub const MAX_LIST_KEYS: usize = 1000;

/// Live byte stream bound to a remote object.
///
/// Dropping the reader releases the underlying connection.
pub type ObjectReader = Box<dyn AsyncRead + Send + Unpin>;

/// Async object store trait.
///
/// "Not found" must be reported as [`Error::NotFound`] so callers can tell it
/// apart from every other failure.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Name of the bucket this store operates on.
    fn bucket(&self) -> &str;

    /// List one page of keys.
    async fn list(&self, request: &ListRequest) -> Result<ListPage>;

    /// Fetch metadata for a single object.
    async fn head(&self, key: &str) -> Result<ObjectHead>;

    /// Create or overwrite an object.
    async fn put(&self, key: &str, content: Vec<u8>) -> Result<()>;

    /// Create or overwrite a zero-length object.
    async fn put_empty(&self, key: &str) -> Result<()> {
        self.put(key, Vec::new()).await
    }

    /// Open an object for streaming reads.
    async fn get(&self, key: &str) -> Result<ObjectReader>;

    /// Delete a single object. Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete up to [`MAX_DELETE_BATCH`] objects in one request.
    async fn delete_batch(&self, keys: &[String]) -> Result<()>;

    /// Upload a local file, chunking it when it is too large for one request.
    async fn upload_file(&self, key: &str, source: &Path) -> Result<()>;

    /// Download an object into a local file. Returns the bytes written.
    async fn download_file(&self, key: &str, destination: &Path) -> Result<u64>;
}

/// Parameters of one listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    /// Only keys starting with this prefix are returned.
    pub prefix: String,
    /// Group keys containing this character after the prefix into
    /// common prefixes.
    pub delimiter: Option<char>,
    /// Upper bound on entries (objects plus common prefixes) in the page.
    pub max_keys: Option<usize>,
    /// Exclusive lower bound on returned keys, as a raw store key.
    pub start_after: Option<String>,
}

impl ListRequest {
    /// Create a request for every key under `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Group results one level deep using `delimiter`.
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Bound the page size.
    pub fn max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = Some(max_keys);
        self
    }

    /// Resume after a raw store key.
    pub fn start_after(mut self, key: impl Into<String>) -> Self {
        self.start_after = Some(key.into());
        self
    }
}

/// One object in a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    /// Raw store key.
    pub key: String,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
    /// Content length in bytes.
    pub size: u64,
    /// Change tag reported by the store.
    pub etag: Option<String>,
}

/// One page of listing results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    /// Objects in key order.
    pub objects: Vec<ObjectSummary>,
    /// Common prefixes (raw keys ending with the delimiter) in key order.
    pub common_prefixes: Vec<String>,
    /// True when more results follow this page.
    pub is_truncated: bool,
}

impl ListPage {
    /// Total entries in the page.
    pub fn len(&self) -> usize {
        self.objects.len() + self.common_prefixes.len()
    }

    /// True when the page has neither objects nor common prefixes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Metadata of a single object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHead {
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
    /// Content length in bytes.
    pub content_length: u64,
    /// Change tag reported by the store.
    pub etag: Option<String>,
}

/// Reject batches the store would refuse.
pub(crate) fn check_batch(keys: &[String]) -> Result<()> {
    if keys.len() > MAX_DELETE_BATCH {
        return Err(Error::Config(format!(
            "delete batch of {} keys exceeds the limit of {}",
            keys.len(),
            MAX_DELETE_BATCH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_request_builder() {
        let request = ListRequest::new("a/")
            .delimiter('/')
            .max_keys(1)
            .start_after("a/b");
        assert_eq!(request.prefix, "a/");
        assert_eq!(request.delimiter, Some('/'));
        assert_eq!(request.max_keys, Some(1));
        assert_eq!(request.start_after.as_deref(), Some("a/b"));
    }

    #[test]
    fn test_check_batch_limit() {
        let keys: Vec<String> = (0..MAX_DELETE_BATCH).map(|i| format!("k{i}")).collect();
        assert!(check_batch(&keys).is_ok());

        let keys: Vec<String> = (0..=MAX_DELETE_BATCH).map(|i| format!("k{i}")).collect();
        assert!(matches!(check_batch(&keys), Err(Error::Config(_))));
    }
}

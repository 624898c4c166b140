//! Bucketfs - Files and directories on top of a flat S3-compatible bucket
//!
//! Callers address objects with backslash-separated paths (`reports\2024\q1.csv`)
//! instead of raw keys (`reports/2024/q1.csv`). Directories are zero-length
//! marker objects at keys ending with `/`; they can be created, listed one
//! level deep, and deleted recursively in store-sized batches.
//!
//! Nodes are cheap handles. Building one never talks to the store: call
//! `refresh()` (or go through [`BucketFs::directory`] / [`BucketFs::file`])
//! to load metadata.
//!
//! # Example
//!
//! ```rust
//! use bucketfs::{BucketFs, InMemoryStore, NodeInfo};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> bucketfs::Result<()> {
//!     let fs = BucketFs::new(Arc::new(InMemoryStore::new()));
//!
//!     let mut docs = fs.directory("docs").await?;
//!     docs.create().await?;
//!
//!     let mut readme = fs.file("docs\\readme.txt").await?;
//!     readme.create_from_text("hello").await?;
//!
//!     let files = docs.list_files().await?;
//!     assert_eq!(files.len(), 1);
//!     assert_eq!(files[0].name(), "readme.txt");
//!     Ok(())
//! }
//! ```
//!
//! # Stores
//!
//! Everything goes through the [`ObjectStore`] trait:
//! - [`InMemoryStore`]: in-process bucket, used by tests
//! - `S3Store`: aws-sdk-s3 client (feature `s3`), built with [`BucketFs::connect`]

mod config;
mod directory;
mod error;
mod file;
pub mod logging;
mod node;
mod pager;
pub mod path;
mod store;

pub use config::{DEFAULT_ENDPOINT, DEFAULT_REGION, StoreConfig};
pub use directory::DirectoryNode;
pub use error::{Error, Result};
pub use file::{ETAG_SUFFIX, FileNode, etag_sidecar};
pub use logging::LogConfig;
pub use node::{Node, NodeInfo, NodeType};
pub use pager::ListingPager;
pub use store::{
    InMemoryStore, ListPage, ListRequest, MAX_DELETE_BATCH, MAX_LIST_KEYS, ObjectHead,
    ObjectReader, ObjectStore, ObjectSummary,
};
#[cfg(feature = "s3")]
pub use store::{MULTIPART_PART_SIZE, S3Store};

/// Re-export async_trait for custom ObjectStore implementations
pub use async_trait::async_trait;

use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Timestamp reported by nodes that do not exist or were never refreshed.
pub const MIN_TIMESTAMP: DateTime<Utc> = DateTime::<Utc>::MIN_UTC;

/// Entry point: hands out directory and file nodes for one bucket.
#[derive(Clone)]
pub struct BucketFs {
    store: Arc<dyn ObjectStore>,
}

impl BucketFs {
    /// Wrap an existing store.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Connect to the bucket described by `config`.
    #[cfg(feature = "s3")]
    pub fn connect(config: &StoreConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(S3Store::new(config)?)))
    }

    /// Name of the bucket.
    pub fn bucket(&self) -> &str {
        self.store.bucket()
    }

    /// Shared store handle.
    pub fn store(&self) -> Arc<dyn ObjectStore> {
        Arc::clone(&self.store)
    }

    /// The root directory. Always exists; no remote call.
    pub fn root(&self) -> DirectoryNode {
        DirectoryNode::root(self.store())
    }

    /// A refreshed handle for the directory at `path`.
    pub async fn directory(&self, path: &str) -> Result<DirectoryNode> {
        let mut directory = DirectoryNode::new(self.store(), path)?;
        directory.refresh().await?;
        Ok(directory)
    }

    /// A refreshed handle for the file at `path`.
    pub async fn file(&self, path: &str) -> Result<FileNode> {
        let mut file = FileNode::new(self.store(), path)?;
        file.refresh().await?;
        Ok(file)
    }

    /// A listing pager over raw keys under `prefix`.
    pub fn pager(&self, prefix: impl Into<String>) -> ListingPager {
        ListingPager::new(self.store(), prefix)
    }
}

impl std::fmt::Debug for BucketFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketFs")
            .field("bucket", &self.store.bucket())
            .finish()
    }
}

//! Virtual files.

use chrono::{DateTime, Utc};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::MIN_TIMESTAMP;
use crate::directory::DirectoryNode;
use crate::error::Result;
use crate::logging::sanitize_for_log;
use crate::node::{NodeInfo, NodeType};
use crate::path;
use crate::store::{ListRequest, ObjectReader, ObjectStore, ObjectSummary};

/// Suffix of the sidecar file holding a downloaded object's change tag.
pub const ETAG_SUFFIX: &str = ".etag";

/// Handle to one object addressed by a file path.
///
/// Like [`DirectoryNode`], construction performs no I/O and metadata is
/// unknown until [`refresh`](Self::refresh) or a listing populates it.
#[derive(Clone)]
pub struct FileNode {
    store: Arc<dyn ObjectStore>,
    key: String,
    directory: DirectoryNode,
    exists: bool,
    last_modified: DateTime<Utc>,
    length: u64,
    etag: Option<String>,
}

impl FileNode {
    /// Create an unrefreshed handle for the file at `file_path`.
    ///
    /// Fails with [`Error::InvalidPath`](crate::Error::InvalidPath) for an
    /// empty path, a bare separator, or a path ending with a separator.
    pub fn new(store: Arc<dyn ObjectStore>, file_path: &str) -> Result<Self> {
        path::validate_file_path(file_path)?;
        let directory = DirectoryNode::new(store.clone(), &path::parent_of_file(file_path))?;
        Ok(Self {
            store,
            key: file_path.to_string(),
            directory,
            exists: false,
            last_modified: MIN_TIMESTAMP,
            length: 0,
            etag: None,
        })
    }

    /// Raw store key of the object.
    pub fn store_key(&self) -> String {
        path::encode_key(&self.key)
    }

    /// Directory holding this file. Not refreshed; the root always exists.
    pub fn directory(&self) -> &DirectoryNode {
        &self.directory
    }

    /// Content length in bytes at the last refresh.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Re-read existence, timestamp, length and change tag.
    ///
    /// The listing result must match the encoded key exactly, so
    /// `a\b.txt` is not mistaken for `a\b.txt.user` or a directory `a\b.txt\`.
    pub async fn refresh(&mut self) -> Result<()> {
        let key = self.store_key();
        tracing::debug!(key = %sanitize_for_log(&key), "refreshing file");

        let request = ListRequest::new(key.as_str()).max_keys(1);
        let page = match self.store.list(&request).await {
            Ok(page) => page,
            Err(err) if err.is_not_found() => {
                self.mark_absent();
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        let Some(object) = page.objects.first().filter(|object| object.key == key) else {
            self.mark_absent();
            return Ok(());
        };
        let last_modified = object.last_modified;

        match self.store.head(&key).await {
            Ok(head) => {
                self.exists = true;
                self.last_modified = last_modified;
                self.length = head.content_length;
                self.etag = head.etag;
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                self.mark_absent();
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Fill metadata from a listing entry without another round trip.
    pub fn populate_from_listing(&mut self, object: &ObjectSummary) {
        self.exists = true;
        self.last_modified = object.last_modified;
        self.length = object.size;
        self.etag = object.etag.clone();
    }

    fn mark_absent(&mut self) {
        self.exists = false;
        self.last_modified = MIN_TIMESTAMP;
        self.length = 0;
        self.etag = None;
    }

    /// Write `content` to the object, replacing any existing content, then
    /// refresh.
    pub async fn create(&mut self, content: impl Into<Vec<u8>>) -> Result<&mut Self> {
        let key = self.store_key();
        let content = content.into();
        tracing::debug!(key = %sanitize_for_log(&key), bytes = content.len(), "writing file");
        self.store.put(&key, content).await?;
        self.refresh().await?;
        Ok(self)
    }

    /// Write `text` as UTF-8.
    pub async fn create_from_text(&mut self, text: &str) -> Result<&mut Self> {
        self.create(text.as_bytes()).await
    }

    /// Drain `reader` into the object.
    pub async fn create_from_reader<R>(&mut self, mut reader: R) -> Result<&mut Self>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut content = Vec::new();
        reader.read_to_end(&mut content).await?;
        self.create(content).await
    }

    /// Upload a local file, then refresh.
    ///
    /// Large sources are chunked by the store.
    pub async fn upload_from_local(&mut self, source: &Path) -> Result<&mut Self> {
        let key = self.store_key();
        tracing::debug!(
            key = %sanitize_for_log(&key),
            source = %source.display(),
            "uploading file"
        );
        self.store.upload_file(&key, source).await?;
        self.refresh().await?;
        Ok(self)
    }

    /// Download the object to `destination`. Returns the bytes written.
    ///
    /// With `persist_etag`, the change tag from the last refresh is written
    /// next to the destination as `<destination>.etag` for later comparison.
    pub async fn download_to_local(&self, destination: &Path, persist_etag: bool) -> Result<u64> {
        let key = self.store_key();
        tracing::debug!(
            key = %sanitize_for_log(&key),
            destination = %destination.display(),
            "downloading file"
        );
        let written = self.store.download_file(&key, destination).await?;

        if persist_etag && let Some(etag) = &self.etag {
            tokio::fs::write(etag_sidecar(destination), etag.as_bytes()).await?;
        }
        Ok(written)
    }

    /// Open a live stream over the object's content.
    ///
    /// The connection is held until the reader is dropped.
    pub async fn open_for_reading(&self) -> Result<ObjectReader> {
        let key = self.store_key();
        tracing::debug!(key = %sanitize_for_log(&key), "opening file");
        self.store.get(&key).await
    }

    /// Delete the object, then refresh.
    pub async fn delete(&mut self) -> Result<()> {
        let key = self.store_key();
        tracing::info!(key = %sanitize_for_log(&key), "deleting file");
        self.store.delete(&key).await?;
        self.refresh().await
    }
}

/// Path of the change-tag sidecar for a downloaded file.
pub fn etag_sidecar(destination: &Path) -> PathBuf {
    let mut sidecar = OsString::from(destination.as_os_str());
    sidecar.push(ETAG_SUFFIX);
    PathBuf::from(sidecar)
}

impl NodeInfo for FileNode {
    fn key(&self) -> &str {
        &self.key
    }

    fn bucket(&self) -> &str {
        self.store.bucket()
    }

    fn node_type(&self) -> NodeType {
        NodeType::File
    }

    fn exists(&self) -> bool {
        self.exists
    }

    fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }
}

impl fmt::Debug for FileNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileNode")
            .field("bucket", &self.store.bucket())
            .field("key", &self.key)
            .field("exists", &self.exists)
            .field("last_modified", &self.last_modified)
            .field("length", &self.length)
            .field("etag", &self.etag)
            .finish_non_exhaustive()
    }
}

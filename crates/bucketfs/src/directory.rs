//! Virtual directories.
//!
//! The store has no directories, only key prefixes. A directory exists when
//! a zero-length marker object sits at its encoded key (`a/b/`). Keys under
//! the prefix do not count: a directory whose descendants were written
//! without creating the marker reports `exists() == false` while its
//! children are still enumerable.
//!
//! The root (empty path) always exists and has no marker.

use chrono::{DateTime, Utc};
use std::fmt;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use crate::MIN_TIMESTAMP;
use crate::error::{Error, Result};
use crate::file::FileNode;
use crate::logging::sanitize_for_log;
use crate::node::{Node, NodeInfo, NodeType};
use crate::pager::ListingPager;
use crate::path::{self, KEY_SEPARATOR};
use crate::store::{ListRequest, MAX_DELETE_BATCH, ObjectStore};

/// Handle to one virtual directory.
///
/// Construction never touches the store; metadata is unknown until
/// [`refresh`](Self::refresh). Handles are independent values: two handles
/// for the same path do not observe each other's refreshes.
#[derive(Clone)]
pub struct DirectoryNode {
    store: Arc<dyn ObjectStore>,
    key: String,
    exists: bool,
    last_modified: DateTime<Utc>,
    parent_key: OnceLock<String>,
}

impl DirectoryNode {
    /// Create an unrefreshed handle for `raw`.
    ///
    /// A missing trailing separator is added; `""` and `"\"` are the root.
    pub fn new(store: Arc<dyn ObjectStore>, raw: &str) -> Result<Self> {
        let key = path::normalize_directory(raw);
        path::validate_directory_path(&key)?;
        if key.is_empty() {
            return Ok(Self::root(store));
        }
        Ok(Self {
            store,
            key,
            exists: false,
            last_modified: MIN_TIMESTAMP,
            parent_key: OnceLock::new(),
        })
    }

    /// Handle to the root directory. Always exists; no remote call.
    pub fn root(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            key: String::new(),
            exists: true,
            last_modified: MIN_TIMESTAMP,
            parent_key: OnceLock::new(),
        }
    }

    /// True for the root directory.
    pub fn is_root(&self) -> bool {
        self.key.is_empty()
    }

    /// Raw store key of the marker object (`a/b/`, empty for the root).
    pub fn store_key(&self) -> String {
        path::encode_key(&self.key)
    }

    /// Path of the parent directory, computed once per handle.
    pub fn parent_key(&self) -> &str {
        self.parent_key
            .get_or_init(|| path::parent_directory_of(&self.key))
    }

    /// Re-read existence and timestamp from the store.
    ///
    /// Lists at most one key under the marker key and requires it to be the
    /// marker itself. A not-found answer means the directory is absent.
    pub async fn refresh(&mut self) -> Result<()> {
        if self.is_root() {
            self.exists = true;
            return Ok(());
        }

        let marker = self.store_key();
        tracing::debug!(key = %sanitize_for_log(&marker), "refreshing directory");

        let request = ListRequest::new(marker.as_str()).max_keys(1);
        let page = match self.store.list(&request).await {
            Ok(page) => page,
            Err(err) if err.is_not_found() => {
                self.mark_absent();
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        match page.objects.first() {
            Some(object) if object.key == marker => {
                self.exists = true;
                self.last_modified = object.last_modified;
            }
            _ => self.mark_absent(),
        }
        Ok(())
    }

    fn mark_absent(&mut self) {
        self.exists = false;
        self.last_modified = MIN_TIMESTAMP;
    }

    /// Write the marker object, then refresh.
    ///
    /// Idempotent. Ancestors are not created: each level's marker is
    /// independent of the others.
    pub async fn create(&mut self) -> Result<&mut Self> {
        if !self.is_root() {
            let marker = self.store_key();
            tracing::debug!(key = %sanitize_for_log(&marker), "creating directory marker");
            self.store.put_empty(&marker).await?;
        }
        self.refresh().await?;
        Ok(self)
    }

    /// Delete the directory, then refresh.
    ///
    /// Without `recursive` only the marker is removed, even when the
    /// directory has children; they stay in the store and remain
    /// enumerable. With `recursive` every key under the prefix is removed
    /// first, in batches of at most [`MAX_DELETE_BATCH`] keys.
    ///
    /// A failed recursive delete may leave some keys behind. Running it
    /// again removes whatever remains.
    pub async fn delete(&mut self, recursive: bool) -> Result<()> {
        if recursive {
            self.delete_descendants().await?;
        }
        if !self.is_root() {
            let marker = self.store_key();
            tracing::info!(key = %sanitize_for_log(&marker), "deleting directory marker");
            self.store.delete(&marker).await?;
        }
        self.refresh().await
    }

    async fn delete_descendants(&self) -> Result<()> {
        let prefix = self.store_key();
        let mut pager = ListingPager::new(self.store.clone(), prefix.as_str());
        let mut batch: Vec<String> = Vec::with_capacity(MAX_DELETE_BATCH);
        let mut deleted = 0usize;

        while let Some(page) = pager.next_page().await? {
            let mut keys: Vec<String> = page.objects.into_iter().map(|o| o.key).collect();
            keys.sort();
            for key in keys {
                batch.push(key);
                if batch.len() == MAX_DELETE_BATCH {
                    deleted += self.flush_batch(&mut batch).await?;
                }
            }
        }
        if !batch.is_empty() {
            deleted += self.flush_batch(&mut batch).await?;
        }

        tracing::info!(
            prefix = %sanitize_for_log(&prefix),
            deleted,
            "recursive delete finished"
        );
        Ok(())
    }

    async fn flush_batch(&self, batch: &mut Vec<String>) -> Result<usize> {
        let count = batch.len();
        tracing::debug!(count, "deleting batch");
        match self.store.delete_batch(batch.as_slice()).await {
            Ok(()) => {
                batch.clear();
                Ok(count)
            }
            Err(err) => {
                if let Error::PartialBatchFailure { attempted, failed } = &err {
                    tracing::warn!(
                        attempted = *attempted,
                        failed = failed.len(),
                        "batch delete partially applied"
                    );
                }
                Err(err)
            }
        }
    }

    /// The parent directory, refreshed. The root's parent is the root.
    pub async fn parent(&self) -> Result<DirectoryNode> {
        let parent_key = self.parent_key();
        if parent_key.is_empty() {
            return Ok(Self::root(self.store.clone()));
        }
        let mut parent = Self::new(self.store.clone(), parent_key)?;
        parent.refresh().await?;
        Ok(parent)
    }

    /// A refreshed handle for the child directory `name`. Nothing is created.
    pub async fn subdirectory(&self, name: &str) -> Result<DirectoryNode> {
        let mut child = Self::new(self.store.clone(), &path::join(&self.key, name))?;
        child.refresh().await?;
        Ok(child)
    }

    /// A refreshed handle for the child file `name`.
    pub async fn file(&self, name: &str) -> Result<FileNode> {
        let mut file = FileNode::new(self.store.clone(), &path::join(&self.key, name))?;
        file.refresh().await?;
        Ok(file)
    }

    /// Immediate child directories, each individually refreshed.
    ///
    /// Deeper descendants are grouped away by the listing delimiter. A child
    /// that only exists as a prefix (no marker) is returned with
    /// `exists() == false`.
    pub async fn list_directories(&self) -> Result<Vec<DirectoryNode>> {
        let mut pager = self.child_pager();
        let mut directories = Vec::new();

        while let Some(page) = pager.next_page().await? {
            for prefix in page.common_prefixes {
                let Some(decoded) = decode_listed(&prefix) else {
                    continue;
                };
                match Self::new(self.store.clone(), &decoded) {
                    Ok(mut directory) => {
                        directory.refresh().await?;
                        directories.push(directory);
                    }
                    Err(err) => {
                        tracing::debug!(error = %err, "skipping unaddressable prefix");
                    }
                }
            }
        }
        Ok(directories)
    }

    /// Immediate child files, populated from the listing without extra calls.
    ///
    /// The directory's own marker is never included.
    pub async fn list_files(&self) -> Result<Vec<FileNode>> {
        let mut pager = self.child_pager();
        let mut files = Vec::new();

        while let Some(page) = pager.next_page().await? {
            for object in &page.objects {
                let Some(decoded) = decode_listed(&object.key) else {
                    continue;
                };
                if decoded == self.key || decoded.ends_with(path::PATH_SEPARATOR) {
                    continue;
                }
                match FileNode::new(self.store.clone(), &decoded) {
                    Ok(mut file) => {
                        file.populate_from_listing(object);
                        files.push(file);
                    }
                    Err(err) => {
                        tracing::debug!(error = %err, "skipping unaddressable key");
                    }
                }
            }
        }
        Ok(files)
    }

    /// Child directories followed by child files.
    pub async fn list_items(&self) -> Result<Vec<Node>> {
        let directories = self.list_directories().await?;
        let files = self.list_files().await?;
        let mut items = Vec::with_capacity(directories.len() + files.len());
        items.extend(directories.into_iter().map(Node::Directory));
        items.extend(files.into_iter().map(Node::File));
        Ok(items)
    }

    /// Upload a local file into this directory under its base name.
    pub async fn upload_file(&self, source: &Path) -> Result<FileNode> {
        let name = source
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                Error::invalid_path(
                    source.display().to_string(),
                    "local source has no usable file name",
                )
            })?;
        let mut file = FileNode::new(self.store.clone(), &path::join(&self.key, name))?;
        file.upload_from_local(source).await?;
        Ok(file)
    }

    fn child_pager(&self) -> ListingPager {
        ListingPager::new(self.store.clone(), self.store_key()).delimiter(KEY_SEPARATOR)
    }
}

impl NodeInfo for DirectoryNode {
    fn key(&self) -> &str {
        &self.key
    }

    fn bucket(&self) -> &str {
        self.store.bucket()
    }

    fn node_type(&self) -> NodeType {
        NodeType::Directory
    }

    fn exists(&self) -> bool {
        self.exists
    }

    fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }
}

impl fmt::Debug for DirectoryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryNode")
            .field("bucket", &self.store.bucket())
            .field("key", &self.key)
            .field("exists", &self.exists)
            .field("last_modified", &self.last_modified)
            .finish_non_exhaustive()
    }
}

/// Decode a listed key, or `None` when the key holds a literal path
/// separator and would not encode back to itself.
fn decode_listed(key: &str) -> Option<String> {
    if key.contains(path::PATH_SEPARATOR) {
        tracing::debug!(key = %sanitize_for_log(key), "skipping unaddressable key");
        return None;
    }
    Some(path::decode_key(key))
}

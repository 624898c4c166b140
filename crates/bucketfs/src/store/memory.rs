//! In-memory object store implementation

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use md5::{Digest, Md5};
use std::collections::BTreeMap;
use std::io::Cursor;
use std::ops::Bound;
use std::path::Path;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{
    ListPage, ListRequest, MAX_LIST_KEYS, ObjectHead, ObjectReader, ObjectStore, ObjectSummary,
    check_batch,
};
use crate::error::{Error, Result};

/// Bucket name used by [`InMemoryStore::new`].
pub const DEFAULT_BUCKET: &str = "memory";

/// In-memory object store.
///
/// Keeps objects in a `BTreeMap` keyed by raw store key, so iteration order
/// is the lexicographic key order S3 listings use. Listing follows the
/// ListObjectsV2 contract: prefix filter, delimiter grouping into common
/// prefixes, exclusive `start_after` cursor, bounded pages.
pub struct InMemoryStore {
    bucket: String,
    page_size: usize,
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    objects: BTreeMap<String, StoredObject>,
    last_write: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
struct StoredObject {
    content: Vec<u8>,
    last_modified: DateTime<Utc>,
    etag: String,
}

impl StoredObject {
    fn summary(&self, key: &str) -> ObjectSummary {
        ObjectSummary {
            key: key.to_string(),
            last_modified: self.last_modified,
            size: self.content.len() as u64,
            etag: Some(self.etag.clone()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Create an empty store with full-size pages.
    pub fn new() -> Self {
        Self::with_bucket(DEFAULT_BUCKET)
    }

    /// Create an empty store reporting the given bucket name.
    pub fn with_bucket(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            page_size: MAX_LIST_KEYS,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Cap every listing page at `page_size` entries.
    ///
    /// Small pages make pagination observable without thousands of keys.
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_LIST_KEYS);
        self
    }

    /// All keys currently stored, in key order.
    pub fn keys(&self) -> Vec<String> {
        self.read().objects.keys().cloned().collect()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.read().objects.len()
    }

    /// True when the bucket holds no objects.
    pub fn is_empty(&self) -> bool {
        self.read().objects.is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_content(&self, key: &str) -> Result<Vec<u8>> {
        self.read()
            .objects
            .get(key)
            .map(|object| object.content.clone())
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }
}

impl Inner {
    /// Timestamps strictly increase across writes, even within one clock tick.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_write {
            Some(last) if now <= last => last + TimeDelta::milliseconds(1),
            _ => now,
        };
        self.last_write = Some(stamp);
        stamp
    }
}

fn etag_of(content: &[u8]) -> String {
    let digest = Md5::digest(content);
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    format!("\"{}\"", hex)
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list(&self, request: &ListRequest) -> Result<ListPage> {
        let limit = request
            .max_keys
            .unwrap_or(MAX_LIST_KEYS)
            .min(self.page_size);
        let inner = self.read();
        let mut page = ListPage::default();

        let lower = match request.start_after.as_deref() {
            Some(key) => Bound::Excluded(key),
            None => Bound::Unbounded,
        };

        for (key, object) in inner.objects.range::<str, _>((lower, Bound::Unbounded)) {
            if key.as_str() < request.prefix.as_str() {
                continue;
            }
            if !key.starts_with(&request.prefix) {
                break;
            }

            let rest = &key[request.prefix.len()..];
            let common_prefix = request.delimiter.and_then(|delimiter| {
                rest.find(delimiter)
                    .map(|idx| key[..request.prefix.len() + idx + delimiter.len_utf8()].to_string())
            });

            // Keys sharing a common prefix are contiguous in key order.
            if let Some(prefix) = &common_prefix
                && page.common_prefixes.last() == Some(prefix)
            {
                continue;
            }

            if page.len() == limit {
                page.is_truncated = true;
                break;
            }

            match common_prefix {
                Some(prefix) => page.common_prefixes.push(prefix),
                None => page.objects.push(object.summary(key)),
            }
        }

        Ok(page)
    }

    async fn head(&self, key: &str) -> Result<ObjectHead> {
        let inner = self.read();
        match inner.objects.get(key) {
            Some(object) => Ok(ObjectHead {
                last_modified: object.last_modified,
                content_length: object.content.len() as u64,
                etag: Some(object.etag.clone()),
            }),
            None => Err(Error::NotFound(key.to_string())),
        }
    }

    async fn put(&self, key: &str, content: Vec<u8>) -> Result<()> {
        if key.is_empty() {
            return Err(Error::Config("object key is empty".to_string()));
        }
        let mut inner = self.write();
        let last_modified = inner.next_timestamp();
        let etag = etag_of(&content);
        inner.objects.insert(
            key.to_string(),
            StoredObject {
                content,
                last_modified,
                etag,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<ObjectReader> {
        let content = self.read_content(key)?;
        Ok(Box::new(Cursor::new(content)))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.write().objects.remove(key);
        Ok(())
    }

    async fn delete_batch(&self, keys: &[String]) -> Result<()> {
        check_batch(keys)?;
        let mut inner = self.write();
        for key in keys {
            inner.objects.remove(key);
        }
        Ok(())
    }

    async fn upload_file(&self, key: &str, source: &Path) -> Result<()> {
        let content = tokio::fs::read(source).await?;
        self.put(key, content).await
    }

    async fn download_file(&self, key: &str, destination: &Path) -> Result<u64> {
        let content = self.read_content(key)?;
        tokio::fs::write(destination, &content).await?;
        Ok(content.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    async fn seeded(keys: &[&str]) -> InMemoryStore {
        let store = InMemoryStore::new();
        for key in keys {
            store.put(key, key.as_bytes().to_vec()).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = InMemoryStore::new();
        store.put("a/b.txt", b"hello".to_vec()).await.unwrap();

        let mut reader = store.get("a/b.txt").await.unwrap();
        let mut content = Vec::new();
        reader.read_to_end(&mut content).await.unwrap();
        assert_eq!(content, b"hello");
    }

    #[tokio::test]
    async fn test_head_missing_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.head("missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_etag_is_quoted_md5() {
        let store = InMemoryStore::new();
        store.put("empty", Vec::new()).await.unwrap();
        let head = store.head("empty").await.unwrap();
        assert_eq!(
            head.etag.as_deref(),
            Some("\"d41d8cd98f00b204e9800998ecf8427e\"")
        );
    }

    #[tokio::test]
    async fn test_timestamps_strictly_increase() {
        let store = InMemoryStore::new();
        store.put("one", Vec::new()).await.unwrap();
        store.put("two", Vec::new()).await.unwrap();
        let one = store.head("one").await.unwrap().last_modified;
        let two = store.head("two").await.unwrap().last_modified;
        assert!(two > one);
    }

    #[tokio::test]
    async fn test_list_groups_common_prefixes() {
        let store = seeded(&["d/", "d/a/", "d/a/x", "d/b/", "d/file.txt", "e/other"]).await;

        let page = store
            .list(&ListRequest::new("d/").delimiter('/'))
            .await
            .unwrap();
        let objects: Vec<&str> = page.objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(objects, vec!["d/", "d/file.txt"]);
        assert_eq!(page.common_prefixes, vec!["d/a/", "d/b/"]);
        assert!(!page.is_truncated);
    }

    #[tokio::test]
    async fn test_list_start_after_and_truncation() {
        let store = seeded(&["p/1", "p/2", "p/3", "q/1"]).await;

        let page = store
            .list(&ListRequest::new("p/").max_keys(2))
            .await
            .unwrap();
        assert_eq!(page.objects.len(), 2);
        assert!(page.is_truncated);

        let page = store
            .list(&ListRequest::new("p/").max_keys(2).start_after("p/2"))
            .await
            .unwrap();
        let objects: Vec<&str> = page.objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(objects, vec!["p/3"]);
        assert!(!page.is_truncated);
    }

    #[tokio::test]
    async fn test_page_size_caps_max_keys() {
        let store = seeded(&["k1", "k2", "k3"]).await.page_size(1);
        let page = store.list(&ListRequest::new("")).await.unwrap();
        assert_eq!(page.objects.len(), 1);
        assert!(page.is_truncated);
    }

    #[tokio::test]
    async fn test_delete_batch() {
        let store = seeded(&["a", "b", "c"]).await;
        store
            .delete_batch(&["a".to_string(), "c".to_string()])
            .await
            .unwrap();
        assert_eq!(store.keys(), vec!["b"]);
    }

    #[tokio::test]
    async fn test_put_rejects_empty_key() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.put("", Vec::new()).await,
            Err(Error::Config(_))
        ));
    }
}

//! Paginated listing.
//!
//! A single listing call returns a bounded number of entries. The pager
//! walks a prefix one page at a time, resuming each request after the last
//! raw key of the previous page, and stops exactly when a page reports it is
//! not truncated.
//!
//! Pages depend on their predecessor's cursor, so a pager is strictly
//! sequential and cannot be rewound. Build a new pager to enumerate again.

use futures_core::Stream;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::logging::sanitize_for_log;
use crate::store::{ListPage, ListRequest, ObjectStore};

/// Appended to a common prefix to form a cursor that sorts after every key
/// under that prefix.
const PREFIX_CURSOR_SUFFIX: char = '\u{10FFFF}';

/// Lazy, finite, non-restartable sequence of listing pages.
pub struct ListingPager {
    store: Arc<dyn ObjectStore>,
    request: ListRequest,
    finished: bool,
}

impl ListingPager {
    /// Page through every key under `prefix` (a raw store key).
    pub fn new(store: Arc<dyn ObjectStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            request: ListRequest::new(prefix),
            finished: false,
        }
    }

    /// Group keys one level deep under the prefix.
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.request.delimiter = Some(delimiter);
        self
    }

    /// Request at most `page_size` entries per page.
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.request.max_keys = Some(page_size);
        self
    }

    /// Raw key the next request resumes after, if any.
    pub fn cursor(&self) -> Option<&str> {
        self.request.start_after.as_deref()
    }

    /// True once the final page has been returned.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Fetch the next page, or `None` when the listing is exhausted.
    ///
    /// A not-found answer from the store ends the listing with no pages.
    pub async fn next_page(&mut self) -> Result<Option<ListPage>> {
        if self.finished {
            return Ok(None);
        }

        tracing::debug!(
            prefix = %sanitize_for_log(&self.request.prefix),
            start_after = ?self.request.start_after.as_deref().map(sanitize_for_log),
            "listing page"
        );

        let page = match self.store.list(&self.request).await {
            Ok(page) => page,
            Err(err) if err.is_not_found() => {
                self.finished = true;
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        if !page.is_truncated {
            self.finished = true;
            return Ok(Some(page));
        }

        match continuation_cursor(&page) {
            Some(cursor) if Some(&cursor) > self.request.start_after.as_ref() => {
                self.request.start_after = Some(cursor);
                Ok(Some(page))
            }
            _ => {
                self.finished = true;
                Err(Error::StoreUnavailable(format!(
                    "listing of '{}' reported more results without advancing",
                    sanitize_for_log(&self.request.prefix)
                )))
            }
        }
    }

    /// Consume the pager as a stream of pages.
    pub fn into_stream(self) -> impl Stream<Item = Result<ListPage>> + Send {
        futures_util::stream::try_unfold(self, |mut pager| async move {
            Ok(pager.next_page().await?.map(|page| (page, pager)))
        })
    }
}

/// Cursor after the last entry of a page, as a raw store key.
///
/// Objects contribute their key. A common prefix contributes a cursor past
/// every key it groups, so the next page does not regroup them.
fn continuation_cursor(page: &ListPage) -> Option<String> {
    let last_object = page.objects.last().map(|object| object.key.clone());
    let last_prefix = page
        .common_prefixes
        .last()
        .map(|prefix| format!("{prefix}{PREFIX_CURSOR_SUFFIX}"));
    last_object.max(last_prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use futures_util::TryStreamExt;

    async fn store_with(keys: &[&str], page_size: usize) -> Arc<dyn ObjectStore> {
        let store = InMemoryStore::new().page_size(page_size);
        for key in keys {
            store.put(key, Vec::new()).await.unwrap();
        }
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_pages_until_not_truncated() {
        let store = store_with(&["d/1", "d/2", "d/3", "d/4", "d/5"], 2).await;
        let mut pager = ListingPager::new(store, "d/");

        let mut sizes = Vec::new();
        while let Some(page) = pager.next_page().await.unwrap() {
            sizes.push(page.objects.len());
        }
        assert_eq!(sizes, vec![2, 2, 1]);
        assert!(pager.is_finished());
        assert!(pager.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cursor_is_raw_key() {
        let store = store_with(&["a/x/1", "a/x/2", "a/x/3"], 2).await;
        let mut pager = ListingPager::new(store, "a/x/");
        pager.next_page().await.unwrap();
        assert_eq!(pager.cursor(), Some("a/x/2"));
    }

    #[tokio::test]
    async fn test_common_prefix_cursor_skips_group() {
        let store = store_with(&["r/a/1", "r/a/2", "r/a/3", "r/b/1", "r/c"], 1).await;
        let pages: Vec<ListPage> = ListingPager::new(store, "r/")
            .delimiter('/')
            .into_stream()
            .try_collect()
            .await
            .unwrap();

        let prefixes: Vec<String> = pages
            .iter()
            .flat_map(|page| page.common_prefixes.clone())
            .collect();
        let objects: Vec<String> = pages
            .iter()
            .flat_map(|page| page.objects.iter().map(|o| o.key.clone()))
            .collect();
        assert_eq!(prefixes, vec!["r/a/", "r/b/"]);
        assert_eq!(objects, vec!["r/c"]);
    }

    #[tokio::test]
    async fn test_empty_prefix_yields_single_empty_page() {
        let store = store_with(&[], 10).await;
        let pages: Vec<ListPage> = ListingPager::new(store, "nothing/")
            .into_stream()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(pages.len(), 1);
        assert!(pages[0].is_empty());
    }
}

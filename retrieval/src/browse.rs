//! Paginated listing of entries, newest first.

use std::sync::Arc;

use faq_store::{ALL_TAGS_LABEL, Entry, EntryStore, TagCatalog, TagFilter};
use serde::Serialize;
use tracing::debug;

use crate::error::Result;

/// One page of a longer list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: usize,
    pub total_pages: usize,
    /// The page actually returned, after clamping.
    pub page_index: usize,
}

/// A page of entries.
pub type BrowsePage = Page<Entry>;

/// Slice `items` into pages of `page_size` and return page `page_index`.
///
/// A negative or out-of-range index falls back to the first page. A page
/// size of zero is treated as one.
pub fn paginate<T: Clone>(items: &[T], page_index: i64, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_count = items.len();
    let total_pages = total_count.div_ceil(page_size);

    let page_index = usize::try_from(page_index)
        .ok()
        .filter(|index| *index < total_pages)
        .unwrap_or(0);

    let start = page_index * page_size;
    let end = (start + page_size).min(total_count);
    let items = items.get(start..end).map(<[T]>::to_vec).unwrap_or_default();

    Page {
        items,
        total_count,
        total_pages,
        page_index,
    }
}

/// Tag-filtered, paginated entry listing.
pub struct BrowseEngine {
    store: Arc<EntryStore>,
}

impl BrowseEngine {
    pub fn new(store: Arc<EntryStore>) -> Self {
        Self { store }
    }

    /// Entries matching `filter`, sorted newest first, cut to one page.
    pub async fn browse(
        &self,
        filter: &TagFilter,
        page_index: i64,
        page_size: usize,
    ) -> Result<BrowsePage> {
        let entries: Vec<Entry> = self
            .store
            .list_all_sorted()
            .await?
            .into_iter()
            .filter(|entry| filter.matches(&entry.tag))
            .collect();

        let page = paginate(&entries, page_index, page_size);
        debug!(
            "Browse {filter}: page {}/{} of {} entries",
            page.page_index + 1,
            page.total_pages,
            page.total_count
        );
        Ok(page)
    }

    /// Choices for a tag filter menu: the "all" label, then the tags in use,
    /// or the catalog's tags while the store is still empty.
    pub async fn filter_options(&self, catalog: &TagCatalog) -> Result<Vec<String>> {
        let mut tags = self.store.list_unique_tags().await?;
        if tags.is_empty() {
            tags = catalog.names().await;
        }

        let mut options = Vec::with_capacity(tags.len() + 1);
        options.push(ALL_TAGS_LABEL.to_string());
        options.extend(tags);
        Ok(options)
    }
}

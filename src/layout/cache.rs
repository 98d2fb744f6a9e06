//! In-memory Layout Cache: prepared page payloads keyed by
//! `(dir_sha256, sort_order, page, show_duplicates)`, purged in bulk by
//! directory when the watcher marks it invalid. A `dashmap::DashMap` is
//! used for the same reason `index::lock::DirectoryLockTable` reaches
//! for one: a sharded concurrent map is the idiomatic fit for a
//! keyed-by-hash, read-heavy/write-light workload.

use dashmap::DashMap;

use crate::index::{PurgeNotifier, SortOrder};

use super::Page;

#[derive(Clone, Hash, PartialEq, Eq)]
struct CacheKey {
    dir_sha256: String,
    sort_order: i32,
    page: u32,
    show_duplicates: bool,
}

impl CacheKey {
    fn new(dir_sha256: &str, sort_order: SortOrder, page: u32, show_duplicates: bool) -> Self {
        Self {
            dir_sha256: dir_sha256.to_string(),
            sort_order: sort_order as i32,
            page,
            show_duplicates,
        }
    }
}

#[derive(Default)]
pub struct LayoutCache {
    entries: DashMap<CacheKey, Page>,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &self,
        dir_sha256: &str,
        sort_order: SortOrder,
        page: u32,
        show_duplicates: bool,
    ) -> Option<Page> {
        let key = CacheKey::new(dir_sha256, sort_order, page, show_duplicates);
        self.entries.get(&key).map(|entry| entry.clone())
    }

    pub fn put(
        &self,
        dir_sha256: &str,
        sort_order: SortOrder,
        page: u32,
        show_duplicates: bool,
        value: Page,
    ) {
        let key = CacheKey::new(dir_sha256, sort_order, page, show_duplicates);
        self.entries.insert(key, value);
    }

    /// Evicts every entry keyed by `dir_sha256`, across all sort/page/flag
    /// combinations. The map is scanned by key since entries for one
    /// directory are scattered across many keys.
    pub fn purge(&self, dir_sha256: &str) {
        self.entries.retain(|key, _| key.dir_sha256 != dir_sha256);
    }

    /// Coarse fallback for the watcher's buffer-overflow case.
    pub fn purge_all(&self) {
        self.entries.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Lets `index::sync` purge this directory's entries without depending
/// on the `layout` module directly.
impl PurgeNotifier for LayoutCache {
    fn purge(&self, dir_sha256: &str) {
        LayoutCache::purge(self, dir_sha256);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_page() -> Page {
        Page {
            entries: Vec::new(),
            pagination: super::super::Pagination {
                total_items: 0,
                page_count: 0,
                current_page: 1,
                prev_page_url: None,
                next_page_url: None,
            },
            siblings: super::super::Siblings::default(),
            breadcrumbs: Vec::new(),
        }
    }

    #[test]
    fn purge_only_evicts_matching_directory() {
        let cache = LayoutCache::new();
        cache.put("dir-a", SortOrder::NaturalName, 1, false, blank_page());
        cache.put("dir-b", SortOrder::NaturalName, 1, false, blank_page());

        cache.purge("dir-a");

        assert!(cache.get("dir-a", SortOrder::NaturalName, 1, false).is_none());
        assert!(cache.get("dir-b", SortOrder::NaturalName, 1, false).is_some());
    }

    #[test]
    fn purge_evicts_all_sort_and_page_variants() {
        let cache = LayoutCache::new();
        cache.put("dir-a", SortOrder::NaturalName, 1, false, blank_page());
        cache.put("dir-a", SortOrder::LastModified, 2, true, blank_page());

        cache.purge("dir-a");

        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn purge_all_clears_everything() {
        let cache = LayoutCache::new();
        cache.put("dir-a", SortOrder::NaturalName, 1, false, blank_page());
        cache.put("dir-b", SortOrder::NaturalName, 1, false, blank_page());

        cache.purge_all();

        assert_eq!(cache.len(), 0);
    }
}

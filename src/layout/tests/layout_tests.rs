use std::fs;
use std::time::{Duration, SystemTime};

use filetime::{set_file_mtime, FileTime};
use tempfile::tempdir;

use crate::config::GalleryConfig;
use crate::filetype::{defaults, FiletypeRegistry};
use crate::identity;
use crate::index::lock::DirectoryLockTable;
use crate::index::{sync, NoopPurgeNotifier, SortOrder};
use crate::layout::{self, LayoutCache};
use crate::test_utils::init_test_db;

fn registry() -> &'static FiletypeRegistry {
    Box::leak(Box::new(FiletypeRegistry::from_filetypes(defaults::seed())))
}

struct Harness {
    ctx: crate::test_utils::TestContext,
    config: GalleryConfig,
    registry: &'static FiletypeRegistry,
    locks: DirectoryLockTable,
    cache: LayoutCache,
}

impl Harness {
    async fn new() -> Self {
        Harness {
            ctx: init_test_db().await,
            config: GalleryConfig::default(),
            registry: registry(),
            locks: DirectoryLockTable::new(),
            cache: LayoutCache::new(),
        }
    }

    async fn sync(&self, path: &std::path::Path) -> String {
        sync::sync(
            &self.ctx.pool,
            &self.config,
            self.registry,
            &self.locks,
            &NoopPurgeNotifier,
            path,
        )
        .await
        .unwrap();
        identity::dir_sha256(path).unwrap()
    }

    async fn page(
        &self,
        dir_sha256: &str,
        sort_order: SortOrder,
        show_duplicates: bool,
        page: usize,
    ) -> layout::Page {
        layout::list_directory(
            &self.ctx.pool,
            &self.config,
            self.registry,
            &self.cache,
            dir_sha256,
            sort_order,
            show_duplicates,
            page,
        )
        .await
        .unwrap()
    }
}

#[tokio::test]
async fn lists_files_and_subdirs_in_natural_name_order() {
    let mut h = Harness::new().await;
    h.config.gallery_page_size = 30;
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("img10.jpg"), b"a").unwrap();
    fs::write(dir.path().join("img2.jpg"), b"b").unwrap();
    fs::create_dir(dir.path().join("zalbum")).unwrap();

    let dir_sha = h.sync(dir.path()).await;
    let page = h.page(&dir_sha, SortOrder::NaturalName, true, 1).await;

    let names: Vec<&str> = page.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["zalbum", "img2.jpg", "img10.jpg"]);
    assert_eq!(page.pagination.total_items, 3);
    assert_eq!(page.pagination.page_count, 1);
}

#[tokio::test]
async fn paginates_across_page_size_boundary() {
    let mut h = Harness::new().await;
    h.config.gallery_page_size = 2;
    let dir = tempdir().unwrap();
    for i in 0..5 {
        fs::write(dir.path().join(format!("f{i}.txt")), b"x").unwrap();
    }

    let dir_sha = h.sync(dir.path()).await;

    let page1 = h.page(&dir_sha, SortOrder::NaturalName, true, 1).await;
    assert_eq!(page1.entries.len(), 2);
    assert_eq!(page1.pagination.page_count, 3);
    assert!(page1.pagination.prev_page_url.is_none());
    assert!(page1.pagination.next_page_url.is_some());

    let page3 = h.page(&dir_sha, SortOrder::NaturalName, true, 3).await;
    assert_eq!(page3.entries.len(), 1);
    assert!(page3.pagination.next_page_url.is_none());
    assert!(page3.pagination.prev_page_url.is_some());
}

#[tokio::test]
async fn duplicate_files_collapse_to_natural_first_unless_shown() {
    let mut h = Harness::new().await;
    h.config.gallery_page_size = 30;
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"same-bytes").unwrap();
    fs::write(dir.path().join("b.txt"), b"same-bytes").unwrap();

    let dir_sha = h.sync(dir.path()).await;

    let hidden = h.page(&dir_sha, SortOrder::NaturalName, false, 1).await;
    let names: Vec<&str> = hidden.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["a.txt"], "only the natural-first duplicate should remain");

    let shown = h.page(&dir_sha, SortOrder::NaturalName, true, 1).await;
    assert_eq!(shown.entries.len(), 2);
}

#[tokio::test]
async fn breadcrumbs_run_root_to_current() {
    let mut h = Harness::new().await;
    h.config.gallery_page_size = 30;
    let dir = tempdir().unwrap();
    let child = dir.path().join("child");
    fs::create_dir(&child).unwrap();

    h.sync(dir.path()).await;
    let child_sha = h.sync(&child).await;

    let page = h.page(&child_sha, SortOrder::NaturalName, true, 1).await;
    assert_eq!(page.breadcrumbs.len(), 2);
    assert_eq!(page.breadcrumbs.last().unwrap().label, "child");
}

#[tokio::test]
async fn siblings_reflect_natural_name_neighbors() {
    let mut h = Harness::new().await;
    h.config.gallery_page_size = 30;
    let dir = tempdir().unwrap();
    for name in ["a", "b", "c"] {
        fs::create_dir(dir.path().join(name)).unwrap();
    }

    h.sync(dir.path()).await;
    let b_sha = h.sync(&dir.path().join("b")).await;

    let page = h.page(&b_sha, SortOrder::NaturalName, true, 1).await;
    assert_eq!(page.siblings.prev.as_ref().unwrap().name, "a");
    assert_eq!(page.siblings.next.as_ref().unwrap().name, "c");
}

#[tokio::test]
async fn repeated_call_hits_layout_cache() {
    let mut h = Harness::new().await;
    h.config.gallery_page_size = 30;
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"x").unwrap();

    let dir_sha = h.sync(dir.path()).await;

    let first = h.page(&dir_sha, SortOrder::NaturalName, true, 1).await;
    assert_eq!(h.cache.len(), 1);

    let second = h.page(&dir_sha, SortOrder::NaturalName, true, 1).await;
    assert_eq!(first.entries.len(), second.entries.len());
    assert_eq!(h.cache.len(), 1, "second call should be served from cache, not grow it");
}

#[tokio::test]
async fn last_modified_order_ranks_newest_file_first() {
    let mut h = Harness::new().await;
    h.config.gallery_page_size = 30;
    let dir = tempdir().unwrap();

    let older = dir.path().join("older.txt");
    let newer = dir.path().join("newer.txt");
    fs::write(&older, b"a").unwrap();
    fs::write(&newer, b"b").unwrap();

    let now = SystemTime::now();
    set_file_mtime(&older, FileTime::from_system_time(now - Duration::from_secs(3600))).unwrap();
    set_file_mtime(&newer, FileTime::from_system_time(now)).unwrap();

    let dir_sha = h.sync(dir.path()).await;
    let page = h.page(&dir_sha, SortOrder::LastModified, true, 1).await;

    let names: Vec<&str> = page.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Newer.txt", "Older.txt"]);
}

#[tokio::test]
async fn cache_purge_forces_fresh_page() {
    let mut h = Harness::new().await;
    h.config.gallery_page_size = 30;
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"x").unwrap();

    let dir_sha = h.sync(dir.path()).await;
    h.page(&dir_sha, SortOrder::NaturalName, true, 1).await;
    assert_eq!(h.cache.len(), 1);

    h.cache.purge(&dir_sha);
    assert_eq!(h.cache.len(), 0);

    fs::write(dir.path().join("b.txt"), b"y").unwrap();
    h.sync(dir.path()).await;
    let refreshed = h.page(&dir_sha, SortOrder::NaturalName, true, 1).await;
    assert_eq!(refreshed.entries.len(), 2);
}

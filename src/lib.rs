//! Content-addressed media gallery: index, thumbnail cache, and
//! filesystem watcher. See SPEC_FULL.md for the full module map.

pub mod config;
pub mod error;
pub mod filetype;
pub mod identity;
pub mod index;
pub mod layout;
pub mod thumbnail;
pub mod watcher;

#[cfg(test)]
pub mod test_utils;

use std::sync::Arc;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use config::GalleryConfig;
use error::{GalleryError, GalleryResult};
use filetype::FiletypeRegistry;
use index::lock::DirectoryLockTable;
use layout::LayoutCache;

/// Everything a caller needs to drive the gallery: the database pool,
/// the loaded configuration, the filetype registry, the sync-lock
/// table, and the Layout Cache. One instance per process.
pub struct GalleryContext {
    pub pool: SqlitePool,
    pub config: GalleryConfig,
    pub locks: DirectoryLockTable,
    pub layout_cache: Arc<LayoutCache>,
}

impl GalleryContext {
    /// Opens (creating if missing) the SQLite database at
    /// `config.managed_root`'s sibling `gallery.db`, runs migrations,
    /// and seeds the process-wide `FiletypeRegistry`.
    pub async fn init(config: GalleryConfig, db_path: &std::path::Path) -> GalleryResult<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(GalleryError::from)?;
            }
        }

        let opts = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .map_err(GalleryError::from)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| GalleryError::Database(e.to_string()))?;

        FiletypeRegistry::init_global(filetype::defaults::seed());

        Ok(Self {
            pool,
            config,
            locks: DirectoryLockTable::new(),
            layout_cache: Arc::new(LayoutCache::new()),
        })
    }

    /// Forces a reconciliation pass on one directory.
    pub async fn sync(&self, path: &std::path::Path) -> GalleryResult<()> {
        index::sync::sync(
            &self.pool,
            &self.config,
            FiletypeRegistry::global(),
            &self.locks,
            self.layout_cache.as_ref(),
            path,
        )
        .await
    }

    /// Sets the Cache-Tracking flag for `path`; called by the watcher
    /// on any filesystem event.
    pub async fn mark_invalid(&self, path: &std::path::Path) -> GalleryResult<()> {
        let dir_sha256 = identity::dir_sha256(path)?;
        index::sync::mark_invalid(&self.pool, &dir_sha256).await?;
        self.layout_cache.purge(&dir_sha256);
        Ok(())
    }

    /// Ensures `path` is synced, then returns its ordered listing.
    pub async fn list_directory(
        &self,
        path: &std::path::Path,
        sort_order: index::SortOrder,
        show_duplicates: bool,
        page: usize,
    ) -> GalleryResult<layout::Page> {
        self.sync(path).await?;
        let dir_sha256 = identity::dir_sha256(path)?;
        layout::list_directory(
            &self.pool,
            &self.config,
            FiletypeRegistry::global(),
            self.layout_cache.as_ref(),
            &dir_sha256,
            sort_order,
            show_duplicates,
            page,
        )
        .await
    }

    /// Starts the filesystem watcher over `config.managed_root`, wiring
    /// it to this context's pool and Layout Cache.
    pub fn start_watcher(&self) -> watcher::WatcherHandle {
        let buffer = watcher::InvalidationBuffer::new(
            self.pool.clone(),
            self.layout_cache.clone(),
            self.config.invalidator_debounce_seconds,
        );
        watcher::lifecycle::start(
            self.config.managed_root.clone(),
            buffer,
            self.config.watcher_restart_schedule.clone(),
        )
    }
}

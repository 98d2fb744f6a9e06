//! Coalescing buffer for filesystem events.
//!
//! Events are deduplicated by containing directory and debounced behind
//! a quiet-period timer; a generation counter invalidates stale timers
//! so only the flush armed by the *last* event in a burst actually
//! fires.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::warn;
use sqlx::SqlitePool;

use crate::error::GalleryResult;
use crate::index::{cache_tracking_repo, sync as index_sync};
use crate::layout::LayoutCache;

/// Above this many distinct buffered directories, a flush invalidates
/// the whole index instead of walking the buffer one key at a time.
/// Not configurable: it is a circuit breaker against pathological
/// event storms, not a tuning knob.
const SOFT_CAP: usize = 1000;

struct Inner {
    pool: SqlitePool,
    layout_cache: Arc<LayoutCache>,
    debounce: Duration,
    pending: Mutex<HashSet<PathBuf>>,
    generation: AtomicU64,
}

/// Owns the coalescing buffer and its debounce timer. Cheap to clone —
/// everything lives behind the inner `Arc`, so the watcher's event loop
/// can hold one and hand out clones freely.
#[derive(Clone)]
pub struct InvalidationBuffer {
    inner: Arc<Inner>,
}

impl InvalidationBuffer {
    pub fn new(pool: SqlitePool, layout_cache: Arc<LayoutCache>, debounce_seconds: u64) -> Self {
        Self {
            inner: Arc::new(Inner {
                pool,
                layout_cache,
                debounce: Duration::from_secs(debounce_seconds.max(1)),
                pending: Mutex::new(HashSet::new()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Buffers one directory event and (re)arms the debounce timer.
    /// Safe to call from the watcher's event-handling loop for every
    /// create/modify/remove/rename event.
    pub fn record(&self, dir_path: &Path) {
        {
            let mut pending = self.inner.pending.lock().unwrap_or_else(|p| p.into_inner());
            pending.insert(dir_path.to_path_buf());
        }

        let my_generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = self.inner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(inner.debounce).await;
            if inner.generation.load(Ordering::SeqCst) == my_generation {
                flush(&inner).await;
            }
        });
    }
}

async fn flush(inner: &Inner) {
    let snapshot: Vec<PathBuf> = {
        let mut pending = inner.pending.lock().unwrap_or_else(|p| p.into_inner());
        std::mem::take(&mut *pending).into_iter().collect()
    };

    if snapshot.is_empty() {
        return;
    }

    if snapshot.len() > SOFT_CAP {
        warn!(
            "invalidation buffer exceeded soft cap ({} > {SOFT_CAP}); invalidating the whole index",
            snapshot.len()
        );
        if let Err(e) = cache_tracking_repo::mark_all_invalid(&inner.pool).await {
            warn!("bulk invalidate failed: {e}");
        }
        inner.layout_cache.purge_all();
        return;
    }

    for dir_path in snapshot {
        if let Err(e) = mark_one(inner, &dir_path).await {
            warn!("failed to invalidate {dir_path:?}: {e}");
        }
    }
}

async fn mark_one(inner: &Inner, dir_path: &Path) -> GalleryResult<()> {
    let dir_sha256 = crate::identity::dir_sha256(dir_path)?;
    index_sync::mark_invalid(&inner.pool, &dir_sha256).await?;
    inner.layout_cache.purge(&dir_sha256);
    Ok(())
}

#[cfg(test)]
#[path = "tests/buffer_tests.rs"]
mod tests;

//! Per-directory coalescing lock: a sync on directory P takes a
//! per-directory exclusive lock, so concurrent sync requests for the
//! same P coalesce — the second caller waits for the first's result
//! instead of racing it.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

/// Hands out one `tokio::sync::Mutex` per `dir_sha256`, shared across
/// callers so a second `sync()` on the same directory blocks on the
/// first rather than racing it. Entries are never removed: the table
/// stays small (bounded by the number of distinct directories ever
/// synced) and removing entries would risk two callers locking
/// different `Mutex` instances for the same key.
#[derive(Default)]
pub struct DirectoryLockTable {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl DirectoryLockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the mutex guarding `dir_sha256`, creating it on first use.
    pub fn get(&self, dir_sha256: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(dir_sha256.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_key_returns_same_mutex_instance() {
        let table = DirectoryLockTable::new();
        let a = table.get("abc");
        let b = table.get("abc");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn distinct_keys_do_not_contend() {
        let table = DirectoryLockTable::new();
        let a = table.get("abc");
        let b = table.get("def");
        let _guard_a = a.lock().await;
        // A different key's mutex must still be acquirable immediately.
        let _guard_b = b.try_lock().expect("distinct directories must not contend");
    }
}

//! Directory & File Index.
//!
//! Maintains a queryable mirror of the managed filesystem subtree and
//! reconciles it on demand.

pub mod cache_tracking_repo;
pub mod directory_repo;
pub mod file_repo;
pub mod lock;
pub mod sort;
pub mod sync;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Directory {
    pub dir_sha256: String,
    pub fqpn: String,
    pub parent_dir_sha256: Option<String>,
    pub combined_sha256: String,
    pub count_files: i64,
    pub count_subdirs: i64,
    pub delete_pending: bool,
    pub last_sync_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct File {
    pub unique_sha256: String,
    pub name: String,
    pub home_directory: String,
    pub file_sha256: String,
    pub filetype_ext: String,
    pub size: i64,
    pub mtime: Option<DateTime<Utc>>,
    pub delete_pending: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CacheTrackingEntry {
    pub dir_sha256: String,
    pub invalidated: bool,
    pub lastscan: Option<DateTime<Utc>>,
}

/// Callback used by `sync` to notify the Layout Cache to purge any entry
/// keyed by the synced directory's `dir_sha256`. Implemented by the
/// `layout` module; kept as a trait here so this module does not depend
/// on `layout` directly.
pub trait PurgeNotifier: Send + Sync {
    fn purge(&self, dir_sha256: &str);
}

/// No-op notifier for callers (and tests) that don't wire a Layout Cache.
pub struct NoopPurgeNotifier;

impl PurgeNotifier for NoopPurgeNotifier {
    fn purge(&self, _dir_sha256: &str) {}
}

/// Sort order codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum SortOrder {
    NaturalName = 0,
    LastModified = 1,
    NameOnly = 2,
}

impl TryFrom<i32> for SortOrder {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SortOrder::NaturalName),
            1 => Ok(SortOrder::LastModified),
            2 => Ok(SortOrder::NameOnly),
            other => Err(format!("unknown sort order code: {other}")),
        }
    }
}

//! Filesystem watcher: detects changes under the managed root and
//! invalidates the affected parts of the index and Layout Cache.
//!
//! `buffer` holds the coalescing/debounce layer; `lifecycle` owns the
//! `notify` observer and its restart schedule.

pub mod buffer;
pub mod lifecycle;

pub use buffer::InvalidationBuffer;
pub use lifecycle::WatcherHandle;

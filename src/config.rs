//! Configuration for the gallery core: managed root, page size, watcher
//! debounce and restart cadence, and the other knobs the rest of the
//! crate reads at startup.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ThumbnailSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ThumbnailSizes {
    pub small: ThumbnailSize,
    pub medium: ThumbnailSize,
    pub large: ThumbnailSize,
}

impl Default for ThumbnailSizes {
    fn default() -> Self {
        Self {
            small: ThumbnailSize {
                width: 200,
                height: 200,
            },
            medium: ThumbnailSize {
                width: 740,
                height: 740,
            },
            large: ThumbnailSize {
                width: 1024,
                height: 1024,
            },
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GalleryConfig {
    pub managed_root: PathBuf,
    pub ignore_dotfiles: bool,
    pub files_to_ignore: HashSet<String>,
    pub extensions_to_ignore: HashSet<String>,
    pub cover_names: Vec<String>,
    pub gallery_page_size: usize,
    pub archive_page_size: usize,
    pub thumbnail_sizes: ThumbnailSizes,
    pub thumbnail_concurrency_limit: usize,
    pub thumbnail_batch_size: usize,
    pub invalidator_debounce_seconds: u64,
    pub watcher_restart_schedule: WatcherRestartSchedule,
    pub sync_freshness_window_seconds: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum WatcherRestartSchedule {
    /// Restart every N seconds.
    IntervalSeconds(u64),
    /// Restart at each of these wall-clock times, "HH:MM".
    DailyTimes(Vec<String>),
}

impl Default for WatcherRestartSchedule {
    fn default() -> Self {
        WatcherRestartSchedule::IntervalSeconds(3600)
    }
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            managed_root: PathBuf::from("."),
            ignore_dotfiles: true,
            files_to_ignore: HashSet::new(),
            extensions_to_ignore: HashSet::new(),
            cover_names: vec!["cover".into(), "title".into()],
            gallery_page_size: 30,
            archive_page_size: 21,
            thumbnail_sizes: ThumbnailSizes::default(),
            thumbnail_concurrency_limit: 2,
            thumbnail_batch_size: 5,
            invalidator_debounce_seconds: 5,
            watcher_restart_schedule: WatcherRestartSchedule::default(),
            sync_freshness_window_seconds: 0,
        }
    }
}

impl GalleryConfig {
    /// Load configuration from a TOML file, falling back to defaults for any
    /// field the file doesn't set (via serde's `Default` handling at the
    /// call site — callers typically start from `GalleryConfig::default()`
    /// and overlay the parsed partial document).
    pub fn load_from_file(path: &std::path::Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
        toml::from_str(&contents).map_err(|e| e.to_string())
    }

    pub fn is_ignored_name(&self, lower_name: &str) -> bool {
        if self.ignore_dotfiles && lower_name.starts_with('.') {
            return true;
        }
        self.files_to_ignore.contains(lower_name)
    }

    pub fn is_ignored_extension(&self, lower_ext: &str) -> bool {
        self.extensions_to_ignore.contains(lower_ext)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

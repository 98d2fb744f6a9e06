//! Filetype Registry.
//!
//! A read-only, process-wide map from dotted lowercase extension to
//! `Filetype`, loaded once per process. Lookups are O(1); missing,
//! empty, or "unknown" extensions resolve to `.none`.
//!
//! Modeled as a `OnceLock` singleton: the registry itself stays a
//! read-only singleton (no mutable shared state to coordinate), and
//! callers go through `FiletypeRegistry::global()` rather than reaching
//! for ad-hoc globals elsewhere.

use std::collections::HashMap;
use std::sync::OnceLock;

pub mod defaults;

#[derive(Debug, Clone, PartialEq)]
pub struct Filetype {
    pub ext: String,
    pub is_image: bool,
    pub is_pdf: bool,
    pub is_movie: bool,
    pub is_archive: bool,
    pub is_dir: bool,
    pub is_text: bool,
    pub is_markdown: bool,
    pub is_html: bool,
    pub is_link: bool,
    pub generic: bool,
    pub mimetype: String,
    pub icon_filename: String,
    pub color: String,
    pub thumbnail: Option<Vec<u8>>,
}

impl Filetype {
    pub fn unknown() -> Self {
        Self {
            ext: ".none".into(),
            is_image: false,
            is_pdf: false,
            is_movie: false,
            is_archive: false,
            is_dir: false,
            is_text: false,
            is_markdown: false,
            is_html: false,
            is_link: false,
            generic: true,
            mimetype: "application/octet-stream".into(),
            icon_filename: "unknown.png".into(),
            color: "808080".into(),
            thumbnail: None,
        }
    }
}

pub struct FiletypeRegistry {
    by_ext: HashMap<String, Filetype>,
}

static REGISTRY: OnceLock<FiletypeRegistry> = OnceLock::new();

impl FiletypeRegistry {
    /// Build a registry from a list of filetypes. `.none` is inserted
    /// automatically if absent.
    pub fn from_filetypes(filetypes: Vec<Filetype>) -> Self {
        let mut by_ext: HashMap<String, Filetype> = filetypes
            .into_iter()
            .map(|ft| (ft.ext.clone(), ft))
            .collect();
        by_ext.entry(".none".into()).or_insert_with(Filetype::unknown);
        Self { by_ext }
    }

    /// Loaded once per process from the administrative seed data.
    /// Load failure is non-fatal: the registry falls back to an
    /// empty table where every file resolves to `.none`.
    pub fn init_global(filetypes: Vec<Filetype>) {
        let _ = REGISTRY.set(Self::from_filetypes(filetypes));
    }

    /// Access the process-wide registry, initializing it with just
    /// `.none` if `init_global` was never called (load failure case).
    pub fn global() -> &'static FiletypeRegistry {
        REGISTRY.get_or_init(|| Self::from_filetypes(Vec::new()))
    }

    fn normalize_ext(ext: &str) -> String {
        let lowered = ext.to_lowercase();
        if lowered.is_empty() || lowered == "unknown" {
            return ".none".into();
        }
        if lowered.starts_with('.') {
            lowered
        } else {
            format!(".{lowered}")
        }
    }

    pub fn exists_by_ext(&self, ext: &str) -> bool {
        self.by_ext.contains_key(&Self::normalize_ext(ext))
    }

    pub fn get_by_ext(&self, ext: &str) -> Filetype {
        let key = Self::normalize_ext(ext);
        self.by_ext
            .get(&key)
            .cloned()
            .unwrap_or_else(Filetype::unknown)
    }
}

#[cfg(test)]
#[path = "tests/filetype_tests.rs"]
mod tests;
